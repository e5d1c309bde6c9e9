//! Label resolution and encoding of instructions into an executable program

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::instruction::{Instruction, Label};
use crate::compiler::error::{AssembleError, AssembleResult};

/// Encoded program: opcode and operand words, labels resolved to addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bytecode {
    /// Code words
    pub code: Vec<i32>,
}

impl Bytecode {
    /// Number of code words
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether the program is empty
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// Assemble symbolic instructions into bytecode
///
/// First pass computes the address of every label, second pass encodes the
/// instructions with label operands replaced by those addresses.
pub fn assemble(instructions: &[Instruction]) -> AssembleResult<Bytecode> {
    let mut addresses: FxHashMap<Label, i32> = FxHashMap::default();
    let mut address = 0usize;
    for instruction in instructions {
        if let Instruction::Label(label) = instruction {
            if addresses.insert(*label, address as i32).is_some() {
                return Err(AssembleError::DuplicateLabel(*label));
            }
        }
        address += instruction.size();
    }

    let resolve = |label: &Label| {
        addresses
            .get(label)
            .copied()
            .ok_or(AssembleError::UndefinedLabel(*label))
    };

    let mut code = Vec::with_capacity(address);
    for instruction in instructions {
        let Some(opcode) = instruction.opcode() else {
            continue;
        };
        code.push(opcode.to_i32());
        match instruction {
            Instruction::Push(value) => code.push(*value),
            Instruction::PushLabel(label)
            | Instruction::Branch(label)
            | Instruction::BranchEq(label)
            | Instruction::BranchLessEq(label) => code.push(resolve(label)?),
            _ => {}
        }
    }

    Ok(Bytecode { code })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::bytecode::{LabelAllocator, Opcode};

    #[test]
    fn test_labels_resolve_to_addresses() {
        let mut labels = LabelAllocator::new();
        let skip = labels.branch();
        let code = [
            Instruction::Push(1),      // 0, 1
            Instruction::Branch(skip), // 2, 3
            Instruction::Pop,          // 4
            Instruction::Label(skip),
            Instruction::Halt, // 5
        ];

        let program = assemble(&code).expect("assembles");
        assert_eq!(
            program.code,
            vec![
                Opcode::Push.to_i32(),
                1,
                Opcode::Branch.to_i32(),
                5,
                Opcode::Pop.to_i32(),
                Opcode::Halt.to_i32(),
            ]
        );
    }

    #[test]
    fn test_forward_push_label() {
        let mut labels = LabelAllocator::new();
        let entry = labels.function();
        let code = [
            Instruction::PushLabel(entry),
            Instruction::Halt,
            Instruction::Label(entry),
            Instruction::Halt,
        ];
        let program = assemble(&code).expect("assembles");
        assert_eq!(program.code[1], 3);
    }

    #[test]
    fn test_label_errors() {
        let missing = Label::Branch(9);
        assert_eq!(
            assemble(&[Instruction::Branch(missing)]),
            Err(AssembleError::UndefinedLabel(missing))
        );

        let twice = Label::Method(1);
        assert_eq!(
            assemble(&[Instruction::Label(twice), Instruction::Label(twice)]),
            Err(AssembleError::DuplicateLabel(twice))
        );
    }
}
