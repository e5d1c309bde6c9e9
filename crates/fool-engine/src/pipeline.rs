//! End-to-end driver API
//!
//! Runs the phases in order and gates each one on the previous ones:
//! resolution and type checking always run, code generation only on a zero
//! combined error count, execution only on successful code generation.

use std::io::Write;

use thiserror::Error;
use tracing::info;

use crate::ast::Program;
use crate::checker::{CheckResult, CompilationContext, ErrorCounts, Resolver, TypeChecker};
use crate::compiler::{
    assemble, listing, Bytecode, CodeGenerator, CodegenOptions, CompileError, CompileResult,
    Instruction,
};
use crate::types::Type;
use crate::vm::{ExecutionStats, Vm, VmError, VmOptions};

/// Failure of [`Pipeline::run`]
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Front-end errors, or code generation or assembly failed
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The program faulted at run time
    #[error("Runtime fault: {0}")]
    Vm(#[from] VmError),
}

/// Result of semantic analysis
#[derive(Debug)]
pub struct Analysis {
    /// Side tables, class registry, and recorded errors
    pub context: CompilationContext,
    /// Type of the main expression, or the error that aborted it
    pub main_type: CheckResult<Type>,
    /// Error counts of every front-end phase
    pub counts: ErrorCounts,
}

/// Output of code generation
#[derive(Debug, Clone)]
pub struct Compiled {
    /// Symbolic instructions
    pub instructions: Vec<Instruction>,
    /// Assembled program
    pub bytecode: Bytecode,
}

impl Compiled {
    /// Assembly text, one instruction per line
    pub fn listing(&self) -> String {
        listing(&self.instructions)
    }
}

/// Compiler and VM driver
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    vm: VmOptions,
    codegen: CodegenOptions,
    external: ErrorCounts,
}

impl Pipeline {
    /// Create a pipeline whose generated code targets a VM with `options`
    pub fn new(options: VmOptions) -> Self {
        Self {
            vm: options,
            codegen: CodegenOptions::for_memory_size(options.memory_size),
            external: ErrorCounts::default(),
        }
    }

    /// Account for errors reported by the external lexer and parser
    pub fn with_front_end_errors(mut self, lexical: usize, syntax: usize) -> Self {
        self.external.lexical = lexical;
        self.external.syntax = syntax;
        self
    }

    /// VM configuration
    pub fn vm_options(&self) -> &VmOptions {
        &self.vm
    }

    /// Run scope resolution and type checking
    pub fn analyze(&self, program: &Program) -> Analysis {
        let mut context = CompilationContext::new();
        Resolver::new(&mut context).resolve_program(program);
        let main_type = TypeChecker::new(&mut context).check_program(program);

        let own = context.error_counts();
        let counts = ErrorCounts {
            scope: own.scope,
            types: own.types,
            ..self.external
        };
        info!(%counts, "analysis finished");
        Analysis {
            context,
            main_type,
            counts,
        }
    }

    /// Analyze, then generate and assemble code
    pub fn compile(&self, program: &Program) -> CompileResult<Compiled> {
        let analysis = self.analyze(program);
        if !analysis.counts.is_clean() {
            return Err(CompileError::FrontEnd(analysis.counts));
        }

        let instructions = CodeGenerator::new(&analysis.context, self.codegen).generate(program)?;
        let bytecode = assemble(&instructions)?;
        Ok(Compiled {
            instructions,
            bytecode,
        })
    }

    /// Compile and execute on a fresh VM, writing program output to `out`
    pub fn run<W: Write>(&self, program: &Program, out: &mut W) -> Result<ExecutionStats, PipelineError> {
        let compiled = self.compile(program)?;
        let mut vm = Vm::new(self.vm)?;
        Ok(vm.execute(&compiled.bytecode, out)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;

    #[test]
    fn test_external_errors_block_compilation() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let program = b.program(one);

        let pipeline = Pipeline::default().with_front_end_errors(0, 2);
        let analysis = pipeline.analyze(&program);
        assert_eq!(analysis.main_type.as_ref().ok(), Some(&Type::Int));
        assert_eq!(analysis.counts.total(), 2);

        match pipeline.compile(&program) {
            Err(CompileError::FrontEnd(counts)) => assert_eq!(counts.syntax, 2),
            other => panic!("expected front-end refusal, got {:?}", other),
        }
    }

    #[test]
    fn test_run_reports_faults() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let zero = b.int(0);
        let div = b.div(one, zero);
        let program = b.program(div);

        let mut out = Vec::new();
        let error = Pipeline::default()
            .run(&program, &mut out)
            .expect_err("divides by zero");
        assert!(matches!(error, PipelineError::Vm(VmError::DivisionByZero { .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn test_oversized_memory_is_refused_before_running() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let print = b.print(one);
        let program = b.program(print);

        let size = i32::MAX as usize + 1;
        let pipeline = Pipeline::new(VmOptions::with_memory_size(size));
        assert!(pipeline.compile(&program).is_ok());

        let mut out = Vec::new();
        let error = pipeline.run(&program, &mut out).expect_err("memory too large");
        assert!(matches!(error, PipelineError::Vm(VmError::InvalidMemorySize { size: s }) if s == size));
        assert!(out.is_empty());
    }

    #[test]
    fn test_bytecode_serializes() {
        let mut b = AstBuilder::new();
        let seven = b.int(7);
        let print = b.print(seven);
        let program = b.program(print);

        let compiled = Pipeline::default().compile(&program).expect("compiles");
        let json = serde_json::to_string(&compiled.bytecode).expect("serializes");
        let restored: Bytecode = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(restored, compiled.bytecode);
        assert_eq!(compiled.listing().lines().count(), compiled.instructions.len());
    }
}
