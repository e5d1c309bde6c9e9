//! Runtime faults

use thiserror::Error;

/// VM execution result
pub type VmResult<T> = Result<T, VmError>;

/// Fault that stops execution
#[derive(Debug, Error)]
pub enum VmError {
    /// `div` with a zero divisor
    #[error("Division by zero at {ip}")]
    DivisionByZero {
        /// Address of the faulting instruction
        ip: usize,
    },

    /// Stack and heap met
    #[error("Stack and heap collided (sp {sp}, hp {hp})")]
    Collision {
        /// Stack pointer
        sp: i32,
        /// Heap pointer
        hp: i32,
    },

    /// Pop from an empty stack
    #[error("Stack underflow at {ip}")]
    StackUnderflow {
        /// Address of the faulting instruction
        ip: usize,
    },

    /// Load or store outside memory
    #[error("Invalid memory address {address} at {ip}")]
    InvalidAddress {
        /// Requested address
        address: i32,
        /// Address of the faulting instruction
        ip: usize,
    },

    /// Jump outside the code
    #[error("Invalid jump target {target} at {ip}")]
    InvalidJump {
        /// Requested target
        target: i32,
        /// Address of the faulting instruction
        ip: usize,
    },

    /// Unknown opcode word
    #[error("Invalid opcode {opcode} at {ip}")]
    InvalidOpcode {
        /// Offending word
        opcode: i32,
        /// Address of the word
        ip: usize,
    },

    /// Operand word missing at the end of the code
    #[error("Truncated instruction at {ip}")]
    TruncatedInstruction {
        /// Address of the opcode
        ip: usize,
    },

    /// Instruction budget exhausted
    #[error("Step limit of {limit} exceeded")]
    StepLimitExceeded {
        /// Configured budget
        limit: u64,
    },

    /// Memory size unusable for a frame-based machine
    #[error("Invalid memory size {size}")]
    InvalidMemorySize {
        /// Requested size
        size: usize,
    },

    /// Writing program output failed
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse category of a [`VmError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Division by zero
    Arithmetic,
    /// Stack/heap collision
    MemoryCollision,
    /// Stack underflow or out-of-range address
    Memory,
    /// Malformed code or jump target
    Decode,
    /// Step limit or memory configuration
    ResourceLimit,
    /// Output failure
    Io,
}

impl VmError {
    /// Category of the fault
    pub fn kind(&self) -> FaultKind {
        match self {
            VmError::DivisionByZero { .. } => FaultKind::Arithmetic,
            VmError::Collision { .. } => FaultKind::MemoryCollision,
            VmError::StackUnderflow { .. } | VmError::InvalidAddress { .. } => FaultKind::Memory,
            VmError::InvalidJump { .. }
            | VmError::InvalidOpcode { .. }
            | VmError::TruncatedInstruction { .. } => FaultKind::Decode,
            VmError::StepLimitExceeded { .. } | VmError::InvalidMemorySize { .. } => {
                FaultKind::ResourceLimit
            }
            VmError::Io(_) => FaultKind::Io,
        }
    }
}
