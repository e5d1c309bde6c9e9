//! Stack virtual machine
//!
//! Executes assembled [`Bytecode`](crate::compiler::Bytecode) over a single
//! memory array: the stack grows down from the top, the heap grows up from
//! address zero, and execution faults when they meet.

pub mod error;
pub mod interpreter;
pub mod options;

pub use error::{FaultKind, VmError, VmResult};
pub use interpreter::{ExecutionStats, Vm};
pub use options::{VmOptions, DEFAULT_MEMORY_SIZE};
