//! VM configuration and its defaults

use serde::{Deserialize, Serialize};

/// Default number of memory cells shared by stack and heap.
pub const DEFAULT_MEMORY_SIZE: usize = 10_000;

/// Virtual machine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmOptions {
    /// Memory cells; the stack grows down from the top, the heap up from zero
    pub memory_size: usize,
    /// Instruction budget; `None` runs until `halt`
    pub max_steps: Option<u64>,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            max_steps: None,
        }
    }
}

impl VmOptions {
    /// Options with the given memory size and no step limit
    pub fn with_memory_size(memory_size: usize) -> Self {
        Self {
            memory_size,
            ..Self::default()
        }
    }

    /// Set the instruction budget
    pub fn max_steps(mut self, steps: u64) -> Self {
        self.max_steps = Some(steps);
        self
    }
}
