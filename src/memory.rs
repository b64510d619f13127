//! Host memory snapshots taken around each model invocation.
//!
//! The figure is the change in the system-wide used-memory counter, so it
//! includes every other process on the host and is approximate. When the
//! inference service runs out of process (the usual case) the delta mostly
//! reflects the service loading model weights.

use sysinfo::System;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Source of the host's used-memory counter.
pub trait MemoryProbe {
    /// Current used memory in bytes.
    fn used_bytes(&mut self) -> u64;
}

/// Reads used memory from the operating system.
pub struct SystemMemory {
    system: System,
}

impl SystemMemory {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemMemory {
    fn used_bytes(&mut self) -> u64 {
        self.system.refresh_memory();
        self.system.used_memory()
    }
}

/// Signed difference `after - before` in MB. May be negative.
pub fn delta_mb(before: u64, after: u64) -> f64 {
    (after as i128 - before as i128) as f64 / BYTES_PER_MB
}
