//! Platform entry error handling
//!
//! Every error here is fatal: the entry has no caller to report to, so
//! [`crate::entry::fatal`] logs the error and halts.

use core::fmt;

use nos_api::boot::MapError;

/// Platform entry error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// Entry was called without a handoff structure
    NoHandoff,

    /// Memory map errors
    MemoryMapMissing,
    MalformedMemoryMap { offset: usize },
    NoUsableMemoryFound,

    /// Layout errors
    ImageExceedsMemory { image_end: u64, mem_end: u64 },
    StackOverlapsHeap { heap_start: u64, stack_top: u64 },

    /// Entry ran a second time
    AlreadyBooted,
    /// Continuation started without a committed boot context
    ContextNotCommitted,
}

impl BootError {
    /// Convert to an error code suitable for a debug exit port
    pub fn as_error_code(&self) -> u32 {
        match self {
            BootError::NoHandoff => 0x1000,
            BootError::MemoryMapMissing => 0x2000,
            BootError::MalformedMemoryMap { .. } => 0x2001,
            BootError::NoUsableMemoryFound => 0x2002,
            BootError::ImageExceedsMemory { .. } => 0x3000,
            BootError::StackOverlapsHeap { .. } => 0x3001,
            BootError::AlreadyBooted => 0xE000,
            BootError::ContextNotCommitted => 0xE001,
        }
    }

    /// Get a human-readable description of the error
    pub fn description(&self) -> &'static str {
        match self {
            BootError::NoHandoff => "No boot handoff structure",
            BootError::MemoryMapMissing => "Loader did not provide a memory map",
            BootError::MalformedMemoryMap { .. } => "Malformed memory map record",
            BootError::NoUsableMemoryFound => "No usable memory at the kernel load address",
            BootError::ImageExceedsMemory { .. } => "Kernel image does not fit in usable memory",
            BootError::StackOverlapsHeap { .. } => "Not enough memory for the boot stack",
            BootError::AlreadyBooted => "Platform entry re-entered",
            BootError::ContextNotCommitted => "Boot context not committed",
        }
    }
}

impl From<MapError> for BootError {
    fn from(err: MapError) -> Self {
        BootError::MalformedMemoryMap { offset: err.offset() }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BootError: {} (code: {:#x})", self.description(), self.as_error_code())?;
        match self {
            BootError::MalformedMemoryMap { offset } => write!(f, " at offset {}", offset),
            BootError::ImageExceedsMemory { image_end, mem_end } => {
                write!(f, " image end {:#x} > memory end {:#x}", image_end, mem_end)
            }
            BootError::StackOverlapsHeap { heap_start, stack_top } => {
                write!(f, " heap start {:#x} > stack top {:#x}", heap_start, stack_top)
            }
            _ => Ok(()),
        }
    }
}

/// Result type used throughout the platform entry
pub type Result<T = ()> = core::result::Result<T, BootError>;
