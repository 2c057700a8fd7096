//! Platform configuration
//!
//! Compile-time constants describing the KVM x86_64 guest: where the
//! loader places the kernel, how much physical memory the boot page tables
//! cover, and the sizes of the buffers set up during entry.

use static_assertions::const_assert;

/// Page size in bytes
pub const PAGE_SIZE: u64 = 0x1000;

/// Size of the stack the entry switches onto (64 KiB)
pub const STACK_SIZE: u64 = 16 * PAGE_SIZE;

/// Capacity of the command-line buffer, terminator included
pub const CMDLINE_CAPACITY: usize = 8192;

/// Identifier substituted when the loader supplies no command line
pub const DEFAULT_CMDLINE: &str = "nos";

/// Memory parameters of a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Physical address the kernel image is loaded at; the usable region
    /// must start exactly here
    pub mem_start: u64,
    /// Highest address covered by the boot page tables
    pub max_mem_addr: u64,
    pub page_size: u64,
    pub stack_size: u64,
}

impl PlatformConfig {
    /// Check that the parameters can describe a layout at all
    pub const fn is_valid(&self) -> bool {
        self.page_size.is_power_of_two()
            && self.stack_size > 0
            && self.stack_size % self.page_size == 0
            && self.max_mem_addr % self.page_size == 0
            && self.mem_start < self.max_mem_addr
    }
}

/// KVM x86_64 guest loaded at 1 MiB, page tables covering the first GiB
pub const KVM_X86_64: PlatformConfig = PlatformConfig {
    mem_start: 0x10_0000,
    max_mem_addr: 0x4000_0000,
    page_size: PAGE_SIZE,
    stack_size: STACK_SIZE,
};

const_assert!(KVM_X86_64.is_valid());
const_assert!(CMDLINE_CAPACITY > DEFAULT_CMDLINE.len());
