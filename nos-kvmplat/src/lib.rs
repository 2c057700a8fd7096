//! NOS KVM Platform Entry
//!
//! First Rust code to run in a NOS guest under KVM. The boot stub jumps to
//! [`kvm::nos_kvmplat_entry`] with the loader's Multiboot information
//! pointer; the entry sequence resets the FPU, copies the command line out
//! of loader memory, derives the physical memory layout, leaves the
//! bootstrap stack and hands the command line to the platform-independent
//! kernel entry point. It never returns.
//!
//! # Modules
//!
//! - **entry**: the entry sequence and the [`entry::Platform`] contract
//! - **handoff**: access to loader metadata
//! - **cmdline**: fixed-capacity command-line copy
//! - **memory**: memory map scan and layout
//! - **stack**: one-way stack switch
//! - **cpu**: FPU/SSE reset
//! - **config**, **error**, **logger**: ambient support
//!
//! # Features
//!
//! - `verbose_logging`: log every memory map record and other debug detail
//! - `debug`: development build, implies `verbose_logging`

#![cfg_attr(not(test), no_std)]

pub mod cmdline;
pub mod config;
pub mod cpu;
pub mod entry;
pub mod error;
pub mod handoff;
pub mod logger;
pub mod memory;
pub mod stack;

#[cfg(target_os = "none")]
pub mod kvm;

pub use cmdline::{CommandLine, Extraction};
pub use entry::{BootContext, BootSlot, Platform, boot_context, memory_layout};
pub use error::{BootError, Result};
pub use handoff::{BootHandoff, MultibootHandoff};
pub use memory::MemoryLayout;

// ============================================================================
// PANIC HANDLER
// ============================================================================

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(info: &::core::panic::PanicInfo) -> ! {
    log::error!("{}", info);
    cpu::halt()
}
