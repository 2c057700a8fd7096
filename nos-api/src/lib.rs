//! NOS API - Boot handoff contract for the NOS operating system
//!
//! This crate describes the data a hypervisor or bootloader hands to the
//! first guest code. It is shared between the platform entry layer, which
//! parses it, and anything later in the system that needs to reason about
//! the same wire structures.
//!
//! # Modules
//!
//! - **Boot**: Multiboot information block, flag bits and the memory-map
//!   record codec
//!
//! # Usage
//!
//! ```rust
//! use nos_api::boot::{MemoryMapRecords, MemoryType};
//!
//! // One 24-byte record: size=20, base=1MiB, length=16MiB, type=available
//! let mut map = [0u8; 24];
//! map[0..4].copy_from_slice(&20u32.to_le_bytes());
//! map[4..12].copy_from_slice(&0x10_0000u64.to_le_bytes());
//! map[12..20].copy_from_slice(&0x100_0000u64.to_le_bytes());
//! map[20..24].copy_from_slice(&1u32.to_le_bytes());
//!
//! let record = MemoryMapRecords::new(&map).next().unwrap().unwrap();
//! assert_eq!(record.kind, MemoryType::Available);
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod boot;

// Re-export commonly used types
pub use crate::boot::{InfoFlags, MapError, MemoryMapRecord, MemoryMapRecords, MemoryType, MultibootInfo};
