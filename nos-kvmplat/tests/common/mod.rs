//! Shared fixtures for the platform entry tests

#![allow(dead_code)]

use nos_api::boot::{InfoFlags, MemoryMapRecord, MemoryType};
use nos_kvmplat::BootHandoff;

/// In-memory stand-in for the loader's information block
#[derive(Debug, Clone)]
pub struct FixtureHandoff {
    pub flags: InfoFlags,
    pub cmdline: Option<Vec<u8>>,
    pub mmap: Vec<u8>,
    pub loader_name: Option<Vec<u8>>,
}

impl FixtureHandoff {
    pub fn new() -> Self {
        Self {
            flags: InfoFlags::empty(),
            cmdline: None,
            mmap: Vec::new(),
            loader_name: None,
        }
    }

    pub fn with_cmdline(mut self, cmdline: &[u8]) -> Self {
        self.flags |= InfoFlags::CMDLINE;
        self.cmdline = Some(cmdline.to_vec());
        self
    }

    pub fn with_region(mut self, base: u64, length: u64, kind: MemoryType) -> Self {
        self.flags |= InfoFlags::MEM_MAP;
        self.mmap.extend_from_slice(&MemoryMapRecord::encode(base, length, kind));
        self
    }

    pub fn with_loader_name(mut self, name: &[u8]) -> Self {
        self.flags |= InfoFlags::BOOT_LOADER_NAME;
        self.loader_name = Some(name.to_vec());
        self
    }

    /// Typical QEMU map: low memory, BIOS hole, then RAM from 1 MiB
    pub fn qemu(ram_end: u64) -> Self {
        Self::new()
            .with_region(0, 0x9FC00, MemoryType::Available)
            .with_region(0x9FC00, 0x400, MemoryType::Reserved)
            .with_region(0xF0000, 0x10000, MemoryType::Reserved)
            .with_region(0x100000, ram_end - 0x100000, MemoryType::Available)
            .with_region(0xFFFC0000, 0x40000, MemoryType::Reserved)
    }
}

impl BootHandoff for FixtureHandoff {
    fn address(&self) -> usize {
        self as *const Self as usize
    }

    fn flags(&self) -> InfoFlags {
        self.flags
    }

    fn command_line(&self) -> Option<&[u8]> {
        self.cmdline.as_deref()
    }

    fn memory_map(&self) -> &[u8] {
        &self.mmap
    }

    fn boot_loader_name(&self) -> Option<&[u8]> {
        self.loader_name.as_deref()
    }
}
