//! Boot handoff access
//!
//! [`BootHandoff`] is the view the entry sequence has of the loader's
//! metadata. [`MultibootHandoff`] backs it with the Multiboot information
//! block handed over by the boot stub.

use core::ffi::CStr;

use nos_api::boot::{InfoFlags, MultibootInfo};

/// Loader-supplied boot metadata
///
/// Everything borrowed from a handoff is only valid until the entry
/// commits the memory layout; callers copy what they need before that.
pub trait BootHandoff {
    /// Address of the handoff structure, for diagnostics
    fn address(&self) -> usize;

    /// Validity bits
    fn flags(&self) -> InfoFlags;

    /// Command-line bytes without the terminator
    ///
    /// Only meaningful when `flags()` contains [`InfoFlags::CMDLINE`].
    fn command_line(&self) -> Option<&[u8]>;

    /// Raw memory map bytes
    ///
    /// Only meaningful when `flags()` contains [`InfoFlags::MEM_MAP`].
    fn memory_map(&self) -> &[u8];

    fn boot_loader_name(&self) -> Option<&[u8]> {
        None
    }
}

/// Handoff backed by a Multiboot information block in identity-mapped
/// physical memory
pub struct MultibootHandoff<'a> {
    info: &'a MultibootInfo,
}

impl<'a> MultibootHandoff<'a> {
    /// Wrap the pointer received from the boot stub
    ///
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// - `info` must point to a Multiboot information block that stays
    ///   readable for `'a`
    /// - every address the block marks valid (command line, memory map,
    ///   loader name) must be identity-mapped and readable for `'a`
    pub unsafe fn from_ptr(info: *const MultibootInfo) -> Option<Self> {
        // SAFETY: non-null validity is part of the caller contract
        unsafe { info.as_ref() }.map(|info| Self { info })
    }

    pub fn info(&self) -> &'a MultibootInfo {
        self.info
    }

    fn c_string_at(addr: u32) -> Option<&'a [u8]> {
        if addr == 0 {
            return None;
        }
        // SAFETY: from_ptr's contract covers every address the block marks valid
        let s = unsafe { CStr::from_ptr(addr as usize as *const core::ffi::c_char) };
        Some(s.to_bytes())
    }
}

impl BootHandoff for MultibootHandoff<'_> {
    fn address(&self) -> usize {
        self.info as *const MultibootInfo as usize
    }

    fn flags(&self) -> InfoFlags {
        self.info.info_flags()
    }

    fn command_line(&self) -> Option<&[u8]> {
        Self::c_string_at(self.info.cmdline)
    }

    fn memory_map(&self) -> &[u8] {
        if self.info.mmap_addr == 0 || self.info.mmap_length == 0 {
            return &[];
        }
        // SAFETY: from_ptr's contract covers the memory map range
        unsafe {
            core::slice::from_raw_parts(
                self.info.mmap_addr as usize as *const u8,
                self.info.mmap_length as usize,
            )
        }
    }

    fn boot_loader_name(&self) -> Option<&[u8]> {
        if !self.flags().contains(InfoFlags::BOOT_LOADER_NAME) {
            return None;
        }
        Self::c_string_at(self.info.boot_loader_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_pointer_is_rejected() {
        assert!(unsafe { MultibootHandoff::from_ptr(core::ptr::null()) }.is_none());
    }

    #[test]
    fn test_empty_block_has_no_data() {
        let info = MultibootInfo::new();
        let handoff = unsafe { MultibootHandoff::from_ptr(&info) }.unwrap();
        assert_eq!(handoff.address(), &info as *const _ as usize);
        assert!(handoff.flags().is_empty());
        assert!(handoff.command_line().is_none());
        assert!(handoff.memory_map().is_empty());
        assert!(handoff.boot_loader_name().is_none());
    }

    #[test]
    fn test_flagged_null_cmdline_falls_back_to_default() {
        use crate::cmdline::{self, CommandLine, Extraction};
        use crate::config::DEFAULT_CMDLINE;

        let info = MultibootInfo {
            flags: InfoFlags::CMDLINE.bits(),
            cmdline: 0,
            ..MultibootInfo::new()
        };
        let handoff = unsafe { MultibootHandoff::from_ptr(&info) }.unwrap();
        let mut cmdline = CommandLine::<64>::new();

        assert!(handoff.command_line().is_none());
        assert_eq!(cmdline::extract(&handoff, &mut cmdline), Extraction::Default);
        assert_eq!(cmdline.as_str(), Some(DEFAULT_CMDLINE));
    }

    #[test]
    fn test_flagged_null_memory_map_has_no_usable_memory() {
        use crate::config::KVM_X86_64;
        use crate::error::BootError;
        use crate::memory;

        let info = MultibootInfo {
            flags: InfoFlags::MEM_MAP.bits(),
            mmap_addr: 0,
            mmap_length: 48,
            ..MultibootInfo::new()
        };
        let handoff = unsafe { MultibootHandoff::from_ptr(&info) }.unwrap();

        assert!(handoff.memory_map().is_empty());
        assert_eq!(
            memory::scan(&handoff, 0x20_0000, &KVM_X86_64),
            Err(BootError::NoUsableMemoryFound)
        );
    }
}
