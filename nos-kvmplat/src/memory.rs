//! Memory layout discovery
//!
//! Derives the heap, stack and end-of-memory boundaries from the loader's
//! memory map. Only the available region starting at the kernel load
//! address is used; everything else the loader reports is ignored.

use core::ops::Range;

use nos_api::boot::{InfoFlags, MemoryMapRecords};

use crate::config::PlatformConfig;
use crate::error::{BootError, Result};
use crate::handoff::BootHandoff;

/// Physical memory layout established at entry
///
/// `heap_start <= stack_top < mem_end`, all page-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    pub heap_start: u64,
    pub stack_top: u64,
    pub mem_end: u64,
}

impl MemoryLayout {
    /// Heap region, between the loaded image and the stack
    pub fn heap(&self) -> Range<u64> {
        self.heap_start..self.stack_top
    }

    /// Stack region; the stack grows down from `mem_end`
    pub fn stack(&self) -> Range<u64> {
        self.stack_top..self.mem_end
    }

    pub fn heap_size(&self) -> u64 {
        self.stack_top - self.heap_start
    }
}

/// Align address up to boundary
pub const fn align_up(addr: u64, align: u64) -> Option<u64> {
    match addr.checked_add(align - 1) {
        Some(sum) => Some(sum & !(align - 1)),
        None => None,
    }
}

/// Align address down to boundary
pub const fn align_down(addr: u64, align: u64) -> u64 {
    addr & !(align - 1)
}

/// Compute the memory layout from the handoff's memory map
///
/// `image_end` is the first address past the loaded kernel image.
pub fn scan<H>(handoff: &H, image_end: u64, config: &PlatformConfig) -> Result<MemoryLayout>
where
    H: BootHandoff + ?Sized,
{
    if !handoff.flags().contains(InfoFlags::MEM_MAP) {
        return Err(BootError::MemoryMapMissing);
    }
    scan_map(handoff.memory_map(), image_end, config)
}

/// Compute the memory layout from raw memory map bytes
pub fn scan_map(map: &[u8], image_end: u64, config: &PlatformConfig) -> Result<MemoryLayout> {
    let mut region = None;
    for record in MemoryMapRecords::new(map) {
        let record = record?;
        log::debug!(
            "mmap: {:#x}-{:#x} {:?}",
            record.base,
            record.end(),
            record.kind
        );
        if record.base == config.mem_start && record.kind.is_available() {
            region = Some(record);
            break;
        }
    }
    let region = region.ok_or(BootError::NoUsableMemoryFound)?;

    // Boot page tables only cover up to max_mem_addr
    let mem_end = align_down(region.end().min(config.max_mem_addr), config.page_size);
    if image_end > mem_end {
        return Err(BootError::ImageExceedsMemory { image_end, mem_end });
    }

    let heap_start = align_up(image_end, config.page_size)
        .ok_or(BootError::ImageExceedsMemory { image_end, mem_end })?;
    let stack_top = mem_end
        .checked_sub(config.stack_size)
        .filter(|&top| top >= heap_start)
        .ok_or(BootError::StackOverlapsHeap {
            heap_start,
            stack_top: mem_end.saturating_sub(config.stack_size),
        })?;

    Ok(MemoryLayout { heap_start, stack_top, mem_end })
}
