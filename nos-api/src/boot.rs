//! Boot handoff structures
//!
//! This module defines the Multiboot (version 1) information block that a
//! hypervisor or bootloader passes to the guest, and a codec for the
//! variable-stride memory map it points to.
//!
//! The memory map is decoded from a byte slice rather than by casting raw
//! pointers, so every bound is checked against the reported map length.

use core::fmt;
use core::mem::{offset_of, size_of};

use bitflags::bitflags;
use static_assertions::{const_assert_eq, const_assert};

bitflags! {
    /// Validity bits of the Multiboot information block
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InfoFlags: u32 {
        const MEMORY = 1 << 0;
        const BOOTDEV = 1 << 1;
        /// `cmdline` holds the address of a null-terminated string
        const CMDLINE = 1 << 2;
        const MODS = 1 << 3;
        const AOUT_SYMS = 1 << 4;
        const ELF_SHDR = 1 << 5;
        /// `mmap_addr` / `mmap_length` describe a memory map
        const MEM_MAP = 1 << 6;
        const DRIVE_INFO = 1 << 7;
        const CONFIG_TABLE = 1 << 8;
        const BOOT_LOADER_NAME = 1 << 9;
        const APM_TABLE = 1 << 10;
        const VBE_INFO = 1 << 11;
        const FRAMEBUFFER_INFO = 1 << 12;

        // Loaders may set bits this revision does not know about
        const _ = !0;
    }
}

/// Multiboot information block
///
/// Field offsets are fixed by the Multiboot specification; all addresses
/// are 32-bit physical addresses.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct MultibootInfo {
    /// Raw validity bits, see [`InfoFlags`]
    pub flags: u32,
    /// Lower memory in KiB (valid with `MEMORY`)
    pub mem_lower: u32,
    /// Upper memory in KiB (valid with `MEMORY`)
    pub mem_upper: u32,
    pub boot_device: u32,
    /// Physical address of the command line (valid with `CMDLINE`)
    pub cmdline: u32,
    pub mods_count: u32,
    pub mods_addr: u32,
    pub syms: [u32; 4],
    /// Byte length of the memory map (valid with `MEM_MAP`)
    pub mmap_length: u32,
    /// Physical address of the first memory map record (valid with `MEM_MAP`)
    pub mmap_addr: u32,
    pub drives_length: u32,
    pub drives_addr: u32,
    pub config_table: u32,
    /// Physical address of the loader name string (valid with `BOOT_LOADER_NAME`)
    pub boot_loader_name: u32,
    pub apm_table: u32,
}

const_assert_eq!(offset_of!(MultibootInfo, cmdline), 16);
const_assert_eq!(offset_of!(MultibootInfo, mmap_length), 44);
const_assert_eq!(offset_of!(MultibootInfo, mmap_addr), 48);
const_assert_eq!(offset_of!(MultibootInfo, boot_loader_name), 64);
const_assert_eq!(size_of::<MultibootInfo>(), 72);

impl MultibootInfo {
    /// Create an empty information block with no valid fields
    pub const fn new() -> Self {
        Self {
            flags: 0,
            mem_lower: 0,
            mem_upper: 0,
            boot_device: 0,
            cmdline: 0,
            mods_count: 0,
            mods_addr: 0,
            syms: [0; 4],
            mmap_length: 0,
            mmap_addr: 0,
            drives_length: 0,
            drives_addr: 0,
            config_table: 0,
            boot_loader_name: 0,
            apm_table: 0,
        }
    }

    /// Get the validity bits
    pub fn info_flags(&self) -> InfoFlags {
        InfoFlags::from_bits_retain(self.flags)
    }

    /// Check if a command line was supplied
    pub fn has_command_line(&self) -> bool {
        self.info_flags().contains(InfoFlags::CMDLINE)
    }

    /// Check if a memory map was supplied
    pub fn has_memory_map(&self) -> bool {
        self.info_flags().contains(InfoFlags::MEM_MAP)
    }
}

impl Default for MultibootInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// Memory region types reported in the memory map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryType {
    Available,
    Reserved,
    AcpiReclaimable,
    Nvs,
    BadRam,
    /// Any tag this revision does not define; treated as reserved
    Other(u32),
}

impl MemoryType {
    pub const fn from_raw(tag: u32) -> Self {
        match tag {
            1 => MemoryType::Available,
            2 => MemoryType::Reserved,
            3 => MemoryType::AcpiReclaimable,
            4 => MemoryType::Nvs,
            5 => MemoryType::BadRam,
            other => MemoryType::Other(other),
        }
    }

    pub const fn as_raw(&self) -> u32 {
        match self {
            MemoryType::Available => 1,
            MemoryType::Reserved => 2,
            MemoryType::AcpiReclaimable => 3,
            MemoryType::Nvs => 4,
            MemoryType::BadRam => 5,
            MemoryType::Other(tag) => *tag,
        }
    }

    /// Check if the region may be handed to the kernel
    pub const fn is_available(&self) -> bool {
        matches!(self, MemoryType::Available)
    }
}

/// One decoded memory map record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMapRecord {
    /// Self-reported size of the record, not counting the size field itself
    pub size: u32,
    /// Physical base address
    pub base: u64,
    /// Length in bytes
    pub length: u64,
    /// Region type
    pub kind: MemoryType,
}

impl MemoryMapRecord {
    /// Width of the leading size field
    pub const SIZE_FIELD_LEN: usize = size_of::<u32>();
    /// Bytes following the size field that every record must carry
    pub const BODY_LEN: usize = 20;
    /// Length of a record as emitted by common loaders
    pub const ENCODED_LEN: usize = Self::SIZE_FIELD_LEN + Self::BODY_LEN;

    /// Distance from this record to the next one
    pub fn stride(&self) -> usize {
        self.size as usize + Self::SIZE_FIELD_LEN
    }

    /// Exclusive end address, saturating at the top of the address space
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.length)
    }

    /// Encode the record in wire format with the standard 20-byte body
    pub fn encode(base: u64, length: u64, kind: MemoryType) -> [u8; Self::ENCODED_LEN] {
        let mut bytes = [0u8; Self::ENCODED_LEN];
        bytes[0..4].copy_from_slice(&(Self::BODY_LEN as u32).to_le_bytes());
        bytes[4..12].copy_from_slice(&base.to_le_bytes());
        bytes[12..20].copy_from_slice(&length.to_le_bytes());
        bytes[20..24].copy_from_slice(&kind.as_raw().to_le_bytes());
        bytes
    }
}

const_assert!(MemoryMapRecord::ENCODED_LEN == 24);

/// Memory map decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// Record at `offset` runs past the end of the map
    Truncated { offset: usize },
    /// Record at `offset` reports a size smaller than the mandatory body
    ShortRecord { offset: usize, size: u32 },
}

impl MapError {
    /// Byte offset of the offending record
    pub fn offset(&self) -> usize {
        match self {
            MapError::Truncated { offset } | MapError::ShortRecord { offset, .. } => *offset,
        }
    }
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::Truncated { offset } => {
                write!(f, "memory map record at offset {} is truncated", offset)
            }
            MapError::ShortRecord { offset, size } => {
                write!(f, "memory map record at offset {} reports size {}", offset, size)
            }
        }
    }
}

/// Iterator over the records of a memory map
///
/// Stops after the first decoding error.
pub struct MemoryMapRecords<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> MemoryMapRecords<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Byte offset of the next record to decode
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn decode_at(&self, offset: usize) -> Result<MemoryMapRecord, MapError> {
        let record = self.bytes.get(offset..).ok_or(MapError::Truncated { offset })?;
        if record.len() < MemoryMapRecord::ENCODED_LEN {
            return Err(MapError::Truncated { offset });
        }

        let size = read_u32(record, 0);
        if (size as usize) < MemoryMapRecord::BODY_LEN {
            return Err(MapError::ShortRecord { offset, size });
        }

        Ok(MemoryMapRecord {
            size,
            base: read_u64(record, 4),
            length: read_u64(record, 12),
            kind: MemoryType::from_raw(read_u32(record, 20)),
        })
    }
}

impl Iterator for MemoryMapRecords<'_> {
    type Item = Result<MemoryMapRecord, MapError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }

        match self.decode_at(self.offset) {
            Ok(record) => {
                self.offset = self.offset.saturating_add(record.stride());
                Some(Ok(record))
            }
            Err(err) => {
                self.offset = self.bytes.len();
                Some(Err(err))
            }
        }
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(raw)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(records: &[[u8; MemoryMapRecord::ENCODED_LEN]]) -> Vec<u8> {
        records.iter().flat_map(|r| r.iter().copied()).collect()
    }

    #[test]
    fn test_flags_keep_unknown_bits() {
        let mut info = MultibootInfo::new();
        info.flags = InfoFlags::CMDLINE.bits() | (1 << 20);
        assert!(info.has_command_line());
        assert!(!info.has_memory_map());
        assert_eq!(info.info_flags().bits(), info.flags);
    }

    #[test]
    fn test_memory_type_tags() {
        assert_eq!(MemoryType::from_raw(1), MemoryType::Available);
        assert_eq!(MemoryType::from_raw(2), MemoryType::Reserved);
        assert_eq!(MemoryType::from_raw(42), MemoryType::Other(42));
        assert_eq!(MemoryType::BadRam.as_raw(), 5);
    }

    #[test]
    fn test_records_decode_in_order() {
        let map = map_of(&[
            MemoryMapRecord::encode(0, 0x9FC00, MemoryType::Available),
            MemoryMapRecord::encode(0xF0000, 0x10000, MemoryType::Reserved),
            MemoryMapRecord::encode(0x100000, 0x7EE0000, MemoryType::Available),
        ]);

        let records: Vec<_> = MemoryMapRecords::new(&map).collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].kind, MemoryType::Reserved);
        assert_eq!(records[2].base, 0x100000);
        assert_eq!(records[2].end(), 0x7FE0000);
    }

    #[test]
    fn test_records_follow_self_reported_stride() {
        // First record carries 8 bytes of vendor padding after its body
        let mut map = Vec::new();
        map.extend_from_slice(&28u32.to_le_bytes());
        map.extend_from_slice(&0u64.to_le_bytes());
        map.extend_from_slice(&0x1000u64.to_le_bytes());
        map.extend_from_slice(&2u32.to_le_bytes());
        map.extend_from_slice(&[0xAA; 8]);
        map.extend_from_slice(&MemoryMapRecord::encode(0x100000, 0x2000, MemoryType::Available));

        let mut records = MemoryMapRecords::new(&map);
        assert_eq!(records.next().unwrap().unwrap().stride(), 32);
        let second = records.next().unwrap().unwrap();
        assert_eq!(second.base, 0x100000);
        assert!(records.next().is_none());
    }

    #[test]
    fn test_truncated_tail_is_reported_once() {
        let mut map = map_of(&[MemoryMapRecord::encode(0, 0x1000, MemoryType::Available)]);
        map.extend_from_slice(&[20, 0, 0, 0, 1, 2]);

        let mut records = MemoryMapRecords::new(&map);
        assert!(records.next().unwrap().is_ok());
        assert_eq!(records.next(), Some(Err(MapError::Truncated { offset: 24 })));
        assert_eq!(records.next(), None);
    }

    #[test]
    fn test_short_record_is_rejected() {
        let mut raw = MemoryMapRecord::encode(0, 0x1000, MemoryType::Available);
        raw[0..4].copy_from_slice(&4u32.to_le_bytes());

        let err = MemoryMapRecords::new(&raw).next().unwrap().unwrap_err();
        assert_eq!(err, MapError::ShortRecord { offset: 0, size: 4 });
        assert_eq!(err.offset(), 0);
    }

    #[test]
    fn test_empty_map_yields_nothing() {
        assert!(MemoryMapRecords::new(&[]).next().is_none());
    }

    proptest::proptest! {
        #[test]
        fn prop_arbitrary_bytes_never_overrun(bytes in proptest::collection::vec(proptest::num::u8::ANY, 0..256)) {
            let mut errors = 0;
            for item in MemoryMapRecords::new(&bytes) {
                match item {
                    Ok(record) => {
                        proptest::prop_assert!(record.size as usize >= MemoryMapRecord::BODY_LEN);
                    }
                    Err(err) => {
                        errors += 1;
                        proptest::prop_assert!(err.offset() < bytes.len());
                    }
                }
            }
            proptest::prop_assert!(errors <= 1);
        }
    }
}
