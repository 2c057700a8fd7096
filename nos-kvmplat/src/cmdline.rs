//! Kernel command line
//!
//! The loader's command line lives in memory the kernel is about to take
//! over, so it is copied into a fixed-capacity buffer before the memory
//! layout is committed.

use core::ffi::CStr;

use nos_api::boot::InfoFlags;

use crate::config::DEFAULT_CMDLINE;
use crate::handoff::BootHandoff;

/// Fixed-capacity, always null-terminated command-line buffer
pub struct CommandLine<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> CommandLine<N> {
    /// Create an empty command line
    pub const fn new() -> Self {
        const { assert!(N > 0, "command line needs room for the terminator") };
        Self { bytes: [0; N] }
    }

    /// Buffer size, terminator included
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Replace the contents with `src`, truncating to `N - 1` bytes
    ///
    /// Returns the number of bytes kept. Copying stops early at an
    /// embedded nul.
    pub fn set(&mut self, src: &[u8]) -> usize {
        let src = match src.iter().position(|&b| b == 0) {
            Some(nul) => &src[..nul],
            None => src,
        };
        let len = src.len().min(N - 1);
        self.bytes[..len].copy_from_slice(&src[..len]);
        self.bytes[len] = 0;
        len
    }

    /// Contents up to the terminator
    pub fn as_bytes(&self) -> &[u8] {
        self.as_c_str().to_bytes()
    }

    pub fn as_c_str(&self) -> &CStr {
        // Every write path leaves a terminator inside the buffer
        CStr::from_bytes_until_nul(&self.bytes).unwrap_or(c"")
    }

    /// Contents as text, if they are valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    /// Whole backing buffer, terminator and trailing zeroes included
    pub fn buffer(&self) -> &[u8; N] {
        &self.bytes
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }
}

impl<const N: usize> Default for CommandLine<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for CommandLine<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandLine")
            .field("capacity", &N)
            .field("value", &self.as_c_str())
            .finish()
    }
}

/// Outcome of [`extract`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// No command line supplied; the default identifier was used
    Default,
    /// Copied in full
    Copied { len: usize },
    /// Source was `source_len` bytes; only `len` were kept
    Truncated { len: usize, source_len: usize },
}

impl Extraction {
    pub fn is_truncated(&self) -> bool {
        matches!(self, Extraction::Truncated { .. })
    }
}

/// Copy the loader's command line into `cmdline`
///
/// Falls back to [`DEFAULT_CMDLINE`] when the handoff has none. A source
/// that does not fit is cut to `N - 1` bytes and reported once.
pub fn extract<H, const N: usize>(handoff: &H, cmdline: &mut CommandLine<N>) -> Extraction
where
    H: BootHandoff + ?Sized,
{
    let source = if handoff.flags().contains(InfoFlags::CMDLINE) {
        handoff.command_line()
    } else {
        None
    };

    let Some(source) = source else {
        log::info!("No command line found");
        cmdline.set(DEFAULT_CMDLINE.as_bytes());
        return Extraction::Default;
    };

    let source_len = source.iter().position(|&b| b == 0).unwrap_or(source.len());
    let len = cmdline.set(source);
    if len < source_len {
        log::info!("Command line too long, truncated");
        Extraction::Truncated { len, source_len }
    } else {
        Extraction::Copied { len }
    }
}
