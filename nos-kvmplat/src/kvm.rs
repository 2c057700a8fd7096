//! KVM guest bindings
//!
//! Connects the entry sequence to the symbols the rest of the image
//! provides: console driver, low-level CPU setup, the platform-independent
//! entry point and the linker-defined end of the image.

use core::ffi::{c_char, c_void};

use nos_api::boot::MultibootInfo;

use crate::cmdline::CommandLine;
use crate::config::CMDLINE_CAPACITY;
use crate::cpu;
use crate::entry::{self, BOOT_SLOT, Platform};
use crate::error::BootError;
use crate::handoff::MultibootHandoff;
use crate::logger;
use crate::stack::NativeStack;

unsafe extern "C" {
    /// End of the loaded image, from the linker script
    static _end: u8;

    fn nos_console_init();
    fn nos_console_write(buf: *const u8, len: usize);
    fn nos_cpu_init();
    fn nos_entry_argp(argv0: *const c_char, cmdline: *const c_char, maxlen: usize) -> !;
}

pub struct KvmPlatform;

impl Platform for KvmPlatform {
    fn init_console() {
        // SAFETY: called once, before any output
        unsafe { nos_console_init() }
    }

    fn console_write(s: &str) {
        // SAFETY: the console driver only reads `len` bytes from `buf`
        unsafe { nos_console_write(s.as_ptr(), s.len()) }
    }

    fn cpu_init() {
        // SAFETY: runs once on the boot CPU after the FPU reset
        unsafe { nos_cpu_init() }
    }

    fn image_end() -> u64 {
        (&raw const _end) as u64
    }

    fn enter(cmdline: &'static CommandLine<CMDLINE_CAPACITY>) -> ! {
        // SAFETY: the buffer is 'static, terminated and `capacity()` bytes long
        unsafe {
            nos_entry_argp(
                core::ptr::null(),
                cmdline.as_ptr() as *const c_char,
                cmdline.capacity(),
            )
        }
    }

    fn halt() -> ! {
        cpu::halt()
    }
}

/// Entry point jumped to by the boot stub, with the Multiboot
/// information pointer as its only argument
///
/// # Safety
///
/// Must be called exactly once, by the boot stub, with interrupts off and
/// `arg` pointing to the loader's information block.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nos_kvmplat_entry(arg: *mut c_void) -> ! {
    // SAFETY: the loader's block and everything it references stay
    // readable until the layout is committed
    match unsafe { MultibootHandoff::from_ptr(arg as *const MultibootInfo) } {
        Some(handoff) => entry::boot::<KvmPlatform, NativeStack, _>(&handoff, &BOOT_SLOT),
        None => {
            KvmPlatform::init_console();
            logger::init(KvmPlatform::console_write);
            entry::fatal::<KvmPlatform>(BootError::NoHandoff)
        }
    }
}
