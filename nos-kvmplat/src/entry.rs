//! Platform entry sequence
//!
//! Runs once, on the loader's stack, with the loader's metadata still in
//! place:
//!
//! 1. console, then the console logger
//! 2. FPU/SSE reset, then the low-level CPU setup
//! 3. banner
//! 4. command line copied out of loader memory into the slot
//! 5. memory layout derived and committed together with the command line
//! 6. switch to the new stack and continue in [`trampoline`]
//!
//! Step 4 has to precede step 5: once the layout is committed the loader's
//! memory may be reused and the handoff can no longer be trusted.

use core::ffi::c_void;

use spin::{Mutex, MutexGuard, Once};

use crate::cmdline::{self, CommandLine};
use crate::config::{CMDLINE_CAPACITY, KVM_X86_64};
use crate::cpu;
use crate::error::BootError;
use crate::handoff::BootHandoff;
use crate::logger::{self, ConsoleSink};
use crate::memory::{self, MemoryLayout};
use crate::stack::StackSwitch;

/// Services the entry sequence relies on but does not implement
pub trait Platform {
    /// Bring up the console; runs before anything is logged
    fn init_console();

    /// Write to the console
    fn console_write(s: &str);

    /// Architecture-specific CPU setup (descriptor tables, traps)
    fn cpu_init();

    /// First address past the loaded kernel image
    fn image_end() -> u64;

    /// Platform-independent kernel entry point
    fn enter(cmdline: &'static CommandLine<CMDLINE_CAPACITY>) -> !;

    /// Stop the machine after a fatal error
    fn halt() -> !;
}

/// State established by the entry sequence
///
/// Committed once and read-only afterwards.
#[derive(Debug, Clone, Copy)]
pub struct BootContext {
    pub cmdline: &'static CommandLine<CMDLINE_CAPACITY>,
    pub layout: MemoryLayout,
}

/// Durable storage the entry sequence commits into
///
/// The command-line buffer lives here rather than on the bootstrap stack.
/// It is claimed by the first entry and stays claimed for good.
pub struct BootSlot {
    cmdline: Mutex<CommandLine<CMDLINE_CAPACITY>>,
    context: Once<BootContext>,
}

impl BootSlot {
    pub const fn new() -> Self {
        Self {
            cmdline: Mutex::new(CommandLine::new()),
            context: Once::new(),
        }
    }

    /// Committed context, if the entry sequence got that far
    pub fn context(&self) -> Option<&BootContext> {
        self.context.get()
    }

    /// Exclusive access to the command-line buffer, once per slot
    fn claim_cmdline(&'static self) -> Option<&'static mut CommandLine<CMDLINE_CAPACITY>> {
        self.cmdline.try_lock().map(MutexGuard::leak)
    }
}

impl Default for BootSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide boot slot of the running system
pub static BOOT_SLOT: BootSlot = BootSlot::new();

/// Boot context committed by the entry sequence, if it has run
pub fn boot_context() -> Option<&'static BootContext> {
    BOOT_SLOT.context()
}

/// Memory layout committed by the entry sequence, if it has run
pub fn memory_layout() -> Option<MemoryLayout> {
    boot_context().map(|ctx| ctx.layout)
}

/// Log a fatal error and stop the platform
pub fn fatal<P: Platform>(err: BootError) -> ! {
    log::error!("{}", err);
    P::halt()
}

/// Run the entry sequence and hand over to `P::enter`
///
/// `slot` must not be on the loader's stack. Nothing larger than a few
/// words is built on the current stack before the switch.
pub fn boot<P, S, H>(handoff: &H, slot: &'static BootSlot) -> !
where
    P: Platform,
    S: StackSwitch,
    H: BootHandoff + ?Sized,
{
    P::init_console();
    logger::init(P::console_write as ConsoleSink);

    cpu::init_cpu_features();
    P::cpu_init();

    log::info!("Entering from KVM (x86)...");
    log::info!("     multiboot: {:#x}", handoff.address());
    if let Some(name) = handoff.boot_loader_name() {
        log::debug!("   boot loader: {}", core::str::from_utf8(name).unwrap_or("?"));
    }

    let Some(cmdline) = slot.claim_cmdline() else {
        fatal::<P>(BootError::AlreadyBooted);
    };
    cmdline::extract(handoff, cmdline);
    let cmdline: &'static CommandLine<CMDLINE_CAPACITY> = cmdline;

    let layout = match memory::scan(handoff, P::image_end(), &KVM_X86_64) {
        Ok(layout) => layout,
        Err(err) => fatal::<P>(err),
    };
    let ctx = slot.context.call_once(|| BootContext { cmdline, layout });

    log::info!("    heap start: {:#x}", ctx.layout.heap_start);
    log::info!("     stack top: {:#x}", ctx.layout.stack_top);

    log::info!("Switch from bootstrap stack to stack @{:#x}", ctx.layout.mem_end);
    let arg = ctx as *const BootContext as *mut c_void;
    // SAFETY: mem_end tops a region of at least stack_size bytes that
    // nothing else owns yet; arg points into `slot`, which is 'static.
    unsafe { S::switch_stack(ctx.layout.mem_end, trampoline::<P>, arg) }
}

/// Continuation on the new stack
///
/// `arg` is the committed [`BootContext`].
pub extern "C" fn trampoline<P: Platform>(arg: *mut c_void) -> ! {
    // SAFETY: boot passes a pointer into its 'static slot
    let Some(ctx) = (unsafe { (arg as *const BootContext).as_ref() }) else {
        fatal::<P>(BootError::ContextNotCommitted);
    };
    P::enter(ctx.cmdline)
}
