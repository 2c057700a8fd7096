//! Bootstrap stack switch
//!
//! The loader's stack has unknown size and may sit in memory the kernel
//! is about to reuse. Entry leaves it as soon as the layout is known, with
//! a one-way jump onto the new stack.

use core::ffi::c_void;

/// Code that runs once the stack has been switched
pub type Continuation = extern "C" fn(*mut c_void) -> !;

/// Architecture primitive that moves execution onto a new stack
pub trait StackSwitch {
    /// Load `stack_top` into the stack pointer, then call
    /// `continuation(arg)` on the new stack
    ///
    /// # Safety
    ///
    /// - `stack_top` must be the exclusive top of a writable region large
    ///   enough for everything `continuation` does
    /// - nothing `continuation` needs may live on the current stack; `arg`
    ///   must point to storage that outlives the switch
    unsafe fn switch_stack(stack_top: u64, continuation: Continuation, arg: *mut c_void) -> !;
}

/// Native stack switch for the build target
pub struct NativeStack;

#[cfg(target_arch = "x86_64")]
impl StackSwitch for NativeStack {
    unsafe fn switch_stack(stack_top: u64, continuation: Continuation, arg: *mut c_void) -> ! {
        // SAFETY: forwarded caller contract
        unsafe { switch_stack_and_call(stack_top, continuation, arg) }
    }
}

/// rdi = stack top, rsi = continuation, rdx = arg (SysV)
#[cfg(target_arch = "x86_64")]
#[unsafe(naked)]
unsafe extern "C" fn switch_stack_and_call(
    _stack_top: u64,
    _continuation: Continuation,
    _arg: *mut c_void,
) -> ! {
    core::arch::naked_asm!(
        "mov rsp, rdi",
        "and rsp, -16",
        // No return address to unwind through
        "xor ebp, ebp",
        "mov rdi, rdx",
        "call rsi",
        "ud2",
    );
}
