//! Processor feature reset
//!
//! The loader makes no promises about x87/SSE state, so it is forced back
//! to the architectural defaults before any floating-point code runs.

/// MXCSR value after reset: all exceptions masked, round to nearest
pub const MXCSR_DEFAULT: u32 = 0x1F80;

/// Reset floating-point and SIMD state
///
/// Must run before any floating-point or vector instruction executes.
#[cfg(target_arch = "x86_64")]
pub fn init_cpu_features() {
    // SAFETY: fninit and ldmxcsr only touch FPU/SSE control state, which
    // nothing has initialised yet.
    unsafe {
        core::arch::asm!("fninit", options(nomem, nostack));

        #[cfg(target_feature = "sse")]
        {
            let mxcsr = MXCSR_DEFAULT;
            core::arch::asm!(
                "ldmxcsr [{}]",
                in(reg) &raw const mxcsr,
                options(readonly, nostack)
            );
        }
    }
}

#[cfg(not(target_arch = "x86_64"))]
pub fn init_cpu_features() {}

/// Stop this CPU for good
#[cfg(target_arch = "x86_64")]
pub fn halt() -> ! {
    loop {
        // SAFETY: masking interrupts and halting has no memory effects
        unsafe { core::arch::asm!("cli", "hlt", options(nomem, nostack)) };
    }
}

#[cfg(not(target_arch = "x86_64"))]
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
