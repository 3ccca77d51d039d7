//! Interrupt and trap dispatch configuration for the kernel.
//!
//! Two halves share this crate:
//! - `codegen` turns the compiled-in vector registry into the trampoline,
//!   declaration, installer and default-handler sources the kernel builds.
//! - `interrupts` is what those sources link against at boot: the gate
//!   table, the register-capture frames and the halt-for-inspection path.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]
extern crate alloc;

use x86_64::instructions::hlt;

pub mod codegen;
pub mod constants;
pub mod devices;
pub mod interrupts;
pub mod logging;

pub use devices::serial;

pub fn idle_loop() -> ! {
    loop {
        hlt();
    }
}
