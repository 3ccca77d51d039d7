//! Interrupt plumbing shared by the generated trampolines, installer and
//! default handlers.
//!
//! This module provides:
//! - Gate descriptors and the descriptor table (`gate`)
//! - The two register-capture frame layouts (`frame`)
//! - Boot-time installation and loading of the table (`idt`)
//! - The halt-for-inspection path of unimplemented vectors (`inspect`)

use x86_64::instructions::interrupts;

pub mod frame;
pub mod gate;
pub mod idt;
pub mod inspect;

/// Enables interrupts on the current CPU.
pub fn enable() {
    interrupts::enable();
}

/// Disables interrupts on the current CPU.
pub fn disable() {
    interrupts::disable();
}

/// Checks if interrupts are enabled on the current CPU.
pub fn are_enabled() -> bool {
    interrupts::are_enabled()
}
