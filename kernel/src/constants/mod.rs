//! System-wide constants and hardware-specific values.

pub mod gdt;
pub mod idt;
pub mod ports;
