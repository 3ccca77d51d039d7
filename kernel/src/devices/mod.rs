//! Devices the interrupt layer reports through.

pub mod serial;
