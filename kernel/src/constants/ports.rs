//! I/O port definitions.

/// Base I/O port address for COM1, where boot logs and trap reports go.
pub const SERIAL_PORT: u16 = 0x3F8;
