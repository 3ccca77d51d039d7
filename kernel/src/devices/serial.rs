//! Serial port interface for UART 16550 communication.
//!
//! Normal output goes through a locked COM1 handle. Output from a trap that
//! may have interrupted a writer goes through [`_print_trap`], which never
//! waits on that lock.

use core::fmt::Write;

use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

use crate::constants::ports::SERIAL_PORT;

lazy_static! {
    /// Thread-safe wrapper around the first serial port (COM1).
    /// Initializes the port on first access.
    pub static ref SERIAL1: Mutex<SerialPort> = {
        let mut serial_port = unsafe { SerialPort::new(SERIAL_PORT) };
        serial_port.init();
        Mutex::new(serial_port)
    };
}

#[doc(hidden)]
pub fn _print(args: ::core::fmt::Arguments) {
    let _ = SERIAL1.lock().write_fmt(args);
}

#[doc(hidden)]
pub fn _print_trap(args: ::core::fmt::Arguments) {
    match SERIAL1.try_lock() {
        Some(mut port) => {
            let _ = port.write_fmt(args);
        }
        None => {
            // The interrupted code holds the lock and will never release it
            // while this core is halted, so talk to the UART directly.
            let mut port = unsafe { SerialPort::new(SERIAL_PORT) };
            let _ = port.write_fmt(args);
        }
    }
}

/// Prints formatted text to the serial port.
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!($($arg)*))
    };
}

/// Prints formatted text to the serial port, followed by a newline.
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}

/// Like `serial_println!`, but safe to call from a trap handler.
#[macro_export]
macro_rules! trap_println {
    ($($arg:tt)*) => {
        $crate::serial::_print_trap(format_args!("{}\n", format_args!($($arg)*)))
    };
}
