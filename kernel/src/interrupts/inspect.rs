//! Halt-for-inspection path taken by vectors without a real handler.

use core::fmt;

use super::frame::CapturedFrame;

/// One-line description of an unexpected vector delivery.
pub struct Report<'a, F> {
    name: &'a str,
    frame: &'a F,
}

impl<'a, F: CapturedFrame> Report<'a, F> {
    pub fn new(name: &'a str, frame: &'a F) -> Self {
        Report { name, frame }
    }
}

impl<F: CapturedFrame> fmt::Display for Report<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ignoring {} (rip {:#x}, cs {:#x}",
            self.name,
            self.frame.instruction_pointer().as_u64(),
            self.frame.code_segment().0
        )?;
        if let Some(code) = self.frame.error_code() {
            write!(f, ", error code {:#x}", code)?;
        }
        if self.frame.from_user() {
            write!(f, ", from user")?;
        }
        write!(f, ")")
    }
}

/// Body of every generated default handler: report the vector and stop.
pub fn unimplemented_vector<F: CapturedFrame>(name: &str, frame: &F) -> ! {
    crate::trap_println!("{}", Report::new(name, frame));
    crate::trap_println!("{:#x?}", frame);
    halt()
}

/// Masks interrupts and parks the core for a debugger.
pub fn halt() -> ! {
    super::disable();
    crate::idle_loop()
}
