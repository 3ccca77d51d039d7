//! Register-capture frames handed to interrupt handlers.
//!
//! A trampoline pushes the general registers directly below whatever the
//! processor pushed, then passes the resulting stack pointer to the handler.
//! The handler therefore sees one of two layouts, depending on whether the
//! processor pushed an error code for the vector:
//!
//! ```text
//!  offset  RegisterFrame   ErrorRegisterFrame
//!  0       rax             rax
//!  8       rbx             rbx
//!  ...     ...             ...
//!  112     rbp             rbp
//!  120     rip             error_code
//!  128     cs              rip
//!  ...     ...             ...
//! ```
//!
//! Both layouts are fixed: saved-thread inspection tools parse them straight
//! out of memory, so field order must never change.

use core::fmt;

use x86_64::{structures::gdt::SegmentSelector, PrivilegeLevel, VirtAddr};

/// Registers captured for a vector without a processor error code.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterFrame {
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub rbp: u64,
    // pushed by the processor
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// Registers captured for a vector where the processor pushes an error code.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorRegisterFrame {
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub rbp: u64,
    // pushed by the processor
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// Registers a trampoline saves itself, `rax` through `rbp`.
pub const GENERAL_REGISTERS: usize = 15;

/// The two capture layouts a trampoline and its handler can agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameShape {
    Plain,
    WithErrorCode,
}

/// One named slot of a capture frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameField {
    pub name: &'static str,
    pub offset: usize,
}

const fn field(name: &'static str, offset: usize) -> FrameField {
    FrameField { name, offset }
}

static PLAIN_FIELDS: [FrameField; 20] = [
    field("rax", 0),
    field("rbx", 8),
    field("rcx", 16),
    field("rdx", 24),
    field("rsi", 32),
    field("rdi", 40),
    field("r8", 48),
    field("r9", 56),
    field("r10", 64),
    field("r11", 72),
    field("r12", 80),
    field("r13", 88),
    field("r14", 96),
    field("r15", 104),
    field("rbp", 112),
    field("rip", 120),
    field("cs", 128),
    field("rflags", 136),
    field("rsp", 144),
    field("ss", 152),
];

static ERROR_FIELDS: [FrameField; 21] = [
    field("rax", 0),
    field("rbx", 8),
    field("rcx", 16),
    field("rdx", 24),
    field("rsi", 32),
    field("rdi", 40),
    field("r8", 48),
    field("r9", 56),
    field("r10", 64),
    field("r11", 72),
    field("r12", 80),
    field("r13", 88),
    field("r14", 96),
    field("r15", 104),
    field("rbp", 112),
    field("error_code", 120),
    field("rip", 128),
    field("cs", 136),
    field("rflags", 144),
    field("rsp", 152),
    field("ss", 160),
];

impl FrameShape {
    pub const fn from_error_code(has_error_code: bool) -> Self {
        if has_error_code {
            FrameShape::WithErrorCode
        } else {
            FrameShape::Plain
        }
    }

    pub const fn has_error_code(self) -> bool {
        matches!(self, FrameShape::WithErrorCode)
    }

    /// Name of the Rust capture type a handler for this shape takes.
    pub const fn capture_type(self) -> &'static str {
        match self {
            FrameShape::Plain => "RegisterFrame",
            FrameShape::WithErrorCode => "ErrorRegisterFrame",
        }
    }

    /// Name of the assembly template that builds this shape.
    pub const fn template(self) -> &'static str {
        match self {
            FrameShape::Plain => "TRAMPOLINE",
            FrameShape::WithErrorCode => "TRAMPOLINE_ERR",
        }
    }

    pub const fn size(self) -> usize {
        match self {
            FrameShape::Plain => core::mem::size_of::<RegisterFrame>(),
            FrameShape::WithErrorCode => core::mem::size_of::<ErrorRegisterFrame>(),
        }
    }

    /// Field names and byte offsets, lowest address first.
    pub fn fields(self) -> &'static [FrameField] {
        match self {
            FrameShape::Plain => &PLAIN_FIELDS,
            FrameShape::WithErrorCode => &ERROR_FIELDS,
        }
    }
}

/// Common view over both capture layouts.
pub trait CapturedFrame: fmt::Debug {
    const SHAPE: FrameShape;

    fn instruction_pointer(&self) -> VirtAddr;

    fn code_segment(&self) -> SegmentSelector;

    fn error_code(&self) -> Option<u64>;

    /// Whether the interrupted code was running in ring 3.
    fn from_user(&self) -> bool {
        self.code_segment().rpl() == PrivilegeLevel::Ring3
    }
}

impl CapturedFrame for RegisterFrame {
    const SHAPE: FrameShape = FrameShape::Plain;

    fn instruction_pointer(&self) -> VirtAddr {
        VirtAddr::new_truncate(self.rip)
    }

    fn code_segment(&self) -> SegmentSelector {
        SegmentSelector(self.cs as u16)
    }

    fn error_code(&self) -> Option<u64> {
        None
    }
}

impl CapturedFrame for ErrorRegisterFrame {
    const SHAPE: FrameShape = FrameShape::WithErrorCode;

    fn instruction_pointer(&self) -> VirtAddr {
        VirtAddr::new_truncate(self.rip)
    }

    fn code_segment(&self) -> SegmentSelector {
        SegmentSelector(self.cs as u16)
    }

    fn error_code(&self) -> Option<u64> {
        Some(self.error_code)
    }
}

#[cfg(test)]
mod tests {
    use core::mem::{offset_of, size_of};

    use super::*;

    macro_rules! offsets {
        ($ty:ty, $($field:ident),+) => {
            [$((stringify!($field), offset_of!($ty, $field))),+]
        };
    }

    #[test]
    fn plain_layout_matches_table() {
        let actual = offsets!(
            RegisterFrame, rax, rbx, rcx, rdx, rsi, rdi, r8, r9, r10, r11, r12, r13, r14, r15,
            rbp, rip, cs, rflags, rsp, ss
        );
        let table = FrameShape::Plain.fields();
        assert_eq!(table.len(), actual.len());
        for (field, (name, offset)) in table.iter().zip(actual) {
            assert_eq!(field.name, name);
            assert_eq!(field.offset, offset, "{name}");
        }
        assert_eq!(FrameShape::Plain.size(), 160);
        assert_eq!(size_of::<RegisterFrame>(), 20 * 8);
    }

    #[test]
    fn error_layout_matches_table() {
        let actual = offsets!(
            ErrorRegisterFrame, rax, rbx, rcx, rdx, rsi, rdi, r8, r9, r10, r11, r12, r13, r14,
            r15, rbp, error_code, rip, cs, rflags, rsp, ss
        );
        let table = FrameShape::WithErrorCode.fields();
        assert_eq!(table.len(), actual.len());
        for (field, (name, offset)) in table.iter().zip(actual) {
            assert_eq!(field.name, name);
            assert_eq!(field.offset, offset, "{name}");
        }
        assert_eq!(FrameShape::WithErrorCode.size(), 168);
    }

    #[test]
    fn error_word_sits_between_registers_and_hardware_frame() {
        let plain_rbp = offset_of!(RegisterFrame, rbp);
        assert_eq!(offset_of!(ErrorRegisterFrame, rbp), plain_rbp);
        assert_eq!(offset_of!(ErrorRegisterFrame, error_code), plain_rbp + 8);
        assert_eq!(
            offset_of!(ErrorRegisterFrame, rip),
            offset_of!(RegisterFrame, rip) + 8
        );
    }

    #[test]
    fn shape_selection() {
        assert_eq!(FrameShape::from_error_code(true), FrameShape::WithErrorCode);
        assert_eq!(FrameShape::from_error_code(false), FrameShape::Plain);
        assert_eq!(RegisterFrame::SHAPE, FrameShape::Plain);
        assert_eq!(ErrorRegisterFrame::SHAPE, FrameShape::WithErrorCode);
        assert_ne!(
            FrameShape::Plain.capture_type(),
            FrameShape::WithErrorCode.capture_type()
        );
    }

    #[test]
    fn captured_frame_accessors() {
        let frame = ErrorRegisterFrame {
            error_code: 0x6,
            rip: 0x40_1000,
            cs: 0x23,
            ..Default::default()
        };
        assert_eq!(frame.error_code(), Some(0x6));
        assert_eq!(frame.instruction_pointer().as_u64(), 0x40_1000);
        assert!(frame.from_user());

        let frame = RegisterFrame {
            cs: 0x08,
            ..Default::default()
        };
        assert_eq!(frame.error_code(), None);
        assert!(!frame.from_user());
    }
}
