//! Interrupt Descriptor Table configuration.
//!
//! Vector numbers for every slot the kernel installs, plus the bit layout of
//! a long-mode gate descriptor.

/// Number of slots in the descriptor table.
pub const IDT_ENTRIES: usize = 256;

/// Size in bytes of one long-mode gate descriptor.
pub const GATE_SIZE: usize = 16;

/// First vector outside the processor exception range.
pub const FIRST_EXTERNAL_VECTOR: u8 = 32;

/// `type_attr` present bit.
pub const GATE_PRESENT: u8 = 0x80;
/// `type_attr` DPL field shift.
pub const GATE_DPL_SHIFT: u8 = 5;
/// `type_attr` DPL field mask (before shifting).
pub const GATE_DPL_MASK: u8 = 0b11;
/// 64-bit interrupt gate type.
pub const GATE_TYPE_INTERRUPT: u8 = 0xE;
/// 64-bit trap gate type.
pub const GATE_TYPE_TRAP: u8 = 0xF;

// Processor exceptions.
pub const DIVIDE_ERROR: u8 = 0;
pub const DEBUG: u8 = 1;
pub const NON_MASKABLE_INTERRUPT: u8 = 2;
pub const BREAKPOINT: u8 = 3;
pub const OVERFLOW: u8 = 4;
pub const BOUND_RANGE_EXCEEDED: u8 = 5;
pub const INVALID_OPCODE: u8 = 6;
pub const DEVICE_NOT_AVAILABLE: u8 = 7;
pub const DOUBLE_FAULT: u8 = 8;
pub const INVALID_TSS: u8 = 10;
pub const SEGMENT_NOT_PRESENT: u8 = 11;
pub const STACK_SEGMENT_FAULT: u8 = 12;
pub const GENERAL_PROTECTION: u8 = 13;
pub const PAGE_FAULT: u8 = 14;
pub const X87_FLOATING_POINT: u8 = 16;
pub const ALIGNMENT_CHECK: u8 = 17;
pub const MACHINE_CHECK: u8 = 18;
pub const SIMD_FLOATING_POINT: u8 = 19;

/// Exceptions for which the processor pushes an error code.
pub const ERROR_CODE_VECTORS: [u8; 10] = [8, 10, 11, 12, 13, 14, 17, 21, 29, 30];

/// Exception slots reserved by the architecture.
pub const RESERVED_VECTORS: [u8; 8] = [15, 22, 23, 24, 25, 26, 27, 31];

// Device interrupts (remapped PIC lines).
pub const TIMER_VECTOR: u8 = 0x20;
pub const KEYBOARD_VECTOR: u8 = 0x21;

// System call software interrupts.
pub const SYSCALL: u8 = 0x40;
pub const FORK: u8 = 0x41;
pub const EXEC: u8 = 0x42;
pub const WAIT: u8 = 0x44;
pub const DESCHEDULE: u8 = 0x45;
pub const MAKE_RUNNABLE: u8 = 0x46;
pub const GETTID: u8 = 0x47;
pub const NEW_PAGES: u8 = 0x48;
pub const REMOVE_PAGES: u8 = 0x49;
pub const SLEEP: u8 = 0x4A;
pub const GETCHAR: u8 = 0x4B;
pub const READLINE: u8 = 0x4C;
pub const PRINT: u8 = 0x4D;
pub const SET_TERM_COLOR: u8 = 0x4E;
pub const SET_CURSOR_POS: u8 = 0x4F;
pub const GET_CURSOR_POS: u8 = 0x50;
pub const THREAD_FORK: u8 = 0x52;
pub const GET_TICKS: u8 = 0x53;
pub const YIELD: u8 = 0x54;
pub const MISBEHAVE: u8 = 0x55;
pub const HALT: u8 = 0x56;
pub const LS: u8 = 0x57;
pub const TASK_VANISH: u8 = 0x58;
pub const SET_STATUS: u8 = 0x59;
pub const VANISH: u8 = 0x60;
