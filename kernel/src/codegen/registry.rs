//! The vector registry: every interrupt and trap the kernel wires up.
//!
//! Entries are named records built from the slot constants in
//! `constants::idt`. Order here is the order of every generated artifact.

use crate::constants::idt;

/// Source of a vector, as far as gate synthesis is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorClass {
    /// Processor exception reported before the faulting instruction completes.
    Fault,
    /// Processor exception reported after the trapping instruction.
    Trap,
    /// `int n` issued by software, i.e. a system call.
    SoftwareInterrupt,
    /// External interrupt line.
    DeviceInterrupt,
}

impl VectorClass {
    /// Whether the class denotes a processor exception (vectors 0-31).
    pub const fn is_exception(self) -> bool {
        matches!(self, VectorClass::Fault | VectorClass::Trap)
    }
}

/// A descriptor-table slot: the constant's name and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub symbol: &'static str,
    pub index: u8,
}

impl Slot {
    pub const fn new(symbol: &'static str, index: u8) -> Self {
        Slot { symbol, index }
    }
}

/// Slot for a constant in `constants::idt`, keeping name and value together.
#[macro_export]
macro_rules! slot {
    ($symbol:ident) => {
        $crate::codegen::registry::Slot::new(
            stringify!($symbol),
            $crate::constants::idt::$symbol,
        )
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorDescriptor {
    pub name: &'static str,
    pub slot: Slot,
    pub class: VectorClass,
    /// Whether a real handler exists; otherwise a default body is generated.
    pub implemented: bool,
    /// Whether ring 3 may raise the vector with `int n`.
    pub user_invokable: bool,
    /// Whether the processor pushes an error code before the handler runs.
    pub has_error_code: bool,
}

impl VectorDescriptor {
    const fn new(name: &'static str, slot: Slot, class: VectorClass) -> Self {
        VectorDescriptor {
            name,
            slot,
            class,
            implemented: true,
            user_invokable: false,
            has_error_code: false,
        }
    }

    pub const fn fault(name: &'static str, slot: Slot) -> Self {
        Self::new(name, slot, VectorClass::Fault)
    }

    pub const fn trap(name: &'static str, slot: Slot) -> Self {
        Self::new(name, slot, VectorClass::Trap)
    }

    /// A system call, callable from ring 3.
    pub const fn syscall(name: &'static str, slot: Slot) -> Self {
        Self::new(name, slot, VectorClass::SoftwareInterrupt).user_invokable(true)
    }

    pub const fn device(name: &'static str, slot: Slot) -> Self {
        Self::new(name, slot, VectorClass::DeviceInterrupt)
    }

    pub const fn with_error_code(mut self) -> Self {
        self.has_error_code = true;
        self
    }

    pub const fn unimplemented(mut self) -> Self {
        self.implemented = false;
        self
    }

    pub const fn user_invokable(mut self, user_invokable: bool) -> Self {
        self.user_invokable = user_invokable;
        self
    }
}

/// Every vector the kernel installs.
pub static REGISTRY: &[VectorDescriptor] = &[
    // processor exceptions
    VectorDescriptor::fault("divide_error", slot!(DIVIDE_ERROR)).unimplemented(),
    VectorDescriptor::trap("debug", slot!(DEBUG)).unimplemented(),
    VectorDescriptor::trap("breakpoint", slot!(BREAKPOINT)).unimplemented(),
    VectorDescriptor::trap("overflow", slot!(OVERFLOW)).unimplemented(),
    VectorDescriptor::fault("bound_range_exceeded", slot!(BOUND_RANGE_EXCEEDED)).unimplemented(),
    VectorDescriptor::fault("invalid_opcode", slot!(INVALID_OPCODE)).unimplemented(),
    VectorDescriptor::fault("device_not_available", slot!(DEVICE_NOT_AVAILABLE)).unimplemented(),
    VectorDescriptor::fault("double_fault", slot!(DOUBLE_FAULT))
        .with_error_code()
        .unimplemented(),
    VectorDescriptor::fault("invalid_tss", slot!(INVALID_TSS))
        .with_error_code()
        .unimplemented(),
    VectorDescriptor::fault("segment_not_present", slot!(SEGMENT_NOT_PRESENT))
        .with_error_code()
        .unimplemented(),
    VectorDescriptor::fault("stack_segment_fault", slot!(STACK_SEGMENT_FAULT))
        .with_error_code()
        .unimplemented(),
    VectorDescriptor::fault("general_protection", slot!(GENERAL_PROTECTION))
        .with_error_code()
        .unimplemented(),
    VectorDescriptor::fault("page_fault", slot!(PAGE_FAULT)).with_error_code(),
    VectorDescriptor::fault("alignment_check", slot!(ALIGNMENT_CHECK))
        .with_error_code()
        .unimplemented(),
    VectorDescriptor::fault("machine_check", slot!(MACHINE_CHECK)).unimplemented(),
    // system calls
    VectorDescriptor::syscall("syscall", slot!(SYSCALL)).unimplemented(),
    VectorDescriptor::syscall("fork", slot!(FORK)),
    VectorDescriptor::syscall("exec", slot!(EXEC)),
    VectorDescriptor::syscall("wait", slot!(WAIT)),
    VectorDescriptor::syscall("deschedule", slot!(DESCHEDULE)),
    VectorDescriptor::syscall("make_runnable", slot!(MAKE_RUNNABLE)),
    VectorDescriptor::syscall("gettid", slot!(GETTID)),
    VectorDescriptor::syscall("new_pages", slot!(NEW_PAGES)),
    VectorDescriptor::syscall("remove_pages", slot!(REMOVE_PAGES)),
    VectorDescriptor::syscall("sleep", slot!(SLEEP)),
    VectorDescriptor::syscall("getchar", slot!(GETCHAR)),
    VectorDescriptor::syscall("readline", slot!(READLINE)),
    VectorDescriptor::syscall("print", slot!(PRINT)),
    VectorDescriptor::syscall("set_term_color", slot!(SET_TERM_COLOR)),
    VectorDescriptor::syscall("set_cursor_pos", slot!(SET_CURSOR_POS)),
    VectorDescriptor::syscall("get_cursor_pos", slot!(GET_CURSOR_POS)),
    VectorDescriptor::syscall("thread_fork", slot!(THREAD_FORK)),
    VectorDescriptor::syscall("get_ticks", slot!(GET_TICKS)),
    VectorDescriptor::syscall("yield", slot!(YIELD)),
    VectorDescriptor::syscall("misbehave", slot!(MISBEHAVE)).unimplemented(),
    VectorDescriptor::syscall("halt", slot!(HALT)).unimplemented(),
    VectorDescriptor::syscall("ls", slot!(LS)).unimplemented(),
    VectorDescriptor::syscall("task_vanish", slot!(TASK_VANISH)),
    VectorDescriptor::syscall("set_status", slot!(SET_STATUS)),
    VectorDescriptor::syscall("vanish", slot!(VANISH)),
    // devices
    VectorDescriptor::device("timer", slot!(TIMER_VECTOR)),
    VectorDescriptor::device("keyboard", slot!(KEYBOARD_VECTOR)),
];

/// Exceptions for which the processor pushes an error code.
pub fn architectural_error_code(vector: u8) -> bool {
    idt::ERROR_CODE_VECTORS.contains(&vector)
}

/// Exception slots the architecture reserves.
pub fn is_reserved(vector: u8) -> bool {
    idt::RESERVED_VECTORS.contains(&vector)
}
