//! Gate descriptors and the table the boot installer programs.

use core::fmt;

use x86_64::{
    instructions::tables::lidt,
    structures::{gdt::SegmentSelector, DescriptorTablePointer},
    VirtAddr,
};

pub use x86_64::PrivilegeLevel;

use crate::constants::idt::{
    GATE_DPL_MASK, GATE_DPL_SHIFT, GATE_PRESENT, GATE_SIZE, GATE_TYPE_INTERRUPT, GATE_TYPE_TRAP,
    IDT_ENTRIES,
};

/// Whether delivery through a gate masks further interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GateKind {
    /// Clears IF on entry.
    Interrupt,
    /// Leaves IF untouched.
    Trap,
}

impl GateKind {
    pub const fn type_bits(self) -> u8 {
        match self {
            GateKind::Interrupt => GATE_TYPE_INTERRUPT,
            GateKind::Trap => GATE_TYPE_TRAP,
        }
    }

    /// Variant name as written in generated code.
    pub const fn variant_name(self) -> &'static str {
        match self {
            GateKind::Interrupt => "Interrupt",
            GateKind::Trap => "Trap",
        }
    }
}

/// One 16-byte long-mode gate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    ist: u8,
    type_attr: u8,
    offset_mid: u16,
    offset_high: u32,
    reserved: u32,
}

const _: () = assert!(core::mem::size_of::<GateDescriptor>() == GATE_SIZE);

impl GateDescriptor {
    /// A non-present gate. Delivery through it raises #NP.
    pub const fn missing() -> Self {
        GateDescriptor {
            offset_low: 0,
            selector: 0,
            ist: 0,
            type_attr: 0,
            offset_mid: 0,
            offset_high: 0,
            reserved: 0,
        }
    }

    /// A present ring-0 gate jumping to `handler` through `selector`.
    pub fn new(handler: VirtAddr, selector: SegmentSelector, kind: GateKind) -> Self {
        let addr = handler.as_u64();
        GateDescriptor {
            offset_low: addr as u16,
            selector: selector.0,
            ist: 0,
            type_attr: GATE_PRESENT | kind.type_bits(),
            offset_mid: (addr >> 16) as u16,
            offset_high: (addr >> 32) as u32,
            reserved: 0,
        }
    }

    pub fn is_present(&self) -> bool {
        self.type_attr & GATE_PRESENT != 0
    }

    pub fn handler_addr(&self) -> VirtAddr {
        let addr = u64::from(self.offset_low)
            | (u64::from(self.offset_mid) << 16)
            | (u64::from(self.offset_high) << 32);
        VirtAddr::new_truncate(addr)
    }

    pub fn selector(&self) -> SegmentSelector {
        SegmentSelector(self.selector)
    }

    pub fn kind(&self) -> Option<GateKind> {
        match self.type_attr & 0xF {
            GATE_TYPE_INTERRUPT => Some(GateKind::Interrupt),
            GATE_TYPE_TRAP => Some(GateKind::Trap),
            _ => None,
        }
    }

    pub fn privilege_level(&self) -> PrivilegeLevel {
        PrivilegeLevel::from_u16(u16::from((self.type_attr >> GATE_DPL_SHIFT) & GATE_DPL_MASK))
    }

    /// Raw attribute byte, `P | DPL | type`.
    pub fn type_attr(&self) -> u8 {
        self.type_attr
    }

    /// Sets the lowest ring allowed to raise this vector with `int n`.
    pub fn set_privilege_level(&mut self, dpl: PrivilegeLevel) -> &mut Self {
        self.type_attr &= !(GATE_DPL_MASK << GATE_DPL_SHIFT);
        self.type_attr |= ((dpl as u8) & GATE_DPL_MASK) << GATE_DPL_SHIFT;
        self
    }
}

/// Installation progress of a [`GateTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    NotStarted,
    Installing,
    AllInstalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallError {
    SlotOutOfRange { vector: u8, entries: usize },
    TableSealed { vector: u8 },
    InterruptsEnabled,
    AlreadyLoaded,
}

impl InstallError {
    /// Non-zero boot status code for this failure.
    pub const fn status(self) -> i32 {
        match self {
            InstallError::SlotOutOfRange { .. } => -1,
            InstallError::TableSealed { .. } => -2,
            InstallError::InterruptsEnabled => -3,
            InstallError::AlreadyLoaded => -4,
        }
    }
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallError::SlotOutOfRange { vector, entries } => write!(
                f,
                "vector {vector:#x} is outside the {entries}-entry descriptor table"
            ),
            InstallError::TableSealed { vector } => {
                write!(f, "vector {vector:#x} installed after the table was sealed")
            }
            InstallError::InterruptsEnabled => {
                write!(f, "descriptor table installed with interrupts enabled")
            }
            InstallError::AlreadyLoaded => {
                write!(f, "a descriptor table has already been loaded")
            }
        }
    }
}

/// The interrupt descriptor table, `N` gates long.
#[repr(C, align(16))]
pub struct GateTable<const N: usize = IDT_ENTRIES> {
    entries: [GateDescriptor; N],
    selector: SegmentSelector,
    state: InstallState,
    installed: usize,
}

impl<const N: usize> GateTable<N> {
    /// An empty table whose gates will enter through the code segment `selector`.
    pub const fn new(selector: SegmentSelector) -> Self {
        GateTable {
            entries: [GateDescriptor::missing(); N],
            selector,
            state: InstallState::NotStarted,
            installed: 0,
        }
    }

    /// Writes a complete gate for `vector` pointing at `entry`.
    ///
    /// The returned descriptor is fully initialized, so any privilege change
    /// made through it cannot expose a half-written gate.
    ///
    /// # Safety
    /// `entry` must be an interrupt trampoline: it has to preserve every
    /// register and return with `iretq`, popping the error code first if the
    /// processor pushes one for `vector`.
    pub unsafe fn install(
        &mut self,
        vector: u8,
        entry: unsafe extern "C" fn(),
        kind: GateKind,
    ) -> Result<&mut GateDescriptor, InstallError> {
        self.install_addr(vector, VirtAddr::from_ptr(entry as *const ()), kind)
    }

    /// Like [`install`](Self::install) with a raw entry address.
    ///
    /// # Safety
    /// Same contract as [`install`](Self::install).
    pub unsafe fn install_addr(
        &mut self,
        vector: u8,
        entry: VirtAddr,
        kind: GateKind,
    ) -> Result<&mut GateDescriptor, InstallError> {
        if self.state == InstallState::AllInstalled {
            return Err(InstallError::TableSealed { vector });
        }
        let offset =
            Self::slot_offset(vector).ok_or(InstallError::SlotOutOfRange { vector, entries: N })?;
        let gate = GateDescriptor::new(entry, self.selector, kind);
        // SAFETY: `slot_offset` only returns offsets of whole gates inside
        // `entries`.
        let slot = &mut *self.entries.as_mut_ptr().byte_add(offset);
        *slot = gate;
        self.state = InstallState::Installing;
        self.installed += 1;
        Ok(slot)
    }

    /// Marks installation complete. No gate may be written afterwards.
    pub fn finish(&mut self) {
        self.state = InstallState::AllInstalled;
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    /// Number of `install` calls that succeeded.
    pub fn installed(&self) -> usize {
        self.installed
    }

    pub fn get(&self, vector: u8) -> Option<&GateDescriptor> {
        self.entries.get(usize::from(vector))
    }

    /// Byte offset of the slot for `vector` from the table base.
    fn slot_offset(vector: u8) -> Option<usize> {
        let index = usize::from(vector);
        (index < N).then_some(index * GATE_SIZE)
    }

    /// Address of the slot for `vector`, if it lies inside the table.
    pub fn slot_address(&self, vector: u8) -> Option<VirtAddr> {
        let offset = Self::slot_offset(vector)?;
        Some(VirtAddr::from_ptr(self.entries.as_ptr()) + offset as u64)
    }

    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            limit: (N * GATE_SIZE - 1) as u16,
            base: VirtAddr::from_ptr(self.entries.as_ptr()),
        }
    }

    /// Loads the table into IDTR.
    ///
    /// # Safety
    /// Every gate the hardware may deliver through must be installed.
    pub unsafe fn load(&'static self) {
        lidt(&self.pointer());
    }
}
