//! Descriptor synthesis: registry entry in, concrete gate attributes out.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};

use x86_64::PrivilegeLevel;

use super::{
    error::ConfigError,
    registry::{architectural_error_code, is_reserved, Slot, VectorClass, VectorDescriptor},
};
use crate::{
    constants::idt::FIRST_EXTERNAL_VECTOR,
    interrupts::{frame::FrameShape, gate::GateKind},
};

/// Everything the emitter needs to know about one vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateSpec {
    pub name: &'static str,
    pub slot: Slot,
    pub class: VectorClass,
    pub kind: GateKind,
    pub privilege: PrivilegeLevel,
    pub frame: FrameShape,
    pub implemented: bool,
    pub user_invokable: bool,
}

/// Only device interrupts keep further interrupts masked.
pub fn gate_kind(class: VectorClass) -> GateKind {
    match class {
        VectorClass::DeviceInterrupt => GateKind::Interrupt,
        VectorClass::Fault | VectorClass::Trap | VectorClass::SoftwareInterrupt => GateKind::Trap,
    }
}

pub fn privilege(user_invokable: bool) -> PrivilegeLevel {
    if user_invokable {
        PrivilegeLevel::Ring3
    } else {
        PrivilegeLevel::Ring0
    }
}

/// Derives the gate for one entry. The entry is assumed to be validated.
pub fn synthesize(desc: &VectorDescriptor) -> GateSpec {
    GateSpec {
        name: desc.name,
        slot: desc.slot,
        class: desc.class,
        kind: gate_kind(desc.class),
        privilege: privilege(desc.user_invokable),
        frame: FrameShape::from_error_code(desc.has_error_code),
        implemented: desc.implemented,
        user_invokable: desc.user_invokable,
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn check_entry(desc: &VectorDescriptor) -> Result<(), ConfigError> {
    let name = desc.name;
    let vector = desc.slot.index;

    if !is_identifier(name) {
        return Err(ConfigError::InvalidName { name });
    }
    if is_reserved(vector) {
        return Err(ConfigError::ReservedSlot { name, vector });
    }
    if desc.class.is_exception() != (vector < FIRST_EXTERNAL_VECTOR) {
        return Err(ConfigError::ClassMismatch {
            name,
            vector,
            class: desc.class,
        });
    }

    // Only exceptions carry an error code, and then exactly when the
    // architecture says so.
    let expected = desc.class.is_exception() && architectural_error_code(vector);
    if desc.has_error_code != expected {
        return Err(ConfigError::ErrorCodeMismatch {
            name,
            vector,
            expected,
        });
    }

    if desc.class == VectorClass::DeviceInterrupt && desc.user_invokable {
        return Err(ConfigError::UserInvokableDevice { name });
    }
    Ok(())
}

/// Checks every wiring rule, stopping at the first entry that breaks one.
pub fn validate(registry: &[VectorDescriptor]) -> Result<(), ConfigError> {
    let mut names = BTreeSet::new();
    let mut slots: BTreeMap<u8, &'static str> = BTreeMap::new();

    for desc in registry {
        check_entry(desc)?;
        if !names.insert(desc.name) {
            return Err(ConfigError::DuplicateName { name: desc.name });
        }
        if let Some(first) = slots.insert(desc.slot.index, desc.name) {
            return Err(ConfigError::DuplicateSlot {
                first,
                second: desc.name,
                vector: desc.slot.index,
            });
        }
    }
    Ok(())
}

/// Validates the registry, then synthesizes every entry in order.
pub fn synthesize_all(registry: &[VectorDescriptor]) -> Result<Vec<GateSpec>, ConfigError> {
    validate(registry)?;
    Ok(registry.iter().map(synthesize).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codegen::registry::REGISTRY, slot};

    #[test]
    fn shipped_registry_is_valid() {
        assert_eq!(validate(REGISTRY), Ok(()));
    }

    #[test]
    fn privilege_follows_user_invokable() {
        for gate in synthesize_all(REGISTRY).unwrap() {
            let expected = if gate.user_invokable {
                PrivilegeLevel::Ring3
            } else {
                PrivilegeLevel::Ring0
            };
            assert_eq!(gate.privilege, expected, "{}", gate.name);
        }
    }

    #[test]
    fn interrupt_gate_iff_device() {
        for gate in synthesize_all(REGISTRY).unwrap() {
            assert_eq!(
                gate.kind == GateKind::Interrupt,
                gate.class == VectorClass::DeviceInterrupt,
                "{}",
                gate.name
            );
        }
    }

    #[test]
    fn slots_are_unique() {
        let gates = synthesize_all(REGISTRY).unwrap();
        let slots: BTreeSet<u8> = gates.iter().map(|g| g.slot.index).collect();
        assert_eq!(slots.len(), gates.len());
    }

    #[test]
    fn duplicate_slot_names_both_entries() {
        let registry = [
            VectorDescriptor::syscall("fork", slot!(FORK)),
            VectorDescriptor::syscall("spawn", Slot::new("FORK", 0x41)),
        ];
        let err = synthesize_all(&registry).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateSlot {
                first: "fork",
                second: "spawn",
                vector: 0x41
            }
        );
        let message = alloc::format!("{err}");
        assert!(message.contains("fork") && message.contains("spawn"));
    }

    #[test]
    fn fault_with_error_code_synthesizes_ring0_trap_gate() {
        let desc = VectorDescriptor::fault("general_protection", slot!(GENERAL_PROTECTION))
            .with_error_code();
        let registry = [desc];
        let gate = synthesize_all(&registry).unwrap()[0];
        assert_eq!(gate.kind, GateKind::Trap);
        assert_eq!(gate.privilege, PrivilegeLevel::Ring0);
        assert_eq!(gate.frame, FrameShape::WithErrorCode);
    }

    #[test]
    fn user_syscall_synthesizes_ring3_trap_gate() {
        let registry = [VectorDescriptor::syscall("print", slot!(PRINT))];
        let gate = synthesize_all(&registry).unwrap()[0];
        assert_eq!(gate.kind, GateKind::Trap);
        assert_eq!(gate.privilege, PrivilegeLevel::Ring3);
        assert_eq!(gate.frame, FrameShape::Plain);
        assert!(gate.implemented);
    }

    #[test]
    fn unimplemented_device_synthesizes_ring0_interrupt_gate() {
        let registry = [VectorDescriptor::device("timer", slot!(TIMER_VECTOR)).unimplemented()];
        let gate = synthesize_all(&registry).unwrap()[0];
        assert_eq!(gate.kind, GateKind::Interrupt);
        assert_eq!(gate.privilege, PrivilegeLevel::Ring0);
        assert!(!gate.implemented);
    }

    #[test]
    fn missing_architectural_error_code_is_rejected() {
        let registry = [VectorDescriptor::fault("page_fault", slot!(PAGE_FAULT))];
        assert_eq!(
            validate(&registry),
            Err(ConfigError::ErrorCodeMismatch {
                name: "page_fault",
                vector: 14,
                expected: true
            })
        );
    }

    #[test]
    fn spurious_error_code_is_rejected() {
        let registry = [
            VectorDescriptor::fault("invalid_opcode", slot!(INVALID_OPCODE)).with_error_code(),
        ];
        let err = validate(&registry).unwrap_err();
        assert_eq!(err.vector_name(), "invalid_opcode");

        let registry = [VectorDescriptor::syscall("print", slot!(PRINT)).with_error_code()];
        assert!(matches!(
            validate(&registry),
            Err(ConfigError::ErrorCodeMismatch {
                expected: false,
                ..
            })
        ));
    }

    #[test]
    fn user_invokable_device_is_rejected() {
        let registry =
            [VectorDescriptor::device("keyboard", slot!(KEYBOARD_VECTOR)).user_invokable(true)];
        assert_eq!(
            validate(&registry),
            Err(ConfigError::UserInvokableDevice { name: "keyboard" })
        );
    }

    #[test]
    fn class_must_match_slot_range() {
        let registry = [VectorDescriptor::syscall("sneaky", Slot::new("SNEAKY", 5))];
        assert!(matches!(
            validate(&registry),
            Err(ConfigError::ClassMismatch { vector: 5, .. })
        ));

        let registry = [VectorDescriptor::fault("late_fault", Slot::new("LATE", 0x90))];
        assert!(matches!(
            validate(&registry),
            Err(ConfigError::ClassMismatch { vector: 0x90, .. })
        ));
    }

    #[test]
    fn reserved_and_malformed_entries_are_rejected() {
        let registry = [VectorDescriptor::fault("reserved", Slot::new("RESERVED", 15))];
        assert_eq!(
            validate(&registry),
            Err(ConfigError::ReservedSlot {
                name: "reserved",
                vector: 15
            })
        );

        for name in ["", "Fork", "9lives", "new-pages"] {
            let registry = [VectorDescriptor::syscall(name, slot!(FORK))];
            assert_eq!(validate(&registry), Err(ConfigError::InvalidName { name }));
        }

        let registry = [
            VectorDescriptor::syscall("fork", slot!(FORK)),
            VectorDescriptor::syscall("fork", slot!(EXEC)),
        ];
        assert_eq!(
            validate(&registry),
            Err(ConfigError::DuplicateName { name: "fork" })
        );
    }
}
