//! Boot-time installation of the Interrupt Descriptor Table.
//!
//! The generated `handler_install` routine is handed to [`init_idt`], which
//! runs it exactly once on the boot core before any interrupt source is
//! unmasked. The finished table is frozen and stays read-only afterwards.

use log::{error, info};
use spin::Once;
use x86_64::{
    instructions::segmentation::{Segment, CS},
    structures::gdt::SegmentSelector,
};

use super::{
    are_enabled,
    gate::{GateTable, InstallError},
    inspect,
};

/// The live descriptor table. Written once during boot.
static IDT: Once<GateTable> = Once::new();

/// Builds and seals a table, running `install` against it.
///
/// Any error from `install` is returned unchanged and the partial table is
/// dropped.
pub fn build_table<F>(selector: SegmentSelector, install: F) -> Result<GateTable, InstallError>
where
    F: FnOnce(&mut GateTable) -> Result<(), InstallError>,
{
    let mut table = GateTable::new(selector);
    install(&mut table)?;
    table.finish();
    Ok(table)
}

/// Installs and loads the descriptor table. Never returns on failure.
///
/// Must be called with interrupts disabled; the caller enables them only
/// after this returns.
pub fn init_idt<F>(install: F)
where
    F: FnOnce(&mut GateTable) -> Result<(), InstallError>,
{
    match try_init_idt(install) {
        Ok(table) => info!("IDT loaded with {} gates", table.installed()),
        Err(err) => {
            error!("IDT installation failed: {}", err);
            inspect::halt();
        }
    }
}

/// Boot installation runs once, and only while interrupts are masked.
fn ready_to_install(interrupts_enabled: bool, loaded: bool) -> Result<(), InstallError> {
    if interrupts_enabled {
        return Err(InstallError::InterruptsEnabled);
    }
    if loaded {
        return Err(InstallError::AlreadyLoaded);
    }
    Ok(())
}

fn try_init_idt<F>(install: F) -> Result<&'static GateTable, InstallError>
where
    F: FnOnce(&mut GateTable) -> Result<(), InstallError>,
{
    ready_to_install(are_enabled(), IDT.is_completed())?;

    let table = build_table(CS::get_reg(), install)?;
    let table = IDT.call_once(|| table);

    unsafe { table.load() };
    Ok(table)
}

/// The loaded table, once boot installation has finished.
pub fn table() -> Option<&'static GateTable> {
    IDT.get()
}

#[cfg(test)]
mod tests {
    use x86_64::{PrivilegeLevel, VirtAddr};

    use super::*;
    use crate::{
        constants::{gdt::KERNEL_CODE_SELECTOR, idt},
        interrupts::gate::{GateKind, InstallState},
    };

    #[test]
    fn build_table_seals_after_install() {
        let table = build_table(KERNEL_CODE_SELECTOR, |table| {
            unsafe {
                table.install_addr(
                    idt::PAGE_FAULT,
                    VirtAddr::new(0x10_0000),
                    GateKind::Trap,
                )?;
                table
                    .install_addr(idt::SYSCALL, VirtAddr::new(0x10_0100), GateKind::Trap)?
                    .set_privilege_level(PrivilegeLevel::Ring3);
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(table.state(), InstallState::AllInstalled);
        assert_eq!(table.installed(), 2);
        assert_eq!(
            table.get(idt::SYSCALL).unwrap().privilege_level(),
            PrivilegeLevel::Ring3
        );
        assert_eq!(
            table.get(idt::PAGE_FAULT).unwrap().privilege_level(),
            PrivilegeLevel::Ring0
        );
    }

    #[test]
    fn second_installation_is_refused() {
        assert_eq!(ready_to_install(false, false), Ok(()));
        assert_eq!(
            ready_to_install(false, true),
            Err(InstallError::AlreadyLoaded)
        );
        assert_eq!(
            ready_to_install(true, true),
            Err(InstallError::InterruptsEnabled)
        );
    }

    #[test]
    fn build_table_propagates_the_first_failure() {
        let mut reached = false;
        let err = build_table(KERNEL_CODE_SELECTOR, |table| {
            unsafe {
                table.install_addr(idt::TIMER_VECTOR, VirtAddr::new(0x1000), GateKind::Interrupt)?;
                table.finish();
                table.install_addr(idt::KEYBOARD_VECTOR, VirtAddr::new(0x2000), GateKind::Interrupt)?;
            }
            reached = true;
            Ok(())
        })
        .err();

        assert_eq!(
            err,
            Some(InstallError::TableSealed {
                vector: idt::KEYBOARD_VECTOR
            })
        );
        assert!(!reached);
    }
}
