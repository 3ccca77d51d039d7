//! Projection of synthesized gates into the four generated sources.
//!
//! Every renderer is a `Display` value over the gate list, so emission is a
//! pure function of its input: no file handles, no clock, no hash order.

use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use core::fmt::{self, Display, Formatter};

use super::{config::GenConfig, synth::GateSpec};
use crate::interrupts::frame::{FrameShape, GENERAL_REGISTERS};

/// First line of every generated file, after the comment leader.
pub const GENERATED_MARKER: &str = "@generated by trapgen from the vector registry. Do not edit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    Trampolines,
    Declarations,
    Installer,
    DefaultBodies,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Trampolines,
        ArtifactKind::Declarations,
        ArtifactKind::Installer,
        ArtifactKind::DefaultBodies,
    ];

    pub const fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Trampolines => "trampolines.s",
            ArtifactKind::Declarations => "trampolines.rs",
            ArtifactKind::Installer => "install.rs",
            ArtifactKind::DefaultBodies => "fault_handlers.rs",
        }
    }

    const fn index(self) -> usize {
        match self {
            ArtifactKind::Trampolines => 0,
            ArtifactKind::Declarations => 1,
            ArtifactKind::Installer => 2,
            ArtifactKind::DefaultBodies => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub contents: String,
}

/// One complete, mutually consistent set of generated sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    artifacts: [Artifact; 4],
}

impl Artifacts {
    pub fn get(&self, kind: ArtifactKind) -> &Artifact {
        &self.artifacts[kind.index()]
    }

    pub fn get_mut(&mut self, kind: ArtifactKind) -> &mut Artifact {
        &mut self.artifacts[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }
}

/// Renders all four sources. Callers must run `check` before trusting them.
pub fn emit(gates: &[GateSpec], config: &GenConfig) -> Artifacts {
    let render = |kind: ArtifactKind, contents: String| Artifact { kind, contents };
    Artifacts {
        artifacts: [
            render(ArtifactKind::Trampolines, TrampolineSource(gates).to_string()),
            render(
                ArtifactKind::Declarations,
                DeclarationSource { gates, config }.to_string(),
            ),
            render(
                ArtifactKind::Installer,
                InstallerSource { gates, config }.to_string(),
            ),
            render(
                ArtifactKind::DefaultBodies,
                DefaultBodySource { gates, config }.to_string(),
            ),
        ],
    }
}

pub fn entry_symbol(name: &str) -> String {
    alloc::format!("asm_{name}_handler")
}

pub fn handler_symbol(name: &str) -> String {
    alloc::format!("{name}_handler")
}

fn ring(gate: &GateSpec) -> u8 {
    gate.privilege as u8
}

/// `trampolines.s`: two templates, then one invocation per vector.
struct TrampolineSource<'a>(&'a [GateSpec]);

impl TrampolineSource<'_> {
    fn template(f: &mut Formatter<'_>, shape: FrameShape) -> fmt::Result {
        // Push order is the reverse of the frame field order, so the last
        // register pushed lands at offset 0.
        let saved = &FrameShape::Plain.fields()[..GENERAL_REGISTERS];

        writeln!(f, ".macro {} entry, handler", shape.template())?;
        writeln!(f, "    .global \\entry")?;
        writeln!(f, "    .type \\entry, @function")?;
        writeln!(f, "    .p2align 4")?;
        writeln!(f, "\\entry:")?;
        for reg in saved.iter().rev() {
            writeln!(f, "    push {}", reg.name)?;
        }
        writeln!(f, "    cld")?;
        writeln!(f, "    mov rdi, rsp")?;
        writeln!(f, "    mov rbx, rsp")?;
        writeln!(f, "    and rsp, -16")?;
        writeln!(f, "    call \\handler")?;
        writeln!(f, "    mov rsp, rbx")?;
        for reg in saved {
            writeln!(f, "    pop {}", reg.name)?;
        }
        if shape.has_error_code() {
            writeln!(f, "    add rsp, 8")?;
        }
        writeln!(f, "    iretq")?;
        writeln!(f, ".endm")?;
        writeln!(f)
    }
}

impl Display for TrampolineSource<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {GENERATED_MARKER}")?;
        writeln!(f, "#")?;
        writeln!(f, "# Interrupt entry trampolines. Each saves the general registers below")?;
        writeln!(f, "# the hardware frame, passes the frame to its handler in rdi and")?;
        writeln!(f, "# returns with iretq. TRAMPOLINE_ERR also discards the error code.")?;
        writeln!(f)?;
        writeln!(f, ".intel_syntax noprefix")?;
        writeln!(f, ".section .text")?;
        writeln!(f)?;
        Self::template(f, FrameShape::Plain)?;
        Self::template(f, FrameShape::WithErrorCode)?;
        for gate in self.0 {
            writeln!(
                f,
                "{} {}, {}",
                gate.frame.template(),
                entry_symbol(gate.name),
                handler_symbol(gate.name)
            )?;
        }
        Ok(())
    }
}

/// `trampolines.rs`: the entry points, the frame layouts for tooling, and a
/// typed reference to every implemented handler.
struct DeclarationSource<'a> {
    gates: &'a [GateSpec],
    config: &'a GenConfig,
}

impl Display for DeclarationSource<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let implemented: Vec<&GateSpec> = self.gates.iter().filter(|gate| gate.implemented).collect();

        writeln!(f, "// {GENERATED_MARKER}")?;
        writeln!(f, "//! Trampoline entry points, one per installed vector.")?;
        writeln!(f, "//!")?;
        writeln!(f, "//! Frames handed to handlers, as byte offsets from the frame pointer:")?;
        writeln!(f, "//!")?;
        writeln!(f, "//! ```text")?;
        for shape in [FrameShape::Plain, FrameShape::WithErrorCode] {
            writeln!(f, "//! {} ({} bytes)", shape.capture_type(), shape.size())?;
            for field in shape.fields() {
                writeln!(f, "//!   {:>3}  {}", field.offset, field.name)?;
            }
        }
        writeln!(f, "//! ```")?;
        if !implemented.is_empty() {
            writeln!(f)?;
            frame_imports(f, self.config.runtime_crate, &implemented)?;
        }
        writeln!(f)?;
        writeln!(f, "extern \"C\" {{")?;
        for gate in self.gates {
            writeln!(
                f,
                "    /// `idt::{}`: {} gate, ring {}, `{}`.",
                gate.slot.symbol,
                gate.kind.variant_name().to_ascii_lowercase(),
                ring(gate),
                gate.frame.capture_type()
            )?;
            writeln!(f, "    pub fn {}();", entry_symbol(gate.name))?;
        }
        writeln!(f, "}}")?;

        if implemented.is_empty() {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "// Each trampoline passes its handler the frame it built.")?;
        for gate in implemented {
            writeln!(
                f,
                "const _: extern \"C\" fn(&mut {}) = {}::{};",
                gate.frame.capture_type(),
                self.config.handler_module,
                handler_symbol(gate.name)
            )?;
        }
        Ok(())
    }
}

/// `use` line for the capture types `gates` take, sorted and deduplicated.
fn frame_imports(f: &mut Formatter<'_>, rt: &str, gates: &[&GateSpec]) -> fmt::Result {
    let mut shapes: Vec<&str> = gates.iter().map(|gate| gate.frame.capture_type()).collect();
    shapes.sort_unstable();
    shapes.dedup();
    match shapes.as_slice() {
        [single] => writeln!(f, "use {rt}::interrupts::frame::{single};"),
        several => writeln!(f, "use {rt}::interrupts::frame::{{{}}};", several.join(", ")),
    }
}

/// `install.rs`: programs every gate, then relaxes privilege where allowed.
struct InstallerSource<'a> {
    gates: &'a [GateSpec],
    config: &'a GenConfig,
}

impl Display for InstallerSource<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rt = self.config.runtime_crate;
        let relaxes = self.gates.iter().any(|gate| gate.user_invokable);

        writeln!(f, "// {GENERATED_MARKER}")?;
        writeln!(f, "//! Descriptor table installation, run once at boot.")?;
        writeln!(f)?;
        if self.gates.is_empty() {
            writeln!(f, "use {rt}::interrupts::gate::{{GateTable, InstallError}};")?;
        } else {
            writeln!(f, "use {rt}::constants::idt;")?;
            if relaxes {
                writeln!(
                    f,
                    "use {rt}::interrupts::gate::{{GateKind, GateTable, InstallError, PrivilegeLevel}};"
                )?;
            } else {
                writeln!(f, "use {rt}::interrupts::gate::{{GateKind, GateTable, InstallError}};")?;
            }
            writeln!(f)?;
            writeln!(f, "use {}::*;", self.config.trampoline_module)?;
        }
        writeln!(f)?;
        writeln!(f, "/// Installs every gate in registry order.")?;
        writeln!(f, "///")?;
        writeln!(f, "/// Must run exactly once, on the boot core, with interrupts disabled.")?;
        writeln!(f, "/// Any error is fatal: boot must not continue with a partial table.")?;
        writeln!(
            f,
            "pub fn handler_install<const N: usize>(table: &mut GateTable<N>) -> Result<(), InstallError> {{"
        )?;
        if !self.gates.is_empty() {
            writeln!(f, "    // SAFETY: every entry is a generated trampoline whose frame shape")?;
            writeln!(f, "    // matches the vector it is installed for.")?;
            writeln!(f, "    unsafe {{")?;
            for gate in self.gates {
                let install = alloc::format!(
                    ".install(idt::{}, {}, GateKind::{})?",
                    gate.slot.symbol,
                    entry_symbol(gate.name),
                    gate.kind.variant_name()
                );
                if gate.user_invokable {
                    writeln!(f, "        table")?;
                    writeln!(f, "            {install}")?;
                    writeln!(f, "            .set_privilege_level(PrivilegeLevel::Ring3);")?;
                } else {
                    writeln!(f, "        table{install};")?;
                }
            }
            writeln!(f, "    }}")?;
        } else {
            writeln!(f, "    let _ = table;")?;
        }
        writeln!(f, "    Ok(())")?;
        writeln!(f, "}}")?;
        writeln!(f)?;
        writeln!(f, "/// Status-code form of [`handler_install`]: 0 on success, anything else")?;
        writeln!(f, "/// must abort boot.")?;
        writeln!(
            f,
            "pub fn handler_install_status<const N: usize>(table: &mut GateTable<N>) -> i32 {{"
        )?;
        writeln!(f, "    match handler_install(table) {{")?;
        writeln!(f, "        Ok(()) => 0,")?;
        writeln!(f, "        Err(err) => err.status(),")?;
        writeln!(f, "    }}")?;
        writeln!(f, "}}")
    }
}

/// `fault_handlers.rs`: a report-and-halt body per unimplemented vector.
struct DefaultBodySource<'a> {
    gates: &'a [GateSpec],
    config: &'a GenConfig,
}

impl Display for DefaultBodySource<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let rt = self.config.runtime_crate;
        let pending: Vec<&GateSpec> = self.gates.iter().filter(|gate| !gate.implemented).collect();

        writeln!(f, "// {GENERATED_MARKER}")?;
        writeln!(f, "//! Placeholder handlers for vectors that have no implementation yet.")?;
        writeln!(f, "//!")?;
        writeln!(f, "//! Each one reports the vector on the serial port and halts for inspection.")?;
        if pending.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        frame_imports(f, rt, &pending)?;
        writeln!(f, "use {rt}::interrupts::inspect::unimplemented_vector;")?;

        for gate in pending {
            writeln!(f)?;
            writeln!(f, "#[no_mangle]")?;
            writeln!(
                f,
                "pub extern \"C\" fn {}(frame: &mut {}) {{",
                handler_symbol(gate.name),
                gate.frame.capture_type()
            )?;
            writeln!(f, "    unimplemented_vector(\"{}\", frame)", gate.name)?;
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codegen::{registry::VectorDescriptor, synth::synthesize_all},
        slot,
    };

    fn gates() -> Vec<GateSpec> {
        synthesize_all(&[
            VectorDescriptor::fault("divide_error", slot!(DIVIDE_ERROR)).unimplemented(),
            VectorDescriptor::fault("page_fault", slot!(PAGE_FAULT))
                .with_error_code()
                .unimplemented(),
            VectorDescriptor::syscall("gettid", slot!(GETTID)),
            VectorDescriptor::device("timer", slot!(TIMER_VECTOR)),
        ])
        .unwrap()
    }

    #[test]
    fn every_artifact_carries_the_marker() {
        let artifacts = emit(&gates(), &GenConfig::default());
        for artifact in artifacts.iter() {
            let first = artifact.contents.lines().next().unwrap();
            assert!(first.ends_with(GENERATED_MARKER), "{:?}", artifact.kind);
        }
        let kinds: Vec<ArtifactKind> = artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, ArtifactKind::ALL);
    }

    #[test]
    fn trampolines_pick_the_template_by_error_code() {
        let artifacts = emit(&gates(), &GenConfig::default());
        let text = &artifacts.get(ArtifactKind::Trampolines).contents;
        assert!(text.contains("\nTRAMPOLINE asm_divide_error_handler, divide_error_handler\n"));
        assert!(text.contains("\nTRAMPOLINE_ERR asm_page_fault_handler, page_fault_handler\n"));
        assert_eq!(text.matches(".macro ").count(), 2);
        assert_eq!(text.matches("    add rsp, 8\n").count(), 1);
        assert_eq!(text.matches("    iretq\n").count(), 2);
    }

    #[test]
    fn trampoline_saves_registers_in_frame_order() {
        let artifacts = emit(&gates(), &GenConfig::default());
        let text = &artifacts.get(ArtifactKind::Trampolines).contents;
        let pushes: Vec<&str> = text
            .lines()
            .take_while(|line| !line.starts_with(".macro TRAMPOLINE_ERR"))
            .filter_map(|line| line.trim().strip_prefix("push "))
            .collect();
        assert_eq!(pushes.len(), GENERAL_REGISTERS);
        assert_eq!(pushes.first(), Some(&"rbp"));
        assert_eq!(pushes.last(), Some(&"rax"));
    }

    #[test]
    fn installer_relaxes_privilege_after_install() {
        let artifacts = emit(&gates(), &GenConfig::default());
        let text = &artifacts.get(ArtifactKind::Installer).contents;
        assert!(text.contains(
            "        table\n            .install(idt::GETTID, asm_gettid_handler, GateKind::Trap)?\n            .set_privilege_level(PrivilegeLevel::Ring3);\n"
        ));
        assert!(text.contains(
            "        table.install(idt::TIMER_VECTOR, asm_timer_handler, GateKind::Interrupt)?;\n"
        ));
        assert_eq!(text.matches("set_privilege_level").count(), 1);
        assert!(text.contains("use trapgen::constants::idt;"));
        assert!(text.contains("use super::trampolines::*;"));
    }

    #[test]
    fn installer_keeps_registry_order() {
        let artifacts = emit(&gates(), &GenConfig::default());
        let text = &artifacts.get(ArtifactKind::Installer).contents;
        let positions: Vec<usize> = ["divide_error", "page_fault", "gettid", "timer"]
            .iter()
            .map(|name| text.find(&entry_symbol(name)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn default_bodies_take_the_matching_frame() {
        let artifacts = emit(&gates(), &GenConfig::default());
        let text = &artifacts.get(ArtifactKind::DefaultBodies).contents;
        assert!(text.contains(
            "pub extern \"C\" fn divide_error_handler(frame: &mut RegisterFrame) {\n    unimplemented_vector(\"divide_error\", frame)\n}\n"
        ));
        assert!(text.contains("pub extern \"C\" fn page_fault_handler(frame: &mut ErrorRegisterFrame) {"));
        assert!(!text.contains("gettid"));
        assert!(!text.contains("timer"));
        assert!(text.contains("use trapgen::interrupts::frame::{ErrorRegisterFrame, RegisterFrame};"));
    }

    #[test]
    fn declarations_document_frame_layouts() {
        let artifacts = emit(&gates(), &GenConfig::default());
        let text = &artifacts.get(ArtifactKind::Declarations).contents;
        assert!(text.contains("//! RegisterFrame (160 bytes)"));
        assert!(text.contains("//! ErrorRegisterFrame (168 bytes)"));
        assert!(text.contains("//!   120  error_code"));
        assert!(text.contains("    /// `idt::GETTID`: trap gate, ring 3, `RegisterFrame`.\n    pub fn asm_gettid_handler();"));
    }

    #[test]
    fn runtime_crate_is_configurable() {
        let config = GenConfig {
            runtime_crate: "crate::arch",
            trampoline_module: "crate::arch::entry",
            handler_module: "crate::traps",
        };
        let artifacts = emit(&gates(), &config);
        let installer = &artifacts.get(ArtifactKind::Installer).contents;
        assert!(installer.contains("use crate::arch::constants::idt;"));
        assert!(installer.contains("use crate::arch::entry::*;"));
        let bodies = &artifacts.get(ArtifactKind::DefaultBodies).contents;
        assert!(bodies.contains("use crate::arch::interrupts::inspect::unimplemented_vector;"));
        let declarations = &artifacts.get(ArtifactKind::Declarations).contents;
        assert!(declarations.contains("= crate::traps::gettid_handler;"));
    }

    #[test]
    fn implemented_handlers_are_pinned_to_their_frame() {
        let gates = synthesize_all(&[
            VectorDescriptor::fault("divide_error", slot!(DIVIDE_ERROR)).unimplemented(),
            VectorDescriptor::fault("page_fault", slot!(PAGE_FAULT)).with_error_code(),
            VectorDescriptor::syscall("gettid", slot!(GETTID)),
        ])
        .unwrap();
        let artifacts = emit(&gates, &GenConfig::default());
        let text = &artifacts.get(ArtifactKind::Declarations).contents;
        assert!(text.contains(
            "\nconst _: extern \"C\" fn(&mut ErrorRegisterFrame) = super::handlers::page_fault_handler;\n"
        ));
        assert!(text.contains(
            "\nconst _: extern \"C\" fn(&mut RegisterFrame) = super::handlers::gettid_handler;\n"
        ));
        assert!(!text.contains("divide_error_handler"));
        assert!(text.contains("use trapgen::interrupts::frame::{ErrorRegisterFrame, RegisterFrame};"));
    }

    #[test]
    fn trampolines_select_intel_syntax_before_any_instruction() {
        let artifacts = emit(&gates(), &GenConfig::default());
        let text = &artifacts.get(ArtifactKind::Trampolines).contents;
        let directive = text.find("\n.intel_syntax noprefix\n").unwrap();
        assert!(directive < text.find(".macro ").unwrap());
        assert!(directive < text.find("    push ").unwrap());
    }
}
