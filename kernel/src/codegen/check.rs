//! Cross-artifact consistency check.
//!
//! Reads back the rendered text of each artifact, extracts the vectors it
//! actually defines, and compares them against the synthesized gates. This
//! runs on the final text, so a bug in any renderer is caught before
//! anything is written.

use alloc::{collections::BTreeMap, string::String, vec::Vec};

use super::{
    emit::{ArtifactKind, Artifacts},
    error::ConsistencyError,
    synth::GateSpec,
};
use crate::interrupts::frame::FrameShape;

/// A vector name found in an artifact, with the frame shape it was given
/// when the artifact states one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defined {
    pub name: String,
    pub shape: Option<FrameShape>,
}

fn shape_of_template(template: &str) -> Option<FrameShape> {
    [FrameShape::Plain, FrameShape::WithErrorCode]
        .into_iter()
        .find(|shape| shape.template() == template)
}

fn shape_of_capture(capture: &str) -> Option<FrameShape> {
    [FrameShape::Plain, FrameShape::WithErrorCode]
        .into_iter()
        .find(|shape| shape.capture_type() == capture)
}

fn entry_name(symbol: &str) -> Option<&str> {
    symbol.strip_prefix("asm_")?.strip_suffix("_handler")
}

/// `TRAMPOLINE asm_<name>_handler, <name>_handler`
fn trampoline(line: &str) -> Option<Defined> {
    let (template, rest) = line.split_once(' ')?;
    let (entry, _handler) = rest.split_once(", ")?;
    Some(Defined {
        name: entry_name(entry)?.into(),
        shape: Some(shape_of_template(template)?),
    })
}

/// `pub fn asm_<name>_handler();`
fn declaration(line: &str) -> Option<Defined> {
    let symbol = line.trim().strip_prefix("pub fn ")?.strip_suffix("();")?;
    Some(Defined {
        name: entry_name(symbol)?.into(),
        shape: None,
    })
}

/// `.install(idt::<SLOT>, asm_<name>_handler, GateKind::<kind>)?`
fn installation(line: &str) -> Option<Defined> {
    let (_, args) = line.split_once(".install(")?;
    let mut args = args.split(", ");
    let _slot = args.next()?;
    Some(Defined {
        name: entry_name(args.next()?)?.into(),
        shape: None,
    })
}

/// `pub extern "C" fn <name>_handler(frame: &mut <Capture>) {`
fn default_body(line: &str) -> Option<Defined> {
    let rest = line.strip_prefix("pub extern \"C\" fn ")?;
    let (symbol, rest) = rest.split_once("(frame: &mut ")?;
    let capture = rest.strip_suffix(") {")?;
    Some(Defined {
        name: symbol.strip_suffix("_handler")?.into(),
        shape: Some(shape_of_capture(capture)?),
    })
}

/// `const _: extern "C" fn(&mut <Capture>) = <module>::<name>_handler;`
fn handler_assertion(line: &str) -> Option<Defined> {
    let rest = line.strip_prefix("const _: extern \"C\" fn(&mut ")?;
    let (capture, path) = rest.split_once(") = ")?;
    let symbol = path.strip_suffix(';')?.rsplit("::").next()?;
    Some(Defined {
        name: symbol.strip_suffix("_handler")?.into(),
        shape: Some(shape_of_capture(capture)?),
    })
}

/// Implemented handlers the declarations pin to a capture type.
pub fn asserted_handlers(text: &str) -> Vec<Defined> {
    text.lines().filter_map(handler_assertion).collect()
}

/// Every vector an artifact defines, in the order it defines them.
pub fn defined_names(kind: ArtifactKind, text: &str) -> Vec<Defined> {
    let parse: fn(&str) -> Option<Defined> = match kind {
        ArtifactKind::Trampolines => trampoline,
        ArtifactKind::Declarations => declaration,
        ArtifactKind::Installer => installation,
        ArtifactKind::DefaultBodies => default_body,
    };
    text.lines().filter_map(parse).collect()
}

fn check_artifact<'a>(
    kind: ArtifactKind,
    expected: impl Iterator<Item = &'a GateSpec>,
    defined: Vec<Defined>,
) -> Result<(), ConsistencyError> {
    let mut found: BTreeMap<String, Vec<Option<FrameShape>>> = BTreeMap::new();
    for defined in defined {
        found.entry(defined.name).or_default().push(defined.shape);
    }

    for gate in expected {
        let name = || String::from(gate.name);
        let shapes = found.remove(gate.name).ok_or_else(|| ConsistencyError::Missing {
            artifact: kind,
            name: name(),
        })?;
        match shapes.as_slice() {
            [shape] => {
                if shape.is_some_and(|shape| shape != gate.frame) {
                    return Err(ConsistencyError::ShapeMismatch {
                        artifact: kind,
                        name: name(),
                    });
                }
            }
            _ => {
                return Err(ConsistencyError::Duplicate {
                    artifact: kind,
                    name: name(),
                })
            }
        }
    }

    match found.into_keys().next() {
        Some(name) => Err(ConsistencyError::Unexpected {
            artifact: kind,
            name,
        }),
        None => Ok(()),
    }
}

/// Fails unless every artifact defines exactly the vectors it should, once
/// each, with frame shapes that agree with the gates.
///
/// The default bodies must cover exactly the unimplemented vectors, and the
/// declarations must pin exactly the implemented handlers to their frame.
pub fn check(gates: &[GateSpec], artifacts: &Artifacts) -> Result<(), ConsistencyError> {
    let implemented = || gates.iter().filter(|gate| gate.implemented);
    let pending = || gates.iter().filter(|gate| !gate.implemented);

    for kind in ArtifactKind::ALL {
        let text = &artifacts.get(kind).contents;
        let defined = defined_names(kind, text);
        match kind {
            ArtifactKind::DefaultBodies => check_artifact(kind, pending(), defined)?,
            ArtifactKind::Declarations => {
                check_artifact(kind, gates.iter(), defined)?;
                check_artifact(kind, implemented(), asserted_handlers(text))?;
            }
            _ => check_artifact(kind, gates.iter(), defined)?,
        }
    }
    Ok(())
}
