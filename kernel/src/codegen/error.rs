use alloc::string::String;
use core::fmt;

use super::{emit::ArtifactKind, registry::VectorClass};

/// A registry entry that breaks a wiring rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidName {
        name: &'static str,
    },
    DuplicateName {
        name: &'static str,
    },
    DuplicateSlot {
        first: &'static str,
        second: &'static str,
        vector: u8,
    },
    ReservedSlot {
        name: &'static str,
        vector: u8,
    },
    ClassMismatch {
        name: &'static str,
        vector: u8,
        class: VectorClass,
    },
    ErrorCodeMismatch {
        name: &'static str,
        vector: u8,
        expected: bool,
    },
    UserInvokableDevice {
        name: &'static str,
    },
}

impl ConfigError {
    /// The offending vector (the later one for duplicate slots).
    pub fn vector_name(&self) -> &'static str {
        match self {
            ConfigError::InvalidName { name }
            | ConfigError::DuplicateName { name }
            | ConfigError::ReservedSlot { name, .. }
            | ConfigError::ClassMismatch { name, .. }
            | ConfigError::ErrorCodeMismatch { name, .. }
            | ConfigError::UserInvokableDevice { name } => *name,
            ConfigError::DuplicateSlot { second, .. } => *second,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidName { name } => {
                write!(f, "invalid vector name {name:?}")
            }
            ConfigError::DuplicateName { name } => {
                write!(f, "vector {name} declared more than once")
            }
            ConfigError::DuplicateSlot {
                first,
                second,
                vector,
            } => write!(f, "{first} and {second} both install into slot {vector:#x}"),
            ConfigError::ReservedSlot { name, vector } => {
                write!(f, "{name}: slot {vector:#x} is reserved by the architecture")
            }
            ConfigError::ClassMismatch {
                name,
                vector,
                class,
            } => write!(f, "{name}: class {class:?} cannot use slot {vector:#x}"),
            ConfigError::ErrorCodeMismatch {
                name,
                vector,
                expected,
            } => {
                if *expected {
                    write!(f, "{name}: the processor pushes an error code for slot {vector:#x}")
                } else {
                    write!(f, "{name}: no error code is ever pushed for slot {vector:#x}")
                }
            }
            ConfigError::UserInvokableDevice { name } => {
                write!(f, "{name}: device interrupts cannot be raised from ring 3")
            }
        }
    }
}

/// The emitted artifacts disagree about the set of vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    Missing { artifact: ArtifactKind, name: String },
    Duplicate { artifact: ArtifactKind, name: String },
    Unexpected { artifact: ArtifactKind, name: String },
    ShapeMismatch { artifact: ArtifactKind, name: String },
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyError::Missing { artifact, name } => {
                write!(f, "{name} is missing from {}", artifact.file_name())
            }
            ConsistencyError::Duplicate { artifact, name } => {
                write!(f, "{name} appears more than once in {}", artifact.file_name())
            }
            ConsistencyError::Unexpected { artifact, name } => {
                write!(f, "{name} does not belong in {}", artifact.file_name())
            }
            ConsistencyError::ShapeMismatch { artifact, name } => write!(
                f,
                "{name} has the wrong register frame in {}",
                artifact.file_name()
            ),
        }
    }
}

/// Why a generation run produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    Config(ConfigError),
    Consistency(ConsistencyError),
}

impl From<ConfigError> for GenerateError {
    fn from(err: ConfigError) -> Self {
        GenerateError::Config(err)
    }
}

impl From<ConsistencyError> for GenerateError {
    fn from(err: ConsistencyError) -> Self {
        GenerateError::Consistency(err)
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::Config(err) => write!(f, "configuration error: {err}"),
            GenerateError::Consistency(err) => write!(f, "consistency error: {err}"),
        }
    }
}
