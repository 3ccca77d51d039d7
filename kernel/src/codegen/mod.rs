//! Dispatch-configuration generator.
//!
//! The pipeline is registry, then synthesis, then emission, then a
//! consistency check over the emitted text. Nothing is returned unless
//! every stage succeeds, so a caller never sees a partial artifact set.

pub mod check;
pub mod config;
pub mod emit;
pub mod error;
pub mod registry;
pub mod synth;

pub use config::GenConfig;
pub use emit::{Artifact, ArtifactKind, Artifacts};
pub use error::{ConfigError, ConsistencyError, GenerateError};
pub use registry::{VectorClass, VectorDescriptor, REGISTRY};
pub use synth::GateSpec;

/// Runs the whole pipeline over `registry`.
pub fn generate(
    registry: &[VectorDescriptor],
    config: &GenConfig,
) -> Result<Artifacts, GenerateError> {
    let gates = synth::synthesize_all(registry)?;
    log::debug!("synthesized {} gates", gates.len());

    let artifacts = emit::emit(&gates, config);
    check::check(&gates, &artifacts)?;

    let pending = gates.iter().filter(|gate| !gate.implemented).count();
    log::info!(
        "generated dispatch for {} vectors ({} default bodies)",
        gates.len(),
        pending
    );
    Ok(artifacts)
}
