//! Error types shared across the bridge

use crate::config::ConfigError;
use crate::foreign::ForeignError;
use crate::particle::ParticleError;
use crate::runtime::RuntimeInitError;
use crate::session::SessionStateError;
use crate::symbols::SymbolResolutionError;
use thiserror::Error;

/// Any failure surfaced by a public bridge operation
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Runtime(#[from] RuntimeInitError),

    #[error(transparent)]
    Symbol(#[from] SymbolResolutionError),

    #[error(transparent)]
    State(#[from] SessionStateError),

    #[error(transparent)]
    Foreign(#[from] ForeignError),

    #[error(transparent)]
    Particle(#[from] ParticleError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The descriptor and position cursors of a pair ran out of step.
    #[error("{sequence} cursors out of step at element {index}: {detail}")]
    PairingMismatch {
        sequence: &'static str,
        index: usize,
        detail: &'static str,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl BridgeError {
    /// Short category name used in diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            BridgeError::Runtime(_) => "runtime",
            BridgeError::Symbol(_) => "symbol resolution",
            BridgeError::State(_) => "session state",
            BridgeError::Foreign(_) => "foreign call",
            BridgeError::Particle(_) | BridgeError::InvalidArgument(_) => "invalid argument",
            BridgeError::Config(_) => "configuration",
            BridgeError::PairingMismatch { .. } => "result extraction",
        }
    }
}
