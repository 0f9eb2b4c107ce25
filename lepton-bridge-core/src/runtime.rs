//! Foreign runtime lifecycle
//!
//! A runtime is created once per process, attached to obtain the
//! environment used for every call, and destroyed once at teardown.
//! `destroy` consumes the runtime, and every environment borrows it, so no
//! call can be issued against a destroyed runtime.

use crate::foreign::ForeignEnv;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeInitError {
    #[error("cannot create foreign runtime: {0}")]
    Create(String),
    #[error("cannot attach to foreign runtime: {0}")]
    Attach(String),
    #[error("invalid runtime option `{option}`: {reason}")]
    InvalidOptions { option: String, reason: String },
}

pub trait ForeignRuntime {
    type Env<'rt>: ForeignEnv
    where
        Self: 'rt;

    /// Attach the current thread and return its environment.
    fn attach(&self) -> Result<Self::Env<'_>, RuntimeInitError>;

    /// Tear the runtime down.
    fn destroy(self)
    where
        Self: Sized;
}
