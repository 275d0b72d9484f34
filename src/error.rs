//! Crate-level error taxonomy.
//!
//! Redaction failures fail closed (the record is withheld); delivery
//! failures fail safe (retried without data loss). The types keep the
//! two apart, and `Transience`/`Effect` let callers pick retry behavior
//! mechanically instead of pattern-matching message strings.

use thiserror::Error;

use crate::config::ConfigError;
use crate::core::CoreError;
use crate::dispatcher::{CursorError, DeliveryError};
use crate::projector::ProjectError;
use crate::replica::RegistryError;
use crate::store::StoreError;

/// Whether retrying this operation may succeed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transience {
    /// Retry will never help without changing inputs/state.
    Permanent,
    /// Retry may help (transient contention/outage).
    Retryable,
    /// Unknown if retry will help.
    Unknown,
}

impl Transience {
    pub fn is_retryable(self) -> bool {
        matches!(self, Transience::Retryable)
    }
}

/// What we know about side effects when an error is returned.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Effect {
    /// Definitely no side effects occurred.
    None,
    /// Side effects definitely occurred (locally or remotely).
    Some,
    /// We don't know if side effects occurred.
    Unknown,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::None => "none",
            Effect::Some => "some",
            Effect::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn transience(&self) -> Transience {
        match self {
            Error::Core(err) => err.transience(),
            Error::Store(err) => err.transience(),
            Error::Project(err) => err.transience(),
            Error::Delivery(err) => err.transience(),
            Error::Cursor(err) => err.transience(),
            Error::Registry(_) | Error::Config(_) => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Error::Delivery(err) => err.effect(),
            _ => Effect::None,
        }
    }
}
