// src/error.rs
use thiserror::Error;

/// Errors surfaced by the loader's public API.
///
/// Parse/allocation/symbol/packing errors abort a `load` call and are
/// returned to the caller. A `RuntimeFault` is never returned as an `Err` —
/// it is formatted into the output stream and `load` still returns `Ok`
/// (see the fault boundary in [`crate::loader`]). The variant exists so the
/// formatting logic can be unit tested on its own.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to parse COFF image: {0}")]
    Parse(String),

    #[error("memory allocation failed: {0}")]
    Allocation(String),

    #[error("failed to resolve symbol '{0}'")]
    SymbolResolution(String),

    #[error("failed to pack argument: {0}")]
    Packing(String),

    #[error("COFF object faulted during execution: {0}")]
    RuntimeFault(String),
}

pub type Result<T> = std::result::Result<T, LoaderError>;
