//! This module defines the errors that can be returned while constructing
//! hash keys and hash functions.
//!
//! Lookup misses (empty ring, more replicas requested than nodes exist) are
//! not errors - they are expected conditions signaled through [`Option`].

use std::fmt::Display;

use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

/// Error enum with all possible variants
#[derive(Debug, Serialize, PartialEq, Eq)]
pub enum Error {
    /// The digest did not produce enough bytes to construct a hash key.
    InvalidLength { expected: usize, got: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}
