//! Error types for the arena, the stack and configuration loading

use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;

/// Failure to obtain a block from a memory resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// No free block is large enough and the remaining bump capacity is too small
    OutOfMemory { requested: usize, available: usize },
    /// The backing buffer cannot be described by a valid layout
    InvalidCapacity { capacity: usize },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested, available } => {
                write!(f, "Out of memory: requested {} bytes, {} available", requested, available)
            }
            Self::InvalidCapacity { capacity } => {
                write!(f, "Invalid arena capacity: {} bytes", capacity)
            }
        }
    }
}

impl std::error::Error for AllocError {}

/// Errors surfaced by [`PmrStack`](crate::PmrStack) operations
///
/// `E` is the error produced by a fallible element constructor passed to
/// `try_emplace`; infallible pushes use the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackError<E = Infallible> {
    OutOfMemory(AllocError),
    /// The resource returned a block unsuitable for the node type
    Misaligned { align: usize, address: usize },
    EmptyContainer,
    ConstructionFailure(E),
}

impl<E> StackError<E> {
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory(AllocError::OutOfMemory { .. }))
    }
}

impl<E> From<AllocError> for StackError<E> {
    fn from(err: AllocError) -> Self {
        Self::OutOfMemory(err)
    }
}

impl<E: fmt::Display> fmt::Display for StackError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory(err) => write!(f, "{}", err),
            Self::Misaligned { align, address } => {
                write!(f, "Block at {:#x} is not aligned to {} bytes", address, align)
            }
            Self::EmptyContainer => write!(f, "stack is empty"),
            Self::ConstructionFailure(err) => write!(f, "Element construction failed: {}", err),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for StackError<E> {}

/// Configuration loading failure
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Failed to read config {}: {}", path.display(), source)
            }
            Self::Parse(err) => write!(f, "Failed to parse config: {}", err),
            Self::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err)
    }
}
