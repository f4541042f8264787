//! Error types for the query engine

use std::path::PathBuf;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("DWARF parsing error: {0}")]
    Dwarf(#[from] gimli::Error),
    #[error("object file error: {0}")]
    Object(#[from] object::Error),
    #[error("no debug information in {path}")]
    NoDebugInfo { path: PathBuf },
    #[error("{op}: cannot compare constants from domain {lhs} against domain {rhs}")]
    IncomparableConstants {
        op: String,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("{op}: invalid pattern: {source}")]
    BadPattern {
        op: String,
        #[source]
        source: regex::Error,
    },
    #[error("cannot merge dictionaries: {name} is bound to a non-overloadable builtin")]
    DictMerge { name: String },
    #[error("{op}: stack underflow")]
    Underflow { op: String },
}

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
