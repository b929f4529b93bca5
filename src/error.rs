//! Error types for aggregation, generation and persistence.
//!
//! Routine absence (unknown player, missing stat path, unknown record id)
//! is never an error: those lookups return `Option`. Everything that is
//! represented here resolves to one human-readable message plus a short
//! reason code (see [`StatError::code`]).

use std::path::PathBuf;
use thiserror::Error;

/// Format a list of names as a readable string.
fn format_names(names: &[String]) -> String {
    if names.is_empty() {
        return String::from("(none)");
    }
    names.join(", ")
}

/// Errors that can occur while aggregating stats or generating artifacts.
///
/// # Examples
///
/// ```rust
/// use scorecraft::StatError;
///
/// let err = StatError::PresetExists("mining".to_string());
/// assert_eq!(err.to_string(), "Preset already exists: mining");
/// assert_eq!(err.code(), "preset_exists");
/// ```
#[derive(Debug, Error)]
pub enum StatError {
    /// A filesystem operation failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be read or written.
    #[error("Invalid JSON at {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A preset with this name is already registered.
    #[error("Preset already exists: {0}")]
    PresetExists(String),

    /// No preset with this name is registered.
    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    /// The reserved default preset cannot be changed by users.
    #[error("Preset {0} is protected and cannot be modified")]
    ProtectedPreset(String),

    /// Two records of different kinds were passed to a diff.
    #[error("Cannot diff records of kind {first} and {second}")]
    RecordKindMismatch { first: String, second: String },

    /// The requested generation kind is not valid for this operation.
    #[error("Invalid generation kind for {operation}: {kind}")]
    InvalidGenKind { operation: String, kind: String },

    /// The abbreviation allocator gave up before finding unique names.
    #[error(
        "Could not allocate unique abbreviations after {attempts} attempts: {}",
        format_names(.names)
    )]
    AbbreviationExhausted { attempts: usize, names: Vec<String> },

    /// The merge configuration is missing inputs or an output.
    #[error("Invalid merge configuration: {0}")]
    InvalidMergeConfig(String),

    /// A player was named that has no known uuid.
    #[error("Unknown player: {0}")]
    UnknownPlayer(String),
}

impl StatError {
    /// Short, stable reason code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            StatError::Io { .. } => "io",
            StatError::Json { .. } => "json",
            StatError::PresetExists(_) => "preset_exists",
            StatError::PresetNotFound(_) => "preset_not_found",
            StatError::ProtectedPreset(_) => "protected_preset",
            StatError::RecordKindMismatch { .. } => "record_kind_mismatch",
            StatError::InvalidGenKind { .. } => "invalid_gen_kind",
            StatError::AbbreviationExhausted { .. } => "abbreviation_exhausted",
            StatError::InvalidMergeConfig(_) => "invalid_merge_config",
            StatError::UnknownPlayer(_) => "unknown_player",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StatError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StatError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, StatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StatError::PresetNotFound("mining".to_string());
        assert!(err.to_string().contains("mining"));
        assert_eq!(err.code(), "preset_not_found");
    }

    #[test]
    fn test_exhausted_display() {
        let err = StatError::AbbreviationExhausted {
            attempts: 52,
            names: vec!["stone".to_string(), "stones".to_string()],
        };
        let display = err.to_string();
        assert!(display.contains("52 attempts"));
        assert!(display.contains("stone, stones"));
    }

    #[test]
    fn test_io_display_includes_path() {
        let err = StatError::io(
            "/tmp/world/stats",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/world/stats"));
        assert_eq!(err.code(), "io");
    }
}
