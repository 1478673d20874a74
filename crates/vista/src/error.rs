//! Error types for view resolution and rendering.
//!
//! This module provides [`ViewError`], the single error type returned by every
//! public operation. Failures fall into three families:
//!
//! - Lookup: [`ViewError::NotFound`], [`ViewError::MissingLayout`],
//!   [`ViewError::Read`], [`ViewError::InvalidUtf8`]
//! - Template engine: [`ViewError::Parse`], [`ViewError::Execute`],
//!   [`ViewError::TooDeep`]
//! - Surroundings: [`ViewError::Write`], [`ViewError::Config`]
//!
//! None of them are retried internally.

use std::io;
use std::path::PathBuf;

/// Error type for view operations.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// No search directory contains the requested file.
    #[error("{name} not found")]
    NotFound { name: String },

    /// The default layout could not be resolved.
    #[error("failed to view layout '{layout}': {source}")]
    MissingLayout {
        layout: String,
        #[source]
        source: Box<ViewError>,
    },

    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file contents are not valid UTF-8.
    #[error("template {name} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Template syntax error.
    #[error("failed to parse template {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// Runtime failure while binding data to a template.
    #[error("failed to execute template {name}: {source}")]
    Execute {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    /// `view` or `yield` calls nested past the allowed depth.
    #[error("fragments nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    /// Writing the rendered body to the response failed.
    #[error("failed to write response: {0}")]
    Write(#[source] io::Error),

    /// A configuration document could not be parsed.
    #[error("invalid view configuration: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl ViewError {
    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Returns true if this error means a file was absent from every search path.
    ///
    /// A [`ViewError::MissingLayout`] counts when its cause is a lookup miss.
    pub fn is_not_found(&self) -> bool {
        match self {
            ViewError::NotFound { .. } => true,
            ViewError::MissingLayout { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ViewError::not_found("hello.html");
        assert_eq!(err.to_string(), "hello.html not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_layout_wraps_lookup_miss() {
        let err = ViewError::MissingLayout {
            layout: "layouts/application".into(),
            source: Box::new(ViewError::not_found("layouts/application.html")),
        };

        let msg = err.to_string();
        assert!(msg.contains("layouts/application"));
        assert!(msg.contains("not found"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_error_is_not_lookup_miss() {
        let source = minijinja::Error::new(minijinja::ErrorKind::SyntaxError, "unexpected end");
        let err = ViewError::Parse {
            name: "broken.html".into(),
            source,
        };
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("broken.html"));
    }

    #[test]
    fn test_from_yaml_error() {
        let yaml_err = serde_yaml::from_str::<Vec<String>>("{ not: a list").unwrap_err();
        let err: ViewError = yaml_err.into();
        assert!(matches!(err, ViewError::Config(_)));
    }
}
