//! Check failures.
//!
//! A failed check produces exactly one [`CheckError`]. Callers branch on its
//! [`ErrorCode`]; the message is for humans. The attached [`ErrorInfo`]
//! captures where the failure happened and what was being looked at.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::CheckOptions;

/// Failure category.
///
/// # Examples
///
/// ```
/// use param_schema_core::ErrorCode;
///
/// assert_eq!(ErrorCode::MissingParam.prefix(), "Missing Required Parameter");
/// assert_eq!(ErrorCode::BadSchema.as_str(), "badSchema");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    /// A required value is absent or null.
    MissingParam,
    /// An object carries a key its schema does not declare (strict mode).
    BadParam,
    /// A value's kind is not allowed by the schema's `type`.
    BadType,
    /// A value fails an enum, literal or validator rule.
    BadValue,
    /// The schema itself (or one of its validators) is broken.
    BadSchema,
}

impl ErrorCode {
    /// Human-readable message prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            ErrorCode::MissingParam => "Missing Required Parameter",
            ErrorCode::BadParam => "Unrecognized Parameter",
            ErrorCode::BadType => "Invalid Type",
            ErrorCode::BadValue => "Invalid Value",
            ErrorCode::BadSchema => "Invalid Schema",
        }
    }

    /// Wire name of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingParam => "missingParam",
            ErrorCode::BadParam => "badParam",
            ErrorCode::BadType => "badType",
            ErrorCode::BadValue => "badValue",
            ErrorCode::BadSchema => "badSchema",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a node inside its parent: an object field or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Field(String),
    Index(usize),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_string())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

/// Snapshot of the node a failure was raised at.
///
/// The root value and root schema are never included.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorInfo {
    /// Traversal key of the failing node, `None` at the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    /// Offending value, `None` when it was absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// JSON rendering of the schema fragment being applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Options in effect at the failing node.
    pub options: CheckOptions,
}

/// A failed check.
///
/// # Examples
///
/// ```
/// use param_schema_core::{CheckError, ErrorCode};
///
/// let err = CheckError::new(ErrorCode::BadValue, "must be even");
/// assert_eq!(err.code, ErrorCode::BadValue);
/// assert_eq!(err.to_string(), "Invalid Value: must be even");
/// ```
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct CheckError {
    pub code: ErrorCode,
    pub message: String,
    pub info: ErrorInfo,
}

impl CheckError {
    /// Builds an error whose message is `"<prefix>: <message>"`.
    pub fn new(code: ErrorCode, message: impl fmt::Display) -> Self {
        Self {
            code,
            message: format!("{}: {message}", code.prefix()),
            info: ErrorInfo::default(),
        }
    }

    /// Replaces the attached info.
    pub fn with_info(mut self, info: ErrorInfo) -> Self {
        self.info = info;
        self
    }

    /// Traversal key of the failing node, if any.
    pub fn key(&self) -> Option<&Key> {
        self.info.key.as_ref()
    }
}

/// What a failing component hands to the error constructor: either a bare
/// message, or an error it already built.
#[derive(Debug)]
pub(crate) enum Failure {
    Message(String),
    Error(CheckError),
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Failure::Message(message)
    }
}

impl From<&str> for Failure {
    fn from(message: &str) -> Self {
        Failure::Message(message.to_string())
    }
}

impl From<CheckError> for Failure {
    fn from(err: CheckError) -> Self {
        Failure::Error(err)
    }
}

/// Builds the error returned for a failing node.
///
/// A prebuilt error keeps its own code and message; only its info is
/// replaced.
pub(crate) fn fail(code: ErrorCode, failure: impl Into<Failure>, info: ErrorInfo) -> CheckError {
    let err = match failure.into() {
        Failure::Message(message) => CheckError::new(code, message),
        Failure::Error(err) => err,
    }
    .with_info(info);

    tracing::debug!(code = %err.code, key = ?err.info.key, "check failed: {}", err.message);
    err
}
