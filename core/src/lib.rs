//! Schema-based checking and normalization of loosely-typed values.
//!
//! This crate checks a [`serde_json::Value`] (parsed JSON, query-string
//! parameters and the like) against a declared [`Schema`] and reports a
//! single [`CheckError`] or success:
//!
//! - [`Schema`] — the expected shape at one position: allowed kinds,
//!   required/default, fields or elements, and a scalar rule.
//! - [`SchemaValue`] — the scalar rule: enum, literal or [`Validator`].
//! - [`CheckOptions`] — per-call switches, merged per node with
//!   [`CheckOptions::merged`] so that only same-typed overrides apply.
//! - [`Kind`] — classification used by type checks and option merging.
//!
//! [`check`] fills in defaults and converts string input to declared
//! numbers and booleans in place. The schema is never modified.
//!
//! # Example
//!
//! ```
//! use param_schema_core::*;
//! use serde_json::{Map, json};
//!
//! let schema = Schema::typed("object")
//!     .field("id", Schema::typed("number").required())
//!     .field("verbose", Schema::typed("boolean").with_default(json!(false)))
//!     .field("format", Schema::typed("string").one_of("json|yaml"));
//!
//! // Everything arrives as strings from a query string.
//! let mut params = json!({"id": "17", "format": "yaml"});
//! check(&mut params, &schema, &Map::new()).unwrap();
//! assert_eq!(params, json!({"id": 17, "format": "yaml", "verbose": false}));
//!
//! let mut missing = json!({});
//! let err = check(&mut missing, &schema, &Map::new()).unwrap_err();
//! assert_eq!(err.code, ErrorCode::MissingParam);
//! assert_eq!(err.key(), Some(&Key::from("id")));
//! ```

mod coerce;
mod error;
mod kind;
mod options;
mod rules;
mod types;
mod validate;

pub use error::{CheckError, ErrorCode, ErrorInfo, Key};
pub use kind::{Kind, deep_clone, flag_is_set, is_truthy};
pub use options::CheckOptions;
pub use types::*;
pub use validate::{check, check_json, check_with};
