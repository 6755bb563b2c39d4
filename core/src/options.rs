//! Check options and the type-matching override merge.
//!
//! Options are resolved once per call and then re-derived at every level of
//! the traversal: a child never sees its parent's record, only a copy with
//! that node's own overrides applied. An override only replaces an existing
//! option when both have the same [`Kind`], so a malformed setting such as
//! `"strict": "yes"` leaves the inherited boolean in place.
//!
//! # Example
//!
//! ```
//! use param_schema_core::CheckOptions;
//! use serde_json::json;
//!
//! let overrides = json!({"strict": true, "ignoreRequired": "yes", "tenant": "acme"});
//! let merged = CheckOptions::default().merged(overrides.as_object().unwrap());
//!
//! assert!(merged.strict);
//! assert!(!merged.ignore_required);
//! assert_eq!(merged.extra["tenant"], "acme");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Kind;

/// Per-call configuration.
///
/// Recognized keys use their camelCase wire names (`strict`,
/// `ignoreDefaults`, `ignoreRequired`, `doNotCoerce`, `untrusted`); anything
/// else lands in [`extra`](CheckOptions::extra) and is handed to validators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckOptions {
    /// Reject object keys the schema does not declare.
    pub strict: bool,
    /// Leave absent fields absent even when their schema has a default.
    pub ignore_defaults: bool,
    /// Skip every required check.
    pub ignore_required: bool,
    /// Never convert string input to the declared number/boolean type.
    pub do_not_coerce: bool,
    /// Refuse to run validator functions.
    pub untrusted: bool,
    /// Caller-supplied keys that are not recognized options.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckOptions {
    /// Returns a copy of `self` with `overrides` applied.
    ///
    /// # Examples
    ///
    /// ```
    /// use param_schema_core::CheckOptions;
    /// use serde_json::json;
    ///
    /// let base = CheckOptions { strict: true, ..CheckOptions::default() };
    /// let merged = base.merged(json!({"strict": 0}).as_object().unwrap());
    /// assert!(merged.strict);
    /// assert!(base.strict);
    /// ```
    pub fn merged(&self, overrides: &Map<String, Value>) -> Self {
        let mut merged = self.clone();
        for (key, value) in overrides {
            merged.apply(key, value);
        }
        merged
    }

    /// Applies a single override in place.
    pub(crate) fn apply(&mut self, key: &str, value: &Value) {
        let flag = match key {
            "strict" => &mut self.strict,
            "ignoreDefaults" => &mut self.ignore_defaults,
            "ignoreRequired" => &mut self.ignore_required,
            "doNotCoerce" => &mut self.do_not_coerce,
            "untrusted" => &mut self.untrusted,
            _ => {
                self.apply_extra(key, value);
                return;
            }
        };

        match value.as_bool() {
            Some(b) => *flag = b,
            None => tracing::debug!(
                option = key,
                kind = %Kind::of(value),
                "ignoring option override of mismatched type"
            ),
        }
    }

    fn apply_extra(&mut self, key: &str, value: &Value) {
        if let Some(existing) = self.extra.get(key) {
            if Kind::of(existing) != Kind::of(value) {
                tracing::debug!(
                    option = key,
                    kind = %Kind::of(value),
                    expected = %Kind::of(existing),
                    "ignoring option override of mismatched type"
                );
                return;
            }
        }
        self.extra.insert(key.to_string(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn overrides(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_adopts_matching_booleans() {
        let merged = CheckOptions::default().merged(&overrides(json!({
            "strict": true,
            "ignoreDefaults": true,
            "ignoreRequired": true,
            "doNotCoerce": true,
            "untrusted": true,
        })));

        assert!(merged.strict);
        assert!(merged.ignore_defaults);
        assert!(merged.ignore_required);
        assert!(merged.do_not_coerce);
        assert!(merged.untrusted);
    }

    #[test]
    fn test_merge_keeps_base_on_type_mismatch() {
        let base = CheckOptions {
            ignore_required: true,
            ..CheckOptions::default()
        };
        let merged = base.merged(&overrides(json!({"ignoreRequired": "no", "strict": null})));

        assert!(merged.ignore_required);
        assert!(!merged.strict);
    }

    #[test]
    fn test_merge_adopts_unknown_keys_then_type_matches_them() {
        let first = CheckOptions::default().merged(&overrides(json!({"limit": 10})));
        assert_eq!(first.extra["limit"], 10);

        let second = first.merged(&overrides(json!({"limit": "many"})));
        assert_eq!(second.extra["limit"], 10);

        let third = second.merged(&overrides(json!({"limit": 20})));
        assert_eq!(third.extra["limit"], 20);
    }

    #[test]
    fn test_merge_leaves_base_untouched() {
        let base = CheckOptions::default();
        let _ = base.merged(&overrides(json!({"strict": true, "x": 1})));
        assert_eq!(base, CheckOptions::default());
    }

    #[test]
    fn test_options_deserialize_from_camel_case() {
        let options: CheckOptions =
            serde_json::from_value(json!({"doNotCoerce": true, "region": "eu"})).unwrap();
        assert!(options.do_not_coerce);
        assert!(!options.strict);
        assert_eq!(options.extra["region"], "eu");
    }
}
