//! Option files for `param-check`.
//!
//! An option file is a YAML mapping of check options. Recognized keys use
//! their camelCase names; any other key is passed through to validators.
//!
//! # Example YAML
//!
//! ```yaml
//! strict: true
//! ignoreDefaults: false
//! doNotCoerce: false
//! tenant: acme
//! ```

use std::io::BufReader;
use std::path::Path;

use serde_json::{Map, Value};

/// Loads an option file into an override map.
///
/// The map is merged over the default options with the same type-matching
/// rule as any other override, so `strict: "yes"` is ignored rather than
/// rejected.
pub fn load_options(path: &Path) -> Result<Map<String, Value>, String> {
    let file = std::fs::File::open(path)
        .map_err(|err| format!("Failed to open option file '{}': {err}", path.display()))?;
    let reader = BufReader::new(file);
    let parsed: Value = serde_yaml::from_reader(reader)
        .map_err(|err| format!("Failed to parse option file '{}': {err}", path.display()))?;

    match parsed {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(format!(
            "Option file '{}' must contain a mapping",
            path.display()
        )),
    }
}
