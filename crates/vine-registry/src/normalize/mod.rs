//! Document normalization.
//!
//! Old registry documents carry version labels that are not valid semver.
//! Normalization rewrites them in place before the document is split.

use serde_json::{Map, Value};
use vine_core::types::clean_version;

/// Pluggable document normalization
pub trait Normalize: Send + Sync {
    fn normalize(&self, document: &mut Value);
}

/// Sanitizes version labels of an npm registry document.
///
/// Rewrites the keys of `versions` and `time`, each version's `version`
/// field, and the values of `dist-tags`. Labels that cannot be read leniently
/// are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryNormalizer;

impl Normalize for RegistryNormalizer {
    fn normalize(&self, document: &mut Value) {
        let Some(fields) = document.as_object_mut() else {
            return;
        };

        if let Some(Value::Object(versions)) = fields.get_mut("versions") {
            rekey(versions);
            for version in versions.values_mut() {
                if let Some(Value::String(label)) = version.get_mut("version") {
                    clean_in_place(label);
                }
            }
        }

        if let Some(Value::Object(tags)) = fields.get_mut("dist-tags") {
            for tag in tags.values_mut() {
                if let Value::String(label) = tag {
                    clean_in_place(label);
                }
            }
        }

        if let Some(Value::Object(time)) = fields.get_mut("time") {
            rekey(time);
        }
    }
}

fn clean_in_place(label: &mut String) {
    if let Some(clean) = clean_version(label) {
        *label = clean;
    }
}

/// Rewrite version keys, keeping order. The first entry wins on collision.
fn rekey(map: &mut Map<String, Value>) {
    let entries = std::mem::take(map);
    for (key, value) in entries {
        let key = clean_version(&key).unwrap_or(key);
        if !map.contains_key(&key) {
            map.insert(key, value);
        }
    }
}
