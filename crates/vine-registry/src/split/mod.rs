//! Splitting a registry document into units and assets

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;
use vine_core::types::Position;

use crate::api::DistInfo;

/// One version of a document, addressed by a version or a dist-tag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub label: String,
    /// Independent copy of the version entry
    pub payload: Value,
}

/// A downloadable artifact referenced by a version
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asset {
    /// Path component of the tarball URL
    pub path: String,
    /// Tarball URL
    pub locator: String,
    pub integrity_token: Option<String>,
}

/// A change resolved into its normalized document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDocument {
    pub name: String,
    pub position: Position,
    pub document: Value,
    pub units: Vec<Unit>,
    pub assets: Vec<Asset>,
}

impl ResolvedDocument {
    /// Split a normalized document.
    ///
    /// `fallback_name` is used when the document has no `name` field.
    pub fn from_document(position: Position, fallback_name: &str, document: Value) -> Self {
        let name = document
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(fallback_name)
            .to_string();

        Self {
            units: split_units(&document),
            assets: split_assets(&document),
            name,
            position,
            document,
        }
    }
}

/// Units for every dist-tag, then every concrete version, in document order
pub fn split_units(document: &Value) -> Vec<Unit> {
    let Some(versions) = document.get("versions").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut units = Vec::new();
    let mut add_version_as = |label: &str, version: &str| {
        if let Some(payload) = versions.get(version) {
            units.push(Unit {
                label: label.to_string(),
                payload: payload.clone(),
            });
        }
    };

    if let Some(tags) = document.get("dist-tags").and_then(Value::as_object) {
        for (tag, version) in tags {
            if let Some(version) = version.as_str() {
                add_version_as(tag, version);
            }
        }
    }

    for version in versions.keys() {
        add_version_as(version, version);
    }

    units
}

/// Assets for every version that carries a tarball
pub fn split_assets(document: &Value) -> Vec<Asset> {
    let Some(versions) = document.get("versions").and_then(Value::as_object) else {
        return Vec::new();
    };

    versions
        .iter()
        .filter_map(|(version, entry)| {
            let dist = DistInfo::from_version(entry)?;
            let url = match Url::parse(&dist.tarball) {
                Ok(url) => url,
                Err(e) => {
                    debug!(version = %version, tarball = %dist.tarball, error = %e, "skipping unparsable tarball URL");
                    return None;
                },
            };

            Some(Asset {
                path: url.path().to_string(),
                integrity_token: dist.integrity_token().map(str::to_string),
                locator: dist.tarball,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "name": "fnp",
            "dist-tags": { "latest": "1.1.0", "next": "2.0.0-beta", "stale": "0.0.1" },
            "versions": {
                "1.0.0": {
                    "version": "1.0.0",
                    "dist": {
                        "tarball": "https://registry.npmjs.org/fnp/-/fnp-1.0.0.tgz",
                        "shasum": "aaa"
                    }
                },
                "1.1.0": {
                    "version": "1.1.0",
                    "dist": {
                        "tarball": "https://registry.npmjs.org/fnp/-/fnp-1.1.0.tgz",
                        "integrity": "sha512-bbb"
                    }
                },
                "2.0.0-beta": { "version": "2.0.0-beta" }
            }
        })
    }

    #[test]
    fn test_units_tags_then_versions() {
        let units = split_units(&document());
        let labels: Vec<&str> = units.iter().map(|u| u.label.as_str()).collect();

        // "stale" points at a version that does not exist
        assert_eq!(labels, vec!["latest", "next", "1.0.0", "1.1.0", "2.0.0-beta"]);
        assert_eq!(units[0].payload["version"], "1.1.0");
        assert_eq!(units[1].payload["version"], "2.0.0-beta");
    }

    #[test]
    fn test_unit_payloads_do_not_alias() {
        let mut units = split_units(&document());
        units[0].payload["version"] = json!("mutated");

        // "latest" and "1.1.0" started as the same version entry
        assert_eq!(units[3].label, "1.1.0");
        assert_eq!(units[3].payload["version"], "1.1.0");
    }

    #[test]
    fn test_assets_from_dist() {
        let assets = split_assets(&document());

        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].path, "/fnp/-/fnp-1.0.0.tgz");
        assert_eq!(assets[0].locator, "https://registry.npmjs.org/fnp/-/fnp-1.0.0.tgz");
        assert_eq!(assets[0].integrity_token.as_deref(), Some("aaa"));
        assert_eq!(assets[1].integrity_token.as_deref(), Some("sha512-bbb"));
    }

    #[test]
    fn test_document_without_versions() {
        let resolved =
            ResolvedDocument::from_document(Position::new(3), "ghost", json!({"_id": "ghost"}));

        assert_eq!(resolved.name, "ghost");
        assert!(resolved.units.is_empty());
        assert!(resolved.assets.is_empty());
    }
}
