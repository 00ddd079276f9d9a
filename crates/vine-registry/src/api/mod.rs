//! npm registry document types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Distribution information for a package tarball
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DistInfo {
    /// Tarball download URL
    pub tarball: String,
    /// SHA-1 checksum (legacy)
    pub shasum: Option<String>,
    /// Subresource integrity hash (preferred)
    pub integrity: Option<String>,
    /// Unpackaged size in bytes
    #[serde(rename = "unpackedSize")]
    pub unpacked_size: Option<u64>,
    /// File count
    #[serde(rename = "fileCount")]
    pub file_count: Option<u32>,
}

impl DistInfo {
    /// Read the `dist` block of one version entry
    pub fn from_version(version: &Value) -> Option<Self> {
        let dist = version.get("dist")?;
        DistInfo::deserialize(dist).ok()
    }

    /// Checksum to verify the tarball against
    pub fn integrity_token(&self) -> Option<&str> {
        self.shasum.as_deref().or(self.integrity.as_deref())
    }
}

/// Error reported inside a registry document body
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DocumentError {
    pub error: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl DocumentError {
    /// Read the `error`/`reason` pair a document carries, if any
    pub fn from_document(document: &Value) -> Option<Self> {
        let error = document.get("error")?.as_str()?;
        Some(Self {
            error: error.to_string(),
            reason: document
                .get("reason")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    pub fn is_not_found(&self) -> bool {
        self.error == "not_found"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dist_info_from_version() {
        let version = json!({
            "version": "1.0.0",
            "dist": {
                "tarball": "https://registry.npmjs.org/fnp/-/fnp-1.0.0.tgz",
                "shasum": "abc",
                "integrity": "sha512-def",
                "fileCount": 3
            }
        });

        let dist = DistInfo::from_version(&version).unwrap();
        assert_eq!(dist.file_count, Some(3));
        assert_eq!(dist.integrity_token(), Some("abc"));
        assert!(DistInfo::from_version(&json!({"version": "1.0.0"})).is_none());
        assert!(DistInfo::from_version(&json!({"dist": {"shasum": "abc"}})).is_none());
    }

    #[test]
    fn test_integrity_fallback() {
        let dist = DistInfo {
            tarball: "https://example.com/a.tgz".to_string(),
            shasum: None,
            integrity: Some("sha512-xyz".to_string()),
            unpacked_size: None,
            file_count: None,
        };
        assert_eq!(dist.integrity_token(), Some("sha512-xyz"));
    }

    #[test]
    fn test_document_error() {
        let err = DocumentError::from_document(&json!({"error": "not_found", "reason": "deleted"}))
            .unwrap();
        assert!(err.is_not_found());
        assert_eq!(err.reason.as_deref(), Some("deleted"));

        let err = DocumentError::from_document(&json!({"error": "forbidden"})).unwrap();
        assert!(!err.is_not_found());
        assert!(DocumentError::from_document(&json!({"name": "fnp"})).is_none());
    }
}
