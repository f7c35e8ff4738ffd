//! Domain models for linked documents.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Kind of remote resource a pointer file stands for.
///
/// The type decides the pointer extension, the Google mime type used when
/// creating the resource, and how its canonical URL is built.
///
/// ```
/// use core_library::ResourceType;
///
/// let kind = ResourceType::GoogleDoc;
/// assert_eq!(kind.as_str(), "google_doc");
/// assert_eq!(kind.extension(), "goox");
/// assert_eq!(
///     kind.url_for("abc123"),
///     "https://docs.google.com/document/d/abc123/edit"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    GoogleDoc,
}

impl ResourceType {
    pub const ALL: &'static [ResourceType] = &[ResourceType::GoogleDoc];

    /// Value stored in the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::GoogleDoc => "google_doc",
        }
    }

    /// Pointer file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ResourceType::GoogleDoc => "goox",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ResourceType::GoogleDoc => "application/vnd.google-apps.document",
        }
    }

    /// Canonical browser URL for a remote id.
    pub fn url_for(&self, remote_id: &str) -> String {
        match self {
            ResourceType::GoogleDoc => {
                format!("https://docs.google.com/document/d/{}/edit", remote_id)
            }
        }
    }

    /// Type whose pointer extension matches `path` (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.extension().eq_ignore_ascii_case(extension))
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google_doc" => Ok(ResourceType::GoogleDoc),
            other => Err(format!("unknown resource type '{}'", other)),
        }
    }
}

/// A row of `external_files`: one pointer file mapped to one remote id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalReference {
    pub id: i64,
    pub resource_type: ResourceType,
    pub local_path: String,
    pub remote_id: String,
    /// Unix seconds.
    pub created_at: i64,
}

impl ExternalReference {
    pub fn url(&self) -> String {
        self.resource_type.url_for(&self.remote_id)
    }
}
