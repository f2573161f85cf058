//! Artifacts produced by plotters, their naming and on-disk encodings.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A plot description: axis labels plus the binned data to draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub x_label: String,
    pub y_label: String,
    pub plot: Plot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Plot {
    /// Counts indexed `[x_bin][y_bin]`.
    Histogram2d {
        x_edges: Vec<f64>,
        y_edges: Vec<f64>,
        counts: Vec<Vec<u64>>,
    },
    /// Per-bin mean offset and spread; `None` marks an empty bin.
    Profile {
        bin_centers: Vec<f64>,
        means: Vec<Option<f64>>,
        stds: Vec<Option<f64>>,
    },
    /// One named curve per series over shared x positions.
    Curves {
        x: Vec<f64>,
        curves: BTreeMap<String, Vec<Option<f64>>>,
    },
}

/// Artifacts keyed by `{instance}_{context}_{artifact}`.
pub type ArtifactMap = BTreeMap<String, Figure>;

/// Deterministic output key for one artifact of one invocation.
pub fn artifact_key(instance: &str, context_label: &str, artifact_label: &str) -> String {
    format!("{instance}_{context_label}_{artifact_label}")
}

/// What to do when two invocations produce the same artifact key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    #[default]
    LastWriteWins,
    Reject,
}

/// Merge `incoming` into `target` under the given policy.
pub fn merge_artifacts(
    target: &mut ArtifactMap,
    incoming: ArtifactMap,
    policy: CollisionPolicy,
) -> Result<()> {
    for (key, figure) in incoming {
        if target.contains_key(&key) {
            match policy {
                CollisionPolicy::Reject => return Err(Error::DuplicateArtifact { key }),
                CollisionPolicy::LastWriteWins => {
                    tracing::warn!(artifact = %key, "artifact overwritten by a later invocation");
                }
            }
        }
        target.insert(key, figure);
    }
    Ok(())
}

/// On-disk encoding of persisted artifacts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    #[default]
    Json,
    Yaml,
    /// YAML written with the `.yml` extension.
    Yml,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Json => "json",
            ArtifactFormat::Yaml => "yaml",
            ArtifactFormat::Yml => "yml",
        }
    }

    pub fn encode(&self, key: &str, figure: &Figure) -> Result<String> {
        let encoded = match self {
            ArtifactFormat::Json => serde_json::to_string_pretty(figure).map_err(|e| e.to_string()),
            ArtifactFormat::Yaml | ArtifactFormat::Yml => {
                serde_yaml::to_string(figure).map_err(|e| e.to_string())
            }
        };
        encoded.map_err(|message| Error::Encode {
            key: key.to_string(),
            message,
        })
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl TryFrom<&str> for ArtifactFormat {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "json" => Ok(ArtifactFormat::Json),
            "yaml" => Ok(ArtifactFormat::Yaml),
            "yml" => Ok(ArtifactFormat::Yml),
            other => Err(Error::schema(
                "figtype",
                format!("unsupported artifact format '{other}'; expected json or yaml"),
                Vec::new(),
            )),
        }
    }
}
