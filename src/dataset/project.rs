//! Projects: named bundles of truth and point-estimate samples.
//!
//! A project file lists samples keyed by `(selection, flavor, tag)`. Each
//! sample either carries its arrays inline or points at a companion JSON/YAML
//! file with `path`, resolved against the project file's directory.

use crate::error::{Error, Result};
use crate::registry::read_yaml;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Point estimates and truth for one sample.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SampleData {
    pub truth: Vec<f64>,
    #[serde(default)]
    pub point_estimates: BTreeMap<String, Vec<f64>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub selection: String,
    pub flavor: String,
    pub tag: String,
    pub data: SampleData,
}

impl Sample {
    /// Algorithms with point estimates, in name order.
    pub fn algos(&self) -> impl Iterator<Item = &str> {
        self.data.point_estimates.keys().map(String::as_str)
    }

    pub fn point_estimate(&self, algo: &str) -> Option<&[f64]> {
        self.data.point_estimates.get(algo).map(Vec::as_slice)
    }
}

#[derive(Deserialize)]
struct ProjectFile {
    samples: Vec<SampleEntry>,
}

#[derive(Deserialize)]
struct SampleEntry {
    selection: String,
    flavor: String,
    tag: String,
    #[serde(flatten)]
    source: SampleSource,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SampleSource {
    File { path: PathBuf },
    Inline(SampleData),
}

#[derive(Clone, Debug)]
pub struct Project {
    name: String,
    source: PathBuf,
    samples: Vec<Sample>,
}

impl Project {
    /// Read a project file, pulling in any sample files it references.
    pub fn load(name: &str, path: &Path) -> Result<Self> {
        let raw = read_yaml(path)?;
        let file: ProjectFile = serde_json::from_value(raw).map_err(|err| {
            Error::schema(
                path.display().to_string(),
                format!("invalid project file: {err}"),
                Vec::new(),
            )
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut samples: Vec<Sample> = Vec::with_capacity(file.samples.len());
        for entry in file.samples {
            if samples.iter().any(|s| {
                s.selection == entry.selection && s.flavor == entry.flavor && s.tag == entry.tag
            }) {
                return Err(Error::schema(
                    path.display().to_string(),
                    format!(
                        "sample {}/{}/{} listed twice",
                        entry.selection, entry.flavor, entry.tag
                    ),
                    Vec::new(),
                ));
            }
            let data = match entry.source {
                SampleSource::Inline(data) => data,
                SampleSource::File { path: relative } => read_sample_file(&base_dir.join(relative))?,
            };
            samples.push(Sample {
                selection: entry.selection,
                flavor: entry.flavor,
                tag: entry.tag,
                data,
            });
        }
        Ok(Self {
            name: name.to_string(),
            source: path.to_path_buf(),
            samples,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn sample(&self, selection: &str, flavor: &str, tag: &str) -> Result<&Sample> {
        self.samples
            .iter()
            .find(|s| s.selection == selection && s.flavor == flavor && s.tag == tag)
            .ok_or_else(|| Error::Extraction {
                owner: self.name.clone(),
                message: format!(
                    "no sample for selection '{selection}', flavor '{flavor}', tag '{tag}'"
                ),
            })
    }
}

fn read_sample_file(path: &Path) -> Result<SampleData> {
    let raw = read_yaml(path)?;
    serde_json::from_value(raw).map_err(|err| {
        Error::schema(
            path.display().to_string(),
            format!("invalid sample file: {err}"),
            Vec::new(),
        )
    })
}
