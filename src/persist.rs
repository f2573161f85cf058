//! Writing artifact maps to disk.

use crate::capability::{ArtifactFormat, ArtifactMap};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Write every artifact to `<outdir>/<key>.<ext>`, returning the paths.
///
/// The directory is created if needed. The first failed write aborts the rest
/// of the batch; files already written stay on disk.
pub fn write_artifacts(
    artifacts: &ArtifactMap,
    outdir: &Path,
    format: ArtifactFormat,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(outdir).map_err(|err| Error::io("creating", outdir, err))?;
    let mut written = Vec::with_capacity(artifacts.len());
    for (key, figure) in artifacts {
        let path = outdir.join(format!("{key}.{}", format.extension()));
        let encoded = format.encode(key, figure)?;
        fs::write(&path, encoded).map_err(|err| Error::io("writing", &path, err))?;
        written.push(path);
    }
    tracing::info!(
        outdir = %outdir.display(),
        count = written.len(),
        format = %format,
        "wrote artifacts"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Figure, Plot};
    use tempfile::TempDir;

    fn artifacts() -> ArtifactMap {
        ArtifactMap::from([(
            "hist_gold_hist".to_string(),
            Figure {
                x_label: "x".into(),
                y_label: "y".into(),
                plot: Plot::Histogram2d {
                    x_edges: vec![0.0, 1.0],
                    y_edges: vec![0.0, 1.0],
                    counts: vec![vec![3]],
                },
            },
        )])
    }

    #[test]
    fn creates_nested_outdir_and_names_files_by_key() {
        let dir = TempDir::new().unwrap();
        let outdir = dir.path().join("a/b");
        let written = write_artifacts(&artifacts(), &outdir, ArtifactFormat::Yaml).unwrap();
        assert_eq!(written, vec![outdir.join("hist_gold_hist.yaml")]);
        assert!(written[0].is_file());

        // Existing directory is fine.
        write_artifacts(&artifacts(), &outdir, ArtifactFormat::Json).unwrap();
        assert!(outdir.join("hist_gold_hist.json").is_file());
    }

    #[test]
    fn outdir_that_is_a_file_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let err = write_artifacts(&artifacts(), &blocker, ArtifactFormat::Json).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
