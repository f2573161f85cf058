#![allow(dead_code)]

use anyhow::{Context, Result, bail};
use plotrunner::{
    Config, ConfigArgs, ConfigKind, ConfigParam, DatumKind, EntityRegistry, Figure, InputSpec,
    Inputs, Plot, Plotter, Plotters,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const PROJECT_YAML: &str = "\
samples:
  - selection: gold
    flavor: baseline
    tag: test
    truth: [0.1, 0.4, 0.8, 1.5]
    point_estimates:
      knn: [0.12, 0.38, 0.95, 1.4]
      bpz: [0.1, 0.5, 0.8, 1.6]
  - selection: blend
    flavor: baseline
    tag: test
    truth: [0.3, 0.9]
    point_estimates:
      knn: [0.35, 0.7]
";

pub const DATASETS_YAML: &str = "\
- Project:
    name: demo
    yaml_file: project.yaml
- Dataset:
    name: gold_knn
    extractor: plotrunner.datasets.pz.PZPointEstimateDataExtractor
    project: demo
    selection: gold
    flavor: baseline
    tag: test
    algo: knn
- Dataset:
    name: blend_knn
    extractor: plotrunner.datasets.pz.PZPointEstimateDataExtractor
    project: demo
    selection: blend
    flavor: baseline
    tag: test
    algo: knn
- Dataset:
    name: gold_all
    extractor: plotrunner.datasets.pz.PZMultiPointEstimateDataExtractor
    project: demo
    selection: gold
    flavor: baseline
    tag: test
    algos: [all]
- DatasetDict:
    name: single
    datasets: [gold_knn, blend_knn]
- DatasetDict:
    name: multi
    datasets:
      gold: gold_all
";

pub const PLOTTERS_YAML: &str = "\
- Plotter:
    name: hist
    class_name: plotrunner.plotters.pz.PZPlotterPointEstimateVsTrueHist2D
    n_zbins: 4
    z_max: 2.0
- Plotter:
    name: profile
    class_name: plotrunner.plotters.pz.PZPlotterPointEstimateVsTrueProfile
    n_zbins: 4
    z_max: 2.0
- Plotter:
    name: accuracy
    class_name: plotrunner.plotters.pz.PZPlotterAccuraciesVsTrue
    n_zbins: 2
    z_max: 2.0
- PlotterList:
    name: point
    plotters: [hist, profile]
- PlotterList:
    name: accuracy
    plotters: [accuracy]
";

/// Temporary directory holding declarative sources for one test.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("failed to allocate workspace")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Project, dataset and plotter sources used by most run tests.
    pub fn write_standard_sources(&self) -> Result<()> {
        self.write("project.yaml", PROJECT_YAML)?;
        self.write("datasets.yaml", DATASETS_YAML)?;
        self.write("plotters.yaml", PLOTTERS_YAML)?;
        Ok(())
    }

    /// Copy the shipped demo sources into the workspace.
    pub fn copy_demos(&self) -> Result<PathBuf> {
        let target = self.dir.path().join("demos");
        fs::create_dir_all(&target)?;
        for entry in fs::read_dir(demos_dir())? {
            let entry = entry?;
            fs::copy(entry.path(), target.join(entry.file_name()))
                .with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
        Ok(target)
    }
}

pub fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos")
}

pub fn plotrunner_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_plotrunner"))
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to run command: {cmd:?}"))?;
    if output.status.success() {
        Ok(output)
    } else {
        bail!(
            "command {:?} failed: status {:?}\nstdout: {}\nstderr: {}",
            cmd,
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }
}

/// Test plotter with one required option (`c`) and one defaulted option.
#[derive(Debug)]
pub struct Alpha {
    name: String,
    config: Config,
}

pub const ALPHA_CONFIG: &[ConfigParam] = &[
    ConfigParam::required("c", ConfigKind::Int, "count"),
    ConfigParam::string("label", "unset", "free-form label"),
];

const ALPHA_INPUTS: &[InputSpec] = &[InputSpec::new("truth", DatumKind::FloatArray)];

impl Plotter for Alpha {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn input_schema(&self) -> &'static [InputSpec] {
        ALPHA_INPUTS
    }

    fn render(&self, inputs: &Inputs) -> plotrunner::Result<Vec<(&'static str, Figure)>> {
        let truth = inputs["truth"].as_float_array().unwrap_or_default().to_vec();
        let figure = Figure {
            x_label: "index".into(),
            y_label: "truth".into(),
            plot: Plot::Curves {
                x: (0..truth.len()).map(|i| i as f64).collect(),
                curves: BTreeMap::from([(
                    "truth".to_string(),
                    truth.into_iter().map(Some).collect(),
                )]),
            },
        };
        Ok(vec![("line", figure)])
    }
}

pub fn alpha(name: &str, args: ConfigArgs) -> plotrunner::Result<Box<dyn Plotter>> {
    Ok(Box::new(Alpha {
        name: name.to_string(),
        config: Config::resolve(name, ALPHA_CONFIG, args)?,
    }))
}

/// Plotter registry with the `Alpha` test class registered under a bare name.
pub fn plotters_with_alpha() -> EntityRegistry<Plotters> {
    let mut registry = EntityRegistry::<Plotters>::new();
    registry.classes_mut().register("Alpha", alpha);
    registry
}
