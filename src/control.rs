//! Plot groups and the top-level run driver.
//!
//! A run file names a plotter source, a dataset source and a list of
//! `PlotGroup` bindings, each pairing a `PlotterList` with a `DatasetDict`.
//! Both sources are loaded into a [`Registries`] pair, then every selected
//! binding computes its fan-out and optionally writes it to disk.

use crate::capability::{ArtifactFormat, ArtifactMap, CollisionPolicy, merge_artifacts};
use crate::dataset::Datasets;
use crate::error::{Error, Namespace, Result};
use crate::persist::write_artifacts;
use crate::plotter::{Plotters, fan_out};
use crate::registry::{EntityRegistry, read_yaml};
use crate::schema_loader;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

const RUN_REGISTRY: &str = "plot run";

/// The plotter and dataset registries a run reads from.
#[derive(Debug, Default)]
pub struct Registries {
    pub plotters: EntityRegistry<Plotters>,
    pub datasets: EntityRegistry<Datasets>,
}

static GLOBAL: OnceLock<Mutex<Registries>> = OnceLock::new();

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear both registries, keeping their class tables.
    pub fn reset(&mut self) {
        self.plotters.reset();
        self.datasets.reset();
    }

    /// Process-wide default instance, created on first use.
    pub fn global() -> &'static Mutex<Registries> {
        GLOBAL.get_or_init(|| Mutex::new(Registries::new()))
    }

    /// Lock the default instance, recovering it if a previous holder panicked.
    pub fn lock_global() -> MutexGuard<'static, Registries> {
        match Self::global().lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Empty the default instance.
    pub fn reset_global() {
        Self::lock_global().reset();
    }
}

/// Fan out one plotter list over one dataset dict, by group name.
pub fn make_artifacts(
    registries: &Registries,
    plotter_list: &str,
    dataset_dict: &str,
    policy: CollisionPolicy,
) -> Result<ArtifactMap> {
    let plotters = registries.plotters.get_group(plotter_list)?;
    let datasets = registries.datasets.get_group(dataset_dict)?;
    fan_out(plotters, datasets, policy)
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlotGroupConfig {
    pub name: String,
    pub plotter_list_name: String,
    pub dataset_dict_name: String,
    #[serde(default = "default_outdir")]
    pub outdir: PathBuf,
    #[serde(default)]
    pub figtype: ArtifactFormat,
}

fn default_outdir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupState {
    Idle,
    Computed,
    Persisted,
}

/// One plotter-list/dataset-dict binding and its in-memory artifacts.
#[derive(Debug)]
pub struct PlotGroup {
    config: PlotGroupConfig,
    state: GroupState,
    artifacts: ArtifactMap,
}

impl PlotGroup {
    pub fn new(config: PlotGroupConfig) -> Self {
        Self {
            config,
            state: GroupState::Idle,
            artifacts: ArtifactMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &PlotGroupConfig {
        &self.config
    }

    pub fn state(&self) -> GroupState {
        self.state
    }

    pub fn artifacts(&self) -> &ArtifactMap {
        &self.artifacts
    }

    pub fn set_outdir(&mut self, outdir: impl Into<PathBuf>) {
        self.config.outdir = outdir.into();
    }

    /// Run the fan-out and merge the result into the in-memory set.
    ///
    /// `policy` governs keys clashing within one fan-out; keys already held
    /// from an earlier compute are overwritten.
    pub fn compute(&mut self, registries: &Registries, policy: CollisionPolicy) -> Result<()> {
        let produced = make_artifacts(
            registries,
            &self.config.plotter_list_name,
            &self.config.dataset_dict_name,
            policy,
        )?;
        tracing::debug!(group = %self.config.name, artifacts = produced.len(), "computed");
        merge_artifacts(&mut self.artifacts, produced, CollisionPolicy::LastWriteWins)?;
        self.state = GroupState::Computed;
        Ok(())
    }

    /// Write the in-memory set to the group's output directory.
    pub fn persist(&mut self) -> Result<Vec<PathBuf>> {
        let written = write_artifacts(&self.artifacts, &self.config.outdir, self.config.figtype)?;
        self.state = GroupState::Persisted;
        Ok(written)
    }

    pub fn purge(&mut self) {
        self.artifacts.clear();
        self.state = GroupState::Idle;
    }

    /// Compute, then persist when `save`; `purge` only applies after saving.
    ///
    /// A saved but unpurged group still holds its artifacts and is left
    /// `Computed`. Returns the in-memory set left afterwards, which is empty
    /// when purged.
    pub fn execute(
        &mut self,
        registries: &Registries,
        save: bool,
        purge: bool,
        policy: CollisionPolicy,
    ) -> Result<ArtifactMap> {
        self.compute(registries, policy)?;
        if save {
            self.persist()?;
            if purge {
                self.purge();
            } else {
                self.state = GroupState::Computed;
            }
        }
        Ok(self.artifacts.clone())
    }
}

/// Knobs for [`run`].
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Bindings to run; `None` or empty runs all of them.
    pub include: Option<Vec<String>>,
    /// Bindings to skip. Names not in the run file are ignored.
    pub exclude: Vec<String>,
    pub save: bool,
    pub purge: bool,
    pub collision: CollisionPolicy,
    /// Replaces every binding's `outdir`.
    pub outdir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            include: None,
            exclude: Vec::new(),
            save: true,
            purge: true,
            collision: CollisionPolicy::default(),
            outdir: None,
        }
    }
}

#[derive(Deserialize)]
struct RunFile {
    #[serde(rename = "PlotterYaml")]
    plotter_yaml: PathBuf,
    #[serde(rename = "DatasetYaml")]
    dataset_yaml: PathBuf,
    #[serde(rename = "PlotGroups")]
    plot_groups: Vec<PlotGroupEntry>,
}

#[derive(Deserialize)]
struct PlotGroupEntry {
    #[serde(rename = "PlotGroup")]
    plot_group: PlotGroupConfig,
}

/// Parse a run file, load both sources into `registries` and return its
/// bindings in file order.
///
/// Source paths and relative output directories resolve against the run
/// file's directory.
pub fn load_plot_groups(registries: &mut Registries, source: &Path) -> Result<Vec<PlotGroup>> {
    let raw = read_yaml(source)?;
    let origin = source.display().to_string();
    schema_loader::plot_run_schema()?.check(&raw, &origin)?;
    let run: RunFile = serde_json::from_value(raw)
        .map_err(|err| Error::schema(&origin, err.to_string(), Vec::new()))?;

    let base_dir = source.parent().unwrap_or_else(|| Path::new("."));
    registries.plotters.load(&base_dir.join(&run.plotter_yaml))?;
    registries.datasets.load(&base_dir.join(&run.dataset_yaml))?;

    let mut groups: Vec<PlotGroup> = Vec::with_capacity(run.plot_groups.len());
    for entry in run.plot_groups {
        let mut config = entry.plot_group;
        config.outdir = base_dir.join(&config.outdir);
        if groups.iter().any(|group| group.name() == config.name) {
            return Err(Error::DuplicateName {
                registry: RUN_REGISTRY,
                namespace: Namespace::Binding,
                name: config.name,
            });
        }
        groups.push(PlotGroup::new(config));
    }
    Ok(groups)
}

/// Names of the bindings a run executes, in file order.
fn select<'a>(groups: &'a [PlotGroup], options: &RunOptions) -> Result<Vec<&'a str>> {
    let known: Vec<&str> = groups.iter().map(PlotGroup::name).collect();
    let mut selected = match options.include.as_deref() {
        Some(include) if !include.is_empty() => {
            if let Some(missing) = include.iter().find(|name| !known.contains(&name.as_str())) {
                return Err(Error::NotFound {
                    registry: RUN_REGISTRY,
                    namespace: Namespace::Binding,
                    name: missing.clone(),
                    known: known.iter().map(|name| name.to_string()).collect(),
                });
            }
            known
                .iter()
                .copied()
                .filter(|name| include.iter().any(|wanted| wanted == name))
                .collect()
        }
        _ => known.clone(),
    };
    selected.retain(|name| !options.exclude.iter().any(|skip| skip == name));
    Ok(selected)
}

/// Execute a run file.
///
/// Returns the union of what each executed binding left in memory, later
/// keys overwriting earlier ones.
pub fn run(registries: &mut Registries, source: &Path, options: &RunOptions) -> Result<ArtifactMap> {
    tracing::info!(source = %source.display(), "starting plot run");
    let mut groups = load_plot_groups(registries, source)?;
    let selected: Vec<String> = select(&groups, options)?
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut out = ArtifactMap::new();
    for group in groups
        .iter_mut()
        .filter(|group| selected.iter().any(|name| name == group.name()))
    {
        if let Some(outdir) = &options.outdir {
            group.set_outdir(outdir);
        }
        tracing::info!(
            group = group.name(),
            plotters = %group.config().plotter_list_name,
            datasets = %group.config().dataset_dict_name,
            "executing plot group"
        );
        let left = group.execute(registries, options.save, options.purge, options.collision)?;
        merge_artifacts(&mut out, left, CollisionPolicy::LastWriteWins)?;
    }
    tracing::info!(groups = selected.len(), artifacts = out.len(), "plot run finished");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str) -> PlotGroup {
        PlotGroup::new(PlotGroupConfig {
            name: name.to_string(),
            plotter_list_name: "p".to_string(),
            dataset_dict_name: "d".to_string(),
            outdir: default_outdir(),
            figtype: ArtifactFormat::Json,
        })
    }

    #[test]
    fn include_then_exclude_keeps_file_order() {
        let groups = vec![group("a"), group("b"), group("c")];
        let options = RunOptions {
            include: Some(vec!["c".into(), "a".into()]),
            exclude: vec!["missing".into()],
            ..RunOptions::default()
        };
        assert_eq!(select(&groups, &options).unwrap(), vec!["a", "c"]);

        let options = RunOptions {
            exclude: vec!["b".into()],
            ..RunOptions::default()
        };
        assert_eq!(select(&groups, &options).unwrap(), vec!["a", "c"]);
    }

    #[test]
    fn unknown_include_is_not_found() {
        let groups = vec![group("a")];
        let options = RunOptions {
            include: Some(vec!["z".into()]),
            ..RunOptions::default()
        };
        let err = select(&groups, &options).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound { namespace: Namespace::Binding, ref name, .. } if name == "z"
        ));
    }

    #[test]
    fn plot_group_config_defaults() {
        let config: PlotGroupConfig = serde_json::from_value(serde_json::json!({
            "name": "g",
            "plotter_list_name": "p",
            "dataset_dict_name": "d",
        }))
        .unwrap();
        assert_eq!(config.outdir, PathBuf::from("."));
        assert_eq!(config.figtype, ArtifactFormat::Json);
    }

    #[test]
    fn purge_returns_to_idle() {
        let mut plot_group = group("a");
        plot_group.state = GroupState::Computed;
        plot_group.purge();
        assert_eq!(plot_group.state(), GroupState::Idle);
        assert!(plot_group.artifacts().is_empty());
    }
}
