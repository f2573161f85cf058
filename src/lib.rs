//! Declarative plot production.
//!
//! Plotters and datasets are declared in YAML block sources and loaded into
//! two instances of one generic [`EntityRegistry`]: item blocks construct
//! implementations resolved through a [`ClassRegistry`], group blocks bind
//! constructed items by name, and context blocks (dataset projects) supply
//! external objects to item constructors. The orchestrator in [`control`] then
//! runs every plotter of a group over every dataset of another group and
//! persists the resulting figures.

pub mod capability;
pub mod classes;
pub mod control;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod persist;
pub mod plotter;
pub mod registry;
mod schema_loader;

pub use capability::{
    ArtifactFormat, ArtifactMap, CollisionPolicy, Config, ConfigArgs, ConfigKind, ConfigParam,
    Datum, DatumKind, Figure, InputSpec, Inputs, Plot, artifact_key,
};
pub use classes::{ClassRegistry, Constructor, ModuleLoader};
pub use control::{
    GroupState, PlotGroup, PlotGroupConfig, Registries, RunOptions, load_plot_groups,
    make_artifacts, run,
};
pub use dataset::{DataExtractor, Dataset, Datasets, Project};
pub use error::{Error, Namespace, Result};
pub use persist::write_artifacts;
pub use plotter::{Plotter, Plotters, fan_out};
pub use registry::{EntityKind, EntityRegistry, Group, Member, Vocabulary};

/// Split a comma- or whitespace-separated list, dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
