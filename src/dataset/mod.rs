//! Datasets: named input bundles produced by data extractors.
//!
//! A `Dataset` block names an extractor class and supplies its inputs; the
//! extractor runs once, at load time, against the projects registered in the
//! same registry. The resulting named inputs are what plotters consume.

pub mod project;
pub mod pz;

pub use project::{Project, Sample, SampleData};

use crate::capability::{ConfigArgs, InputSpec, Inputs, inputs_from_args};
use crate::classes::{ClassRegistry, Constructor};
use crate::error::Result;
use crate::registry::{ContextVocabulary, EntityKind, EntityRegistry, Vocabulary};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Pulls named inputs for plotters out of a project.
pub trait DataExtractor: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Inputs a `Dataset` block must supply.
    fn input_schema(&self) -> &'static [InputSpec];

    /// Produce plotter inputs. Projects are looked up in `registry`.
    fn extract(&self, registry: &EntityRegistry<Datasets>, inputs: &Inputs) -> Result<Inputs>;
}

/// The extracted inputs of one `Dataset` block.
#[derive(Clone)]
pub struct Dataset {
    name: String,
    extractor: String,
    inputs: Inputs,
}

impl Dataset {
    pub fn new(name: impl Into<String>, extractor: impl Into<String>, inputs: Inputs) -> Self {
        Self {
            name: name.into(),
            extractor: extractor.into(),
            inputs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selector of the extractor that produced this dataset.
    pub fn extractor(&self) -> &str {
        &self.extractor
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("name", &self.name)
            .field("extractor", &self.extractor)
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Marker binding datasets to the generic registry.
#[derive(Debug)]
pub enum Datasets {}

impl EntityKind for Datasets {
    type Class = dyn DataExtractor;
    type Item = Dataset;
    type Context = Project;

    const VOCABULARY: Vocabulary = Vocabulary {
        registry: "dataset",
        item: "Dataset",
        selector: "extractor",
        group: "DatasetDict",
        members: "datasets",
        context: Some(ContextVocabulary {
            block: "Project",
            source: "yaml_file",
        }),
    };

    fn classes() -> ClassRegistry<dyn DataExtractor> {
        let mut classes = ClassRegistry::new("data extractor");
        classes.register_module(pz::MODULE, pz::register);
        classes
    }

    fn build_item(
        registry: &EntityRegistry<Self>,
        constructor: Constructor<dyn DataExtractor>,
        name: &str,
        selector: &str,
        args: ConfigArgs,
    ) -> Result<Arc<Dataset>> {
        let extractor = constructor(name, ConfigArgs::new())?;
        let inputs = inputs_from_args(name, extractor.input_schema(), args)?;
        let extracted = extractor.extract(registry, &inputs)?;
        Ok(Arc::new(Dataset::new(name, selector, extracted)))
    }

    fn build_context(name: &str, source: &Path) -> Result<Project> {
        Project::load(name, source)
    }
}
