//! Plotters: producers that turn a dataset's inputs into named figures.

pub mod pz;

use crate::capability::{
    ArtifactMap, CollisionPolicy, Config, ConfigArgs, Figure, InputSpec, Inputs, artifact_key,
    merge_artifacts, validate_inputs,
};
use crate::classes::{ClassRegistry, Constructor};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::registry::{EntityKind, EntityRegistry, Group, Vocabulary};
use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A constructed plotter instance.
pub trait Plotter: fmt::Debug + Send + Sync {
    /// Instance name, the first component of every artifact key.
    fn name(&self) -> &str;

    fn config(&self) -> &Config;

    /// Inputs [`Plotter::render`] reads.
    fn input_schema(&self) -> &'static [InputSpec];

    /// Compute figures from already-validated inputs, labelled by artifact.
    fn render(&self, inputs: &Inputs) -> Result<Vec<(&'static str, Figure)>>;

    /// Validate `inputs`, render, and key each figure for `context_label`.
    ///
    /// Validation happens before any computation; a failure yields no
    /// artifacts at all.
    fn invoke(&self, context_label: &str, inputs: &Inputs) -> Result<ArtifactMap> {
        validate_inputs(self.name(), self.input_schema(), inputs)?;
        tracing::debug!(plotter = self.name(), context = context_label, "rendering");
        Ok(self
            .render(inputs)?
            .into_iter()
            .map(|(label, figure)| (artifact_key(self.name(), context_label, label), figure))
            .collect())
    }
}

/// Invoke every plotter against every dataset and union the results.
///
/// Datasets form the outer loop and plotters the inner one, both in group
/// order; each dataset's group label is the context label.
pub fn fan_out(
    plotters: &Group<dyn Plotter>,
    datasets: &Group<Dataset>,
    policy: CollisionPolicy,
) -> Result<ArtifactMap> {
    let mut artifacts = ArtifactMap::new();
    for dataset in datasets.members() {
        for plotter in plotters.items() {
            let produced = plotter.invoke(dataset.label(), dataset.item().inputs())?;
            merge_artifacts(&mut artifacts, produced, policy)?;
        }
    }
    Ok(artifacts)
}

/// Marker binding plotters to the generic registry.
#[derive(Debug)]
pub enum Plotters {}

impl EntityKind for Plotters {
    type Class = dyn Plotter;
    type Item = dyn Plotter;
    type Context = Infallible;

    const VOCABULARY: Vocabulary = Vocabulary {
        registry: "plotter",
        item: "Plotter",
        selector: "class_name",
        group: "PlotterList",
        members: "plotters",
        context: None,
    };

    fn classes() -> ClassRegistry<dyn Plotter> {
        let mut classes = ClassRegistry::new("plotter");
        classes.register_module(pz::MODULE, pz::register);
        classes
    }

    fn build_item(
        _registry: &EntityRegistry<Self>,
        constructor: Constructor<dyn Plotter>,
        name: &str,
        _selector: &str,
        args: ConfigArgs,
    ) -> Result<Arc<dyn Plotter>> {
        constructor(name, args).map(Arc::from)
    }

    fn build_context(name: &str, _source: &Path) -> Result<Infallible> {
        Err(Error::schema(
            name,
            "plotter sources do not define contexts",
            Vec::new(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ConfigParam, Datum, DatumKind, Plot};
    use std::collections::BTreeMap;

    #[derive(Debug)]
    struct Echo {
        name: String,
        config: Config,
    }

    const ECHO_CONFIG: &[ConfigParam] = &[ConfigParam::float("scale", 1.0, "multiplier")];
    const ECHO_INPUTS: &[InputSpec] = &[InputSpec::new("truth", DatumKind::FloatArray)];

    impl Plotter for Echo {
        fn name(&self) -> &str {
            &self.name
        }
        fn config(&self) -> &Config {
            &self.config
        }
        fn input_schema(&self) -> &'static [InputSpec] {
            ECHO_INPUTS
        }
        fn render(&self, inputs: &Inputs) -> Result<Vec<(&'static str, Figure)>> {
            let scale = self.config.float("scale")?;
            let truth = inputs["truth"].as_float_array().unwrap_or_default();
            let figure = Figure {
                x_label: "x".into(),
                y_label: "y".into(),
                plot: Plot::Curves {
                    x: truth.to_vec(),
                    curves: BTreeMap::from([(
                        "scaled".to_string(),
                        truth.iter().map(|v| Some(v * scale)).collect(),
                    )]),
                },
            };
            Ok(vec![("echo", figure)])
        }
    }

    fn echo(name: &str, args: ConfigArgs) -> Result<Box<dyn Plotter>> {
        Ok(Box::new(Echo {
            name: name.to_string(),
            config: Config::resolve(name, ECHO_CONFIG, args)?,
        }))
    }

    #[test]
    fn invoke_keys_artifacts_by_instance_and_context() {
        let plotter = echo("e", ConfigArgs::new()).unwrap();
        let inputs = Inputs::from([("truth".to_string(), Datum::FloatArray(vec![1.0]))]);
        let out = plotter.invoke("gold", &inputs).unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["e_gold_echo"]);
    }

    #[test]
    fn invoke_with_missing_input_produces_nothing() {
        let plotter = echo("e", ConfigArgs::new()).unwrap();
        let err = plotter.invoke("gold", &Inputs::new()).unwrap_err();
        assert!(matches!(err, Error::MissingInput { ref key, .. } if key == "truth"));
    }

    #[test]
    fn builtin_module_is_registered_but_not_loaded() {
        let classes = Plotters::classes();
        assert_eq!(classes.modules().collect::<Vec<_>>(), vec![pz::MODULE]);
        assert_eq!(classes.names().count(), 0);
    }
}
