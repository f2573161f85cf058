//! Extractors for photo-z point estimates.

use super::{DataExtractor, Datasets, Project, Sample};
use crate::capability::{Config, ConfigArgs, Datum, DatumKind, InputSpec, Inputs};
use crate::classes::ClassRegistry;
use crate::error::{Error, Result};
use crate::registry::EntityRegistry;
use std::collections::BTreeMap;

pub const MODULE: &str = "plotrunner.datasets.pz";

/// `algos` value selecting every algorithm a sample has.
const ALL_ALGOS: &str = "all";

const SINGLE_INPUTS: &[InputSpec] = &[
    InputSpec::new("project", DatumKind::Text),
    InputSpec::new("selection", DatumKind::Text),
    InputSpec::new("flavor", DatumKind::Text),
    InputSpec::new("tag", DatumKind::Text),
    InputSpec::new("algo", DatumKind::Text),
];

const MULTI_INPUTS: &[InputSpec] = &[
    InputSpec::new("project", DatumKind::Text),
    InputSpec::new("selection", DatumKind::Text),
    InputSpec::new("flavor", DatumKind::Text),
    InputSpec::new("tag", DatumKind::Text),
    InputSpec::new("algos", DatumKind::TextList),
];

pub(crate) fn register(classes: &mut ClassRegistry<dyn DataExtractor>) {
    classes.register("PZPointEstimateDataExtractor", single);
    classes.register("PZMultiPointEstimateDataExtractor", multi);
}

fn single(name: &str, args: ConfigArgs) -> Result<Box<dyn DataExtractor>> {
    Config::resolve(name, &[], args)?;
    Ok(Box::new(PointEstimateExtractor {
        name: name.to_string(),
    }))
}

fn multi(name: &str, args: ConfigArgs) -> Result<Box<dyn DataExtractor>> {
    Config::resolve(name, &[], args)?;
    Ok(Box::new(MultiPointEstimateExtractor {
        name: name.to_string(),
    }))
}

fn text<'a>(owner: &str, inputs: &'a Inputs, key: &str) -> Result<&'a str> {
    inputs
        .get(key)
        .and_then(Datum::as_text)
        .ok_or_else(|| Error::MissingInput {
            owner: owner.to_string(),
            key: key.to_string(),
            provided: inputs.keys().cloned().collect(),
        })
}

/// Resolve the project sample named by the common inputs.
fn locate<'r>(
    owner: &str,
    registry: &'r EntityRegistry<Datasets>,
    inputs: &Inputs,
) -> Result<&'r Sample> {
    let project: &Project = registry.get_context(text(owner, inputs, "project")?)?;
    project.sample(
        text(owner, inputs, "selection")?,
        text(owner, inputs, "flavor")?,
        text(owner, inputs, "tag")?,
    )
}

fn estimate<'s>(owner: &str, sample: &'s Sample, algo: &str) -> Result<&'s [f64]> {
    sample.point_estimate(algo).ok_or_else(|| Error::Extraction {
        owner: owner.to_string(),
        message: format!(
            "no point estimate for algorithm '{algo}' in {}/{}/{}; available {:?}",
            sample.selection,
            sample.flavor,
            sample.tag,
            sample.algos().collect::<Vec<_>>()
        ),
    })
}

/// Truth and one algorithm's point estimates.
#[derive(Debug)]
pub struct PointEstimateExtractor {
    name: String,
}

impl DataExtractor for PointEstimateExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_schema(&self) -> &'static [InputSpec] {
        SINGLE_INPUTS
    }

    fn extract(&self, registry: &EntityRegistry<Datasets>, inputs: &Inputs) -> Result<Inputs> {
        let sample = locate(&self.name, registry, inputs)?;
        let algo = text(&self.name, inputs, "algo")?;
        let values = estimate(&self.name, sample, algo)?;
        Ok(Inputs::from([
            ("truth".to_string(), Datum::FloatArray(sample.data.truth.clone())),
            ("pointEstimate".to_string(), Datum::FloatArray(values.to_vec())),
        ]))
    }
}

/// Truth and point estimates keyed by algorithm.
#[derive(Debug)]
pub struct MultiPointEstimateExtractor {
    name: String,
}

impl DataExtractor for MultiPointEstimateExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_schema(&self) -> &'static [InputSpec] {
        MULTI_INPUTS
    }

    fn extract(&self, registry: &EntityRegistry<Datasets>, inputs: &Inputs) -> Result<Inputs> {
        let sample = locate(&self.name, registry, inputs)?;
        let requested = inputs
            .get("algos")
            .and_then(Datum::as_text_list)
            .unwrap_or_default();
        let algos: Vec<&str> = if requested.iter().any(|a| a == ALL_ALGOS) {
            sample.algos().collect()
        } else {
            requested.iter().map(String::as_str).collect()
        };
        let mut estimates = BTreeMap::new();
        for algo in algos {
            let values = estimate(&self.name, sample, algo)?;
            estimates.insert(algo.to_string(), values.to_vec());
        }
        Ok(Inputs::from([
            ("truth".to_string(), Datum::FloatArray(sample.data.truth.clone())),
            ("pointEstimates".to_string(), Datum::FloatArrayMap(estimates)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn registry_with_project(dir: &TempDir) -> EntityRegistry<Datasets> {
        fs::write(
            dir.path().join("project.yaml"),
            "samples:\n\
             - selection: gold\n  flavor: baseline\n  tag: test\n  truth: [0.1, 0.2]\n  \
             point_estimates: {knn: [0.1, 0.3], bpz: [0.2, 0.2]}\n",
        )
        .unwrap();
        let mut registry = EntityRegistry::<Datasets>::new();
        registry
            .load_str(
                "- Project: {name: demo, yaml_file: project.yaml}\n",
                dir.path(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn all_selects_every_algorithm() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_with_project(&dir);
        registry
            .load_str(
                "- Dataset:\n    name: gold_all\n    extractor: plotrunner.datasets.pz.PZMultiPointEstimateDataExtractor\n    project: demo\n    selection: gold\n    flavor: baseline\n    tag: test\n    algos: [all]\n",
                dir.path(),
            )
            .unwrap();
        let dataset = registry.get_item("gold_all").unwrap();
        let estimates = dataset.inputs()["pointEstimates"]
            .as_float_array_map()
            .unwrap();
        assert_eq!(estimates.keys().collect::<Vec<_>>(), vec!["bpz", "knn"]);
    }

    #[test]
    fn unknown_algorithm_is_extraction_error() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_with_project(&dir);
        let err = registry
            .load_str(
                "- Dataset: {name: d, extractor: plotrunner.datasets.pz.PZPointEstimateDataExtractor, project: demo, selection: gold, flavor: baseline, tag: test, algo: fzb}\n",
                dir.path(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
        assert!(registry.get_item("d").is_err());
    }

    #[test]
    fn missing_project_is_not_found_at_construction() {
        let dir = TempDir::new().unwrap();
        let mut registry = EntityRegistry::<Datasets>::new();
        let err = registry
            .load_str(
                "- Dataset: {name: d, extractor: plotrunner.datasets.pz.PZPointEstimateDataExtractor, project: nope, selection: gold, flavor: baseline, tag: test, algo: knn}\n",
                dir.path(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { ref name, .. } if name == "nope"));
    }
}
