//! Photo-z point-estimate plotters.
//!
//! All three share the same redshift binning: `n_zbins` equal-width bins over
//! `[z_min, z_max]`, with values outside the range dropped.

use super::Plotter;
use crate::capability::{
    Config, ConfigArgs, ConfigParam, DatumKind, Figure, InputSpec, Inputs, Plot,
};
use crate::classes::ClassRegistry;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Dotted module path that provides these classes.
pub const MODULE: &str = "plotrunner.plotters.pz";

const TRUE_Z: &str = "True Redshift";
const ESTIMATED_Z: &str = "Estimated Redshift";

const BINNING: [ConfigParam; 3] = [
    ConfigParam::float("z_min", 0.0, "Minimum Redshift"),
    ConfigParam::float("z_max", 3.0, "Maximum Redshift"),
    ConfigParam::int("n_zbins", 150, "Number of z bins"),
];

/// Upper bound on `n_zbins`; the 2D histogram allocates `n_zbins²` cells.
const MAX_ZBINS: i64 = 1_000;

const ACCURACY_CONFIG: [ConfigParam; 4] = [
    BINNING[0],
    BINNING[1],
    BINNING[2],
    ConfigParam::float("delta_cutoff", 0.1, "Delta-Z Cutoff for accuracy"),
];

const POINT_ESTIMATE_INPUTS: &[InputSpec] = &[
    InputSpec::new("truth", DatumKind::FloatArray),
    InputSpec::new("pointEstimate", DatumKind::FloatArray),
];

const MULTI_ESTIMATE_INPUTS: &[InputSpec] = &[
    InputSpec::new("truth", DatumKind::FloatArray),
    InputSpec::new("pointEstimates", DatumKind::FloatArrayMap),
];

pub(crate) fn register(classes: &mut ClassRegistry<dyn Plotter>) {
    classes.register("PZPlotterPointEstimateVsTrueHist2D", hist2d);
    classes.register("PZPlotterPointEstimateVsTrueProfile", profile);
    classes.register("PZPlotterAccuraciesVsTrue", accuracies);
}

fn hist2d(name: &str, args: ConfigArgs) -> Result<Box<dyn Plotter>> {
    Ok(Box::new(PointEstimateVsTrueHist2D::new(name, args)?))
}

fn profile(name: &str, args: ConfigArgs) -> Result<Box<dyn Plotter>> {
    Ok(Box::new(PointEstimateVsTrueProfile::new(name, args)?))
}

fn accuracies(name: &str, args: ConfigArgs) -> Result<Box<dyn Plotter>> {
    Ok(Box::new(AccuraciesVsTrue::new(name, args)?))
}

/// Equal-width redshift bins.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ZBins {
    min: f64,
    max: f64,
    count: usize,
}

impl ZBins {
    fn from_config(owner: &str, config: &Config) -> Result<Self> {
        let min = config.float("z_min")?;
        let max = config.float("z_max")?;
        let count = config.int("n_zbins")?;
        if !(1..=MAX_ZBINS).contains(&count) {
            return Err(Error::InvalidConfig {
                owner: owner.to_string(),
                key: "n_zbins".to_string(),
                expected: format!("a bin count between 1 and {MAX_ZBINS}"),
                actual: count.to_string(),
            });
        }
        if max <= min {
            return Err(Error::InvalidConfig {
                owner: owner.to_string(),
                key: "z_max".to_string(),
                expected: format!("a value above z_min ({min})"),
                actual: max.to_string(),
            });
        }
        Ok(Self {
            min,
            max,
            count: count as usize,
        })
    }

    fn width(&self) -> f64 {
        (self.max - self.min) / self.count as f64
    }

    fn edges(&self) -> Vec<f64> {
        (0..=self.count)
            .map(|i| self.min + self.width() * i as f64)
            .collect()
    }

    fn centers(&self) -> Vec<f64> {
        (0..self.count)
            .map(|i| self.min + self.width() * (i as f64 + 0.5))
            .collect()
    }

    /// Bin holding `value`; the upper edge belongs to the last bin.
    fn index(&self, value: f64) -> Option<usize> {
        if !(self.min..=self.max).contains(&value) {
            return None;
        }
        let index = ((value - self.min) / self.width()).floor() as usize;
        Some(index.min(self.count - 1))
    }

    /// Group `values` by the bin of the matching `truth` entry.
    fn partition(&self, truth: &[f64], values: &[f64]) -> Vec<Vec<f64>> {
        let mut bins = vec![Vec::new(); self.count];
        for (z, value) in truth.iter().zip(values) {
            if let Some(index) = self.index(*z) {
                bins[index].push(*value);
            }
        }
        bins
    }
}

fn float_input<'a>(owner: &str, inputs: &'a Inputs, key: &str) -> Result<&'a [f64]> {
    inputs
        .get(key)
        .and_then(|datum| datum.as_float_array())
        .ok_or_else(|| Error::MissingInput {
            owner: owner.to_string(),
            key: key.to_string(),
            provided: inputs.keys().cloned().collect(),
        })
}

fn check_lengths(owner: &str, truth: &[f64], key: &str, other: &[f64]) -> Result<()> {
    if truth.len() != other.len() {
        return Err(Error::InvalidInput {
            owner: owner.to_string(),
            message: format!(
                "'{key}' has {} entries but 'truth' has {}",
                other.len(),
                truth.len()
            ),
        });
    }
    Ok(())
}

fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// 2-D histogram of point estimates against true redshift.
#[derive(Debug)]
pub struct PointEstimateVsTrueHist2D {
    name: String,
    config: Config,
    bins: ZBins,
}

impl PointEstimateVsTrueHist2D {
    pub fn new(name: &str, args: ConfigArgs) -> Result<Self> {
        let config = Config::resolve(name, &BINNING, args)?;
        let bins = ZBins::from_config(name, &config)?;
        Ok(Self {
            name: name.to_string(),
            config,
            bins,
        })
    }
}

impl Plotter for PointEstimateVsTrueHist2D {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn input_schema(&self) -> &'static [InputSpec] {
        POINT_ESTIMATE_INPUTS
    }

    fn render(&self, inputs: &Inputs) -> Result<Vec<(&'static str, Figure)>> {
        let truth = float_input(&self.name, inputs, "truth")?;
        let estimate = float_input(&self.name, inputs, "pointEstimate")?;
        check_lengths(&self.name, truth, "pointEstimate", estimate)?;

        let mut counts = vec![vec![0_u64; self.bins.count]; self.bins.count];
        for (z, est) in truth.iter().zip(estimate) {
            if let (Some(x), Some(y)) = (self.bins.index(*z), self.bins.index(*est)) {
                counts[x][y] += 1;
            }
        }
        let edges = self.bins.edges();
        let figure = Figure {
            x_label: TRUE_Z.to_string(),
            y_label: ESTIMATED_Z.to_string(),
            plot: Plot::Histogram2d {
                x_edges: edges.clone(),
                y_edges: edges,
                counts,
            },
        };
        Ok(vec![("hist", figure)])
    }
}

/// Mean offset and spread of point estimates per true-redshift bin.
#[derive(Debug)]
pub struct PointEstimateVsTrueProfile {
    name: String,
    config: Config,
    bins: ZBins,
}

impl PointEstimateVsTrueProfile {
    pub fn new(name: &str, args: ConfigArgs) -> Result<Self> {
        let config = Config::resolve(name, &BINNING, args)?;
        let bins = ZBins::from_config(name, &config)?;
        Ok(Self {
            name: name.to_string(),
            config,
            bins,
        })
    }
}

impl Plotter for PointEstimateVsTrueProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn input_schema(&self) -> &'static [InputSpec] {
        POINT_ESTIMATE_INPUTS
    }

    fn render(&self, inputs: &Inputs) -> Result<Vec<(&'static str, Figure)>> {
        let truth = float_input(&self.name, inputs, "truth")?;
        let estimate = float_input(&self.name, inputs, "pointEstimate")?;
        check_lengths(&self.name, truth, "pointEstimate", estimate)?;

        let centers = self.bins.centers();
        let mut means = Vec::with_capacity(self.bins.count);
        let mut stds = Vec::with_capacity(self.bins.count);
        for (bin, center) in self.bins.partition(truth, estimate).iter().zip(&centers) {
            let stats = mean_and_std(bin);
            means.push(stats.map(|(mean, _)| mean - center));
            stds.push(stats.map(|(_, std)| std));
        }
        let figure = Figure {
            x_label: TRUE_Z.to_string(),
            y_label: ESTIMATED_Z.to_string(),
            plot: Plot::Profile {
                bin_centers: centers,
                means,
                stds,
            },
        };
        Ok(vec![("profile", figure)])
    }
}

/// Per-algorithm fraction of estimates within `delta_cutoff` of the truth.
#[derive(Debug)]
pub struct AccuraciesVsTrue {
    name: String,
    config: Config,
    bins: ZBins,
    cutoff: f64,
}

impl AccuraciesVsTrue {
    pub fn new(name: &str, args: ConfigArgs) -> Result<Self> {
        let config = Config::resolve(name, &ACCURACY_CONFIG, args)?;
        let bins = ZBins::from_config(name, &config)?;
        let cutoff = config.float("delta_cutoff")?;
        Ok(Self {
            name: name.to_string(),
            config,
            bins,
            cutoff,
        })
    }
}

impl Plotter for AccuraciesVsTrue {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn input_schema(&self) -> &'static [InputSpec] {
        MULTI_ESTIMATE_INPUTS
    }

    fn render(&self, inputs: &Inputs) -> Result<Vec<(&'static str, Figure)>> {
        let truth = float_input(&self.name, inputs, "truth")?;
        let estimates = inputs
            .get("pointEstimates")
            .and_then(|datum| datum.as_float_array_map())
            .ok_or_else(|| Error::MissingInput {
                owner: self.name.clone(),
                key: "pointEstimates".to_string(),
                provided: inputs.keys().cloned().collect(),
            })?;

        let mut curves = BTreeMap::new();
        for (algo, estimate) in estimates {
            check_lengths(&self.name, truth, algo, estimate)?;
            let deltas: Vec<f64> = estimate.iter().zip(truth).map(|(e, z)| e - z).collect();
            let accuracy: Vec<Option<f64>> = self
                .bins
                .partition(truth, &deltas)
                .iter()
                .map(|bin| {
                    if bin.is_empty() {
                        return None;
                    }
                    let hits = bin.iter().filter(|d| d.abs() <= self.cutoff).count();
                    Some(hits as f64 / bin.len() as f64)
                })
                .collect();
            curves.insert(algo.clone(), accuracy);
        }
        let figure = Figure {
            x_label: TRUE_Z.to_string(),
            y_label: "Accuracy".to_string(),
            plot: Plot::Curves {
                x: self.bins.centers(),
                curves,
            },
        };
        Ok(vec![("accuracy", figure)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Datum;
    use serde_json::{Value, json};

    fn args(value: Value) -> ConfigArgs {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn point_inputs(truth: Vec<f64>, estimate: Vec<f64>) -> Inputs {
        Inputs::from([
            ("truth".to_string(), Datum::FloatArray(truth)),
            ("pointEstimate".to_string(), Datum::FloatArray(estimate)),
        ])
    }

    #[test]
    fn defaults_match_published_binning() {
        let plotter = PointEstimateVsTrueHist2D::new("h", ConfigArgs::new()).unwrap();
        assert_eq!(plotter.config().float("z_max").unwrap(), 3.0);
        assert_eq!(plotter.config().int("n_zbins").unwrap(), 150);
        assert_eq!(plotter.bins.edges().len(), 151);
    }

    #[test]
    fn upper_edge_lands_in_last_bin() {
        let bins = ZBins {
            min: 0.0,
            max: 1.0,
            count: 4,
        };
        assert_eq!(bins.index(0.0), Some(0));
        assert_eq!(bins.index(0.3), Some(1));
        assert_eq!(bins.index(1.0), Some(3));
        assert_eq!(bins.index(1.01), None);
        assert_eq!(bins.index(-0.1), None);
    }

    #[test]
    fn hist_counts_pairs_and_drops_out_of_range() {
        let plotter =
            PointEstimateVsTrueHist2D::new("h", args(json!({"z_max": 1.0, "n_zbins": 2}))).unwrap();
        let out = plotter
            .invoke("s", &point_inputs(vec![0.1, 0.2, 0.9, 2.0], vec![0.1, 0.7, 0.8, 0.5]))
            .unwrap();
        let Plot::Histogram2d { counts, .. } = &out["h_s_hist"].plot else {
            panic!("expected a histogram");
        };
        assert_eq!(counts, &vec![vec![1, 1], vec![0, 1]]);
    }

    #[test]
    fn profile_reports_offset_from_bin_centre() {
        let plotter = PointEstimateVsTrueProfile::new(
            "p",
            args(json!({"z_min": 0, "z_max": 2, "n_zbins": 2})),
        )
        .unwrap();
        let out = plotter
            .invoke("s", &point_inputs(vec![0.2, 0.4], vec![0.5, 0.7]))
            .unwrap();
        let Plot::Profile {
            bin_centers,
            means,
            stds,
        } = &out["p_s_profile"].plot
        else {
            panic!("expected a profile");
        };
        assert_eq!(bin_centers, &vec![0.5, 1.5]);
        assert!((means[0].unwrap() - 0.1).abs() < 1e-12);
        assert!((stds[0].unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(means[1], None);
    }

    #[test]
    fn accuracy_per_algorithm() {
        let plotter =
            AccuraciesVsTrue::new("a", args(json!({"z_max": 1.0, "n_zbins": 1}))).unwrap();
        let inputs = Inputs::from([
            ("truth".to_string(), Datum::FloatArray(vec![0.2, 0.4])),
            (
                "pointEstimates".to_string(),
                Datum::FloatArrayMap(BTreeMap::from([
                    ("knn".to_string(), vec![0.25, 0.9]),
                    ("bpz".to_string(), vec![0.2, 0.4]),
                ])),
            ),
        ]);
        let out = plotter.invoke("s", &inputs).unwrap();
        let Plot::Curves { curves, .. } = &out["a_s_accuracy"].plot else {
            panic!("expected curves");
        };
        assert_eq!(curves["knn"], vec![Some(0.5)]);
        assert_eq!(curves["bpz"], vec![Some(1.0)]);
    }

    #[test]
    fn mismatched_lengths_are_invalid_input() {
        let plotter = PointEstimateVsTrueHist2D::new("h", ConfigArgs::new()).unwrap();
        let err = plotter
            .invoke("s", &point_inputs(vec![0.1, 0.2], vec![0.1]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn inverted_range_is_rejected_at_construction() {
        let err =
            PointEstimateVsTrueProfile::new("p", args(json!({"z_min": 2.0, "z_max": 1.0})))
                .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { ref key, .. } if key == "z_max"));
    }

    #[test]
    fn bin_count_is_bounded_at_construction() {
        for count in [0, -3, MAX_ZBINS + 1, 10_000_000] {
            let err = PointEstimateVsTrueHist2D::new("h", args(json!({"n_zbins": count})))
                .unwrap_err();
            assert!(
                matches!(err, Error::InvalidConfig { ref key, .. } if key == "n_zbins"),
                "{count}: {err:?}"
            );
        }
        let plotter =
            PointEstimateVsTrueHist2D::new("h", args(json!({"n_zbins": MAX_ZBINS}))).unwrap();
        assert_eq!(plotter.bins.count, MAX_ZBINS as usize);
    }
}
