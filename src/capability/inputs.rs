//! Typed named inputs and their validation.

use super::{ConfigArgs, value_type_name};
use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatumKind {
    Float,
    Int,
    Text,
    TextList,
    FloatArray,
    FloatArrayMap,
}

impl DatumKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatumKind::Float => "float",
            DatumKind::Int => "int",
            DatumKind::Text => "string",
            DatumKind::TextList => "list of strings",
            DatumKind::FloatArray => "float array",
            DatumKind::FloatArrayMap => "mapping of float arrays",
        }
    }
}

/// One concrete input value handed to an implementation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Datum {
    Float(f64),
    Int(i64),
    Text(String),
    TextList(Vec<String>),
    FloatArray(Vec<f64>),
    FloatArrayMap(BTreeMap<String, Vec<f64>>),
}

impl Datum {
    pub fn kind(&self) -> DatumKind {
        match self {
            Datum::Float(_) => DatumKind::Float,
            Datum::Int(_) => DatumKind::Int,
            Datum::Text(_) => DatumKind::Text,
            Datum::TextList(_) => DatumKind::TextList,
            Datum::FloatArray(_) => DatumKind::FloatArray,
            Datum::FloatArrayMap(_) => DatumKind::FloatArrayMap,
        }
    }

    /// Convert a dynamic value into the requested kind, if it conforms.
    pub fn from_value(kind: DatumKind, value: &Value) -> Option<Self> {
        match kind {
            DatumKind::Float => value.as_f64().map(Datum::Float),
            DatumKind::Int => value.as_i64().map(Datum::Int),
            DatumKind::Text => value.as_str().map(|s| Datum::Text(s.to_string())),
            DatumKind::TextList => string_list(value).map(Datum::TextList),
            DatumKind::FloatArray => float_array(value).map(Datum::FloatArray),
            DatumKind::FloatArrayMap => {
                let map = value.as_object()?;
                let mut out = BTreeMap::new();
                for (key, entry) in map {
                    out.insert(key.clone(), float_array(entry)?);
                }
                Some(Datum::FloatArrayMap(out))
            }
        }
    }

    pub fn as_float_array(&self) -> Option<&[f64]> {
        match self {
            Datum::FloatArray(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_float_array_map(&self) -> Option<&BTreeMap<String, Vec<f64>>> {
        match self {
            Datum::FloatArrayMap(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Datum::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_text_list(&self) -> Option<&[String]> {
        match self {
            Datum::TextList(items) => Some(items),
            _ => None,
        }
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn float_array(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(Value::as_f64).collect()
}

/// A declared input: name plus required kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSpec {
    pub name: &'static str,
    pub kind: DatumKind,
}

impl InputSpec {
    pub const fn new(name: &'static str, kind: DatumKind) -> Self {
        Self { name, kind }
    }
}

/// Named inputs for one invocation, keyed by input name.
pub type Inputs = BTreeMap<String, Datum>;

/// Check that every declared input is present and of the declared kind.
///
/// Extra inputs are allowed: a dataset may carry more than any single
/// implementation consumes.
pub fn validate_inputs(owner: &str, schema: &[InputSpec], inputs: &Inputs) -> Result<()> {
    for spec in schema {
        let datum = inputs.get(spec.name).ok_or_else(|| Error::MissingInput {
            owner: owner.to_string(),
            key: spec.name.to_string(),
            provided: inputs.keys().cloned().collect(),
        })?;
        if datum.kind() != spec.kind {
            return Err(Error::InputType {
                owner: owner.to_string(),
                key: spec.name.to_string(),
                expected: spec.kind.as_str().to_string(),
                actual: datum.kind().as_str().to_string(),
            });
        }
    }
    Ok(())
}

/// Build typed inputs from declarative keyword arguments.
///
/// Unlike [`validate_inputs`], arguments not named by the schema are
/// rejected, since they come straight from a hand-written block.
pub fn inputs_from_args(owner: &str, schema: &[InputSpec], mut args: ConfigArgs) -> Result<Inputs> {
    let mut inputs = Inputs::new();
    for spec in schema {
        let Some(value) = args.remove(spec.name) else {
            let mut provided: Vec<String> = inputs.keys().cloned().collect();
            provided.extend(args.keys().cloned());
            provided.sort();
            return Err(Error::MissingInput {
                owner: owner.to_string(),
                key: spec.name.to_string(),
                provided,
            });
        };
        let datum = Datum::from_value(spec.kind, &value).ok_or_else(|| Error::InputType {
            owner: owner.to_string(),
            key: spec.name.to_string(),
            expected: spec.kind.as_str().to_string(),
            actual: value_type_name(&value).to_string(),
        })?;
        inputs.insert(spec.name.to_string(), datum);
    }
    if !args.is_empty() {
        return Err(Error::UnrecognizedConfig {
            owner: owner.to_string(),
            keys: args.keys().cloned().collect(),
        });
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: &[InputSpec] = &[
        InputSpec::new("truth", DatumKind::FloatArray),
        InputSpec::new("tag", DatumKind::Text),
    ];

    #[test]
    fn missing_input_reports_what_was_provided() {
        let mut inputs = Inputs::new();
        inputs.insert("truth".into(), Datum::FloatArray(vec![0.1]));
        let err = validate_inputs("plotter", SCHEMA, &inputs).unwrap_err();
        match err {
            Error::MissingInput { key, provided, .. } => {
                assert_eq!(key, "tag");
                assert_eq!(provided, vec!["truth".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn wrong_kind_names_expected_and_actual() {
        let mut inputs = Inputs::new();
        inputs.insert("truth".into(), Datum::Text("nope".into()));
        inputs.insert("tag".into(), Datum::Text("test".into()));
        let err = validate_inputs("plotter", SCHEMA, &inputs).unwrap_err();
        match err {
            Error::InputType {
                expected, actual, ..
            } => {
                assert_eq!(expected, "float array");
                assert_eq!(actual, "string");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn args_are_coerced_and_leftovers_rejected() {
        let Value::Object(args) = json!({"truth": [1, 2.5], "tag": "test"}) else {
            unreachable!()
        };
        let inputs = inputs_from_args("extractor", SCHEMA, args).expect("coerces");
        assert_eq!(inputs["truth"], Datum::FloatArray(vec![1.0, 2.5]));

        let Value::Object(args) = json!({"truth": [], "tag": "t", "extra": 1}) else {
            unreachable!()
        };
        let err = inputs_from_args("extractor", SCHEMA, args).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedConfig { ref keys, .. } if keys == &["extra"]));
    }

    #[test]
    fn float_array_map_requires_numeric_entries() {
        let good = json!({"knn": [0.1, 0.2]});
        assert!(Datum::from_value(DatumKind::FloatArrayMap, &good).is_some());
        let bad = json!({"knn": ["x"]});
        assert!(Datum::from_value(DatumKind::FloatArrayMap, &bad).is_none());
    }
}
