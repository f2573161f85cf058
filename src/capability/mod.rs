//! The construction/invocation contract every producer implementation meets.
//!
//! Implementations declare a configuration schema (named, typed options with
//! optional defaults) and an input schema (named, typed inputs consumed at
//! invocation time). The helpers here resolve configuration, validate inputs
//! before any computation and name outputs deterministically.

pub mod artifact;
pub mod config;
pub mod inputs;

pub use artifact::{
    ArtifactFormat, ArtifactMap, CollisionPolicy, Figure, Plot, artifact_key, merge_artifacts,
};
pub use config::{Config, ConfigArgs, ConfigKind, ConfigParam, ParamDefault};
pub use inputs::{Datum, DatumKind, InputSpec, Inputs, inputs_from_args, validate_inputs};

use serde_json::Value;

/// Human-readable type name of a dynamic value, used in type errors.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
