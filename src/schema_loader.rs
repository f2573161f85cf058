//! JSON Schema checks applied to declarative sources before interpretation.
//!
//! Schemas ship inside the binary (`schema/*.schema.json`) so a relocated
//! executable validates the same way the test suite does. Validation failures
//! become [`Error::Schema`] carrying every violation, not just the first.

use crate::error::{Error, Result};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

const BLOCK_SCHEMA: &str = include_str!("../schema/block.schema.json");
const PLOT_RUN_SCHEMA: &str = include_str!("../schema/plot_run.schema.json");

/// A compiled schema plus the name used in error messages.
pub(crate) struct CompiledSchema {
    name: &'static str,
    compiled: JSONSchema,
}

impl CompiledSchema {
    /// Compile an embedded schema document.
    pub(crate) fn compile(name: &'static str, text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text).map_err(|err| {
            Error::schema(name, format!("schema is not valid JSON: {err}"), Vec::new())
        })?;
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&raw)
            .map_err(|err| Error::schema(name, format!("compiling schema: {err}"), Vec::new()))?;
        Ok(Self { name, compiled })
    }

    /// Validate `instance`, reporting every violation under `origin`.
    pub(crate) fn check(&self, instance: &Value, origin: &str) -> Result<()> {
        if let Err(errors) = self.compiled.validate(instance) {
            let details = errors
                .map(|err| err.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            let keys = instance
                .as_object()
                .map(|map| map.keys().cloned().collect())
                .unwrap_or_default();
            return Err(Error::schema(
                origin,
                format!("failed {} validation:\n{details}", self.name),
                keys,
            ));
        }
        Ok(())
    }
}

/// Shape check for one item/group/context block.
pub(crate) fn block_schema() -> Result<CompiledSchema> {
    CompiledSchema::compile("block.schema.json", BLOCK_SCHEMA)
}

/// Shape check for the top-level plot run file.
pub(crate) fn plot_run_schema() -> Result<CompiledSchema> {
    CompiledSchema::compile("plot_run.schema.json", PLOT_RUN_SCHEMA)
}
