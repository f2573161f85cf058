//! Capability-indexed class table.
//!
//! Maps a bare implementation name (e.g. `PZPlotterPointEstimateVsTrueHist2D`)
//! to the function that constructs it. Classes enter the table either through
//! an explicit [`ClassRegistry::register`] call or by loading a *module*: a
//! dotted path whose loader registers every class the module provides. Module
//! loaders are the only extension point; a selector naming an unknown module
//! or class is a configuration error.

use crate::capability::ConfigArgs;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Builds one implementation from its instance name and configuration.
pub type Constructor<C> = fn(&str, ConfigArgs) -> Result<Box<C>>;

/// Registers the classes a module provides.
pub type ModuleLoader<C> = fn(&mut ClassRegistry<C>);

pub struct ClassRegistry<C: ?Sized> {
    capability: &'static str,
    classes: BTreeMap<String, Constructor<C>>,
    modules: BTreeMap<String, ModuleLoader<C>>,
    loaded: BTreeSet<String>,
}

impl<C: ?Sized> ClassRegistry<C> {
    /// Empty table for the named capability (used in error messages).
    pub fn new(capability: &'static str) -> Self {
        Self {
            capability,
            classes: BTreeMap::new(),
            modules: BTreeMap::new(),
            loaded: BTreeSet::new(),
        }
    }

    pub fn capability(&self) -> &'static str {
        self.capability
    }

    /// Register a constructor under its bare name, replacing any previous one.
    pub fn register(&mut self, name: &str, constructor: Constructor<C>) {
        self.classes.insert(name.to_string(), constructor);
    }

    /// Make a module loadable by dotted path without loading it yet.
    pub fn register_module(&mut self, path: &str, loader: ModuleLoader<C>) {
        self.modules.insert(path.to_string(), loader);
    }

    /// Run a module's loader. Loading the same module twice is a no-op.
    pub fn load_module(&mut self, path: &str) -> Result<()> {
        if self.loaded.contains(path) {
            return Ok(());
        }
        let loader = *self.modules.get(path).ok_or_else(|| Error::Import {
            module: path.to_string(),
            known: self.modules.keys().cloned().collect(),
        })?;
        loader(self);
        self.loaded.insert(path.to_string());
        tracing::debug!(capability = self.capability, module = path, "loaded module");
        Ok(())
    }

    /// Look up a class that is already registered.
    pub fn get(&self, name: &str) -> Result<Constructor<C>> {
        self.classes.get(name).copied().ok_or_else(|| Error::Lookup {
            capability: self.capability,
            name: name.to_string(),
            known: self.classes.keys().cloned().collect(),
        })
    }

    /// Resolve a dotted selector such as `plotrunner.plotters.pz.SomeClass`.
    ///
    /// Everything before the last `.` names the module to load; the final
    /// segment must match the registered class name. A selector without a
    /// `.` skips module loading.
    pub fn resolve(&mut self, selector: &str) -> Result<Constructor<C>> {
        match selector.rsplit_once('.') {
            Some((module, name)) => {
                self.load_module(module)?;
                self.get(name)
            }
            None => self.get(selector),
        }
    }

    /// Registered class names in stable order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Loadable module paths in stable order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.loaded.contains(path)
    }
}

impl<C: ?Sized> fmt::Debug for ClassRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("capability", &self.capability)
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}
