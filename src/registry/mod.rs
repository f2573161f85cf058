//! Named items, groups and contexts for one capability type.
//!
//! An [`EntityRegistry`] is filled by the declarative loader: item blocks
//! construct implementations through the capability's [`ClassRegistry`],
//! group blocks bind already-registered items by name, and context blocks
//! build external objects (projects) that item constructors may look up. The
//! three namespaces are independent and names are unique within each.

pub mod loader;

use crate::capability::ConfigArgs;
use crate::classes::{ClassRegistry, Constructor};
use crate::error::{Error, Namespace, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Block vocabulary of one capability type.
#[derive(Clone, Copy, Debug)]
pub struct Vocabulary {
    /// Short capability label used in messages (`plotter`, `dataset`).
    pub registry: &'static str,
    pub item: &'static str,
    pub selector: &'static str,
    pub group: &'static str,
    pub members: &'static str,
    pub context: Option<ContextVocabulary>,
}

#[derive(Clone, Copy, Debug)]
pub struct ContextVocabulary {
    pub block: &'static str,
    pub source: &'static str,
}

impl Vocabulary {
    /// Every block kind a source of this capability may contain.
    pub fn block_kinds(&self) -> Vec<&'static str> {
        let mut kinds = vec![self.item, self.group];
        if let Some(context) = self.context {
            kinds.push(context.block);
        }
        kinds
    }
}

/// Binds a capability type to its vocabulary, classes and constructors.
pub trait EntityKind: Sized + 'static {
    /// Implementation trait object the class table constructs.
    type Class: ?Sized;
    /// What an item block registers.
    type Item: ?Sized + fmt::Debug;
    /// What a context block registers.
    type Context: fmt::Debug;

    const VOCABULARY: Vocabulary;

    /// Class table with this capability's built-in modules.
    fn classes() -> ClassRegistry<Self::Class>;

    /// Build an item from its resolved constructor and remaining block keys.
    ///
    /// `registry` is the registry being loaded, so constructors can look up
    /// contexts registered by earlier blocks.
    fn build_item(
        registry: &EntityRegistry<Self>,
        constructor: Constructor<Self::Class>,
        name: &str,
        selector: &str,
        args: ConfigArgs,
    ) -> Result<Arc<Self::Item>>;

    /// Build a context from its source file.
    fn build_context(name: &str, source: &Path) -> Result<Self::Context>;
}

/// One resolved group entry.
pub struct Member<T: ?Sized> {
    label: String,
    name: String,
    item: Arc<T>,
}

impl<T: ?Sized> Member<T> {
    /// Key of the entry inside its group (the item name unless relabelled).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Name of the referenced item.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn item(&self) -> &Arc<T> {
        &self.item
    }
}

impl<T: ?Sized> Clone for Member<T> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            name: self.name.clone(),
            item: Arc::clone(&self.item),
        }
    }
}

/// Named, ordered collection of live item references.
pub struct Group<T: ?Sized> {
    name: String,
    members: Vec<Member<T>>,
}

impl<T: ?Sized> Group<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[Member<T>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Items in group order.
    pub fn items(&self) -> impl Iterator<Item = &Arc<T>> {
        self.members.iter().map(|member| &member.item)
    }

    /// Member by label.
    pub fn get(&self, label: &str) -> Option<&Arc<T>> {
        self.members
            .iter()
            .find(|member| member.label == label)
            .map(|member| &member.item)
    }
}

impl<T: ?Sized> Clone for Group<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            members: self.members.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Group<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for member in &self.members {
            map.entry(&member.label, &member.name);
        }
        map.finish()
    }
}

pub struct EntityRegistry<K: EntityKind> {
    classes: ClassRegistry<K::Class>,
    items: BTreeMap<String, Arc<K::Item>>,
    groups: BTreeMap<String, Group<K::Item>>,
    contexts: BTreeMap<String, Arc<K::Context>>,
}

/// Registry contents captured before an all-or-nothing load.
struct Snapshot<K: EntityKind> {
    items: BTreeMap<String, Arc<K::Item>>,
    groups: BTreeMap<String, Group<K::Item>>,
    contexts: BTreeMap<String, Arc<K::Context>>,
}

impl<K: EntityKind> EntityRegistry<K> {
    /// Empty registry using the capability's built-in class table.
    pub fn new() -> Self {
        Self::with_classes(K::classes())
    }

    pub fn with_classes(classes: ClassRegistry<K::Class>) -> Self {
        Self {
            classes,
            items: BTreeMap::new(),
            groups: BTreeMap::new(),
            contexts: BTreeMap::new(),
        }
    }

    pub fn vocabulary(&self) -> Vocabulary {
        K::VOCABULARY
    }

    pub fn classes(&self) -> &ClassRegistry<K::Class> {
        &self.classes
    }

    /// Mutable class table, for registering extra implementations.
    pub fn classes_mut(&mut self) -> &mut ClassRegistry<K::Class> {
        &mut self.classes
    }

    pub fn get_item(&self, name: &str) -> Result<&Arc<K::Item>> {
        self.items
            .get(name)
            .ok_or_else(|| self.not_found(Namespace::Item, name, self.items.keys()))
    }

    pub fn get_group(&self, name: &str) -> Result<&Group<K::Item>> {
        self.groups
            .get(name)
            .ok_or_else(|| self.not_found(Namespace::Group, name, self.groups.keys()))
    }

    pub fn get_context(&self, name: &str) -> Result<&Arc<K::Context>> {
        self.contexts
            .get(name)
            .ok_or_else(|| self.not_found(Namespace::Context, name, self.contexts.keys()))
    }

    pub fn item_names(&self) -> Vec<&str> {
        self.items.keys().map(String::as_str).collect()
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.keys().map(String::as_str).collect()
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, &Arc<K::Item>)> {
        self.items.iter().map(|(name, item)| (name.as_str(), item))
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &Group<K::Item>)> {
        self.groups.iter().map(|(name, group)| (name.as_str(), group))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.groups.is_empty() && self.contexts.is_empty()
    }

    /// Read a YAML block source from disk and load it.
    ///
    /// Blocks are applied in file order and are not rolled back: if block N
    /// fails, blocks before it stay registered. See [`Self::load_atomic`].
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let source = read_yaml(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        tracing::info!(
            registry = K::VOCABULARY.registry,
            path = %path.display(),
            "loading declarative source"
        );
        loader::load_blocks(self, &source, &path.display().to_string(), base_dir)
    }

    /// Like [`Self::load`], but restores the previous contents on failure.
    pub fn load_atomic(&mut self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot();
        let outcome = self.load(path);
        if outcome.is_err() {
            tracing::debug!(
                registry = K::VOCABULARY.registry,
                "load failed, restoring previous registry contents"
            );
            self.restore(snapshot);
        }
        outcome
    }

    /// Load blocks from YAML text; relative context sources resolve against
    /// `base_dir`.
    pub fn load_str(&mut self, text: &str, base_dir: &Path) -> Result<()> {
        let source: Value = serde_yaml::from_str(text).map_err(|source| Error::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        loader::load_blocks(self, &source, "<inline>", base_dir)
    }

    /// Drop every item, group and context. The class table is kept.
    pub fn reset(&mut self) {
        self.items.clear();
        self.groups.clear();
        self.contexts.clear();
    }

    /// Diagnostic view of the current contents.
    pub fn dump(&self) -> Contents<'_, K> {
        Contents { registry: self }
    }

    fn snapshot(&self) -> Snapshot<K> {
        Snapshot {
            items: self.items.clone(),
            groups: self.groups.clone(),
            contexts: self.contexts.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot<K>) {
        self.items = snapshot.items;
        self.groups = snapshot.groups;
        self.contexts = snapshot.contexts;
    }

    fn ensure_vacant(&self, namespace: Namespace, name: &str) -> Result<()> {
        let taken = match namespace {
            Namespace::Item => self.items.contains_key(name),
            Namespace::Group => self.groups.contains_key(name),
            Namespace::Context => self.contexts.contains_key(name),
            Namespace::Binding => false,
        };
        if taken {
            return Err(Error::DuplicateName {
                registry: K::VOCABULARY.registry,
                namespace,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn not_found<'a>(
        &self,
        namespace: Namespace,
        name: &str,
        known: impl Iterator<Item = &'a String>,
    ) -> Error {
        Error::NotFound {
            registry: K::VOCABULARY.registry,
            namespace,
            name: name.to_string(),
            known: known.cloned().collect(),
        }
    }
}

impl<K: EntityKind> Default for EntityRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityKind> fmt::Debug for EntityRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("registry", &K::VOCABULARY.registry)
            .field("items", &self.items.keys().collect::<Vec<_>>())
            .field("groups", &self.groups.keys().collect::<Vec<_>>())
            .field("contexts", &self.contexts.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Printable listing returned by [`EntityRegistry::dump`].
pub struct Contents<'a, K: EntityKind> {
    registry: &'a EntityRegistry<K>,
}

impl<K: EntityKind> fmt::Display for Contents<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vocab = K::VOCABULARY;
        writeln!(f, "{}s:", vocab.item)?;
        for (name, item) in &self.registry.items {
            writeln!(f, "  {name}: {item:?}")?;
        }
        writeln!(f, "----------------")?;
        writeln!(f, "{}s:", vocab.group)?;
        for (name, group) in &self.registry.groups {
            writeln!(f, "  {name}: {group:?}")?;
        }
        if let Some(context) = vocab.context {
            writeln!(f, "----------------")?;
            writeln!(f, "{}s:", context.block)?;
            for (name, ctx) in &self.registry.contexts {
                writeln!(f, "  {name}: {ctx:?}")?;
            }
        }
        Ok(())
    }
}

/// Read and parse one YAML document into a dynamic value.
pub(crate) fn read_yaml(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|err| Error::io("reading", path, err))?;
    serde_yaml::from_str(&text).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}
