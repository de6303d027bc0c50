//! Per-language substitution tables for the pre- and post-replacement layers.
//!
//! Tables live on disk as flat JSON objects (`{"pattern": "replacement"}`)
//! under `<root>/pre/<code>.json` and `<root>/post/<code>.json`. A table that
//! cannot be loaded is treated as empty; callers never see a glossary error.

use crate::i18n::Language;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Ordered mapping from search pattern to replacement text.
///
/// Iteration follows the order keys were first inserted (file order for
/// tables read from JSON). Re-inserting an existing key replaces its value in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlossaryTable {
    entries: Vec<(String, String)>,
}

impl GlossaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pattern: impl Into<String>, replacement: impl Into<String>) {
        let pattern = pattern.into();
        let replacement = replacement.into();
        match self.entries.iter_mut().find(|(key, _)| *key == pattern) {
            Some(entry) => entry.1 = replacement,
            None => self.entries.push((pattern, replacement)),
        }
    }

    pub fn get(&self, pattern: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == pattern)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Overlay `overrides` on top of this table. Override values win on key
    /// collision; keys new to this table are appended in override order.
    pub fn merged(&self, overrides: &GlossaryTable) -> GlossaryTable {
        let mut merged = self.clone();
        for (pattern, replacement) in overrides.iter() {
            merged.insert(pattern, replacement);
        }
        merged
    }
}

impl<K, V> FromIterator<(K, V)> for GlossaryTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = GlossaryTable::new();
        for (pattern, replacement) in iter {
            table.insert(pattern, replacement);
        }
        table
    }
}

impl Serialize for GlossaryTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (pattern, replacement) in &self.entries {
            map.serialize_entry(pattern, replacement)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for GlossaryTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = GlossaryTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping patterns to replacement strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut table = GlossaryTable::new();
                while let Some((pattern, replacement)) = access.next_entry::<String, String>()? {
                    table.insert(pattern, replacement);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Which replacement layer a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplacerStage {
    Pre,
    Post,
}

impl ReplacerStage {
    pub fn dir_name(&self) -> &'static str {
        match self {
            ReplacerStage::Pre => "pre",
            ReplacerStage::Post => "post",
        }
    }
}

/// Loads glossary tables from disk and keeps them for the lifetime of the store.
///
/// The store is injected into the translator rather than held globally, so
/// tests can point separate stores at separate directories.
#[derive(Debug)]
pub struct GlossaryStore {
    root: PathBuf,
    cache: RwLock<HashMap<(ReplacerStage, Language), Arc<GlossaryTable>>>,
}

impl GlossaryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, stage: ReplacerStage, language: Language) -> PathBuf {
        self.root
            .join(stage.dir_name())
            .join(format!("{}.json", language.code()))
    }

    /// Default table for `language` at `stage`. Never fails: a missing or
    /// malformed file yields an empty table.
    pub async fn load(&self, stage: ReplacerStage, language: Language) -> Arc<GlossaryTable> {
        if let Some(table) = self.cache.read().await.get(&(stage, language)) {
            return Arc::clone(table);
        }

        let table = Arc::new(read_table(&self.path_for(stage, language)).await);

        let mut cache = self.cache.write().await;
        Arc::clone(cache.entry((stage, language)).or_insert(table))
    }

    /// Drop every cached table so the next `load` re-reads disk.
    pub async fn invalidate(&self) -> usize {
        let mut cache = self.cache.write().await;
        let dropped = cache.len();
        cache.clear();
        dropped
    }
}

async fn read_table(path: &Path) -> GlossaryTable {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            debug!("No glossary at {}: {}", path.display(), e);
            return GlossaryTable::new();
        }
    };

    match serde_json::from_str::<GlossaryTable>(&content) {
        Ok(table) => {
            debug!("Loaded {} glossary entries from {}", table.len(), path.display());
            table
        }
        Err(e) => {
            warn!("Ignoring malformed glossary {}: {}", path.display(), e);
            GlossaryTable::new()
        }
    }
}
