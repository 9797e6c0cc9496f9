use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use serde::Deserialize;

use crate::foundation::error::{CaptionError, CaptionResult};
use crate::preset::model::EffectPreset;

const BUILTIN_JSON: &str = include_str!("catalog.json");

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    version: Option<String>,
    presets: Vec<EffectPreset>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

/// Immutable table of effect presets keyed by id.
#[derive(Debug, Default)]
pub struct PresetCatalog {
    presets: Vec<EffectPreset>,
    by_id: HashMap<String, usize>,
    aliases: BTreeMap<String, String>,
}

impl PresetCatalog {
    /// The embedded catalog, parsed on first use.
    pub fn builtin() -> &'static PresetCatalog {
        static BUILTIN: OnceLock<PresetCatalog> = OnceLock::new();
        BUILTIN.get_or_init(|| match Self::from_json(BUILTIN_JSON) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "embedded preset catalog is invalid, effects disabled");
                PresetCatalog::default()
            }
        })
    }

    /// Parse a catalog document: `{ "presets": [...], "aliases": { "old": "new" } }`.
    pub fn from_json(json: &str) -> CaptionResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| CaptionError::serde(format!("preset catalog: {e}")))?;

        let mut by_id = HashMap::with_capacity(file.presets.len());
        for (i, p) in file.presets.iter().enumerate() {
            if by_id.insert(p.id.clone(), i).is_some() {
                return Err(CaptionError::validation(format!(
                    "preset catalog: duplicate id \"{}\"",
                    p.id
                )));
            }
        }
        for (alias, target) in &file.aliases {
            if !by_id.contains_key(target) {
                return Err(CaptionError::validation(format!(
                    "preset catalog: alias \"{alias}\" points at unknown id \"{target}\""
                )));
            }
        }

        tracing::debug!(
            version = file.version.as_deref().unwrap_or("unversioned"),
            presets = file.presets.len(),
            aliases = file.aliases.len(),
            "loaded preset catalog"
        );
        Ok(Self {
            presets: file.presets,
            by_id,
            aliases: file.aliases,
        })
    }

    /// Map a legacy alias to its preset id; other ids pass through.
    pub fn resolve_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map_or(id, String::as_str)
    }

    /// Look up a preset by id or alias. Unknown ids (including `none`) yield `None`.
    pub fn lookup(&self, id: &str) -> Option<&EffectPreset> {
        let resolved = self.resolve_id(id.trim());
        self.by_id.get(resolved).map(|&i| &self.presets[i])
    }

    pub fn presets(&self) -> &[EffectPreset] {
        &self.presets
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/preset/catalog.rs"]
mod tests;
