//! `switch_model` resolution (§4.1) and the dynamic `all:provider:id`
//! virtual-key scheme (§4.11).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::{ModelEntry, ProvidersConfig};

/// Cached result of `update_all_models` for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderModels {
    pub fetched_at: String,
    pub source: String,
    pub models: Vec<String>,
}

/// `all-models.json`: `{providers: {<provider>: ProviderModels}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllModelsCache {
    #[serde(default)]
    pub providers: HashMap<String, ProviderModels>,
}

pub struct ModelCatalog {
    pub models: HashMap<String, ModelEntry>,
    pub providers: ProvidersConfig,
    pub all_models: AllModelsCache,
    pub current_key: String,
}

pub enum Resolution {
    Switched { key: String, entry: ModelEntry },
    Unknown,
}

impl ModelCatalog {
    pub fn new(models: HashMap<String, ModelEntry>, providers: ProvidersConfig, all_models: AllModelsCache, initial_key: String) -> Self {
        Self {
            models,
            providers,
            all_models,
            current_key: initial_key,
        }
    }

    /// Refuse to start with an empty model catalog (§7).
    pub fn require_nonempty(&self) -> anyhow::Result<()> {
        if self.models.is_empty() {
            anyhow::bail!("model catalog is empty: no entries in models.json");
        }
        Ok(())
    }

    pub fn current_entry(&self) -> Option<&ModelEntry> {
        self.models.get(&self.current_key)
    }

    /// `switch_model(key)` resolution order (§4.1):
    /// 1. Virtual `all:<provider>:<id>`.
    /// 2. Exact match in the model catalog.
    /// 3. Case-insensitive alias match.
    /// 4. `provider:name` prefix match.
    pub fn resolve(&self, key: &str) -> Resolution {
        if let Some(rest) = key.strip_prefix("all:") {
            return self.resolve_virtual(key, rest);
        }

        if let Some(entry) = self.models.get(key) {
            return Resolution::Switched {
                key: key.to_string(),
                entry: entry.clone(),
            };
        }

        let lower = key.to_lowercase();
        for (display_name, entry) in &self.models {
            if entry.alias.iter().any(|a| a.to_lowercase() == lower) {
                return Resolution::Switched {
                    key: display_name.clone(),
                    entry: entry.clone(),
                };
            }
        }

        if let Some((provider, name)) = key.split_once(':') {
            if self.providers.providers.contains_key(provider) {
                return Resolution::Switched {
                    key: key.to_string(),
                    entry: ModelEntry {
                        provider: provider.to_string(),
                        model_name: name.to_string(),
                        alias: Vec::new(),
                    },
                };
            }
        }

        Resolution::Unknown
    }

    fn resolve_virtual(&self, full_key: &str, rest: &str) -> Resolution {
        let Some((provider, id)) = rest.split_once(':') else {
            return Resolution::Unknown;
        };
        let Some(cached) = self.all_models.providers.get(provider) else {
            return Resolution::Unknown;
        };
        if !cached.models.iter().any(|m| m == id) {
            return Resolution::Unknown;
        }
        Resolution::Switched {
            key: full_key.to_string(),
            entry: ModelEntry {
                provider: provider.to_string(),
                model_name: id.to_string(),
                alias: Vec::new(),
            },
        }
    }

    /// Apply a resolution, updating `current_key`. Virtual entries are
    /// inserted ephemerally (never persisted back to `models.json`).
    pub fn apply(&mut self, resolution: Resolution) -> bool {
        match resolution {
            Resolution::Switched { key, entry } => {
                self.models.entry(key.clone()).or_insert(entry);
                self.current_key = key;
                true
            }
            Resolution::Unknown => false,
        }
    }

    /// Available models grouped by provider, for the unknown-key report and
    /// `/model` listing.
    pub fn grouped_by_provider(&self) -> HashMap<String, Vec<String>> {
        let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
        for (key, entry) in &self.models {
            grouped.entry(entry.provider.clone()).or_default().push(key.clone());
        }
        for names in grouped.values_mut() {
            names.sort();
        }
        grouped
    }
}
