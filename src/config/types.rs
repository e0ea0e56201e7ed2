use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `models.json` entry: `{<display_name>: {provider, model_name, alias}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub provider: String,
    pub model_name: String,
    #[serde(default)]
    pub alias: Vec<String>,
}

/// `providers.json` entry: `{<provider>: {api_base, api_key_env}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub api_base: String,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersMeta {
    pub default_model: Option<String>,
}

/// Top-level shape of `providers.json`: provider entries plus an optional
/// `_meta` block.
#[derive(Debug, Clone, Default)]
pub struct ProvidersConfig {
    pub providers: HashMap<String, ProviderEntry>,
    pub meta: ProvidersMeta,
}
