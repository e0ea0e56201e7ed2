//! Config loader (§4.1/§6): two flat JSON files — `models.json` and
//! `providers.json` — resolved relative to the running executable's
//! directory, plus a plain-text `systemPrompt`.
//!
//! Loading fails soft: a missing or unparseable file logs a warning and
//! yields an empty catalog. The engine itself decides whether an empty
//! model catalog is fatal (it is — see [`ModelCatalog::require_nonempty`]).

mod catalog;
mod loader;
mod types;

pub use catalog::{AllModelsCache, ModelCatalog, ProviderModels, Resolution};
pub use loader::{config_dir, load_providers_config, load_system_prompt};
pub use types::{ModelEntry, ProviderEntry, ProvidersConfig, ProvidersMeta};

use std::collections::HashMap;
use std::path::Path;

use crate::constants::MODELS_CONFIG_FILENAME;
use crate::output::Renderer;

/// Load both catalogs from `dir`, warning on any failure via `renderer`.
pub fn load_catalogs(dir: &Path, renderer: &mut dyn Renderer) -> (HashMap<String, ModelEntry>, ProvidersConfig) {
    let models_path = dir.join(MODELS_CONFIG_FILENAME);
    let models = match loader::load_models_config(&models_path) {
        Ok(m) => m,
        Err(e) => {
            renderer.warn(&format!("could not load {}: {e}", models_path.display()));
            HashMap::new()
        }
    };

    let providers_path = dir.join(crate::constants::PROVIDERS_CONFIG_FILENAME);
    let providers = match load_providers_config(&providers_path) {
        Ok(p) => p,
        Err(e) => {
            renderer.warn(&format!("could not load {}: {e}", providers_path.display()));
            ProvidersConfig::default()
        }
    };

    (models, providers)
}
