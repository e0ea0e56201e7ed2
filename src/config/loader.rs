use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::constants::{DEFAULT_SYSTEM_PROMPT, GLOBAL_COMMANDS_DIR, SYSTEM_PROMPT_FILENAME};

use super::types::{ModelEntry, ProviderEntry, ProvidersConfig, ProvidersMeta};

/// Directory the config files live in: alongside the running executable,
/// falling back to the crate root so `cargo run` works without an install
/// step.
pub fn config_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")))
}

pub fn load_models_config(path: &Path) -> Result<HashMap<String, ModelEntry>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let models: HashMap<String, ModelEntry> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(models)
}

/// `providers.json` mixes provider entries with an optional `_meta` key at
/// the same object level, so it can't be deserialized directly into a flat
/// map of [`ProviderEntry`].
pub fn load_providers_config(path: &Path) -> Result<ProvidersConfig> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let raw: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let mut providers = HashMap::new();
    let mut meta = ProvidersMeta::default();

    for (key, value) in raw {
        if key == "_meta" {
            meta = serde_json::from_value(value).context("parsing providers.json _meta")?;
            continue;
        }
        let entry: ProviderEntry = serde_json::from_value(value)
            .with_context(|| format!("parsing providers.json entry '{key}'"))?;
        providers.insert(key, entry);
    }

    Ok(ProvidersConfig { providers, meta })
}

/// Builds the system prompt: `systemPrompt` file contents (or a fallback),
/// appended with the absolute path of the packaged `global_commands`
/// directory, then optionally with `AI.md` from the current working
/// directory (§6).
pub fn load_system_prompt(config_dir: &Path, cwd: &Path) -> String {
    let base = std::fs::read_to_string(config_dir.join(SYSTEM_PROMPT_FILENAME))
        .unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string());

    let global_commands = config_dir.join(GLOBAL_COMMANDS_DIR);
    let mut prompt = format!(
        "{}\n\nGlobal commands directory: {}",
        base.trim_end(),
        global_commands.display()
    );

    if let Ok(ai_md) = std::fs::read_to_string(cwd.join("AI.md")) {
        prompt.push_str("\n\n");
        prompt.push_str(ai_md.trim_end());
    }

    prompt
}
