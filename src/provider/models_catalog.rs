//! Dynamic model catalog (§4.11): `update_all_models` fetches `/models`
//! from a provider and caches the result to `all-models.json`.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::config::{AllModelsCache, ProviderEntry, ProviderModels};
use crate::constants::{ALL_MODELS_CACHE_FILENAME, CATALOG_FETCH_TIMEOUT_SECS};

/// Derives a `/models` URL from a chat-completions `api_base`.
fn models_url(api_base: &str) -> String {
    let trimmed = api_base
        .strip_suffix("/chat/completions")
        .or_else(|| api_base.strip_suffix("/completions"))
        .or_else(|| api_base.strip_suffix("/responses"))
        .unwrap_or(api_base);

    if trimmed.ends_with("/models") {
        trimmed.to_string()
    } else {
        format!("{}/models", trimmed.trim_end_matches('/'))
    }
}

/// Fetches and caches the model list for `provider`, merging into whatever
/// is already on disk at `config_dir/all-models.json`.
pub async fn update_all_models(
    http: &reqwest::Client,
    config_dir: &Path,
    provider: &str,
    entry: &ProviderEntry,
    api_key: &str,
) -> Result<Vec<String>> {
    let url = models_url(&entry.api_base);

    let response = http
        .get(&url)
        .bearer_auth(api_key)
        .timeout(Duration::from_secs(CATALOG_FETCH_TIMEOUT_SECS))
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url}"))?;

    let body: Value = response.json().await.context("parsing /models response")?;
    let models = extract_model_ids(&body);

    let cache_path = config_dir.join(ALL_MODELS_CACHE_FILENAME);
    let mut cache = load_cache(&cache_path).unwrap_or_default();
    cache.providers.insert(
        provider.to_string(),
        ProviderModels {
            fetched_at: chrono::Utc::now().to_rfc3339(),
            source: url,
            models: models.clone(),
        },
    );
    save_cache(&cache_path, &cache)?;

    Ok(models)
}

/// Accepts either `{data:[{id}...]}` or a bare array of strings/`{id}`
/// objects (§4.11).
fn extract_model_ids(body: &Value) -> Vec<String> {
    let array = body.get("data").and_then(Value::as_array).or_else(|| body.as_array());

    let Some(array) = array else {
        return Vec::new();
    };

    array
        .iter()
        .filter_map(|entry| {
            entry
                .as_str()
                .map(str::to_string)
                .or_else(|| entry.get("id").and_then(Value::as_str).map(str::to_string))
        })
        .collect()
}

pub fn load_cache(path: &Path) -> Result<AllModelsCache> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn save_cache(path: &Path, cache: &AllModelsCache) -> Result<()> {
    let text = serde_json::to_string_pretty(cache)?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_models_url_from_chat_completions() {
        assert_eq!(models_url("https://api.example.com/v1/chat/completions"), "https://api.example.com/v1/models");
    }

    #[test]
    fn derives_models_url_from_bare_base() {
        assert_eq!(models_url("https://api.example.com/v1"), "https://api.example.com/v1/models");
    }

    #[test]
    fn leaves_models_url_untouched_if_already_models() {
        assert_eq!(models_url("https://api.example.com/v1/models"), "https://api.example.com/v1/models");
    }

    #[test]
    fn extracts_ids_from_data_wrapper() {
        let body = serde_json::json!({"data": [{"id": "gpt-4o"}, {"id": "gpt-4o-mini"}]});
        assert_eq!(extract_model_ids(&body), vec!["gpt-4o", "gpt-4o-mini"]);
    }

    #[test]
    fn extracts_ids_from_bare_string_array() {
        let body = serde_json::json!(["a", "b"]);
        assert_eq!(extract_model_ids(&body), vec!["a", "b"]);
    }
}
