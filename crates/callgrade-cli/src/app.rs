use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use callgrade_core::{
    Analyzer, ClientConfig, GeminiBackend, MAX_CREDENTIALS, Payload, ResilientClient, Settings,
};

/// Everything a command needs to talk to the service
pub struct RunConfig {
    pub client: ClientConfig,
    pub language: String,
}

/// Merge environment overrides into `settings`.
///
/// `GEMINI_API_KEY` and `GEMINI_API_KEY_1` .. `GEMINI_API_KEY_20` are
/// appended after keys from the settings file, skipping duplicates.
/// `GEMINI_MODELS` (comma separated) and `CALLGRADE_LANGUAGE` replace the
/// configured values.
pub fn apply_env<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let numbered = (1..=MAX_CREDENTIALS).map(|i| format!("GEMINI_API_KEY_{i}"));
    for var in std::iter::once("GEMINI_API_KEY".to_string()).chain(numbered) {
        if let Some(key) = lookup(&var) {
            settings.add_api_key(&key);
        }
    }

    if let Some(models) = lookup("GEMINI_MODELS") {
        let models: Vec<String> = models
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect();
        if !models.is_empty() {
            settings.models = models;
        }
    }

    if let Some(language) = lookup("CALLGRADE_LANGUAGE") {
        if !language.trim().is_empty() {
            settings.language = language.trim().to_string();
        }
    }
}

/// Load settings, `.env`, and environment into a validated configuration.
///
/// Exits with guidance when no key is configured.
pub fn load_run_config(language: Option<String>) -> Result<RunConfig> {
    let mut settings = Settings::load()?;
    // A missing .env file is normal
    let _ = dotenvy::dotenv();
    apply_env(&mut settings, |var| std::env::var(var).ok());

    if settings.api_keys.is_empty() {
        eprintln!("Error: No Gemini API key configured.");
        eprintln!("\nAdd keys with:");
        eprintln!("  callgrade setup\n");
        eprintln!("Or set GEMINI_API_KEY (or GEMINI_API_KEY_1 .. GEMINI_API_KEY_20).");
        std::process::exit(1);
    }

    let client = settings
        .client_config()
        .with_context(|| format!("Invalid configuration in {}", Settings::path().display()))?;

    tracing::debug!(
        credentials = client.credentials.len(),
        models = client.models.len(),
        "Configuration loaded"
    );

    Ok(RunConfig {
        client,
        language: language.unwrap_or(settings.language),
    })
}

/// Build an analyzer over the Gemini backend.
pub fn build_analyzer(config: &ClientConfig) -> Result<Analyzer> {
    let backend = GeminiBackend::new(&config.endpoint)?;
    Ok(Analyzer::new(ResilientClient::from_config(
        config,
        Arc::new(backend),
    )))
}

/// Read a call recording or transcript.
pub fn load_payload(path: &Path) -> Result<Payload> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("txt") | Some("md") => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read transcript {}", path.display()))?;
            if text.trim().is_empty() {
                anyhow::bail!("Transcript {} is empty", path.display());
            }
            Ok(Payload::Text(text))
        }
        Some(ext) => {
            let Some(mime_type) = Payload::audio_mime_for_extension(ext) else {
                anyhow::bail!(
                    "Unsupported file format: .{}\nSupported: wav, mp3, m4a, aac, ogg, flac, aiff, txt",
                    ext
                );
            };
            let data = std::fs::read(path)
                .with_context(|| format!("Failed to read audio file {}", path.display()))?;
            Ok(Payload::Audio {
                data,
                mime_type: mime_type.to_string(),
            })
        }
        None => anyhow::bail!("File has no extension. Please provide an audio file or a .txt transcript."),
    }
}
