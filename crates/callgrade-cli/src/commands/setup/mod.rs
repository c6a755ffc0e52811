//! Setup wizard
//!
//! # Flow
//!
//! 1. Keep or replace keys already in the settings file
//! 2. Enter keys one by one; malformed keys are rejected at the prompt
//! 3. Pick the language calls are held in
//! 4. Confirm the candidate model list
//! 5. Save to settings

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input, Password, Select, theme::ColorfulTheme};

use callgrade_core::{MAX_CREDENTIALS, Secret, Settings};

const API_KEY_URL: &str = "https://aistudio.google.com/app/apikey";
const KEY_PREFIX: &str = "AIza";
const MIN_KEY_LEN: usize = 30;

/// Languages offered in the picker; anything else is typed in.
const LANGUAGES: &[&str] = &["English", "Vietnamese"];
const OTHER_LANGUAGE: &str = "Other...";

pub fn run() -> Result<()> {
    let theme = ColorfulTheme::default();
    println!();
    println!("{}", style("callgrade setup").bold().cyan());
    println!();

    let mut settings = Settings::load()?;
    setup_keys(&theme, &mut settings)?;
    settings.language = select_language(&theme, &settings.language)?;
    if let Some(models) = prompt_models(&theme, &settings.models)? {
        settings.models = models;
    }

    settings.save()?;

    println!();
    println!(
        "{} Saved {} key(s) to {}",
        style("✓").green().bold(),
        settings.api_keys.len(),
        Settings::path().display()
    );
    println!("Run 'callgrade check-keys' to verify them.");
    Ok(())
}

fn setup_keys(theme: &ColorfulTheme, settings: &mut Settings) -> Result<()> {
    if !settings.api_keys.is_empty() {
        println!("Configured keys: {}", masked_keys(&settings.api_keys));
        let keep = Confirm::with_theme(theme)
            .with_prompt("Keep these keys?")
            .default(true)
            .interact()?;
        if !keep {
            settings.api_keys.clear();
        }
    }

    println!("Get Gemini API keys from:");
    println!("  {API_KEY_URL}");
    println!();

    while settings.api_keys.len() < MAX_CREDENTIALS {
        if !settings.api_keys.is_empty() {
            let more = Confirm::with_theme(theme)
                .with_prompt(format!(
                    "Add another key? ({}/{})",
                    settings.api_keys.len(),
                    MAX_CREDENTIALS
                ))
                .default(false)
                .interact()?;
            if !more {
                break;
            }
        }

        let key = prompt_key(theme, settings.api_keys.len() + 1)?;
        if !settings.add_api_key(&key) {
            eprintln!("{} That key is already configured", style("✗").red().bold());
        }
    }
    Ok(())
}

/// Hidden prompt that only returns a well-formed, trimmed key.
fn prompt_key(theme: &ColorfulTheme, ordinal: usize) -> Result<String> {
    let key = Password::with_theme(theme)
        .with_prompt(format!("Gemini API key #{ordinal}"))
        .validate_with(|input: &String| validate_key_format(input))
        .interact()?;
    Ok(key.trim().to_string())
}

fn validate_key_format(key: &str) -> Result<(), String> {
    let key = key.trim();
    if !key.starts_with(KEY_PREFIX) {
        return Err(format!(
            "Invalid Gemini key format. Keys start with '{KEY_PREFIX}'"
        ));
    }
    if key.len() < MIN_KEY_LEN {
        return Err("API key seems too short".to_string());
    }
    Ok(())
}

fn masked_keys(keys: &[String]) -> String {
    keys.iter()
        .map(|k| Secret::new(k.as_str()).masked())
        .collect::<Vec<_>>()
        .join(", ")
}

fn select_language(theme: &ColorfulTheme, current: &str) -> Result<String> {
    let mut items: Vec<&str> = LANGUAGES.to_vec();
    items.push(OTHER_LANGUAGE);
    let default = language_index(current).unwrap_or(LANGUAGES.len());

    let choice = Select::with_theme(theme)
        .with_prompt("Which language are the calls in?")
        .items(&items)
        .default(default)
        .interact()?;

    if choice < LANGUAGES.len() {
        return Ok(LANGUAGES[choice].to_string());
    }
    let language: String = Input::with_theme(theme)
        .with_prompt("Language")
        .default(current.to_string())
        .validate_with(|input: &String| {
            if input.trim().is_empty() {
                Err("Language cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(language.trim().to_string())
}

fn language_index(language: &str) -> Option<usize> {
    LANGUAGES
        .iter()
        .position(|l| l.eq_ignore_ascii_case(language.trim()))
}

/// `None` keeps the current list.
fn prompt_models(theme: &ColorfulTheme, current: &[String]) -> Result<Option<Vec<String>>> {
    let answer: String = Input::with_theme(theme)
        .with_prompt("Models, in priority order")
        .default(current.join(", "))
        .validate_with(|input: &String| {
            if parse_models(input).is_empty() {
                Err("Enter at least one model name")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let models = parse_models(&answer);
    Ok((models != current).then_some(models))
}

fn parse_models(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_format() {
        assert!(validate_key_format("AIzaSyA1234567890abcdefghijklmnopqrs").is_ok());
        assert!(validate_key_format("  AIzaSyA1234567890abcdefghijklmnopqrs\n").is_ok());
        assert!(
            validate_key_format("sk-1234567890abcdefghijklmnopqrstuv")
                .unwrap_err()
                .contains("AIza")
        );
        assert_eq!(
            validate_key_format("AIzaShort").unwrap_err(),
            "API key seems too short"
        );
    }

    #[test]
    fn test_masked_keys() {
        let keys = vec![
            "AIzaSyA1234567890abcdefghijklmWXYZ".to_string(),
            "AIzaSyB1234567890abcdefghijklm1234".to_string(),
        ];
        let masked = masked_keys(&keys);
        assert!(masked.contains("WXYZ"));
        assert!(masked.contains("1234"));
        assert!(!masked.contains("AIzaSyA"));
    }

    #[test]
    fn test_language_index() {
        assert_eq!(language_index("vietnamese"), Some(1));
        assert_eq!(language_index(" English "), Some(0));
        assert_eq!(language_index("Thai"), None);
    }

    #[test]
    fn test_parse_models() {
        assert_eq!(
            parse_models("gemini-2.5-flash, ,gemini-2.0-flash,"),
            ["gemini-2.5-flash", "gemini-2.0-flash"]
        );
        assert!(parse_models(" , ").is_empty());
    }
}
