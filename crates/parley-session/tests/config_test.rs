//! Configuration loading from file, environment and defaults.

use std::io::Write;
use std::sync::Mutex;

use parley_session::{load_config, SessionConfig};
use parley_types::Language;

// load_config reads process-wide environment variables.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for var in [
        "PARLEY_DIRECTION",
        "PARLEY_OPENROUTER_API_KEY",
        "PARLEY_MODEL",
        "PARLEY_SILENCE_RESET_MS",
    ] {
        std::env::remove_var(var);
    }
}

#[test]
fn defaults_without_a_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let config = load_config(None).unwrap();
    assert_eq!(config.direction.source, Language::Ru);
    assert_eq!(config.direction.target, Language::En);
    assert_eq!(config.stability_window, 2);
    assert_eq!(config.stability_guard_tokens, 0);
    assert_eq!(config.min_words_before_dispatch, 2);
    assert_eq!(config.silence_reset_ms, 1500);
    assert_eq!(config.translator.base_url, "https://openrouter.ai/api/v1");
    assert_eq!(config.translator.model, "google/gemini-2.0-flash-001");
    assert_eq!(config.translator.timeout_ms, 10_000);
    assert_eq!(config.translator.max_tokens, 200);
    assert!((config.translator.temperature - 0.3).abs() < f32::EPSILON);
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let config = load_config(Some("/nonexistent/parley.toml")).unwrap();
    assert_eq!(config.silence_reset_ms, 1500);
}

#[test]
fn toml_file_overrides_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
direction = "en-ru"
silence_reset_ms = 2500
stability_guard_tokens = 1

[translator]
model = "openai/gpt-4o-mini"
api_key = "sk-test"
temperature = 0.5
"#
    )
    .unwrap();

    let config = load_config(Some(file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.direction.source, Language::En);
    assert_eq!(config.direction.target, Language::Ru);
    assert_eq!(config.silence_reset_ms, 2500);
    assert_eq!(config.stability_guard_tokens, 1);
    assert_eq!(config.translator.model, "openai/gpt-4o-mini");
    assert_eq!(config.translator.api_key, "sk-test");
    // Unset fields keep their defaults.
    assert_eq!(config.min_words_before_dispatch, 2);
    assert_eq!(config.translator.max_tokens, 200);
}

#[test]
fn malformed_toml_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "direction = [not toml").unwrap();
    assert!(load_config(Some(file.path().to_str().unwrap())).is_err());
}

#[test]
fn environment_overrides_file_and_defaults() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PARLEY_DIRECTION", "en-ru");
    std::env::set_var("PARLEY_OPENROUTER_API_KEY", "sk-env");
    std::env::set_var("PARLEY_MODEL", "anthropic/claude-3-5-haiku");
    std::env::set_var("PARLEY_SILENCE_RESET_MS", "900");

    let config = load_config(None).unwrap();
    assert_eq!(config.direction.source, Language::En);
    assert_eq!(config.translator.api_key, "sk-env");
    assert_eq!(config.translator.model, "anthropic/claude-3-5-haiku");
    assert_eq!(config.silence_reset_ms, 900);

    clear_env();
}

#[test]
fn api_key_is_redacted_in_debug_output() {
    let mut config = SessionConfig::default();
    config.translator.api_key = "sk-secret".to_string();
    let rendered = format!("{:?}", config.translator);
    assert!(rendered.contains("[REDACTED]"));
    assert!(!rendered.contains("sk-secret"));
}
