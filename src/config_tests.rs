use crate::config::Config;
use std::env;
use std::sync::Mutex;
use std::sync::OnceLock;

// Global lock to prevent race conditions when modifying environment variables in tests
static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn get_env_lock() -> &'static Mutex<()> {
    ENV_LOCK.get_or_init(|| Mutex::new(()))
}

const KEYS: &[&str] = &[
    "API_HOST",
    "API_PORT",
    "MODEL_DIR",
    "MODEL_FILE",
    "FEATURE_NAMES_FILE",
    "CONFIDENCE_RELATIVE_WIDTH",
    "MAX_BATCH_SIZE",
    "MAX_SQFT",
    "MIN_YEAR_BUILT",
    "METRICS_ENABLED",
];

fn clear_env() {
    for key in KEYS {
        // SAFETY: callers hold ENV_LOCK.
        unsafe { env::remove_var(key) };
    }
}

fn set(key: &str, value: &str) {
    // SAFETY: callers hold ENV_LOCK.
    unsafe { env::set_var(key, value) };
}

#[test]
fn test_config_defaults() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();

    let config = Config::from_env().unwrap();

    assert_eq!(config.server.bind_address(), "0.0.0.0:8000");
    assert_eq!(config.model.model_dir.to_str(), Some("models/trained"));
    assert_eq!(config.model.artifact_keys().model, "model_pipeline.json");
    assert!(config.observability.metrics_enabled);

    let policy = config.to_prediction_policy().unwrap();
    assert_eq!(policy.max_batch_size, 100);
    assert!((policy.confidence_relative_width - 0.10).abs() < 1e-12);
    assert_eq!(policy.limits.min_year_built, 1800);
}

#[test]
fn test_config_overrides() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();
    set("API_PORT", "9001");
    set("MODEL_DIR", "/srv/models");
    set("MODEL_FILE", "pipeline_v2.json");
    set("CONFIDENCE_RELATIVE_WIDTH", "0.2");
    set("MAX_BATCH_SIZE", "10");
    set("METRICS_ENABLED", "false");

    let config = Config::from_env().unwrap();

    assert_eq!(config.server.port, 9001);
    assert_eq!(config.model.artifact_keys().model, "pipeline_v2.json");
    assert_eq!(config.model.artifact_keys().feature_names, "feature_names.json");
    assert!(!config.observability.metrics_enabled);

    let policy = config.to_prediction_policy().unwrap();
    assert_eq!(policy.max_batch_size, 10);
    assert!((policy.confidence_relative_width - 0.2).abs() < 1e-12);

    clear_env();
}

#[test]
fn test_config_rejects_unparseable_values() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();
    set("API_PORT", "eighty");
    assert!(Config::from_env().is_err());

    clear_env();
    set("MAX_SQFT", "lots");
    assert!(Config::from_env().is_err());

    clear_env();
}

#[test]
fn test_invalid_policy_rejected() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();
    set("CONFIDENCE_RELATIVE_WIDTH", "1.5");

    let config = Config::from_env().unwrap();
    let err = config.to_prediction_policy().unwrap_err();
    assert!(err.to_string().contains("Invalid prediction config"));

    clear_env();
    set("MAX_BATCH_SIZE", "0");
    assert!(Config::from_env().unwrap().to_prediction_policy().is_err());

    clear_env();
}
