use super::*;
use std::io::Write;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.get_max_results(), DEFAULT_MAX_RESULTS);
    assert_eq!(config.get_min_fuzzy_score(), DEFAULT_MIN_FUZZY_SCORE);
    assert_eq!(config.get_async_rank_threshold(), DEFAULT_ASYNC_RANK_THRESHOLD);
    assert_eq!(config.get_aliases_json(), "[]");
    assert!(config.get_features().is_enabled(Feature::Weather));
}

#[test]
fn test_default_weights() {
    let weights = Config::default().get_weights();
    assert_eq!(weights.window, 30.0);
    assert_eq!(weights.app, 20.0);
    assert_eq!(weights.recent, 10.0);
    assert_eq!(weights.utility, 0.0);
    assert_eq!(ACTION_WEIGHT, 25.0);
}

#[test]
fn test_partial_weights_fill_defaults() {
    let config = parse_config(r#"{"weights": {"app": 45}}"#);
    let weights = config.get_weights();
    assert_eq!(weights.app, 45.0);
    assert_eq!(weights.window, 30.0);
}

#[test]
fn test_max_results_is_clamped_to_one() {
    let config = parse_config(r#"{"maxResults": 0}"#);
    assert_eq!(config.get_max_results(), 1);
}

#[test]
fn test_camel_case_fields() {
    let config = parse_config(
        r#"{
            "minFuzzyScore": 12.5,
            "asyncRankThreshold": 50,
            "weather": {"ttlMinutes": 3},
            "currency": {"rateTtlHours": 1},
            "webSearch": {"maxActions": 1, "enabled": false},
            "features": {"webSearch": false, "emoji": false}
        }"#,
    );
    assert_eq!(config.get_min_fuzzy_score(), 12.5);
    assert_eq!(config.get_async_rank_threshold(), 50);
    assert_eq!(config.get_weather().ttl_minutes, 3);
    assert_eq!(config.get_weather().timeout_ms, DEFAULT_WEATHER_TIMEOUT_MS);
    assert_eq!(config.get_currency().rate_ttl_hours, 1);
    let web = config.get_web_search();
    assert_eq!(web.max_actions, 1);
    assert!(!web.enabled);
    let features = config.get_features();
    assert!(!features.is_enabled(Feature::WebSearch));
    assert!(!features.is_enabled(Feature::Emoji));
    assert!(features.is_enabled(Feature::Apps));
}

#[test]
fn test_malformed_json_falls_back_to_defaults() {
    assert_eq!(parse_config("{not json"), Config::default());
    assert_eq!(parse_config("[1, 2]"), Config::default());
    assert_eq!(parse_config(""), Config::default());
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.json"));
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, r#"{{"maxResults": 4, "aliasesJson": "[]"}}"#).unwrap();

    let config = load_config_from(&path);
    assert_eq!(config.get_max_results(), 4);
}

#[test]
fn test_learning_store_path_expands_tilde() {
    let config = parse_config(r#"{"learningStorePath": "~/hop/learning.json"}"#);
    let path = config.get_learning_store_path();
    assert!(!path.to_string_lossy().starts_with('~'));
    assert!(path.ends_with("hop/learning.json"));
}

#[test]
fn test_feature_keys_are_unique() {
    let keys: std::collections::HashSet<_> = Feature::ALL.iter().map(|f| f.key()).collect();
    assert_eq!(keys.len(), Feature::ALL.len());
}

#[test]
fn test_config_serialization_skips_unset() {
    let config = Config {
        max_results: Some(7),
        ..Default::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(json, r#"{"maxResults":7}"#);
    let back: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}
