use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

fn with(pairs: &[(&'static str, &'static str)]) -> HashMap<&'static str, &'static str> {
    pairs.iter().copied().collect()
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("unknown").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "CODEHOUND_ENV"));
}

#[test]
fn build_app_config_defaults() {
    let map = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.browser_mode, BrowserMode::Local);
    assert!(cfg.browser_endpoint.is_none());
    assert!(cfg.browser_token.is_none());
    assert!(cfg.chrome_path.is_none());
    assert!(cfg.headless);
    assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(cfg.cache_ttl_secs, 3600);
    assert_eq!(cfg.adapter_timeout_secs, 20);
    assert_eq!(cfg.selector_timeout_secs, 12);
    assert_eq!(cfg.popup_timeout_secs, 8);
    assert_eq!(cfg.request_deadline_secs, 45);
    assert_eq!(cfg.max_codes, 3);
    assert!(cfg.fallback_enabled);
    assert!(cfg.placeholders_enabled);
    assert_eq!(
        cfg.sources,
        vec![
            SourceId::RetailMeNot,
            SourceId::CouponFollow,
            SourceId::Dealspotr
        ]
    );
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let map = with(&[("CODEHOUND_BIND_ADDR", "not-a-socket-addr")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CODEHOUND_BIND_ADDR"),
        "expected InvalidEnvVar(CODEHOUND_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn remote_mode_requires_endpoint() {
    let map = with(&[("CODEHOUND_BROWSER_MODE", "remote")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "CODEHOUND_BROWSER_ENDPOINT"),
        "expected MissingEnvVar(CODEHOUND_BROWSER_ENDPOINT), got: {result:?}"
    );
}

#[test]
fn remote_mode_without_token_still_loads() {
    // A missing credential surfaces when a session is acquired, not at startup.
    let map = with(&[
        ("CODEHOUND_BROWSER_MODE", "Remote"),
        ("CODEHOUND_BROWSER_ENDPOINT", "wss://browser.example.com"),
    ]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.browser_mode, BrowserMode::Remote);
    assert!(cfg.browser_token.is_none());
}

#[test]
fn browser_token_is_redacted_in_debug() {
    let map = with(&[
        ("CODEHOUND_BROWSER_MODE", "remote"),
        ("CODEHOUND_BROWSER_ENDPOINT", "wss://browser.example.com"),
        ("CODEHOUND_BROWSER_TOKEN", "super-secret"),
    ]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("[redacted]"));
}

#[test]
fn invalid_browser_mode_fails() {
    let map = with(&[("CODEHOUND_BROWSER_MODE", "cloud")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CODEHOUND_BROWSER_MODE"),
        "expected InvalidEnvVar(CODEHOUND_BROWSER_MODE), got: {result:?}"
    );
}

#[test]
fn blank_optional_values_are_treated_as_unset() {
    let map = with(&[("CODEHOUND_CHROME_PATH", "   ")]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.chrome_path.is_none());
}

#[test]
fn cache_ttl_override() {
    let map = with(&[("CODEHOUND_CACHE_TTL_SECS", "120")]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.cache_ttl_secs, 120);
}

#[test]
fn zero_timeout_is_rejected() {
    let map = with(&[("CODEHOUND_ADAPTER_TIMEOUT_SECS", "0")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CODEHOUND_ADAPTER_TIMEOUT_SECS"),
        "expected InvalidEnvVar(CODEHOUND_ADAPTER_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn non_numeric_deadline_is_rejected() {
    let map = with(&[("CODEHOUND_REQUEST_DEADLINE_SECS", "soon")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CODEHOUND_REQUEST_DEADLINE_SECS"),
        "expected InvalidEnvVar(CODEHOUND_REQUEST_DEADLINE_SECS), got: {result:?}"
    );
}

#[test]
fn single_code_deployment() {
    let map = with(&[("CODEHOUND_MAX_CODES", "1")]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.max_codes, 1);
}

#[test]
fn max_codes_out_of_range_is_rejected() {
    for raw in ["0", "4"] {
        let map = with(&[("CODEHOUND_MAX_CODES", raw)]);
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CODEHOUND_MAX_CODES"),
            "expected InvalidEnvVar(CODEHOUND_MAX_CODES) for {raw}, got: {result:?}"
        );
    }
}

#[test]
fn flags_accept_common_spellings() {
    let map = with(&[
        ("CODEHOUND_FALLBACK_ENABLED", "off"),
        ("CODEHOUND_PLACEHOLDERS_ENABLED", "0"),
        ("CODEHOUND_HEADLESS", "No"),
    ]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(!cfg.fallback_enabled);
    assert!(!cfg.placeholders_enabled);
    assert!(!cfg.headless);
}

#[test]
fn invalid_flag_is_rejected() {
    let map = with(&[("CODEHOUND_FALLBACK_ENABLED", "maybe")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CODEHOUND_FALLBACK_ENABLED"),
        "expected InvalidEnvVar(CODEHOUND_FALLBACK_ENABLED), got: {result:?}"
    );
}

#[test]
fn sources_keep_configured_order_and_drop_repeats() {
    let map = with(&[("CODEHOUND_SOURCES", "dealspotr, retailmenot,dealspotr")]);
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.sources, vec![SourceId::Dealspotr, SourceId::RetailMeNot]);
}

#[test]
fn unknown_source_is_rejected() {
    let map = with(&[("CODEHOUND_SOURCES", "retailmenot,groupon")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, ref reason }) if var == "CODEHOUND_SOURCES" && reason.contains("groupon")),
        "expected InvalidEnvVar(CODEHOUND_SOURCES), got: {result:?}"
    );
}

#[test]
fn empty_source_list_is_rejected() {
    let map = with(&[("CODEHOUND_SOURCES", " , ")]);
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "CODEHOUND_SOURCES"));
}
