use std::collections::HashMap;

use secrecy::ExposeSecret;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn config_requires_tenant_client_and_secret() {
    assert!(GraphConfig::from_lookup(lookup(&[("GRAPH_TENANT_ID", "t"), ("GRAPH_CLIENT_ID", "c")])).is_none());
    assert!(GraphConfig::from_lookup(lookup(&[])).is_none());
}

#[test]
fn config_applies_defaults() {
    let config = GraphConfig::from_lookup(lookup(&[
        ("GRAPH_TENANT_ID", "tenant"),
        ("GRAPH_CLIENT_ID", "client"),
        ("GRAPH_CLIENT_SECRET", "secret"),
        ("SHAREPOINT_SITE_ID", "site"),
    ]))
    .unwrap();
    assert_eq!(config.client_secret.expose_secret(), "secret");
    assert_eq!(config.api_base, DEFAULT_API_BASE);
    assert_eq!(config.scope, DEFAULT_SCOPE);
    assert_eq!(config.site_id.as_deref(), Some("site"));
    assert!(config.drive_id.is_none());
    assert_eq!(config.token_url(), "https://login.microsoftonline.com/tenant/oauth2/v2.0/token");
}

#[test]
fn drive_target_prefers_request_values() {
    let target = DriveTarget::resolve(Some("s2"), None, Some("s1"), Some("d1")).unwrap();
    assert_eq!(target, DriveTarget { site_id: "s2".into(), drive_id: "d1".into() });
}

#[test]
fn drive_target_ignores_blank_overrides() {
    let target = DriveTarget::resolve(Some("  "), Some(""), Some("s1"), Some("d1")).unwrap();
    assert_eq!(target.site_id, "s1");
    assert_eq!(target.drive_id, "d1");
}

#[test]
fn drive_target_missing_drive_is_not_configured() {
    let err = DriveTarget::resolve(Some("s"), None, None, None).unwrap_err();
    assert!(matches!(err, GraphError::NotConfigured(_)));
    assert_eq!(err.error_code(), "E_GRAPH_NOT_CONFIGURED");
}

#[test]
fn throttling_and_server_errors_are_retryable() {
    assert!(GraphError::Response { status: 429, message: String::new() }.retryable());
    assert!(GraphError::Response { status: 503, message: String::new() }.retryable());
    assert!(!GraphError::Response { status: 403, message: String::new() }.retryable());
    assert!(!GraphError::Auth("bad secret".into()).retryable());
    assert!(GraphError::Response { status: 504, message: String::new() }.is_timeout());
}
