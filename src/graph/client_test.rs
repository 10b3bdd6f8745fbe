use super::*;

#[test]
fn upload_path_without_folder() {
    assert_eq!(upload_path("d1", "", "report.md"), "drives/d1/root:/report.md:/content");
    assert_eq!(upload_path("d1", "/", "report.md"), "drives/d1/root:/report.md:/content");
}

#[test]
fn upload_path_trims_folder_slashes() {
    assert_eq!(upload_path("d1", "/Reports/2024/", "q3.md"), "drives/d1/root:/Reports/2024/q3.md:/content");
}

#[test]
fn message_payload_is_html_with_optional_subject() {
    let payload = message_payload("<p>hi</p>", Some("Weekly update"));
    assert_eq!(payload["body"]["contentType"], "html");
    assert_eq!(payload["body"]["content"], "<p>hi</p>");
    assert_eq!(payload["subject"], "Weekly update");

    let payload = message_payload("<p>hi</p>", Some("  "));
    assert!(payload.get("subject").is_none());
}

#[test]
fn token_response_defaults_lifetime() {
    let token = parse_token_response(r#"{"access_token":"abc","token_type":"Bearer"}"#).unwrap();
    assert_eq!(token.access_token, "abc");
    assert_eq!(token.expires_in, 3600);
}

#[test]
fn token_response_without_token_is_auth_error() {
    assert!(matches!(parse_token_response(r#"{"error":"invalid_client"}"#), Err(GraphError::Auth(_))));
}

#[test]
fn error_message_reads_graph_and_entra_shapes() {
    assert_eq!(
        error_message(r#"{"error":{"code":"itemNotFound","message":"The resource could not be found."}}"#).as_deref(),
        Some("The resource could not be found.")
    );
    assert_eq!(
        error_message(r#"{"error":"invalid_client","error_description":"AADSTS7000215: bad secret"}"#).as_deref(),
        Some("AADSTS7000215: bad secret")
    );
    assert!(error_message("not json").is_none());
}
