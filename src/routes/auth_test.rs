use super::*;

#[test]
fn hash_token_is_hex_sha256() {
    let digest = hash_token("secret");
    assert_eq!(digest.len(), 64);
    assert_eq!(digest, "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b");
}

#[test]
fn parse_reads_entries() {
    let tokens = AuthTokens::parse("tok-a:Alice@Contoso.com:Alice:Contoso, tok-b:bob@contoso.com:Bob").unwrap();
    assert!(tokens.enabled());

    let alice = tokens.lookup("tok-a").unwrap();
    assert_eq!(alice.email, "alice@contoso.com");
    assert_eq!(alice.company.as_deref(), Some("Contoso"));

    let bob = tokens.lookup("tok-b").unwrap();
    assert_eq!(bob.name, "Bob");
    assert!(bob.company.is_none());

    assert!(tokens.lookup("tok-c").is_none());
}

#[test]
fn parse_rejects_malformed_entries() {
    for raw in ["tok-a", "tok-a:not-an-email:Alice", ":a@b.com:Alice", " , "] {
        let err = AuthTokens::parse(raw).unwrap_err();
        assert!(err.to_string().contains("AUTH_TOKENS"), "{raw}: {err}");
    }
}

#[test]
fn parse_rejects_duplicate_tokens() {
    assert!(AuthTokens::parse("t:a@b.com:A,t:c@d.com:C").is_err());
}

#[test]
fn disabled_table_matches_nothing() {
    let tokens = AuthTokens::disabled();
    assert!(!tokens.enabled());
    assert!(tokens.lookup("anything").is_none());
}

#[test]
fn client_id_is_sanitized() {
    let (mut parts, ()) = axum::http::Request::builder()
        .header(CLIENT_ID_HEADER, "team-42")
        .body(())
        .unwrap()
        .into_parts();
    assert_eq!(client_id(&parts), "team-42");

    parts.headers.insert(CLIENT_ID_HEADER, "bad id!".parse().unwrap());
    assert_eq!(client_id(&parts), ANONYMOUS_CLIENT);

    parts.headers.remove(CLIENT_ID_HEADER);
    assert_eq!(client_id(&parts), ANONYMOUS_CLIENT);
}
