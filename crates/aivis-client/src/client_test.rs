use super::*;

fn test_client(base_url: &str) -> AivisClient {
    AivisClient::with_base_url(base_url, 30, 0, 0).expect("client construction should not fail")
}

#[test]
fn project_url_builds_versioned_path() {
    let client = test_client("https://aivis.example.com");
    let url = client.project_url("7c9e", "progress").expect("url");
    assert_eq!(
        url.as_str(),
        "https://aivis.example.com/api/v1/projects/7c9e/progress"
    );
}

#[test]
fn project_url_keeps_base_path_prefix() {
    let client = test_client("https://aivis.example.com/svc/");
    let url = client.project_url("p1", "ranking").expect("url");
    assert_eq!(
        url.as_str(),
        "https://aivis.example.com/svc/api/v1/projects/p1/ranking"
    );
}

#[test]
fn project_url_escapes_the_id_segment() {
    let client = test_client("https://aivis.example.com");
    let url = client.project_url("a/b?c", "progress").expect("url");
    assert_eq!(
        url.as_str(),
        "https://aivis.example.com/api/v1/projects/a%2Fb%3Fc/progress"
    );
}

#[test]
fn non_http_base_url_is_rejected() {
    let result = AivisClient::with_base_url("ftp://aivis.example.com", 30, 0, 0);
    assert!(matches!(result, Err(ClientError::InvalidBaseUrl(_))));
}

#[test]
fn error_message_reads_ranking_envelope() {
    let text = r#"{"data":null,"error":"not_ready: 1 of 2 prompts processed"}"#;
    assert_eq!(error_message(text), "not_ready: 1 of 2 prompts processed");
}

#[test]
fn error_message_reads_standard_envelope() {
    let text = r#"{"error":{"code":"not_found","message":"project not found"},"meta":{}}"#;
    assert_eq!(error_message(text), "not_found: project not found");
}

#[test]
fn error_message_falls_back_to_raw_text() {
    assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
}
