use super::*;

#[test]
fn reviews_url_carries_paging_and_filter() {
    let url = ReviewClient::reviews_url("https://store.steampowered.com", 578_080, 200, 100)
        .unwrap();
    assert_eq!(
        url,
        "https://store.steampowered.com/appreviews/578080?json=1&num_per_page=100&start_offset=200&filter=recent"
    );
}

#[test]
fn reviews_url_strips_trailing_slash() {
    let url = ReviewClient::reviews_url("http://127.0.0.1:9000/", 10, 0, 1).unwrap();
    assert_eq!(
        url,
        "http://127.0.0.1:9000/appreviews/10?json=1&num_per_page=1&start_offset=0&filter=recent"
    );
}

#[test]
fn reviews_url_rejects_invalid_base() {
    let result = ReviewClient::reviews_url("not-a-url", 10, 0, 1);
    let err = result.unwrap_err();
    assert!(
        matches!(err, FetchError::InvalidBaseUrl { .. }),
        "expected InvalidBaseUrl, got: {err:?}"
    );
}

#[test]
fn from_settings_uses_configured_base_url() {
    let settings = CollectorSettings {
        reviews_base_url: "http://localhost:8080/".to_string(),
        app_id: 42,
        ..CollectorSettings::default()
    };
    let client = ReviewClient::from_settings(&settings).unwrap();
    assert_eq!(client.base_url, "http://localhost:8080");
    assert_eq!(client.app_id(), 42);
}
