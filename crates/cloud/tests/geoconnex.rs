//! Point → HUC lookups against a mock Geoconnex API.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use streamviz_cloud::{CloudError, GeoconnexClient, GeoconnexOptions};
use streamviz_core::HucLevel;

fn client(server: &MockServer, retries: u32) -> GeoconnexClient {
    GeoconnexClient::new(GeoconnexOptions {
        base_url: format!("{}/collections", server.uri()),
        retries,
        request_timeout: Duration::from_secs(5),
        max_retries: 0,
        ..GeoconnexOptions::default()
    })
    .expect("client")
}

fn items(codes: &[&str]) -> ResponseTemplate {
    let features: Vec<_> = codes
        .iter()
        .map(|c| json!({ "type": "Feature", "properties": { "huc12": c, "name": "x" } }))
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({
        "type": "FeatureCollection",
        "numberReturned": codes.len(),
        "features": features
    }))
}

#[tokio::test]
async fn widens_bbox_until_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/hu12/items"))
        .and(query_param("f", "json"))
        .respond_with(items(&[]))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/hu12/items"))
        .respond_with(items(&["020700010101"]))
        .expect(1)
        .mount(&server)
        .await;

    let code = client(&server, 5)
        .huc_for_point(39.0, -77.5, HucLevel::Huc12)
        .await
        .unwrap();
    assert_eq!(code.as_str(), "020700010101");
}

#[tokio::test]
async fn gives_up_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/hu12/items"))
        .respond_with(items(&[]))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server, 2)
        .huc_for_point(0.0, 0.0, HucLevel::Huc12)
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn several_units_are_ambiguous() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/hu12/items"))
        .respond_with(items(&["020700010101", "020700010102"]))
        .mount(&server)
        .await;

    let err = client(&server, 5)
        .huc_for_point(39.0, -77.5, HucLevel::Huc12)
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Ambiguous { returned: 2 }), "got {err:?}");
}

#[tokio::test]
async fn hierarchy_derives_coarser_levels() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/hu12/items"))
        .respond_with(items(&["020700010101"]))
        .mount(&server)
        .await;

    let codes: Vec<String> = client(&server, 0)
        .huc_hierarchy(39.0, -77.5)
        .await
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(
        codes,
        vec!["02", "0207", "020700", "02070001", "0207000101", "020700010101"]
    );
}
