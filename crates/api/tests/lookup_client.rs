use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use shelfscan_api::{LookupConfig, LookupError, OpenFoodFactsClient, ProductLookup, TransportError};
use shelfscan_types::{NutriScore, UNKNOWN_PRODUCT_NAME};

async fn product_route(Path(file): Path<String>, Query(query): Query<HashMap<String, String>>) -> Response {
    match file.as_str() {
        "3017620422003.json" => Json(json!({
            "status": 1,
            "product": {
                "product_name": "Nutella",
                "brands": "Ferrero,Nutella",
                "quantity": "400 g",
                "nutriscore_grade": "e",
                "allergens_tags": ["en:milk", "en:nuts", "en:soy-beans"],
                "image_front_url": "https://images.example/nutella.jpg",
                "nutrient_levels": {"fat": "high", "salt": "low"},
                "lang": "en"
            }
        }))
        .into_response(),
        "0000000000000.json" => Json(json!({"status": 0, "status_verbose": "product not found"})).into_response(),
        "4040404040404.json" => (StatusCode::NOT_FOUND, "no such page").into_response(),
        "5005005005005.json" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        "11111111.json" => Json(json!({
            "status": 1,
            "product": {"product_name": query.get("fields").cloned().unwrap_or_else(|| "<none>".into())}
        }))
        .into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "unexpected").into_response(),
    }
}

async fn spawn_stub() -> String {
    let router = Router::new().route("/api/v2/product/{file}", get(product_route));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let address = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{address}")
}

async fn client() -> OpenFoodFactsClient {
    let base = spawn_stub().await;
    OpenFoodFactsClient::new(LookupConfig::default().with_base_url(base)).expect("client")
}

#[tokio::test]
async fn found_product_is_normalized() {
    let product = client().await.lookup("3017620422003").await.expect("lookup");

    assert_eq!(product.ean(), "3017620422003");
    assert_eq!(product.full_name(), "Ferrero • Nutella • 400 g");
    assert_eq!(product.brand.as_deref(), Some("Ferrero"));
    assert_eq!(product.nutri_score, Some(NutriScore::E));
    assert_eq!(
        product.allergens,
        Some(vec!["milk".to_string(), "nuts".to_string(), "soy beans".to_string()])
    );
    assert_eq!(product.image_url.as_deref(), Some("https://images.example/nutella.jpg"));
    assert_eq!(product.nutrient_levels.as_ref().map(|levels| levels.len()), Some(2));
}

#[tokio::test]
async fn unknown_product_is_not_an_error() {
    let product = client().await.lookup("0000000000000").await.expect("lookup");
    assert_eq!(product.full_name(), UNKNOWN_PRODUCT_NAME);
    assert_eq!(product.ean(), "0000000000000");
    assert!(product.is_unknown());
}

#[tokio::test]
async fn non_success_status_is_an_http_error() {
    let error = client().await.lookup("4040404040404").await.unwrap_err();
    assert!(matches!(error, LookupError::Http { status: 404 }), "got {error:?}");
    assert!(error.is_retrievable());
}

#[tokio::test]
async fn malformed_body_is_a_transport_error() {
    let error = client().await.lookup("5005005005005").await.unwrap_err();
    match error {
        LookupError::Transport(TransportError::Parse(parse)) => {
            assert!(parse.body_preview().contains("maintenance"));
        }
        other => panic!("expected parse failure, got {other:?}"),
    }
}

#[tokio::test]
async fn field_selection_is_sent_as_query() {
    let product = client().await.lookup("11111111").await.expect("lookup");
    assert!(product.full_name().starts_with("product_name,generic_name,brands"), "{}", product.full_name());
    assert!(product.full_name().ends_with("nutrient_levels,lang"));
}

#[tokio::test]
async fn full_payload_mode_omits_field_selection() {
    let base = spawn_stub().await;
    let client = OpenFoodFactsClient::new(LookupConfig::default().with_base_url(base).with_full_payload()).expect("client");
    let product = client.lookup("11111111").await.expect("lookup");
    assert_eq!(product.full_name(), "<none>");
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let client = OpenFoodFactsClient::new(LookupConfig::default().with_base_url("http://127.0.0.1:1")).expect("client");
    let error = client.lookup("96385074").await.unwrap_err();
    assert!(matches!(error, LookupError::Transport(TransportError::Network(_))), "got {error:?}");
    assert!(!error.is_retrievable());
}
