//! Integration tests for the storefront: menu, cart and checkout.
//!
//! Run with: cargo test -p farmhouse-integration-tests

use farmhouse_integration_tests::{SAMPLE_PRODUCT, TestContext};
use reqwest::StatusCode;
use serde_json::Value;

/// Pickup far enough ahead to always be later than today.
const PICKUP_DATE: &str = "2099-12-31";

async fn add_dozen(ctx: &TestContext, client: &reqwest::Client, quantity: &str) -> reqwest::Response {
    client
        .post(ctx.storefront("/cart/add"))
        .form(&[
            ("product_id", SAMPLE_PRODUCT),
            ("size_index", "1"),
            ("quantity", quantity),
        ])
        .send()
        .await
        .expect("Failed to add to cart")
}

async fn cart_count(ctx: &TestContext, client: &reqwest::Client) -> String {
    client
        .get(ctx.storefront("/cart/count"))
        .send()
        .await
        .expect("Failed to get cart count")
        .text()
        .await
        .expect("Failed to read response")
        .trim()
        .to_string()
}

// ============================================================================
// Health & Menu
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let ctx = TestContext::new().await;
    let client = TestContext::client();

    let resp = client.get(ctx.storefront("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client.get(ctx.storefront("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_menu_lists_catalog() {
    let ctx = TestContext::new().await;
    let client = TestContext::client();

    let resp = client.get(ctx.storefront("/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Chocolate Chip Cookies"));

    let catalog: Value = client
        .get(ctx.storefront("/api/catalog"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(catalog["products"][0]["id"], SAMPLE_PRODUCT);
}

// ============================================================================
// Cart Tests
// ============================================================================

#[tokio::test]
async fn test_add_to_cart_merges_lines() {
    let ctx = TestContext::new().await;
    let client = TestContext::client();

    let resp = add_dozen(&ctx, &client, "2").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let trigger = resp.headers().get("hx-trigger").unwrap().to_str().unwrap();
    assert!(trigger.contains("cart-updated"));

    add_dozen(&ctx, &client, "1").await;
    assert_eq!(cart_count(&ctx, &client).await, "3");

    let panel = client
        .get(ctx.storefront("/cart"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(panel.contains("Chocolate Chip Cookies"));
    assert!(panel.contains("$60.00"));
}

#[tokio::test]
async fn test_carts_are_per_session() {
    let ctx = TestContext::new().await;
    let alice = TestContext::client();
    let bob = TestContext::client();

    add_dozen(&ctx, &alice, "1").await;
    assert_eq!(cart_count(&ctx, &alice).await, "1");
    assert_eq!(cart_count(&ctx, &bob).await, "0");
}

#[tokio::test]
async fn test_invalid_quantity_rejected() {
    let ctx = TestContext::new().await;
    let client = TestContext::client();

    let resp = add_dozen(&ctx, &client, "1.5").await;
    assert!(resp.status().is_client_error());
    assert_eq!(cart_count(&ctx, &client).await, "0");
}

#[tokio::test]
async fn test_remove_then_undo() {
    let ctx = TestContext::new().await;
    let client = TestContext::client();
    add_dozen(&ctx, &client, "2").await;

    let resp = client
        .post(ctx.storefront("/cart/remove"))
        .form(&[("index", "0")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(cart_count(&ctx, &client).await, "0");

    let resp = client.post(ctx.storefront("/cart/undo")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(cart_count(&ctx, &client).await, "2");
}

#[tokio::test]
async fn test_clear_requires_confirmation() {
    let ctx = TestContext::new().await;
    let client = TestContext::client();
    add_dozen(&ctx, &client, "1").await;

    let resp = client
        .post(ctx.storefront("/cart/clear"))
        .form(&[("confirm", "no")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(cart_count(&ctx, &client).await, "1");

    let resp = client
        .post(ctx.storefront("/cart/clear"))
        .form(&[("confirm", "true")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(cart_count(&ctx, &client).await, "0");
}

// ============================================================================
// Checkout Tests
// ============================================================================

#[tokio::test]
async fn test_shipping_quote_fragment() {
    let ctx = TestContext::new().await;
    let client = TestContext::client();
    add_dozen(&ctx, &client, "1").await;

    let resp = client
        .post(ctx.storefront("/order/shipping"))
        .form(&[("zip", "83201"), ("state", "ID")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("$8.00"));

    let resp = client
        .post(ctx.storefront("/order/shipping"))
        .form(&[("zip", "99501"), ("state", "AK")])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn test_place_pickup_order_empties_cart() {
    let ctx = TestContext::new().await;
    let client = TestContext::client();
    add_dozen(&ctx, &client, "1").await;

    let resp = client
        .post(ctx.storefront("/order"))
        .form(&[
            ("name", "Dana"),
            ("email", "dana@example.com"),
            ("fulfillment", "pickup"),
            ("pickup_date", PICKUP_DATE),
            ("payment_method", "venmo"),
            ("plan", "deposit"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Thank you, Dana!"));
    assert!(body.contains("$10.00"));

    assert_eq!(cart_count(&ctx, &client).await, "0");
}

#[tokio::test]
async fn test_invalid_order_keeps_cart_and_input() {
    let ctx = TestContext::new().await;
    let client = TestContext::client();
    add_dozen(&ctx, &client, "1").await;

    let resp = client
        .post(ctx.storefront("/order"))
        .form(&[
            ("name", "Dana"),
            ("email", "not-an-email"),
            ("fulfillment", "shipping"),
            ("payment_method", "cash"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Dana"));
    assert!(body.contains("Cash is only accepted for pickup orders."));

    assert_eq!(cart_count(&ctx, &client).await, "1");
}

#[tokio::test]
async fn test_empty_cart_cannot_be_ordered() {
    let ctx = TestContext::new().await;
    let client = TestContext::client();

    let resp = client
        .post(ctx.storefront("/order"))
        .form(&[
            ("name", "Dana"),
            ("email", "dana@example.com"),
            ("fulfillment", "pickup"),
            ("pickup_date", PICKUP_DATE),
            ("payment_method", "zelle"),
        ])
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}
