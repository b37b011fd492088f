//! A customer orders on the storefront and staff fulfil it in the admin console.

#![allow(clippy::unwrap_used)]

use chocolatier_core::{OrderId, OrderStatus};
use chocolatier_integration_tests::{ADMIN_EMAIL, ADMIN_PASSWORD, TestContext, client, location};
use reqwest::StatusCode;

async fn register(ctx: &TestContext, customer: &reqwest::Client, email: &str, next: &str) {
    let response = customer
        .post(ctx.storefront("/auth/register"))
        .form(&[
            ("email", email),
            ("password", "cocoa-nibs-42"),
            ("password_confirm", "cocoa-nibs-42"),
            ("full_name", "Ada Buyer"),
            ("next", next),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), next);
}

async fn admin_login(ctx: &TestContext, admin: &reqwest::Client) {
    let response = admin
        .post(ctx.admin("/auth/login"))
        .form(&[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_order_status_change_reaches_customer() {
    let ctx = TestContext::start().await;
    let truffles = ctx.product_id("Raspberry Rose Truffles").await;

    // Customer fills a cart, registers and checks out
    let customer = client();
    let response = customer
        .post(ctx.storefront("/cart/add"))
        .form(&[("product_id", truffles.to_string()), ("quantity", "2".to_string())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    register(&ctx, &customer, "ada@example.com", "/checkout").await;

    let response = customer
        .post(ctx.storefront("/checkout"))
        .form(&[
            ("full_name", "Ada Buyer"),
            ("line1", "1 Cocoa Way"),
            ("city", "Portland"),
            ("region", "OR"),
            ("postal_code", "97201"),
            ("country", "US"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let confirmation = location(&response);
    let order_id: i64 = confirmation
        .strip_prefix("/checkout/confirmation/")
        .unwrap()
        .parse()
        .unwrap();

    let order = ctx
        .backend
        .store
        .get_order(OrderId::new(order_id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.email.as_str(), "ada@example.com");
    let number = order.number();

    // Staff see the order and ship it
    let admin = client();
    admin_login(&ctx, &admin).await;

    let body = admin
        .get(ctx.admin("/orders?status=pending"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(&number));
    assert!(body.contains("ada@example.com"));

    let response = admin
        .post(ctx.admin(&format!("/orders/{order_id}/status")))
        .form(&[("status", "shipped")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/orders/{order_id}"));

    let body = admin
        .get(ctx.admin(&format!("/orders/{order_id}")))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(&format!("Order {number} is now Shipped.")));
    assert!(body.contains("1 Cocoa Way"));

    // The customer sees the new status on their order
    let response = customer
        .get(ctx.storefront(&format!("/account/orders/{order_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Shipped"));
    assert!(body.contains(OrderStatus::Shipped.description()));
}

#[tokio::test]
async fn test_customer_cannot_use_admin_console() {
    let ctx = TestContext::start().await;

    let customer = client();
    register(&ctx, &customer, "grace@example.com", "/").await;

    // The storefront session does not carry over to the admin console
    let response = customer.get(ctx.admin("/orders")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");

    // Valid customer credentials are still refused
    let response = customer
        .post(ctx.admin("/auth/login"))
        .form(&[("email", "grace@example.com"), ("password", "cocoa-nibs-42")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
