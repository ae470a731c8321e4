/// Integration tests for the BookHaven API
///
/// The first group drives the full router over a pool that never connects:
/// anything rejected by authentication, authorization or validation never
/// reaches the database.
///
/// Tests marked `#[ignore]` need a migrated PostgreSQL database named by
/// `DATABASE_URL`:
///
/// ```bash
/// DATABASE_URL=postgres://... cargo test -p bookhaven-api -- --ignored
/// ```

mod common;

use axum::http::StatusCode;
use bookhaven_shared::{
    auth::jwt::TokenType,
    models::{book::Book, user::UserRole},
};
use common::{bearer, body_json, get, json_request, token_for, TestContext, ADMIN_EMAIL, TEST_PASSWORD};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_protected_route_requires_token() {
    let ctx = TestContext::new();

    let response = ctx.send(get("/v1/cart", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_rejected_as_bearer() {
    let ctx = TestContext::new();
    let refresh = format!(
        "Bearer {}",
        token_for(Uuid::new_v4(), UserRole::Admin, TokenType::Refresh)
    );

    let response = ctx.send(get("/v1/users", Some(&refresh))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let ctx = TestContext::new();

    let response = ctx.send(get("/v1/bookmarks", Some("Bearer not-a-jwt"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_cannot_reach_admin_routes() {
    let ctx = TestContext::new();
    let member = bearer(UserRole::Member);

    let response = ctx.send(get("/v1/users", Some(&member))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .send(json_request(
            "POST",
            "/v1/books",
            Some(&member),
            json!({
                "isbn": "9780000000001",
                "title": "Forbidden Book",
                "author_name": "Nobody",
                "price": "10.00",
                "publication_date": "2024-01-01T00:00:00Z"
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["error"], "forbidden");
}

/// Ordering, reviewing and bookmarking belong to members; store accounts
/// are turned away before any query runs.
#[tokio::test]
async fn test_store_accounts_cannot_use_member_routes() {
    let ctx = TestContext::new();
    let book_id = Uuid::new_v4();
    let id = Uuid::new_v4();

    for role in [UserRole::Admin, UserRole::Staff] {
        let auth = bearer(role);

        let requests = vec![
            json_request("POST", "/v1/orders", Some(&auth), json!({})),
            json_request(
                "POST",
                "/v1/reviews",
                Some(&auth),
                json!({ "book_id": book_id, "rating": 4, "comment": "Fine" }),
            ),
            json_request(
                "PUT",
                &format!("/v1/reviews/{id}"),
                Some(&auth),
                json!({ "rating": 4, "comment": "Fine" }),
            ),
            get("/v1/bookmarks", Some(&auth)),
            get("/v1/bookmarks/count", Some(&auth)),
            get(&format!("/v1/bookmarks/{id}"), Some(&auth)),
            json_request("POST", "/v1/bookmarks", Some(&auth), json!({ "book_id": book_id })),
            json_request(
                "PUT",
                &format!("/v1/bookmarks/{id}"),
                Some(&auth),
                json!({ "book_id": book_id }),
            ),
            json_request("DELETE", &format!("/v1/bookmarks/{id}"), Some(&auth), json!({})),
        ];

        for request in requests {
            let route = format!("{} {}", request.method(), request.uri());
            let response = ctx.send(request).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{role:?} {route}");
            assert_eq!(body_json(response).await["error"], "forbidden");
        }
    }
}

#[tokio::test]
async fn test_member_cannot_open_order_stream() {
    let ctx = TestContext::new();

    let response = ctx
        .send(get("/v1/orders/events", Some(&bearer(UserRole::Member))))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_opens_order_stream() {
    let ctx = TestContext::new();

    let response = ctx
        .send(get("/v1/orders/events", Some(&bearer(UserRole::Staff))))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
}

#[tokio::test]
async fn test_register_validation() {
    let ctx = TestContext::new();

    let response = ctx
        .send(json_request(
            "POST",
            "/v1/auth/register",
            None,
            json!({
                "email": "not-an-email",
                "password": "short",
                "first_name": "Ada",
                "last_name": "Reader",
                "address": "1 Main Street",
                "phone_number": "9800000000"
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn test_review_rating_out_of_range() {
    let ctx = TestContext::new();

    let response = ctx
        .send(json_request(
            "POST",
            "/v1/reviews",
            Some(&bearer(UserRole::Member)),
            json!({ "book_id": Uuid::new_v4(), "rating": 6 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_id_rejected() {
    let ctx = TestContext::new();

    let response = ctx.send(get("/v1/books/not-a-uuid", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route() {
    let ctx = TestContext::new();

    let response = ctx.send(get("/v1/nowhere", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let ctx = TestContext::new();

    let response = ctx.send(get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");

    let body = body_json(response).await;
    assert_eq!(body["database"], "disconnected");
    assert_eq!(body["order_subscribers"], 0);
}

#[tokio::test]
#[ignore]
async fn test_register_login_refresh() {
    let ctx = TestContext::with_database().await.unwrap();
    let email = format!("new-{}@bookhaven.test", Uuid::new_v4().simple());
    let phone = format!("97{:08}", Uuid::new_v4().as_u128() % 100_000_000);

    let response = ctx
        .send(json_request(
            "POST",
            "/v1/auth/register",
            None,
            json!({
                "email": email,
                "password": TEST_PASSWORD,
                "first_name": "Ada",
                "last_name": "Reader",
                "address": "1 Main Street",
                "phone_number": phone
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let registered = body_json(response).await;
    assert_eq!(registered["role"], "member");

    let response = ctx
        .send(json_request(
            "POST",
            "/v1/auth/login",
            None,
            json!({ "email": email, "password": "WrongPassw0rd" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .send(json_request(
            "POST",
            "/v1/auth/login",
            None,
            json!({ "email": email, "password": TEST_PASSWORD }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let login = body_json(response).await;
    assert_eq!(login["full_name"], "Ada Reader");

    let access = format!("Bearer {}", login["access_token"].as_str().unwrap());
    let response = ctx.send(get("/v1/users/me", Some(&access))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], email.as_str());

    let response = ctx
        .send(json_request(
            "POST",
            "/v1/auth/refresh",
            None,
            json!({ "refresh_token": login["refresh_token"] }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["role"], "member");

    // Welcome email goes out in the background
    for _ in 0..50 {
        if ctx.mailer.sent().iter().any(|m| m.to == email) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(ctx.mailer.sent().iter().any(|m| m.to == email));

    let user_id: Uuid = registered["user_id"].as_str().unwrap().parse().unwrap();
    bookhaven_shared::models::user::User::delete(&ctx.db, user_id)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore]
async fn test_admin_email_registers_as_admin() {
    let ctx = TestContext::with_database().await.unwrap();
    if let Some(existing) = bookhaven_shared::models::user::User::find_by_email(&ctx.db, ADMIN_EMAIL)
        .await
        .unwrap()
    {
        ctx.cleanup_user(&existing).await.unwrap();
    }

    let response = ctx
        .send(json_request(
            "POST",
            "/v1/auth/register",
            None,
            json!({
                "email": ADMIN_EMAIL.to_uppercase(),
                "password": TEST_PASSWORD,
                "first_name": "Store",
                "last_name": "Owner",
                "address": "1 Main Street",
                "phone_number": format!("96{:08}", Uuid::new_v4().as_u128() % 100_000_000)
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["role"], "admin");

    let user_id: Uuid = body["user_id"].as_str().unwrap().parse().unwrap();
    bookhaven_shared::models::user::User::delete(&ctx.db, user_id)
        .await
        .unwrap();
}

/// Catalog to pickup: admin stocks a book, a member buys five copies, staff
/// hands them over and the member reviews the book.
#[tokio::test]
#[ignore]
async fn test_order_pickup_flow() {
    let ctx = TestContext::with_database().await.unwrap();
    let admin = ctx.create_user(UserRole::Admin).await.unwrap();
    let staff = ctx.create_user(UserRole::Staff).await.unwrap();
    let member = ctx.create_user(UserRole::Member).await.unwrap();

    let admin_auth = format!("Bearer {}", token_for(admin.id, UserRole::Admin, TokenType::Access));
    let staff_auth = format!("Bearer {}", token_for(staff.id, UserRole::Staff, TokenType::Access));
    let member_auth = format!("Bearer {}", token_for(member.id, UserRole::Member, TokenType::Access));

    let isbn = format!("978{:010}", Uuid::new_v4().as_u128() % 10_000_000_000);
    let response = ctx
        .send(json_request(
            "POST",
            "/v1/books",
            Some(&admin_auth),
            json!({
                "isbn": isbn,
                "title": "The Pickup Counter",
                "author_name": "Jane Doe",
                "price": "100.00",
                "publication_date": "2024-03-01T00:00:00Z",
                "quantity_in_stock": 10
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let book_id: Uuid = body_json(response).await["id"].as_str().unwrap().parse().unwrap();

    // Reviews require a completed purchase
    let review = json!({ "book_id": book_id, "rating": 5, "comment": "Loved it" });
    let response = ctx
        .send(json_request("POST", "/v1/reviews", Some(&member_auth), review.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .send(json_request(
            "POST",
            "/v1/cart/items",
            Some(&member_auth),
            json!({ "book_id": book_id, "quantity": 5 }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let stream = ctx.send(get("/v1/orders/events", Some(&staff_auth))).await;
    assert_eq!(stream.status(), StatusCode::OK);

    let response = ctx
        .send(json_request("POST", "/v1/orders", Some(&member_auth), json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let placed = body_json(response).await;
    assert_eq!(placed["status"], "pending");
    assert_eq!(placed["total_amount"], "500.00");
    assert_eq!(placed["discount_amount"], "25.00");
    assert_eq!(placed["final_amount"], "475.00");
    let claim_code = placed["claim_code"].as_str().unwrap().to_string();
    assert_eq!(claim_code.len(), 8);

    let stock = Book::find_detail(&ctx.db, book_id).await.unwrap().unwrap();
    assert_eq!(stock.quantity_in_stock, 5);

    // Members cannot work the counter
    let response = ctx
        .send(json_request(
            "POST",
            &format!("/v1/orders/claims/{claim_code}/process"),
            Some(&member_auth),
            json!({}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .send(json_request(
            "POST",
            &format!("/v1/orders/claims/{claim_code}/complete"),
            Some(&staff_auth),
            json!({}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .send(json_request(
            "POST",
            &format!("/v1/orders/claims/{claim_code}/process"),
            Some(&staff_auth),
            json!({}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ready_for_pickup");

    let response = ctx
        .send(json_request(
            "POST",
            &format!("/v1/orders/claims/{claim_code}/complete"),
            Some(&staff_auth),
            json!({}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let completed = body_json(response).await;
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["order_items"].as_array().unwrap().len(), 1);

    let response = ctx.send(get("/v1/orders/history", Some(&member_auth))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["completed_orders"], 1);

    let response = ctx
        .send(json_request("POST", "/v1/reviews", Some(&member_auth), review))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["is_verified_purchase"], true);

    drop(stream);
    ctx.cleanup_user(&member).await.unwrap();
    Book::delete(&ctx.db, book_id).await.unwrap();
    ctx.cleanup_user(&staff).await.unwrap();
    ctx.cleanup_user(&admin).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_order_without_cart() {
    let ctx = TestContext::with_database().await.unwrap();
    let member = ctx.create_user(UserRole::Member).await.unwrap();
    let member_auth = format!("Bearer {}", token_for(member.id, UserRole::Member, TokenType::Access));

    let response = ctx
        .send(json_request("POST", "/v1/orders", Some(&member_auth), json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx.send(get("/v1/cart", Some(&member_auth))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    ctx.cleanup_user(&member).await.unwrap();
}
