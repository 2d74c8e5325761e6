mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{body_json, build_test_app, get, get_with_bearer, post_json, post_raw, send, TEST_SECRET};
use serde_json::json;

use stockbin::utils::verify_token;

#[tokio::test]
async fn signup_then_login() {
    let app = build_test_app();

    let signup = post_json(
        &app,
        "/api/auth/signup",
        json!({ "email": "Ops@Example.com", "password": "hunter22" }),
    )
    .await;
    assert_eq!(signup.status(), StatusCode::CREATED);
    let body = body_json(signup).await;
    assert_eq!(body["message"], "User created");
    assert_eq!(body["user"]["email"], "ops@example.com");
    assert!(body["user"].get("password_hash").is_none());

    let login = post_json(
        &app,
        "/api/auth/login",
        json!({ "email": "ops@example.com", "password": "hunter22" }),
    )
    .await;
    assert_eq!(login.status(), StatusCode::OK);

    let cookie = login
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(login).await;
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user_id"], 1);

    let token = body["token"].as_str().unwrap();
    let claims = verify_token(token, TEST_SECRET).unwrap();
    assert_eq!(claims.user_id(), Some(1));
    assert_eq!(claims.email, "ops@example.com");
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let app = build_test_app();
    let credentials = json!({ "email": "ops@example.com", "password": "hunter22" });

    assert_eq!(
        post_json(&app, "/api/auth/signup", credentials.clone()).await.status(),
        StatusCode::CREATED
    );

    let again = post_json(
        &app,
        "/api/auth/signup",
        json!({ "email": "OPS@example.com", "password": "other" }),
    )
    .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(again).await["message"], "Email already exists");
}

#[tokio::test]
async fn signup_requires_both_fields() {
    let app = build_test_app();
    for body in [
        json!({ "password": "hunter22" }),
        json!({ "email": "ops@example.com" }),
        json!({ "email": "ops@example.com", "password": "" }),
    ] {
        let response = post_json(&app, "/api/auth/signup", body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let garbled = post_raw(&app, "/api/auth/signup", "not json").await;
    assert_eq!(garbled.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let app = build_test_app();
    post_json(
        &app,
        "/api/auth/signup",
        json!({ "email": "ops@example.com", "password": "hunter22" }),
    )
    .await;

    for body in [
        json!({ "email": "ops@example.com", "password": "wrong" }),
        json!({ "email": "nobody@example.com", "password": "hunter22" }),
    ] {
        let response = post_json(&app, "/api/auth/login", body).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Invalid credentials");
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn me_reads_bearer_or_cookie() {
    let app = build_test_app();
    let credentials = json!({ "email": "ops@example.com", "password": "hunter22" });
    post_json(&app, "/api/auth/signup", credentials.clone()).await;
    let token = body_json(post_json(&app, "/api/auth/login", credentials).await).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let by_header = get_with_bearer(&app, "/api/auth/me", &token).await;
    assert_eq!(by_header.status(), StatusCode::OK);
    assert_eq!(body_json(by_header).await, json!({ "id": 1, "email": "ops@example.com" }));

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/auth/me")
        .header(header::COOKIE, format!("auth_token={token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn me_requires_a_valid_session() {
    let app = build_test_app();

    let anonymous = get(&app, "/api/auth/me").await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let forged = get_with_bearer(&app, "/api/auth/me", "not.a.token").await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

    // Signed correctly, but for an account that does not exist.
    let orphan = stockbin::utils::create_token(42, "ghost@example.com".to_string(), TEST_SECRET).unwrap();
    let orphaned = get_with_bearer(&app, "/api/auth/me", &orphan).await;
    assert_eq!(orphaned.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_cookie() {
    let app = build_test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/logout")
        .header(header::COOKIE, "auth_token=whatever")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("removal cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(body_json(response).await["message"], "Logged out");
}
