use axum_extra::extract::cookie::{Cookie, CookieJar};
use keystone_core::TestApp;
use keystone_core::auth::roles;

#[tokio::test]
async fn test_create_user() {
    let app = TestApp::new().await;
    let body = serde_json::json!({
        "name": "Jane",
        "email": "jane@example.com",
        "password": "password123",
        "phone": "+905551234567"
    });

    let res = app
        .client
        .with_cookie("locale", "en-US")
        .post(&app.url("/api/v1/users"), &body.to_string())
        .await;

    assert_eq!(res.status, 201);
    assert_eq!(res.json()["status"], 201);
    assert_eq!(res.message(), "User created successfully");
    let data = res.data();
    assert!(data["id"].as_i64().unwrap() > 0);
    assert_eq!(data["role"], "user");
    assert_eq!(data["phone"], "+905551234567");
    assert!(data["passwordHash"].is_null());
    assert!(data["password"].is_null());

    // The new account can log in.
    app.login("jane@example.com", "password123").await;
}

#[tokio::test]
async fn test_create_user_duplicate_email() {
    let app = TestApp::new().await;
    app.seed_user("Jane", "jane@example.com", "password123", roles::USER)
        .await;

    let body = serde_json::json!({
        "name": "Janet",
        "email": "jane@example.com",
        "password": "password123"
    });
    let res = app
        .client
        .post(&app.url("/api/v1/users"), &body.to_string())
        .await;

    assert_eq!(res.status, 409);
    assert_eq!(res.code(), "ERR:USER_EMAIL_ALREADY_EXISTS");
}

#[tokio::test]
async fn test_create_user_missing_email() {
    let app = TestApp::new().await;
    let body = serde_json::json!({ "name": "Jane", "password": "password123" }).to_string();

    for (locale, expected) in [("en-US", "Email is required"), ("tr-TR", "E-posta alanı zorunludur")] {
        let res = app
            .client
            .with_cookie("locale", locale)
            .post(&app.url("/api/v1/users"), &body)
            .await;

        assert_eq!(res.status, 422);
        assert_eq!(res.code(), "VAL:VALIDATION_ERR");
        let errors = res.validation_errors();
        assert_eq!(errors.len(), 1, "{locale}");
        assert_eq!(errors[0]["field"], "email");
        assert_eq!(errors[0]["input"], "");
        assert_eq!(errors[0]["message"], expected);
    }
}

#[tokio::test]
async fn test_create_user_reports_every_invalid_field() {
    let app = TestApp::new().await;
    let body = serde_json::json!({
        "name": "J4",
        "email": "not-an-email",
        "password": "short",
        "phone": "555"
    });

    let res = app
        .client
        .with_cookie("locale", "en-US")
        .post(&app.url("/api/v1/users"), &body.to_string())
        .await;

    assert_eq!(res.status, 422);
    let errors = res.validation_errors();
    let fields: Vec<_> = errors.iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"phone"));

    let email = errors.iter().find(|e| e["field"] == "email").unwrap();
    assert_eq!(email["input"], "not-an-email");
    assert_eq!(email["message"], "Email must be a valid email address");
}

#[tokio::test]
async fn test_me_requires_session() {
    let app = TestApp::new().await;

    let res = app.client.get(&app.url("/api/v1/users/me")).await;

    assert_eq!(res.status, 401);
    assert_eq!(res.code(), "ERR:SESSION_UNAUTHORIZED");
    assert_eq!(res.message(), "Yetkisiz erişim");
}

#[tokio::test]
async fn test_update_me() {
    let app = TestApp::new().await;
    let (user, client) = app.login_as(roles::USER).await;

    // Warm the user cache so the update has something to invalidate.
    let res = client.get(&app.url("/api/v1/users/me")).await;
    assert_eq!(res.data()["name"], "Tester");

    let body = serde_json::json!({ "name": "Janet", "email": "janet@example.com" });
    let res = client
        .with_cookie("locale", "en-US")
        .put(&app.url("/api/v1/users/me"), &body.to_string())
        .await;

    assert_eq!(res.status, 200);
    assert_eq!(res.message(), "User updated successfully");
    assert_eq!(res.data()["id"], user.id);
    assert_eq!(res.data()["email"], "janet@example.com");
    assert!(res.set_cookie("session").is_some());

    let res = client.get(&app.url("/api/v1/users/me")).await;
    assert_eq!(res.data()["name"], "Janet");

    // The session now carries the new profile.
    let jar = CookieJar::new().add(Cookie::new(
        "session",
        client.cookie("session").unwrap().to_string(),
    ));
    let (_, principal) = app.state.sessions.check(&jar).await.unwrap();
    assert_eq!(principal.email, "janet@example.com");
}

#[tokio::test]
async fn test_update_me_to_taken_email() {
    let app = TestApp::new().await;
    app.seed_user("Other", "other@example.com", "password123", roles::USER)
        .await;
    let (_, client) = app.login_as(roles::USER).await;

    let body = serde_json::json!({ "name": "Janet", "email": "other@example.com" });
    let res = client
        .put(&app.url("/api/v1/users/me"), &body.to_string())
        .await;

    assert_eq!(res.status, 409);
    assert_eq!(res.code(), "ERR:USER_EMAIL_ALREADY_EXISTS");
}

#[tokio::test]
async fn test_delete_me() {
    let app = TestApp::new().await;
    let (user, client) = app.login_as(roles::USER).await;

    let res = client.delete(&app.url("/api/v1/users/me")).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.message(), "Kullanıcı başarıyla silindi");
    let cookie = res.set_cookie("session").expect("expired cookie");
    assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));

    let res = client.get(&app.url("/api/v1/users/me")).await;
    assert_eq!(res.status, 401);

    let err = app.state.users.get(user.id).await.unwrap_err();
    assert_eq!(err.to_string(), "ERR:USER_NOT_FOUND");
}

#[tokio::test]
async fn test_get_user_not_found_names_the_id() {
    let app = TestApp::new().await;
    let (_, client) = app.login_as(roles::ADMIN).await;

    let res = client
        .with_cookie("locale", "en-US")
        .get(&app.url("/api/v1/users/9999"))
        .await;

    assert_eq!(res.status, 404);
    assert_eq!(res.code(), "ERR:USER_NOT_FOUND");
    assert_eq!(res.message(), "User with ID 9999 not found");
}

#[tokio::test]
async fn test_invalid_id() {
    let app = TestApp::new().await;
    let (_, client) = app.login_as(roles::ADMIN).await;

    for id in ["abc", "0", "-1"] {
        let res = client.get(&app.url(&format!("/api/v1/users/{id}"))).await;
        assert_eq!(res.status, 400, "id {id}");
        assert_eq!(res.code(), "ERR:INVALID_ID");
    }
}

#[tokio::test]
async fn test_deleted_admin_loses_access_immediately() {
    let app = TestApp::new().await;
    app.seed_user("Alpha", "alpha@example.com", "password123", roles::ADMIN)
        .await;
    let bravo = app
        .seed_user("Bravo", "bravo@example.com", "password123", roles::ADMIN)
        .await;
    let victim = app
        .seed_user("Victim", "victim@example.com", "password123", roles::USER)
        .await;
    let alpha_client = app.login("alpha@example.com", "password123").await;
    let bravo_client = app.login("bravo@example.com", "password123").await;

    let res = alpha_client
        .delete(&app.url(&format!("/api/v1/users/{}", bravo.id)))
        .await;
    assert_eq!(res.status, 200);

    let res = bravo_client
        .delete(&app.url(&format!("/api/v1/users/{}", victim.id)))
        .await;
    assert_eq!(res.status, 401);
    assert_eq!(res.code(), "ERR:SESSION_UNAUTHORIZED");

    // The victim is still there.
    assert_eq!(app.state.users.get(victim.id).await.unwrap().id, victim.id);
}

#[tokio::test]
async fn test_delete_me_ends_sessions_on_other_devices() {
    let app = TestApp::new().await;
    app.seed_user("Jane", "jane@example.com", "password123", roles::USER)
        .await;
    let laptop = app.login("jane@example.com", "password123").await;
    let phone = app.login("jane@example.com", "password123").await;

    let res = laptop.delete(&app.url("/api/v1/users/me")).await;
    assert_eq!(res.status, 200);

    let res = phone.get(&app.url("/api/v1/auth/refresh")).await;
    assert_eq!(res.status, 401);
    let res = phone.get(&app.url("/api/v1/users/me")).await;
    assert_eq!(res.status, 401);
}
