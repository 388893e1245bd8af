use keystone_core::TestApp;
use keystone_core::auth::roles;

#[tokio::test]
async fn test_plain_user_cannot_read_others() {
    let app = TestApp::new().await;
    let target = app
        .seed_user("Target", "target@example.com", "password123", roles::USER)
        .await;
    let (_, client) = app.login_as(roles::USER).await;

    let res = client
        .get(&app.url(&format!("/api/v1/users/{}", target.id)))
        .await;

    assert_eq!(res.status, 401);
    assert_eq!(res.code(), "ERR:SESSION_UNAUTHORIZED");
}

#[tokio::test]
async fn test_staff_can_read_and_update() {
    let app = TestApp::new().await;
    let target = app
        .seed_user("Target", "target@example.com", "password123", roles::USER)
        .await;
    let url = app.url(&format!("/api/v1/users/{}", target.id));

    for role in [roles::ADMIN, roles::SUBADMIN] {
        let (_, client) = app.login_as(role).await;

        let res = client.get(&url).await;
        assert_eq!(res.status, 200, "{role} read");
        assert_eq!(res.data()["email"], "target@example.com");

        let body = serde_json::json!({ "name": "Renamed", "email": "target@example.com" });
        let res = client.put(&url, &body.to_string()).await;
        assert_eq!(res.status, 200, "{role} update");
        assert_eq!(res.data()["name"], "Renamed");
    }
}

#[tokio::test]
async fn test_only_admin_deletes() {
    let app = TestApp::new().await;
    let target = app
        .seed_user("Target", "target@example.com", "password123", roles::USER)
        .await;
    let url = app.url(&format!("/api/v1/users/{}", target.id));

    let (_, subadmin) = app.login_as(roles::SUBADMIN).await;
    let res = subadmin.delete(&url).await;
    assert_eq!(res.status, 401);
    assert_eq!(res.code(), "ERR:SESSION_UNAUTHORIZED");

    let (_, admin) = app.login_as(roles::ADMIN).await;
    let res = admin.with_cookie("locale", "en-US").delete(&url).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.message(), "User deleted successfully");

    let res = admin.delete(&url).await;
    assert_eq!(res.status, 404);
    assert_eq!(res.code(), "ERR:USER_NOT_FOUND");
}

#[tokio::test]
async fn test_anonymous_staff_route() {
    let app = TestApp::new().await;

    let res = app.client.get(&app.url("/api/v1/users/1")).await;

    assert_eq!(res.status, 401);
    assert_eq!(res.code(), "ERR:SESSION_UNAUTHORIZED");
}

#[tokio::test]
async fn test_gate_runs_before_id_parsing() {
    let app = TestApp::new().await;
    let (_, client) = app.login_as(roles::USER).await;

    let res = client.get(&app.url("/api/v1/users/abc")).await;

    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn test_optional_gate_on_health() {
    let app = TestApp::new().await;

    let res = app.client.get(&app.url("/health")).await;
    assert_eq!(res.status, 200);
    assert!(res.data()["userId"].is_null());

    let res = app
        .client
        .with_cookie("session", "forged")
        .get(&app.url("/health"))
        .await;
    assert_eq!(res.status, 200);
    assert!(res.data()["userId"].is_null());

    let (user, client) = app.login_as(roles::SUBADMIN).await;
    let res = client.get(&app.url("/health")).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.data()["userId"], user.id);
    assert_eq!(res.data()["role"], "subadmin");
}
