mod common;

use axum::http::StatusCode;
use common::{TestApp, ADMIN_PASSWORD, FAMILY_PASSWORD};
use family_auth_service::services::Notification;
use serde_json::json;

#[tokio::test]
async fn test_register_records_pending_request() {
    let app = TestApp::spawn().await;

    let (status, body) = app.register("Priya@Example.com ", "The_Sharmas").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(
        body["message"],
        "Your request has been submitted and is awaiting SuperAdmin approval."
    );

    let request_id = body["request_id"].as_str().unwrap();
    let (status, view) = app.get(&format!("/admin/status/{}", request_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["email"], "priya@example.com");
    assert_eq!(view["family_name"], "The_Sharmas");
    assert_eq!(view["status"], "pending");
    assert!(view.get("password_hash").is_none());
    assert!(view.get("family_password_hash").is_none());

    assert!(matches!(
        app.notifier.sent().as_slice(),
        [Notification::RequestReceived { .. }]
    ));
}

#[tokio::test]
async fn test_register_validation_messages_in_order() {
    let app = TestApp::spawn().await;

    let base = json!({
        "email": "priya@example.com",
        "full_name": "Priya",
        "family_name": "Sharmas",
        "password": ADMIN_PASSWORD,
        "confirm_password": ADMIN_PASSWORD,
        "family_password": FAMILY_PASSWORD,
    });

    let cases = [
        ("full_name", json!(""), "All fields are required"),
        ("password", json!("short"), "Password must be at least 8 characters"),
        ("confirm_password", json!("password124"), "Passwords do not match"),
        ("family_password", json!("abc"), "Family password must be at least 4 characters long"),
        ("family_name", json!("bad name!"), "Family name may only contain letters, digits, '_' and '-'"),
        ("email", json!("not-an-email"), "Invalid email format"),
    ];

    for (field, value, expected) in cases {
        let mut body = base.clone();
        body[field] = value;
        let (status, err) = app.post("/admin/register", None, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "field {}", field);
        assert_eq!(err["kind"], "validation_error");
        assert_eq!(err["error"], expected, "field {}", field);
    }

    // Missing fields deserialize as blanks
    let (status, err) = app
        .post("/admin/register", None, json!({"email": "priya@example.com"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "All fields are required");

    let (status, _) = app.get("/admin/requests/all", Some(&app.super_admin_token().await)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_duplicate_pending_email_and_family_name_conflict() {
    let app = TestApp::spawn().await;
    assert_eq!(app.register("a@x.com", "fam1").await.0, StatusCode::CREATED);

    let (status, err) = app.register("A@X.com", "fam2").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "conflict");
    assert_eq!(err["error"], "A request is already pending for this email");

    let (status, err) = app.register("b@x.com", "fam1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "Family name already exists");
}

#[tokio::test]
async fn test_unknown_or_malformed_request_id_is_not_found() {
    let app = TestApp::spawn().await;

    let (status, err) = app
        .get(&format!("/admin/status/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["kind"], "not_found");

    let (status, _) = app.get("/admin/status/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approval_provisions_family_admin() {
    let app = TestApp::spawn().await;
    let (_, body) = app.register("admin@x.com", "Sharmas").await;
    let request_id = body["request_id"].as_str().unwrap().to_string();

    // Pending admins are told to wait, not that the password is wrong
    let (status, err) = app
        .post("/admin/login", None, json!({"email": "admin@x.com", "password": ADMIN_PASSWORD}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["kind"], "pending_approval");

    let root = app.super_admin_token().await;
    let (status, pending) = app.get("/admin/requests/pending", Some(&root)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["total"], 1);

    let (status, approved) = app
        .post("/admin/request/approve", Some(&root), json!({"request_id": request_id}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["user"]["role"], "family_admin");
    assert_eq!(approved["user"]["email"], "admin@x.com");
    assert!(approved["user"].get("password_hash").is_none());

    let (_, view) = app.get(&format!("/admin/status/{}", request_id), None).await;
    assert_eq!(view["status"], "approved");
    assert!(view["reviewed_at"].is_string());

    let (status, session) = app
        .post("/admin/login", None, json!({"email": "admin@x.com", "password": ADMIN_PASSWORD}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["token_type"], "Bearer");
    assert_eq!(session["user"]["role"], "family_admin");
    assert_eq!(session["user"]["family_id"], approved["user"]["family_id"]);

    let (_, pending) = app.get("/admin/requests/pending", Some(&root)).await;
    assert_eq!(pending["total"], 0);
    let (_, all) = app.get("/admin/requests/all", Some(&root)).await;
    assert_eq!(all["total"], 1);

    assert!(app
        .notifier
        .sent()
        .iter()
        .any(|n| matches!(n, Notification::RequestApproved { .. })));
}

#[tokio::test]
async fn test_decided_request_cannot_be_decided_again() {
    let app = TestApp::spawn().await;
    let (_, body) = app.register("admin@x.com", "Sharmas").await;
    let request_id = body["request_id"].as_str().unwrap().to_string();
    let root = app.super_admin_token().await;

    let (status, _) = app
        .post("/admin/request/approve", Some(&root), json!({"request_id": request_id}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, err) = app
        .post("/admin/request/approve", Some(&root), json!({"request_id": request_id}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "invalid_state");

    let (status, err) = app
        .post(
            "/admin/request/reject",
            Some(&root),
            json!({"request_id": request_id, "reason": "changed my mind"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["kind"], "invalid_state");

    let (status, err) = app
        .post(
            "/admin/request/approve",
            Some(&root),
            json!({"request_id": uuid::Uuid::new_v4()}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["kind"], "not_found");
}

#[tokio::test]
async fn test_rejection_records_reason_and_frees_email() {
    let app = TestApp::spawn().await;
    let (_, body) = app.register("admin@x.com", "Sharmas").await;
    let request_id = body["request_id"].as_str().unwrap().to_string();
    let root = app.super_admin_token().await;

    let (status, err) = app
        .post(
            "/admin/request/reject",
            Some(&root),
            json!({"request_id": request_id, "reason": "   "}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"], "Rejection reason is required");

    let (status, rejected) = app
        .post(
            "/admin/request/reject",
            Some(&root),
            json!({"request_id": request_id, "reason": "Duplicate family"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["request"]["status"], "rejected");
    assert_eq!(rejected["request"]["rejection_reason"], "Duplicate family");

    let (_, view) = app.get(&format!("/admin/status/{}", request_id), None).await;
    assert_eq!(view["status"], "rejected");
    assert_eq!(view["rejection_reason"], "Duplicate family");

    // Rejected admins never get a session
    let (status, _) = app
        .post("/admin/login", None, json!({"email": "admin@x.com", "password": ADMIN_PASSWORD}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The email and family name are free again
    let (status, _) = app.register("admin@x.com", "Sharmas").await;
    assert_eq!(status, StatusCode::CREATED);

    assert!(app.notifier.sent().iter().any(|n| matches!(
        n,
        Notification::RequestRejected { reason, .. } if reason == "Duplicate family"
    )));
}

#[tokio::test]
async fn test_approved_admin_cannot_register_again() {
    let app = TestApp::spawn().await;
    app.onboard_family("admin@x.com", "Sharmas").await;

    let (status, err) = app.register("admin@x.com", "Vermas").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "This email already administers a family");

    let (status, err) = app.register("other@x.com", "Sharmas").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "Family name already exists");
}

#[tokio::test]
async fn test_concurrent_approve_and_reject_have_one_winner() {
    let app = TestApp::spawn().await;
    let (_, body) = app.register("admin@x.com", "Sharmas").await;
    let request_id = body["request_id"].as_str().unwrap().to_string();
    let root = app.super_admin_token().await;

    let approve = app.post(
        "/admin/request/approve",
        Some(&root),
        json!({"request_id": request_id}),
    );
    let reject = app.post(
        "/admin/request/reject",
        Some(&root),
        json!({"request_id": request_id, "reason": "race"}),
    );
    let ((approve_status, _), (reject_status, _)) = tokio::join!(approve, reject);

    let winners = [approve_status, reject_status]
        .iter()
        .filter(|s| **s == StatusCode::OK)
        .count();
    assert_eq!(winners, 1);
    assert!(approve_status == StatusCode::CONFLICT || reject_status == StatusCode::CONFLICT);

    let (_, view) = app.get(&format!("/admin/status/{}", request_id), None).await;
    let expected = if approve_status == StatusCode::OK { "approved" } else { "rejected" };
    assert_eq!(view["status"], expected);
}
