mod common;

use api_lib::web::auth::AuthResponse;
use axum::http::StatusCode;
use common::*;
use serde_json::json;

fn register(username: &str, email: &str, password: &str) -> axum::http::Request<axum::body::Body> {
    json_request(
        "POST",
        "/users/register",
        json!({"username": username, "email": email, "password": password, "name": "Nyx"}),
    )
}

#[tokio::test]
async fn register_then_login_returns_the_same_user() {
    let app = TestApp::new().await;

    let created = app.send(register("sleeper", "sleeper@example.com", "hunter2")).await;
    assert_status(&created, StatusCode::CREATED);
    let created: AuthResponse = read_json(created).await;
    assert_eq!(created.username, "sleeper");

    let login = app
        .send(json_request(
            "POST",
            "/users/login",
            json!({"username": "sleeper", "password": "hunter2"}),
        ))
        .await;
    assert_status(&login, StatusCode::OK);
    let logged_in: AuthResponse = read_json(login).await;
    assert_eq!(logged_in.id, created.id);

    // The stored password is a hash, not the plaintext.
    let creds = app
        .state
        .db
        .find_user_by_username("sleeper")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(creds.hashed_password, "hunter2");
    assert!(creds.hashed_password.starts_with("$argon2"));
}

#[tokio::test]
async fn taken_username_or_email_is_rejected() {
    let app = TestApp::new().await;
    assert_status(
        &app.send(register("sleeper", "sleeper@example.com", "pw")).await,
        StatusCode::CREATED,
    );

    assert_status(
        &app.send(register("sleeper", "other@example.com", "pw")).await,
        StatusCode::BAD_REQUEST,
    );
    assert_status(
        &app.send(register("other", "sleeper@example.com", "pw")).await,
        StatusCode::BAD_REQUEST,
    );
    assert_status(&app.send(register(" ", "x@example.com", "pw")).await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let app = TestApp::new().await;
    app.send(register("sleeper", "sleeper@example.com", "right")).await;

    let wrong_password = app
        .send(json_request(
            "POST",
            "/users/login",
            json!({"username": "sleeper", "password": "wrong"}),
        ))
        .await;
    assert_status(&wrong_password, StatusCode::UNAUTHORIZED);

    let unknown_user = app
        .send(json_request(
            "POST",
            "/users/login",
            json!({"username": "ghost", "password": "right"}),
        ))
        .await;
    assert_status(&unknown_user, StatusCode::UNAUTHORIZED);

    let missing = app
        .send(json_request(
            "POST",
            "/users/login",
            json!({"username": "", "password": ""}),
        ))
        .await;
    assert_status(&missing, StatusCode::BAD_REQUEST);
}
