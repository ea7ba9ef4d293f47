//! HTTP surface: envelopes, auth and validation over the full route table.

mod common;

use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use social_chat_service::middleware::auth::issue_token;
use social_chat_service::routes;
use uuid::Uuid;

fn status_of(result: Result<ServiceResponse, actix_web::Error>) -> StatusCode {
    match result {
        Ok(res) => res.status(),
        Err(e) => e.as_response_error().status_code(),
    }
}

macro_rules! app {
    ($env:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($env.state.clone()))
                .configure(routes::configure($env.config.jwt.clone())),
        )
        .await
    };
}

#[actix_rt::test]
#[ignore = "requires Docker"]
async fn health_is_public_and_api_is_not() {
    let env = common::setup().await;
    let app = app!(env);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body, "OK");

    let req = test::TestRequest::get().uri("/api/v1/user/me").to_request();
    assert_eq!(
        status_of(test::try_call_service(&app, req).await),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_rt::test]
#[ignore = "requires Docker"]
async fn conversation_round_trip_over_http() {
    let env = common::setup().await;
    let app = app!(env);
    let alice = common::create_user(&env.db, "alice", "0001").await;
    let bob = common::create_user(&env.db, "bob", "0002").await;
    let alice_auth = format!("Bearer {}", issue_token(&env.config.jwt, alice, 300).unwrap());
    let bob_auth = format!("Bearer {}", issue_token(&env.config.jwt, bob, 300).unwrap());

    let req = test::TestRequest::get()
        .uri("/api/v1/user/me")
        .insert_header(("Authorization", alice_auth.clone()))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["success"], true);
    assert_eq!(me["data"]["name"], "alice");

    let req = test::TestRequest::post()
        .uri("/api/v1/user/conversation/getOrCreate")
        .insert_header(("Authorization", alice_auth.clone()))
        .set_json(json!({ "target_id": bob }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["success"], true);
    let conv = created["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/user/conversation/message/new")
        .insert_header(("Authorization", alice_auth.clone()))
        .set_json(json!({ "id": conv, "content": "  hi  " }))
        .to_request();
    let sent: Value = test::call_and_read_body_json(&app, req).await;
    let message_id = sent["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/v1/user/conversation/list?limit=20&offset=0")
        .insert_header(("Authorization", bob_auth.clone()))
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list["data"][0]["last_message"], "  hi  ");
    assert_eq!(list["data"][0]["unread_count"], 1);

    let req = test::TestRequest::delete()
        .uri("/api/v1/user/conversation/message/delete")
        .insert_header(("Authorization", bob_auth.clone()))
        .set_json(json!({ "id": message_id }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["retryable"], false);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/user/conversation/message/list?id={conv}"))
        .insert_header(("Authorization", bob_auth))
        .to_request();
    let history: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(history["data"].as_array().unwrap().len(), 1);
    assert_eq!(history["data"][0]["sender_name"], "alice");
    assert_eq!(history["data"][0]["content"], "  hi  ");
}

#[actix_rt::test]
#[ignore = "requires Docker"]
async fn malformed_input_is_a_bad_request() {
    let env = common::setup().await;
    let app = app!(env);
    let alice = common::create_user(&env.db, "alice", "0001").await;
    let auth = format!("Bearer {}", issue_token(&env.config.jwt, alice, 300).unwrap());

    let cases = vec![
        test::TestRequest::get()
            .uri("/api/v1/user/conversation/list?limit=0")
            .insert_header(("Authorization", auth.clone()))
            .to_request(),
        test::TestRequest::get()
            .uri("/api/v1/user/conversation/list?limit=51")
            .insert_header(("Authorization", auth.clone()))
            .to_request(),
        test::TestRequest::get()
            .uri("/api/v1/user/friend/list?offset=-1")
            .insert_header(("Authorization", auth.clone()))
            .to_request(),
        test::TestRequest::get()
            .uri("/api/v1/user/conversation/get?id=not-a-uuid")
            .insert_header(("Authorization", auth.clone()))
            .to_request(),
        test::TestRequest::post()
            .uri("/api/v1/user/conversation/getOrCreate")
            .insert_header(("Authorization", auth.clone()))
            .set_json(json!({ "target_id": alice }))
            .to_request(),
        test::TestRequest::post()
            .uri("/api/v1/user/conversation/message/new")
            .insert_header(("Authorization", auth.clone()))
            .set_json(json!({ "id": Uuid::now_v7(), "content": "   " }))
            .to_request(),
        test::TestRequest::post()
            .uri("/api/v1/user/friend/add")
            .insert_header(("Authorization", auth.clone()))
            .set_json(json!({ "name": "missing field" }))
            .to_request(),
    ];

    for req in cases {
        let path = req.path().to_string();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["success"], false, "{path}");
    }
}
