mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use backend_test_support::problem_details::assert_problem_details_from_service_response;
use common::{started_game, test_app, test_state};
use serde_json::{json, Value};

#[actix_web::test]
async fn create_join_start_over_http() {
    let state = test_state().await;
    let app = test_app!(state.clone());

    let req = test::TestRequest::post()
        .uri("/api/sessions")
        .set_json(json!({ "nickname": "Ana", "maxPlayers": 4 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(resp.headers().contains_key("x-trace-id"));
    let created: Value = test::read_body_json(resp).await;
    let code = created["code"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "waiting");
    assert_eq!(created["hostId"], "Ana");
    assert_eq!(created["maxPlayers"], 4);

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{}/join", code.to_lowercase()))
        .set_json(json!({ "nickname": "Bo" }))
        .to_request();
    let joined: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(joined["players"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{code}/start"))
        .to_request();
    let started: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(started["message"], "Game started");
    assert_eq!(started["session"]["status"], "in-progress");
    assert_eq!(started["session"]["currentRound"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{code}/task/Bo"))
        .to_request();
    let task: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(task["chainId"], 1);
    assert_eq!(task["taskType"], "prompt");
    assert_eq!(task["alreadySubmitted"], false);
}

#[actix_web::test]
async fn submit_and_results_over_http() {
    let state = test_state().await;
    let code = started_game(&state, &["A", "B"]).await;
    let app = test_app!(state.clone());

    let submit = |nick: &str, chain: usize, kind: &str, data: &str| {
        test::TestRequest::post()
            .uri(&format!("/api/sessions/{code}/entries"))
            .set_json(json!({
                "playerNickname": nick,
                "chainId": chain,
                "type": kind,
                "data": data,
            }))
            .to_request()
    };

    let first: Value = test::call_and_read_body_json(&app, submit("A", 0, "prompt", "a cat")).await;
    assert_eq!(first["allSubmitted"], false);
    assert_eq!(first["submittedCount"], 1);
    assert_eq!(first["totalPlayers"], 2);

    let second: Value = test::call_and_read_body_json(&app, submit("B", 1, "prompt", "a dog")).await;
    assert_eq!(second["allSubmitted"], true);
    assert_eq!(second["session"]["currentRound"], 2);

    // Drawings may arrive under the legacy `file` field.
    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{code}/entries"))
        .set_json(json!({
            "playerNickname": "A",
            "chainId": 1,
            "type": "drawing",
            "file": "data:image/png;base64,AAAA",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/sessions/{code}/results"))
            .to_request(),
    )
    .await;
    assert_problem_details_from_service_response(
        resp,
        "RESULTS_NOT_READY",
        StatusCode::BAD_REQUEST,
        None,
    )
    .await;

    let last: Value =
        test::call_and_read_body_json(&app, submit("B", 0, "drawing", "data:image/png;base64,BBBB"))
            .await;
    assert_eq!(last["session"]["status"], "finished");

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{code}/results"))
        .to_request();
    let results: Value = test::call_and_read_body_json(&app, req).await;
    let chains = results["chains"].as_array().unwrap();
    assert_eq!(chains.len(), 2);
    assert_eq!(chains[0]["originalPrompt"], "a cat");
    assert_eq!(chains[0]["entries"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn leave_and_end_over_http() {
    let state = test_state().await;
    let code = started_game(&state, &["A", "B", "C"]).await;
    let app = test_app!(state.clone());

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{code}/leave"))
        .set_json(json!({ "nickname": "C" }))
        .to_request();
    let left: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(left["message"], "Left session");
    assert_eq!(left["session"]["players"][2]["state"], "left");

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{code}/end"))
        .to_request();
    let ended: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(ended["status"], "finished");
    assert!(ended["endedAt"].is_string());
}

#[actix_web::test]
async fn errors_are_problem_details() {
    let state = test_state().await;
    let code = started_game(&state, &["A", "B"]).await;
    let app = test_app!(state.clone());

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/sessions/ZZZZZZ").to_request(),
    )
    .await;
    assert_problem_details_from_service_response(
        resp,
        "SESSION_NOT_FOUND",
        StatusCode::NOT_FOUND,
        Some("ZZZZZZ"),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/sessions/no-such").to_request(),
    )
    .await;
    assert_problem_details_from_service_response(
        resp,
        "INVALID_SESSION_CODE",
        StatusCode::BAD_REQUEST,
        None,
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{code}/join"))
        .set_json(json!({ "nickname": "Late" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details_from_service_response(
        resp,
        "ALREADY_STARTED",
        StatusCode::BAD_REQUEST,
        None,
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{code}/entries"))
        .set_json(json!({
            "playerNickname": "A",
            "chainId": 1,
            "type": "prompt",
            "data": "wrong chain",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details_from_service_response(
        resp,
        "WRONG_CHAIN",
        StatusCode::BAD_REQUEST,
        None,
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/sessions/{code}/task/Nobody"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details_from_service_response(
        resp,
        "PLAYER_NOT_FOUND",
        StatusCode::NOT_FOUND,
        Some("Nobody"),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{code}/entries"))
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details_from_service_response(
        resp,
        "BAD_REQUEST",
        StatusCode::BAD_REQUEST,
        None,
    )
    .await;
}

#[actix_web::test]
async fn nickname_collisions_are_case_insensitive() {
    let state = test_state().await;
    let code = common::lobby(&state, &["Ana"]).await;
    let app = test_app!(state.clone());

    let req = test::TestRequest::post()
        .uri(&format!("/api/sessions/{code}/join"))
        .set_json(json!({ "nickname": "ANA" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details_from_service_response(
        resp,
        "NICKNAME_TAKEN",
        StatusCode::BAD_REQUEST,
        None,
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/sessions")
        .set_json(json!({ "nickname": "Ana", "maxPlayers": 50 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_details_from_service_response(
        resp,
        "INVALID_CONFIG",
        StatusCode::BAD_REQUEST,
        None,
    )
    .await;
}

#[actix_web::test]
async fn health_reports_database_and_migrations() {
    let state = test_state().await;
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "ok");
    assert!(body.get("db_error").is_none());
    assert_ne!(body["migrations"], "unknown");
}
