//! Session HTTP routes: `/api/sessions/**`.

use actix_web::{web, HttpResponse, Result};
use serde::Deserialize;

use crate::domain::session::TaskType;
use crate::error::AppError;
use crate::extractors::session_code::SessionCode;
use crate::extractors::validated_json::ValidatedJson;
use crate::services::sessions::{NewEntry, NewSession};
use crate::state::app_state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub nickname: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub total_rounds: Option<u32>,
    #[serde(default)]
    pub max_players: Option<u32>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinSessionRequest {
    pub nickname: String,
    #[serde(default)]
    pub account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitEntryRequest {
    pub player_nickname: String,
    pub chain_id: usize,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Prompt text or encoded drawing. Older clients send drawings as `file`.
    #[serde(alias = "file")]
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaveSessionRequest {
    pub nickname: String,
}

#[derive(Debug, Deserialize)]
struct TaskPath {
    nickname: String,
}

/// POST /api/sessions
async fn create_session(
    body: ValidatedJson<CreateSessionRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let session = app_state
        .sessions()
        .create(NewSession {
            host_nickname: body.nickname,
            account_id: body.account_id,
            total_rounds: body.total_rounds,
            max_players: body.max_players,
            mode: body.mode,
        })
        .await?;
    Ok(HttpResponse::Created().json(session))
}

/// GET /api/sessions/{code}
async fn get_session(
    code: SessionCode,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let session = app_state.sessions().get(code.as_str()).await?;
    Ok(HttpResponse::Ok().json(session))
}

/// POST /api/sessions/{code}/join
async fn join_session(
    code: SessionCode,
    body: ValidatedJson<JoinSessionRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let session = app_state
        .sessions()
        .join(code.as_str(), &body.nickname, body.account_id)
        .await?;
    Ok(HttpResponse::Ok().json(session))
}

/// POST /api/sessions/{code}/start
async fn start_session(
    code: SessionCode,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let started = app_state.sessions().start(code.as_str()).await?;
    Ok(HttpResponse::Ok().json(started))
}

/// GET /api/sessions/{code}/task/{nickname}
async fn get_task(
    code: SessionCode,
    path: web::Path<TaskPath>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let task = app_state
        .sessions()
        .task(code.as_str(), &path.nickname)
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// POST /api/sessions/{code}/entries
async fn submit_entry(
    code: SessionCode,
    body: ValidatedJson<SubmitEntryRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let result = app_state
        .sessions()
        .submit(
            code.as_str(),
            NewEntry {
                player_nickname: body.player_nickname,
                chain_id: body.chain_id,
                task_type: body.task_type,
                data: body.data,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// POST /api/sessions/{code}/leave
async fn leave_session(
    code: SessionCode,
    body: ValidatedJson<LeaveSessionRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let result = app_state
        .sessions()
        .leave(code.as_str(), &body.nickname)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// POST /api/sessions/{code}/end
async fn end_session(
    code: SessionCode,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let session = app_state.sessions().end(code.as_str()).await?;
    Ok(HttpResponse::Ok().json(session))
}

/// GET /api/sessions/{code}/results
async fn get_results(
    code: SessionCode,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let results = app_state.sessions().results(code.as_str()).await?;
    Ok(HttpResponse::Ok().json(results))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::post().to(create_session)))
        .service(web::resource("/{code}").route(web::get().to(get_session)))
        .service(web::resource("/{code}/join").route(web::post().to(join_session)))
        .service(web::resource("/{code}/start").route(web::post().to(start_session)))
        .service(web::resource("/{code}/task/{nickname}").route(web::get().to(get_task)))
        .service(web::resource("/{code}/entries").route(web::post().to(submit_entry)))
        .service(web::resource("/{code}/leave").route(web::post().to(leave_session)))
        .service(web::resource("/{code}/end").route(web::post().to(end_session)))
        .service(web::resource("/{code}/results").route(web::get().to(get_results)));
}
