use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::session::GameSession;
use crate::errors::domain::{DomainError, ValidationKind};
use crate::state::app_state::AppState;
use crate::trace_ctx;
use crate::utils::join_code::normalize_code;
use crate::ws::hub::{Binding, WsRegistry};
use crate::ws::protocol::{ClientMsg, ErrorCode, RoomEvent, ServerMsg, PROTOCOL_VERSION};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let conn_id = Uuid::new_v4();
    let registry = app_state.websocket_registry();
    let session = WsSession::new(conn_id, app_state, registry);
    ws::start(session, &req, stream)
}

/// Bind a connection to a roster identity and cancel any grace timer the
/// identity's previous connection left behind.
pub fn bind_connection(app_state: &AppState, conn_id: Uuid, code: &str, nickname: &str) {
    app_state.websocket_registry().bind(conn_id, code, nickname);
    if app_state.disconnects().cancel(code, nickname) {
        info!(code, nickname, "[WS SESSION] reconnected within grace period");
    }
}

/// Drop a closed connection. Only the connection that still owns its
/// identity starts a grace timer; a superseded one just goes away.
pub fn release_connection(app_state: &AppState, conn_id: Uuid) {
    let Some(unbound) = app_state.websocket_registry().unregister_connection(conn_id) else {
        return;
    };
    if unbound.was_owner {
        app_state
            .disconnects()
            .arm(&unbound.binding.code, &unbound.binding.nickname);
    } else {
        debug!(
            code = %unbound.binding.code,
            nickname = %unbound.binding.nickname,
            "[WS SESSION] superseded connection closed"
        );
    }
}

/// Pre-serialized room event delivered by the registry.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub enum HubEvent {
    Frame(Arc<str>),
}

pub struct WsSession {
    conn_id: Uuid,
    app_state: web::Data<AppState>,
    registry: Arc<WsRegistry>,
    last_heartbeat: Instant,
    hello_done: bool,
}

impl WsSession {
    fn new(conn_id: Uuid, app_state: web::Data<AppState>, registry: Arc<WsRegistry>) -> Self {
        Self {
            conn_id,
            app_state,
            registry,
            last_heartbeat: Instant::now(),
            hello_done: false,
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "[WS SESSION] failed to serialize outbound message"),
        }
    }

    fn send_error(ctx: &mut ws::WebsocketContext<Self>, code: ErrorCode, message: impl Into<String>) {
        Self::send_json(
            ctx,
            &ServerMsg::Error {
                code,
                message: message.into(),
            },
        );
    }

    fn send_error_and_close(
        &self,
        ctx: &mut ws::WebsocketContext<Self>,
        code: ErrorCode,
        message: impl Into<String>,
    ) {
        Self::send_error(ctx, code, message);
        ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
        ctx.stop();
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(conn_id = %actor.conn_id, "[WS SESSION] heartbeat timed out");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }

    fn require_hello(&self, ctx: &mut ws::WebsocketContext<Self>) -> bool {
        if !self.hello_done {
            self.send_error_and_close(ctx, ErrorCode::BadRequest, "Must send hello first");
        }
        self.hello_done
    }

    fn join_room(&mut self, code: String, nickname: String, ctx: &mut ws::WebsocketContext<Self>) {
        let code = match normalize_code(&code) {
            Ok(code) => code,
            Err(err) => {
                Self::send_error(ctx, ErrorCode::JoinRejected, err.to_string());
                return;
            }
        };

        let app_state = self.app_state.clone();
        let lookup_code = code.clone();
        let lookup = async move {
            let session = app_state.sessions().get(&lookup_code).await?;
            let player = session
                .player(&nickname)
                .ok_or_else(|| DomainError::player_not_found(&nickname))?;
            if player.is_left() {
                return Err(DomainError::validation(
                    ValidationKind::PlayerLeft,
                    format!("Player '{}' has left the session", player.nickname),
                ));
            }
            let nickname = player.nickname.clone();
            Ok::<(String, GameSession), DomainError>((nickname, session))
        };
        ctx.spawn(
            trace_ctx::with_trace_id(trace_ctx::new_trace_id(), lookup)
                .into_actor(self)
                .map(move |res, actor, ctx| match res {
                    Ok((nickname, session)) => {
                        bind_connection(&actor.app_state, actor.conn_id, &code, &nickname);
                        info!(conn_id = %actor.conn_id, code = %code, nickname = %nickname, "[WS SESSION] joined room");
                        Self::send_json(
                            ctx,
                            &ServerMsg::Joined {
                                code,
                                nickname,
                                session,
                            },
                        );
                    }
                    Err(err) => {
                        debug!(conn_id = %actor.conn_id, code = %code, error = %err, "[WS SESSION] join rejected");
                        Self::send_error(ctx, ErrorCode::JoinRejected, err.to_string());
                    }
                }),
        );
    }

    fn relay(&self, ctx: &mut ws::WebsocketContext<Self>, build: impl FnOnce(String) -> RoomEvent) {
        let Some(Binding { code, .. }) = self.registry.binding(self.conn_id) else {
            Self::send_error(ctx, ErrorCode::NotInRoom, "Join a room first");
            return;
        };
        let event = build(code.clone());
        self.app_state
            .realtime()
            .publish_except(&code, self.conn_id, &event);
    }

    fn handle_text(&mut self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let Ok(cmd) = serde_json::from_str::<ClientMsg>(text) else {
            self.send_error_and_close(ctx, ErrorCode::BadRequest, "Malformed JSON");
            return;
        };

        match cmd {
            ClientMsg::Hello { protocol } => {
                if protocol != PROTOCOL_VERSION {
                    self.send_error_and_close(
                        ctx,
                        ErrorCode::BadProtocol,
                        "Unsupported protocol version",
                    );
                    return;
                }
                self.hello_done = true;
                Self::send_json(
                    ctx,
                    &ServerMsg::HelloAck {
                        protocol: PROTOCOL_VERSION,
                        conn_id: self.conn_id.to_string(),
                    },
                );
            }
            ClientMsg::JoinRoom { code, nickname } => {
                if self.require_hello(ctx) {
                    self.join_room(code, nickname, ctx);
                }
            }
            ClientMsg::LeaveRoom => {
                if !self.require_hello(ctx) {
                    return;
                }
                // Leaving the room channel is not a departure from the game.
                self.registry.unbind(self.conn_id);
                Self::send_json(ctx, &ServerMsg::Ack { message: "left_room" });
            }
            ClientMsg::RevealNext {
                chain_index,
                entry_index,
            } => {
                if self.require_hello(ctx) {
                    self.relay(ctx, |code| RoomEvent::RevealNext {
                        code,
                        chain_index,
                        entry_index,
                    });
                }
            }
            ClientMsg::RevealReset => {
                if self.require_hello(ctx) {
                    self.relay(ctx, |code| RoomEvent::RevealReset { code });
                }
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.conn_id, "[WS SESSION] started");
        let recipient = ctx.address().recipient::<HubEvent>();
        self.registry.register_connection(self.conn_id, recipient);
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        release_connection(&self.app_state, self.conn_id);
        info!(conn_id = %self.conn_id, "[WS SESSION] stopped");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                self.handle_text(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                self.send_error_and_close(ctx, ErrorCode::BadRequest, "Binary not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(conn_id = %self.conn_id, error = %err, "[WS SESSION] protocol error");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}

impl Handler<HubEvent> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: HubEvent, ctx: &mut Self::Context) -> Self::Result {
        match msg {
            HubEvent::Frame(frame) => ctx.text(&*frame),
        }
    }
}
