//! `request` span for every HTTP call, tagged with the room it targets.
//!
//! Must sit inside `RequestTrace` (registered before it with `.wrap`) so
//! the `TraceId` extension exists when the span is opened.

use std::future::{ready, Ready};

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use futures_util::future::LocalBoxFuture;
use tracing::{field, info_span, Instrument};

use crate::middleware::request_trace::TraceId;

/// `/api/sessions/{code}/...` → `{code}`, upper-cased the way codes are stored.
fn room_from_path(path: &str) -> Option<String> {
    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some("api"), Some("sessions"), Some(code)) if !code.is_empty() => {
            Some(code.to_ascii_uppercase())
        }
        _ => None,
    }
}

#[derive(Clone, Default)]
pub struct TraceSpan;

impl<S, B> Transform<S, ServiceRequest> for TraceSpan
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceSpanService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceSpanService { inner: service }))
    }
}

pub struct TraceSpanService<S> {
    inner: S,
}

impl<S, B> Service<ServiceRequest> for TraceSpanService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(inner);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trace_id = req.extensions().get::<TraceId>().map(|t| t.0.clone());
        let span = info_span!(
            "request",
            trace_id = trace_id.as_deref().unwrap_or("untraced"),
            method = %req.method(),
            path = %req.path(),
            room = field::Empty,
        );
        if let Some(room) = room_from_path(req.path()) {
            span.record("room", room.as_str());
        }

        Box::pin(self.inner.call(req).instrument(span))
    }
}
