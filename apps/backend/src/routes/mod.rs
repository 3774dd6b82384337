use actix_web::web;

pub mod health;
pub mod realtime;
pub mod sessions;

/// Register every route. `main.rs` wraps this with the middleware stack;
/// tests mount it directly.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Health check: /health
    cfg.service(web::scope("/health").configure(health::configure_routes));

    // Sessions: /api/sessions/**
    cfg.service(web::scope("/api/sessions").configure(sessions::configure_routes));

    // Realtime: /api/ws
    cfg.service(web::scope("/api/ws").configure(realtime::configure_routes));
}
