use actix_web::{web, App, HttpServer};
use telephone::config::app::Config;
use telephone::extractors::validated_json::BodyLimit;
use telephone::infra::state::build_state;
use telephone::middleware::cors::cors_middleware;
use telephone::middleware::request_trace::RequestTrace;
use telephone::middleware::structured_logger::StructuredLogger;
use telephone::middleware::trace_span::TraceSpan;
use telephone::routes;
use telephone::services::reaper::spawn_reaper;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment
    // (docker env_file, or `set -a; . ./.env; set +a` locally).
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let app_state = match build_state()
        .with_env(config.runtime_env)
        .with_db(config.db_kind)
        .with_settings(config.game.clone())
        .build()
        .await
    {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to build application state");
            std::process::exit(1);
        }
    };
    info!(db = ?config.db_kind, "database connected and migrated");

    let shutdown = CancellationToken::new();
    let reaper = spawn_reaper(
        app_state.sessions().clone(),
        config.game.reaper_interval,
        config.game.finished_retention,
        shutdown.clone(),
    );

    let disconnects = app_state.disconnects().clone();
    let data = web::Data::new(app_state);
    let body_limit = BodyLimit(config.max_json_payload_size);

    info!(host = %config.host, port = config.port, "starting telephone backend");

    HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware())
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data.clone())
            .app_data(body_limit)
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    shutdown.cancel();
    disconnects.shutdown();
    let _ = reaper.await;
    Ok(())
}
