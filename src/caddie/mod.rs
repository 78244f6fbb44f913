#![allow(clippy::needless_for_each)]

pub mod config;
pub mod guard;
pub mod handlers;
pub mod routes;

#[allow(unused_imports)]
use self::handlers::{
    health, health::__path_health, logout::__path_logout, proxy::__path_proxy,
};
use self::{config::GateConfig, guard::EdgeGuard, handlers::proxy::Upstream};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::Extension,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    services::{ServeDir, ServeFile},
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(OpenApi)]
#[openapi(
    paths(health, logout, proxy),
    components(
        schemas(health::Health)
    ),
    tags(
        (name = "caddie", description = "Session gate and API proxy"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the application router.
///
/// Every request passes the edge guard; the guard itself skips API and asset
/// paths. Anything not routed here is served from the frontend build.
/// # Errors
/// Returns an error if the upstream HTTP client cannot be built.
pub fn router(config: GateConfig) -> Result<Router> {
    let edge = Arc::new(EdgeGuard::new(&config));
    let upstream = Arc::new(Upstream::new(config.backend_url().clone())?);

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT])
        // allow requests from any origin
        .allow_origin(Any);

    let api = Router::new()
        .route("/api/v1/*path", any(handlers::proxy))
        .layer(cors);

    let frontend = ServeDir::new(config.frontend_dir())
        .fallback(ServeFile::new(config.frontend_dir().join("index.html")));

    let config = Arc::new(config);

    let app = Router::new()
        .merge(api)
        .route("/logout", get(handlers::logout).post(handlers::logout))
        .route("/health", get(handlers::health).options(handlers::health))
        .fallback_service(frontend)
        .layer(middleware::from_fn_with_state(edge, guard::edge_guard))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(config))
                .layer(Extension(upstream)),
        );

    Ok(app)
}

/// Serve the gate until Ctrl-C or SIGTERM.
/// # Errors
/// Returns an error if the router cannot be built or the listener fails.
pub async fn new(port: u16, config: GateConfig) -> Result<()> {
    let app = router(config)?;

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

// span; headers are left out since they carry the session cookies
fn make_span(request: &Request<Body>) -> Span {
    let path = request.uri().path();
    let method = request.method().as_str();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", method, path, request_id)
}
