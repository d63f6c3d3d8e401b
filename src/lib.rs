mod authentication;
pub mod config;
mod data_formats;
mod db_helpers;
mod errors;
mod handlers;
mod models;
pub mod store;

use std::{future::Future, net::TcpListener, sync::Arc};

use anyhow::Context;
pub use anyhow::Result;
use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method, StatusCode,
};
use axum::{routing::*, Extension, Json, Router};
pub use data_formats::*;
pub use errors::RequestErrorJson;
use handlers::*;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use authentication::AuthService;
use config::Config;
use store::Store;

pub type JsonResponse<T> = (StatusCode, Json<T>);

/// Shared by every request: the data store and the token service.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(store: Store, auth: AuthService) -> Self {
        AppState {
            store,
            auth: Arc::new(auth),
        }
    }
}

pub async fn run_app(config: Config) -> Result<()> {
    let store = Store::connect(&config.database).await?;
    let state = AppState::new(store.clone(), AuthService::new(&config.auth));
    let router = make_router(state, &config.cors_origins)?;

    let address = config.socket_addr()?;
    let listener =
        TcpListener::bind(address).with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server started on {}", address);

    let result = serve(listener, router, shutdown_signal()).await;
    store.close().await;
    result
}

pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    axum::Server::from_tcp(listener)?
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

pub fn make_router(state: AppState, cors_origins: &[String]) -> Result<Router> {
    let origins = cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid CORS origin")?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let router = Router::new()
        .route("/check_health", get(alive))
        .route("/auth/register", post(register_user))
        .route("/auth/login", post(login_user))
        .route("/users/me", get(get_current_user).delete(delete_current_user))
        .route("/questions", get(list_questions).post(create_question))
        .route(
            "/questions/:id",
            get(get_question).put(update_question).delete(delete_question),
        )
        .route("/answers", post(create_answer))
        // GET takes a question id, PUT and DELETE an answer id.
        .route(
            "/answers/:id",
            get(list_answers).put(update_answer).delete(delete_answer),
        )
        .fallback(not_found)
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);
    Ok(router)
}
