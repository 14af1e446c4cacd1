//! # ispeco_api
//!
//! HTTP API library for ISPECO.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use ispeco_core::access::store::PgAccessStore;
use ispeco_core::secrets::{CodecError, SecretCodec};
use ispeco_core::stream::StreamGate;
use ispeco_core::stream::ffmpeg::FfmpegOpener;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{auth, cameras, health, live_stream, user_access, users};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    /// Access control storage.
    pub store: Arc<PgAccessStore>,
    /// Camera credential codec, absent when no key is configured.
    pub codec: Option<Arc<SecretCodec>>,
    /// Live relay gate.
    pub gate: StreamGate,
}

impl AppState {
    /// Build the state, loading the codec key once.
    pub fn new(pool: PgPool, config: ApiConfig) -> Self {
        let codec = SecretCodec::from_config(config.encryption_key.as_deref())
            .ok()
            .map(Arc::new);
        let store = Arc::new(PgAccessStore::new(pool.clone()));
        let gate = StreamGate::new(
            store.clone(),
            codec.clone(),
            Arc::new(FfmpegOpener::new(config.ffmpeg_path.clone())),
            config.stream.clone(),
        );
        Self {
            pool,
            config,
            store,
            codec,
            gate,
        }
    }

    /// The configured codec, or `KeyMissing`.
    pub fn codec(&self) -> Result<&SecretCodec, CodecError> {
        self.codec.as_deref().ok_or(CodecError::KeyMissing)
    }
}

/// Run embedded database migrations.
///
/// Delegates to `ispeco_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    ispeco_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required). The relay authenticates itself so it
    // can reject with a WebSocket close code instead of an HTTP status.
    let public = Router::new()
        .route(routes::GET_API_HEALTH, get(health::health_handler))
        .route(routes::POST_AUTH_REGISTER, post(auth::register_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(routes::WS_LIVE_STREAM, get(live_stream::live_stream_handler));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::POST_AUTH_LOGOUT_ALL, post(auth::logout_all_handler))
        .route(
            routes::USERS_ME,
            get(users::get_me_handler).patch(users::update_me_handler),
        )
        .route(
            routes::POST_USERS_ME_PASSWORD,
            post(users::change_password_handler),
        )
        .route(
            routes::CAMERAS,
            get(cameras::list_cameras_handler).post(cameras::create_camera_handler),
        )
        .route(
            routes::GET_CAMERAS_SHARED,
            get(cameras::list_shared_cameras_handler),
        )
        .route(
            routes::CAMERAS_ID,
            get(cameras::get_camera_handler)
                .patch(cameras::update_camera_handler)
                .delete(cameras::delete_camera_handler),
        )
        .route(routes::GET_CAMERAS_ID_URL, get(cameras::camera_url_handler))
        .route(
            routes::GET_CAMERAS_ID_PASSWORD,
            get(cameras::camera_password_handler),
        )
        .route(
            routes::CAMERAS_ID_SETUP,
            get(cameras::get_camera_setup_handler)
                .put(cameras::put_camera_setup_handler)
                .delete(cameras::delete_camera_setup_handler),
        )
        .route(
            routes::USER_ACCESS,
            get(user_access::list_user_access_handler)
                .post(user_access::create_user_access_handler),
        )
        .route(
            routes::USER_ACCESS_ID,
            get(user_access::get_user_access_handler)
                .patch(user_access::update_user_access_handler)
                .delete(user_access::delete_user_access_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}
