use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::PolicyEvaluator;
use crate::db::SqliteIdentityStore;
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{authz, health, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub identities: Arc<SqliteIdentityStore>,
    pub policy: PolicyEvaluator,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        let identities = Arc::new(SqliteIdentityStore::new(pool.clone()));
        let policy = PolicyEvaluator::new(identities.clone());
        Self {
            pool,
            jwt: Arc::new(jwt),
            identities,
            policy,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    Ok(router(AppState::new(pool, jwt_config)))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let authz_routes = Router::new()
        .route("/me", get(authz::me))
        .route("/check", post(authz::check));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/api/authz", authz_routes)
        .route("/api/users", get(users::list_users))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
