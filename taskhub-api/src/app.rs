/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskhub_api::{app::AppState, config::Config};
/// use taskhub_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskhub_shared::store::postgres::PgStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config);
/// let app = taskhub_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use taskhub_shared::auth::middleware::resolve_actor;
use taskhub_shared::store::EntityStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Entity store (PostgreSQL in production, in-memory in tests)
    pub store: Arc<dyn EntityStore>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn EntityStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                         # Health check (public)
/// └── /v1/                            # API v1, every request gets an Actor
///     ├── /auth/token                 # POST: credentials -> token pair
///     ├── /auth/token/refresh         # POST: refresh -> access
///     ├── /users                      # GET (admin), POST (anyone)
///     │   ├── /me                     # GET
///     │   ├── /update_profile         # PUT, PATCH
///     │   └── /:id                    # GET, PUT, PATCH, DELETE
///     ├── /categories                 # GET, POST (manager/admin)
///     │   └── /:id                    # GET, PUT, PATCH, DELETE
///     ├── /tasks                      # GET, POST
///     │   ├── /my_tasks               # GET
///     │   ├── /created_tasks          # GET
///     │   └── /:id                    # GET, PUT, PATCH, DELETE
///     └── /comments                   # GET, POST
///         └── /:id                    # GET, PUT, PATCH, DELETE
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Actor resolution (`/v1` only)
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{auth, categories, comments, health, tasks, users};

    let health_routes = Router::new().route("/health", get(health::health_check));

    let auth_routes = Router::new()
        .route("/token", post(auth::obtain_token))
        .route("/token/refresh", post(auth::refresh_token));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/me", get(users::me))
        .route(
            "/update_profile",
            put(users::update_profile).patch(users::update_profile),
        )
        .route(
            "/:id",
            get(users::get_user)
                .put(users::replace_user)
                .patch(users::patch_user)
                .delete(users::delete_user),
        );

    let category_routes = Router::new()
        .route(
            "/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/:id",
            get(categories::get_category)
                .put(categories::replace_category)
                .patch(categories::patch_category)
                .delete(categories::delete_category),
        );

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route("/my_tasks", get(tasks::my_tasks))
        .route("/created_tasks", get(tasks::created_tasks))
        .route(
            "/:id",
            get(tasks::get_task)
                .put(tasks::replace_task)
                .patch(tasks::patch_task)
                .delete(tasks::delete_task),
        );

    let comment_routes = Router::new()
        .route(
            "/",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/:id",
            get(comments::get_comment)
                .put(comments::replace_comment)
                .patch(comments::patch_comment)
                .delete(comments::delete_comment),
        );

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/categories", category_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            actor_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Actor resolution layer
///
/// Resolves the `Authorization` header against the store and inserts the
/// resulting `Actor` into request extensions. Missing header means anonymous;
/// a header that doesn't resolve is rejected with 401.
async fn actor_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = req.headers().clone();
    let actor = resolve_actor(state.store.as_ref(), &headers, state.jwt_secret()).await?;

    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}
