//! HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! Route composition lives here to keep `main` small and testable. Every
//! route can be mounted under a deployment-specific prefix.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::auth::policy::AdminAllowlist;
use crate::config::BootstrapConfig;
use crate::identity::IdentityProvider;
use crate::notify::{NotificationDispatcher, Notifier};
use crate::observability;
use crate::service::accounts::AccountService;
use crate::service::articles::ArticleService;
use crate::service::bookings::BookingService;
use crate::store::KvStore;
use axum::Router;
use axum::http::{HeaderName, Method, header};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KvStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub notifications: NotificationDispatcher,
    pub bookings: BookingService,
    pub accounts: AccountService,
    pub articles: ArticleService,
    pub bootstrap: BootstrapConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn KvStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        allowlist: AdminAllowlist,
        bootstrap: BootstrapConfig,
    ) -> Self {
        let notifications = NotificationDispatcher::new(notifier);
        Self {
            bookings: BookingService::new(store.clone(), allowlist.clone(), notifications.clone()),
            accounts: AccountService::new(identity.clone(), notifications.clone()),
            articles: ArticleService::new(store.clone(), allowlist),
            store,
            identity,
            notifications,
            bootstrap,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    build_router_with_prefix(state, "")
}

/// Router with every route nested under `prefix` (`""` mounts at the root).
pub fn build_router_with_prefix(state: AppState, prefix: &str) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    let routes = Router::new()
        .route("/health", axum::routing::get(api::system::system_health))
        .route("/info", axum::routing::get(api::system::system_info))
        .route("/signup", axum::routing::post(api::accounts::sign_up))
        .route("/token", axum::routing::post(api::accounts::sign_in))
        .route(
            "/bookings",
            axum::routing::get(api::bookings::list_bookings).post(api::bookings::create_booking),
        )
        .route(
            "/bookings/:booking_id",
            axum::routing::get(api::bookings::get_booking)
                .patch(api::bookings::update_booking_status),
        )
        .route(
            "/blog/articles",
            axum::routing::get(api::articles::list_articles).post(api::articles::create_article),
        )
        .route(
            "/blog/articles/:article_id",
            axum::routing::get(api::articles::get_article)
                .put(api::articles::update_article)
                .delete(api::articles::delete_article),
        )
        .route(
            "/create-admin",
            axum::routing::post(api::bootstrap::create_admin),
        )
        .route(
            "/update-admin",
            axum::routing::put(api::bootstrap::update_admin),
        );

    let routes = if prefix.is_empty() {
        routes
    } else {
        Router::new().nest(prefix, routes)
    };

    routes
        .merge(utoipa_swagger_ui::SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer())
        .layer(trace_layer)
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-bootstrap-token"),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .max_age(Duration::from_secs(600))
}
