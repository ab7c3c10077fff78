//! Route definitions for the Sales Tracker API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{
    handlers,
    middleware::{auth_middleware, require_admin},
    AppState,
};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public + protected)
        .nest("/auth", auth_routes(state.clone()))
        // Cron trigger (bearer secret, checked in the handler)
        .route("/cron/trigger", get(handlers::trigger_jobs))
        // Admin-only routes - user management
        .nest("/users", user_routes(state.clone()))
        // Protected routes - product catalog
        .nest("/products", product_routes(state.clone()))
        // Protected routes - customers
        .nest("/customers", customer_routes(state.clone()))
        // Protected routes - visits
        .nest("/visits", visit_routes(state.clone()))
        // Protected routes - dashboard
        .nest("/dashboard", dashboard_routes(state.clone()))
        // Protected routes - reports
        .nest("/reports", report_routes(state.clone()))
        // Admin-only routes - settings
        .nest("/settings", settings_routes(state.clone()))
        // Protected routes - push notifications
        .nest("/notifications", notification_routes(state))
}

/// Wrap a router so every route needs a valid token
fn protected(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ))
}

/// Wrap a router so every route needs an admin token
fn admin_only(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    // Layers run outermost-first: authentication, then the role check
    protected(router.route_layer(middleware::from_fn(require_admin)), state)
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login));

    let private = Router::new()
        .route("/user", get(handlers::get_current_user))
        .route("/sales-users", get(handlers::list_sales_users));

    public.merge(protected(private, &state))
}

/// User management routes (admin)
fn user_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:user_id",
            put(handlers::update_user).delete(handlers::delete_user),
        );
    admin_only(router, &state)
}

/// Product routes: reads for everyone signed in, writes for admins
fn product_routes(state: AppState) -> Router<AppState> {
    let read = Router::new()
        .route("/", get(handlers::list_products))
        .route("/:product_id", get(handlers::get_product));

    let write = Router::new()
        .route("/", post(handlers::create_product))
        .route(
            "/:product_id",
            put(handlers::update_product).delete(handlers::delete_product),
        );

    protected(read, &state).merge(admin_only(write, &state))
}

/// Customer routes
fn customer_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route(
            "/",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route(
            "/:customer_id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        );
    protected(router, &state)
}

/// Visit routes
fn visit_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/", get(handlers::list_visits).post(handlers::create_visit))
        .route("/:visit_id", get(handlers::get_visit))
        .route(
            "/customer/:customer_id/last",
            get(handlers::last_visit_for_customer),
        )
        .route(
            "/last-stock/:customer_id/:product_id",
            get(handlers::last_stock),
        );
    protected(router, &state)
}

/// Dashboard routes
fn dashboard_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/summary", get(handlers::dashboard_summary))
        .route("/top-customers", get(handlers::top_customers))
        .route("/top-products", get(handlers::top_products))
        .route("/top-sales", get(handlers::top_sales))
        .route("/active-consignments", get(handlers::active_consignments))
        .route(
            "/inactive-consignments",
            get(handlers::inactive_consignments),
        );
    protected(router, &state)
}

/// Report routes
fn report_routes(state: AppState) -> Router<AppState> {
    let any_user = Router::new().route("/sales-performance", get(handlers::sales_performance));

    let admin = Router::new()
        .route("/product-stock", get(handlers::product_stock))
        .route("/visits-by-date", get(handlers::visits_by_date));

    protected(any_user, &state).merge(admin_only(admin, &state))
}

/// Settings routes (admin)
fn settings_routes(state: AppState) -> Router<AppState> {
    let router = Router::new().route(
        "/",
        get(handlers::get_settings).put(handlers::update_settings),
    );
    admin_only(router, &state)
}

/// Push notification routes
fn notification_routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/subscribe", post(handlers::subscribe))
        .route("/test-push", post(handlers::test_push));
    protected(router, &state)
}
