//! Route definitions for the plate warehouse API
//!
//! Every protected route runs behind [`auth_middleware`] and declares the one
//! [`Capability`] its method requires.

use axum::{
    middleware,
    routing::{get, post, put, MethodRouter},
    Router,
};
use shared::Capability;

use crate::{
    handlers,
    middleware::{auth_middleware, authorize},
    AppState,
};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (login and register are public)
        .nest("/auth", auth_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/plates", plate_routes(state.clone()))
        .nest("/inventory", inventory_routes(state.clone()))
        .nest("/inbound", inbound_routes(state.clone()))
        .nest("/outbound", outbound_routes(state.clone()))
        .nest("/tasks", task_routes(state.clone()))
        .nest("/statistics", statistics_routes(state))
}

/// Gate one method router behind a capability
fn require(capability: Capability, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(capability, authorize))
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/login", post(handlers::login))
        .route("/register", post(handlers::register))
        .merge(protected)
}

/// User administration routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    use Capability::ManageUsers;

    Router::new()
        .route(
            "/",
            require(
                ManageUsers,
                get(handlers::list_users).post(handlers::create_user),
            ),
        )
        .route(
            "/:user_id",
            require(
                ManageUsers,
                get(handlers::get_user)
                    .put(handlers::update_user)
                    .delete(handlers::delete_user),
            ),
        )
        .route(
            "/:user_id/status",
            require(ManageUsers, put(handlers::update_user_status)),
        )
        .route(
            "/:user_id/reset-password",
            require(ManageUsers, post(handlers::reset_password)),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Plate catalog routes (protected)
fn plate_routes(state: AppState) -> Router<AppState> {
    use Capability::{ManageCatalog, ViewStock};

    Router::new()
        .route(
            "/",
            require(ViewStock, get(handlers::list_plates))
                .merge(require(ManageCatalog, post(handlers::create_plate))),
        )
        .route(
            "/:plate_id",
            require(ViewStock, get(handlers::get_plate)).merge(require(
                ManageCatalog,
                put(handlers::update_plate).delete(handlers::delete_plate),
            )),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Inventory ledger routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    use Capability::{CountInventory, ViewStock};

    Router::new()
        .route("/", require(ViewStock, get(handlers::list_inventory)))
        .route("/warnings", require(ViewStock, get(handlers::list_warnings)))
        .route(
            "/checks",
            require(ViewStock, get(handlers::list_checks))
                .merge(require(CountInventory, post(handlers::create_check))),
        )
        .route("/:inventory_id", require(ViewStock, get(handlers::get_inventory)))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Inbound routes (protected)
fn inbound_routes(state: AppState) -> Router<AppState> {
    use Capability::{ExportRecords, RecordInbound, ViewStock};

    Router::new()
        .route(
            "/",
            require(ViewStock, get(handlers::list_inbound))
                .merge(require(RecordInbound, post(handlers::create_inbound))),
        )
        .route("/export", require(ExportRecords, get(handlers::export_inbound)))
        .route("/:inbound_id", require(ViewStock, get(handlers::get_inbound)))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Outbound request and approval routes (protected)
fn outbound_routes(state: AppState) -> Router<AppState> {
    use Capability::{DecideOutbound, RequestOutbound, ViewStock};

    Router::new()
        .route(
            "/",
            require(ViewStock, get(handlers::list_outbound))
                .merge(require(RequestOutbound, post(handlers::create_outbound))),
        )
        .route("/:outbound_id", require(ViewStock, get(handlers::get_outbound)))
        .route(
            "/:outbound_id/approve",
            require(DecideOutbound, put(handlers::approve_outbound)),
        )
        .route(
            "/:outbound_id/reject",
            require(DecideOutbound, put(handlers::reject_outbound)),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Dispatch task routes (protected)
fn task_routes(state: AppState) -> Router<AppState> {
    use Capability::{ManageTasks, UpdateTaskStatus, ViewStock};

    Router::new()
        .route(
            "/",
            require(ViewStock, get(handlers::list_tasks))
                .merge(require(ManageTasks, post(handlers::create_task))),
        )
        .route(
            "/:task_id",
            require(ViewStock, get(handlers::get_task)).merge(require(
                ManageTasks,
                put(handlers::update_task).delete(handlers::delete_task),
            )),
        )
        .route(
            "/:task_id/status",
            require(UpdateTaskStatus, put(handlers::update_task_status)),
        )
        .route(
            "/:task_id/assign",
            require(ManageTasks, put(handlers::assign_task)),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Statistics routes (protected)
fn statistics_routes(state: AppState) -> Router<AppState> {
    use Capability::ViewStatistics;

    Router::new()
        .route("/overview", require(ViewStatistics, get(handlers::overview)))
        .route(
            "/inventory",
            require(ViewStatistics, get(handlers::inventory_statistics)),
        )
        .route("/trend", require(ViewStatistics, get(handlers::trend)))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
