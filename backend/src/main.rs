mod constants;
mod errors;
mod middlewares;
mod models;
mod routes;
mod services;
mod state;
mod store;
mod utils;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use lambda_http::{run, tracing, Error};
use middlewares::{auth::auth_middleware, trace_client};
use state::{AppState, Config};
use tower_http::trace::TraceLayer;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_axum::router::OpenApiRouter;

#[derive(OpenApi)]
#[openapi(
    info(title = "agri-market-rs", description = "Farmer-to-buyer produce marketplace"),
    modifiers(&SecurityAddon),
    tags(
        (name = "Market", description = "Anonymous listing browsing"),
        (name = "Listing", description = "Seller listing lifecycle"),
        (name = "Bid", description = "Bidding and bid acceptance"),
        (name = "Transaction", description = "Settlement records"),
        (name = "Admin", description = "Maintenance"),
    ),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "http-jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> (StatusCode, String) {
    (
        StatusCode::OK,
        format!("Healthy! ({} store)", state.store.backend_tag()),
    )
}

pub async fn create_service(state: Arc<AppState>) -> Result<Router, Error> {
    let (protected, protected_api) = OpenApiRouter::new()
        .merge(routes::listing::router())
        .merge(routes::bid::router())
        .merge(routes::transaction::router())
        .merge(routes::admin::router())
        .split_for_parts();
    // Later route layers run first: authenticate, then trace the caller.
    let protected = protected
        .route_layer(middleware::from_fn(trace_client))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let (public, mut api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes::listing::public_router())
        .split_for_parts();
    let public = public.route_layer(middleware::from_fn(trace_client));
    api.merge(protected_api);

    let trace_layer =
        TraceLayer::new_for_http().on_request(|req: &Request<Body>, _: &tracing::Span| {
            let path = req.uri().path();
            tracing::info!("Got request with path: {}", path);
        });

    let app = Router::new()
        .route("/v1/health", get(health_check))
        .route(
            "/v1/openapi.json",
            get(move || {
                let api = api.clone();
                async move { Json(api) }
            }),
        )
        .merge(public)
        .merge(protected)
        .layer(trace_layer)
        .with_state(state);

    Ok(app)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    tracing::info!("API Handler Start!!!");

    let config = Config::from_env()?;
    let state = Arc::new(AppState::new(config).await?);
    let app = create_service(state).await?;

    run(app).await
}
