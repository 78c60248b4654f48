use axum::{extract::Request, middleware::Next, response::IntoResponse};
use lambda_http::{request::RequestContext, tracing};

use crate::models::auth::Claim;

pub mod auth;

/// Logs who is calling which path. Runs after `auth_middleware` on protected
/// routes, so the caller id is known there.
pub async fn trace_client(req: Request, next: Next) -> impl IntoResponse {
    let source_ip = match req.extensions().get::<RequestContext>() {
        Some(RequestContext::ApiGatewayV2(v2ctx)) => v2ctx
            .http
            .source_ip
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        _ => "local".to_string(),
    };
    let caller = req
        .extensions()
        .get::<Claim>()
        .map_or("anonymous", |c| c.id.as_str());
    tracing::info!(
        "{} ({}) -> {} {}",
        source_ip,
        caller,
        req.method(),
        req.uri().path()
    );
    next.run(req).await
}
