use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, Validation};

use crate::{
    constants::JWT_AUDIENCE, errors::HandlerError, models::auth::Claim, state::AppState,
};

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, HandlerError> {
    let header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| HandlerError::Forbidden("Invalid authorization header.".to_string()))?
        .to_str()
        .map_err(|e| {
            HandlerError::Forbidden(format!(
                "Failed to down cast header value to string: {}",
                e
            ))
        })?;
    // token should be "Bearer ..."
    let mut it = header.split_whitespace();
    let (_, token_str) = (it.next(), it.next());
    let token = token_str.ok_or_else(|| HandlerError::Forbidden("Empty token value".to_string()))?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[JWT_AUDIENCE]);
    let data = jsonwebtoken::decode::<Claim>(token, &state.jwt.1, &validation)
        .map_err(|e| HandlerError::Forbidden(format!("Failed to decode JWT token: {}", e)))?;
    req.extensions_mut().insert(data.claims);

    Ok(next.run(req).await)
}
