use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use flowgate_core::{AppError, CallerIdentity, TenantId};

use crate::error::ApiResult;
use crate::state::AppState;

pub const TENANT_ID_HEADER: &str = "x-tenant-id";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tenant scope optionally asserted by a provider callback.
#[derive(Debug, Clone, Copy)]
pub struct CallbackScope(pub Option<TenantId>);

/// Resolves the caller identity forwarded by the upstream gateway.
pub async fn require_caller(mut request: Request, next: Next) -> ApiResult<Response> {
    let caller = caller_from_headers(request.headers())?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Authenticates provider callbacks with the shared bearer secret.
pub async fn require_callback_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("callback credential required".to_owned()))?;

    if !constant_time_eq(token.as_bytes(), state.callback_shared_secret.as_bytes()) {
        return Err(AppError::Unauthorized("invalid callback credential".to_owned()).into());
    }

    let scope = header_value(request.headers(), TENANT_ID_HEADER)
        .map(str::parse::<TenantId>)
        .transpose()?;
    request.extensions_mut().insert(CallbackScope(scope));

    Ok(next.run(request).await)
}

pub fn caller_from_headers(headers: &HeaderMap) -> Result<CallerIdentity, AppError> {
    let tenant_id = header_value(headers, TENANT_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized("tenant context required".to_owned()))?
        .parse::<TenantId>()?;

    let user_id = header_value(headers, USER_ID_HEADER).map(str::to_owned);
    let roles = header_value(headers, USER_ROLES_HEADER)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Ok(CallerIdentity::new(tenant_id, user_id, roles))
}

pub fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    left.iter()
        .zip(right)
        .fold(0_u8, |difference, (a, b)| difference | (a ^ b))
        == 0
}
