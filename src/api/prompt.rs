//! Prompt relay endpoint
//!
//! Validates the prompt and the presented key, charges the key's quota and
//! forwards the prompt to the upstream text API.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use tracing::{error, info, warn};

use crate::{
    models::{token_prefix, KeyValidation, PromptRequest, RelayData, StandardResponse},
    utils::{
        validation::{check_prompt, PromptCheck},
        AppError, AppResult,
    },
    AppState,
};

/// `POST /prompt` with a JSON body
pub async fn relay_prompt_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<PromptRequest>, JsonRejection>,
) -> AppResult<Json<StandardResponse>> {
    let Json(request) = body.map_err(|e| AppError::validation(e.body_text()))?;
    relay(&state, request, bearer_token(&headers)).await.map(Json)
}

/// `GET /prompt?text=&api_key=`
pub async fn relay_prompt_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PromptRequest>, QueryRejection>,
) -> AppResult<Json<StandardResponse>> {
    let Query(request) = query.map_err(|e| AppError::validation(e.body_text()))?;
    relay(&state, request, bearer_token(&headers)).await.map(Json)
}

/// Token from an `Authorization: Bearer` header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

async fn relay(
    state: &AppState,
    request: PromptRequest,
    header_token: Option<String>,
) -> AppResult<StandardResponse> {
    match check_prompt(&request.text, state.config.relay.max_prompt_chars) {
        PromptCheck::Empty => return Ok(StandardResponse::greeting()),
        PromptCheck::TooLong { chars, max } => {
            return Err(AppError::validation(format!(
                "Prompt is {} characters long, the maximum is {}",
                chars, max
            )))
        }
        PromptCheck::Ok => {}
    }

    let token = header_token
        .or_else(|| {
            request
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
        .ok_or_else(|| AppError::unauthorized("API key required"))?;

    let key = match state.keys.validate(&token).await? {
        KeyValidation::Valid(key) => key,
        KeyValidation::Rejected(reason) => {
            info!(token = %token_prefix(&token), reason = %reason, "Rejected relay request");
            return Err(AppError::unauthorized("Invalid API key"));
        }
    };

    let limit = state.config.relay.rate_limit_requests;
    let window = state.config.relay.rate_limit_window();
    if !state.rate_limiter.allow(&key.token, limit, window).await {
        let retry_after_secs = state.rate_limiter.retry_after(&key.token, window).await;
        warn!(
            token = %key.token_prefix(),
            limit = limit,
            retry_after_secs = retry_after_secs,
            "Request quota exceeded"
        );
        return Err(AppError::QuotaExceeded { retry_after_secs });
    }

    let body = state.upstream.generate(&request.text).await?;

    // The caller already has a good answer; a failed counter update is only logged
    if let Err(e) = state.keys.record_usage(&key.token).await {
        error!(token = %key.token_prefix(), error = %e, "Failed to record key usage");
    }

    info!(
        token = %key.token_prefix(),
        chars = request.text.chars().count(),
        "Prompt relayed"
    );

    Ok(StandardResponse::success(
        body,
        Some(RelayData {
            token_prefix: key.token_prefix(),
            original_prompt: request.text,
        }),
    ))
}
