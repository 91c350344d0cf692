//! Share calculation handler

use axum::{
    extract::State,
    http::{header::ACCEPT_LANGUAGE, HeaderMap, StatusCode},
    Json,
};
use tracing::{info, warn};
use validator::Validate;

use crate::dto::calculation::{CalculateShareRequest, ShareResultResponse};
use crate::locale::negotiate_locale;
use crate::{error::ApiError, AppState};

/// Calculates the patient and insurer shares of one service line
///
/// A valid result answers 200. A result the calculator rejected (bad
/// percentages, payment limit exceeded) answers 422 with the same body so
/// the client can show its message.
pub async fn calculate_share(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CalculateShareRequest>,
) -> Result<(StatusCode, Json<ShareResultResponse>), ApiError> {
    request.validate()?;

    let locale = negotiate_locale(headers.get(ACCEPT_LANGUAGE), state.config.locale);
    let context = request.into_context(state.config.currency, state.config.timezone)?;

    let result = state
        .orchestrator
        .calculate_localized(&context, locale)
        .await
        .map_err(|e| {
            warn!(error = %e, transient = e.is_transient(), "Share calculation aborted");
            ApiError::from(e)
        })?;

    info!(
        calculation_id = %result.calculation_id,
        is_valid = result.is_valid,
        applied_rules = result.applied_rules.len(),
        skipped_rules = result.skipped_rules.len(),
        locale = locale.tag(),
        "Share calculated"
    );

    let status = if result.is_valid {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(ShareResultResponse::try_from(result)?)))
}
