use crate::server::response::ApiError;
use crate::types::CompletionType;

pub const DEFAULT_LOG_LIMIT: i32 = 50;
const MAX_LOG_LIMIT: i32 = 200;

pub fn validate_percentage(value: i64) -> Result<u8, ApiError> {
    u8::try_from(value)
        .ok()
        .filter(|pct| *pct <= 100)
        .ok_or_else(|| ApiError::bad_request("Percentage must be an integer between 0 and 100"))
}

/// Parses a client-supplied completion type. Derived types are rejected.
pub fn parse_submitted_type(value: &str) -> Result<CompletionType, ApiError> {
    let completion_type = CompletionType::parse(value).ok_or_else(|| {
        ApiError::bad_request(format!(
            "Invalid completion type '{value}', expected 'main' or 'dlc'"
        ))
    })?;

    if completion_type.is_derived() {
        return Err(ApiError::bad_request(format!(
            "The {completion_type} completion is calculated automatically and cannot be submitted"
        )));
    }
    Ok(completion_type)
}

/// `dlc_id` must be present exactly when the type is `dlc`.
pub fn validate_dlc_reference(
    completion_type: CompletionType,
    dlc_id: Option<&str>,
) -> Result<(), ApiError> {
    match (completion_type, dlc_id) {
        (CompletionType::Dlc, None) | (CompletionType::Dlc, Some("")) => {
            Err(ApiError::bad_request("dlc_id is required for dlc completion"))
        }
        (CompletionType::Dlc, Some(_)) | (_, None) => Ok(()),
        (_, Some(_)) => Err(ApiError::bad_request(
            "dlc_id is only allowed for dlc completion",
        )),
    }
}

pub fn parse_type_filter(value: Option<&str>) -> Result<Option<CompletionType>, ApiError> {
    value
        .map(|s| {
            CompletionType::parse(s)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid completion type '{s}'")))
        })
        .transpose()
}

pub fn clamp_log_limit(limit: Option<i32>) -> i32 {
    limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
}
