use crate::config::InitialsPolicy;
use crate::error::AppError;
use crate::models::leaderboard::ScoreSubmission;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const MIN_SURVIVAL_TIME: i64 = 1;
pub const MAX_SURVIVAL_TIME: i64 = 9999;

/// A submit-score body that passed structural validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub initials: String,
    pub survival_time: i64,
    pub session_token: String,
    pub client_id: String,
}

/// Decodes a JSON request body. Malformed bodies are validation errors,
/// whatever the request's content type says.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|_| AppError::Validation("Invalid JSON body".into()))
}

/// A string field: absent, null or blank reads as `None`; any other
/// non-string value is rejected.
fn text_field(value: Option<Value>, name: &str) -> Result<Option<String>, AppError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s).filter(|s| !s.trim().is_empty())),
        Some(_) => Err(AppError::Validation(format!("{} must be a string", name))),
    }
}

pub fn validate_client_id(client_id: Option<Value>) -> Result<String, AppError> {
    match client_id {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(id),
        _ => Err(AppError::Validation("Missing client ID".into())),
    }
}

pub fn validate_initials(initials: &str, policy: &InitialsPolicy) -> Result<String, AppError> {
    let trimmed = initials.trim();
    let len = trimmed.chars().count();
    if len < policy.min_len || len > policy.max_len {
        let msg = if policy.min_len == policy.max_len {
            format!("Initials must be exactly {} characters", policy.min_len)
        } else {
            format!(
                "Gamertag must be between {} and {} characters",
                policy.min_len, policy.max_len
            )
        };
        return Err(AppError::Validation(msg));
    }
    Ok(trimmed.to_uppercase())
}

/// Reads a survival time the way a lenient integer parse would: JSON
/// numbers are truncated, strings contribute their leading integer.
pub fn parse_survival_time(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => leading_integer(s),
        _ => None,
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

pub fn validate_survival_time(time: i64) -> Result<i64, AppError> {
    if (MIN_SURVIVAL_TIME..=MAX_SURVIVAL_TIME).contains(&time) {
        Ok(time)
    } else {
        Err(AppError::Validation("Invalid survival time".into()))
    }
}

pub fn validate_submission(
    req: ScoreSubmission,
    policy: &InitialsPolicy,
) -> Result<ValidSubmission, AppError> {
    let missing = || AppError::Validation("Missing required fields".into());

    let initials = text_field(req.initials, "initials")?.ok_or_else(missing)?;
    let raw_time = req
        .survival_time
        .filter(|v| !v.is_null())
        .ok_or_else(missing)?;
    let session_token = text_field(req.session_token, "sessionToken")?.ok_or_else(missing)?;
    let client_id = text_field(req.client_id, "clientId")?.ok_or_else(missing)?;

    let initials = validate_initials(&initials, policy)?;
    let survival_time = parse_survival_time(&raw_time)
        .ok_or_else(|| AppError::Validation("Invalid survival time".into()))
        .and_then(validate_survival_time)?;

    Ok(ValidSubmission {
        initials,
        survival_time,
        session_token,
        client_id,
    })
}

/// Validates the path of `/api/user-rank/{gamertag}/{time}`.
pub fn validate_rank_query(gamertag: &str, time: &str) -> Result<f64, AppError> {
    let time: f64 = time.trim().parse().unwrap_or(f64::NAN);
    if gamertag.trim().is_empty() || !time.is_finite() || time <= 0.0 {
        return Err(AppError::Validation("Missing gamertag or time".into()));
    }
    Ok(time)
}
