use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::workflows::admission::domain::OtpChallenge;

/// Six digit, zero padded code valid for `ttl_minutes`.
pub fn issue(now: DateTime<Utc>, ttl_minutes: i64) -> OtpChallenge {
    let code = rand::rng().random_range(0..1_000_000u32);
    OtpChallenge {
        code: format!("{code:06}"),
        expires_at: now + Duration::minutes(ttl_minutes),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpRejection {
    Expired,
    Incorrect,
}

pub fn check(
    challenge: Option<&OtpChallenge>,
    submitted: &str,
    now: DateTime<Utc>,
) -> Result<(), OtpRejection> {
    match challenge {
        None => Err(OtpRejection::Expired),
        Some(challenge) if challenge.is_expired(now) => Err(OtpRejection::Expired),
        Some(challenge) if challenge.code != submitted.trim() => Err(OtpRejection::Incorrect),
        Some(_) => Ok(()),
    }
}
