use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::workflows::admission::domain::ApplicantId;

#[derive(Debug, Clone, Copy)]
struct Session {
    applicant_id: ApplicantId,
    issued_at: DateTime<Utc>,
}

/// Opaque bearer tokens mapped to the applicant that logged in. Tokens
/// stop resolving once `ttl` has passed since they were issued.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }

    /// Issuing also drops every session that has already expired.
    pub fn issue(&self, applicant_id: ApplicantId, now: DateTime<Utc>) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, session| !self.expired(session, now));
        sessions.insert(
            token.clone(),
            Session {
                applicant_id,
                issued_at: now,
            },
        );
        token
    }

    pub fn resolve(&self, token: &str, now: DateTime<Utc>) -> Option<ApplicantId> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = *sessions.get(token)?;
        if self.expired(&session, now) {
            sessions.remove(token);
            return None;
        }
        Some(session.applicant_id)
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.issued_at >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn revoked_tokens_stop_resolving() {
        let registry = SessionRegistry::new(Duration::hours(2));
        let now = morning();
        let first = registry.issue(ApplicantId(7), now);
        let second = registry.issue(ApplicantId(7), now);
        assert_ne!(first, second);
        assert_eq!(registry.resolve(&first, now), Some(ApplicantId(7)));

        assert!(registry.revoke(&first));
        assert!(!registry.revoke(&first));
        assert_eq!(registry.resolve(&first, now), None);
        assert_eq!(registry.resolve(&second, now), Some(ApplicantId(7)));
    }

    #[test]
    fn expired_tokens_are_evicted() {
        let registry = SessionRegistry::new(Duration::minutes(30));
        let start = morning();
        let token = registry.issue(ApplicantId(3), start);

        assert_eq!(
            registry.resolve(&token, start + Duration::minutes(29)),
            Some(ApplicantId(3))
        );
        assert_eq!(registry.resolve(&token, start + Duration::minutes(30)), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn issuing_sweeps_stale_sessions() {
        let registry = SessionRegistry::new(Duration::minutes(30));
        let start = morning();
        for id in 1..=5 {
            registry.issue(ApplicantId(id), start);
        }
        assert_eq!(registry.len(), 5);

        let fresh = registry.issue(ApplicantId(9), start + Duration::hours(1));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.resolve(&fresh, start + Duration::hours(1)),
            Some(ApplicantId(9))
        );
    }
}
