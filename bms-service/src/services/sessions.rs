use super::database::MongoDb;
use super::error::ServiceResult;
use crate::models::{Session, User};
use chrono::{Duration, Utc};
use mongodb::bson::doc;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const SESSION_COOKIE: &str = "bms_session";

/// Sessions are stored under the SHA-256 of the cookie token, never the
/// token itself.
#[derive(Clone)]
pub struct SessionStore {
    db: MongoDb,
    ttl: Duration,
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Session lifetime for a configured hour count, never shorter than an hour.
pub fn session_ttl(ttl_hours: i64) -> Duration {
    Duration::hours(ttl_hours.max(1))
}

impl SessionStore {
    pub fn new(db: &MongoDb, ttl_hours: i64) -> Self {
        Self {
            db: db.clone(),
            ttl: session_ttl(ttl_hours),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Open a session and return the raw token for the cookie.
    pub async fn create(&self, user: &User) -> ServiceResult<String> {
        let token = generate_token();
        let now = Utc::now();
        let session = Session {
            id: token_digest(&token),
            user_id: user.id.clone(),
            organization_id: user.organization_id.clone(),
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.db.sessions().insert_one(&session, None).await?;
        tracing::info!(user_id = %user.id, "Session opened");
        Ok(token)
    }

    /// The live session for a token. Expired sessions are treated as absent
    /// even before the TTL monitor removes them.
    pub async fn resolve(&self, token: &str) -> ServiceResult<Option<Session>> {
        let session = self
            .db
            .sessions()
            .find_one(doc! { "_id": token_digest(token) }, None)
            .await?;
        Ok(session.filter(|s| s.expires_at > Utc::now()))
    }

    pub async fn revoke(&self, token: &str) -> ServiceResult<()> {
        self.db
            .sessions()
            .delete_one(doc! { "_id": token_digest(token) }, None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_stable_and_differs_from_token() {
        let token = generate_token();
        assert_eq!(token_digest(&token), token_digest(&token));
        assert_ne!(token_digest(&token), token);
        assert_eq!(token_digest(&token).len(), 64);
    }

    #[test]
    fn ttl_is_at_least_an_hour() {
        assert_eq!(session_ttl(24), Duration::hours(24));
        assert_eq!(session_ttl(0), Duration::hours(1));
        assert_eq!(session_ttl(-5), Duration::hours(1));
    }
}
