use sqlx::FromRow;
use time::OffsetDateTime;

use crate::store::{Entity, Value};

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                      // assigned by the store
    pub email: String,                // unique among live users
    pub password_hash: String,        // Argon2 PHC string, never the plaintext
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// A not-yet-persisted user; id and timestamps are filled in by the store.
    pub fn new(
        email: &str,
        password_hash: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Self {
        Self {
            id: 0,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            first_name,
            last_name,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["email", "password_hash", "first_name", "last_name"];
    const UNIQUE_FIELD: &'static str = "email";

    fn id(&self) -> i64 {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.email.clone().into(),
            self.password_hash.clone().into(),
            self.first_name.clone().into(),
            self.last_name.clone().into(),
        ]
    }

    fn assign(&mut self, id: i64, now: OffsetDateTime) {
        self.id = id;
        self.created_at = now;
        self.updated_at = now;
    }

    fn touch(&mut self, now: OffsetDateTime) {
        self.updated_at = now;
    }
}
