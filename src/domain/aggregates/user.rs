//! User account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public account fields. Never carries the password hash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

/// A validated registration ready to persist.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn into_user(self) -> (User, String) {
        let user = User {
            id: Uuid::now_v7(), username: self.username, email: self.email,
            first_name: self.first_name, last_name: self.last_name, date_joined: Utc::now(),
        };
        (user, self.password_hash)
    }
}
