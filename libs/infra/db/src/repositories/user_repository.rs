//! User account storage backing the bearer-auth login/register surface
//! (spec.md §6). Authentication itself is an external-collaborator concern
//! per spec.md §1; this repository only owns the row the gateway's JWT
//! issuance reads and writes.

use crate::errors::DbError;
use catalog_domain_models::User;
use libsql::{params, Connection};

pub struct UserRepository {
    connection: Connection,
}

impl UserRepository {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    pub async fn create(&self, username: &str, password_hash: &str) -> Result<User, DbError> {
        let mut rows = self
            .connection
            .query(
                "INSERT INTO users (username, password_hash) VALUES (?1, ?2) RETURNING id",
                params![username, password_hash],
            )
            .await?;
        let id: i64 = rows
            .next()
            .await?
            .ok_or_else(|| DbError::MappingError("insert did not return a user id".into()))?
            .get(0)?;
        Ok(User { id, username: username.to_string(), password_hash: password_hash.to_string() })
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let mut rows = self
            .connection
            .query(
                "SELECT id, username, password_hash FROM users WHERE username = ?1",
                params![username],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(User {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
            })),
            None => Ok(None),
        }
    }
}
