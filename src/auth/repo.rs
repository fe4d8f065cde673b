use std::sync::Mutex;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, UserRow};

/// Another account already holds the email. Raised by `create` so a race
/// past the lookup still maps to a conflict.
#[derive(Debug, thiserror::Error)]
#[error("email already registered")]
pub struct DuplicateEmail;

/// Postgres `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, new: NewUser<'_>) -> anyhow::Result<User>;
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    /// Returns `false` when no such user existed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(row.map(User::from))
    }

    async fn create(&self, new: NewUser<'_>) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new.name)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .and_then(|d| d.code())
                .is_some_and(|code| code == UNIQUE_VIOLATION);
            if duplicate {
                anyhow::Error::new(DuplicateEmail)
            } else {
                anyhow::Error::new(e).context("insert user")
            }
        })?;
        Ok(row.into())
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }
}

/// Users kept in process memory.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Vec<User>>> {
        self.users
            .lock()
            .map_err(|_| anyhow::anyhow!("user store lock poisoned"))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.lock()?.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.lock()?.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new: NewUser<'_>) -> anyhow::Result<User> {
        let mut users = self.lock()?;
        if users.iter().any(|u| u.email == new.email) {
            return Err(DuplicateEmail.into());
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name.to_string(),
            email: new.email.to_string(),
            password_hash: new.password_hash.to_string(),
            role: new.role,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let mut users = self.lock()?.clone();
        users.reverse();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut users = self.lock()?;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }
}
