/*
 * Responsibility
 * - User record types and the UserStore interface handlers depend on
 * - PgUserStore: SQLx / Postgres implementation (users table, see migrations/)
 * - DB errors come back as RepoError (unique violation -> Conflict)
 */
use std::{fmt, str::FromStr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoError;
use crate::services::auth::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "suspended" => Ok(UserStatus::Suspended),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub phone: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// Insert payload. `email` is expected to be lower-cased already.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
}

/// Partial profile update.
///
/// phone: Some(Some(v)) -> set to v
/// phone: Some(None)    -> set to NULL
/// phone: None          -> do not update
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub fullname: Option<String>,
    pub phone: Option<Option<String>>,
}

#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError>;

    /// Lookup is case-insensitive.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn email_exists(&self, email: &str) -> Result<bool, RepoError>;

    /// Fails with `RepoError::Conflict` when the email is taken.
    async fn create(&self, user: NewUser) -> Result<UserRecord, RepoError>;

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<UserRecord>, RepoError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, RepoError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: UserStatus,
    ) -> Result<Option<UserRecord>, RepoError>;

    async fn touch_last_login(&self, id: Uuid) -> Result<(), RepoError>;

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<UserRecord>, RepoError>;
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    fullname: String,
    email: String,
    password_hash: String,
    role: String,
    status: String,
    phone: Option<String>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = RepoError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| RepoError::Corrupt(format!("user {}: {e}", row.id)))?;
        let status = row
            .status
            .parse::<UserStatus>()
            .map_err(|s| RepoError::Corrupt(format!("user {}: unknown status {s}", row.id)))?;

        Ok(UserRecord {
            id: row.id,
            fullname: row.fullname,
            email: row.email,
            password_hash: row.password_hash,
            role,
            status,
            phone: row.phone,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const COLUMNS: &str = "id, fullname, email, password_hash, role, status, phone, \
                       last_login_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_record(row: Option<UserRow>) -> Result<Option<UserRecord>, RepoError> {
    row.map(UserRecord::try_from).transpose()
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        into_record(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM users WHERE email = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;

        into_record(row)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, RepoError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = lower($1))")
                .bind(email)
                .fetch_one(&self.db)
                .await?;

        Ok(exists)
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (fullname, email, password_hash, role, status, phone)
            VALUES ($1, lower($2), $3, $4, 'active', $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&user.fullname)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.phone)
        .fetch_one(&self.db)
        .await?;

        UserRecord::try_from(row)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET
                fullname = COALESCE($2, fullname),
                phone = CASE
                    WHEN $3 = false THEN phone
                    ELSE $4
                END,
                updated_at = now()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.fullname)
        .bind(update.phone.is_some()) // $3: flag to set phone
        .bind(update.phone.flatten()) // $4: new phone value
        .fetch_optional(&self.db)
        .await?;

        into_record(row)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: UserStatus,
    ) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET status = $2, updated_at = now() WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.db)
        .await?;

        into_record(row)
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("UPDATE users SET last_login_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<UserRecord>, RepoError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(UserRecord::try_from).collect()
    }
}
