//! User administration: account creation, role assignment, deactivation
//! and password resets.
//!
//! Role escalation is policy, not just plumbing: only a superadmin may
//! grant admin or superadmin, and the caller cannot change their own
//! role or deactivate themselves. Those checks live here so every
//! entry point gets them.

use bcrypt::{hash, DEFAULT_COST};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{validate_username, PaginatedResponse, Pagination, Role, User};

/// User administration service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// Input for creating a user account
#[derive(Debug, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

/// Input for updating a user account
#[derive(Debug, Deserialize)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Input for resetting a user's password
#[derive(Debug, Deserialize)]
pub struct ResetPasswordInput {
    pub new_password: String,
}

/// Listing filter for user accounts
#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub q: Option<String>,
    pub include_inactive: Option<bool>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, FromRow)]
struct UserDbRow {
    id: Uuid,
    username: String,
    name: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn user_from_row(row: UserDbRow) -> AppResult<User> {
    let role = Role::from_str(&row.role).ok_or_else(|| {
        AppError::Internal(format!("Unknown role in store for {}: {}", row.username, row.role))
    })?;
    Ok(User {
        id: row.id,
        username: row.username,
        name: row.name,
        role,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

const MIN_PASSWORD_LENGTH: usize = 8;

fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation {
            field: "password".to_string(),
            message: format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
            message_id: format!("Kata sandi minimal {} karakter", MIN_PASSWORD_LENGTH),
        });
    }
    Ok(())
}

const USER_COLUMNS: &str = "id, username, name, role, is_active, created_at, updated_at";

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a user account. Granting admin or superadmin requires a
    /// superadmin caller.
    pub async fn create_user(&self, input: &CreateUserInput, actor_role: Role) -> AppResult<User> {
        if let Err(msg) = validate_username(&input.username) {
            return Err(AppError::Validation {
                field: "username".to_string(),
                message: msg.to_string(),
                message_id: "Nama pengguna tidak valid".to_string(),
            });
        }
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name cannot be empty".to_string(),
                message_id: "Nama tidak boleh kosong".to_string(),
            });
        }
        validate_password(&input.password)?;

        if input.role.is_admin_or_above() && !actor_role.is_superadmin() {
            return Err(AppError::InsufficientPermissions);
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE username = $1",
        )
        .bind(&input.username)
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry(format!(
                "Username {} is already taken",
                input.username
            )));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let row = sqlx::query_as::<_, UserDbRow>(&format!(
            r#"
            INSERT INTO users (username, name, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&input.username)
        .bind(input.name.trim())
        .bind(&password_hash)
        .bind(input.role.as_str())
        .fetch_one(&self.db)
        .await?;

        user_from_row(row)
    }

    /// Get a user by id
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserDbRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        user_from_row(row)
    }

    /// List user accounts; inactive accounts are hidden unless asked for
    pub async fn list_users(&self, filter: UserFilter) -> AppResult<PaginatedResponse<User>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let q = filter.q.as_ref().map(|q| q.trim().to_string());
        let include_inactive = filter.include_inactive.unwrap_or(false);

        let total_items = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR username ILIKE '%' || $1 || '%'
                                    OR name ILIKE '%' || $1 || '%')
              AND ($2 OR is_active)
            "#,
        )
        .bind(&q)
        .bind(include_inactive)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, UserDbRow>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::text IS NULL OR username ILIKE '%' || $1 || '%'
                                    OR name ILIKE '%' || $1 || '%')
              AND ($2 OR is_active)
            ORDER BY username
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&q)
        .bind(include_inactive)
        .bind(i64::from(pagination.limit()))
        .bind(i64::from(pagination.offset()))
        .fetch_all(&self.db)
        .await?;

        let users = rows
            .into_iter()
            .map(user_from_row)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(users, pagination, total_items as u64))
    }

    /// Update name, role or active flag
    pub async fn update_user(
        &self,
        user_id: Uuid,
        input: UpdateUserInput,
        actor_id: Uuid,
        actor_role: Role,
    ) -> AppResult<User> {
        let existing = self.get_user(user_id).await?;

        if let Some(name) = input.name.as_deref() {
            if name.trim().is_empty() {
                return Err(AppError::Validation {
                    field: "name".to_string(),
                    message: "Name cannot be empty".to_string(),
                    message_id: "Nama tidak boleh kosong".to_string(),
                });
            }
        }

        let role = input.role.unwrap_or(existing.role);
        if role != existing.role {
            if user_id == actor_id {
                return Err(AppError::Validation {
                    field: "role".to_string(),
                    message: "Cannot change your own role".to_string(),
                    message_id: "Tidak dapat mengubah peran sendiri".to_string(),
                });
            }
            // Both directions of an admin-level change need superadmin
            if (role.is_admin_or_above() || existing.role.is_admin_or_above())
                && !actor_role.is_superadmin()
            {
                return Err(AppError::InsufficientPermissions);
            }
        }

        let is_active = input.is_active.unwrap_or(existing.is_active);
        if !is_active && user_id == actor_id {
            return Err(AppError::Validation {
                field: "is_active".to_string(),
                message: "Cannot deactivate your own account".to_string(),
                message_id: "Tidak dapat menonaktifkan akun sendiri".to_string(),
            });
        }

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);

        let row = sqlx::query_as::<_, UserDbRow>(&format!(
            r#"
            UPDATE users
            SET name = $1, role = $2, is_active = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&name)
        .bind(role.as_str())
        .bind(is_active)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        // Deactivation also cuts any refresh tokens still in flight
        if existing.is_active && !is_active {
            sqlx::query(
                "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
            )
            .bind(user_id)
            .execute(&self.db)
            .await?;
        }

        user_from_row(row)
    }

    /// Reset a user's password and revoke their refresh tokens
    pub async fn reset_password(
        &self,
        user_id: Uuid,
        input: &ResetPasswordInput,
    ) -> AppResult<()> {
        validate_password(&input.new_password)?;
        self.get_user(user_id).await?;

        let password_hash = hash(&input.new_password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_floor() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }
}
