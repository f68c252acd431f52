use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::HashSet;
use tokio::task;

use crate::config::SecurityConfig;
use crate::domain::Role;
use crate::entities::users;

/// Fields of a user row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub must_change_password: bool,
    pub last_temp_password: Option<String>,
}

pub struct UserRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    #[must_use]
    pub const fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id).one(self.db).await
    }

    /// Looks a user up by email, or by username when `login` has no `@`.
    pub async fn find_for_login(&self, login: &str) -> Result<Option<users::Model>, DbErr> {
        let login = login.trim();
        let filter = if login.contains('@') {
            users::Column::Email.eq(login.to_lowercase())
        } else {
            users::Column::Username.eq(login.to_lowercase())
        };

        users::Entity::find().filter(filter).one(self.db).await
    }

    /// Newest first.
    pub async fn list_all(&self) -> Result<Vec<users::Model>, DbErr> {
        users::Entity::find()
            .order_by_desc(users::Column::Id)
            .all(self.db)
            .await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        users::Entity::find().count(self.db).await
    }

    pub async fn email_taken(&self, email: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .count(self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool, DbErr> {
        let count = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .count(self.db)
            .await?;
        Ok(count > 0)
    }

    /// Every username starting with `base`, used to probe suffixed candidates in memory.
    pub async fn usernames_with_prefix(&self, base: &str) -> Result<HashSet<String>, DbErr> {
        let names: Vec<Option<String>> = users::Entity::find()
            .select_only()
            .column(users::Column::Username)
            .filter(users::Column::Username.starts_with(base))
            .into_tuple()
            .all(self.db)
            .await?;

        Ok(names.into_iter().flatten().collect())
    }

    pub async fn insert(&self, user: NewUser) -> Result<users::Model, DbErr> {
        let now = chrono::Utc::now().to_rfc3339();

        users::ActiveModel {
            name: Set(user.name),
            email: Set(user.email),
            username: Set(user.username),
            password_hash: Set(user.password_hash),
            role: Set(user.role),
            is_active: Set(true),
            must_change_password: Set(user.must_change_password),
            last_temp_password: Set(user.last_temp_password),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await
    }

    pub async fn set_role(&self, user: users::Model, role: Role) -> Result<users::Model, DbErr> {
        let mut active: users::ActiveModel = user.into();
        active.role = Set(role);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(self.db).await
    }

    pub async fn set_active(
        &self,
        user: users::Model,
        is_active: bool,
    ) -> Result<users::Model, DbErr> {
        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(self.db).await
    }

    /// Stores an admin-issued temporary password and forces rotation.
    pub async fn set_temp_password(
        &self,
        user: users::Model,
        password_hash: String,
        temp_password: String,
    ) -> Result<users::Model, DbErr> {
        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.must_change_password = Set(true);
        active.last_temp_password = Set(Some(temp_password));
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(self.db).await
    }

    /// Stores a user-chosen password and clears any temporary credential.
    pub async fn set_own_password(
        &self,
        user: users::Model,
        password_hash: String,
    ) -> Result<users::Model, DbErr> {
        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.must_change_password = Set(false);
        active.last_temp_password = Set(None);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(self.db).await
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses default params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Hashes off the async runtime; Argon2 is CPU-bound.
pub async fn hash_password_blocking(password: String, config: SecurityConfig) -> Result<String> {
    task::spawn_blocking(move || hash_password(&password, Some(&config)))
        .await
        .context("Password hashing task panicked")?
}

/// Verifies `password` against a PHC hash string off the async runtime.
pub async fn verify_password(password_hash: String, password: String) -> Result<bool> {
    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}
