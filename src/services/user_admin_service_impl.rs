//! `SeaORM` implementation of the `UserAdminService` trait.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde_json::json;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::repositories::user::hash_password_blocking;
use crate::db::{AuditRepository, NewUser, Store, UserRepository};
use crate::domain::credentials::temp_password_or_generate;
use crate::domain::{Actor, AuditAction, Role, audit_entity, csv, username};
use crate::entities::users;
use crate::services::notifier::{CredentialNotice, NoticeKind, Notifier};
use crate::services::user_admin_service::{
    AdminUserView, BulkCreated, BulkOutcome, BulkRowError, BulkSource, PasswordReset,
    ProvisionRequest, ProvisionedUser, UserAdminError, UserAdminService,
};

pub struct SeaOrmUserAdminService {
    store: Store,
    security: SecurityConfig,
    notifier: Notifier,
}

impl SeaOrmUserAdminService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig, notifier: Notifier) -> Self {
        Self {
            store,
            security,
            notifier,
        }
    }

    /// Validates and inserts one user on `db`, returning the row and its
    /// plaintext temporary password.
    async fn provision<C: ConnectionTrait>(
        &self,
        db: &C,
        actor: &Actor,
        request: ProvisionRequest,
    ) -> Result<(users::Model, String), UserAdminError> {
        let name = request.name.unwrap_or_default().trim().to_string();
        let email = request.email.unwrap_or_default().trim().to_lowercase();
        if name.is_empty() || email.is_empty() {
            return Err(UserAdminError::Validation("name & email required".to_string()));
        }
        let role = Role::parse_or_default(request.role.as_deref())?;

        let users = UserRepository::new(db);
        if users.email_taken(&email).await? {
            return Err(UserAdminError::Conflict("email already exists".to_string()));
        }

        let requested = request
            .username
            .map(|u| u.trim().to_lowercase())
            .filter(|u| !u.is_empty());

        let username = match requested {
            Some(u) => {
                if !username::is_valid_username(&u) {
                    return Err(UserAdminError::Validation(
                        "invalid username format".to_string(),
                    ));
                }
                if users.username_taken(&u).await? {
                    return Err(UserAdminError::Conflict(
                        "username already exists".to_string(),
                    ));
                }
                u
            }
            None => suggest_on(&users, &name, &email).await?,
        };

        let temp_password = temp_password_or_generate(request.temp_password.as_deref());
        let password_hash =
            hash_password_blocking(temp_password.clone(), self.security.clone()).await?;

        let user = users
            .insert(NewUser {
                name,
                email,
                username: Some(username),
                password_hash,
                role,
                must_change_password: true,
                last_temp_password: Some(temp_password.clone()),
            })
            .await?;

        AuditRepository::new(db)
            .record(
                Some(actor.id),
                audit_entity::USER,
                Some(user.id),
                AuditAction::Create,
                json!({
                    "email": user.email,
                    "username": user.username,
                    "role": user.role,
                }),
            )
            .await?;

        Ok((user, temp_password))
    }
}

async fn suggest_on<C: ConnectionTrait>(
    users: &UserRepository<'_, C>,
    name: &str,
    email: &str,
) -> Result<String, UserAdminError> {
    let base = username::suggestion_base(name, email)
        .ok_or_else(|| UserAdminError::Validation("name or email required".to_string()))?;
    let base = username::normalize(base);
    let taken = users.usernames_with_prefix(&base).await?;
    Ok(username::first_free(&base, &taken))
}

fn csv_rows(text: &str) -> Vec<ProvisionRequest> {
    csv::parse_with_header(text)
        .into_iter()
        .map(|mut row| ProvisionRequest {
            name: row.remove("name"),
            email: row.remove("email"),
            role: row.remove("role"),
            username: row.remove("username"),
            temp_password: None,
        })
        .collect()
}

fn notice(kind: NoticeKind, user: &users::Model, temp_password: &str) -> CredentialNotice {
    CredentialNotice {
        kind,
        to: user.email.clone(),
        name: user.name.clone(),
        temp_password: temp_password.to_string(),
    }
}

#[async_trait]
impl UserAdminService for SeaOrmUserAdminService {
    async fn list(&self) -> Result<Vec<AdminUserView>, UserAdminError> {
        let users = self.store.users().list_all().await?;
        Ok(users.into_iter().map(AdminUserView::from).collect())
    }

    async fn create(
        &self,
        actor: &Actor,
        request: ProvisionRequest,
    ) -> Result<ProvisionedUser, UserAdminError> {
        let txn = self.store.begin().await?;
        let (user, temp_password) = self.provision(&txn, actor, request).await?;
        txn.commit().await?;

        info!(user_id = user.id, role = %user.role, by = actor.id, "User provisioned");
        self.notifier
            .enqueue([notice(NoticeKind::AccountCreated, &user, &temp_password)]);

        Ok(ProvisionedUser {
            id: user.id,
            name: user.name,
            email: user.email,
            username: user.username,
            role: user.role,
            is_active: user.is_active,
            must_change_password: user.must_change_password,
            temp_password,
        })
    }

    async fn bulk_create(
        &self,
        actor: &Actor,
        source: BulkSource,
    ) -> Result<BulkOutcome, UserAdminError> {
        let rows = match source {
            BulkSource::Rows(rows) => rows,
            BulkSource::Csv(text) => csv_rows(&text),
        };

        let mut outcome = BulkOutcome::default();
        let mut notices = Vec::new();
        let txn = self.store.begin().await?;

        for (index, request) in rows.into_iter().enumerate() {
            let row = index + 1;
            let email = request.email.clone();

            let savepoint = txn.begin().await?;
            match self.provision(&savepoint, actor, request).await {
                Ok((user, temp_password)) => {
                    savepoint.commit().await?;
                    notices.push(notice(NoticeKind::AccountCreated, &user, &temp_password));
                    outcome.created.push(BulkCreated {
                        row,
                        id: user.id,
                        name: user.name,
                        email: user.email,
                        username: user.username,
                        role: user.role,
                        temp_password,
                    });
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    warn!(row, error = %e, "Bulk user row rejected");
                    outcome.errors.push(BulkRowError {
                        row,
                        email,
                        error: e.to_string(),
                    });
                }
            }
        }

        txn.commit().await?;

        info!(
            created = outcome.created.len(),
            failed = outcome.errors.len(),
            by = actor.id,
            "Bulk user import finished"
        );
        self.notifier.enqueue(notices);

        Ok(outcome)
    }

    async fn suggest_username(&self, name: &str, email: &str) -> Result<String, UserAdminError> {
        suggest_on(&self.store.users(), name, email).await
    }

    async fn set_role(&self, actor: &Actor, user_id: i32, role: &str) -> Result<Role, UserAdminError> {
        let role = Role::parse(role)
            .ok_or_else(|| UserAdminError::Validation("invalid role".to_string()))?;

        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);
        let user = users
            .get_by_id(user_id)
            .await?
            .ok_or(UserAdminError::NotFound(user_id))?;

        let previous = user.role;
        let user = users.set_role(user, role).await?;
        AuditRepository::new(&txn)
            .record(
                Some(actor.id),
                audit_entity::USER,
                Some(user_id),
                AuditAction::Update,
                json!({ "role": { "from": previous, "to": role } }),
            )
            .await?;
        txn.commit().await?;

        info!(user_id, role = %role, by = actor.id, "User role updated");
        Ok(user.role)
    }

    async fn set_status(
        &self,
        actor: &Actor,
        user_id: i32,
        is_active: bool,
    ) -> Result<bool, UserAdminError> {
        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);
        let user = users
            .get_by_id(user_id)
            .await?
            .ok_or(UserAdminError::NotFound(user_id))?;

        let user = users.set_active(user, is_active).await?;
        AuditRepository::new(&txn)
            .record(
                Some(actor.id),
                audit_entity::USER,
                Some(user_id),
                AuditAction::Update,
                json!({ "is_active": is_active }),
            )
            .await?;
        txn.commit().await?;

        info!(user_id, is_active, by = actor.id, "User status updated");
        Ok(user.is_active)
    }

    async fn reset_password(
        &self,
        actor: &Actor,
        user_id: i32,
        temp_password: Option<String>,
    ) -> Result<PasswordReset, UserAdminError> {
        let temp_password = temp_password_or_generate(temp_password.as_deref());
        let password_hash =
            hash_password_blocking(temp_password.clone(), self.security.clone()).await?;

        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);
        let user = users
            .get_by_id(user_id)
            .await?
            .ok_or(UserAdminError::NotFound(user_id))?;

        let user = users
            .set_temp_password(user, password_hash, temp_password.clone())
            .await?;
        AuditRepository::new(&txn)
            .record(
                Some(actor.id),
                audit_entity::USER,
                Some(user_id),
                AuditAction::Update,
                json!({ "password": "reset" }),
            )
            .await?;
        txn.commit().await?;

        info!(user_id, by = actor.id, "Temporary password issued");
        self.notifier
            .enqueue([notice(NoticeKind::PasswordReset, &user, &temp_password)]);

        Ok(PasswordReset {
            user_id,
            temp_password,
        })
    }
}
