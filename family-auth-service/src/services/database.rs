//! PostgreSQL credential store.
//!
//! Runtime-checked sqlx queries against the tables created by
//! `migrations/0001_family_auth.sql`. Uniqueness rules live in partial unique
//! indexes; violations are mapped back to [`StoreError`] by constraint name.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{
    FamilyScope, MagicLinkToken, OnboardingRequest, RequestStatus, Role, UserCredential,
};
use crate::services::store::{Approval, CredentialStore, StoreError};
use crate::utils::PasswordHashString;

/// PostgreSQL-backed [`CredentialStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain why a guarded decision matched no row.
    async fn decision_conflict(
        tx: &mut Transaction<'_, Postgres>,
        request_id: Uuid,
    ) -> StoreError {
        let status: Result<Option<(String,)>, sqlx::Error> =
            sqlx::query_as("SELECT status FROM onboarding_requests WHERE request_id = $1")
                .bind(request_id)
                .fetch_optional(&mut **tx)
                .await;

        match status {
            Ok(Some((status,))) => match status.parse::<RequestStatus>() {
                Ok(status) => StoreError::NotPending(status),
                Err(e) => StoreError::Backend(anyhow::anyhow!(e)),
            },
            Ok(None) => StoreError::RequestNotFound,
            Err(e) => db_error(e),
        }
    }
}

fn db_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("uq_onboarding_pending_email") => StoreError::DuplicatePendingEmail,
                Some("uq_onboarding_family_name") | Some("uq_families_name") => {
                    StoreError::DuplicateFamilyName
                }
                _ => StoreError::DuplicateCredential,
            };
        }
    }
    StoreError::Backend(anyhow::anyhow!(e))
}

// ==================== Row Types ====================

#[derive(FromRow)]
struct RequestRow {
    request_id: Uuid,
    email: String,
    full_name: String,
    family_name: String,
    password_hash: String,
    family_password_hash: String,
    status: String,
    rejection_reason: Option<String>,
    requested_utc: DateTime<Utc>,
    reviewed_utc: Option<DateTime<Utc>>,
    reviewed_by: Option<Uuid>,
}

impl TryFrom<RequestRow> for OnboardingRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(OnboardingRequest {
            id: row.request_id,
            email: row.email,
            full_name: row.full_name,
            family_name: row.family_name,
            password_hash: PasswordHashString::new(row.password_hash),
            family_password_hash: PasswordHashString::new(row.family_password_hash),
            status: row
                .status
                .parse()
                .map_err(|e: String| StoreError::Backend(anyhow::anyhow!(e)))?,
            rejection_reason: row.rejection_reason,
            requested_at: row.requested_utc,
            reviewed_at: row.reviewed_utc,
            reviewed_by: row.reviewed_by,
        })
    }
}

#[derive(FromRow)]
struct FamilyRow {
    family_id: Uuid,
    family_name: String,
    family_password_hash: String,
    admin_user_id: Uuid,
    source_request_id: Option<Uuid>,
    created_utc: DateTime<Utc>,
}

impl From<FamilyRow> for FamilyScope {
    fn from(row: FamilyRow) -> Self {
        FamilyScope {
            id: row.family_id,
            family_name: row.family_name,
            family_password_hash: PasswordHashString::new(row.family_password_hash),
            admin_user_id: row.admin_user_id,
            source_request_id: row.source_request_id,
            created_at: row.created_utc,
        }
    }
}

#[derive(FromRow)]
struct CredentialRow {
    user_id: Uuid,
    email: String,
    full_name: Option<String>,
    role: String,
    family_id: Option<Uuid>,
    password_hash: Option<String>,
    created_utc: DateTime<Utc>,
}

impl TryFrom<CredentialRow> for UserCredential {
    type Error = StoreError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        Ok(UserCredential {
            id: row.user_id,
            email: row.email,
            full_name: row.full_name,
            role: row
                .role
                .parse::<Role>()
                .map_err(|e| StoreError::Backend(anyhow::anyhow!(e)))?,
            family_id: row.family_id,
            password_hash: row.password_hash.map(PasswordHashString::new),
            created_at: row.created_utc,
        })
    }
}

fn credentials(rows: Vec<CredentialRow>) -> Result<Vec<UserCredential>, StoreError> {
    rows.into_iter().map(UserCredential::try_from).collect()
}

async fn insert_credential_with<'e, E>(executor: E, c: &UserCredential) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO user_credentials (user_id, email, full_name, role, family_id, password_hash, created_utc)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(c.id)
    .bind(&c.email)
    .bind(&c.full_name)
    .bind(c.role.as_str())
    .bind(c.family_id)
    .bind(c.password_hash.as_ref().map(|h| h.as_str()))
    .bind(c.created_at)
    .execute(executor)
    .await
    .map_err(db_error)?;
    Ok(())
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                db_error(e)
            })?;
        Ok(())
    }

    // ==================== Onboarding Requests ====================

    async fn insert_onboarding_request(
        &self,
        request: &OnboardingRequest,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Names held by an existing family are also reserved.
        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT family_id FROM families WHERE family_name = $1")
                .bind(&request.family_name)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;
        if existing.is_some() {
            return Err(StoreError::DuplicateFamilyName);
        }

        sqlx::query(
            r#"
            INSERT INTO onboarding_requests
                (request_id, email, full_name, family_name, password_hash, family_password_hash, status, requested_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(request.id)
        .bind(&request.email)
        .bind(&request.full_name)
        .bind(&request.family_name)
        .bind(request.password_hash.as_str())
        .bind(request.family_password_hash.as_str())
        .bind(request.status.as_str())
        .bind(request.requested_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)
    }

    async fn find_onboarding_request(
        &self,
        request_id: Uuid,
    ) -> Result<Option<OnboardingRequest>, StoreError> {
        sqlx::query_as::<_, RequestRow>("SELECT * FROM onboarding_requests WHERE request_id = $1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(OnboardingRequest::try_from)
            .transpose()
    }

    async fn find_pending_request_by_email(
        &self,
        email: &str,
    ) -> Result<Option<OnboardingRequest>, StoreError> {
        sqlx::query_as::<_, RequestRow>(
            "SELECT * FROM onboarding_requests WHERE email = $1 AND status = 'pending'",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(OnboardingRequest::try_from)
        .transpose()
    }

    async fn list_onboarding_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<OnboardingRequest>, StoreError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, RequestRow>(
                    "SELECT * FROM onboarding_requests WHERE status = $1 ORDER BY requested_utc ASC",
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, RequestRow>(
                    "SELECT * FROM onboarding_requests ORDER BY requested_utc ASC",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_error)?;

        rows.into_iter().map(OnboardingRequest::try_from).collect()
    }

    async fn approve_onboarding_request(
        &self,
        request_id: Uuid,
        reviewed_by: Option<Uuid>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<Approval, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Row lock plus status guard: a concurrent decision sees zero rows.
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            UPDATE onboarding_requests
            SET status = 'approved', reviewed_utc = $2, reviewed_by = $3
            WHERE request_id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(reviewed_at)
        .bind(reviewed_by)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let request = match row {
            Some(row) => OnboardingRequest::try_from(row)?,
            None => return Err(Self::decision_conflict(&mut tx, request_id).await),
        };

        let admin_id = Uuid::new_v4();
        let family = FamilyScope::new(
            request.family_name.clone(),
            request.family_password_hash.clone(),
            admin_id,
            Some(request.id),
        );
        let mut admin = UserCredential::new_family_admin(
            request.email.clone(),
            request.full_name.clone(),
            family.id,
            request.password_hash.clone(),
        );
        admin.id = admin_id;

        sqlx::query(
            r#"
            INSERT INTO families (family_id, family_name, family_password_hash, admin_user_id, source_request_id, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(family.id)
        .bind(&family.family_name)
        .bind(family.family_password_hash.as_str())
        .bind(family.admin_user_id)
        .bind(family.source_request_id)
        .bind(family.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        insert_credential_with(&mut *tx, &admin).await?;

        tx.commit().await.map_err(db_error)?;

        Ok(Approval {
            request,
            family,
            admin,
        })
    }

    async fn reject_onboarding_request(
        &self,
        request_id: Uuid,
        reason: &str,
        reviewed_by: Option<Uuid>,
        reviewed_at: DateTime<Utc>,
    ) -> Result<OnboardingRequest, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            UPDATE onboarding_requests
            SET status = 'rejected', rejection_reason = $2, reviewed_utc = $3, reviewed_by = $4
            WHERE request_id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(reason)
        .bind(reviewed_at)
        .bind(reviewed_by)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?;

        let request = match row {
            Some(row) => OnboardingRequest::try_from(row)?,
            None => return Err(Self::decision_conflict(&mut tx, request_id).await),
        };

        tx.commit().await.map_err(db_error)?;
        Ok(request)
    }

    // ==================== Families ====================

    async fn find_family(&self, family_id: Uuid) -> Result<Option<FamilyScope>, StoreError> {
        let row = sqlx::query_as::<_, FamilyRow>("SELECT * FROM families WHERE family_id = $1")
            .bind(family_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(FamilyScope::from))
    }

    async fn find_family_by_name(
        &self,
        family_name: &str,
    ) -> Result<Option<FamilyScope>, StoreError> {
        let row = sqlx::query_as::<_, FamilyRow>("SELECT * FROM families WHERE family_name = $1")
            .bind(family_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(FamilyScope::from))
    }

    // ==================== Credentials ====================

    async fn insert_credential(&self, credential: &UserCredential) -> Result<(), StoreError> {
        insert_credential_with(&self.pool, credential).await
    }

    async fn find_credential(&self, user_id: Uuid) -> Result<Option<UserCredential>, StoreError> {
        sqlx::query_as::<_, CredentialRow>("SELECT * FROM user_credentials WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(UserCredential::try_from)
            .transpose()
    }

    async fn find_family_admin_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredential>, StoreError> {
        sqlx::query_as::<_, CredentialRow>(
            "SELECT * FROM user_credentials WHERE email = $1 AND role = 'family_admin'",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(UserCredential::try_from)
        .transpose()
    }

    async fn find_credential_in_family(
        &self,
        family_id: Uuid,
        email: &str,
    ) -> Result<Option<UserCredential>, StoreError> {
        sqlx::query_as::<_, CredentialRow>(
            "SELECT * FROM user_credentials WHERE family_id = $1 AND email = $2",
        )
        .bind(family_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(UserCredential::try_from)
        .transpose()
    }

    async fn find_family_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<UserCredential>, StoreError> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            "SELECT * FROM user_credentials WHERE email = $1 AND family_id IS NOT NULL ORDER BY created_utc ASC",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        credentials(rows)
    }

    async fn list_family_credentials(
        &self,
        family_id: Uuid,
    ) -> Result<Vec<UserCredential>, StoreError> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            "SELECT * FROM user_credentials WHERE family_id = $1 ORDER BY created_utc ASC",
        )
        .bind(family_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        credentials(rows)
    }

    async fn ensure_super_admin(
        &self,
        credential: &UserCredential,
    ) -> Result<UserCredential, StoreError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            INSERT INTO user_credentials (user_id, email, full_name, role, family_id, password_hash, created_utc)
            VALUES ($1, $2, $3, 'super_admin', NULL, $4, $5)
            ON CONFLICT (email) WHERE role = 'super_admin'
            DO UPDATE SET password_hash = EXCLUDED.password_hash
            RETURNING *
            "#,
        )
        .bind(credential.id)
        .bind(&credential.email)
        .bind(&credential.full_name)
        .bind(credential.password_hash.as_ref().map(|h| h.as_str()))
        .bind(credential.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        UserCredential::try_from(row)
    }

    // ==================== Magic Links ====================

    async fn insert_magic_link(&self, token: &MagicLinkToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO magic_link_tokens (token_id, email, token_hash, expiry_utc, used, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id)
        .bind(&token.email)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.used)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn consume_magic_link(&self, email: &str, token_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE magic_link_tokens SET used = TRUE
            WHERE email = $1 AND token_hash = $2 AND used = FALSE AND expiry_utc > NOW()
            "#,
        )
        .bind(email)
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
