//! Role-based session issuer.
//!
//! Each login scheme is one [`AuthRequest`] variant with its own resolver.
//! Every resolver ends in [`SessionIssuer::issue_session`], so a token always
//! carries exactly one role and, for family roles, one family id.

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{MagicLinkConfig, SuperAdminConfig};
use crate::models::magic_link::hash_token;
use crate::models::{MagicLinkToken, Role, Session, UserCredential, UserProfile};
use crate::services::metrics::record_login;
use crate::services::notifier::{notify_best_effort, Notification, Notifier};
use crate::services::{CredentialStore, JwtService, ServiceError, TokenRevocationList};
use crate::utils::{
    constant_time_str_eq, normalize_email, verify_against_dummy, verify_password, Password,
    PasswordHashString,
};

/// Issued bearer session.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthSession {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Seconds until the token expires
    #[schema(example = 86400)]
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Credentials presented to one of the login schemes.
#[derive(Debug)]
pub enum AuthRequest {
    SuperAdmin {
        username: String,
        password: Password,
    },
    Admin {
        email: String,
        password: Password,
    },
    Member {
        email: String,
        family_name: String,
        family_password: Password,
    },
    /// Deprecated one-time email link.
    MagicLink { email: String, token: String },
}

impl AuthRequest {
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthRequest::SuperAdmin { .. } => "super_admin",
            AuthRequest::Admin { .. } => "family_admin",
            AuthRequest::Member { .. } => "family_member",
            AuthRequest::MagicLink { .. } => "magic_link",
        }
    }
}

/// The configured super admin, resolved against its stored credential.
#[derive(Clone)]
pub struct SuperAdminAccount {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    password_hash: PasswordHashString,
}

impl SuperAdminAccount {
    /// Seed the configured super admin into `store` and return the account
    /// with its persisted id.
    pub async fn provision(
        store: &dyn CredentialStore,
        config: &SuperAdminConfig,
    ) -> Result<Self, ServiceError> {
        let password_hash = PasswordHashString::parse(config.password_hash.expose_secret())
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("SUPERADMIN_PASSWORD_HASH: {}", e)))?;

        let credential =
            UserCredential::new_super_admin(normalize_email(&config.email), password_hash.clone());
        let stored = store.ensure_super_admin(&credential).await?;

        tracing::info!(user_id = %stored.id, "Super admin provisioned");

        Ok(Self {
            user_id: stored.id,
            username: config.username.clone(),
            email: stored.email,
            password_hash,
        })
    }
}

#[derive(Clone)]
pub struct SessionIssuer {
    store: Arc<dyn CredentialStore>,
    jwt: JwtService,
    revocations: Arc<dyn TokenRevocationList>,
    notifier: Arc<dyn Notifier>,
    super_admin: Option<SuperAdminAccount>,
    magic_link: MagicLinkConfig,
}

impl SessionIssuer {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        jwt: JwtService,
        revocations: Arc<dyn TokenRevocationList>,
        notifier: Arc<dyn Notifier>,
        super_admin: Option<SuperAdminAccount>,
        magic_link: MagicLinkConfig,
    ) -> Self {
        Self {
            store,
            jwt,
            revocations,
            notifier,
            super_admin,
            magic_link,
        }
    }

    pub async fn authenticate(&self, request: AuthRequest) -> Result<AuthSession, ServiceError> {
        let scheme = request.scheme();
        let result = match request {
            AuthRequest::SuperAdmin { username, password } => {
                self.super_admin_login(&username, &password).await
            }
            AuthRequest::Admin { email, password } => {
                self.family_admin_login(&email, &password).await
            }
            AuthRequest::Member {
                email,
                family_name,
                family_password,
            } => {
                self.family_member_login(&email, &family_name, &family_password)
                    .await
            }
            AuthRequest::MagicLink { email, token } => self.magic_link_login(&email, &token).await,
        };

        record_login(scheme, result.is_ok());
        if let Err(e) = &result {
            tracing::info!(scheme, error = %e, "Login failed");
        }
        result
    }

    async fn super_admin_login(
        &self,
        username: &str,
        password: &Password,
    ) -> Result<AuthSession, ServiceError> {
        let Some(account) = &self.super_admin else {
            verify_against_dummy(password);
            return Err(ServiceError::InvalidCredentials);
        };

        // Both checks always run.
        let username_ok = constant_time_str_eq(username.trim(), &account.username);
        let password_ok = verify_password(password, &account.password_hash)?;

        if !(username_ok && password_ok) {
            return Err(ServiceError::InvalidCredentials);
        }

        self.issue_session(account.user_id, &account.email, Role::SuperAdmin, None)
    }

    async fn family_admin_login(
        &self,
        email: &str,
        password: &Password,
    ) -> Result<AuthSession, ServiceError> {
        let email = normalize_email(email);

        if self
            .store
            .find_pending_request_by_email(&email)
            .await?
            .is_some()
        {
            return Err(ServiceError::PendingApproval);
        }

        let admin = match self.store.find_family_admin_by_email(&email).await? {
            Some(admin) => admin,
            None => {
                verify_against_dummy(password);
                return Err(ServiceError::InvalidCredentials);
            }
        };

        let Some(hash) = admin.password_hash.as_ref() else {
            verify_against_dummy(password);
            return Err(ServiceError::InvalidCredentials);
        };
        if !verify_password(password, hash)? {
            return Err(ServiceError::InvalidCredentials);
        }

        self.issue_session(admin.id, &admin.email, Role::FamilyAdmin, admin.family_id)
    }

    /// Every failure here returns the same error so the response does not
    /// reveal whether the family, the password or the membership was wrong.
    async fn family_member_login(
        &self,
        email: &str,
        family_name: &str,
        family_password: &Password,
    ) -> Result<AuthSession, ServiceError> {
        let email = normalize_email(email);

        let Some(family) = self.store.find_family_by_name(family_name.trim()).await? else {
            verify_against_dummy(family_password);
            return Err(ServiceError::InvalidMemberCredentials);
        };

        if !verify_password(family_password, &family.family_password_hash)? {
            return Err(ServiceError::InvalidMemberCredentials);
        }

        let member = self
            .store
            .find_credential_in_family(family.id, &email)
            .await?
            .ok_or(ServiceError::InvalidMemberCredentials)?;

        self.issue_session(member.id, &member.email, member_session_role(member.role), Some(family.id))
    }

    /// Send a one-time link. The outcome is the same whether or not the email
    /// belongs to anyone.
    pub async fn request_magic_link(&self, email: &str) -> Result<(), ServiceError> {
        if !self.magic_link.enabled {
            return Err(ServiceError::MagicLinkDisabled);
        }

        let email = normalize_email(email);
        if self
            .store
            .find_family_credentials_by_email(&email)
            .await?
            .is_empty()
        {
            tracing::debug!("Magic link requested for unknown email");
            return Ok(());
        }

        let (token, raw) = MagicLinkToken::issue(email.clone(), self.magic_link.ttl_minutes);
        self.store.insert_magic_link(&token).await?;

        let link = format!(
            "{}/auth/callback?token={}",
            self.magic_link.base_url.trim_end_matches('/'),
            raw
        );
        notify_best_effort(
            self.notifier.as_ref(),
            Notification::MagicLink {
                email,
                token: raw,
                link,
            },
        )
        .await;

        Ok(())
    }

    async fn magic_link_login(&self, email: &str, token: &str) -> Result<AuthSession, ServiceError> {
        if !self.magic_link.enabled {
            return Err(ServiceError::MagicLinkDisabled);
        }

        let email = normalize_email(email);
        if !self
            .store
            .consume_magic_link(&email, &hash_token(token.trim()))
            .await?
        {
            return Err(ServiceError::InvalidToken);
        }

        // Earliest family membership wins; never creates a credential.
        let member = self
            .store
            .find_family_credentials_by_email(&email)
            .await?
            .into_iter()
            .next()
            .ok_or(ServiceError::InvalidToken)?;

        self.issue_session(
            member.id,
            &member.email,
            member_session_role(member.role),
            member.family_id,
        )
    }

    /// Verify signature, expiry and revocation.
    pub async fn verify_token(&self, token: &str) -> Result<Session, ServiceError> {
        let session = self.jwt.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            ServiceError::InvalidToken
        })?;

        if self.revocations.is_revoked(&session.token_id).await? {
            return Err(ServiceError::InvalidToken);
        }

        Ok(session)
    }

    pub async fn logout(&self, session: &Session) -> Result<(), ServiceError> {
        self.revocations
            .revoke(&session.token_id, session.expires_at)
            .await?;
        tracing::info!(user_id = %session.user_id, "Session revoked");
        Ok(())
    }

    fn issue_session(
        &self,
        user_id: Uuid,
        email: &str,
        role: Role,
        family_id: Option<Uuid>,
    ) -> Result<AuthSession, ServiceError> {
        let (access_token, session) = self.jwt.issue(user_id, email, role, family_id)?;

        tracing::info!(user_id = %user_id, role = %role, "Session issued");

        Ok(AuthSession {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.access_token_expiry_seconds(),
            user: session.profile(),
        })
    }
}

/// Shared-secret logins never grant family_admin.
fn member_session_role(role: Role) -> Role {
    match role {
        Role::FamilyAdmin => Role::FamilyUser,
        other => other,
    }
}
