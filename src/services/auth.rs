//! Registration and authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{Actor, ActorClaims, RegisterUser, Role, User},
    repository::Repository,
};

/// Verified against when the username is unknown, so a miss costs the same as a wrong password
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("not-a-real-password").ok());

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new user with a salted argon2 credential hash
    pub async fn register(&self, username: &str, raw_password: &str, role: Role) -> AppResult<()> {
        RegisterUser {
            username: username.to_string(),
            password: raw_password.to_string(),
            role,
        }
        .validate()?;

        if self.repository.users.exists(username).await? {
            tracing::warn!(username, "Registration refused, username taken");
            return Err(AppError::DuplicateUser(username.to_string()));
        }

        let user = User {
            username: username.to_string(),
            credential_hash: hash_password(raw_password)?,
            role,
            created_at: Utc::now(),
        };

        // The store still rejects a racing registration of the same name
        self.repository.users.insert(&user).await?;

        tracing::info!(username, %role, "User registered");
        Ok(())
    }

    /// Authenticate a user and return the actor token for later calls
    pub async fn login(&self, username: &str, raw_password: &str) -> AppResult<Actor> {
        let Some(user) = self.repository.users.find_by_username(username).await? else {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(dummy, raw_password);
            }
            tracing::warn!(username, "Login failed");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(&user.credential_hash, raw_password)? {
            tracing::warn!(username, "Login failed");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(username, role = %user.role, "Login successful");
        Ok(Actor::from(&user))
    }

    /// Sign a bearer token carrying the actor
    pub fn issue_token(&self, actor: &Actor) -> AppResult<String> {
        let hours = self.config.jwt_expiration_hours;
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(hours)
            .ok()
            .and_then(|h| h.checked_mul(3600))
            .filter(|ttl| now.checked_add(*ttl).is_some())
            .ok_or_else(|| {
                AppError::Internal(format!("Token lifetime of {} hours is out of range", hours))
            })?;

        ActorClaims::for_actor(actor, now, ttl)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Recover the actor from a bearer token, checking signature and expiry
    pub fn verify_token(&self, token: &str) -> AppResult<Actor> {
        ActorClaims::from_token(token, &self.config.jwt_secret)
            .map(ActorClaims::into_actor)
            .map_err(|e| AppError::Authentication(e.to_string()))
    }
}

/// Hash a password using Argon2 with a fresh random salt
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Constant-time check of `password` against a PHC hash string
fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".into()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        error::StoreError,
        repository::{MockCatalogueStore, MockCredentialStore},
    };

    fn service() -> AuthService {
        AuthService::new(Repository::in_memory(), AuthConfig::default())
    }

    fn with_users(users: MockCredentialStore) -> AuthService {
        AuthService::new(
            Repository::new(Arc::new(users), Arc::new(MockCatalogueStore::new())),
            AuthConfig::default(),
        )
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_original_role() {
        let auth = service();
        auth.register("ann", "secret1", Role::Borrower).await.unwrap();

        let err = auth
            .register("ann", "anything", Role::Administrator)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateUser(_)));

        let actor = auth.login("ann", "secret1").await.unwrap();
        assert_eq!(actor.role(), Role::Borrower);
    }

    #[tokio::test]
    async fn login_checks_password() {
        let auth = service();
        auth.register("bob", "abcdef", Role::Borrower).await.unwrap();

        assert!(matches!(
            auth.login("bob", "wrongpw").await,
            Err(AppError::InvalidCredentials)
        ));

        let actor = auth.login("bob", "abcdef").await.unwrap();
        assert_eq!(actor.username(), "bob");
        assert_eq!(actor.role(), Role::Borrower);
    }

    #[tokio::test]
    async fn unknown_user_gets_same_error_as_bad_password() {
        let auth = service();
        assert!(matches!(
            auth.login("nobody", "abcdef").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn usernames_are_case_sensitive() {
        let auth = service();
        auth.register("Carol", "abcdef", Role::Borrower).await.unwrap();
        assert!(auth.login("carol", "abcdef").await.is_err());
        auth.register("carol", "abcdef", Role::Administrator).await.unwrap();
    }

    #[tokio::test]
    async fn registration_input_is_validated() {
        let auth = service();
        for (username, password) in [("", "abcdef"), ("   ", "abcdef"), ("dan", "abc"), ("dan", "      ")] {
            let err = auth
                .register(username, password, Role::Borrower)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{username:?}/{password:?}");
        }
        assert!(matches!(
            auth.login("dan", "abcdef").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn stored_credential_is_a_salted_hash() {
        let repository = Repository::in_memory();
        let auth = AuthService::new(repository.clone(), AuthConfig::default());
        auth.register("eve", "abcdef", Role::Borrower).await.unwrap();
        auth.register("fay", "abcdef", Role::Borrower).await.unwrap();

        let eve = repository.users.find_by_username("eve").await.unwrap().unwrap();
        let fay = repository.users.find_by_username("fay").await.unwrap().unwrap();
        assert!(eve.credential_hash.starts_with("$argon2"));
        assert!(!eve.credential_hash.contains("abcdef"));
        assert_ne!(eve.credential_hash, fay.credential_hash);
    }

    #[tokio::test]
    async fn store_failure_surfaces_without_insert() {
        let mut users = MockCredentialStore::new();
        users
            .expect_exists()
            .returning(|_| Err(AppError::Store(StoreError::Backend("timeout".into()))));
        users.expect_insert().times(0);

        let err = with_users(users)
            .register("gus", "abcdef", Role::Borrower)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Store(_)));
    }

    #[tokio::test]
    async fn racing_insert_reports_duplicate() {
        let mut users = MockCredentialStore::new();
        users.expect_exists().returning(|_| Ok(false));
        users
            .expect_insert()
            .times(1)
            .returning(|u| Err(AppError::DuplicateUser(u.username.clone())));

        let err = with_users(users)
            .register("hal", "abcdef", Role::Borrower)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateUser(_)));
    }

    #[test]
    fn oversized_token_lifetime_is_an_error() {
        for hours in [u64::MAX, i64::MAX as u64 / 3600 + 1, i64::MAX as u64 / 3600] {
            let auth = AuthService::new(
                Repository::in_memory(),
                AuthConfig {
                    jwt_expiration_hours: hours,
                    ..AuthConfig::default()
                },
            );
            let actor = Actor::new("jim", Role::Borrower);
            assert!(
                matches!(auth.issue_token(&actor), Err(AppError::Internal(_))),
                "{hours}"
            );
        }
    }

    #[tokio::test]
    async fn tokens_carry_the_actor() {
        let auth = service();
        auth.register("ivy", "abcdef", Role::Administrator).await.unwrap();
        let actor = auth.login("ivy", "abcdef").await.unwrap();

        let token = auth.issue_token(&actor).unwrap();
        assert_eq!(auth.verify_token(&token).unwrap(), actor);
        assert!(matches!(
            auth.verify_token("garbage"),
            Err(AppError::Authentication(_))
        ));
    }
}
