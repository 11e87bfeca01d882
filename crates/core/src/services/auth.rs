//! Authentication: signup, credential sign-in and external sign-in.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::entities::user;
use huddle_db::repositories::UserRepository;
use serde::Deserialize;
use validator::Validate;

use super::identity::ExternalIdentity;
use super::session::Session;

/// Input for creating a credentials account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    #[validate(email, length(max = 320))]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(min = 1, max = 256))]
    pub name: Option<String>,
}

/// Input for credential sign-in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a credentials account.
    pub async fn signup(&self, input: SignupInput) -> AppResult<user::Model> {
        input.validate()?;

        let user = user::Model {
            id: self.id_gen.generate(),
            email: user::normalize_email(&input.email),
            name: input.name,
            image: None,
            password_hash: Some(hash_password(&input.password)?),
            provider: user::AuthProvider::Credentials,
            created_at: Utc::now().into(),
            updated_at: None,
        };

        let user = self.user_repo.create(user).await?;
        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Verify an email and password.
    ///
    /// Unknown email, external accounts and wrong passwords all fail with
    /// the same [`AppError::InvalidCredentials`].
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_hash = user
            .password_hash
            .as_deref()
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Sign in with an identity asserted by an external provider.
    ///
    /// The first sign-in for an email creates the user.
    pub async fn sign_in_external(&self, identity: ExternalIdentity) -> AppResult<user::Model> {
        if let Some(existing) = self.user_repo.find_by_email(&identity.email).await? {
            return Ok(existing);
        }

        let user = user::Model {
            id: self.id_gen.generate(),
            email: user::normalize_email(&identity.email),
            name: identity.name,
            image: identity.image,
            password_hash: None,
            provider: identity.provider,
            created_at: Utc::now().into(),
            updated_at: None,
        };

        match self.user_repo.create(user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, provider = ?user.provider, "Created user from external sign-in");
                Ok(user)
            }
            // Lost a race with a concurrent first sign-in
            Err(AppError::Conflict(_)) => self
                .user_repo
                .find_by_email(&identity.email)
                .await?
                .ok_or_else(|| AppError::UserNotFound(identity.email.clone())),
            Err(e) => Err(e),
        }
    }

    /// The user behind a session.
    pub async fn me(&self, session: &Session) -> AppResult<user::Model> {
        self.user_repo.get_by_id(&session.user_id).await
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against an Argon2 PHC string.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn stored_user(email: &str, password: Option<&str>) -> user::Model {
        user::Model {
            id: "u1".to_string(),
            email: email.to_string(),
            name: Some("Alice".to_string()),
            image: None,
            password_hash: password.map(|p| hash_password(p).unwrap()),
            provider: if password.is_some() {
                user::AuthProvider::Credentials
            } else {
                user::AuthProvider::Google
            },
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> AuthService {
        AuthService::new(UserRepository::new(Arc::new(db.into_connection())))
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(
            hash_password("same").unwrap(),
            hash_password("same").unwrap()
        );
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_user("alice@example.com", Some("hunter22"))]]);

        let user = service(db)
            .authenticate("Alice@Example.com", "hunter22")
            .await
            .unwrap();
        assert_eq!(user.id, "u1");
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_indistinguishable() {
        let unknown = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        )
        .authenticate("nobody@example.com", "hunter22")
        .await;

        let wrong_password = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored_user("alice@example.com", Some("hunter22"))]]),
        )
        .authenticate("alice@example.com", "hunter23")
        .await;

        let external_account = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored_user("alice@example.com", None)]]),
        )
        .authenticate("alice@example.com", "hunter22")
        .await;

        for result in [unknown, wrong_password, external_account] {
            assert!(matches!(result, Err(AppError::InvalidCredentials)));
        }
    }

    #[tokio::test]
    async fn test_signup_rejects_short_password() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .signup(SignupInput {
                email: "a@example.com".to_string(),
                password: "short".to_string(),
                name: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_signup_normalizes_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ]);

        let user = service(db)
            .signup(SignupInput {
                email: "Bob@Example.COM".to_string(),
                password: "long enough".to_string(),
                name: Some("Bob".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(user.email, "bob@example.com");
        assert_eq!(user.provider, user::AuthProvider::Credentials);
        assert!(user.password_hash.is_some());
    }

    #[tokio::test]
    async fn test_sign_in_external_creates_user_once() {
        let identity = ExternalIdentity {
            provider: user::AuthProvider::Google,
            email: "Carol@Example.com".to_string(),
            name: Some("Carol".to_string()),
            image: Some("https://img/c.png".to_string()),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]);

        let user = service(db).sign_in_external(identity.clone()).await.unwrap();
        assert_eq!(user.email, "carol@example.com");
        assert_eq!(user.provider, user::AuthProvider::Google);
        assert!(user.password_hash.is_none());

        // Second sign-in finds the row and does not insert
        let existing = user.clone();
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]);
        let again = service(db).sign_in_external(identity).await.unwrap();
        assert_eq!(again.id, user.id);
    }
}
