//! User model, roles and the authenticated actor token

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use super::not_blank;
use crate::error::AppError;

/// The two classes of actors known to the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Borrower,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Borrower => "borrower",
            Role::Administrator => "administrator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrower" => Ok(Role::Borrower),
            "administrator" => Ok(Role::Administrator),
            _ => Err(AppError::Validation(format!("Unknown role: {}", s))),
        }
    }
}

/// Legacy numeric role codes: 1 = borrower, 2 = administrator
impl TryFrom<i16> for Role {
    type Error = AppError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Role::Borrower),
            2 => Ok(Role::Administrator),
            _ => Err(AppError::Validation(format!(
                "Role must be 1 (borrower) or 2 (administrator), got {}",
                code
            ))),
        }
    }
}

/// Wire form of a role: either its slug or its legacy numeric code
#[derive(Deserialize)]
#[serde(untagged)]
enum RoleInput {
    Code(i16),
    Slug(String),
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let role = match RoleInput::deserialize(deserializer)? {
            RoleInput::Code(code) => Role::try_from(code),
            RoleInput::Slug(slug) => slug.parse(),
        };
        role.map_err(serde::de::Error::custom)
    }
}

// SQLx conversion for Role; unknown slugs are rejected on decode
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: &str = Decode::<Postgres>::decode(value)?;
        s.parse::<Role>().map_err(|e| e.to_string().into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Persisted user record. Never mutated after registration.
#[derive(Clone, FromRow)]
pub struct User {
    pub username: String,
    /// argon2 PHC string
    pub credential_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("credential_hash", &"<redacted>")
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Registration input, checked before anything is hashed or stored
#[derive(Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(custom(function = "not_blank"))]
    pub username: String,
    #[validate(
        length(min = 6, message = "Password must be at least 6 characters long"),
        custom(function = "not_blank")
    )]
    pub password: String,
    pub role: Role,
}

/// Authenticated identity carried into every inventory operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    username: String,
    role: Role,
}

impl Actor {
    pub(crate) fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::new(user.username.clone(), user.role)
    }
}

/// JWT claims carrying an actor across HTTP requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorClaims {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl ActorClaims {
    pub fn for_actor(actor: &Actor, issued_at: i64, ttl_seconds: i64) -> Self {
        Self {
            sub: actor.username.clone(),
            role: actor.role,
            exp: issued_at + ttl_seconds,
            iat: issued_at,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and validate a JWT token (signature and expiry)
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn into_actor(self) -> Actor {
        Actor::new(self.sub, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_slugs_round_trip() {
        assert_eq!("borrower".parse::<Role>().unwrap(), Role::Borrower);
        assert_eq!("administrator".parse::<Role>().unwrap(), Role::Administrator);
        assert!("Admin".parse::<Role>().is_err());
        assert_eq!(Role::Administrator.to_string(), "administrator");
    }

    #[test]
    fn legacy_role_codes() {
        assert_eq!(Role::try_from(1_i16).unwrap(), Role::Borrower);
        assert_eq!(Role::try_from(2_i16).unwrap(), Role::Administrator);
        assert!(matches!(Role::try_from(3_i16), Err(AppError::Validation(_))));
    }

    #[test]
    fn role_deserializes_from_slug_or_code() {
        let r: Role = serde_json::from_str("\"borrower\"").unwrap();
        assert_eq!(r, Role::Borrower);
        let r: Role = serde_json::from_str("2").unwrap();
        assert_eq!(r, Role::Administrator);
        assert!(serde_json::from_str::<Role>("\"librarian\"").is_err());
        assert!(serde_json::from_str::<Role>("0").is_err());
    }

    #[test]
    fn debug_never_shows_credential_hash() {
        let user = User {
            username: "ann".into(),
            credential_hash: "$argon2id$v=19$secret-material".into(),
            role: Role::Borrower,
            created_at: Utc::now(),
        };
        let printed = format!("{:?}", user);
        assert!(printed.contains("ann"));
        assert!(!printed.contains("secret-material"));
    }

    #[test]
    fn registration_rules() {
        let ok = RegisterUser {
            username: "ann".into(),
            password: "secret1".into(),
            role: Role::Borrower,
        };
        assert!(ok.validate().is_ok());

        let blank_name = RegisterUser {
            username: "   ".into(),
            ..ok_clone(&ok)
        };
        assert!(blank_name.validate().is_err());

        let short = RegisterUser {
            password: "abc".into(),
            ..ok_clone(&ok)
        };
        assert!(short.validate().is_err());

        let blank_pw = RegisterUser {
            password: "       ".into(),
            ..ok_clone(&ok)
        };
        assert!(blank_pw.validate().is_err());
    }

    fn ok_clone(r: &RegisterUser) -> RegisterUser {
        RegisterUser {
            username: r.username.clone(),
            password: r.password.clone(),
            role: r.role,
        }
    }

    #[test]
    fn claims_round_trip_through_jwt() {
        let actor = Actor::new("bob", Role::Borrower);
        let now = Utc::now().timestamp();
        let token = ActorClaims::for_actor(&actor, now, 3600)
            .create_token("secret")
            .unwrap();
        let back = ActorClaims::from_token(&token, "secret").unwrap().into_actor();
        assert_eq!(back, actor);
        assert!(ActorClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn expired_claims_are_rejected() {
        let actor = Actor::new("bob", Role::Borrower);
        let long_ago = Utc::now().timestamp() - 10 * 3600;
        let token = ActorClaims::for_actor(&actor, long_ago, 3600)
            .create_token("secret")
            .unwrap();
        assert!(ActorClaims::from_token(&token, "secret").is_err());
    }
}
