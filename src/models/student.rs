//! Student identity model and JWT claims

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

use crate::error::AppError;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversions: stored as TEXT
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Library account. Owned by the identity system; the workflows only read
/// role, roll number and contact fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: i32,
    pub roll_number: String,
    pub name: String,
    pub branch: Option<String>,
    pub email: Option<String>,
    pub role: Role,
}

/// Short student representation merged into borrow responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentSummary {
    pub id: i32,
    pub roll_number: String,
    pub name: String,
    pub branch: Option<String>,
}

impl From<Student> for StudentSummary {
    fn from(s: Student) -> Self {
        StudentSummary {
            id: s.id,
            roll_number: s.roll_number,
            name: s.name,
            branch: s.branch,
        }
    }
}

/// JWT claims for authenticated callers. Tokens are issued by the identity
/// collaborator; this server only validates and reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub roll_number: Option<String>,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Parse and validate a JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Administrator privileges required".to_string(),
            ))
        }
    }
}
