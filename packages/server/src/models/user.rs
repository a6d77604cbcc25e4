use serde::{Deserialize, Serialize};

use super::recipe::ShortRecipeResponse;
use super::shared::{Pagination, validate_length};
use crate::entity::user;
use crate::error::AppError;

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique email address.
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Unique username (1-150 chars: letters, digits and `@.+-_`).
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "Alice")]
    pub first_name: String,
    #[schema(example = "Liddell")]
    pub last_name: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    let email = payload.email.trim();
    if email.is_empty() || email.chars().count() > 254 || !email.contains('@') {
        return Err(AppError::Validation("Enter a valid email address".into()));
    }
    validate_length(&payload.username, "Username", 150)?;
    if !payload
        .username
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AppError::Validation(
            "Username may contain only letters, digits and @/./+/-/_".into(),
        ));
    }
    validate_length(&payload.first_name, "First name", 150)?;
    validate_length(&payload.last_name, "Last name", 150)?;
    validate_password(&payload.password)
}

/// Request body for changing the current user's password.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SetPasswordRequest {
    pub new_password: String,
    pub current_password: String,
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let length = password.chars().count();
    if !(8..=128).contains(&length) {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

/// Response for a freshly registered user.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    #[schema(example = 42)]
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<user::Model> for RegisterResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            email: m.email,
            username: m.username,
            first_name: m.first_name,
            last_name: m.last_name,
        }
    }
}

/// A user as seen by the requester.
#[derive(Serialize, Debug, Clone, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the requester follows this user. Always false for anonymous requesters.
    pub is_subscribed: bool,
}

impl UserResponse {
    pub fn project(m: user::Model, is_subscribed: bool) -> Self {
        Self {
            id: m.id,
            email: m.email,
            username: m.username,
            first_name: m.first_name,
            last_name: m.last_name,
            is_subscribed,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: Pagination,
}

/// A followed author with a preview of their recipes.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    /// Newest recipes first, truncated by `recipes_limit`.
    pub recipes: Vec<ShortRecipeResponse>,
    /// Total number of recipes by this author, ignoring `recipes_limit`.
    #[schema(example = 5)]
    pub recipes_count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubscriptionListResponse {
    pub data: Vec<SubscriptionResponse>,
    pub pagination: Pagination,
}

/// Query string for paginated user lists.
#[derive(Deserialize, Default, utoipa::IntoParams)]
pub struct UserListQuery {
    /// Page number (1-based). Invalid values fall back to 1.
    pub page: Option<String>,
    /// Items per page. Invalid values fall back to the default page size.
    pub limit: Option<String>,
}

/// Query string for the subscription listing.
#[derive(Deserialize, Default, utoipa::IntoParams)]
pub struct SubscriptionQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Maximum number of recipes shown per author. Ignored unless a positive integer.
    pub recipes_limit: Option<String>,
}

/// Query string accepted by the subscribe endpoint.
#[derive(Deserialize, Default, utoipa::IntoParams)]
pub struct RecipesLimitQuery {
    /// Maximum number of recipes shown for the author. Ignored unless a positive integer.
    pub recipes_limit: Option<String>,
}
