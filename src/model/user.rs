use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sentinel department label for users with no department assigned.
/// Analytics group these users under this value instead of dropping them.
pub const UNASSIGNED_DEPARTMENT: &str = "—";

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "jdoe")]
    pub username: String,

    #[serde(skip_serializing)]
    pub password: String,

    #[schema(example = "John Doe")]
    pub name: String,

    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,

    /// 1 = admin, 2 = employee
    #[schema(example = 2)]
    pub role: u8,

    #[schema(example = true)]
    pub is_active: bool,
}

/// Slim user projection consumed by the analytics core: the grouping
/// dimension (department) and the denominator universe (active employees).
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct UserDim {
    pub id: u64,
    pub name: String,
    pub department: Option<String>,
}

impl UserDim {
    pub fn department_label(&self) -> &str {
        self.department.as_deref().unwrap_or(UNASSIGNED_DEPARTMENT)
    }
}
