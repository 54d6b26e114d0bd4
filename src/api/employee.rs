use crate::auth::auth::AuthUser;
use crate::auth::handlers::insert_user;
use crate::model::role::Role;
use crate::model::user::User;
use crate::models::RegisterReq;
use crate::utils::db_utils::{
    Filters, SqlValue, bind_values_as, bind_values_scalar, build_update_sql, execute_update,
};
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployeeReq {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "s3cret")]
    pub password: String,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,
    /// 1 = admin, 2 = employee
    #[schema(example = 2)]
    pub role_id: u8,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams)]
pub struct EmployeeQuery {
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
    #[param(example = "Engineering")]
    pub department: Option<String>,
    /// 1 = admin, 2 = employee
    #[param(example = 2)]
    pub role: Option<u8>,
    #[param(example = true)]
    pub is_active: Option<bool>,
    /// Substring match on name or username.
    #[param(example = "doe")]
    pub search: Option<String>,
}

// Columns an admin may touch through the dynamic update endpoint. Credentials
// rotate through the auth flow, never through here.
const UPDATABLE_COLUMNS: &[&str] = &["name", "department", "role", "is_active"];

/// Create an employee account
#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployeeReq,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "message": "Employee created"
        })),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Username already exists"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employees"
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployeeReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if payload.username.trim().is_empty()
        || payload.password.is_empty()
        || payload.name.trim().is_empty()
    {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Username, password and name must not be empty"
        })));
    }

    let Some(role) = Role::from_id(payload.role_id) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Unknown role id"
        })));
    };

    let register = RegisterReq {
        username: payload.username.clone(),
        password: payload.password.clone(),
        name: payload.name.clone(),
        department: payload.department.clone(),
        role_id: payload.role_id,
    };

    if let Err(response) = insert_user(&register, role, pool.get_ref()).await {
        return Ok(response);
    }

    info!(username = %register.username.trim(), created_by = auth.user_id, "Employee created");
    Ok(HttpResponse::Created().json(json!({ "message": "Employee created" })))
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employees"
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut filters = Filters::new();
    if let Some(department) = &query.department {
        filters.push("department = ?", SqlValue::String(department.clone()));
    }
    if let Some(role) = query.role {
        filters.push("role = ?", SqlValue::U64(role as u64));
    }
    if let Some(is_active) = query.is_active {
        filters.push("is_active = ?", SqlValue::Bool(is_active));
    }
    if let Some(search) = &query.search {
        let like = format!("%{}%", search);
        filters.push(
            "(name LIKE ? OR username LIKE ?)",
            SqlValue::String(like.clone()),
        );
        filters.push_value(SqlValue::String(like));
    }

    let where_sql = filters.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM users {}", where_sql);
    let total = bind_values_scalar(
        sqlx::query_scalar::<_, i64>(&count_sql),
        filters.values(),
    )
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to count employees");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, username, password, name, department, role, is_active
        FROM users
        {}
        ORDER BY id
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let data = bind_values_as(sqlx::query_as::<_, User>(&data_sql), filters.values())
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch employee list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Fetch one employee
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee to fetch")
    ),
    responses(
        (status = 200, description = "Employee found", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employees"
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    // Employees may read their own profile; everything else is admin.
    if auth.is_employee() && auth.user_id != employee_id {
        return Err(actix_web::error::ErrorForbidden("Not your profile"));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password, name, department, role, is_active FROM users WHERE id = ?",
    )
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch employee");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match user {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
}

/// Update employee fields
#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee to update")
    ),
    request_body(
        content = Object,
        description = "Subset of: name, department, role, is_active",
        content_type = "application/json",
        example = json!({ "department": "Platform", "is_active": false })
    ),
    responses(
        (status = 200, description = "Employee updated", body = Object, example = json!({
            "message": "Employee updated"
        })),
        (status = 400, description = "Empty payload or unknown field"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employees"
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();
    let update = build_update_sql("users", &payload, UPDATABLE_COLUMNS, "id", employee_id)?;

    let rows = execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, employee_id, "Employee update failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if rows == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    info!(employee_id, updated_by = auth.user_id, "Employee updated");
    Ok(HttpResponse::Ok().json(json!({ "message": "Employee updated" })))
}
