use crate::auth::auth::AuthUser;
use crate::model::leave::{Leave, LeaveStatus, LeaveType};
use crate::utils::db_utils::{Filters, SqlValue, bind_values_as, bind_values_scalar};
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeaveReq {
    #[schema(example = "sick")]
    pub leave_type: LeaveType,
    #[schema(example = "2025-10-06", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-10-08", format = "date", value_type = String)]
    pub end_date: NaiveDate,
}

#[derive(serde::Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<Leave>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams)]
pub struct LeaveQuery {
    #[param(example = 1)]
    pub page: Option<u64>,
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Admin only; employees always see their own requests.
    #[param(example = 42)]
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub leave_type: Option<LeaveType>,
    /// Keep requests whose span touches [from, to].
    #[param(example = "2025-10-01", value_type = String, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(example = "2025-10-31", value_type = String, format = "date")]
    pub to: Option<NaiveDate>,
}

fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Submit a leave request
#[utoipa::path(
    post,
    path = "/api/v1/leaves",
    request_body = CreateLeaveReq,
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "message": "Leave request submitted",
            "total_days": 3,
            "status": "pending"
        })),
        (status = 400, description = "Invalid dates"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Overlaps an existing pending or approved request"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leaves"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeaveReq>,
) -> actix_web::Result<impl Responder> {
    if payload.start_date > payload.end_date {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    let overlapping = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM leaves
        WHERE user_id = ?
          AND status IN ('pending', 'approved')
          AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.end_date)
    .bind(payload.start_date)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Leave overlap check failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if overlapping > 0 {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "An overlapping leave request already exists"
        })));
    }

    // Department is snapshotted at request time so later transfers do not
    // rewrite leave history.
    let department = sqlx::query_scalar::<_, Option<String>>(
        "SELECT department FROM users WHERE id = ?",
    )
    .bind(auth.user_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Department lookup failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let total_days = inclusive_days(payload.start_date, payload.end_date);

    sqlx::query(
        r#"
        INSERT INTO leaves
            (user_id, department, leave_type, start_date, end_date, total_days, status)
        VALUES (?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(auth.user_id)
    .bind(department)
    .bind(payload.leave_type.to_string())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(total_days)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to create leave request");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted",
        "total_days": total_days,
        "status": "pending"
    })))
}

/// List leave requests
#[utoipa::path(
    get,
    path = "/api/v1/leaves",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leaves"
)]
pub async fn list_leaves(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut filters = Filters::new();
    if auth.is_employee() {
        filters.push("user_id = ?", SqlValue::U64(auth.user_id));
    } else if let Some(employee_id) = query.employee_id {
        filters.push("user_id = ?", SqlValue::U64(employee_id));
    }
    if let Some(status) = query.status {
        filters.push("status = ?", SqlValue::String(status.to_string()));
    }
    if let Some(leave_type) = query.leave_type {
        filters.push("leave_type = ?", SqlValue::String(leave_type.to_string()));
    }
    if let Some(to) = query.to {
        filters.push("start_date <= ?", SqlValue::Date(to));
    }
    if let Some(from) = query.from {
        filters.push("end_date >= ?", SqlValue::Date(from));
    }

    let where_sql = filters.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM leaves {}", where_sql);
    let total = bind_values_scalar(
        sqlx::query_scalar::<_, i64>(&count_sql),
        filters.values(),
    )
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to count leave requests");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, user_id, department, leave_type, start_date, end_date,
               total_days, status, created_at
        FROM leaves
        {}
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let data = bind_values_as(sqlx::query_as::<_, Leave>(&data_sql), filters.values())
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch leave list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

// Approve and reject share the guarded pending-only transition; the guard in
// the WHERE clause is what makes a repeated decision a no-op.
async fn decide_leave(
    pool: &MySqlPool,
    leave_id: u64,
    decided_by: u64,
    next: LeaveStatus,
) -> actix_web::Result<HttpResponse> {
    let result = sqlx::query("UPDATE leaves SET status = ? WHERE id = ? AND status = 'pending'")
        .bind(next.to_string())
        .bind(leave_id)
        .execute(pool)
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Leave decision failed");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Leave request not found or already processed"
        })));
    }

    info!(leave_id, decided_by, status = %next, "Leave request decided");
    Ok(HttpResponse::Ok().json(json!({ "message": format!("Leave {next}") })))
}

/// Approve a pending leave request
#[utoipa::path(
    put,
    path = "/api/v1/leaves/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "Leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 400, description = "Not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leaves"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    decide_leave(
        pool.get_ref(),
        path.into_inner(),
        auth.user_id,
        LeaveStatus::Approved,
    )
    .await
}

/// Reject a pending leave request
#[utoipa::path(
    put,
    path = "/api/v1/leaves/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "Leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 400, description = "Not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leaves"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    decide_leave(
        pool.get_ref(),
        path.into_inner(),
        auth.user_id,
        LeaveStatus::Rejected,
    )
    .await
}

/// Cancel one of your own pending leave requests
#[utoipa::path(
    put,
    path = "/api/v1/leaves/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "Leave request to cancel")
    ),
    responses(
        (status = 200, description = "Leave cancelled", body = Object, example = json!({
            "message": "Leave cancelled"
        })),
        (status = 400, description = "Not found, not yours, or already processed"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leaves"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    // Ownership is part of the guard, so cancelling someone else's request
    // reads the same as cancelling a processed one.
    let result = sqlx::query(
        "UPDATE leaves SET status = 'cancelled' WHERE id = ? AND user_id = ? AND status = 'pending'",
    )
    .bind(leave_id)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Leave cancel failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Leave request not found or already processed"
        })));
    }

    info!(leave_id, user_id = auth.user_id, "Leave request cancelled");
    Ok(HttpResponse::Ok().json(json!({ "message": "Leave cancelled" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn day_count_includes_both_endpoints() {
        assert_eq!(inclusive_days(d(2025, 10, 6), d(2025, 10, 6)), 1);
        assert_eq!(inclusive_days(d(2025, 10, 6), d(2025, 10, 8)), 3);
        // across a month boundary
        assert_eq!(inclusive_days(d(2025, 10, 30), d(2025, 11, 2)), 4);
    }
}
