use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::core::shift_plan::{Plan, PlanItem, PlanStrategy, build_plan};
use crate::model::shift::{Shift, ShiftStatus, ShiftType};
use crate::utils::db_utils::{Filters, SqlValue, bind_values_as, bind_values_scalar};
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::str::FromStr;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct AssignShiftReq {
    #[schema(example = 42)]
    pub employee_id: u64,
    pub shift_type: ShiftType,
    /// Defaults to a single assignment.
    pub strategy: Option<PlanStrategy>,
    #[schema(example = "2025-10-06T00:00:00Z", value_type = String, format = "date-time")]
    pub start_time: DateTime<Utc>,
    #[schema(example = "2025-10-06T08:00:00Z", value_type = String, format = "date-time")]
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateShiftStatusReq {
    pub status: ShiftStatus,
}

#[derive(Deserialize, IntoParams)]
pub struct ShiftQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub employee_id: Option<u64>,
    pub shift_type: Option<ShiftType>,
    pub status: Option<ShiftStatus>,
    /// Inclusive local-day range on the shift's attribution day.
    #[param(example = "2025-10-01", value_type = String, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(example = "2025-10-31", value_type = String, format = "date")]
    pub to: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct ShiftListResponse {
    pub data: Vec<Shift>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

async fn window_conflicts(
    pool: &MySqlPool,
    user_id: u64,
    item: &PlanItem,
) -> Result<bool, sqlx::Error> {
    // An assigned or confirmed shift whose window intersects the new one
    // blocks the assignment; completed and cancelled shifts do not.
    let conflicts = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM shifts
        WHERE user_id = ?
          AND status IN ('assigned', 'confirmed')
          AND start_time < ? AND end_time > ?
        "#,
    )
    .bind(user_id)
    .bind(item.end)
    .bind(item.start)
    .fetch_one(pool)
    .await?;
    Ok(conflicts > 0)
}

/// Assign shift(s)
#[utoipa::path(
    post,
    path = "/api/v1/shifts",
    request_body = AssignShiftReq,
    responses(
        (status = 201, description = "Shift(s) created", body = Object, example = json!({
            "message": "Shift assigned",
            "created": 1
        })),
        (status = 400, description = "Plan rejected"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Window overlaps an existing shift"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn assign_shift(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<AssignShiftReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let strategy = payload.strategy.unwrap_or_default();
    let plan = build_plan(
        strategy,
        payload.shift_type,
        payload.start_time,
        payload.end_time,
        config.timezone,
    );

    let items = match plan {
        Plan::Single(item) => vec![item],
        Plan::Batch(items) => items,
        Plan::Rejected { reason } => {
            info!(employee_id = payload.employee_id, %reason, "Shift plan rejected");
            return Ok(HttpResponse::BadRequest().json(json!({ "message": reason })));
        }
    };

    for item in &items {
        let conflict = window_conflicts(pool.get_ref(), payload.employee_id, item)
            .await
            .map_err(|e| {
                error!(error = %e, "Shift conflict check failed");
                ErrorInternalServerError("Internal Server Error")
            })?;
        if conflict {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": format!("An active shift already covers {}", item.date)
            })));
        }
    }

    for item in &items {
        sqlx::query(
            r#"
            INSERT INTO shifts
                (user_id, shift_type, start_time, end_time, date, assigned_by, status, notes)
            VALUES (?, ?, ?, ?, ?, ?, 'assigned', ?)
            "#,
        )
        .bind(payload.employee_id)
        .bind(payload.shift_type.to_string())
        .bind(item.start)
        .bind(item.end)
        .bind(item.date)
        .bind(auth.user_id)
        .bind(&payload.notes)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id = payload.employee_id, "Shift insert failed");
            ErrorInternalServerError("Internal Server Error")
        })?;
    }

    info!(
        employee_id = payload.employee_id,
        shift_type = %payload.shift_type,
        created = items.len(),
        "Shift assignment stored"
    );

    Ok(HttpResponse::Created().json(json!({
        "message": "Shift assigned",
        "created": items.len()
    })))
}

/// List shifts
#[utoipa::path(
    get,
    path = "/api/v1/shifts",
    params(ShiftQuery),
    responses(
        (status = 200, description = "Paginated shift list", body = ShiftListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn list_shifts(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ShiftQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut filters = Filters::new();
    if auth.is_employee() {
        // Employees only see their own schedule.
        filters.push("user_id = ?", SqlValue::U64(auth.user_id));
    } else if let Some(employee_id) = query.employee_id {
        filters.push("user_id = ?", SqlValue::U64(employee_id));
    }
    if let Some(shift_type) = query.shift_type {
        filters.push("shift_type = ?", SqlValue::String(shift_type.to_string()));
    }
    if let Some(status) = query.status {
        filters.push("status = ?", SqlValue::String(status.to_string()));
    }
    if let Some(from) = query.from {
        filters.push("date >= ?", SqlValue::Date(from));
    }
    if let Some(to) = query.to {
        filters.push("date <= ?", SqlValue::Date(to));
    }

    let where_clause = filters.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM shifts {}", where_clause);
    debug!(sql = %count_sql, "Counting shifts");
    let total = bind_values_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filters.values())
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count shifts");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT * FROM shifts {} ORDER BY start_time DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, "Fetching shifts");
    let shifts = bind_values_as(sqlx::query_as::<_, Shift>(&data_sql), filters.values())
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch shifts");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(ShiftListResponse {
        data: shifts,
        page,
        per_page,
        total,
    }))
}

/// Update shift status
#[utoipa::path(
    put,
    path = "/api/v1/shifts/{id}/status",
    params(
        ("id", Path, description = "Shift ID")
    ),
    request_body = UpdateShiftStatusReq,
    responses(
        (status = 200, description = "Status updated", body = Object, example = json!({
            "message": "Shift status updated"
        })),
        (status = 400, description = "Invalid transition"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Shift not found"),
        (status = 409, description = "Shift already in a terminal state"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shift"
)]
pub async fn update_shift_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateShiftStatusReq>,
) -> actix_web::Result<impl Responder> {
    let shift_id = path.into_inner();
    let next = payload.status;

    if next == ShiftStatus::Assigned {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "A shift cannot be moved back to assigned"
        })));
    }

    let row = sqlx::query_as::<_, (u64, String)>(
        "SELECT user_id, status FROM shifts WHERE id = ?",
    )
    .bind(shift_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, shift_id, "Failed to fetch shift");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some((owner_id, current)) = row else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Shift not found" })));
    };

    if auth.is_employee() && owner_id != auth.user_id {
        return Err(actix_web::error::ErrorForbidden("Not your shift"));
    }

    let current = ShiftStatus::from_str(&current).map_err(|e| {
        error!(error = %e, shift_id, status = %current, "Unknown shift status in store");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if current.is_terminal() {
        return Ok(HttpResponse::Conflict().json(json!({
            "message": format!("Shift is already {current}")
        })));
    }

    sqlx::query("UPDATE shifts SET status = ? WHERE id = ?")
        .bind(next.to_string())
        .bind(shift_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, shift_id, "Failed to update shift status");
            ErrorInternalServerError("Internal Server Error")
        })?;

    info!(shift_id, from = %current, to = %next, "Shift status updated");

    Ok(HttpResponse::Ok().json(json!({ "message": "Shift status updated" })))
}
