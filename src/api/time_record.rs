use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::core::calendar;
use crate::model::time_record::TimeRecord;
use crate::utils::db_utils::{Filters, SqlValue, bind_values_as, bind_values_scalar};
use crate::utils::user_lock;
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
pub struct TimeRecordListResponse {
    pub data: Vec<TimeRecord>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/time-records/check-in",
    responses(
        (status = 200, description = "Session opened", body = Object, example = json!({
            "message": "Checked in successfully"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    // Serialize open/close per user; two concurrent check-ins must not both
    // pass the force-close step before either inserts.
    let lock = user_lock::lock_for(auth.user_id).await;
    let _guard = lock.lock().await;

    let now = Utc::now();
    let fields = calendar::local_fields(now, config.timezone);

    // Force-close a dangling open session before opening the new one. The
    // synthetic logout gets the same local fields and a computed duration.
    let closed = sqlx::query(
        r#"
        UPDATE time_records
        SET logout_at = ?, logout_date = ?, logout_time = ?,
            duration_minutes = TIMESTAMPDIFF(MINUTE, login_at, ?)
        WHERE user_id = ? AND logout_at IS NULL
        "#,
    )
    .bind(now)
    .bind(fields.date)
    .bind(fields.time)
    .bind(now)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Check-in force-close failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if closed.rows_affected() > 0 {
        warn!(
            user_id = auth.user_id,
            closed = closed.rows_affected(),
            "Force-closed dangling open session at check-in"
        );
    }

    sqlx::query(
        r#"
        INSERT INTO time_records
            (user_id, login_at, login_date, login_time, login_day, timezone)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(now)
    .bind(fields.date)
    .bind(fields.time)
    .bind(&fields.day_name)
    .bind(config.timezone.name())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Check-in failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked in successfully",
        "login_date": fields.date,
        "login_time": fields.time.format("%H:%M:%S").to_string()
    })))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/v1/time-records/check-out",
    responses(
        (status = 200, description = "Session closed", body = Object, example = json!({
            "message": "Checked out successfully"
        })),
        (status = 400, description = "No open session", body = Object, example = json!({
            "message": "No open session found"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let lock = user_lock::lock_for(auth.user_id).await;
    let _guard = lock.lock().await;

    let now = Utc::now();
    let fields = calendar::local_fields(now, config.timezone);

    let result = sqlx::query(
        r#"
        UPDATE time_records
        SET logout_at = ?, logout_date = ?, logout_time = ?,
            duration_minutes = TIMESTAMPDIFF(MINUTE, login_at, ?)
        WHERE user_id = ? AND logout_at IS NULL
        "#,
    )
    .bind(now)
    .bind(fields.date)
    .bind(fields.time)
    .bind(now)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Check-out failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "No open session found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "logout_date": fields.date,
        "logout_time": fields.time.format("%H:%M:%S").to_string()
    })))
}

/// Present-today count
#[utoipa::path(
    get,
    path = "/api/v1/time-records/present-today",
    responses(
        (status = 200, description = "Distinct users with a session touching today", body = Object, example = json!({
            "date": "2025-10-01",
            "present": 17
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn present_today(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let today = calendar::local_date(Utc::now(), config.timezone);

    // Day-overlap predicate pinned to a single day: the session's occupied
    // local-day interval must touch today. Open sessions still count.
    let present = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT user_id)
        FROM time_records
        WHERE login_date <= ? AND (logout_date IS NULL OR logout_date >= ?)
        "#,
    )
    .bind(today)
    .bind(today)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to count present users");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "date": today,
        "present": present
    })))
}

#[derive(Deserialize, IntoParams)]
pub struct TimeRecordQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Inclusive local-day range start.
    #[param(example = "2025-10-01", value_type = String, format = "date")]
    pub from: Option<NaiveDate>,
    /// Inclusive local-day range end.
    #[param(example = "2025-10-31", value_type = String, format = "date")]
    pub to: Option<NaiveDate>,
    /// Only sessions still open.
    pub open_only: Option<bool>,
}

#[derive(Deserialize, IntoParams)]
pub struct AdminTimeRecordQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[param(example = "2025-10-01", value_type = String, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(example = "2025-10-31", value_type = String, format = "date")]
    pub to: Option<NaiveDate>,
    pub open_only: Option<bool>,
    /// Restrict to one user.
    pub employee_id: Option<u64>,
}

async fn list_page(
    pool: &MySqlPool,
    filters: &Filters,
    page: u32,
    per_page: u32,
) -> Result<(Vec<TimeRecord>, i64), sqlx::Error> {
    let where_clause = filters.where_clause();
    let offset = (page - 1) * per_page;

    let count_sql = format!("SELECT COUNT(*) FROM time_records {}", where_clause);
    debug!(sql = %count_sql, "Counting time records");
    let total = bind_values_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filters.values())
        .fetch_one(pool)
        .await?;

    let data_sql = format!(
        "SELECT * FROM time_records {} ORDER BY login_at DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching time records");
    let records = bind_values_as(sqlx::query_as::<_, TimeRecord>(&data_sql), filters.values())
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool)
        .await?;

    Ok((records, total))
}

fn session_range_filters(filters: &mut Filters, from: Option<NaiveDate>, to: Option<NaiveDate>) {
    // Matching rule for the occupied-day interval: a session belongs to
    // [from, to] when it started by `to` and had not ended before `from`.
    if let Some(to) = to {
        filters.push("login_date <= ?", SqlValue::Date(to));
    }
    if let Some(from) = from {
        filters.push(
            "(logout_date IS NULL OR logout_date >= ?)",
            SqlValue::Date(from),
        );
    }
}

/// List own sessions
#[utoipa::path(
    get,
    path = "/api/v1/time-records",
    params(TimeRecordQuery),
    responses(
        (status = 200, description = "Paginated session list", body = TimeRecordListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_own(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TimeRecordQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut filters = Filters::new();
    filters.push("user_id = ?", SqlValue::U64(auth.user_id));
    session_range_filters(&mut filters, query.from, query.to);
    if query.open_only.unwrap_or(false) {
        filters.push_clause("logout_at IS NULL");
    }

    let (records, total) = list_page(pool.get_ref(), &filters, page, per_page)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Failed to list time records");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(TimeRecordListResponse {
        data: records,
        page,
        per_page,
        total,
    }))
}

/// List all sessions (admin)
#[utoipa::path(
    get,
    path = "/api/v1/time-records/all",
    params(AdminTimeRecordQuery),
    responses(
        (status = 200, description = "Paginated session list", body = TimeRecordListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_all(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AdminTimeRecordQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut filters = Filters::new();
    if let Some(employee_id) = query.employee_id {
        filters.push("user_id = ?", SqlValue::U64(employee_id));
    }
    session_range_filters(&mut filters, query.from, query.to);
    if query.open_only.unwrap_or(false) {
        filters.push_clause("logout_at IS NULL");
    }

    let (records, total) = list_page(pool.get_ref(), &filters, page, per_page)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list time records");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(TimeRecordListResponse {
        data: records,
        page,
        per_page,
        total,
    }))
}
