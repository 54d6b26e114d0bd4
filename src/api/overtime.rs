use crate::auth::auth::AuthUser;
use crate::core::overtime::{hours_between_hhmm, minutes_to_hours, shift_overtime_minutes};
use crate::model::overtime::{Overtime, OvertimeStatus};
use crate::utils::db_utils::{Filters, SqlValue, bind_values_as, bind_values_scalar};
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

const AUTO_DESCRIPTION: &str = "Worked beyond assigned shift";

#[derive(Serialize, ToSchema)]
pub struct OvertimeListResponse {
    pub data: Vec<Overtime>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateOvertimeReq {
    #[schema(example = 42)]
    pub employee_id: u64,
    #[schema(example = "2025-10-01", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "Month-end closing")]
    pub description: String,
    /// Local wall-clock "HH:MM"; an end before the start crosses midnight.
    #[schema(example = "18:00")]
    pub start_time: String,
    #[schema(example = "21:30")]
    pub end_time: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateOvertimeStatusReq {
    pub status: OvertimeStatus,
}

#[derive(Deserialize, IntoParams)]
pub struct OvertimeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub employee_id: Option<u64>,
    pub status: Option<OvertimeStatus>,
    #[param(example = "2025-10-01", value_type = String, format = "date")]
    pub from: Option<NaiveDate>,
    #[param(example = "2025-10-31", value_type = String, format = "date")]
    pub to: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
pub struct RecalculateQuery {
    #[param(example = "2025-10-01", value_type = String, format = "date")]
    pub from: NaiveDate,
    #[param(example = "2025-10-31", value_type = String, format = "date")]
    pub to: NaiveDate,
}

/// How one session came out of the shift-relative attribution. All four are
/// reportable results, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriggerOutcome {
    NoShift,
    NoOvertime,
    Existing(u64),
    Created(u64),
}

#[derive(FromRow)]
struct CompletedSession {
    id: u64,
    user_id: u64,
    login_date: NaiveDate,
    logout_at: Option<DateTime<Utc>>,
    duration_minutes: Option<i64>,
}

#[derive(FromRow)]
struct ShiftWindow {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

/// Shift-relative attribution for one completed session: find the shift
/// covering the login day, measure the excess, create at most one pending
/// record per (user, day). The unique key on `(user_id, auto_day)` decides
/// races that slip past the pre-check.
async fn attribute_session(
    pool: &MySqlPool,
    user_id: u64,
    login_date: NaiveDate,
    logout_at: DateTime<Utc>,
    duration_minutes: i64,
) -> Result<TriggerOutcome, sqlx::Error> {
    let shift = sqlx::query_as::<_, ShiftWindow>(
        r#"
        SELECT start_time, end_time
        FROM shifts
        WHERE user_id = ? AND date = ?
          AND status IN ('assigned', 'confirmed', 'completed')
        ORDER BY start_time
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(login_date)
    .fetch_optional(pool)
    .await?;

    let Some(shift) = shift else {
        return Ok(TriggerOutcome::NoShift);
    };

    let minutes = shift_overtime_minutes(duration_minutes, shift.start_time, shift.end_time);
    if minutes == 0 {
        return Ok(TriggerOutcome::NoOvertime);
    }

    if let Some(existing_id) = sqlx::query_scalar::<_, u64>(
        "SELECT id FROM overtime WHERE user_id = ? AND auto_day = ?",
    )
    .bind(user_id)
    .bind(login_date)
    .fetch_optional(pool)
    .await?
    {
        return Ok(TriggerOutcome::Existing(existing_id));
    }

    let hours = minutes_to_hours(minutes);
    let inserted = sqlx::query(
        r#"
        INSERT INTO overtime
            (user_id, date, description, total_hours,
             actual_hours, actual_start_time, actual_end_time, status, auto_day)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(user_id)
    .bind(login_date)
    .bind(AUTO_DESCRIPTION)
    .bind(hours)
    .bind(hours)
    .bind(shift.end_time)
    .bind(logout_at)
    .bind(login_date)
    .execute(pool)
    .await;

    match inserted {
        Ok(done) => Ok(TriggerOutcome::Created(done.last_insert_id())),
        Err(e) => {
            // Lost the race against a concurrent trigger; report the winner.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    let existing_id = sqlx::query_scalar::<_, u64>(
                        "SELECT id FROM overtime WHERE user_id = ? AND auto_day = ?",
                    )
                    .bind(user_id)
                    .bind(login_date)
                    .fetch_one(pool)
                    .await?;
                    return Ok(TriggerOutcome::Existing(existing_id));
                }
            }
            Err(e)
        }
    }
}

/// Trigger attribution for one session
#[utoipa::path(
    post,
    path = "/api/v1/overtime/sessions/{id}",
    params(
        ("id", Path, description = "Time record ID")
    ),
    responses(
        (status = 200, description = "Attribution result", body = Object, example = json!({
            "outcome": "created",
            "overtime_id": 7
        })),
        (status = 400, description = "Session still open"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Overtime"
)]
pub async fn trigger_session(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let record_id = path.into_inner();

    let session = sqlx::query_as::<_, CompletedSession>(
        r#"
        SELECT id, user_id, login_date, logout_at, duration_minutes
        FROM time_records
        WHERE id = ?
        "#,
    )
    .bind(record_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, record_id, "Failed to fetch session");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(session) = session else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Session not found" })));
    };

    if auth.is_employee() && session.user_id != auth.user_id {
        return Err(actix_web::error::ErrorForbidden("Not your session"));
    }

    let (Some(logout_at), Some(duration)) = (session.logout_at, session.duration_minutes) else {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Session is still open"
        })));
    };

    let outcome = attribute_session(
        pool.get_ref(),
        session.user_id,
        session.login_date,
        logout_at,
        duration,
    )
    .await
    .map_err(|e| {
        error!(error = %e, record_id, "Overtime attribution failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let body = match outcome {
        TriggerOutcome::NoShift => json!({
            "outcome": "no_shift",
            "message": format!("No shift found for {}", session.login_date)
        }),
        TriggerOutcome::NoOvertime => json!({
            "outcome": "no_overtime",
            "message": "Session fits inside the assigned shift"
        }),
        TriggerOutcome::Existing(id) => json!({
            "outcome": "existing",
            "overtime_id": id
        }),
        TriggerOutcome::Created(id) => {
            info!(record_id, overtime_id = id, "Overtime record created");
            json!({
                "outcome": "created",
                "overtime_id": id
            })
        }
    };

    Ok(HttpResponse::Ok().json(body))
}

/// Batch attribution over a date range (admin)
#[utoipa::path(
    post,
    path = "/api/v1/overtime/recalculate",
    params(RecalculateQuery),
    responses(
        (status = 200, description = "Batch attribution summary", body = Object, example = json!({
            "sessions": 310,
            "created": 12,
            "existing": 3,
            "no_shift": 120,
            "no_overtime": 175
        })),
        (status = 400, description = "Invalid range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Overtime"
)]
pub async fn recalculate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RecalculateQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if query.from > query.to {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "from must not be after to"
        })));
    }

    let mut stream = sqlx::query_as::<_, CompletedSession>(
        r#"
        SELECT id, user_id, login_date, logout_at, duration_minutes
        FROM time_records
        WHERE logout_at IS NOT NULL AND login_date BETWEEN ? AND ?
        ORDER BY login_date
        "#,
    )
    .bind(query.from)
    .bind(query.to)
    .fetch(pool.get_ref());

    let mut sessions = 0u64;
    let mut created = 0u64;
    let mut existing = 0u64;
    let mut no_shift = 0u64;
    let mut no_overtime = 0u64;

    while let Some(row) = stream.next().await {
        let session = row.map_err(|e| {
            error!(error = %e, "Failed to stream sessions");
            ErrorInternalServerError("Internal Server Error")
        })?;
        sessions += 1;

        let (Some(logout_at), Some(duration)) = (session.logout_at, session.duration_minutes)
        else {
            continue;
        };

        let outcome = attribute_session(
            pool.get_ref(),
            session.user_id,
            session.login_date,
            logout_at,
            duration,
        )
        .await
        .map_err(|e| {
            error!(error = %e, record_id = session.id, "Batch attribution failed");
            ErrorInternalServerError("Internal Server Error")
        })?;

        match outcome {
            TriggerOutcome::NoShift => no_shift += 1,
            TriggerOutcome::NoOvertime => no_overtime += 1,
            TriggerOutcome::Existing(_) => existing += 1,
            TriggerOutcome::Created(_) => created += 1,
        }
    }

    info!(
        from = %query.from,
        to = %query.to,
        sessions,
        created,
        existing,
        "Batch overtime attribution finished"
    );

    Ok(HttpResponse::Ok().json(json!({
        "sessions": sessions,
        "created": created,
        "existing": existing,
        "no_shift": no_shift,
        "no_overtime": no_overtime
    })))
}

/// Create manual overtime (admin)
#[utoipa::path(
    post,
    path = "/api/v1/overtime",
    request_body = CreateOvertimeReq,
    responses(
        (status = 201, description = "Overtime created", body = Object, example = json!({
            "message": "Overtime recorded",
            "total_hours": 3.5
        })),
        (status = 400, description = "Invalid times"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Overtime"
)]
pub async fn create_overtime(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateOvertimeReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if payload.description.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Description must not be empty"
        })));
    }

    let total_hours = match hours_between_hhmm(&payload.start_time, &payload.end_time) {
        Ok(h) => h,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
        }
    };

    sqlx::query(
        r#"
        INSERT INTO overtime
            (user_id, date, description, total_hours, start_time, end_time, status)
        VALUES (?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.date)
    .bind(payload.description.trim())
    .bind(total_hours)
    .bind(&payload.start_time)
    .bind(&payload.end_time)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id = payload.employee_id, "Overtime insert failed");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Overtime recorded",
        "total_hours": total_hours
    })))
}

/// List overtime records
#[utoipa::path(
    get,
    path = "/api/v1/overtime",
    params(OvertimeQuery),
    responses(
        (status = 200, description = "Paginated overtime list", body = OvertimeListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Overtime"
)]
pub async fn list_overtime(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<OvertimeQuery>,
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
    if let Some(from) = query.from {
        filters.push("date >= ?", SqlValue::Date(from));
    }
    if let Some(to) = query.to {
        filters.push("date <= ?", SqlValue::Date(to));
    }

    let where_clause = filters.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM overtime {}", where_clause);
    debug!(sql = %count_sql, "Counting overtime records");
    let total = bind_values_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filters.values())
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count overtime records");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT * FROM overtime {} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, "Fetching overtime records");
    let records = bind_values_as(sqlx::query_as::<_, Overtime>(&data_sql), filters.values())
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch overtime records");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(OvertimeListResponse {
        data: records,
        page,
        per_page,
        total,
    }))
}

/// Approve or reject (admin)
#[utoipa::path(
    put,
    path = "/api/v1/overtime/{id}/status",
    params(
        ("id", Path, description = "Overtime ID")
    ),
    request_body = UpdateOvertimeStatusReq,
    responses(
        (status = 200, description = "Status updated", body = Object, example = json!({
            "message": "Overtime approved"
        })),
        (status = 400, description = "Invalid target status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Overtime not found"),
        (status = 409, description = "Already decided"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Overtime"
)]
pub async fn update_overtime_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateOvertimeStatusReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let overtime_id = path.into_inner();
    let next = payload.status;

    if next == OvertimeStatus::Pending {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Target status must be approved or rejected"
        })));
    }

    // Only a pending record can be decided; the WHERE guard makes the
    // update idempotent under concurrent approvals.
    let result = sqlx::query(
        r#"
        UPDATE overtime
        SET status = ?, approved_by = ?, approved_at = NOW()
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(next.to_string())
    .bind(auth.user_id)
    .bind(overtime_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, overtime_id, "Failed to update overtime status");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM overtime WHERE id = ?")
            .bind(overtime_id)
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, overtime_id, "Failed to check overtime record");
                ErrorInternalServerError("Internal Server Error")
            })?;

        if exists == 0 {
            return Ok(
                HttpResponse::NotFound().json(json!({ "message": "Overtime not found" }))
            );
        }
        return Ok(HttpResponse::Conflict().json(json!({
            "message": "Overtime has already been decided"
        })));
    }

    info!(overtime_id, status = %next, approver = auth.user_id, "Overtime decided");

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Overtime {next}")
    })))
}

#[derive(FromRow)]
struct StatusBucket {
    status: String,
    records: i64,
    hours: f64,
}

/// Summary stats
#[utoipa::path(
    get,
    path = "/api/v1/overtime/summary",
    params(
        ("employee_id", Query, description = "Restrict to one user (admin only)")
    ),
    responses(
        (status = 200, description = "Counts and hours per status", body = Object, example = json!({
            "pending": { "records": 2, "hours": 3.5 },
            "approved": { "records": 10, "hours": 21.0 },
            "rejected": { "records": 1, "hours": 2.0 },
            "total": { "records": 13, "hours": 26.5 }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Overtime"
)]
pub async fn overtime_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let scope_user = if auth.is_employee() {
        Some(auth.user_id)
    } else {
        query.employee_id
    };

    let mut filters = Filters::new();
    if let Some(user_id) = scope_user {
        filters.push("user_id = ?", SqlValue::U64(user_id));
    }

    let sql = format!(
        "SELECT status, COUNT(*) AS records, COALESCE(SUM(total_hours), 0) AS hours \
         FROM overtime {} GROUP BY status",
        filters.where_clause()
    );
    let buckets = bind_values_as(sqlx::query_as::<_, StatusBucket>(&sql), filters.values())
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to summarize overtime");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let mut body = json!({
        "pending": { "records": 0, "hours": 0.0 },
        "approved": { "records": 0, "hours": 0.0 },
        "rejected": { "records": 0, "hours": 0.0 },
    });
    let mut total_records = 0i64;
    let mut total_hours = 0.0f64;
    for bucket in buckets {
        total_records += bucket.records;
        total_hours += bucket.hours;
        body[&bucket.status] = json!({ "records": bucket.records, "hours": bucket.hours });
    }
    body["total"] = json!({ "records": total_records, "hours": total_hours });

    Ok(HttpResponse::Ok().json(body))
}

#[derive(Deserialize)]
pub struct SummaryQuery {
    pub employee_id: Option<u64>,
}
