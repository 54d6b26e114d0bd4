use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::core::calendar;
use crate::core::overlap;
use crate::core::overtime::{
    UserOvertime, daily_minutes, minutes_to_hours, overtime_by_user, threshold_overtime,
};
use crate::core::presence::{self, DayAttendance};
use crate::core::range::{DateRange, RangeWindow};
use crate::model::time_record::SessionDay;
use crate::model::user::UserDim;
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use strum_macros::EnumString;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
pub struct AnalyticsQuery {
    /// One of overview/attendance/leaves/overtime/departments; anything else
    /// returns the full bundle.
    #[param(example = "overview")]
    pub r#type: Option<String>,
    /// One of today/this_week/this_month/last_month/this_year.
    #[param(example = "this_month")]
    pub date_range: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
enum ViewKey {
    Overview,
    Attendance,
    Leaves,
    Overtime,
    Departments,
}

// None means "give me everything"; unknown keys are not an error.
fn parse_view(key: Option<&str>) -> Option<ViewKey> {
    key.and_then(|k| ViewKey::from_str(k).ok())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OverviewView {
    pub total_employees: u64,
    pub present_today: u64,
    pub absent_today: u64,
    pub late_today: u64,
    /// Mean of the daily percentages across the range.
    pub attendance_pct: f64,
    pub pending_leaves: i64,
    pub on_leave_today: i64,
    /// Threshold-mode estimate across the range.
    pub overtime_hours: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceView {
    pub days: Vec<DayAttendance>,
    pub average_pct: f64,
    pub total_employees: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeavesView {
    pub total: i64,
    #[schema(value_type = Object)]
    pub by_status: BTreeMap<String, i64>,
    #[schema(value_type = Object)]
    pub by_type: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OvertimeView {
    pub per_user: Vec<UserOvertime>,
    pub total_minutes: i64,
    pub total_hours: f64,
    pub users_over_threshold: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DepartmentView {
    pub department: String,
    pub members: u64,
    pub attendance_pct: f64,
    pub overtime_minutes: i64,
    pub overtime_hours: f64,
}

// ---------- data access ----------

async fn fetch_users(pool: &MySqlPool) -> Result<Vec<UserDim>, sqlx::Error> {
    sqlx::query_as::<_, UserDim>("SELECT id, name, department FROM users WHERE is_active = TRUE")
        .fetch_all(pool)
        .await
}

/// Sessions whose occupied day interval touches `[from, to]`. The window
/// predicate mirrors the in-memory matcher so nothing relevant is dropped
/// before expansion.
async fn fetch_sessions(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<SessionDay>, sqlx::Error> {
    sqlx::query_as::<_, SessionDay>(
        r#"
        SELECT user_id, login_date, login_time, logout_date, duration_minutes
        FROM time_records
        WHERE login_date <= ? AND (logout_date IS NULL OR logout_date >= ?)
        "#,
    )
    .bind(to)
    .bind(from)
    .fetch_all(pool)
    .await
}

async fn count_pending_leaves(pool: &MySqlPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leaves WHERE status = 'pending'")
        .fetch_one(pool)
        .await
}

async fn count_on_leave(pool: &MySqlPool, day: NaiveDate) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT user_id)
        FROM leaves
        WHERE status = 'approved' AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(day)
    .bind(day)
    .fetch_one(pool)
    .await
}

async fn leaves_by_status(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT status, COUNT(*)
        FROM leaves
        WHERE start_date <= ? AND end_date >= ?
        GROUP BY status
        "#,
    )
    .bind(to)
    .bind(from)
    .fetch_all(pool)
    .await
}

async fn leaves_by_type(
    pool: &MySqlPool,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT leave_type, COUNT(*)
        FROM leaves
        WHERE start_date <= ? AND end_date >= ?
        GROUP BY leave_type
        "#,
    )
    .bind(to)
    .bind(from)
    .fetch_all(pool)
    .await
}

// ---------- view composition ----------

fn attendance_view(
    sessions: &[SessionDay],
    total_employees: usize,
    window: &RangeWindow,
) -> AttendanceView {
    let days = presence::daily_attendance(sessions, total_employees, window.from, window.to);
    let average_pct = presence::average_percentage(&days);
    AttendanceView {
        days,
        average_pct,
        total_employees: total_employees as u64,
    }
}

fn leaves_view(by_status: Vec<(String, i64)>, by_type: Vec<(String, i64)>) -> LeavesView {
    let by_status: BTreeMap<String, i64> = by_status.into_iter().collect();
    let total = by_status.values().sum();
    LeavesView {
        total,
        by_status,
        by_type: by_type.into_iter().collect(),
    }
}

fn overtime_view(sessions: &[SessionDay], window: &RangeWindow) -> OvertimeView {
    let daily = daily_minutes(sessions, window.from, window.to);
    let per_user = overtime_by_user(&threshold_overtime(&daily));
    let total_minutes: i64 = per_user.iter().map(|u| u.overtime_minutes).sum();
    OvertimeView {
        total_minutes,
        total_hours: minutes_to_hours(total_minutes),
        users_over_threshold: per_user.len() as u64,
        per_user,
    }
}

/// Departments are a composition of the presence rollup and the threshold
/// overtime rollup over the same session set, so the two always agree with
/// the standalone views.
fn departments_view(
    sessions: &[SessionDay],
    users: &[UserDim],
    window: &RangeWindow,
) -> Vec<DepartmentView> {
    let presence_map = overlap::presence_by_day(sessions, window.from, window.to);
    let attendance = presence::department_attendance(&presence_map, users, window.day_count());

    let per_user = overtime_by_user(&threshold_overtime(&daily_minutes(
        sessions,
        window.from,
        window.to,
    )));
    let dept_of: BTreeMap<u64, &str> = users
        .iter()
        .map(|u| (u.id, u.department_label()))
        .collect();
    let mut overtime_by_dept: BTreeMap<String, i64> = BTreeMap::new();
    for entry in &per_user {
        // Sessions of users who are no longer active have no department row
        // to land on; they are left out of the rollup.
        if let Some(dept) = dept_of.get(&entry.user_id) {
            *overtime_by_dept.entry((*dept).to_string()).or_insert(0) +=
                entry.overtime_minutes;
        }
    }

    attendance
        .into_iter()
        .map(|a| {
            let minutes = overtime_by_dept.get(&a.department).copied().unwrap_or(0);
            DepartmentView {
                department: a.department,
                members: a.members,
                attendance_pct: a.attendance_pct,
                overtime_minutes: minutes,
                overtime_hours: minutes_to_hours(minutes),
            }
        })
        .collect()
}

fn overview_from_parts(
    users: &[UserDim],
    window_sessions: &[SessionDay],
    today_sessions: &[SessionDay],
    pending_leaves: i64,
    on_leave_today: i64,
    window: &RangeWindow,
    today: NaiveDate,
) -> OverviewView {
    let total = users.len();
    let present_today = overlap::presence_by_day(today_sessions, today, today)
        .get(&today)
        .map_or(0, BTreeSet::len);
    let late_today = presence::late_users_by_day(today_sessions, today, today)
        .get(&today)
        .map_or(0, BTreeSet::len);

    let days = presence::daily_attendance(window_sessions, total, window.from, window.to);

    OverviewView {
        total_employees: total as u64,
        present_today: present_today as u64,
        absent_today: total.saturating_sub(present_today) as u64,
        late_today: late_today as u64,
        attendance_pct: presence::average_percentage(&days),
        pending_leaves,
        on_leave_today,
        overtime_hours: overtime_view(window_sessions, window).total_hours,
    }
}

pub(crate) async fn overview_view(
    pool: &MySqlPool,
    window: &RangeWindow,
    today: NaiveDate,
) -> Result<OverviewView, sqlx::Error> {
    // Independent read-only queries, awaited jointly.
    let (users, window_sessions, today_sessions, pending_leaves, on_leave_today) = futures::try_join!(
        fetch_users(pool),
        fetch_sessions(pool, window.from, window.to),
        fetch_sessions(pool, today, today),
        count_pending_leaves(pool),
        count_on_leave(pool, today),
    )?;

    Ok(overview_from_parts(
        &users,
        &window_sessions,
        &today_sessions,
        pending_leaves,
        on_leave_today,
        window,
        today,
    ))
}

// ---------- handler ----------

/// Analytics views
#[utoipa::path(
    get,
    path = "/api/v1/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Requested view keyed by its name, plus the resolved date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Analytics"
)]
pub async fn analytics(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<AnalyticsQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let range = DateRange::parse_or_default(query.date_range.as_deref());
    let today = calendar::local_date(Utc::now(), config.timezone);
    let window = RangeWindow::resolve(range, today);
    let pool = pool.get_ref();

    let internal = |e: sqlx::Error| {
        error!(error = %e, "Analytics query failed");
        ErrorInternalServerError("Internal Server Error")
    };

    let body = match parse_view(query.r#type.as_deref()) {
        Some(ViewKey::Overview) => {
            let view = overview_view(pool, &window, today).await.map_err(internal)?;
            json!({ "date_range": window, "overview": view })
        }
        Some(ViewKey::Attendance) => {
            let (users, sessions) = futures::try_join!(
                fetch_users(pool),
                fetch_sessions(pool, window.from, window.to),
            )
            .map_err(internal)?;
            json!({
                "date_range": window,
                "attendance": attendance_view(&sessions, users.len(), &window)
            })
        }
        Some(ViewKey::Leaves) => {
            let (by_status, by_type) = futures::try_join!(
                leaves_by_status(pool, window.from, window.to),
                leaves_by_type(pool, window.from, window.to),
            )
            .map_err(internal)?;
            json!({ "date_range": window, "leaves": leaves_view(by_status, by_type) })
        }
        Some(ViewKey::Overtime) => {
            let sessions = fetch_sessions(pool, window.from, window.to)
                .await
                .map_err(internal)?;
            json!({ "date_range": window, "overtime": overtime_view(&sessions, &window) })
        }
        Some(ViewKey::Departments) => {
            let (users, sessions) = futures::try_join!(
                fetch_users(pool),
                fetch_sessions(pool, window.from, window.to),
            )
            .map_err(internal)?;
            json!({
                "date_range": window,
                "departments": departments_view(&sessions, &users, &window)
            })
        }
        None => {
            // Full bundle from one shared fetch, so the composed views
            // cannot drift apart.
            let (users, window_sessions, today_sessions, by_status, by_type, pending, on_leave) =
                futures::try_join!(
                    fetch_users(pool),
                    fetch_sessions(pool, window.from, window.to),
                    fetch_sessions(pool, today, today),
                    leaves_by_status(pool, window.from, window.to),
                    leaves_by_type(pool, window.from, window.to),
                    count_pending_leaves(pool),
                    count_on_leave(pool, today),
                )
                .map_err(internal)?;

            let overview = overview_from_parts(
                &users,
                &window_sessions,
                &today_sessions,
                pending,
                on_leave,
                &window,
                today,
            );

            json!({
                "date_range": window,
                "overview": overview,
                "attendance": attendance_view(&window_sessions, users.len(), &window),
                "leaves": leaves_view(by_status, by_type),
                "overtime": overtime_view(&window_sessions, &window),
                "departments": departments_view(&window_sessions, &users, &window)
            })
        }
    };

    Ok(HttpResponse::Ok().json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn window(from: NaiveDate, to: NaiveDate) -> RangeWindow {
        RangeWindow {
            range: DateRange::ThisWeek,
            from,
            to,
        }
    }

    fn user(id: u64, department: Option<&str>) -> UserDim {
        UserDim {
            id,
            name: format!("user-{id}"),
            department: department.map(str::to_string),
        }
    }

    fn session(user_id: u64, day: NaiveDate, minutes: i64) -> SessionDay {
        SessionDay {
            user_id,
            login_date: day,
            login_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            logout_date: Some(day),
            duration_minutes: Some(minutes),
        }
    }

    #[test]
    fn unknown_view_key_means_bundle() {
        assert_eq!(parse_view(Some("overview")), Some(ViewKey::Overview));
        assert_eq!(parse_view(Some("departments")), Some(ViewKey::Departments));
        assert_eq!(parse_view(Some("everything-please")), None);
        assert_eq!(parse_view(None), None);
    }

    #[test]
    fn overtime_view_totals_match_per_user_entries() {
        let day = d(2025, 10, 6);
        let sessions = vec![
            session(1, day, 540), // one hour over
            session(2, day, 480), // exactly the threshold
        ];
        let view = overtime_view(&sessions, &window(day, day));
        assert_eq!(view.total_minutes, 60);
        assert_eq!(view.total_hours, 1.0);
        assert_eq!(view.users_over_threshold, 1);
        assert_eq!(view.per_user[0].user_id, 1);
    }

    #[test]
    fn departments_compose_presence_and_overtime_without_drift() {
        let day = d(2025, 10, 6);
        let users = vec![
            user(1, Some("Engineering")),
            user(2, Some("Engineering")),
            user(3, None),
        ];
        let sessions = vec![session(1, day, 600), session(3, day, 100)];
        let view = departments_view(&sessions, &users, &window(day, day));

        assert_eq!(view.len(), 2);
        let eng = view.iter().find(|v| v.department == "Engineering").unwrap();
        assert_eq!(eng.members, 2);
        assert_eq!(eng.attendance_pct, 50.0); // 1 of 2 slots filled
        assert_eq!(eng.overtime_minutes, 120);
        assert_eq!(eng.overtime_hours, 2.0);

        // The sentinel department aggregates like any other.
        let other = view.iter().find(|v| v.department == "—").unwrap();
        assert_eq!(other.members, 1);
        assert_eq!(other.overtime_minutes, 0);
    }

    #[test]
    fn overview_counts_today_independently_of_the_window() {
        let monday = d(2025, 10, 6);
        let wednesday = d(2025, 10, 8);
        let users = vec![user(1, None), user(2, None)];
        let window_sessions = vec![session(1, monday, 480), session(2, wednesday, 480)];
        let today_sessions = vec![SessionDay {
            login_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            ..session(2, wednesday, 480)
        }];

        let view = overview_from_parts(
            &users,
            &window_sessions,
            &today_sessions,
            3,
            1,
            &window(monday, d(2025, 10, 12)),
            wednesday,
        );

        assert_eq!(view.total_employees, 2);
        assert_eq!(view.present_today, 1);
        assert_eq!(view.absent_today, 1);
        assert_eq!(view.late_today, 1); // 09:30 is past the cutoff
        assert_eq!(view.pending_leaves, 3);
        assert_eq!(view.on_leave_today, 1);
    }

    #[test]
    fn leaves_view_sums_status_buckets() {
        let view = leaves_view(
            vec![("pending".into(), 2), ("approved".into(), 5)],
            vec![("sick".into(), 4), ("annual".into(), 3)],
        );
        assert_eq!(view.total, 7);
        assert_eq!(view.by_status["approved"], 5);
        assert_eq!(view.by_type["sick"], 4);
    }
}
