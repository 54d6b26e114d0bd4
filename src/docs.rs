use crate::api::analytics::{
    AttendanceView, DepartmentView, LeavesView, OverviewView, OvertimeView,
};
use crate::api::employee::{CreateEmployeeReq, EmployeeListResponse};
use crate::api::leave::{CreateLeaveReq, LeaveListResponse};
use crate::api::overtime::{
    CreateOvertimeReq, OvertimeListResponse, UpdateOvertimeStatusReq,
};
use crate::api::shift::{AssignShiftReq, ShiftListResponse, UpdateShiftStatusReq};
use crate::api::time_record::TimeRecordListResponse;
use crate::core::overtime::UserOvertime;
use crate::core::presence::{DayAttendance, DepartmentAttendance};
use crate::core::range::{DateRange, RangeWindow};
use crate::core::shift_plan::PlanStrategy;
use crate::model::leave::{Leave, LeaveStatus, LeaveType};
use crate::model::overtime::{Overtime, OvertimeStatus};
use crate::model::shift::{Shift, ShiftStatus, ShiftType};
use crate::model::time_record::TimeRecord;
use crate::model::user::User;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Workforce Management API",
        version = "1.0.0",
        description = r#"
## Workforce Management (WFM) Backend

This API powers a **workforce-management** backend covering the daily HR loop of an organization.

### 🔹 Key Features
- **Attendance Tracking**
  - Check-in/check-out with local-calendar day capture and presence queries
- **Shift Management**
  - Single and batch-weekly shift planning with conflict detection
- **Overtime**
  - Shift-relative overtime records plus threshold-based analytics
- **Leave Management**
  - Request, approve/reject, and cancel leave
- **Analytics & Reports**
  - Date-ranged overview, attendance, leave, overtime and department views, with PDF export

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Administrative operations require the **Admin** role.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    modifiers(&SecurityAddon),
    paths(
        crate::api::analytics::analytics,
        crate::api::report::overview_report,

        crate::api::time_record::check_in,
        crate::api::time_record::check_out,
        crate::api::time_record::present_today,
        crate::api::time_record::list_own,
        crate::api::time_record::list_all,

        crate::api::shift::assign_shift,
        crate::api::shift::list_shifts,
        crate::api::shift::update_shift_status,

        crate::api::overtime::trigger_session,
        crate::api::overtime::recalculate,
        crate::api::overtime::create_overtime,
        crate::api::overtime::list_overtime,
        crate::api::overtime::update_overtime_status,
        crate::api::overtime::overtime_summary,

        crate::api::leave::create_leave,
        crate::api::leave::list_leaves,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::cancel_leave,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee
    ),
    components(
        schemas(
            DateRange,
            RangeWindow,
            OverviewView,
            AttendanceView,
            LeavesView,
            OvertimeView,
            DepartmentView,
            DayAttendance,
            DepartmentAttendance,
            UserOvertime,

            TimeRecord,
            TimeRecordListResponse,

            Shift,
            ShiftType,
            ShiftStatus,
            PlanStrategy,
            AssignShiftReq,
            UpdateShiftStatusReq,
            ShiftListResponse,

            Overtime,
            OvertimeStatus,
            CreateOvertimeReq,
            UpdateOvertimeStatusReq,
            OvertimeListResponse,

            Leave,
            LeaveType,
            LeaveStatus,
            CreateLeaveReq,
            LeaveListResponse,

            User,
            CreateEmployeeReq,
            EmployeeListResponse
        )
    ),
    tags(
        (name = "Analytics", description = "Date-ranged analytics views"),
        (name = "Reports", description = "Downloadable report exports"),
        (name = "Attendance", description = "Check-in/check-out and session listings"),
        (name = "Shift", description = "Shift planning and assignment APIs"),
        (name = "Overtime", description = "Overtime records and summaries"),
        (name = "Leaves", description = "Leave request workflow APIs"),
        (name = "Employees", description = "Employee account management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
