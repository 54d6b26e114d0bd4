use crate::api::analytics::{OverviewView, overview_view};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::core::calendar;
use crate::core::range::{DateRange, RangeWindow};
use actix_web::error::ErrorInternalServerError;
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};
use sqlx::MySqlPool;
use tracing::error;

// A4 portrait, in points.
const PAGE_W: f32 = 595.0;
const PAGE_H: f32 = 842.0;
const MARGIN: f32 = 50.0;
const ROW_H: f32 = 22.0;

fn draw_text(content: &mut Content, x: f32, y: f32, size: f32, text: &str) {
    content.begin_text();
    content.set_font(Name(b"F1"), size);
    content.set_text_matrix([1.0, 0.0, 0.0, 1.0, x, y]);
    content.show(Str(text.as_bytes()));
    content.end_text();
}

/// One-page overview report: title, resolved window, then a label/value row
/// per metric. Object ids are handed out manually; Helvetica is the only
/// resource.
fn render_overview_pdf(window: &RangeWindow, view: &OverviewView) -> Vec<u8> {
    let mut pdf = Pdf::new();

    let catalog_id = Ref::new(1);
    let pages_id = Ref::new(2);
    let font_id = Ref::new(3);
    let page_id = Ref::new(4);
    let content_id = Ref::new(5);

    pdf.type1_font(font_id).base_font(Name(b"Helvetica"));

    {
        let mut page = pdf.page(page_id);
        page.parent(pages_id)
            .media_box(Rect::new(0.0, 0.0, PAGE_W, PAGE_H))
            .contents(content_id);
        page.resources().fonts().pair(Name(b"F1"), font_id);
    }

    let mut content = Content::new();

    let mut y = PAGE_H - MARGIN;
    draw_text(&mut content, MARGIN, y, 16.0, "Workforce Overview");
    y -= 18.0;
    draw_text(
        &mut content,
        MARGIN,
        y,
        10.0,
        &format!("{} ({} to {})", window.range, window.from, window.to),
    );
    y -= 30.0;

    let rows: [(&str, String); 8] = [
        ("Total employees", view.total_employees.to_string()),
        ("Present today", view.present_today.to_string()),
        ("Absent today", view.absent_today.to_string()),
        ("Late today", view.late_today.to_string()),
        ("Attendance", format!("{:.1}%", view.attendance_pct)),
        ("Pending leaves", view.pending_leaves.to_string()),
        ("On leave today", view.on_leave_today.to_string()),
        ("Overtime hours", format!("{:.2}", view.overtime_hours)),
    ];

    for (label, value) in rows {
        content.save_state();
        content.set_stroke_rgb(0.65, 0.65, 0.65);
        content.rect(MARGIN, y - 6.0, 260.0, ROW_H);
        content.stroke();
        content.restore_state();

        draw_text(&mut content, MARGIN + 4.0, y, 11.0, label);
        draw_text(&mut content, MARGIN + 160.0, y, 11.0, &value);
        y -= ROW_H;
    }

    pdf.stream(content_id, &content.finish());
    pdf.catalog(catalog_id).pages(pages_id);
    {
        let mut pages = pdf.pages(pages_id);
        pages.count(1);
        pages.kids([page_id]);
    }

    pdf.finish()
}

/// Overview metrics as a downloadable PDF
#[utoipa::path(
    get,
    path = "/api/v1/reports/{date_range}",
    params(
        ("date_range" = String, Path, description = "today | this_week | this_month | last_month | this_year; unrecognized keys use this_month", example = "this_month")
    ),
    responses(
        (status = 200, description = "PDF attachment", content_type = "application/pdf"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn overview_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let key = path.into_inner();
    let range = DateRange::parse_or_default(Some(&key));
    let today = calendar::local_date(Utc::now(), config.timezone);
    let window = RangeWindow::resolve(range, today);

    let view = overview_view(pool.get_ref(), &window, today)
        .await
        .map_err(|e| {
            error!(error = %e, "Report query failed");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let bytes = render_overview_pdf(&window, &view);
    let filename = format!("workforce-report-{}-{}.pdf", window.range, today);

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_view() -> OverviewView {
        OverviewView {
            total_employees: 12,
            present_today: 9,
            absent_today: 3,
            late_today: 2,
            attendance_pct: 78.4,
            pending_leaves: 4,
            on_leave_today: 1,
            overtime_hours: 6.25,
        }
    }

    #[test]
    fn rendered_report_is_a_pdf_document() {
        let window = RangeWindow {
            range: DateRange::ThisWeek,
            from: NaiveDate::from_ymd_opt(2025, 10, 6).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 10, 12).unwrap(),
        };
        let bytes = render_overview_pdf(&window, &sample_view());

        assert!(bytes.starts_with(b"%PDF-"));
        let body = String::from_utf8_lossy(&bytes);
        assert!(body.contains("Helvetica"));
    }
}
