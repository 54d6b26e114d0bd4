use crate::{
    api::{analytics, employee, leave, overtime, report, shift, time_record},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/analytics").route(web::get().to(analytics::analytics)))
            .service(
                web::resource("/reports/{date_range}")
                    .route(web::get().to(report::overview_report)),
            )
            .service(
                web::scope("/time-records")
                    // /time-records
                    .service(web::resource("").route(web::get().to(time_record::list_own)))
                    // /time-records/check-in
                    .service(
                        web::resource("/check-in").route(web::post().to(time_record::check_in)),
                    )
                    // /time-records/check-out
                    .service(
                        web::resource("/check-out").route(web::post().to(time_record::check_out)),
                    )
                    // /time-records/present-today
                    .service(
                        web::resource("/present-today")
                            .route(web::get().to(time_record::present_today)),
                    )
                    // /time-records/all
                    .service(web::resource("/all").route(web::get().to(time_record::list_all))),
            )
            .service(
                web::scope("/shifts")
                    // /shifts
                    .service(
                        web::resource("")
                            .route(web::post().to(shift::assign_shift))
                            .route(web::get().to(shift::list_shifts)),
                    )
                    // /shifts/{id}/status
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(shift::update_shift_status)),
                    ),
            )
            .service(
                web::scope("/overtime")
                    // /overtime
                    .service(
                        web::resource("")
                            .route(web::post().to(overtime::create_overtime))
                            .route(web::get().to(overtime::list_overtime)),
                    )
                    // /overtime/summary
                    .service(
                        web::resource("/summary")
                            .route(web::get().to(overtime::overtime_summary)),
                    )
                    // /overtime/recalculate
                    .service(
                        web::resource("/recalculate")
                            .route(web::post().to(overtime::recalculate)),
                    )
                    // /overtime/sessions/{id}
                    .service(
                        web::resource("/sessions/{id}")
                            .route(web::post().to(overtime::trigger_session)),
                    )
                    // /overtime/{id}/status
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(overtime::update_overtime_status)),
                    ),
            )
            .service(
                web::scope("/leaves")
                    // /leaves
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::list_leaves))
                            .route(web::post().to(leave::create_leave)),
                    )
                    // /leaves/{leave_id}/approve
                    .service(
                        web::resource("/{leave_id}/approve")
                            .route(web::put().to(leave::approve_leave)),
                    )
                    // /leaves/{leave_id}/reject
                    .service(
                        web::resource("/{leave_id}/reject")
                            .route(web::put().to(leave::reject_leave)),
                    )
                    // /leaves/{leave_id}/cancel
                    .service(
                        web::resource("/{leave_id}/cancel")
                            .route(web::put().to(leave::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{employee_id}
                    .service(
                        web::resource("/{employee_id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /refresh with refresh_token
//       └─ returns new access_token
