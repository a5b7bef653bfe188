use crate::{
    api::{deduction_rule, payroll, salary_component},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::anyhow;
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    protected: Limiter,
    payroll_run: Limiter,
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
            payroll_run: Arc::new(build_limiter(config.rate_payroll_run_per_min)?),
        })
    }
}

fn build_limiter(requests_per_min: u32) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = 60_000 / u64::from(requests_per_min);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {} per minute", requests_per_min))?;
    Ok(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limiters: Limiters) {
    // Protected routes
    cfg.service(
        web::scope(api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected) // rate limiting
            // runs are heavy; they get their own, tighter budget
            .service(
                web::resource("/payroll/run")
                    .wrap(limiters.payroll_run)
                    .route(web::post().to(payroll::run_payroll)),
            )
            .service(
                web::scope("/payroll")
                    // /payroll
                    .service(web::resource("").route(web::get().to(payroll::list_payrolls)))
                    // /payroll/preview must be matched before /payroll/{id}
                    .service(
                        web::resource("/preview").route(web::get().to(payroll::preview_payroll)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(payroll::get_payroll)))
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(payroll::update_payroll_status)),
                    )
                    .service(
                        web::resource("/{id}/export").route(web::post().to(payroll::export_payroll)),
                    )
                    .service(
                        web::resource("/{id}/entries").route(web::get().to(payroll::list_entries)),
                    )
                    .service(
                        web::resource("/{id}/payslip")
                            .route(web::post().to(payroll::generate_payslip)),
                    ),
            )
            .service(
                web::scope("/salary-components")
                    .service(
                        web::resource("")
                            .route(web::post().to(salary_component::create_component))
                            .route(web::get().to(salary_component::list_components)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(salary_component::get_component))
                            .route(web::put().to(salary_component::update_component))
                            .route(web::delete().to(salary_component::delete_component)),
                    ),
            )
            .service(
                web::scope("/deduction-rules")
                    .service(
                        web::resource("")
                            .route(web::post().to(deduction_rule::create_rule))
                            .route(web::get().to(deduction_rule::list_rules)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(deduction_rule::get_rule))
                            .route(web::put().to(deduction_rule::update_rule))
                            .route(web::delete().to(deduction_rule::delete_rule)),
                    ),
            ),
    );
}
