use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::PayrollError;
use crate::model::accounting_entry::AccountingEntry;
use crate::model::payroll::{Payroll, PayrollFilter, PayrollStatus};
use crate::model::period::Period;
use crate::model::subject::SubjectCategory;
use crate::payroll::exporter::ExportReceipt;
use crate::payroll::preview::PayrollPreview;
use crate::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct RunPayroll {
    #[schema(example = "2026-01")]
    pub period: String,

    #[schema(example = "employee")]
    pub category: SubjectCategory,
}

#[derive(Serialize, ToSchema)]
pub struct RunPayrollResponse {
    #[schema(value_type = String, example = "2026-01")]
    pub period: Period,
    pub category: SubjectCategory,
    pub created: usize,
    pub data: Vec<Payroll>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PreviewQuery {
    #[schema(example = "2026-01")]
    pub period: String,

    /// Both categories when omitted
    pub category: Option<SubjectCategory>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayrollQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 10)]
    pub per_page: Option<u32>,

    #[schema(example = "2026-01")]
    pub period: Option<String>,

    pub category: Option<SubjectCategory>,

    #[schema(example = 1001)]
    pub subject_id: Option<u64>,

    pub status: Option<PayrollStatus>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedPayrollResponse {
    pub data: Vec<Payroll>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePayrollStatus {
    #[schema(example = "paid")]
    pub status: PayrollStatus,
}

#[derive(Serialize, ToSchema)]
pub struct PayslipResponse {
    pub payroll_id: u64,
    pub payslip_link: String,
}

#[utoipa::path(
    post,
    path = "/api/payroll/run",
    request_body = RunPayroll,
    responses(
        (status = 201, description = "Payroll records created", body = RunPayrollResponse),
        (status = 400, description = "Malformed period"),
        (status = 401),
        (status = 403),
        (status = 409, description = "Period already processed for this category")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn run_payroll(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<RunPayroll>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_manager()?;

    let period: Period = payload.period.parse()?;
    let category = payload.category;

    tracing::info!(user_id = auth.user_id, period = %period, category = %category, "Payroll run requested by user");
    let data = state.runner.run(&period, category).await?;

    Ok(HttpResponse::Created().json(RunPayrollResponse {
        period,
        category,
        created: data.len(),
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/api/payroll/preview",
    params(PreviewQuery),
    responses(
        (status = 200, body = PayrollPreview),
        (status = 400, description = "Malformed period"),
        (status = 401),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn preview_payroll(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<PreviewQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_viewer()?;

    let period: Period = query.period.parse()?;
    let preview = state.previewer.preview(&period, query.category).await?;

    Ok(HttpResponse::Ok().json(preview))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, body = PaginatedPayrollResponse),
        (status = 400, description = "Malformed period filter")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<PayrollQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_viewer()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);

    let period = query
        .period
        .as_deref()
        .map(str::parse::<Period>)
        .transpose()?;

    let filter = PayrollFilter {
        period,
        category: query.category,
        subject_id: query.subject_id,
        status: query.status,
        page,
        per_page,
    };

    let (data, total) = state
        .store
        .list_payrolls(&filter)
        .await
        .map_err(PayrollError::from)?;

    Ok(HttpResponse::Ok().json(PaginatedPayrollResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{payroll_id}",
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, body = Payroll),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_viewer()?;

    let payroll_id = path.into_inner();
    let payroll = state
        .store
        .find_payroll(payroll_id)
        .await
        .map_err(PayrollError::from)?
        .ok_or_else(|| PayrollError::not_found("payroll", payroll_id))?;

    Ok(HttpResponse::Ok().json(payroll))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{payroll_id}/status",
    request_body = UpdatePayrollStatus,
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll updated", body = Payroll),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_payroll_status(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: web::Json<UpdatePayrollStatus>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_manager()?;

    let payroll_id = path.into_inner();
    let payroll = state
        .store
        .update_payroll_status(payroll_id, body.status)
        .await
        .map_err(PayrollError::from)?
        .ok_or_else(|| PayrollError::not_found("payroll", payroll_id))?;

    tracing::info!(payroll_id, status = %payroll.status, user_id = auth.user_id, "Payroll status updated");
    Ok(HttpResponse::Ok().json(payroll))
}

#[utoipa::path(
    post,
    path = "/api/payroll/{payroll_id}/export",
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Ledger entries posted", body = ExportReceipt),
        (status = 404, description = "Payroll not found"),
        (status = 409, description = "Payroll already exported"),
        (status = 500, description = "Export rolled back")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn export_payroll(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_manager()?;

    let receipt = state.exporter.export(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(receipt))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{payroll_id}/entries",
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, body = [AccountingEntry]),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_entries(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_viewer()?;

    let payroll_id = path.into_inner();
    if state
        .store
        .find_payroll(payroll_id)
        .await
        .map_err(PayrollError::from)?
        .is_none()
    {
        return Err(PayrollError::not_found("payroll", payroll_id).into());
    }

    let entries = state
        .store
        .entries_for(payroll_id)
        .await
        .map_err(PayrollError::from)?;

    Ok(HttpResponse::Ok().json(entries))
}

#[utoipa::path(
    post,
    path = "/api/payroll/{payroll_id}/payslip",
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 201, description = "Payslip stored and notice queued", body = PayslipResponse),
        (status = 404),
        (status = 502, description = "Renderer failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate_payslip(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_manager()?;

    let payroll_id = path.into_inner();
    let payslip_link = state.payslips.generate(payroll_id).await?;

    Ok(HttpResponse::Created().json(PayslipResponse {
        payroll_id,
        payslip_link,
    }))
}
