use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::PayrollError;
use crate::model::salary_component::{NewSalaryComponent, SalaryComponent, SalaryComponentPatch};
use crate::model::subject::SubjectCategory;
use crate::state::AppState;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ComponentQuery {
    #[schema(example = 1001)]
    pub subject_id: u64,

    pub category: SubjectCategory,
}

#[utoipa::path(
    post,
    path = "/api/salary-components",
    request_body = NewSalaryComponent,
    responses(
        (status = 201, description = "Component created", body = SalaryComponent),
        (status = 400, description = "Invalid name or amount"),
        (status = 404, description = "Subject not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary Components"
)]
pub async fn create_component(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewSalaryComponent>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_viewer()?;

    let new = payload.into_inner();
    new.validate()?;

    if state
        .store
        .find_subject(new.category, new.subject_id)
        .await
        .map_err(PayrollError::from)?
        .is_none()
    {
        return Err(PayrollError::not_found(subject_entity(new.category), new.subject_id).into());
    }

    let component = state
        .store
        .create_component(&new)
        .await
        .map_err(PayrollError::from)?;

    tracing::info!(
        component_id = component.id,
        subject_id = component.subject_id,
        user_id = auth.user_id,
        "Salary component created"
    );
    Ok(HttpResponse::Created().json(component))
}

#[utoipa::path(
    get,
    path = "/api/salary-components",
    params(ComponentQuery),
    responses(
        (status = 200, body = [SalaryComponent])
    ),
    security(("bearer_auth" = [])),
    tag = "Salary Components"
)]
pub async fn list_components(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<ComponentQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_viewer()?;

    let components = state
        .store
        .components_for(query.category, query.subject_id)
        .await
        .map_err(PayrollError::from)?;

    Ok(HttpResponse::Ok().json(components))
}

#[utoipa::path(
    get,
    path = "/api/salary-components/{component_id}",
    params(
        ("component_id", description = "Salary component ID")
    ),
    responses(
        (status = 200, body = SalaryComponent),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Salary Components"
)]
pub async fn get_component(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_viewer()?;

    let component_id = path.into_inner();
    let component = find(&state, component_id).await?;

    Ok(HttpResponse::Ok().json(component))
}

#[utoipa::path(
    put,
    path = "/api/salary-components/{component_id}",
    request_body = SalaryComponentPatch,
    params(
        ("component_id", description = "Salary component ID")
    ),
    responses(
        (status = 200, description = "Component updated", body = SalaryComponent),
        (status = 400),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Salary Components"
)]
pub async fn update_component(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: web::Json<SalaryComponentPatch>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_viewer()?;

    let component_id = path.into_inner();
    let mut component = find(&state, component_id).await?;
    component.apply(body.into_inner())?;

    state
        .store
        .update_component(&component)
        .await
        .map_err(PayrollError::from)?;

    Ok(HttpResponse::Ok().json(component))
}

#[utoipa::path(
    delete,
    path = "/api/salary-components/{component_id}",
    params(
        ("component_id", description = "Salary component ID")
    ),
    responses(
        (status = 204, description = "Component deleted"),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Salary Components"
)]
pub async fn delete_component(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_viewer()?;

    let component_id = path.into_inner();
    let deleted = state
        .store
        .delete_component(component_id)
        .await
        .map_err(PayrollError::from)?;

    if !deleted {
        return Err(PayrollError::not_found("salary component", component_id).into());
    }

    tracing::info!(component_id, user_id = auth.user_id, "Salary component deleted");
    Ok(HttpResponse::NoContent().finish())
}

async fn find(state: &AppState, component_id: u64) -> Result<SalaryComponent, PayrollError> {
    state
        .store
        .find_component(component_id)
        .await?
        .ok_or_else(|| PayrollError::not_found("salary component", component_id))
}

fn subject_entity(category: SubjectCategory) -> &'static str {
    match category {
        SubjectCategory::Employee => "employee",
        SubjectCategory::Intern => "intern",
    }
}
