use actix_web::{HttpResponse, Responder, web};

use crate::auth::auth::AuthUser;
use crate::error::PayrollError;
use crate::model::deduction_rule::{DeductionRule, DeductionRulePatch, NewDeductionRule};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/deduction-rules",
    request_body = NewDeductionRule,
    responses(
        (status = 201, description = "Rule created", body = DeductionRule),
        (status = 400, description = "Invalid name or percentage")
    ),
    security(("bearer_auth" = [])),
    tag = "Deduction Rules"
)]
pub async fn create_rule(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewDeductionRule>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_manager()?;

    let new = payload.into_inner();
    new.validate()?;

    let rule = state.store.create_rule(&new).await.map_err(PayrollError::from)?;

    tracing::info!(rule_id = rule.id, percentage = %rule.percentage, "Deduction rule created");
    Ok(HttpResponse::Created().json(rule))
}

#[utoipa::path(
    get,
    path = "/api/deduction-rules",
    responses(
        (status = 200, body = [DeductionRule])
    ),
    security(("bearer_auth" = [])),
    tag = "Deduction Rules"
)]
pub async fn list_rules(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_manager()?;

    let rules = state.store.list_rules().await.map_err(PayrollError::from)?;
    Ok(HttpResponse::Ok().json(rules))
}

#[utoipa::path(
    get,
    path = "/api/deduction-rules/{rule_id}",
    params(
        ("rule_id", description = "Deduction rule ID")
    ),
    responses(
        (status = 200, body = DeductionRule),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Deduction Rules"
)]
pub async fn get_rule(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_manager()?;

    let rule = find(&state, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(rule))
}

#[utoipa::path(
    put,
    path = "/api/deduction-rules/{rule_id}",
    request_body = DeductionRulePatch,
    params(
        ("rule_id", description = "Deduction rule ID")
    ),
    responses(
        (status = 200, description = "Rule updated", body = DeductionRule),
        (status = 400),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Deduction Rules"
)]
pub async fn update_rule(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: web::Json<DeductionRulePatch>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_manager()?;

    let mut rule = find(&state, path.into_inner()).await?;
    rule.apply(body.into_inner())?;

    state.store.update_rule(&rule).await.map_err(PayrollError::from)?;

    tracing::info!(rule_id = rule.id, active = rule.active, "Deduction rule updated");
    Ok(HttpResponse::Ok().json(rule))
}

#[utoipa::path(
    delete,
    path = "/api/deduction-rules/{rule_id}",
    params(
        ("rule_id", description = "Deduction rule ID")
    ),
    responses(
        (status = 204, description = "Rule deleted"),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Deduction Rules"
)]
pub async fn delete_rule(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_payroll_manager()?;

    let rule_id = path.into_inner();
    if !state.store.delete_rule(rule_id).await.map_err(PayrollError::from)? {
        return Err(PayrollError::not_found("deduction rule", rule_id).into());
    }

    Ok(HttpResponse::NoContent().finish())
}

async fn find(state: &AppState, rule_id: u64) -> Result<DeductionRule, PayrollError> {
    state
        .store
        .find_rule(rule_id)
        .await?
        .ok_or_else(|| PayrollError::not_found("deduction rule", rule_id))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use serde_json::{Value, json};

    use crate::api::testing::{app, authed};
    use crate::model::role::Role;
    use crate::store::memory::MemoryStore;

    #[actix_web::test]
    async fn accountant_maintains_rules() {
        let (app, _notices) = app(MemoryStore::new());
        let app = test::init_service(app).await;

        let req = authed(TestRequest::post().uri("/api/deduction-rules"), Role::Accountant)
            .set_json(json!({ "name": "Pension", "percentage": "5", "applies_to": "both" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let rule: Value = test::read_body_json(resp).await;
        let id = rule["id"].as_u64().unwrap();

        let req = authed(TestRequest::put().uri(&format!("/api/deduction-rules/{}", id)), Role::Admin)
            .set_json(json!({ "active": false }))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["active"], false);
        assert_eq!(updated["applies_to"], "both");

        let req = authed(TestRequest::get().uri("/api/deduction-rules"), Role::Accountant).to_request();
        let rules: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(rules.as_array().unwrap().len(), 1);

        let req = authed(TestRequest::delete().uri(&format!("/api/deduction-rules/{}", id)), Role::Admin)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = authed(TestRequest::delete().uri(&format!("/api/deduction-rules/{}", id)), Role::Admin)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn percentage_above_hundred_is_rejected() {
        let (app, _notices) = app(MemoryStore::new());
        let app = test::init_service(app).await;

        let req = authed(TestRequest::post().uri("/api/deduction-rules"), Role::Admin)
            .set_json(json!({ "name": "Greedy", "percentage": "100.5", "applies_to": "employee" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["kind"], "validation");
    }

    #[actix_web::test]
    async fn hr_cannot_read_rules() {
        let (app, _notices) = app(MemoryStore::new());
        let app = test::init_service(app).await;

        let req = authed(TestRequest::get().uri("/api/deduction-rules"), Role::Hr).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }
}
