use crate::api::payroll::{
    PaginatedPayrollResponse, PayrollQuery, PayslipResponse, PreviewQuery, RunPayroll,
    RunPayrollResponse, UpdatePayrollStatus,
};
use crate::api::salary_component::ComponentQuery;
use crate::model::accounting_entry::{AccountingEntry, EntryDirection, EntryType};
use crate::model::deduction_rule::{DeductionRule, DeductionRulePatch, NewDeductionRule, RuleScope};
use crate::model::payroll::{PayBreakdown, Payroll, PayrollStatus};
use crate::model::salary_component::{
    ComponentType, NewSalaryComponent, SalaryComponent, SalaryComponentPatch,
};
use crate::model::subject::SubjectCategory;
use crate::payroll::exporter::ExportReceipt;
use crate::payroll::figures::PayFigures;
use crate::payroll::preview::{PayrollPreview, PreviewLine, PreviewTotals};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Payroll API",
        version = "1.0.0",
        description = r#"
## Payroll processing

Monthly payroll for the HRM system: employees and interns are paid from their
salary components, percentage deduction rules are applied on top, and finalized
payrolls are posted to accounting as balanced ledger entries.

### Key Features
- **Payroll runs**: one batch per period and category, all-or-nothing
- **Preview**: the same figures without writing anything
- **Accounting export**: salary expense, tax payable and net payable entries, once per payroll
- **Payslips**: rendered, stored, linked to the record, and announced to the subject
- **Salary components and deduction rules**: maintained through CRUD endpoints

### Security
Every endpoint requires a **JWT Bearer** access token.
Runs, exports, status changes, payslips and deduction rules are limited to **Admin** and **Accountant**;
**HR** may additionally preview, read payrolls and maintain salary components.

### Errors
Failures share one body: `{"error": {"kind": "...", "message": "..."}}`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::payroll::run_payroll,
        crate::api::payroll::preview_payroll,
        crate::api::payroll::list_payrolls,
        crate::api::payroll::get_payroll,
        crate::api::payroll::update_payroll_status,
        crate::api::payroll::export_payroll,
        crate::api::payroll::list_entries,
        crate::api::payroll::generate_payslip,

        crate::api::salary_component::create_component,
        crate::api::salary_component::list_components,
        crate::api::salary_component::get_component,
        crate::api::salary_component::update_component,
        crate::api::salary_component::delete_component,

        crate::api::deduction_rule::create_rule,
        crate::api::deduction_rule::list_rules,
        crate::api::deduction_rule::get_rule,
        crate::api::deduction_rule::update_rule,
        crate::api::deduction_rule::delete_rule
    ),
    components(
        schemas(
            RunPayroll,
            RunPayrollResponse,
            PreviewQuery,
            PayrollQuery,
            PaginatedPayrollResponse,
            UpdatePayrollStatus,
            PayslipResponse,
            Payroll,
            PayBreakdown,
            PayrollStatus,
            SubjectCategory,
            PayrollPreview,
            PreviewLine,
            PreviewTotals,
            PayFigures,
            ExportReceipt,
            AccountingEntry,
            EntryType,
            EntryDirection,
            ComponentQuery,
            SalaryComponent,
            NewSalaryComponent,
            SalaryComponentPatch,
            ComponentType,
            DeductionRule,
            NewDeductionRule,
            DeductionRulePatch,
            RuleScope
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Payroll", description = "Payroll runs, previews, exports and payslips"),
        (name = "Salary Components", description = "Per-subject salary components"),
        (name = "Deduction Rules", description = "Global percentage deductions"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/api/payroll/run",
            "/api/payroll/preview",
            "/api/payroll/{payroll_id}/export",
            "/api/payroll/{payroll_id}/payslip",
            "/api/salary-components/{component_id}",
            "/api/deduction-rules",
        ] {
            assert!(paths.contains(&expected), "missing {}", expected);
        }

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
