use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::model::period::Period;
use crate::model::subject::SubjectCategory;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum PayrollError {
    #[error("{0}")]
    Validation(String),

    #[error("payroll for {period} ({category}) has already been processed")]
    AlreadyProcessed {
        period: Period,
        category: SubjectCategory,
    },

    #[error("payroll {0} has already been exported")]
    AlreadyExported(u64),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("export of payroll {payroll_id} failed")]
    ExportFailed {
        payroll_id: u64,
        #[source]
        source: StoreError,
    },

    #[error("payslip rendering failed: {0}")]
    Renderer(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PayrollError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        PayrollError::NotFound { entity, id }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PayrollError::Validation(_) => "validation",
            PayrollError::AlreadyProcessed { .. } => "already_processed",
            PayrollError::AlreadyExported(_) => "already_exported",
            PayrollError::NotFound { .. } => "not_found",
            PayrollError::ExportFailed { .. } => "export_failed",
            PayrollError::Renderer(_) => "renderer",
            PayrollError::Store(_) => "storage",
        }
    }
}

impl ResponseError for PayrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::Validation(_) => StatusCode::BAD_REQUEST,
            PayrollError::AlreadyProcessed { .. } | PayrollError::AlreadyExported(_) => {
                StatusCode::CONFLICT
            }
            PayrollError::NotFound { .. } => StatusCode::NOT_FOUND,
            PayrollError::Renderer(_) => StatusCode::BAD_GATEWAY,
            PayrollError::ExportFailed { .. } | PayrollError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        // storage details stay in the logs
        let message = match self {
            PayrollError::Store(e) => {
                tracing::error!(error = %e, "Storage failure");
                "Internal Server Error".to_string()
            }
            PayrollError::ExportFailed { payroll_id, source } => {
                tracing::error!(error = %source, payroll_id, "Accounting export rolled back");
                self.to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": { "kind": self.kind(), "message": message }
        }))
    }
}
