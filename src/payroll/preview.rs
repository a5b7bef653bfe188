use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;

use super::figures::{self, PayFigures};
use crate::error::PayrollError;
use crate::model::period::Period;
use crate::model::subject::SubjectCategory;
use crate::store::PayrollRepository;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PreviewLine {
    pub subject_id: u64,
    pub category: SubjectCategory,
    pub name: String,
    #[serde(flatten)]
    pub figures: PayFigures,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PreviewTotals {
    pub subjects: usize,
    pub gross: Decimal,
    pub deductions: Decimal,
    pub net_pay: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PayrollPreview {
    #[schema(value_type = String, example = "2026-01")]
    pub period: Period,
    pub lines: Vec<PreviewLine>,
    pub totals: PreviewTotals,
    /// Categories that already have records for this period.
    pub already_processed: Vec<SubjectCategory>,
}

/// Dry run of the payroll figures. Never writes.
pub struct PayrollPreviewer {
    store: Arc<dyn PayrollRepository>,
}

impl PayrollPreviewer {
    pub fn new(store: Arc<dyn PayrollRepository>) -> Self {
        Self { store }
    }

    /// Previews one category, or both when `category` is `None`.
    #[instrument(name = "payroll_preview", skip_all, fields(period = %period))]
    pub async fn preview(
        &self,
        period: &Period,
        category: Option<SubjectCategory>,
    ) -> Result<PayrollPreview, PayrollError> {
        let categories: Vec<SubjectCategory> = match category {
            Some(c) => vec![c],
            None => SubjectCategory::ALL.to_vec(),
        };

        let rules = self.store.list_rules().await?;
        let mut lines = Vec::new();
        let mut already_processed = Vec::new();

        for category in categories {
            if self.store.period_processed(period, category).await? {
                already_processed.push(category);
            }

            for subject in self.store.payable_subjects(category).await? {
                let components = self.store.components_for(category, subject.id).await?;
                let figures = figures::compute(category, &components, &rules);
                if !figures.is_payable() {
                    continue;
                }
                lines.push(PreviewLine {
                    subject_id: subject.id,
                    category,
                    name: subject.name,
                    figures,
                });
            }
        }

        let totals = lines.iter().fold(PreviewTotals::default(), |mut t, line| {
            t.subjects += 1;
            t.gross += line.figures.gross;
            t.deductions += line.figures.deductions;
            t.net_pay += line.figures.net_pay;
            t
        });
        debug!(subjects = totals.subjects, gross = %totals.gross, "Preview computed");

        Ok(PayrollPreview {
            period: period.clone(),
            lines,
            totals,
            already_processed,
        })
    }
}
