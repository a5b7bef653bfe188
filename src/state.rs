use std::sync::Arc;

use crate::payroll::exporter::AccountingExporter;
use crate::payroll::notify::NotificationDispatcher;
use crate::payroll::payslip::{DocumentStorage, PayslipPipeline, TextPayslipRenderer};
use crate::payroll::preview::PayrollPreviewer;
use crate::payroll::runner::PayrollRunner;
use crate::store::PayrollRepository;

/// Shared by every worker; handlers reach it through `web::Data<AppState>`.
pub struct AppState {
    pub store: Arc<dyn PayrollRepository>,
    pub runner: PayrollRunner,
    pub previewer: PayrollPreviewer,
    pub exporter: AccountingExporter,
    pub payslips: PayslipPipeline,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PayrollRepository>,
        storage: Arc<dyn DocumentStorage>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            runner: PayrollRunner::new(store.clone()),
            previewer: PayrollPreviewer::new(store.clone()),
            exporter: AccountingExporter::new(store.clone()),
            payslips: PayslipPipeline::new(
                store.clone(),
                Arc::new(TextPayslipRenderer),
                storage,
                notifier,
            ),
            store,
        }
    }
}
