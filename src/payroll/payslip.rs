use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::notify::{NotificationDispatcher, PayslipNotice};
use crate::error::PayrollError;
use crate::model::payroll::Payroll;
use crate::model::subject::Subject;
use crate::store::{PayrollRepository, StoreError};

/// Everything a renderer needs to lay out one payslip. Figures come from the
/// persisted record only; later component or rule edits never show up here.
#[derive(Debug, Clone)]
pub struct PayslipDocument {
    pub payroll: Payroll,
    pub subject: Subject,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

pub trait DocumentRenderer: Send + Sync {
    fn render(&self, document: &PayslipDocument) -> anyhow::Result<RenderedDocument>;
}

#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Persists the document and returns an opaque reference to it.
    async fn store(&self, name: &str, document: &RenderedDocument) -> anyhow::Result<String>;
}

/// Fixed-width plain text payslip.
pub struct TextPayslipRenderer;

impl DocumentRenderer for TextPayslipRenderer {
    fn render(&self, doc: &PayslipDocument) -> anyhow::Result<RenderedDocument> {
        let p = &doc.payroll;
        let mut out = String::new();

        writeln!(out, "PAYSLIP - {}", p.period.label())?;
        writeln!(out, "{} ({} #{})", doc.subject.name, doc.subject.category, doc.subject.id)?;
        writeln!(out, "{}", "-".repeat(40))?;
        let b = &p.breakdown;
        for (label, amount) in [
            ("Base", b.base),
            ("Allowances", b.allowances),
            ("Bonuses", b.bonuses),
            ("Flat deductions", b.flat_deductions),
            ("Percentage deductions", b.percentage_deductions),
        ] {
            writeln!(out, "{:<24}{:>16}", label, amount)?;
        }
        writeln!(out, "{}", "-".repeat(40))?;
        writeln!(out, "{:<24}{:>16}", "Gross", p.gross)?;
        writeln!(out, "{:<24}{:>16}", "Deductions", p.deductions)?;
        writeln!(out, "{:<24}{:>16}", "Net pay", p.net_pay)?;

        Ok(RenderedDocument {
            bytes: out.into_bytes(),
            extension: "txt",
        })
    }
}

/// Writes documents under a local directory; the reference is the file path.
pub struct LocalDirStorage {
    root: PathBuf,
}

impl LocalDirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentStorage for LocalDirStorage {
    async fn store(&self, name: &str, document: &RenderedDocument) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(format!("{}.{}", name, document.extension));
        tokio::fs::write(&path, &document.bytes).await?;
        Ok(path.display().to_string())
    }
}

/// Render, store, link, notify.
pub struct PayslipPipeline {
    store: Arc<dyn PayrollRepository>,
    renderer: Arc<dyn DocumentRenderer>,
    storage: Arc<dyn DocumentStorage>,
    notifier: NotificationDispatcher,
}

impl PayslipPipeline {
    pub fn new(
        store: Arc<dyn PayrollRepository>,
        renderer: Arc<dyn DocumentRenderer>,
        storage: Arc<dyn DocumentStorage>,
        notifier: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            renderer,
            storage,
            notifier,
        }
    }

    #[instrument(name = "payslip_generate", skip(self))]
    pub async fn generate(&self, payroll_id: u64) -> Result<String, PayrollError> {
        let payroll = self
            .store
            .find_payroll(payroll_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("payroll", payroll_id))?;

        let subject = self
            .store
            .find_subject(payroll.category, payroll.subject_id)
            .await?
            .ok_or_else(|| PayrollError::not_found("subject", payroll.subject_id))?;

        let document = PayslipDocument { payroll, subject };

        let rendered = self.renderer.render(&document).map_err(|e| {
            error!(error = %e, "Payslip rendering failed");
            PayrollError::Renderer(e.to_string())
        })?;

        let name = format!("payslip-{}-{}", document.payroll.period, Uuid::new_v4());
        let link = self.storage.store(&name, &rendered).await.map_err(|e| {
            error!(error = %e, "Payslip storage failed");
            PayrollError::Store(StoreError::Backend(e.to_string()))
        })?;

        if !self.store.set_payslip_link(payroll_id, &link).await? {
            return Err(PayrollError::not_found("payroll", payroll_id));
        }

        self.notifier.notify(PayslipNotice {
            payroll_id,
            subject_id: document.subject.id,
            category: document.subject.category,
            recipient: document.subject.email.clone(),
            period: document.payroll.period.clone(),
            payslip_link: link.clone(),
        });

        info!(link = %link, net_pay = %document.payroll.net_pay, "Payslip generated");
        Ok(link)
    }
}
