//! Fire-and-forget payslip notifications.
//!
//! Senders never wait on delivery and never learn about delivery failures;
//! a detached worker drains the queue and logs what it could not deliver.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::model::period::Period;
use crate::model::subject::SubjectCategory;

#[derive(Debug, Clone, PartialEq)]
pub struct PayslipNotice {
    pub payroll_id: u64,
    pub subject_id: u64,
    pub category: SubjectCategory,
    pub recipient: Option<String>,
    pub period: Period,
    pub payslip_link: String,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<PayslipNotice>,
}

impl NotificationDispatcher {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PayslipNotice>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueues without blocking. A full or closed queue drops the notice.
    pub fn notify(&self, notice: PayslipNotice) {
        match self.tx.try_send(notice) {
            Ok(()) => debug!("Payslip notice queued"),
            Err(TrySendError::Full(notice)) => {
                warn!(payroll_id = notice.payroll_id, "Notification queue full; notice dropped")
            }
            Err(TrySendError::Closed(notice)) => {
                warn!(payroll_id = notice.payroll_id, "Notification worker gone; notice dropped")
            }
        }
    }
}

/// Whatever actually reaches the subject (mail, chat, ...).
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn deliver(&self, notice: &PayslipNotice) -> anyhow::Result<()>;
}

/// Delivery stand-in that only records the notice in the log.
pub struct LogDelivery;

#[async_trait]
impl DeliveryChannel for LogDelivery {
    async fn deliver(&self, notice: &PayslipNotice) -> anyhow::Result<()> {
        let recipient = notice
            .recipient
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("subject {} has no email address", notice.subject_id))?;

        info!(
            payroll_id = notice.payroll_id,
            recipient,
            period = %notice.period,
            link = %notice.payslip_link,
            "Payslip notice delivered"
        );
        Ok(())
    }
}

/// Drains the queue until every dispatcher is dropped.
pub async fn run_delivery_worker(
    mut rx: mpsc::Receiver<PayslipNotice>,
    channel: Arc<dyn DeliveryChannel>,
) {
    while let Some(notice) = rx.recv().await {
        if let Err(e) = channel.deliver(&notice).await {
            warn!(error = %e, payroll_id = notice.payroll_id, "Payslip delivery failed");
        }
    }
    debug!("Delivery worker stopped");
}
