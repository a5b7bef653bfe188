use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder, Transaction};
use tracing::debug;

use super::{
    ComponentStore, DeductionRuleStore, LedgerTransaction, PayrollLedger, StoreError,
    SubjectDirectory,
};
use crate::model::accounting_entry::{AccountingEntry, NewAccountingEntry};
use crate::model::deduction_rule::{DeductionRule, NewDeductionRule};
use crate::model::payroll::{NewPayroll, PayBreakdown, Payroll, PayrollFilter, PayrollStatus};
use crate::model::period::Period;
use crate::model::salary_component::{NewSalaryComponent, SalaryComponent};
use crate::model::subject::{Subject, SubjectCategory};

const COMPONENT_COLUMNS: &str =
    "id, subject_id, category, component_type, name, amount, is_taxable, is_recurring, active";
const RULE_COLUMNS: &str = "id, name, percentage, applies_to, active";
const PAYROLL_COLUMNS: &str = "id, subject_id, category, period, gross, deductions, net_pay, \
     base, allowances, bonuses, flat_deductions, percentage_deductions, \
     status, exported_at, payslip_link, created_at";
const ENTRY_COLUMNS: &str = "id, payroll_id, entry_type, amount, direction, entry_date";

/// MySQL-backed implementation of every payroll store.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn subject_table(category: SubjectCategory) -> &'static str {
    match category {
        SubjectCategory::Employee => "employees",
        SubjectCategory::Intern => "interns",
    }
}

/// Translates duplicate-key failures; everything else stays a database error.
fn translate(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("23000") && db_err.message().starts_with("Duplicate entry")
        {
            return StoreError::Duplicate(db_err.message().to_string());
        }
    }
    StoreError::Database(e)
}

fn parse_column<T: FromStr>(column: &'static str, raw: &str) -> Result<T, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Backend(format!("unexpected {} value {:?}", column, raw)))
}

// -------------------- Rows --------------------

#[derive(FromRow)]
struct ComponentRow {
    id: u64,
    subject_id: u64,
    category: String,
    component_type: String,
    name: String,
    amount: Decimal,
    is_taxable: bool,
    is_recurring: bool,
    active: bool,
}

impl TryFrom<ComponentRow> for SalaryComponent {
    type Error = StoreError;

    fn try_from(row: ComponentRow) -> Result<Self, Self::Error> {
        Ok(SalaryComponent {
            id: row.id,
            subject_id: row.subject_id,
            category: parse_column("category", &row.category)?,
            component_type: parse_column("component_type", &row.component_type)?,
            name: row.name,
            amount: row.amount,
            is_taxable: row.is_taxable,
            is_recurring: row.is_recurring,
            active: row.active,
        })
    }
}

#[derive(FromRow)]
struct RuleRow {
    id: u64,
    name: String,
    percentage: Decimal,
    applies_to: String,
    active: bool,
}

impl TryFrom<RuleRow> for DeductionRule {
    type Error = StoreError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        Ok(DeductionRule {
            id: row.id,
            name: row.name,
            percentage: row.percentage,
            applies_to: parse_column("applies_to", &row.applies_to)?,
            active: row.active,
        })
    }
}

#[derive(FromRow)]
struct SubjectRow {
    id: u64,
    name: String,
    email: Option<String>,
}

#[derive(FromRow)]
struct PayrollRow {
    id: u64,
    subject_id: u64,
    category: String,
    period: String,
    gross: Decimal,
    deductions: Decimal,
    net_pay: Decimal,
    base: Decimal,
    allowances: Decimal,
    bonuses: Decimal,
    flat_deductions: Decimal,
    percentage_deductions: Decimal,
    status: String,
    exported_at: Option<DateTime<Utc>>,
    payslip_link: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PayrollRow> for Payroll {
    type Error = StoreError;

    fn try_from(row: PayrollRow) -> Result<Self, Self::Error> {
        Ok(Payroll {
            id: row.id,
            subject_id: row.subject_id,
            category: parse_column("category", &row.category)?,
            period: parse_column::<Period>("period", &row.period)?,
            gross: row.gross,
            deductions: row.deductions,
            net_pay: row.net_pay,
            breakdown: PayBreakdown {
                base: row.base,
                allowances: row.allowances,
                bonuses: row.bonuses,
                flat_deductions: row.flat_deductions,
                percentage_deductions: row.percentage_deductions,
            },
            status: parse_column("status", &row.status)?,
            exported_at: row.exported_at,
            payslip_link: row.payslip_link,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct EntryRow {
    id: u64,
    payroll_id: u64,
    entry_type: String,
    amount: Decimal,
    direction: String,
    entry_date: NaiveDate,
}

impl TryFrom<EntryRow> for AccountingEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(AccountingEntry {
            id: row.id,
            payroll_id: row.payroll_id,
            entry_type: parse_column("entry_type", &row.entry_type)?,
            amount: row.amount,
            direction: parse_column("direction", &row.direction)?,
            entry_date: row.entry_date,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// -------------------- Components --------------------

#[async_trait]
impl ComponentStore for MySqlStore {
    async fn create_component(&self, new: &NewSalaryComponent) -> Result<SalaryComponent, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO salary_components
            (subject_id, category, component_type, name, amount, is_taxable, is_recurring, active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.subject_id)
        .bind(new.category.as_ref())
        .bind(new.component_type.as_ref())
        .bind(new.name.trim())
        .bind(new.amount)
        .bind(new.is_taxable)
        .bind(new.is_recurring)
        .bind(new.active)
        .execute(&self.pool)
        .await
        .map_err(translate)?;

        Ok(SalaryComponent::from_new(result.last_insert_id(), new))
    }

    async fn find_component(&self, id: u64) -> Result<Option<SalaryComponent>, StoreError> {
        let sql = format!("SELECT {} FROM salary_components WHERE id = ?", COMPONENT_COLUMNS);
        sqlx::query_as::<_, ComponentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(SalaryComponent::try_from)
            .transpose()
    }

    async fn update_component(&self, component: &SalaryComponent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE salary_components
            SET component_type = ?, name = ?, amount = ?, is_taxable = ?, is_recurring = ?, active = ?
            WHERE id = ?
            "#,
        )
        .bind(component.component_type.as_ref())
        .bind(&component.name)
        .bind(component.amount)
        .bind(component.is_taxable)
        .bind(component.is_recurring)
        .bind(component.active)
        .bind(component.id)
        .execute(&self.pool)
        .await
        .map_err(translate)?;
        Ok(())
    }

    async fn delete_component(&self, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM salary_components WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn components_for(
        &self,
        category: SubjectCategory,
        subject_id: u64,
    ) -> Result<Vec<SalaryComponent>, StoreError> {
        let sql = format!(
            "SELECT {} FROM salary_components WHERE category = ? AND subject_id = ? ORDER BY id",
            COMPONENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ComponentRow>(&sql)
            .bind(category.as_ref())
            .bind(subject_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }
}

// -------------------- Deduction rules --------------------

#[async_trait]
impl DeductionRuleStore for MySqlStore {
    async fn create_rule(&self, new: &NewDeductionRule) -> Result<DeductionRule, StoreError> {
        let result = sqlx::query(
            "INSERT INTO deduction_rules (name, percentage, applies_to, active) VALUES (?, ?, ?, ?)",
        )
        .bind(new.name.trim())
        .bind(new.percentage)
        .bind(new.applies_to.as_ref())
        .bind(new.active)
        .execute(&self.pool)
        .await
        .map_err(translate)?;

        Ok(DeductionRule::from_new(result.last_insert_id(), new))
    }

    async fn find_rule(&self, id: u64) -> Result<Option<DeductionRule>, StoreError> {
        let sql = format!("SELECT {} FROM deduction_rules WHERE id = ?", RULE_COLUMNS);
        sqlx::query_as::<_, RuleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(DeductionRule::try_from)
            .transpose()
    }

    async fn update_rule(&self, rule: &DeductionRule) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE deduction_rules SET name = ?, percentage = ?, applies_to = ?, active = ? WHERE id = ?",
        )
        .bind(&rule.name)
        .bind(rule.percentage)
        .bind(rule.applies_to.as_ref())
        .bind(rule.active)
        .bind(rule.id)
        .execute(&self.pool)
        .await
        .map_err(translate)?;
        Ok(())
    }

    async fn delete_rule(&self, id: u64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM deduction_rules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_rules(&self) -> Result<Vec<DeductionRule>, StoreError> {
        let sql = format!("SELECT {} FROM deduction_rules ORDER BY id", RULE_COLUMNS);
        let rows = sqlx::query_as::<_, RuleRow>(&sql).fetch_all(&self.pool).await?;
        convert_all(rows)
    }
}

// -------------------- Subjects --------------------

#[async_trait]
impl SubjectDirectory for MySqlStore {
    async fn payable_subjects(&self, category: SubjectCategory) -> Result<Vec<Subject>, StoreError> {
        let sql = format!(
            "SELECT id, CONCAT_WS(' ', first_name, last_name) AS name, email \
             FROM {} WHERE status = 'active' ORDER BY id",
            subject_table(category)
        );
        let rows = sqlx::query_as::<_, SubjectRow>(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| Subject {
                id: row.id,
                category,
                name: row.name,
                email: row.email,
            })
            .collect())
    }

    async fn find_subject(
        &self,
        category: SubjectCategory,
        id: u64,
    ) -> Result<Option<Subject>, StoreError> {
        let sql = format!(
            "SELECT id, CONCAT_WS(' ', first_name, last_name) AS name, email FROM {} WHERE id = ?",
            subject_table(category)
        );
        let row = sqlx::query_as::<_, SubjectRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Subject {
            id: row.id,
            category,
            name: row.name,
            email: row.email,
        }))
    }
}

// -------------------- Payroll ledger --------------------

fn push_filters(qb: &mut QueryBuilder<'_, MySql>, filter: &PayrollFilter) {
    if let Some(period) = &filter.period {
        qb.push(" AND period = ").push_bind(period.as_str().to_string());
    }
    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category.as_ref().to_string());
    }
    if let Some(subject_id) = filter.subject_id {
        qb.push(" AND subject_id = ").push_bind(subject_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_ref().to_string());
    }
}

#[async_trait]
impl PayrollLedger for MySqlStore {
    async fn period_processed(
        &self,
        period: &Period,
        category: SubjectCategory,
    ) -> Result<bool, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM payrolls WHERE period = ? AND category = ?",
        )
        .bind(period.as_str())
        .bind(category.as_ref())
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn find_payroll(&self, id: u64) -> Result<Option<Payroll>, StoreError> {
        let sql = format!("SELECT {} FROM payrolls WHERE id = ?", PAYROLL_COLUMNS);
        sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Payroll::try_from)
            .transpose()
    }

    async fn list_payrolls(&self, filter: &PayrollFilter) -> Result<(Vec<Payroll>, i64), StoreError> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM payrolls WHERE 1=1");
        push_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut data = QueryBuilder::<MySql>::new(format!(
            "SELECT {} FROM payrolls WHERE 1=1",
            PAYROLL_COLUMNS
        ));
        push_filters(&mut data, filter);
        data.push(" ORDER BY period DESC, id ASC LIMIT ")
            .push_bind(i64::from(filter.per_page))
            .push(" OFFSET ")
            .push_bind(filter.offset() as i64);

        debug!(sql = %data.sql(), "Fetching payrolls");

        let rows = data.build_query_as::<PayrollRow>().fetch_all(&self.pool).await?;
        Ok((convert_all(rows)?, total))
    }

    async fn update_payroll_status(
        &self,
        id: u64,
        status: PayrollStatus,
    ) -> Result<Option<Payroll>, StoreError> {
        sqlx::query("UPDATE payrolls SET status = ? WHERE id = ?")
            .bind(status.as_ref())
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.find_payroll(id).await
    }

    async fn set_payslip_link(&self, id: u64, link: &str) -> Result<bool, StoreError> {
        if self.find_payroll(id).await?.is_none() {
            return Ok(false);
        }
        sqlx::query("UPDATE payrolls SET payslip_link = ? WHERE id = ?")
            .bind(link)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn entries_for(&self, payroll_id: u64) -> Result<Vec<AccountingEntry>, StoreError> {
        let sql = format!(
            "SELECT {} FROM accounting_entries WHERE payroll_id = ? ORDER BY id",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(payroll_id)
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlLedgerTx { tx }))
    }
}

struct MySqlLedgerTx {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl LedgerTransaction for MySqlLedgerTx {
    async fn insert_payroll(&mut self, new: &NewPayroll) -> Result<Payroll, StoreError> {
        // TIMESTAMP columns keep whole seconds
        let created_at = Utc::now().trunc_subsecs(0);

        let result = sqlx::query(
            r#"
            INSERT INTO payrolls
            (subject_id, category, period, gross, deductions, net_pay,
             base, allowances, bonuses, flat_deductions, percentage_deductions,
             status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.subject_id)
        .bind(new.category.as_ref())
        .bind(new.period.as_str())
        .bind(new.gross)
        .bind(new.deductions)
        .bind(new.net_pay)
        .bind(new.breakdown.base)
        .bind(new.breakdown.allowances)
        .bind(new.breakdown.bonuses)
        .bind(new.breakdown.flat_deductions)
        .bind(new.breakdown.percentage_deductions)
        .bind(PayrollStatus::Pending.as_ref())
        .bind(created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(translate)?;

        Ok(Payroll::from_new(result.last_insert_id(), new.clone(), created_at))
    }

    async fn payroll_for_update(&mut self, id: u64) -> Result<Option<Payroll>, StoreError> {
        let sql = format!("SELECT {} FROM payrolls WHERE id = ? FOR UPDATE", PAYROLL_COLUMNS);
        sqlx::query_as::<_, PayrollRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Payroll::try_from)
            .transpose()
    }

    async fn insert_entry(
        &mut self,
        payroll_id: u64,
        entry: &NewAccountingEntry,
    ) -> Result<AccountingEntry, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounting_entries (payroll_id, entry_type, amount, direction, entry_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(payroll_id)
        .bind(entry.entry_type.as_ref())
        .bind(entry.amount)
        .bind(entry.direction.as_ref())
        .bind(entry.entry_date)
        .execute(&mut *self.tx)
        .await
        .map_err(translate)?;

        Ok(AccountingEntry::from_new(result.last_insert_id(), payroll_id, entry))
    }

    async fn mark_exported(&mut self, payroll_id: u64, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE payrolls SET exported_at = ? WHERE id = ? AND exported_at IS NULL",
        )
        .bind(at)
        .bind(payroll_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate(format!(
                "payroll {} already carries exported_at",
                payroll_id
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(translate)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
