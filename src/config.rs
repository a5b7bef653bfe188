use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_payroll_run_per_min: u32,

    pub payslip_dir: String,
    pub notify_queue_capacity: usize,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{} must be set", key));
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let number = |key: &str, default: &str| (key.to_string(), or_default(key, default));

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: or_default("API_PREFIX", "/api"),

            rate_protected_per_min: parse_var(number("RATE_PROTECTED_PER_MIN", "1000"))?,
            rate_payroll_run_per_min: parse_var(number("RATE_PAYROLL_RUN_PER_MIN", "10"))?,

            payslip_dir: or_default("PAYSLIP_DIR", "payslips"),
            notify_queue_capacity: parse_var(number("NOTIFY_QUEUE_CAPACITY", "256"))?,
            log_dir: or_default("LOG_DIR", "logs"),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/payroll_test".into(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            api_prefix: "/api".into(),
            rate_protected_per_min: 1000,
            rate_payroll_run_per_min: 10,
            payslip_dir: "payslips".into(),
            notify_queue_capacity: 8,
            log_dir: "logs".into(),
        }
    }
}

fn parse_var<T>((key, raw): (String, String)) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .with_context(|| format!("{} must be a number, got {:?}", key, raw))
}
