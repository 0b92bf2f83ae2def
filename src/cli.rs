use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::models::Granularity;

pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_SHA"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

pub fn parse_iso_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| "date must use YYYY-MM-DD format".to_string())
}

#[derive(Debug, Parser)]
#[command(
    name = "toko-dashboard",
    about = "Toko Agung point-of-sale dashboard",
    version,
    long_version = LONG_VERSION
)]
pub struct Cli {
    /// Store API base URL (overrides settings file and TOKO_API_BASE)
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// JSON settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Operator name for this session (overrides TOKO_OPERATOR)
    #[arg(long, global = true)]
    pub operator: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sales report for a date range (default: the last 30 days)
    Report {
        #[arg(long, value_parser = parse_iso_date)]
        from: Option<NaiveDate>,
        #[arg(long, value_parser = parse_iso_date)]
        to: Option<NaiveDate>,
    },
    /// Today's summary, sales chart and top products
    Dashboard {
        #[arg(long, default_value = "weekly")]
        range: Granularity,
    },
    /// Look up products by name or code
    Search { query: String },
    /// Interactive sales entry: search, build a cart, save the transaction
    Register,
}
