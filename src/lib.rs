#![doc = include_str!("../README.md")]
use tracing::info;

use std::{io::Write, time::Duration};

pub mod client;
pub mod error;
pub mod items;
pub mod logging;
pub mod price;
pub mod report;

pub use client::{Credentials, HttpTransport, Token, Transport};
pub use error::{Error, Result, TransportError};
pub use items::{Item, ItemNumber, Items, Purchase};
pub use price::Price;
pub use report::{Report, Row};

/// Where to reach the receipts API, and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub login_url: String,
    pub receipts_url: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login_url: client::LOGIN_URL.to_owned(),
            receipts_url: client::RECEIPTS_URL.to_owned(),
            timeout: client::DEFAULT_TIMEOUT,
        }
    }
}

/// Logs in, downloads every receipt and summarises them.
///
/// The receipts call is only made once login has succeeded.
///
/// # Errors
///
/// Returns the first error from logging in, fetching or aggregating.
pub fn generate_report(
    transport: &impl Transport,
    config: &Config,
    credentials: &Credentials,
) -> Result<Report> {
    let token = client::login(transport, &config.login_url, credentials)?;
    let receipts = client::fetch_receipts(transport, &config.receipts_url, &token)?;
    let items = Items::from_receipts(&receipts)?;
    let report = Report::from_items(&items);
    info!(rows = report.rows().len(), "report ready");
    Ok(report)
}

/// Runs [`generate_report`] over a fresh HTTP session and writes the table
/// to `out`.
///
/// The session is dropped before anything is written. Nothing is written
/// unless the whole report succeeded.
///
/// # Errors
///
/// Returns any error from [`generate_report`], or an I/O error from `out`.
pub fn print_receipts(
    config: &Config,
    credentials: &Credentials,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let report = {
        let transport = HttpTransport::new(config.timeout)?;
        generate_report(&transport, config, credentials)?
    };
    writeln!(out, "{report}")?;
    Ok(())
}
