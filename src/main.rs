use std::{io, process, time::Duration};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use receipts::{client, logging, print_receipts, Config, Credentials};

/// Download City Gross receipts and summarise purchases by item.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// What to do. Only `print` is supported
    command: String,
    /// Account email address
    #[arg(short, long)]
    email: String,
    /// Account password
    #[arg(short, long)]
    password: String,
    /// Give up on each request after this many seconds
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = client::DEFAULT_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    timeout: u64,
    /// Log more to stderr (repeat for more detail)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(long, hide = true, default_value = client::LOGIN_URL)]
    login_url: String,
    #[arg(long, hide = true, default_value = client::RECEIPTS_URL)]
    receipts_url: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose);

    if args.command != "print" {
        eprintln!("Unknown command: {}", args.command);
        process::exit(1);
    }

    let config = Config {
        login_url: args.login_url,
        receipts_url: args.receipts_url,
        timeout: Duration::from_secs(args.timeout),
    };
    let credentials = Credentials {
        email: args.email,
        password: args.password,
    };
    print_receipts(&config, &credentials, &mut io::stdout().lock())
        .context("could not print receipts")?;
    Ok(())
}
