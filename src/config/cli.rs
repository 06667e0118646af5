use crate::domain::model::Country;
use crate::utils::logger::LogFormat;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// IssueCoin: household expense and stock tracker
#[derive(Parser, Debug)]
#[command(name = "issuecoin")]
#[command(about = "Household expenses, receipts and pantry stock, with n8n automation")]
#[command(version)]
pub struct Cli {
    /// Path to TOML configuration file (default: issuecoin.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Receipt inbox
    #[command(subcommand)]
    Inbox(InboxCommand),

    /// Transcribe a voice note and file it like a receipt
    Voice {
        /// Audio file (mp3, m4a, wav, ogg, webm)
        file: PathBuf,

        #[arg(long, default_value = "")]
        note: String,
    },

    /// Send a receipt photo or PDF to the OCR workflow
    Ocr {
        file: PathBuf,

        /// Store name passed to OCR and used when it detects none
        #[arg(long, default_value = "")]
        store_hint: String,

        /// Write the recognised items to the purchase log and stock
        #[arg(long)]
        commit: bool,
    },

    /// Record a purchase without a receipt
    Purchase {
        #[arg(long, default_value = "Albert")]
        store: String,

        /// CZ, SK or PL
        #[arg(long, default_value = "CZ")]
        country: Country,

        /// Purchase date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Category (default: category of the first item)
        #[arg(long)]
        category: Option<String>,

        /// Catalogue item as NAME=QTY (can be repeated)
        #[arg(long = "item", value_parser = parse_pick, required = true)]
        items: Vec<(String, f64)>,

        /// Amount paid in the country's currency
        #[arg(long, default_value = "0")]
        total: f64,
    },

    /// Show the ledger
    Ledger {
        /// Write the ledger as CSV to this path
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Pantry stock
    #[command(subcommand)]
    Stock(StockCommand),

    /// Shopping list, flyer prices and deal search
    #[command(subcommand)]
    Shop(ShopCommand),

    /// Monthly report over the purchase log
    Report {
        /// Month as YYYY-MM (default: latest month in the log)
        #[arg(long)]
        month: Option<String>,

        /// Monthly budget in CZK (default: from config)
        #[arg(long)]
        budget: Option<u32>,

        /// Write the month's log rows as CSV into this directory
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Ask the MCP agent for a weekly meal and shopping plan
    Plan {
        #[arg(long)]
        budget: Option<u32>,

        #[arg(long)]
        daily: Option<u32>,
    },

    /// Zip all tables with a manifest
    Archive {
        #[arg(short, long, default_value = "issuecoin-archive.zip")]
        out: PathBuf,
    },

    /// Show configuration and integration status
    Status,
}

#[derive(Subcommand, Debug)]
pub enum InboxCommand {
    /// Parse a text receipt and add it to the inbox
    Add {
        file: PathBuf,

        #[arg(long, default_value = "")]
        note: String,
    },
    /// List inbox entries
    List,
}

#[derive(Subcommand, Debug)]
pub enum StockCommand {
    Show,
    /// Add to (or with a negative quantity, take from) an item's stock
    Adjust {
        item: String,

        #[arg(allow_negative_numbers = true)]
        qty: f64,

        #[arg(long, default_value = "Potraviny")]
        category: String,

        #[arg(long, default_value = "ks")]
        unit: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShopCommand {
    /// List catalogue products with flyer prices
    List {
        #[arg(long)]
        category: Option<String>,
    },
    /// Ask the deals workflow for the cheapest basket
    Deals {
        #[arg(long = "item", value_parser = parse_pick, required = true)]
        items: Vec<(String, f64)>,
    },
    /// Write a shopping list CSV
    Export {
        #[arg(long = "item", value_parser = parse_pick, required = true)]
        items: Vec<(String, f64)>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

/// `NAME=QTY`, with a comma or dot decimal separator.
pub fn parse_pick(raw: &str) -> Result<(String, f64), String> {
    let (name, qty) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=QTY, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing item name in '{}'", raw));
    }
    let qty: f64 = qty
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| format!("invalid quantity in '{}'", raw))?;
    Ok((name.to_string(), qty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pick() {
        assert_eq!(parse_pick("Mrkva=3").unwrap(), ("Mrkva".to_string(), 3.0));
        assert_eq!(
            parse_pick("Mleté mäso = 0,5").unwrap(),
            ("Mleté mäso".to_string(), 0.5)
        );
        assert!(parse_pick("Mrkva").is_err());
        assert!(parse_pick("=2").is_err());
        assert!(parse_pick("Mrkva=lots").is_err());
    }

    #[test]
    fn test_purchase_args() {
        let cli = Cli::try_parse_from([
            "issuecoin",
            "purchase",
            "--store",
            "Lidl",
            "--country",
            "sk",
            "--item",
            "Chlieb=1",
            "--item",
            "Mrkva=4",
            "--total",
            "3.5",
        ])
        .unwrap();

        match cli.command {
            Command::Purchase {
                store,
                country,
                date,
                items,
                total,
                ..
            } => {
                assert_eq!(store, "Lidl");
                assert_eq!(country, Country::Sk);
                assert!(date.is_none());
                assert_eq!(items.len(), 2);
                assert_eq!(total, 3.5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_stock_adjust_negative_and_globals() {
        let cli = Cli::try_parse_from([
            "issuecoin",
            "stock",
            "adjust",
            "Vajcia L",
            "-2",
            "--verbose",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Command::Stock(StockCommand::Adjust { item, qty, unit, .. }) => {
                assert_eq!(item, "Vajcia L");
                assert_eq!(qty, -2.0);
                assert_eq!(unit, "ks");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_purchase_requires_items() {
        assert!(Cli::try_parse_from(["issuecoin", "purchase"]).is_err());
    }
}
