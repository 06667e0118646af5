use chrono::{Local, NaiveDate};
use clap::Parser;
use issuecoin::adapters::n8n::{guess_mime, Hook, Upload};
use issuecoin::app::ManualPurchase;
use issuecoin::config::cli::{Cli, Command, InboxCommand, ShopCommand, StockCommand};
use issuecoin::core::export::{
    archive_tables, ledger_csv, month_export_filename, purchase_log_csv, shopping_list_csv,
    shopping_list_filename,
};
use issuecoin::core::flyers::format_hit;
use issuecoin::domain::model::DEFAULT_CATEGORY;
use issuecoin::utils::error::{ErrorSeverity, TrackerError};
use issuecoin::utils::{logger, validation::Validate};
use issuecoin::{AppConfig, LocalStorage, Tracker};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    logger::init_logger(cli.log_format, cli.verbose);
    if let Err(e) = dotenv {
        if !e.not_found() {
            tracing::warn!("⚠️ .env not fully loaded, later entries are ignored: {}", e);
        }
    }
    tracing::debug!("🚀 Starting issuecoin");

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let storage = LocalStorage::new(&config.storage.data_dir);
    let tracker = Tracker::new(storage, &config);

    if let Err(e) = run(cli.command, &tracker, &config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(
    command: Command,
    tracker: &Tracker<LocalStorage>,
    config: &AppConfig,
) -> issuecoin::Result<()> {
    tracker.init().await?;
    let today = Local::now().date_naive();

    match command {
        Command::Inbox(InboxCommand::Add { file, note }) => {
            let (filename, bytes) = read_upload(&file).await?;
            let mime = guess_mime(&filename);
            let text = if mime == "text/plain" {
                String::from_utf8_lossy(&bytes).into_owned()
            } else {
                tracing::warn!(
                    "{} is not a text receipt; filed with defaults, use `ocr` for photos and PDFs",
                    filename
                );
                String::new()
            };
            let outcome = tracker
                .process_receipt_text(&filename, mime, &text, &note, today)
                .await?;
            println!("✅ Saved to inbox");
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Inbox(InboxCommand::List) => {
            let rows = tracker.book().inbox().await?;
            if rows.is_empty() {
                println!("📭 Inbox is empty");
            }
            for row in rows.iter().rev() {
                println!(
                    "{}  {:<10} {:>10.2} {}  {}  {}",
                    row.date, row.store, row.total, row.currency, row.filename, row.note
                );
            }
        }
        Command::Voice { file, note } => {
            let (filename, bytes) = read_upload(&file).await?;
            let outcome = tracker
                .process_voice_note(Upload::new(filename, bytes), &note, today)
                .await?;
            println!("✅ Voice note saved to inbox");
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Ocr {
            file,
            store_hint,
            commit,
        } => {
            let (filename, bytes) = read_upload(&file).await?;
            let outcome = tracker
                .ocr_receipt(Upload::new(filename, bytes), &store_hint)
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome.raw)?);
            if commit {
                let written = tracker.commit_ocr(&outcome.result, &store_hint, today).await?;
                println!("✅ {} items written to the purchase log and stock", written);
            }
        }
        Command::Purchase {
            store,
            country,
            date,
            category,
            items,
            total,
        } => {
            let items = tracker.resolve_picks(&items).await?;
            let category = category
                .or_else(|| items.first().map(|i| i.category.clone()))
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
            let outcome = tracker
                .record_manual_purchase(ManualPurchase {
                    store,
                    country,
                    date: date.unwrap_or(today),
                    category,
                    items,
                    total_src: total,
                })
                .await?;
            println!("{}", outcome.message);
        }
        Command::Ledger { export } => {
            let rows = tracker.book().ledger().await?;
            match export {
                Some(path) => {
                    tokio::fs::write(&path, ledger_csv(&rows)?).await?;
                    println!("📁 Ledger written to {}", path.display());
                }
                None => {
                    for row in &rows {
                        println!(
                            "{}  {:<10} {:<12} {:>10.2} {}  ~{:.2} CZK",
                            row.date,
                            row.store,
                            row.category,
                            row.total_src,
                            row.currency,
                            row.amount_czk
                        );
                    }
                    println!("{} records", rows.len());
                }
            }
        }
        Command::Stock(StockCommand::Show) => {
            let rows = tracker.book().stock().await?;
            if rows.is_empty() {
                println!("📦 No stock recorded yet");
            }
            for row in &rows {
                println!(
                    "{:<20} {:<12} {:>8.2} {:<4} {}",
                    row.item, row.category, row.qty, row.unit, row.last_update
                );
            }
        }
        Command::Stock(StockCommand::Adjust {
            item,
            qty,
            category,
            unit,
        }) => {
            let row = tracker.adjust_stock(&item, &category, qty, &unit).await?;
            println!("✅ {}: {:.2} {}", row.item, row.qty, row.unit);
        }
        Command::Shop(ShopCommand::List { category }) => {
            let catalog = tracker.catalog().await?;
            let categories = match category {
                Some(c) => vec![c],
                None => catalog.categories(),
            };
            for category in categories {
                println!("🛒 {}", category);
                for product in catalog.in_category(&category) {
                    let hit = tracker.flyer_for(&product.item, today);
                    println!(
                        "   {:<20} {:<4} {}",
                        product.item,
                        product.unit,
                        format_hit(hit.as_ref())
                    );
                }
            }
        }
        Command::Shop(ShopCommand::Deals { items }) => {
            let items = tracker.resolve_picks(&items).await?;
            let reply = tracker.find_deals(&items).await?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Command::Shop(ShopCommand::Export { items, out }) => {
            let items = tracker.resolve_picks(&items).await?;
            if items.is_empty() {
                return Err(TrackerError::validation("nothing to export"));
            }
            let path = out.join(shopping_list_filename(today));
            tokio::fs::write(&path, shopping_list_csv(&items)?).await?;
            println!("📁 Shopping list written to {}", path.display());
        }
        Command::Report {
            month,
            budget,
            export,
        } => {
            let budget = config.budget.with_overrides(budget, None)?;
            match tracker
                .month_report(month.as_deref(), budget.monthly_czk as f64)
                .await?
            {
                None => println!("📭 No purchases in the log yet"),
                Some(report) => {
                    println!("📊 {}", report.month);
                    println!(
                        "   Spent {:.2} of {:.2} CZK ({:.0}%)",
                        report.total_czk,
                        report.budget_czk,
                        report.progress * 100.0
                    );
                    if report.over_budget() {
                        println!("   ⚠️ Over budget");
                    }
                    for total in &report.by_category {
                        println!("   {:<16} {:>10.2}", total.category, total.amount);
                    }
                    if let Some(dir) = export {
                        let path = dir.join(month_export_filename(&report.month));
                        tokio::fs::write(&path, purchase_log_csv(&report.rows)?).await?;
                        println!("📁 Month written to {}", path.display());
                    }
                }
            }
        }
        Command::Plan { budget, daily } => {
            let budget = config.budget.with_overrides(budget, daily)?;
            let reply = tracker
                .request_plan(budget.monthly_czk, budget.daily_target_czk, today)
                .await?;
            match reply {
                serde_json::Value::String(text) => println!("{}", text),
                other => println!("{}", serde_json::to_string_pretty(&other)?),
            }
        }
        Command::Archive { out } => {
            let bytes = archive_tables(tracker.book().storage()).await?;
            tokio::fs::write(&out, bytes).await?;
            println!("📦 Archive written to {}", out.display());
        }
        Command::Status => print_status(tracker, config, today),
    }

    Ok(())
}

fn print_status(tracker: &Tracker<LocalStorage>, config: &AppConfig, today: NaiveDate) {
    let flag = |on: bool| if on { "✅" } else { "➖" };
    let n8n = tracker.n8n();

    println!("📋 IssueCoin status ({})", today);
    println!("   Data dir:        {}", config.storage.data_dir);
    println!("   Address:         {}", tracker.location().address);
    println!(
        "   Stores:          {}",
        tracker.location().preferred_stores.join(", ")
    );
    println!(
        "   Budget:          {} CZK / month, {} CZK / day",
        config.budget.monthly_czk, config.budget.daily_target_czk
    );
    println!("   Rates:           {:?}", config.rates.source);
    for hook in [Hook::Notify, Hook::Ocr, Hook::Deals, Hook::Mcp, Hook::Stt] {
        println!(
            "   n8n {:<12} {}",
            format!("{}:", hook.name()),
            flag(n8n.is_configured(hook))
        );
    }
    println!(
        "   Google Sheets:   {}",
        flag(config.google.sheets_enabled)
    );
    println!(
        "   Google Drive:    {}",
        flag(config.google.drive_folder_id.is_some())
    );
}

async fn read_upload(path: &Path) -> issuecoin::Result<(String, Vec<u8>)> {
    let bytes = tokio::fs::read(path).await?;
    Ok((file_name(path), bytes))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
