//! Import command - import a bank statement CSV

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use uuid::Uuid;

use super::{get_context, get_logger, log_event};
use crate::output;
use caixa_core::services::LogEvent;
use caixa_core::{ImportOptions, ImportReport, OperationResult};

pub struct ImportArgs {
    pub file: PathBuf,
    pub account_id: String,
    pub template: Option<String>,
    pub preview: bool,
    pub classify: bool,
    pub json: bool,
}

pub async fn run(args: ImportArgs) -> Result<()> {
    let account_id = Uuid::parse_str(&args.account_id)
        .with_context(|| format!("Invalid account ID: {}", args.account_id))?;

    if !args.file.exists() {
        anyhow::bail!("File not found: {}", args.file.display());
    }

    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_run").with_command("import"));
    let mut ctx = get_context(logger)?;

    let template_id = match args.template {
        Some(id) => id,
        None => ctx.config.template_for(account_id).to_string(),
    };
    let options = ImportOptions {
        preview: args.preview,
        classify: args.classify && ctx.config.auto_classify,
    };

    let outcome = ctx
        .import_service
        .import_file(&args.file, &template_id, account_id, options)
        .await;

    // The next import into this account defaults to the same bank
    if let Ok(report) = &outcome {
        if !report.preview {
            ctx.config.remember_template(account_id, &report.template_id);
            if let Err(e) = ctx.config.save(&ctx.data_dir) {
                tracing::warn!(error = %e, "could not remember template for account");
            }
        }
    }

    if args.json {
        let result: OperationResult<ImportReport> = outcome.into();
        return output::print_json(&result.with_context("template", template_id.into()));
    }

    let report = outcome?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &ImportReport) {
    if report.used_fallback {
        output::warning(&format!(
            "Layout did not match template '{}'; parsed with generic settings",
            report.template_id
        ));
    }

    if let Some(candidates) = &report.candidates {
        println!("{}", "PREVIEW MODE - No changes applied".yellow().bold());
        println!();

        if candidates.is_empty() {
            println!("Nothing new to import.");
        } else {
            let mut table = output::create_table();
            table.set_header(vec!["Data", "Descrição", "Valor", "Status", "Classificado"]);
            for tx in candidates {
                table.add_row(vec![
                    tx.date.format("%d/%m/%Y").to_string(),
                    output::truncate(&tx.description, 40),
                    output::format_money(tx.amount, tx.kind),
                    tx.status.map(|s| s.as_str()).unwrap_or("-").to_string(),
                    if tx.classification.is_some() { "sim" } else { "" }.to_string(),
                ]);
            }
            println!("{table}");
        }
        println!();
        println!(
            "{} new, {} already imported",
            report.result.total, report.result.duplicated
        );
    } else {
        output::success(&format!(
            "Imported {} of {} transactions ({} duplicates skipped)",
            report.result.imported,
            report.result.total + report.result.duplicated,
            report.result.duplicated
        ));
        for err in &report.result.errors {
            output::error(&format!("  {err}"));
        }
    }

    if !report.skipped_rows.is_empty() {
        println!();
        output::warning(&format!("{} rows could not be read:", report.skipped_rows.len()));
        for row in report.skipped_rows.iter().take(10) {
            println!("  line {}: {}", row.line, row.reason);
        }
    }
}
