//! Accounts command - create and list accounts

use anyhow::Result;
use clap::Subcommand;

use super::{get_context, get_logger, log_event};
use crate::output;
use caixa_core::services::LogEvent;
use caixa_core::{AccountType, OperationResult};

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List accounts with their default settlement status
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an account
    New {
        /// Account name
        #[arg(long)]
        name: String,
        /// Account type (conta_corrente, poupanca, cartao_credito,
        /// investimento, dinheiro, carteira_digital)
        #[arg(long = "type", default_value = "conta_corrente")]
        account_type: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: AccountsCommands) -> Result<()> {
    let logger = get_logger();

    match command {
        AccountsCommands::List { json } => {
            let ctx = get_context(logger)?;
            let accounts = ctx.account_service.list_accounts_with_status().await?;

            if json {
                return output::print_json(&OperationResult::ok(accounts));
            }
            if accounts.is_empty() {
                println!("No accounts yet. Create one with `caixa accounts new --name <NAME>`.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["ID", "Nome", "Tipo", "Status padrão"]);
            for account in accounts {
                table.add_row(vec![
                    account.id.to_string(),
                    account.name,
                    account.account_type.label().to_string(),
                    account.status_description.to_string(),
                ]);
            }
            println!("{table}");
        }
        AccountsCommands::New {
            name,
            account_type,
            json,
        } => {
            log_event(&logger, LogEvent::new("command_run").with_command("accounts new"));
            let ctx = get_context(logger)?;
            let account_type = AccountType::from(account_type.as_str());
            if !AccountType::KNOWN.contains(&account_type) {
                output::warning(&format!(
                    "Unknown account type '{account_type}'; imports will default to realizado"
                ));
            }

            let created = ctx.account_service.create_account(&name, account_type).await;
            if json {
                return output::print_json(&OperationResult::from(created));
            }

            let account = created?;
            output::success(&format!("Created account {} ({})", account.name, account.id));
        }
    }

    Ok(())
}
