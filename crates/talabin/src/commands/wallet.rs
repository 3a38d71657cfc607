//! Wallet command handlers.

use tabled::Tabled;

use talabin_api::FileUpload;
use talabin_api::models::{
    BankAccount, BankAccountUpdate, NewBankAccount, Wallet, WalletTransaction,
};

use crate::cli::{WalletArgs, WalletCommand};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "IRR")]
    amount_irr: String,
    #[tabled(rename = "Gold (g)")]
    amount_gold: String,
    #[tabled(rename = "Date")]
    created_at: String,
}

impl From<&WalletTransaction> for TransactionRow {
    fn from(t: &WalletTransaction) -> Self {
        Self {
            id: t.id,
            kind: t
                .transaction_type_display
                .clone()
                .unwrap_or_else(|| t.transaction_type.clone()),
            status: t.status_display.clone().unwrap_or_else(|| t.status.clone()),
            amount_irr: output::or_dash(t.amount_irr.as_deref()),
            amount_gold: output::or_dash(t.amount_gold.as_deref()),
            created_at: t.created_at.clone(),
        }
    }
}

#[derive(Tabled)]
struct BankAccountRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Bank")]
    bank: String,
    #[tabled(rename = "Sheba")]
    sheba: String,
    #[tabled(rename = "Holder")]
    holder: String,
    #[tabled(rename = "Verified")]
    verified: String,
    #[tabled(rename = "Default")]
    default: String,
}

impl From<&BankAccount> for BankAccountRow {
    fn from(a: &BankAccount) -> Self {
        Self {
            id: a.id,
            bank: a.bank_name.clone(),
            sheba: output::or_dash(a.sheba_number.as_deref()),
            holder: output::or_dash(a.account_holder_name.as_deref()),
            verified: if a.is_verified { "yes" } else { "no" }.into(),
            default: if a.is_default { "*" } else { "" }.into(),
        }
    }
}

fn bank_account_detail(a: &BankAccount) -> String {
    output::detail_lines(&[
        ("ID", a.id.to_string()),
        ("Bank", a.bank_name.clone()),
        ("Sheba", output::or_dash(a.sheba_number.as_deref())),
        ("Holder", output::or_dash(a.account_holder_name.as_deref())),
        ("Verified", if a.is_verified { "yes" } else { "no" }.into()),
        ("Default", if a.is_default { "yes" } else { "no" }.into()),
    ])
}

fn balance_detail(w: &Wallet) -> String {
    let mut lines = vec![
        ("Balance (IRR)", w.balance_irr.clone()),
        ("Gold (g)", w.gold_balance.clone()),
    ];
    if let Some(ref available) = w.available_balance_irr {
        lines.push(("Available (IRR)", available.clone()));
    }
    if let Some(ref frozen) = w.frozen_balance_irr {
        lines.push(("Frozen (IRR)", frozen.clone()));
    }
    if let Some(ref total) = w.total_value_irr {
        lines.push(("Total value (IRR)", total.clone()));
    }
    output::detail_lines(&lines)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &AppContext, args: WalletArgs) -> Result<(), CliError> {
    let _guard = ctx.require_session().await?;

    let out = match args.command {
        WalletCommand::Balance => {
            let wallet = ctx
                .fetch("wallet balance", |c| async move { c.wallet_balance().await })
                .await?;
            output::render_single(ctx.format, &wallet, balance_detail)?
        }

        WalletCommand::Transactions { kind, page } => {
            let list = ctx
                .fetch("wallet transactions", move |c| {
                    let kind = kind.clone();
                    async move { c.wallet_transactions(kind.as_deref(), page).await }
                })
                .await?;
            if let Some(total) = list.total() {
                output::notice(&format!("{total} transactions"), ctx.quiet);
            }
            output::render_list(ctx.format, list.items(), |t| TransactionRow::from(t))?
        }

        WalletCommand::Deposit { amount, method } => {
            let method = method.into();
            let receipt = ctx
                .fetch("deposit", move |c| {
                    let amount = amount.clone();
                    async move { c.deposit(&amount, method).await }
                })
                .await?;
            output::notice("Deposit requested", ctx.quiet);
            render_receipt(ctx, &receipt)?
        }

        WalletCommand::Withdraw {
            amount,
            bank_account,
        } => {
            let receipt = ctx
                .fetch("withdraw", move |c| {
                    let amount = amount.clone();
                    async move { c.withdraw(bank_account, &amount).await }
                })
                .await?;
            output::notice("Withdrawal requested", ctx.quiet);
            render_receipt(ctx, &receipt)?
        }

        WalletCommand::BankAccounts => {
            let accounts = ctx
                .fetch("bank accounts", |c| async move { c.bank_accounts().await })
                .await?;
            output::render_list(ctx.format, &accounts, |a| BankAccountRow::from(a))?
        }

        WalletCommand::AddBankAccount {
            bank,
            sheba,
            account_number,
            card_number,
            holder,
            default,
        } => {
            let account = ctx
                .fetch("add bank account", move |c| {
                    let (bank, sheba, holder) = (bank.clone(), sheba.clone(), holder.clone());
                    let account_number = account_number.clone();
                    let card_number = card_number.clone();
                    async move {
                        c.add_bank_account(&NewBankAccount {
                            bank_name: &bank,
                            sheba_number: &sheba,
                            account_number: account_number.as_deref(),
                            card_number: card_number.as_deref(),
                            account_holder_name: holder.as_deref(),
                            is_default: default,
                        })
                        .await
                    }
                })
                .await?;
            output::notice("Bank account added", ctx.quiet);
            output::render_single(ctx.format, &account, bank_account_detail)?
        }

        WalletCommand::UpdateBankAccount {
            id,
            bank,
            holder,
            default,
        } => {
            if bank.is_none() && holder.is_none() && default.is_none() {
                return Err(CliError::Validation {
                    field: "bank account".into(),
                    reason: "nothing to update; pass --bank, --holder or --default".into(),
                });
            }
            let account = ctx
                .fetch("update bank account", move |c| {
                    let (bank, holder) = (bank.clone(), holder.clone());
                    async move {
                        let update = BankAccountUpdate {
                            bank_name: bank.as_deref(),
                            account_holder_name: holder.as_deref(),
                            is_default: default,
                        };
                        c.update_bank_account(id, &update).await
                    }
                })
                .await?;
            output::render_single(ctx.format, &account, bank_account_detail)?
        }

        WalletCommand::RemoveBankAccount { id } => {
            ctx.fetch("remove bank account", move |c| async move {
                c.delete_bank_account(id).await
            })
            .await?;
            output::notice(&format!("Bank account {id} removed"), ctx.quiet);
            return Ok(());
        }

        WalletCommand::UploadReceipt { deposit, file } => {
            let receipt = FileUpload::from_path(&file)?;
            let result = ctx
                .fetch("upload receipt", move |c| {
                    let receipt = receipt.clone();
                    async move { c.upload_deposit_receipt(deposit, receipt).await }
                })
                .await?;
            output::notice("Receipt uploaded", ctx.quiet);
            render_receipt(ctx, &result)?
        }
    };

    output::print_output(&out, ctx.quiet);
    Ok(())
}

fn render_receipt(ctx: &AppContext, receipt: &serde_json::Value) -> Result<String, CliError> {
    output::render_single(ctx.format, receipt, |r| {
        serde_json::to_string_pretty(r).unwrap_or_default()
    })
}
