//! Clap derive structures for the `talabin` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use talabin_api::models::{OrderSide, OtpPurpose, PaymentMethod, Timeframe};
use talabin_api::{NationalId, PhoneNumber};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// talabin -- buy, sell and hold gold from the command line
#[derive(Debug, Parser)]
#[command(
    name = "talabin",
    version,
    about = "Talabin gold trading from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend API root (overrides config)
    #[arg(long, short = 'u', global = true)]
    pub base_url: Option<String>,

    /// Output format (overrides config)
    #[arg(long, short = 'o', global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in milliseconds (overrides config)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with phone number and password
    Login(LoginArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Edit profile details or change the password
    Profile(ProfileArgs),

    /// Create an account
    Register(RegisterArgs),

    /// Request or confirm one-time codes
    Otp(OtpArgs),

    /// Balances, transactions, deposits and withdrawals
    #[command(alias = "w")]
    Wallet(WalletArgs),

    /// Buy and sell gold
    #[command(alias = "t")]
    Trade(TradeArgs),

    /// Gold prices
    #[command(alias = "p")]
    Price(PriceArgs),

    /// Identity verification
    Kyc(KycArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Phone number, e.g. 09123456789
    #[arg(long)]
    pub phone: PhoneNumber,

    /// Password (prompted when omitted)
    #[arg(long, env = "TALABIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub phone: PhoneNumber,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    /// Password (prompted twice when omitted)
    #[arg(long, env = "TALABIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct OtpArgs {
    #[command(subcommand)]
    pub command: OtpCommand,
}

#[derive(Debug, Subcommand)]
pub enum OtpCommand {
    /// Send a code to a phone number
    Send {
        #[arg(long)]
        phone: PhoneNumber,

        #[arg(long, value_enum, default_value = "login")]
        purpose: OtpPurposeArg,
    },

    /// Confirm a received code
    Verify {
        #[arg(long)]
        phone: PhoneNumber,

        #[arg(long, value_enum, default_value = "login")]
        purpose: OtpPurposeArg,

        #[arg(long)]
        code: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OtpPurposeArg {
    Registration,
    Login,
    PasswordReset,
}

impl From<OtpPurposeArg> for OtpPurpose {
    fn from(arg: OtpPurposeArg) -> Self {
        match arg {
            OtpPurposeArg::Registration => Self::Registration,
            OtpPurposeArg::Login => Self::Login,
            OtpPurposeArg::PasswordReset => Self::PasswordReset,
        }
    }
}

// ── Profile ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Update name, email or date of birth
    Update {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// YYYY-MM-DD
        #[arg(long)]
        date_of_birth: Option<String>,
    },

    /// Change the account password
    Password {
        /// Current password (prompted when omitted)
        #[arg(long, env = "TALABIN_PASSWORD", hide_env_values = true)]
        current: Option<String>,

        /// New password (prompted twice when omitted)
        #[arg(long, env = "TALABIN_NEW_PASSWORD", hide_env_values = true)]
        new: Option<String>,
    },
}

// ── Wallet ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WalletArgs {
    #[command(subcommand)]
    pub command: WalletCommand,
}

#[derive(Debug, Subcommand)]
pub enum WalletCommand {
    /// Show rial and gold balances
    Balance,

    /// List wallet transactions
    Transactions {
        /// Filter by transaction type (deposit, withdraw, buy, sell)
        #[arg(long = "type")]
        kind: Option<String>,

        #[arg(long)]
        page: Option<u32>,
    },

    /// Deposit rials
    Deposit {
        /// Amount in IRR
        amount: String,

        #[arg(long, value_enum, default_value = "online")]
        method: PaymentMethodArg,
    },

    /// Withdraw rials to a bank account
    Withdraw {
        /// Amount in IRR
        amount: String,

        #[arg(long)]
        bank_account: u64,
    },

    /// List registered bank accounts
    BankAccounts,

    /// Register a bank account
    AddBankAccount {
        #[arg(long)]
        bank: String,

        /// IBAN-style Sheba number (IR + 24 digits)
        #[arg(long)]
        sheba: String,

        #[arg(long)]
        account_number: Option<String>,

        #[arg(long)]
        card_number: Option<String>,

        #[arg(long)]
        holder: Option<String>,

        /// Make this the default payout account
        #[arg(long)]
        default: bool,
    },

    /// Change a bank account's details
    UpdateBankAccount {
        id: u64,

        #[arg(long)]
        bank: Option<String>,

        #[arg(long)]
        holder: Option<String>,

        #[arg(long)]
        default: Option<bool>,
    },

    /// Delete a bank account
    RemoveBankAccount { id: u64 },

    /// Attach a transfer receipt image to a deposit
    UploadReceipt {
        #[arg(long)]
        deposit: u64,

        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PaymentMethodArg {
    Online,
    BankTransfer,
}

impl From<PaymentMethodArg> for PaymentMethod {
    fn from(arg: PaymentMethodArg) -> Self {
        match arg {
            PaymentMethodArg::Online => Self::Online,
            PaymentMethodArg::BankTransfer => Self::BankTransfer,
        }
    }
}

// ── Trading ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TradeArgs {
    #[command(subcommand)]
    pub command: TradeCommand,
}

#[derive(Debug, Subcommand)]
pub enum TradeCommand {
    /// Buy gold for an IRR amount
    Buy { amount: String },

    /// Sell gold worth an IRR amount
    Sell { amount: String },

    /// Quote an order without placing it
    Preview {
        #[arg(value_enum)]
        side: SideArg,
        amount: String,
    },

    /// List past orders
    Orders,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for OrderSide {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::Buy => Self::Buy,
            SideArg::Sell => Self::Sell,
        }
    }
}

// ── Prices ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PriceArgs {
    #[command(subcommand)]
    pub command: PriceCommand,
}

#[derive(Debug, Subcommand)]
pub enum PriceCommand {
    /// Current buy and sell price per gram
    Current,

    /// Price history
    History {
        /// 1h, 24h, 7d or 30d
        #[arg(long, default_value = "24h")]
        timeframe: Timeframe,
    },
}

// ── KYC ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct KycArgs {
    #[command(subcommand)]
    pub command: KycCommand,
}

#[derive(Debug, Subcommand)]
pub enum KycCommand {
    /// Show verification status
    Status,

    /// Submit identity details for verification
    Submit {
        #[arg(long)]
        national_id: NationalId,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// YYYY-MM-DD
        #[arg(long)]
        date_of_birth: Option<String>,
    },

    /// Upload an identity document or a selfie
    Upload {
        #[arg(long, value_enum)]
        kind: KycFileArg,

        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KycFileArg {
    Document,
    Selfie,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print config and session file locations
    Path,
}
