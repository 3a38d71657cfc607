//! Command dispatch: bridges CLI args -> client operations -> output.

pub mod auth;
pub mod config_cmd;
pub mod kyc;
pub mod price;
pub mod profile;
pub mod trade;
pub mod wallet;

use crate::cli::{Command, GlobalOpts};
use crate::context::{AppContext, route};
use crate::error::CliError;

/// Route a command to its handler. `config` needs no session file.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Login(args) => auth::login(&AppContext::build(global, route::LOGIN)?, args).await,
        Command::Logout => auth::logout(&AppContext::build(global, route::LOGIN)?).await,
        Command::Register(args) => {
            auth::register(&AppContext::build(global, route::LOGIN)?, args).await
        }
        Command::Otp(args) => auth::otp(&AppContext::build(global, route::LOGIN)?, args).await,
        Command::Whoami => auth::whoami(&AppContext::build(global, route::PROFILE)?).await,
        Command::Profile(args) => {
            profile::handle(&AppContext::build(global, route::PROFILE)?, args).await
        }
        Command::Wallet(args) => wallet::handle(&AppContext::build(global, route::WALLET)?, args).await,
        Command::Trade(args) => trade::handle(&AppContext::build(global, route::TRADE)?, args).await,
        Command::Price(args) => price::handle(&AppContext::build(global, route::PRICES)?, args).await,
        Command::Kyc(args) => kyc::handle(&AppContext::build(global, route::KYC)?, args).await,
    }
}
