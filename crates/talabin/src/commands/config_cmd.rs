//! `config` handlers. These never open the session file.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = talabin_config::load_config()?;
    let out = match args.command {
        ConfigCommand::Show => talabin_config::to_toml(&config)?,
        ConfigCommand::Path => output::detail_lines(&[
            ("Config", talabin_config::config_path().display().to_string()),
            (
                "Session",
                talabin_config::session_path(&config).display().to_string(),
            ),
        ]),
    };
    output::print_output(out.trim_end(), global.quiet);
    Ok(())
}
