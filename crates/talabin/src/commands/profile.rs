//! Profile editing and password change.

use secrecy::ExposeSecret;

use talabin_api::models::{PasswordChange, ProfileUpdate};

use crate::cli::{ProfileArgs, ProfileCommand};
use crate::commands::auth::{read_password, user_detail};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output;

pub async fn handle(ctx: &AppContext, args: ProfileArgs) -> Result<(), CliError> {
    match args.command {
        ProfileCommand::Update {
            first_name,
            last_name,
            email,
            date_of_birth,
        } => {
            let requested = ProfileUpdate {
                first_name: first_name.as_deref(),
                last_name: last_name.as_deref(),
                email: email.as_deref(),
                date_of_birth: date_of_birth.as_deref(),
            };
            if requested.is_empty() {
                return Err(CliError::Validation {
                    field: "profile".into(),
                    reason: "nothing to update; pass at least one field".into(),
                });
            }
            let _guard = ctx.require_session().await?;

            let user = ctx
                .fetch("profile update", move |c| {
                    let (first_name, last_name) = (first_name.clone(), last_name.clone());
                    let (email, date_of_birth) = (email.clone(), date_of_birth.clone());
                    async move {
                        let update = ProfileUpdate {
                            first_name: first_name.as_deref(),
                            last_name: last_name.as_deref(),
                            email: email.as_deref(),
                            date_of_birth: date_of_birth.as_deref(),
                        };
                        c.update_profile(&update).await
                    }
                })
                .await?;
            output::notice("Profile updated", ctx.quiet);
            let out = output::render_single(ctx.format, &user, user_detail)?;
            output::print_output(&out, ctx.quiet);
        }

        ProfileCommand::Password { current, new } => {
            let _guard = ctx.require_session().await?;
            let current = read_password(current, "Current password: ")?;
            let prompted = new.is_none();
            let new = read_password(new, "New password: ")?;
            if prompted {
                let confirm = rpassword::prompt_password("Confirm new password: ")?;
                if confirm != new.expose_secret() {
                    return Err(CliError::Validation {
                        field: "password".into(),
                        reason: "passwords do not match".into(),
                    });
                }
            }

            let envelope = ctx
                .track("password change", move |c| {
                    let (current, new) = (current.clone(), new.clone());
                    async move {
                        c.change_password(&PasswordChange {
                            old_password: current.expose_secret(),
                            new_password: new.expose_secret(),
                            new_password_confirm: new.expose_secret(),
                        })
                        .await
                    }
                })
                .await;
            let message = envelope.message().map(str::to_owned);
            ctx.data(envelope)?;
            output::notice(message.as_deref().unwrap_or("Password changed"), ctx.quiet);
        }
    }
    Ok(())
}
