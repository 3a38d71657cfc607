//! Sign-in, sign-out, registration and OTP handlers.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use talabin_api::PhoneNumber;
use talabin_api::models::{OtpIssued, RegisterRequest, User};

use crate::cli::{LoginArgs, OtpArgs, OtpCommand, RegisterArgs};
use crate::context::{AppContext, route_hint};
use crate::error::CliError;
use crate::output;

pub(crate) fn user_detail(user: &User) -> String {
    output::detail_lines(&[
        ("ID", user.id.to_string()),
        ("Name", user.display_name().to_owned()),
        ("Phone", display_phone(&user.phone_number)),
        ("Email", output::or_dash(user.email.as_deref())),
        ("Verified", user.is_verified.to_string()),
        ("KYC", format!("{:?}", user.verification_status).to_lowercase()),
    ])
}

fn display_phone(raw: &str) -> String {
    raw.parse::<PhoneNumber>()
        .map_or_else(|_| raw.to_owned(), |p| p.formatted())
}

pub(crate) fn read_password(given: Option<String>, prompt: &str) -> Result<SecretString, CliError> {
    match given {
        Some(password) => Ok(SecretString::from(password)),
        None => Ok(SecretString::from(rpassword::prompt_password(prompt)?)),
    }
}

// ── Login / logout ───────────────────────────────────────────────────

pub async fn login(ctx: &AppContext, args: LoginArgs) -> Result<(), CliError> {
    let password = read_password(args.password, "Password: ")?;
    let envelope = ctx
        .client
        .login(args.phone.as_str(), password.expose_secret())
        .await;
    let message = envelope.message().map(str::to_owned);
    let user = ctx.data(envelope)?;

    output::notice(
        &message.unwrap_or_else(|| format!("Signed in as {}", user.display_name())),
        ctx.quiet,
    );
    let destination = ctx.guard.post_login_destination();
    if let Some(hint) = route_hint(&destination) {
        output::notice(&format!("Continue with: {hint}"), ctx.quiet);
    }
    Ok(())
}

pub async fn logout(ctx: &AppContext) -> Result<(), CliError> {
    if ctx.store().credential().is_none() {
        output::notice("Not signed in", ctx.quiet);
        return Ok(());
    }
    ctx.client.logout().await?;
    output::notice("Signed out", ctx.quiet);
    Ok(())
}

pub async fn whoami(ctx: &AppContext) -> Result<(), CliError> {
    let _guard = ctx.require_session().await?;
    let user = ctx.fetch("whoami", |c| async move { c.me().await }).await?;
    let out = output::render_single(ctx.format, &user, user_detail)?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

// ── Registration / OTP ───────────────────────────────────────────────

#[derive(Serialize)]
struct OtpReceipt<'a> {
    phone_number: &'a str,
    otp_code: Option<&'a str>,
}

/// Development backends echo the code back; show it when they do.
fn print_receipt(
    ctx: &AppContext,
    phone: &PhoneNumber,
    issued: &OtpIssued,
) -> Result<(), CliError> {
    let receipt = OtpReceipt {
        phone_number: issued.phone_number.as_deref().unwrap_or(phone.as_str()),
        otp_code: issued.otp_code.as_deref(),
    };
    let out = output::render_single(ctx.format, &receipt, |r| {
        output::detail_lines(&[
            ("Phone", r.phone_number.to_owned()),
            ("Code", output::or_dash(r.otp_code)),
        ])
    })?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

pub async fn register(ctx: &AppContext, args: RegisterArgs) -> Result<(), CliError> {
    let password = read_password(args.password.clone(), "Password: ")?;
    if args.password.is_none() {
        let confirm = rpassword::prompt_password("Confirm password: ")?;
        if confirm != password.expose_secret() {
            return Err(CliError::Validation {
                field: "password".into(),
                reason: "passwords do not match".into(),
            });
        }
    }

    let request = RegisterRequest {
        phone_number: args.phone.as_str(),
        password: password.expose_secret(),
        password_confirm: password.expose_secret(),
        first_name: args.first_name.as_deref(),
        last_name: args.last_name.as_deref(),
    };
    let issued = ctx.data(ctx.client.register(&request).await)?;
    let hint = format!(
        "Account created. Verify with: talabin otp verify --phone {} --purpose registration --code <CODE>",
        args.phone
    );
    output::notice(&hint, ctx.quiet);
    print_receipt(ctx, &args.phone, &issued)
}

pub async fn otp(ctx: &AppContext, args: OtpArgs) -> Result<(), CliError> {
    match args.command {
        OtpCommand::Send { phone, purpose } => {
            let issued = ctx.data(ctx.client.send_otp(phone.as_str(), purpose.into()).await)?;
            output::notice("Code sent", ctx.quiet);
            print_receipt(ctx, &phone, &issued)
        }
        OtpCommand::Verify {
            phone,
            purpose,
            code,
        } => {
            let envelope = ctx.client.verify_otp(phone.as_str(), purpose.into(), &code).await;
            let message = envelope.message().map(str::to_owned);
            ctx.data(envelope)?;
            output::notice(message.as_deref().unwrap_or("Code verified"), ctx.quiet);
            Ok(())
        }
    }
}
