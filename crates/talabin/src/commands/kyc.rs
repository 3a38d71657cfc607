//! KYC command handlers.

use talabin_api::FileUpload;
use talabin_api::models::{KycStatus, KycSubmission};

use crate::cli::{KycArgs, KycCommand, KycFileArg};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output;

fn status_detail(s: &KycStatus) -> String {
    output::detail_lines(&[
        ("Status", format!("{:?}", s.status).to_lowercase()),
        ("Reason", output::or_dash(s.rejection_reason.as_deref())),
    ])
}

pub async fn handle(ctx: &AppContext, args: KycArgs) -> Result<(), CliError> {
    let _guard = ctx.require_session().await?;

    match args.command {
        KycCommand::Status => {
            let status = ctx
                .fetch("kyc status", |c| async move { c.kyc_status().await })
                .await?;
            let out = output::render_single(ctx.format, &status, status_detail)?;
            output::print_output(&out, ctx.quiet);
        }
        KycCommand::Submit {
            national_id,
            first_name,
            last_name,
            date_of_birth,
        } => {
            let envelope = ctx
                .track("kyc submit", move |c| {
                    let (national_id, first_name) = (national_id.clone(), first_name.clone());
                    let (last_name, date_of_birth) = (last_name.clone(), date_of_birth.clone());
                    async move {
                        let submission = KycSubmission {
                            national_id: national_id.as_str(),
                            first_name: &first_name,
                            last_name: &last_name,
                            date_of_birth: date_of_birth.as_deref(),
                        };
                        c.submit_kyc(&submission).await
                    }
                })
                .await;
            let message = envelope.message().map(str::to_owned);
            ctx.data(envelope)?;
            output::notice(
                message.as_deref().unwrap_or("Documents submitted for review"),
                ctx.quiet,
            );
        }
        KycCommand::Upload { kind, file } => {
            let upload = FileUpload::from_path(&file)?;
            let result = ctx
                .fetch("kyc upload", move |c| {
                    let upload = upload.clone();
                    async move {
                        match kind {
                            KycFileArg::Document => c.upload_kyc_document(upload).await,
                            KycFileArg::Selfie => c.upload_selfie(upload).await,
                        }
                    }
                })
                .await?;
            output::notice("File uploaded for review", ctx.quiet);
            let out = output::render_single(ctx.format, &result, |r| {
                serde_json::to_string_pretty(r).unwrap_or_default()
            })?;
            output::print_output(&out, ctx.quiet);
        }
    }
    Ok(())
}
