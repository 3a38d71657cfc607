//! Price command handlers.

use tabled::Tabled;

use talabin_api::models::{GoldPrice, PricePoint};

use crate::cli::{PriceArgs, PriceCommand};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Price/g (IRR)")]
    price: String,
}

impl From<&PricePoint> for PointRow {
    fn from(p: &PricePoint) -> Self {
        Self {
            timestamp: p.timestamp.clone(),
            price: p.price.clone(),
        }
    }
}

fn price_detail(p: &GoldPrice) -> String {
    output::detail_lines(&[
        ("Buy/g (IRR)", p.buy_price.clone()),
        ("Sell/g (IRR)", p.sell_price.clone()),
        ("Spread", output::or_dash(p.spread.as_deref())),
        ("Source", output::or_dash(p.source.as_deref())),
        ("Updated", output::or_dash(p.created_at.as_deref())),
    ])
}

pub async fn handle(ctx: &AppContext, args: PriceArgs) -> Result<(), CliError> {
    let _guard = ctx.require_session().await?;

    let out = match args.command {
        PriceCommand::Current => {
            let price = ctx
                .fetch("current price", |c| async move { c.current_price().await })
                .await?;
            output::render_single(ctx.format, &price, price_detail)?
        }
        PriceCommand::History { timeframe } => {
            let points = ctx
                .fetch("price history", move |c| async move {
                    c.price_history(timeframe).await
                })
                .await?;
            output::render_list(ctx.format, &points, |p| PointRow::from(p))?
        }
    };

    output::print_output(&out, ctx.quiet);
    Ok(())
}
