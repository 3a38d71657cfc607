//! Trading command handlers.

use tabled::Tabled;

use talabin_api::models::{Order, OrderPreview, OrderSide};

use crate::cli::{TradeArgs, TradeCommand};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Gold (g)")]
    gold: String,
    #[tabled(rename = "Price/g")]
    price: String,
    #[tabled(rename = "IRR")]
    amount: String,
    #[tabled(rename = "Date")]
    created_at: String,
}

fn side_label(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "buy",
        OrderSide::Sell => "sell",
    }
}

impl From<&Order> for OrderRow {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id,
            side: side_label(o.order_type).into(),
            status: o.status_display.clone().unwrap_or_else(|| o.status.clone()),
            gold: o.gold_amount.clone(),
            price: o.gold_price_per_gram.clone(),
            amount: o.amount_irr.clone(),
            created_at: o.created_at.clone(),
        }
    }
}

fn order_detail(o: &Order) -> String {
    output::detail_lines(&[
        ("Order", o.order_number.clone().unwrap_or_else(|| o.id.to_string())),
        ("Side", side_label(o.order_type).into()),
        ("Status", o.status_display.clone().unwrap_or_else(|| o.status.clone())),
        ("Gold (g)", o.gold_amount.clone()),
        ("Price/g", o.gold_price_per_gram.clone()),
        ("Amount (IRR)", o.amount_irr.clone()),
        ("Fee", output::or_dash(o.fee.as_deref())),
        ("Total", output::or_dash(o.total_amount.as_deref())),
    ])
}

fn preview_detail(p: &OrderPreview) -> String {
    output::detail_lines(&[
        ("Side", side_label(p.order_type).into()),
        ("Amount (IRR)", p.amount_irr.clone()),
        ("Price/g", p.gold_price_per_gram.clone()),
        ("Gold (g)", p.gold_amount.clone()),
        ("Fee", p.fee.clone()),
        ("Total", p.total_amount.clone()),
    ])
}

pub async fn handle(ctx: &AppContext, args: TradeArgs) -> Result<(), CliError> {
    let _guard = ctx.require_session().await?;

    let out = match args.command {
        TradeCommand::Buy { amount } => {
            let order = ctx
                .fetch("buy gold", move |c| {
                    let amount = amount.clone();
                    async move { c.buy_gold(&amount).await }
                })
                .await?;
            output::render_single(ctx.format, &order, order_detail)?
        }
        TradeCommand::Sell { amount } => {
            let order = ctx
                .fetch("sell gold", move |c| {
                    let amount = amount.clone();
                    async move { c.sell_gold(&amount).await }
                })
                .await?;
            output::render_single(ctx.format, &order, order_detail)?
        }
        TradeCommand::Preview { side, amount } => {
            let side = side.into();
            let preview = ctx
                .fetch("order preview", move |c| {
                    let amount = amount.clone();
                    async move { c.preview_order(side, &amount).await }
                })
                .await?;
            output::render_single(ctx.format, &preview, preview_detail)?
        }
        TradeCommand::Orders => {
            let orders = ctx
                .fetch("orders", |c| async move { c.orders().await })
                .await?;
            output::render_list(ctx.format, &orders, |o| OrderRow::from(o))?
        }
    };

    output::print_output(&out, ctx.quiet);
    Ok(())
}
