// Trading endpoints

use talabin_api::endpoints::trading as ep;
use talabin_api::models::{Order, OrderPreview, OrderRequest, OrderSide};
use talabin_api::{ApiRequest, ResponseEnvelope};

use super::TalabinClient;

impl TalabinClient {
    /// `POST /trading/buy/` or `POST /trading/sell/` for `amount_irr` rials.
    pub async fn place_order(&self, side: OrderSide, amount_irr: &str) -> ResponseEnvelope<Order> {
        let path = match side {
            OrderSide::Buy => ep::BUY,
            OrderSide::Sell => ep::SELL,
        };
        let request = ApiRequest::post(path).json(&OrderRequest {
            order_type: side,
            amount_irr,
        });
        self.auth_client().execute(&request).await
    }

    pub async fn buy_gold(&self, amount_irr: &str) -> ResponseEnvelope<Order> {
        self.place_order(OrderSide::Buy, amount_irr).await
    }

    pub async fn sell_gold(&self, amount_irr: &str) -> ResponseEnvelope<Order> {
        self.place_order(OrderSide::Sell, amount_irr).await
    }

    /// `POST /trading/preview/`: price, fee and gold amount without placing
    /// the order.
    pub async fn preview_order(
        &self,
        side: OrderSide,
        amount_irr: &str,
    ) -> ResponseEnvelope<OrderPreview> {
        let request = ApiRequest::post(ep::PREVIEW).json(&OrderRequest {
            order_type: side,
            amount_irr,
        });
        self.auth_client().execute(&request).await
    }

    /// `GET /trading/orders/`
    pub async fn orders(&self) -> ResponseEnvelope<Vec<Order>> {
        self.auth_client().execute(&ApiRequest::get(ep::ORDERS)).await
    }
}
