// Price endpoints

use talabin_api::endpoints::prices as ep;
use talabin_api::models::{GoldPrice, PricePoint, Timeframe};
use talabin_api::{ApiRequest, ResponseEnvelope};

use super::TalabinClient;

impl TalabinClient {
    /// `GET /prices/current/`
    pub async fn current_price(&self) -> ResponseEnvelope<GoldPrice> {
        self.auth_client()
            .execute(&ApiRequest::get(ep::CURRENT))
            .await
    }

    /// `GET /prices/history/?timeframe=`
    pub async fn price_history(&self, timeframe: Timeframe) -> ResponseEnvelope<Vec<PricePoint>> {
        let request = ApiRequest::get(ep::HISTORY).query("timeframe", timeframe.as_query());
        self.auth_client().execute(&request).await
    }
}
