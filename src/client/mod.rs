use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;

use crate::http::{
    Client, DividendYieldResponse, ErrorResponse, IndexResponse, InstrumentsResponse,
    PeRatioResponse, RecordTradeRequest, RecordTradeResponse, TradesResponse,
    VolumeWeightedPriceResponse,
};

#[derive(Debug)]
pub struct HttpClient {
    pub path: String,
    pub client: reqwest::Client,
}

impl HttpClient {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            client: reqwest::Client::new(),
        }
    }

    //Failures come back as `{"error": ...}` with a non-success status, surface the server's
    //reason rather than a decode error.
    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json::<T>().await?)
        } else {
            let err = resp.json::<ErrorResponse>().await?;
            Err(anyhow!("{}: {}", status, err.error))
        }
    }
}

impl Client for HttpClient {
    async fn dividend_yield(&self, symbol: &str, price: f64) -> Result<DividendYieldResponse> {
        let resp = self
            .client
            .get(self.path.clone() + format!("/dividend_yield/{symbol}").as_str())
            .query(&[("price", price)])
            .send()
            .await?;
        Self::read(resp).await
    }

    async fn pe_ratio(&self, symbol: &str, price: f64) -> Result<PeRatioResponse> {
        let resp = self
            .client
            .get(self.path.clone() + format!("/pe_ratio/{symbol}").as_str())
            .query(&[("price", price)])
            .send()
            .await?;
        Self::read(resp).await
    }

    async fn record_trade(
        &self,
        symbol: &str,
        trade: RecordTradeRequest,
    ) -> Result<RecordTradeResponse> {
        let resp = self
            .client
            .post(self.path.clone() + format!("/record_trade/{symbol}").as_str())
            .json(&trade)
            .send()
            .await?;
        Self::read(resp).await
    }

    async fn volume_weighted_price(&self, symbol: &str) -> Result<VolumeWeightedPriceResponse> {
        let resp = self
            .client
            .get(self.path.clone() + format!("/volume_weighted_stock_price/{symbol}").as_str())
            .send()
            .await?;
        Self::read(resp).await
    }

    async fn exchange_index(&self) -> Result<IndexResponse> {
        let resp = self
            .client
            .get(self.path.clone() + "/gbce_all_share_index")
            .send()
            .await?;
        Self::read(resp).await
    }

    async fn instruments(&self) -> Result<InstrumentsResponse> {
        let resp = self
            .client
            .get(self.path.clone() + "/instruments")
            .send()
            .await?;
        Self::read(resp).await
    }

    async fn trades(&self, symbol: &str) -> Result<TradesResponse> {
        let resp = self
            .client
            .get(self.path.clone() + format!("/trades/{symbol}").as_str())
            .send()
            .await?;
        Self::read(resp).await
    }
}
