use std::future::Future;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::exchange::ExchangeError;
use crate::ledger::{Side, Trade};
use crate::registry::Instrument;

pub type Symbol = String;

///Trade timestamps on the wire are `YYYY-MM-DD HH:MM:SS` in UTC.
pub fn parse_timestamp(value: &str) -> Result<i64, ExchangeError> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    PrimitiveDateTime::parse(value, format)
        .map(|date| date.assume_utc().unix_timestamp())
        .map_err(|err| ExchangeError::invalid_input("timestamp", err.to_string()))
}

pub fn format_timestamp(timestamp: i64) -> Option<String> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()?
        .format(format)
        .ok()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PriceQuery {
    pub price: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DividendYieldResponse {
    pub dividend_yield: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PeRatioResponse {
    pub pe_ratio: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecordTradeRequest {
    pub timestamp: String,
    pub quantity: i64,
    pub indicator: Side,
    pub price: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RecordTradeResponse {
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct VolumeWeightedPriceResponse {
    pub volume_weighted_stock_price: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct IndexResponse {
    pub gbce_all_share_index: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct InstrumentsResponse {
    pub instruments: Vec<Instrument>,
}

///Trades are listed in the same shape they are submitted in.
#[derive(Debug, Deserialize, Serialize)]
pub struct TradesResponse {
    pub trades: Vec<RecordTradeRequest>,
}

impl From<Trade> for RecordTradeRequest {
    fn from(value: Trade) -> Self {
        Self {
            timestamp: format_timestamp(value.timestamp)
                .unwrap_or_else(|| value.timestamp.to_string()),
            quantity: value.quantity,
            indicator: value.side,
            price: value.price,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ResponseError for ExchangeError {
    fn status_code(&self) -> StatusCode {
        match self {
            ExchangeError::NotFound { .. } => StatusCode::NOT_FOUND,
            ExchangeError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            ExchangeError::UndefinedResult { .. } => StatusCode::BAD_REQUEST,
            ExchangeError::EmptyRegistry => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

pub trait Client {
    fn dividend_yield(
        &self,
        symbol: &str,
        price: f64,
    ) -> impl Future<Output = Result<DividendYieldResponse>>;
    fn pe_ratio(&self, symbol: &str, price: f64) -> impl Future<Output = Result<PeRatioResponse>>;
    fn record_trade(
        &self,
        symbol: &str,
        trade: RecordTradeRequest,
    ) -> impl Future<Output = Result<RecordTradeResponse>>;
    fn volume_weighted_price(
        &self,
        symbol: &str,
    ) -> impl Future<Output = Result<VolumeWeightedPriceResponse>>;
    fn exchange_index(&self) -> impl Future<Output = Result<IndexResponse>>;
    fn instruments(&self) -> impl Future<Output = Result<InstrumentsResponse>>;
    fn trades(&self, symbol: &str) -> impl Future<Output = Result<TradesResponse>>;
}

///Registers every route along with extractor configs that turn malformed query strings and
///bodies into the same JSON error shape as every other failure.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ExchangeError::invalid_input("query", err.to_string()).into()
    }))
    .app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ExchangeError::invalid_input("body", err.to_string()).into()
    }))
    .service(server::dividend_yield)
    .service(server::pe_ratio)
    .service(server::record_trade)
    .service(server::volume_weighted_price)
    .service(server::exchange_index)
    .service(server::instruments)
    .service(server::trades);
}

pub mod server {
    use actix_web::{get, post, web};

    use super::{
        parse_timestamp, DividendYieldResponse, IndexResponse, InstrumentsResponse,
        PeRatioResponse, PriceQuery, RecordTradeRequest, RecordTradeResponse, Symbol,
        TradesResponse, VolumeWeightedPriceResponse,
    };
    use crate::exchange::{Exchange, ExchangeError};

    #[get("/dividend_yield/{symbol}")]
    pub async fn dividend_yield(
        app: web::Data<Exchange>,
        path: web::Path<(Symbol,)>,
        query: web::Query<PriceQuery>,
    ) -> Result<web::Json<DividendYieldResponse>, ExchangeError> {
        let (symbol,) = path.into_inner();
        let dividend_yield = app.dividend_yield(&symbol, query.price)?;
        Ok(web::Json(DividendYieldResponse { dividend_yield }))
    }

    #[get("/pe_ratio/{symbol}")]
    pub async fn pe_ratio(
        app: web::Data<Exchange>,
        path: web::Path<(Symbol,)>,
        query: web::Query<PriceQuery>,
    ) -> Result<web::Json<PeRatioResponse>, ExchangeError> {
        let (symbol,) = path.into_inner();
        let pe_ratio = app.pe_ratio(&symbol, query.price)?;
        Ok(web::Json(PeRatioResponse { pe_ratio }))
    }

    #[post("/record_trade/{symbol}")]
    pub async fn record_trade(
        app: web::Data<Exchange>,
        path: web::Path<(Symbol,)>,
        trade: web::Json<RecordTradeRequest>,
    ) -> Result<web::Json<RecordTradeResponse>, ExchangeError> {
        let (symbol,) = path.into_inner();
        let timestamp = parse_timestamp(&trade.timestamp)?;
        app.record_trade(
            &symbol,
            timestamp,
            trade.quantity,
            trade.indicator,
            trade.price,
        )?;
        Ok(web::Json(RecordTradeResponse {
            message: "Trade recorded successfully".to_string(),
        }))
    }

    #[get("/volume_weighted_stock_price/{symbol}")]
    pub async fn volume_weighted_price(
        app: web::Data<Exchange>,
        path: web::Path<(Symbol,)>,
    ) -> Result<web::Json<VolumeWeightedPriceResponse>, ExchangeError> {
        let (symbol,) = path.into_inner();
        let volume_weighted_stock_price = app.volume_weighted_price(&symbol)?;
        Ok(web::Json(VolumeWeightedPriceResponse {
            volume_weighted_stock_price,
        }))
    }

    #[get("/gbce_all_share_index")]
    pub async fn exchange_index(
        app: web::Data<Exchange>,
    ) -> Result<web::Json<IndexResponse>, ExchangeError> {
        let gbce_all_share_index = app.exchange_index()?;
        Ok(web::Json(IndexResponse {
            gbce_all_share_index,
        }))
    }

    #[get("/instruments")]
    pub async fn instruments(app: web::Data<Exchange>) -> web::Json<InstrumentsResponse> {
        web::Json(InstrumentsResponse {
            instruments: app.instruments().to_vec(),
        })
    }

    #[get("/trades/{symbol}")]
    pub async fn trades(
        app: web::Data<Exchange>,
        path: web::Path<(Symbol,)>,
    ) -> Result<web::Json<TradesResponse>, ExchangeError> {
        let (symbol,) = path.into_inner();
        let trades = app.trades(&symbol)?;
        Ok(web::Json(TradesResponse {
            trades: trades.into_iter().map(RecordTradeRequest::from).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use approx::assert_relative_eq;

    use super::{
        configure, format_timestamp, parse_timestamp, DividendYieldResponse,
        ErrorResponse, IndexResponse, InstrumentsResponse, PeRatioResponse, RecordTradeRequest,
        RecordTradeResponse, TradesResponse, VolumeWeightedPriceResponse,
    };
    use crate::clock::FixedClock;
    use crate::exchange::Exchange;
    use crate::ledger::Side;
    use crate::registry::Registry;

    //2023-11-14 22:13:20 UTC
    const NOW: i64 = 1_700_000_000;

    fn exchange() -> Exchange {
        Exchange::new(Registry::sample(), Arc::new(FixedClock::new(NOW)))
    }

    fn trade(timestamp: &str, quantity: i64, price: f64) -> RecordTradeRequest {
        RecordTradeRequest {
            timestamp: timestamp.to_string(),
            quantity,
            indicator: Side::Buy,
            price,
        }
    }

    #[::core::prelude::v1::test]
    fn test_that_timestamps_round_trip_through_wire_format() {
        assert!(parse_timestamp("2023-11-14 22:13:20").unwrap() == NOW);
        assert!(format_timestamp(NOW).unwrap() == "2023-11-14 22:13:20");
        assert!(parse_timestamp("2023-11-14T22:13:20").is_err());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[actix_web::test]
    async fn test_single_trade_loop() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(exchange()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/dividend_yield/POP?price=100")
            .to_request();
        let resp: DividendYieldResponse = test::call_and_read_body_json(&app, req).await;
        assert_relative_eq!(resp.dividend_yield, 0.08);

        let req1 = test::TestRequest::get()
            .uri("/pe_ratio/POP?price=100")
            .to_request();
        let resp1: PeRatioResponse = test::call_and_read_body_json(&app, req1).await;
        assert_relative_eq!(resp1.pe_ratio, 12.5);

        let req2 = test::TestRequest::post()
            .set_json(trade("2023-11-14 22:13:20", 10, 100.0))
            .uri("/record_trade/POP")
            .to_request();
        let resp2: RecordTradeResponse = test::call_and_read_body_json(&app, req2).await;
        assert!(resp2.message == "Trade recorded successfully");

        let req3 = test::TestRequest::post()
            .set_json(trade("2023-11-14 22:12:20", 5, 120.0))
            .uri("/record_trade/POP")
            .to_request();
        test::call_and_read_body(&app, req3).await;

        let req4 = test::TestRequest::get()
            .uri("/volume_weighted_stock_price/POP")
            .to_request();
        let resp4: VolumeWeightedPriceResponse = test::call_and_read_body_json(&app, req4).await;
        assert_relative_eq!(resp4.volume_weighted_stock_price, 1600.0 / 15.0);

        let req5 = test::TestRequest::get()
            .uri("/trades/POP")
            .to_request();
        let resp5: TradesResponse = test::call_and_read_body_json(&app, req5).await;
        assert!(resp5.trades.len() == 2);
        assert!(resp5.trades[0].timestamp == "2023-11-14 22:13:20");
        assert!(resp5.trades[0].indicator == Side::Buy);

        //Other instruments have no trades so the index is zero
        let req6 = test::TestRequest::get()
            .uri("/gbce_all_share_index")
            .to_request();
        let resp6: IndexResponse = test::call_and_read_body_json(&app, req6).await;
        assert!(resp6.gbce_all_share_index == 0.0);

        let req7 = test::TestRequest::get().uri("/instruments").to_request();
        let resp7: InstrumentsResponse = test::call_and_read_body_json(&app, req7).await;
        assert!(resp7.instruments.len() == 5);
    }

    #[actix_web::test]
    async fn test_that_unknown_symbol_is_not_found() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(exchange()))
                .configure(configure),
        )
        .await;

        for uri in [
            "/dividend_yield/XYZ?price=100",
            "/pe_ratio/XYZ?price=100",
            "/volume_weighted_stock_price/XYZ",
            "/trades/XYZ",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status() == StatusCode::NOT_FOUND);
            let body: ErrorResponse = test::read_body_json(resp).await;
            assert!(body.error.contains("XYZ"));
        }

        let req = test::TestRequest::post()
            .set_json(trade("2023-11-14 22:13:20", 10, 100.0))
            .uri("/record_trade/XYZ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status() == StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_that_bad_input_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(exchange()))
                .configure(configure),
        )
        .await;

        let bad = vec![
            test::TestRequest::get()
                .uri("/dividend_yield/POP?price=0")
                .to_request(),
            test::TestRequest::get()
                .uri("/pe_ratio/TEA?price=100")
                .to_request(),
            test::TestRequest::get()
                .uri("/pe_ratio/POP?price=abc")
                .to_request(),
            test::TestRequest::get().uri("/dividend_yield/POP").to_request(),
            test::TestRequest::post()
                .set_json(trade("2023-11-14 22:13:20", 0, 100.0))
                .uri("/record_trade/POP")
                .to_request(),
            test::TestRequest::post()
                .set_json(trade("2023-11-14 22:13:20", 10, -1.0))
                .uri("/record_trade/POP")
                .to_request(),
            test::TestRequest::post()
                .set_json(trade("14/11/2023", 10, 100.0))
                .uri("/record_trade/POP")
                .to_request(),
            test::TestRequest::post()
                .set_json(serde_json::json!({
                    "timestamp": "2023-11-14 22:13:20",
                    "quantity": 10,
                    "indicator": "hold",
                    "price": 100.0
                }))
                .uri("/record_trade/POP")
                .to_request(),
        ];

        for req in bad {
            let resp = test::call_service(&app, req).await;
            assert!(resp.status() == StatusCode::BAD_REQUEST);
            let body: ErrorResponse = test::read_body_json(resp).await;
            assert!(!body.error.is_empty());
        }

        //Nothing rejected made it into the ledger
        let req = test::TestRequest::get().uri("/trades/POP").to_request();
        let resp: TradesResponse = test::call_and_read_body_json(&app, req).await;
        assert!(resp.trades.is_empty());
    }

    #[actix_web::test]
    async fn test_that_overflowing_results_are_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(exchange()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/dividend_yield/POP?price=1e-320")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status() == StatusCode::BAD_REQUEST);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.contains("too large"));

        let req1 = test::TestRequest::post()
            .set_json(trade("2023-11-14 22:13:20", 10, 1e308))
            .uri("/record_trade/POP")
            .to_request();
        test::call_and_read_body(&app, req1).await;

        let req2 = test::TestRequest::get()
            .uri("/volume_weighted_stock_price/POP")
            .to_request();
        let resp2: VolumeWeightedPriceResponse = test::call_and_read_body_json(&app, req2).await;
        assert_relative_eq!(resp2.volume_weighted_stock_price, 1e308, max_relative = 1e-12);
    }

    #[actix_web::test]
    async fn test_that_empty_registry_index_is_bad_request() {
        let exchange = Exchange::new(
            Registry::new(vec![]).unwrap(),
            Arc::new(FixedClock::new(NOW)),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(exchange))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/gbce_all_share_index")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status() == StatusCode::BAD_REQUEST);
    }
}
