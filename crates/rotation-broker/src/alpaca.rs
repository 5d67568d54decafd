//! Alpaca REST integration: trading API for the account, holdings, clock
//! and orders, data API for daily bars.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{header, Client, Response, StatusCode};
use rotation_core::error::{BrokerError, DataError};
use rotation_core::traits::{Broker, MarketData};
use rotation_core::types::{
    Account, Bar, Holding, MarketClock, Order, OrderRequest, OrderStatus, Side,
    TimeInForce,
};
use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const PAPER_URL: &str = "https://paper-api.alpaca.markets";
pub const LIVE_URL: &str = "https://api.alpaca.markets";
pub const DATA_URL: &str = "https://data.alpaca.markets";

/// Bars requested per page from the data API.
const PAGE_LIMIT: usize = 10_000;

/// Seconds to wait when a 429 carries no `Retry-After`.
const DEFAULT_RETRY_AFTER: u64 = 60;

/// Alpaca API configuration.
#[derive(Clone)]
pub struct AlpacaConfig {
    pub api_key: String,
    pub api_secret: String,
    /// Trading API root, paper or live
    pub base_url: String,
    /// Market data API root
    pub data_url: String,
    /// Data feed, `iex` or `sip`
    pub feed: String,
}

impl AlpacaConfig {
    /// Create config directly with key and secret.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            base_url: base_url.into(),
            data_url: DATA_URL.to_string(),
            feed: "iex".to_string(),
        }
    }

    pub fn with_data_url(mut self, url: impl Into<String>) -> Self {
        self.data_url = url.into();
        self
    }

    pub fn with_feed(mut self, feed: impl Into<String>) -> Self {
        self.feed = feed.into();
        self
    }

    /// Load credentials from the named environment variables.
    ///
    /// The base URL variable is optional and falls back to `default_base_url`.
    pub fn from_env(
        key_var: &str,
        secret_var: &str,
        base_url_var: &str,
        default_base_url: &str,
    ) -> Result<Self, BrokerError> {
        let api_key = std::env::var(key_var)
            .map_err(|_| BrokerError::Configuration(format!("{} not set", key_var)))?;
        let api_secret = std::env::var(secret_var)
            .map_err(|_| BrokerError::Configuration(format!("{} not set", secret_var)))?;
        let base_url = std::env::var(base_url_var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default_base_url.to_string());

        Ok(Self::new(api_key, api_secret, base_url))
    }

    pub fn is_paper(&self) -> bool {
        self.base_url.contains("paper")
    }
}

impl fmt::Debug for AlpacaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlpacaConfig")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .field("base_url", &self.base_url)
            .field("data_url", &self.data_url)
            .field("feed", &self.feed)
            .finish()
    }
}

/// Alpaca API response types
#[derive(Debug, Deserialize)]
struct AlpacaAccount {
    cash: String,
    buying_power: String,
    equity: String,
}

#[derive(Debug, Deserialize)]
struct AlpacaPosition {
    symbol: String,
    qty: String,
    #[serde(default)]
    side: Option<String>,
    current_price: Option<String>,
    market_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaOrder {
    id: String,
    client_order_id: String,
    status: String,
    symbol: String,
    qty: Option<String>,
    filled_qty: Option<String>,
    side: String,
    time_in_force: String,
    filled_avg_price: Option<String>,
    created_at: String,
    filled_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    symbol: &'a str,
    qty: String,
    side: &'a str,
    #[serde(rename = "type")]
    order_type: &'a str,
    time_in_force: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_order_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    t: String,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

#[derive(Debug, Deserialize)]
struct AlpacaBarsResponse {
    // null when the range holds no bars
    bars: Option<Vec<AlpacaBar>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaClock {
    timestamp: String,
    is_open: bool,
    next_open: String,
    next_close: String,
}

/// Alpaca broker client.
pub struct AlpacaBroker {
    config: AlpacaConfig,
    client: Client,
}

impl AlpacaBroker {
    /// Create a new Alpaca broker client.
    pub fn new(config: AlpacaConfig) -> Result<Self, BrokerError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            header::HeaderValue::from_str(&config.api_key)
                .map_err(|e| BrokerError::Configuration(e.to_string()))?,
        );
        headers.insert(
            "APCA-API-SECRET-KEY",
            header::HeaderValue::from_str(&config.api_secret)
                .map_err(|e| BrokerError::Configuration(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &AlpacaConfig {
        &self.config
    }

    fn trading_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BrokerError> {
        let resp = self
            .client
            .get(self.trading_url(path))
            .send()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        let resp = check_status(resp, BrokerError::ApiError).await?;
        resp.json()
            .await
            .map_err(|e| BrokerError::ApiError(e.to_string()))
    }

    async fn bars_page(
        &self,
        symbol: &str,
        start: &str,
        end: &str,
        page_token: Option<&str>,
    ) -> Result<AlpacaBarsResponse, DataError> {
        let url = format!(
            "{}/v2/stocks/{}/bars",
            self.config.data_url.trim_end_matches('/'),
            symbol
        );

        let mut params = vec![
            ("timeframe", "1Day".to_string()),
            ("start", start.to_string()),
            ("end", end.to_string()),
            ("adjustment", "all".to_string()),
            ("feed", self.config.feed.clone()),
            ("limit", PAGE_LIMIT.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("page_token", token.to_string()));
        }

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::UNPROCESSABLE_ENTITY {
            let text = resp.text().await.unwrap_or_default();
            debug!(symbol, %status, body = %text, "Bars request rejected");
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(DataError::ConnectionError(format!("{}: {}", status, text)));
        }

        resp.json()
            .await
            .map_err(|e| DataError::ParseError(e.to_string()))
    }
}

/// Map a non-success response to an error; `fallback` wraps anything that
/// is not an auth failure or rate limit.
async fn check_status(
    resp: Response,
    fallback: fn(String) -> BrokerError,
) -> Result<Response, BrokerError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER);
        return Err(BrokerError::RateLimited { retry_after_secs });
    }

    let text = resp.text().await.unwrap_or_default();
    let message = format!("{}: {}", status, text);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(BrokerError::AuthenticationError(message));
    }
    Err(fallback(message))
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, BrokerError> {
    value
        .parse()
        .map_err(|e| BrokerError::ApiError(format!("Invalid {} '{}': {}", field, value, e)))
}

fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>, BrokerError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BrokerError::ApiError(format!("Invalid {} '{}': {}", field, value, e)))
}

fn parse_order(order: AlpacaOrder) -> Result<Order, BrokerError> {
    let id = Uuid::parse_str(&order.id)
        .map_err(|e| BrokerError::ApiError(format!("Invalid order id '{}': {}", order.id, e)))?;

    let side = match order.side.as_str() {
        "buy" => Side::Buy,
        "sell" => Side::Sell,
        _ => return Err(BrokerError::ApiError(format!("Unknown side: {}", order.side))),
    };

    let quantity = order
        .qty
        .as_deref()
        .map(|q| parse_decimal("qty", q))
        .transpose()?
        .unwrap_or_default();
    let filled_quantity = order
        .filled_qty
        .as_deref()
        .map(|q| parse_decimal("filled_qty", q))
        .transpose()?
        .unwrap_or_default();
    let filled_avg_price = order.filled_avg_price.as_deref().and_then(|p| p.parse().ok());

    let created_at = parse_time("created_at", &order.created_at)?;
    let filled_at = order
        .filled_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(Order {
        id,
        client_order_id: order.client_order_id,
        symbol: order.symbol,
        side,
        quantity,
        time_in_force: TimeInForce::deserialize(IntoDeserializer::<
            serde::de::value::Error,
        >::into_deserializer(order.time_in_force.as_str()))
        .unwrap_or_default(),
        status: OrderStatus::from_alpaca(&order.status),
        filled_quantity,
        filled_avg_price,
        created_at,
        filled_at,
    })
}

fn parse_position(p: AlpacaPosition) -> Result<Holding, BrokerError> {
    let mut quantity = parse_decimal("qty", &p.qty)?;
    if p.side.as_deref() == Some("short") && quantity > Decimal::ZERO {
        quantity = -quantity;
    }

    Ok(Holding {
        symbol: p.symbol,
        quantity,
        current_price: p.current_price.as_deref().and_then(|v| v.parse().ok()),
        market_value: p.market_value.as_deref().and_then(|v| v.parse().ok()),
    })
}

fn parse_bar(symbol: &str, b: &AlpacaBar) -> Result<Bar, DataError> {
    let ts = DateTime::parse_from_rfc3339(&b.t)
        .map_err(|e| DataError::ParseError(format!("{} bar time '{}': {}", symbol, b.t, e)))?;
    Ok(Bar::new(ts.timestamp_millis(), b.o, b.h, b.l, b.c, b.v))
}

#[async_trait]
impl Broker for AlpacaBroker {
    async fn get_account(&self) -> Result<Account, BrokerError> {
        let account: AlpacaAccount = self.get_json("/v2/account").await?;

        Ok(Account {
            cash: parse_decimal("cash", &account.cash)?,
            buying_power: parse_decimal("buying_power", &account.buying_power)?,
            equity: parse_decimal("equity", &account.equity)?,
        })
    }

    async fn get_positions(&self) -> Result<Vec<Holding>, BrokerError> {
        let positions: Vec<AlpacaPosition> = self.get_json("/v2/positions").await?;
        positions.into_iter().map(parse_position).collect()
    }

    async fn submit_order(&self, request: OrderRequest) -> Result<Order, BrokerError> {
        let create_req = CreateOrderRequest {
            symbol: &request.symbol,
            qty: request.quantity.normalize().to_string(),
            side: request.side.as_str(),
            order_type: "market",
            time_in_force: request.time_in_force.as_str(),
            client_order_id: request.client_order_id.as_deref(),
        };

        debug!("Submitting order: {:?}", create_req);

        let resp = self
            .client
            .post(self.trading_url("/v2/orders"))
            .json(&create_req)
            .send()
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;

        let resp = check_status(resp, BrokerError::OrderRejected).await?;
        let order: AlpacaOrder = resp
            .json()
            .await
            .map_err(|e| BrokerError::ApiError(e.to_string()))?;

        info!(
            id = %order.id,
            status = %order.status,
            "Order submitted: {} {} {}",
            order.side,
            order.qty.as_deref().unwrap_or("?"),
            order.symbol
        );
        parse_order(order)
    }

    async fn get_clock(&self) -> Result<MarketClock, BrokerError> {
        let clock: AlpacaClock = self.get_json("/v2/clock").await?;

        Ok(MarketClock {
            timestamp: parse_time("timestamp", &clock.timestamp)?,
            is_open: clock.is_open,
            next_open: parse_time("next_open", &clock.next_open)?,
            next_close: parse_time("next_close", &clock.next_close)?,
        })
    }

    fn name(&self) -> &str {
        if self.config.is_paper() {
            "Alpaca Paper"
        } else {
            "Alpaca Live"
        }
    }
}

#[async_trait]
impl MarketData for AlpacaBroker {
    async fn daily_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError> {
        let start = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let end = end.to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .bars_page(symbol, &start, &end, page_token.as_deref())
                .await?;
            pages += 1;

            for bar in page.bars.as_deref().unwrap_or_default() {
                bars.push(parse_bar(symbol, bar)?);
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        if bars.is_empty() {
            warn!(symbol, %start, %end, "Alpaca returned no bars");
        }
        debug!(symbol, bars = bars.len(), pages, "Fetched daily bars");
        Ok(bars)
    }

    fn name(&self) -> &str {
        "Alpaca"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotation_core::types::TimeInForce;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn broker(server: &MockServer) -> AlpacaBroker {
        let config = AlpacaConfig::new("key", "secret", server.uri()).with_data_url(server.uri());
        AlpacaBroker::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_get_account_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/account"))
            .and(header("APCA-API-KEY-ID", "key"))
            .and(header("APCA-API-SECRET-KEY", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "abc",
                "cash": "1500.25",
                "buying_power": "3000.50",
                "equity": "9100"
            })))
            .mount(&server)
            .await;

        let account = broker(&server).get_account().await.unwrap();
        assert_eq!(account.cash, dec!(1500.25));
        assert_eq!(account.buying_power, dec!(3000.50));
        assert_eq!(account.equity, dec!(9100));
    }

    #[tokio::test]
    async fn test_get_positions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/positions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"symbol": "TQQQ", "qty": "120", "side": "long",
                 "current_price": "61.5", "market_value": "7380"},
                {"symbol": "SQQQ", "qty": "-15", "side": "short",
                 "current_price": null, "market_value": null}
            ])))
            .mount(&server)
            .await;

        let holdings = broker(&server).get_positions().await.unwrap();
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].symbol, "TQQQ");
        assert_eq!(holdings[0].quantity, dec!(120));
        assert_eq!(holdings[0].current_price, Some(dec!(61.5)));
        assert_eq!(holdings[1].quantity, dec!(-15));
        assert_eq!(holdings[1].current_price, None);
    }

    #[tokio::test]
    async fn test_submit_market_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/orders"))
            .and(body_partial_json(json!({
                "symbol": "TQQQ",
                "qty": "156",
                "side": "buy",
                "type": "market",
                "time_in_force": "day"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "61e69015-8549-4bfd-b9c3-01e75843f47d",
                "client_order_id": "eb9e2aaa-f71a-4f51-b5b4-52a6c565dad4",
                "status": "accepted",
                "symbol": "TQQQ",
                "qty": "156",
                "filled_qty": "0",
                "side": "buy",
                "type": "market",
                "time_in_force": "day",
                "filled_avg_price": null,
                "created_at": "2024-05-01T19:46:02.123456Z",
                "filled_at": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let order = broker(&server)
            .submit_order(OrderRequest::market("TQQQ", Side::Buy, dec!(156)))
            .await
            .unwrap();

        assert_eq!(order.symbol, "TQQQ");
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.quantity, dec!(156));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.time_in_force, TimeInForce::Day);
    }

    #[tokio::test]
    async fn test_rejected_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/orders"))
            .respond_with(
                ResponseTemplate::new(422).set_body_string(r#"{"message":"qty must be > 0"}"#),
            )
            .mount(&server)
            .await;

        let result = broker(&server)
            .submit_order(OrderRequest::market("TQQQ", Side::Buy, dec!(0)))
            .await;
        assert!(matches!(result, Err(BrokerError::OrderRejected(msg)) if msg.contains("qty")));
    }

    #[tokio::test]
    async fn test_auth_and_rate_limit_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/account"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/positions"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let b = broker(&server);
        assert!(matches!(
            b.get_account().await,
            Err(BrokerError::AuthenticationError(_))
        ));
        assert!(matches!(
            b.get_positions().await,
            Err(BrokerError::RateLimited { retry_after_secs: 7 })
        ));
    }

    #[tokio::test]
    async fn test_get_clock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/clock"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "timestamp": "2024-05-01T15:48:30-04:00",
                "is_open": true,
                "next_open": "2024-05-02T09:30:00-04:00",
                "next_close": "2024-05-01T16:00:00-04:00"
            })))
            .mount(&server)
            .await;

        let clock = broker(&server).get_clock().await.unwrap();
        assert!(clock.is_open);
        assert!((clock.minutes_to_close() - 11.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_daily_bars_follows_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/stocks/TQQQ/bars"))
            .and(query_param("timeframe", "1Day"))
            .and(query_param("adjustment", "all"))
            .and(query_param("page_token", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bars": [
                    {"t": "2024-01-04T05:00:00Z", "o": 49.0, "h": 50.0, "l": 48.0, "c": 49.5, "v": 900}
                ],
                "symbol": "TQQQ",
                "next_page_token": null
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/stocks/TQQQ/bars"))
            .and(query_param("feed", "iex"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bars": [
                    {"t": "2024-01-02T05:00:00Z", "o": 50.0, "h": 51.0, "l": 49.0, "c": 50.5, "v": 1000},
                    {"t": "2024-01-03T05:00:00Z", "o": 50.5, "h": 51.5, "l": 49.5, "c": 51.0, "v": 1100}
                ],
                "symbol": "TQQQ",
                "next_page_token": "next"
            })))
            .mount(&server)
            .await;

        let start = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let end = "2024-01-05T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let bars = broker(&server).daily_bars("TQQQ", start, end).await.unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].close, 50.5);
        assert_eq!(bars[2].close, 49.5);
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn test_daily_bars_null_and_unknown_symbol() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/stocks/TQQQ/bars"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bars": null,
                "symbol": "TQQQ",
                "next_page_token": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/stocks/NOPE/bars"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid symbol"))
            .mount(&server)
            .await;

        let b = broker(&server);
        let now = Utc::now();
        assert!(b.daily_bars("TQQQ", now, now).await.unwrap().is_empty());
        assert!(matches!(
            b.daily_bars("NOPE", now, now).await,
            Err(DataError::SymbolNotFound(_))
        ));
    }

    #[test]
    fn test_config_debug_hides_secrets() {
        let config = AlpacaConfig::new("my-key", "my-secret", PAPER_URL);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("my-key"));
        assert!(!debug.contains("my-secret"));
        assert!(config.is_paper());
        assert!(!AlpacaConfig::new("k", "s", LIVE_URL).is_paper());
    }
}
