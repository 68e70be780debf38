//! Polygon.io 行情接口实现
//!
//! 提供实时报价、公司信息、历史价格和日K线数据
//! 对接 https://api.polygon.io 的 v2 聚合接口和 v3 参考数据接口

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use chrono_tz::America::New_York;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::PolygonConfig;
use crate::models::{ChartData, ChartPoint, StockData};
use crate::services::traits::MarketData;

/// 获取美东时间的当前交易日历日期
///
/// 行情接口的日期范围按交易所所在时区计算，避免跨时区时查到未来日期
fn market_today() -> NaiveDate {
    Utc::now().with_timezone(&New_York).date_naive()
}

/// 上一交易日（周末回退到周五，工作日原样返回）
pub fn last_trading_day(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sun => date - Duration::days(2),
        Weekday::Sat => date - Duration::days(1),
        _ => date,
    }
}

/// 聚合接口（日K线）响应
#[derive(Debug, Deserialize)]
struct AggsResponse {
    #[serde(default)]
    results: Vec<AggBar>,
}

/// 单根日K线
#[derive(Debug, Deserialize, Clone)]
struct AggBar {
    /// 收盘价
    #[serde(rename = "c")]
    close: Option<f64>,
    /// 开盘价
    #[serde(rename = "o")]
    open: Option<f64>,
    /// 最高价
    #[serde(rename = "h")]
    high: Option<f64>,
    /// 最低价
    #[serde(rename = "l")]
    low: Option<f64>,
    /// 成交量
    #[serde(rename = "v")]
    volume: Option<f64>,
    /// K线起始时间戳（毫秒）
    #[serde(rename = "t")]
    timestamp: Option<i64>,
}

/// 参考数据接口响应
#[derive(Debug, Deserialize)]
struct TickerDetailsResponse {
    results: Option<TickerDetails>,
}

/// 公司/代码详情
#[derive(Debug, Deserialize, Default)]
struct TickerDetails {
    name: Option<String>,
    description: Option<String>,
    market: Option<String>,
    primary_exchange: Option<String>,
    currency_name: Option<String>,
    locale: Option<String>,
}

/// 从倒序K线中提取的价格快照
#[derive(Debug, Default, PartialEq)]
struct PriceSnapshot {
    price: f64,
    previous_close: Option<f64>,
    change: Option<f64>,
    change_percent: f64,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    volume: Option<u64>,
}

/// 解析倒序K线（最新在前），计算当前价和涨跌
///
/// 收盘价缺失或为零视为无数据。
/// 有至少两根K线时相对昨收计算涨跌，只有一根时相对开盘价计算，
/// 两者都不可用时涨跌幅为 0；单根K线的昨收字段回显最新收盘价
fn snapshot_from_bars(bars: &[AggBar]) -> Option<PriceSnapshot> {
    let latest = bars.first()?;
    let price = latest.close.filter(|price| *price > 0.0)?;

    let previous = if bars.len() > 1 { bars.get(1) } else { None };
    let previous_close = match previous {
        Some(bar) => bar.close,
        None => Some(price),
    };

    let mut change = None;
    let mut change_percent = 0.0;
    match previous.and_then(|bar| bar.close) {
        Some(prev) if prev > 0.0 => {
            let diff = price - prev;
            change = Some(diff);
            change_percent = (diff / prev) * 100.0;
        }
        _ => {
            if let Some(open) = latest.open.filter(|open| *open > 0.0) {
                let diff = price - open;
                change = Some(diff);
                change_percent = (diff / open) * 100.0;
            }
        }
    }

    Some(PriceSnapshot {
        price,
        previous_close,
        change,
        change_percent,
        open: latest.open,
        high: latest.high,
        low: latest.low,
        volume: latest.volume.map(|volume| volume as u64),
    })
}

/// 把正序K线转换成图表数据点，日期取美东交易日
fn chart_points(bars: &[AggBar]) -> Vec<ChartPoint> {
    bars.iter()
        .filter_map(|bar| {
            let millis = bar.timestamp?;
            let date = DateTime::from_timestamp_millis(millis)?
                .with_timezone(&New_York)
                .date_naive();
            Some(ChartPoint {
                date: date.format("%Y-%m-%d").to_string(),
                open: bar.open?,
                close: bar.close?,
                high: bar.high?,
                low: bar.low?,
                volume: bar.volume.unwrap_or(0.0) as u64,
            })
        })
        .collect()
}

/// Polygon.io 行情客户端
///
/// 在进程启动时构造一次，通过 web::Data 注入各个 handler
pub struct PolygonClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl PolygonClient {
    /// 创建客户端，base_url 来自配置（默认官方地址）
    pub fn new(config: &PolygonConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| anyhow!("Polygon base_url 配置无效: {}", e))?;
        // 相对拼接要求路径以斜杠结尾，否则最后一段会被替换掉
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// 拼接接口地址，配置里自带的路径前缀（如反向代理）原样保留
    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// 聚合查询股票数据
    ///
    /// 一次并发发起最多四个请求：
    /// - 近 5 个交易日K线（倒序，算当前价和涨跌）
    /// - 公司/代码详情
    /// - chart_days > 0 时的图表K线（正序）
    /// - historical_date 给定时，该日期回退到上一交易日后的历史K线
    ///
    /// 当前价是硬性要求，其余子请求失败时降级为空值
    pub async fn get_stock_data(
        &self,
        ticker: &str,
        chart_days: u32,
        historical_date: Option<NaiveDate>,
    ) -> Result<StockData> {
        let ticker_upper = ticker.to_uppercase();
        let today = market_today();
        let start = today - Duration::days(chart_days.max(5) as i64);

        let price_fut = self.fetch_aggs(&ticker_upper, start, today, "desc", 5);
        let details_fut = self.fetch_ticker_details(&ticker_upper);
        let chart_fut = async {
            if chart_days > 0 {
                self.fetch_aggs(&ticker_upper, start, today, "asc", 120)
                    .await
                    .map(Some)
            } else {
                Ok(None)
            }
        };
        let hist_fut = async {
            match historical_date {
                Some(date) => {
                    let end = last_trading_day(date);
                    let hist_start = end - Duration::days(7);
                    self.fetch_aggs(&ticker_upper, hist_start, end, "desc", 5)
                        .await
                        .map(Some)
                }
                None => Ok(None),
            }
        };

        // 与上游的四个交互并发执行，单个子请求失败不影响其余结果
        let (price_res, details_res, chart_res, hist_res) =
            futures::join!(price_fut, details_fut, chart_fut, hist_fut);

        let price_bars = match price_res {
            Ok(bars) => bars,
            Err(e) => {
                log::warn!("获取 {} 价格数据失败: {}", ticker_upper, e);
                Vec::new()
            }
        };
        let snapshot = snapshot_from_bars(&price_bars).ok_or_else(|| {
            anyhow!(
                "No data found for ticker \"{}\". Please check the symbol.",
                ticker_upper
            )
        })?;

        let details = match details_res {
            Ok(details) => details,
            Err(e) => {
                log::warn!("获取 {} 公司信息失败，使用默认值: {}", ticker_upper, e);
                TickerDetails::default()
            }
        };

        let chart_data = match chart_res {
            Ok(Some(bars)) => chart_points(&bars),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("获取 {} 图表数据失败: {}", ticker_upper, e);
                Vec::new()
            }
        };

        let historical_price = match hist_res {
            Ok(Some(bars)) => bars.first().and_then(|bar| bar.close),
            Ok(None) => None,
            Err(e) => {
                log::warn!("获取 {} 历史价格失败: {}", ticker_upper, e);
                None
            }
        };

        Ok(StockData {
            price: snapshot.price,
            previous_close: snapshot.previous_close,
            change: snapshot.change,
            change_percent: snapshot.change_percent,
            open: snapshot.open,
            high: snapshot.high,
            low: snapshot.low,
            volume: snapshot.volume,
            company_name: details.name.unwrap_or_else(|| ticker_upper.clone()),
            description: details.description.unwrap_or_default(),
            market: details.market.unwrap_or_default(),
            primary_exchange: details.primary_exchange.unwrap_or_default(),
            currency: details.currency_name.unwrap_or_else(|| "USD".to_string()),
            locale: details.locale.unwrap_or_else(|| "us".to_string()),
            chart_data,
            historical_price,
            historical_date: historical_date.map(|date| date.format("%Y-%m-%d").to_string()),
            ticker: ticker_upper,
        })
    }

    /// 获取指定天数的日K线图表数据
    pub async fn get_stock_chart_data(&self, ticker: &str, days: u32) -> Result<ChartData> {
        let data = self.get_stock_data(ticker, days, None).await?;
        if data.chart_data.is_empty() {
            return Err(anyhow!("No chart data available"));
        }
        Ok(ChartData {
            ticker: data.ticker,
            period: format!("{} days", days),
            data: data.chart_data,
        })
    }

    /// 请求日K线聚合接口
    async fn fetch_aggs(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        sort: &str,
        limit: u32,
    ) -> Result<Vec<AggBar>> {
        let path = format!(
            "v2/aggs/ticker/{}/range/1/day/{}/{}",
            ticker, start, end
        );
        let url = self.endpoint(&path)?;
        log::debug!("📡 请求聚合K线 URL: {}", url);

        let limit_param = limit.to_string();
        let response = self
            .client
            .get(url)
            .query(&[
                ("adjusted", "true"),
                ("sort", sort),
                ("limit", limit_param.as_str()),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("获取行情数据失败: {}", response.status()));
        }

        let aggs: AggsResponse = response.json().await?;
        Ok(aggs.results)
    }

    /// 请求公司/代码详情接口
    async fn fetch_ticker_details(&self, ticker: &str) -> Result<TickerDetails> {
        let url = self.endpoint(&format!("v3/reference/tickers/{}", ticker))?;

        let response = self
            .client
            .get(url)
            .query(&[("apikey", &self.api_key)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("获取公司信息失败: {}", response.status()));
        }

        let details: TickerDetailsResponse = response.json().await?;
        Ok(details.results.unwrap_or_default())
    }
}

#[async_trait]
impl MarketData for PolygonClient {
    async fn get_quote(&self, ticker: &str) -> Result<StockData> {
        self.get_stock_data(ticker, 0, None).await
    }

    async fn get_historical_price(&self, ticker: &str, date: NaiveDate) -> Result<f64> {
        let data = self.get_stock_data(ticker, 0, Some(date)).await?;
        // 历史价为零同样视为无数据
        data.historical_price
            .filter(|price| *price > 0.0)
            .ok_or_else(|| anyhow!("No historical data available"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn last_trading_day_maps_weekend_to_friday() {
        // 2024-06-01 周六 / 2024-06-02 周日 / 2024-05-31 周五
        assert_eq!(last_trading_day(date(2024, 6, 1)), date(2024, 5, 31));
        assert_eq!(last_trading_day(date(2024, 6, 2)), date(2024, 5, 31));
    }

    #[test]
    fn last_trading_day_keeps_weekdays() {
        assert_eq!(last_trading_day(date(2024, 6, 3)), date(2024, 6, 3));
        assert_eq!(last_trading_day(date(2024, 6, 7)), date(2024, 6, 7));
    }

    #[test]
    fn snapshot_uses_previous_close_when_two_bars() {
        let aggs: AggsResponse = serde_json::from_str(
            r#"{
                "ticker": "AAPL",
                "resultsCount": 2,
                "results": [
                    {"c": 110.0, "o": 108.0, "h": 111.0, "l": 107.5, "v": 1200000, "t": 1717473600000},
                    {"c": 100.0, "o": 99.0, "h": 101.0, "l": 98.0, "v": 1100000, "t": 1717387200000}
                ]
            }"#,
        )
        .unwrap();

        let snapshot = snapshot_from_bars(&aggs.results).unwrap();
        assert_eq!(snapshot.price, 110.0);
        assert_eq!(snapshot.previous_close, Some(100.0));
        assert_eq!(snapshot.change, Some(10.0));
        assert_eq!(snapshot.change_percent, 10.0);
        assert_eq!(snapshot.volume, Some(1_200_000));
    }

    #[test]
    fn snapshot_falls_back_to_open_with_single_bar() {
        let bars = vec![AggBar {
            close: Some(105.0),
            open: Some(100.0),
            high: Some(106.0),
            low: Some(99.0),
            volume: Some(500.0),
            timestamp: Some(1717473600000),
        }];

        let snapshot = snapshot_from_bars(&bars).unwrap();
        assert_eq!(snapshot.price, 105.0);
        // 单根K线时昨收回显收盘价
        assert_eq!(snapshot.previous_close, Some(105.0));
        assert_eq!(snapshot.change, Some(5.0));
        assert_eq!(snapshot.change_percent, 5.0);
    }

    #[test]
    fn snapshot_requires_a_positive_close_price() {
        assert!(snapshot_from_bars(&[]).is_none());

        let missing_close = vec![AggBar {
            close: None,
            open: Some(100.0),
            high: None,
            low: None,
            volume: None,
            timestamp: Some(1717473600000),
        }];
        assert!(snapshot_from_bars(&missing_close).is_none());

        // 收盘价为零同样视为无数据
        let zero_close = vec![AggBar {
            close: Some(0.0),
            open: Some(100.0),
            high: None,
            low: None,
            volume: None,
            timestamp: Some(1717473600000),
        }];
        assert!(snapshot_from_bars(&zero_close).is_none());
    }

    #[test]
    fn endpoint_preserves_configured_path_prefix() {
        let client = PolygonClient::new(&PolygonConfig {
            base_url: "https://gw.example.com/polygon".to_string(),
            api_key: String::new(),
        })
        .unwrap();
        assert_eq!(
            client
                .endpoint("v2/aggs/ticker/AAPL/range/1/day/2024-06-03/2024-06-07")
                .unwrap()
                .as_str(),
            "https://gw.example.com/polygon/v2/aggs/ticker/AAPL/range/1/day/2024-06-03/2024-06-07"
        );

        let official = PolygonClient::new(&PolygonConfig::default()).unwrap();
        assert_eq!(
            official.endpoint("v3/reference/tickers/AAPL").unwrap().as_str(),
            "https://api.polygon.io/v3/reference/tickers/AAPL"
        );
    }

    #[test]
    fn chart_points_skip_incomplete_bars() {
        let aggs: AggsResponse = serde_json::from_str(
            r#"{
                "results": [
                    {"c": 100.0, "o": 99.0, "h": 101.0, "l": 98.0, "v": 1000, "t": 1717387200000},
                    {"o": 99.0, "t": 1717473600000},
                    {"c": 110.0, "o": 108.0, "h": 111.0, "l": 107.5, "v": 2000, "t": 1717732800000}
                ]
            }"#,
        )
        .unwrap();

        let points = chart_points(&aggs.results);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, "2024-06-03");
        assert_eq!(points[0].close, 100.0);
        assert_eq!(points[1].volume, 2000);
    }

    #[test]
    fn ticker_details_parse_with_missing_fields() {
        let parsed: TickerDetailsResponse = serde_json::from_str(
            r#"{
                "results": {
                    "ticker": "AAPL",
                    "name": "Apple Inc.",
                    "market": "stocks",
                    "locale": "us",
                    "primary_exchange": "XNAS",
                    "currency_name": "usd"
                },
                "status": "OK"
            }"#,
        )
        .unwrap();

        let details = parsed.results.unwrap();
        assert_eq!(details.name.as_deref(), Some("Apple Inc."));
        assert_eq!(details.description, None);
    }
}
