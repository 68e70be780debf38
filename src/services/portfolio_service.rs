//! 持仓业务服务
//!
//! 盈亏计算、周末买入价格替换两条核心规则，
//! 以及添加、加载、刷新、删除四个持仓操作的编排。
//! 行情源和存储通过 trait 注入，单元测试用内存实现替换。

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate, Utc, Weekday};
use chrono_tz::America::New_York;
use futures::future::join_all;
use regex::Regex;
use thiserror::Error;

use crate::models::{AddStockRequest, NewStockRecord, Position, StockData, StockRecord};
use crate::services::traits::{MarketData, StockStore};

/// 股票代码格式：大写字母开头，后跟字母、数字、点或连字符（如 BRK.A）
const TICKER_PATTERN: &str = r"^[A-Z][A-Z0-9.\-]{0,9}$";

/// 业务错误，handler 据此映射 HTTP 状态码
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// 请求输入不合法（HTTP 400），内容直接展示给用户
    #[error("{0}")]
    Invalid(String),
    /// 下游服务或内部故障（HTTP 500）
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

// ==================== 纯计算 ====================

/// 盈亏计算结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainLoss {
    /// 盈亏金额（当前价 - 买入价，不做舍入）
    pub gain_loss: f64,
    /// 盈亏百分比，保留两位小数
    pub gain_loss_percent: f64,
}

/// 计算盈亏金额和百分比
///
/// 百分比 = 盈亏 / 买入价 * 100，保留两位小数。
/// 纯函数，调用方保证 buy_price 不为零（入口校验和加载兜底负责拦截）。
pub fn calculate_gain_loss(current_price: f64, buy_price: f64) -> GainLoss {
    let gain_loss = current_price - buy_price;
    let gain_loss_percent = round2(gain_loss / buy_price * 100.0);
    GainLoss {
        gain_loss,
        gain_loss_percent,
    }
}

/// 保留两位小数，半值远离零方向舍入（0.125 -> 0.13，-0.125 -> -0.13）
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 判断日期是否落在周末（周六或周日）
pub fn is_weekend_date(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// 解析买入日期
///
/// 历史记录里同时存在 "YYYY-MM-DD" 和带时间的 ISO 8601 两种格式，
/// 这里统一取日期部分解析。
pub fn parse_buy_date(raw: &str) -> Result<NaiveDate> {
    let date_part = match raw.split_once('T') {
        Some((date, _)) => date,
        None => raw,
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| anyhow!("无法解析买入日期 {}: {}", raw, e))
}

// ==================== 输入校验 ====================

/// 校验通过后的规范化输入（代码已转大写、日期已确认可解析）
#[derive(Debug, Clone)]
pub struct ValidatedStock {
    pub symbol: String,
    pub buy_price: f64,
    pub buy_date: String,
}

/// 校验添加持仓的输入
///
/// 错误返回面向用户的描述性文案。买入价为零在这里直接拒绝，
/// 保证后续百分比计算不会出现除零。
pub fn validate_stock_input(req: &AddStockRequest) -> Result<ValidatedStock, String> {
    let symbol = req.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err("Please enter a stock symbol".to_string());
    }

    // 代码会拼进行情接口的 URL 路径，格式必须受控
    let ticker_re = Regex::new(TICKER_PATTERN).map_err(|e| e.to_string())?;
    if !ticker_re.is_match(&symbol) {
        return Err("Please enter a valid stock symbol".to_string());
    }

    if !req.buy_price.is_finite() || req.buy_price <= 0.0 {
        return Err("Please enter a valid buy price".to_string());
    }

    let buy_date = req.buy_date.trim().to_string();
    if buy_date.is_empty() {
        return Err("Please enter a buy date".to_string());
    }
    if parse_buy_date(&buy_date).is_err() {
        return Err("Please enter a valid buy date".to_string());
    }

    Ok(ValidatedStock {
        symbol,
        buy_price: req.buy_price,
        buy_date,
    })
}

// ==================== 持仓操作 ====================

/// 添加持仓
///
/// 流程：校验 → 查重 → 实时行情 → 入库 → 周末价格替换 → 盈亏计算。
/// 行情拿不到时在入库前就失败；入库之后任何一步失败都会尽力删除
/// 刚写入的记录再返回错误，避免留下无法展示的孤儿行。
pub async fn add_stock(
    market: &dyn MarketData,
    store: &dyn StockStore,
    user_id: &str,
    req: &AddStockRequest,
) -> Result<Position, PortfolioError> {
    let input = validate_stock_input(req).map_err(PortfolioError::Invalid)?;

    if store.find_stock(user_id, &input.symbol).await?.is_some() {
        return Err(PortfolioError::Invalid(
            "Stock already in your list".to_string(),
        ));
    }

    let quote = market.get_quote(&input.symbol).await?;
    let stock_name = if quote.company_name.is_empty() {
        input.symbol.clone()
    } else {
        quote.company_name.clone()
    };

    let record = NewStockRecord {
        user_id: user_id.to_string(),
        ticker: input.symbol.clone(),
        stock_name,
        buy_price: input.buy_price,
        buy_date: input.buy_date.clone(),
    };
    let saved = store.save_stock(&record).await?;

    match resolve_added_position(market, &saved, &quote).await {
        Ok(position) => Ok(position),
        Err(e) => {
            // 补偿删除失败只记日志，原始错误照常返回
            if let Err(del_err) = store.remove_stock(saved.id, user_id).await {
                log::warn!("回滚删除持仓记录 {} 失败: {}", saved.id, del_err);
            }
            Err(PortfolioError::Internal(e))
        }
    }
}

/// 入库之后的收尾：以数据库返回的记录为准做周末价格替换和盈亏计算
///
/// 周末买入时改用买入日（映射到上一交易日）的历史收盘价；
/// 历史价拿不到就回退实时价，只记日志不报错。
async fn resolve_added_position(
    market: &dyn MarketData,
    saved: &StockRecord,
    quote: &StockData,
) -> Result<Position> {
    let buy_date = parse_buy_date(&saved.buy_date)?;
    let is_weekend_buy = is_weekend_date(buy_date);

    let mut current_price = quote.price;
    if is_weekend_buy {
        match market.get_historical_price(&saved.ticker, buy_date).await {
            Ok(price) => current_price = price,
            Err(e) => {
                log::warn!("获取 {} 周末历史价格失败，回退实时价: {}", saved.ticker, e);
            }
        }
    }

    let result = calculate_gain_loss(current_price, saved.buy_price);
    Ok(Position {
        id: saved.id,
        symbol: saved.ticker.clone(),
        name: saved.stock_name.clone(),
        current_price,
        buy_price: saved.buy_price,
        buy_date: saved.buy_date.clone(),
        gain_loss: result.gain_loss,
        gain_loss_percent: result.gain_loss_percent,
        added_at: ny_today_string(),
        is_weekend_buy,
    })
}

/// 加载用户全部持仓并补全实时行情
///
/// 各行并发请求，单行行情失败降级为买入价展示，不中断整批。
pub async fn load_portfolio(
    market: &dyn MarketData,
    store: &dyn StockStore,
    user_id: &str,
) -> Result<Vec<Position>, PortfolioError> {
    let records = store.load_stocks(user_id).await?;
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let positions = join_all(
        records
            .iter()
            .map(|record| enrich_record(market, record)),
    )
    .await;
    Ok(positions)
}

/// 为单条存量记录补全当前价格和盈亏
///
/// 价格回退链：买入价 → 实时价 → （周末买入时）历史收盘价。
async fn enrich_record(market: &dyn MarketData, record: &StockRecord) -> Position {
    let mut current_price = record.buy_price;

    match market.get_quote(&record.ticker).await {
        Ok(quote) => current_price = quote.price,
        Err(e) => log::warn!("获取 {} 实时价格失败，降级为买入价: {}", record.ticker, e),
    }

    let buy_date = match parse_buy_date(&record.buy_date) {
        Ok(date) => Some(date),
        Err(e) => {
            log::warn!("持仓 {} 的买入日期无法解析: {}", record.id, e);
            None
        }
    };
    let is_weekend_buy = buy_date.map(is_weekend_date).unwrap_or(false);

    if is_weekend_buy {
        if let Some(date) = buy_date {
            match market.get_historical_price(&record.ticker, date).await {
                Ok(price) => current_price = price,
                Err(e) => {
                    log::warn!("获取 {} 周末历史价格失败，保留当前值: {}", record.ticker, e);
                }
            }
        }
    }

    // 存量脏数据（买入价非正）不做除法，百分比记为零
    let (gain_loss, gain_loss_percent) = if record.buy_price > 0.0 {
        let result = calculate_gain_loss(current_price, record.buy_price);
        (result.gain_loss, result.gain_loss_percent)
    } else {
        log::warn!(
            "持仓 {} 的买入价 {} 非法，跳过盈亏计算",
            record.id,
            record.buy_price
        );
        (current_price - record.buy_price, 0.0)
    };

    Position {
        id: record.id,
        symbol: record.ticker.clone(),
        name: record.stock_name.clone(),
        current_price,
        buy_price: record.buy_price,
        buy_date: record.buy_date.clone(),
        gain_loss,
        gain_loss_percent,
        added_at: "N/A".to_string(),
        is_weekend_buy,
    }
}

/// 刷新持仓列表的实时价格
///
/// 每个持仓并发请求一次实时行情，全部完成后整体返回。
/// 单只失败保留该行原值，不中断整批；周末替换价只在添加和
/// 加载时生效，刷新一律使用实时价。
pub async fn refresh_positions(market: &dyn MarketData, positions: Vec<Position>) -> Vec<Position> {
    join_all(
        positions
            .into_iter()
            .map(|position| refresh_one(market, position)),
    )
    .await
}

async fn refresh_one(market: &dyn MarketData, position: Position) -> Position {
    let quote = match market.get_quote(&position.symbol).await {
        Ok(quote) => quote,
        Err(e) => {
            log::warn!("刷新 {} 价格失败，保留原值: {}", position.symbol, e);
            return position;
        }
    };

    if position.buy_price <= 0.0 {
        log::warn!("持仓 {} 的买入价非法，保留原值", position.symbol);
        return position;
    }

    let result = calculate_gain_loss(quote.price, position.buy_price);
    Position {
        current_price: quote.price,
        gain_loss: result.gain_loss,
        gain_loss_percent: result.gain_loss_percent,
        ..position
    }
}

/// 删除持仓，按行 ID 和用户 ID 双重过滤
pub async fn remove_stock(
    store: &dyn StockStore,
    id: i64,
    user_id: &str,
) -> Result<(), PortfolioError> {
    store.remove_stock(id, user_id).await?;
    Ok(())
}

/// 纽约时区的当天日期字符串，作为新持仓的添加时间展示
fn ny_today_string() -> String {
    Utc::now().with_timezone(&New_York).format("%Y-%m-%d").to_string()
}
