//! 股票行情数据模型
//!
//! 定义行情服务返回的数据结构（实时报价、公司信息、K线）

use serde::{Deserialize, Serialize};

/// 股票完整行情
///
/// 一次查询聚合的结果：实时价格、涨跌、公司信息，
/// 以及按需附带的图表数据和历史价格
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StockData {
    /// 股票代码（大写）
    pub ticker: String,
    /// 最新收盘价/当前价格
    pub price: f64,
    /// 昨收价
    pub previous_close: Option<f64>,
    /// 涨跌额
    pub change: Option<f64>,
    /// 涨跌幅（百分比）
    pub change_percent: f64,
    /// 开盘价
    pub open: Option<f64>,
    /// 最高价
    pub high: Option<f64>,
    /// 最低价
    pub low: Option<f64>,
    /// 成交量
    pub volume: Option<u64>,
    /// 公司名称（获取失败时回退为代码本身）
    pub company_name: String,
    /// 公司简介
    pub description: String,
    /// 市场类别（stocks/crypto 等）
    pub market: String,
    /// 主上市交易所
    pub primary_exchange: String,
    /// 计价货币
    pub currency: String,
    /// 地区
    pub locale: String,
    /// 图表数据（chart_days > 0 时有值）
    pub chart_data: Vec<ChartPoint>,
    /// 指定日期的历史收盘价（请求了历史价时有值）
    pub historical_price: Option<f64>,
    /// 历史价对应的查询日期
    pub historical_date: Option<String>,
}

/// 单日K线数据点
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChartPoint {
    /// 交易日（YYYY-MM-DD）
    pub date: String,
    /// 开盘价
    pub open: f64,
    /// 收盘价
    pub close: f64,
    /// 最高价
    pub high: f64,
    /// 最低价
    pub low: f64,
    /// 成交量
    pub volume: u64,
}

/// 图表数据响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ChartData {
    /// 股票代码
    pub ticker: String,
    /// 周期描述（如 "30 days"）
    pub period: String,
    /// K线数据
    pub data: Vec<ChartPoint>,
}

/// 图表查询参数
#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    /// 天数（默认 30，前端提供 30/60/90）
    pub days: Option<u32>,
}
