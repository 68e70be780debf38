//! 持仓数据模型
//!
//! 定义 stock_watcher 表行结构和前端展示用的持仓条目

use serde::{Deserialize, Serialize};

/// stock_watcher 表的一行（Supabase 返回的原始记录）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StockRecord {
    /// 行 ID（自增主键）
    pub id: i64,
    /// 用户 ID（Supabase auth 的不透明标识）
    pub user_id: String,
    /// 股票代码（大写）
    pub ticker: String,
    /// 公司名称
    pub stock_name: String,
    /// 买入价格
    pub buy_price: f64,
    /// 买入日期（文本，兼容 YYYY-MM-DD 和 ISO 8601 两种格式）
    pub buy_date: String,
}

/// 新增持仓的插入载荷（无 id，id 由数据库生成）
#[derive(Debug, Serialize, Clone)]
pub struct NewStockRecord {
    /// 用户 ID
    pub user_id: String,
    /// 股票代码（大写）
    pub ticker: String,
    /// 公司名称
    pub stock_name: String,
    /// 买入价格
    pub buy_price: f64,
    /// 买入日期
    pub buy_date: String,
}

/// 单条持仓（补全了实时行情和盈亏之后的展示结构）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Position {
    /// 行 ID
    pub id: i64,
    /// 股票代码
    pub symbol: String,
    /// 公司名称
    pub name: String,
    /// 当前展示价格（周末买入时为上一交易日收盘价）
    pub current_price: f64,
    /// 买入价格
    pub buy_price: f64,
    /// 买入日期
    pub buy_date: String,
    /// 盈亏金额 = current_price - buy_price
    pub gain_loss: f64,
    /// 盈亏百分比（保留两位小数）
    pub gain_loss_percent: f64,
    /// 添加时间（加载历史持仓时为 N/A）
    pub added_at: String,
    /// 买入日期是否落在周末
    pub is_weekend_buy: bool,
}

/// 添加持仓请求体
#[derive(Debug, Deserialize, Clone)]
pub struct AddStockRequest {
    /// 股票代码（允许小写，服务端统一转大写）
    pub symbol: String,
    /// 买入价格
    pub buy_price: f64,
    /// 买入日期（YYYY-MM-DD）
    pub buy_date: String,
}
