//! 外部依赖接口抽象
//!
//! 行情源和持仓存储各抽象为一个 trait，便于在测试中替换为内存实现。
//! 生产实现分别是 PolygonClient 和 SupabaseClient。

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{NewStockRecord, StockData, StockRecord};

/// 行情数据源
#[async_trait]
pub trait MarketData: Send + Sync {
    /// 获取实时行情（价格、涨跌、公司信息，不含图表）
    async fn get_quote(&self, ticker: &str) -> Result<StockData>;

    /// 获取指定日期的历史收盘价
    ///
    /// 日期落在周末时由实现方自动回退到上一交易日（周五）
    async fn get_historical_price(&self, ticker: &str, date: NaiveDate) -> Result<f64>;
}

/// 持仓存储
#[async_trait]
pub trait StockStore: Send + Sync {
    /// 按用户加载全部持仓记录（按 id 倒序，最新的在前）
    async fn load_stocks(&self, user_id: &str) -> Result<Vec<StockRecord>>;

    /// 查找用户是否已持有某只股票
    async fn find_stock(&self, user_id: &str, ticker: &str) -> Result<Option<StockRecord>>;

    /// 保存新持仓，返回数据库生成的完整记录
    async fn save_stock(&self, record: &NewStockRecord) -> Result<StockRecord>;

    /// 删除持仓（同时校验归属用户）
    async fn remove_stock(&self, id: i64, user_id: &str) -> Result<()>;
}
