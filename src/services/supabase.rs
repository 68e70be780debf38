//! Supabase 持仓存储实现
//!
//! 通过 PostgREST 接口读写 stock_watcher 表
//! 对接 {SUPABASE_URL}/rest/v1/，认证使用项目的 anon key

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use url::Url;

use crate::config::SupabaseConfig;
use crate::models::{NewStockRecord, StockRecord};
use crate::services::traits::StockStore;

/// Supabase PostgREST 客户端
///
/// 在进程启动时构造一次，通过 web::Data 注入，进程退出时随之释放
pub struct SupabaseClient {
    client: Client,
    rest_url: Url,
    anon_key: String,
}

impl SupabaseClient {
    /// 创建客户端，base url 取自配置的项目地址
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let mut base = Url::parse(&config.url)
            .map_err(|e| anyhow!("Supabase url 配置无效: {}", e))?;
        // 相对拼接要求路径以斜杠结尾，配置里的路径前缀原样保留
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let rest_url = base.join("rest/v1/")?;
        Ok(Self {
            client: Client::new(),
            rest_url,
            anon_key: config.anon_key.clone(),
        })
    }

    /// stock_watcher 表的完整地址
    fn table_url(&self) -> Result<Url> {
        Ok(self.rest_url.join("stock_watcher")?)
    }

    /// 构造带认证头的请求
    fn table_request(&self, method: Method) -> Result<RequestBuilder> {
        let builder = self
            .client
            .request(method, self.table_url()?)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key));
        Ok(builder)
    }
}

#[async_trait]
impl StockStore for SupabaseClient {
    async fn load_stocks(&self, user_id: &str) -> Result<Vec<StockRecord>> {
        let user_filter = format!("eq.{}", user_id);
        let response = self
            .table_request(Method::GET)?
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("order", "id.desc"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            log::error!("加载持仓记录失败: {}", response.status());
            return Err(anyhow!("Failed to load stocks from database"));
        }

        Ok(response.json().await?)
    }

    async fn find_stock(&self, user_id: &str, ticker: &str) -> Result<Option<StockRecord>> {
        let user_filter = format!("eq.{}", user_id);
        let ticker_filter = format!("eq.{}", ticker);
        let response = self
            .table_request(Method::GET)?
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("ticker", ticker_filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            log::error!("查询持仓记录失败: {}", response.status());
            return Err(anyhow!("Failed to load stocks from database"));
        }

        let mut rows: Vec<StockRecord> = response.json().await?;
        Ok(rows.pop())
    }

    async fn save_stock(&self, record: &NewStockRecord) -> Result<StockRecord> {
        // Prefer 头让 PostgREST 回传插入后的完整行（含生成的 id）
        let response = self
            .table_request(Method::POST)?
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await?;

        if !response.status().is_success() {
            log::error!(
                "保存持仓 {} 失败: {}",
                record.ticker,
                response.status()
            );
            return Err(anyhow!("Failed to save stock to database"));
        }

        let mut rows: Vec<StockRecord> = response.json().await?;
        rows.pop()
            .ok_or_else(|| anyhow!("No data returned from database after insert"))
    }

    async fn remove_stock(&self, id: i64, user_id: &str) -> Result<()> {
        let id_filter = format!("eq.{}", id);
        let user_filter = format!("eq.{}", user_id);
        let response = self
            .table_request(Method::DELETE)?
            .query(&[
                ("id", id_filter.as_str()),
                ("user_id", user_filter.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            log::error!("删除持仓 {} 失败: {}", id, response.status());
            return Err(anyhow!("Failed to remove stock from database"));
        }

        Ok(())
    }
}
