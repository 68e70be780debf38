//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，环境变量覆盖文件值，
//! 两者都缺失时退回默认值

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// Polygon.io 行情配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonConfig {
    /// API 基础地址
    #[serde(default = "default_polygon_base_url")]
    pub base_url: String,
    /// API Key（缺失时行情请求会被 Polygon 拒绝）
    #[serde(default)]
    pub api_key: String,
}

/// Supabase 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// 项目 URL（如 https://xxx.supabase.co）
    #[serde(default)]
    pub url: String,
    /// anon key，服务端以该身份访问 PostgREST
    #[serde(default)]
    pub anon_key: String,
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// Polygon 行情配置
    #[serde(default)]
    pub polygon: PolygonConfig,
    /// Supabase 存储配置
    #[serde(default)]
    pub supabase: SupabaseConfig,
    /// 允许跨域的前端来源
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_polygon_base_url() -> String { "https://api.polygon.io".to_string() }
fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5174".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for PolygonConfig {
    fn default() -> Self {
        Self {
            base_url: default_polygon_base_url(),
            api_key: String::new(),
        }
    }
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            polygon: PolygonConfig::default(),
            supabase: SupabaseConfig::default(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// 解析逗号分隔的来源列表
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置：文件 → 环境变量覆盖 → 占位兜底
    pub fn load() -> Self {
        let config_paths = ["config.json", "config/config.json"];

        let mut config = Self::default();
        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(loaded) => {
                        log::info!("从 {} 加载配置成功", path);
                        config = loaded;
                        break;
                    }
                    Err(e) => {
                        log::warn!("加载配置文件 {} 失败: {}", path, e);
                    }
                }
            }
        }

        config.apply_env();
        config.fill_placeholders();
        config
    }

    /// 环境变量覆盖文件配置，方便容器化部署
    fn apply_env(&mut self) {
        if let Ok(port) = env::var("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => log::warn!("PORT 环境变量无法解析: {}", e),
            }
        }
        if let Ok(key) = env::var("POLYGON_API_KEY") {
            self.polygon.api_key = key;
        }
        if let Ok(url) = env::var("POLYGON_BASE_URL") {
            self.polygon.base_url = url;
        }
        if let Ok(url) = env::var("SUPABASE_URL") {
            self.supabase.url = url;
        }
        if let Ok(key) = env::var("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = key;
        }
        if let Ok(origins) = env::var("ALLOWED_ORIGINS") {
            let origins = parse_origins(&origins);
            if !origins.is_empty() {
                self.allowed_origins = origins;
            }
        }
    }

    /// 缺失的凭证用占位值兜底，进程照常启动但对应接口会失败
    fn fill_placeholders(&mut self) {
        if self.supabase.url.is_empty() || self.supabase.anon_key.is_empty() {
            log::error!("缺少 Supabase 配置（SUPABASE_URL / SUPABASE_ANON_KEY），持仓存储不可用");
        }
        if self.supabase.url.is_empty() {
            self.supabase.url = "https://placeholder.supabase.co".to_string();
        }
        if self.supabase.anon_key.is_empty() {
            self.supabase.anon_key = "placeholder-key".to_string();
        }
        if self.polygon.api_key.is_empty() {
            log::warn!("缺少 Polygon API Key（POLYGON_API_KEY），行情请求将被拒绝");
        }
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
