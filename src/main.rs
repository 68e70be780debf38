//! Wise Assist 后端服务
//!
//! 个人持仓跟踪的 RESTful API：实时行情、盈亏计算、持仓管理
//! 行情来源 Polygon.io，持仓存储使用 Supabase

mod config;     // 配置加载
mod handlers;   // HTTP 请求处理器
mod middleware; // 中间件
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use crate::config::AppConfig;
use crate::services::polygon::PolygonClient;
use crate::services::supabase::SupabaseClient;

/// 应用程序入口
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 本地开发从 .env 读取环境变量，生产环境直接注入
    dotenvy::dotenv().ok();

    // 初始化日志系统，默认日志级别为 info
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::load();

    // 两个下游客户端进程级构造一次，handler 间共享
    let polygon = web::Data::new(PolygonClient::new(&config.polygon)?);
    let supabase = web::Data::new(SupabaseClient::new(&config.supabase)?);

    let bind_addr = config.bind_addr();
    log::info!("启动 Wise Assist 后端服务，监听 {}", bind_addr);

    let allowed_origins = config.allowed_origins.clone();
    let mut server = HttpServer::new(move || {
        // 浏览器前端跨域白名单
        let mut cors = Cors::default()
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);
        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(Logger::default())  // 请求日志中间件
            .wrap(cors)
            .app_data(polygon.clone())
            .app_data(supabase.clone())
            .configure(handlers::config)  // 配置路由
    })
    .bind(&bind_addr)?;

    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.run().await?;
    Ok(())
}
