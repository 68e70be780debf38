//! 个股行情接口
//!
//! 供前端查询单只股票的完整行情和K线图数据

use actix_web::{web, HttpResponse, Result};

use crate::models::{ApiResponse, ChartData, ChartQuery, StockData};
use crate::services::polygon::PolygonClient;

/// GET /api/v1/stocks/{symbol} 查询个股完整行情（价格、涨跌、公司信息，不含图表）
pub async fn get_stock_info(
    market: web::Data<PolygonClient>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let symbol = path.into_inner().to_uppercase();

    match market.get_stock_data(&symbol, 0, None).await {
        Ok(stock_data) => {
            let response = ApiResponse::success(stock_data);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            let response = ApiResponse::<StockData>::error(e.to_string());
            Ok(HttpResponse::InternalServerError().json(response))
        }
    }
}

/// GET /api/v1/stocks/{symbol}/chart?days=30 查询K线图数据
///
/// days 不传默认 30，前端提供 30/60/90 三档
pub async fn get_stock_chart(
    market: web::Data<PolygonClient>,
    path: web::Path<String>,
    query: web::Query<ChartQuery>,
) -> Result<HttpResponse> {
    let symbol = path.into_inner().to_uppercase();
    let days = query.days.unwrap_or(30);

    match market.get_stock_chart_data(&symbol, days).await {
        Ok(chart) => {
            let response = ApiResponse::success(chart);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            let response = ApiResponse::<ChartData>::error(e.to_string());
            Ok(HttpResponse::InternalServerError().json(response))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/stocks")
            .route("/{symbol}", web::get().to(get_stock_info))
            .route("/{symbol}/chart", web::get().to(get_stock_chart)),
    );
}
