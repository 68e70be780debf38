//! 持仓接口
//!
//! 加载、添加、刷新、删除四个操作，输入输出统一用 ApiResponse 包装。
//! 用户身份由认证中间件注入，这里只管业务编排结果到状态码的映射。

use actix_web::{web, HttpResponse, Result};

use crate::middleware::UserId;
use crate::models::{AddStockRequest, ApiResponse, Position};
use crate::services::polygon::PolygonClient;
use crate::services::portfolio_service::{self, PortfolioError};
use crate::services::supabase::SupabaseClient;

/// GET /api/v1/portfolio 加载当前用户的全部持仓（带实时行情和盈亏）
pub async fn get_portfolio(
    user: UserId,
    market: web::Data<PolygonClient>,
    store: web::Data<SupabaseClient>,
) -> Result<HttpResponse> {
    match portfolio_service::load_portfolio(market.get_ref(), store.get_ref(), user.as_str()).await
    {
        Ok(positions) => Ok(HttpResponse::Ok().json(ApiResponse::success(positions))),
        Err(PortfolioError::Invalid(msg)) => {
            Ok(HttpResponse::BadRequest().json(ApiResponse::<Vec<Position>>::error(msg)))
        }
        Err(PortfolioError::Internal(e)) => Ok(HttpResponse::InternalServerError()
            .json(ApiResponse::<Vec<Position>>::error(e.to_string()))),
    }
}

/// POST /api/v1/portfolio 添加一只持仓
pub async fn add_stock(
    user: UserId,
    market: web::Data<PolygonClient>,
    store: web::Data<SupabaseClient>,
    payload: web::Json<AddStockRequest>,
) -> Result<HttpResponse> {
    match portfolio_service::add_stock(market.get_ref(), store.get_ref(), user.as_str(), &payload)
        .await
    {
        Ok(position) => Ok(HttpResponse::Ok().json(ApiResponse::success(position))),
        Err(PortfolioError::Invalid(msg)) => {
            Ok(HttpResponse::BadRequest().json(ApiResponse::<Position>::error(msg)))
        }
        Err(PortfolioError::Internal(e)) => Ok(HttpResponse::InternalServerError()
            .json(ApiResponse::<Position>::error(e.to_string()))),
    }
}

/// POST /api/v1/portfolio/refresh 刷新列表中所有持仓的实时价格
///
/// 请求体是当前展示的持仓列表，返回整体替换后的新列表。
/// 单只股票刷新失败保留原值，接口本身不会失败。
pub async fn refresh_prices(
    market: web::Data<PolygonClient>,
    payload: web::Json<Vec<Position>>,
) -> Result<HttpResponse> {
    let refreshed =
        portfolio_service::refresh_positions(market.get_ref(), payload.into_inner()).await;
    Ok(HttpResponse::Ok().json(ApiResponse::success(refreshed)))
}

/// DELETE /api/v1/portfolio/{id} 删除一只持仓
pub async fn remove_stock(
    user: UserId,
    store: web::Data<SupabaseClient>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    match portfolio_service::remove_stock(store.get_ref(), id, user.as_str()).await {
        Ok(()) => {
            Ok(HttpResponse::Ok().json(ApiResponse::<()>::message("Stock deleted successfully")))
        }
        Err(PortfolioError::Invalid(msg)) => {
            Ok(HttpResponse::BadRequest().json(ApiResponse::<()>::error(msg)))
        }
        Err(PortfolioError::Internal(e)) => {
            Ok(HttpResponse::InternalServerError().json(ApiResponse::<()>::error(e.to_string())))
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/portfolio")
            .route("", web::get().to(get_portfolio))
            .route("", web::post().to(add_stock))
            .route("/refresh", web::post().to(refresh_prices))
            .route("/{id}", web::delete().to(remove_stock)),
    );
}
