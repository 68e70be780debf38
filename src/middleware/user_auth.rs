//! 用户身份中间件
//!
//! 前端把 Supabase 会话里的用户 ID 放进 Authorization: Bearer <user_id>，
//! 这里负责提取并注入请求扩展，缺失或格式不对直接返回 401。
//! 后端不验签，信任边界建立在部署拓扑上（仅允许自家前端来源）。

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
};
use futures::future::{err, ok, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::models::ApiResponse;

/// 已认证的用户 ID，handler 以提取器方式获取
#[derive(Debug, Clone)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<UserId>() {
            Some(user) => ok(user.clone()),
            // 只有路由忘记挂认证中间件时才会走到这里
            None => err(ErrorUnauthorized("Authorization header required")),
        }
    }
}

/// 用户认证中间件
pub struct UserAuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for UserAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = UserAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(UserAuthMiddlewareService {
            service: Rc::new(service),
        })
    }
}

pub struct UserAuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for UserAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            // 健康检查不需要身份
            if req.path().ends_with("/health") {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let header = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok());

            let header = match header {
                Some(value) => value,
                None => {
                    let response = HttpResponse::Unauthorized()
                        .json(ApiResponse::<()>::error("Authorization header required"));
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            match header.strip_prefix("Bearer ") {
                Some(user_id) if !user_id.is_empty() => {
                    req.extensions_mut().insert(UserId(user_id.to_string()));
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                _ => {
                    let response = HttpResponse::Unauthorized()
                        .json(ApiResponse::<()>::error("Invalid authorization format"));
                    Ok(req.into_response(response).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};

    async fn whoami(user: UserId) -> HttpResponse {
        HttpResponse::Ok().body(user.as_str().to_string())
    }

    async fn health() -> HttpResponse {
        HttpResponse::Ok().body("ok")
    }

    #[actix_web::test]
    async fn missing_header_returns_401() {
        let app = test::init_service(
            App::new()
                .wrap(UserAuthMiddleware)
                .route("/portfolio", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get().uri("/portfolio").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn non_bearer_header_returns_401() {
        let app = test::init_service(
            App::new()
                .wrap(UserAuthMiddleware)
                .route("/portfolio", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/portfolio")
            .insert_header(("Authorization", "Basic dXNlcg=="))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn bearer_user_id_reaches_handler() {
        let app = test::init_service(
            App::new()
                .wrap(UserAuthMiddleware)
                .route("/portfolio", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/portfolio")
            .insert_header(("Authorization", "Bearer user-123"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body = test::read_body(res).await;
        assert_eq!(&body[..], b"user-123");
    }

    #[actix_web::test]
    async fn health_endpoint_bypasses_auth() {
        let app = test::init_service(
            App::new()
                .wrap(UserAuthMiddleware)
                .route("/api/v1/health", web::get().to(health)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
