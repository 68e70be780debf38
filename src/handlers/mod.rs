pub mod health;
pub mod portfolio;
pub mod stock;

use actix_web::web;

use crate::middleware::UserAuthMiddleware;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .wrap(UserAuthMiddleware)
            .configure(health::config)
            .configure(portfolio::config)
            .configure(stock::config),
    );
}
