use actix_web::web;

use crate::handlers;

/// 统一注册 HTTP 路由，方便集中管理
pub fn configure(cfg: &mut web::ServiceConfig) {
    // /api/proton/count 必须先于 /api/proton/{index} 注册
    cfg.service(handlers::hello)
        .service(handlers::list_datasets)
        .service(handlers::count_proton_slices)
        .service(handlers::get_proton_slice)
        .service(handlers::get_mrd_summary)
        .service(handlers::get_mrd_data);
}
