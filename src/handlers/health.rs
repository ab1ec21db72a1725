use actix_web::{HttpResponse, Responder, get, web};

use crate::app_state::AppState;

/// 根路径健康检查/服务说明
#[get("/")]
pub async fn hello(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "HP-MRI 数据服务",
        "storage_backend": data.catalog.storage().name(),
        "storage_root": data.storage_root,
        "endpoints": [
            "/api/datasets",
            "/api/proton/count",
            "/api/proton/{index}",
            "/api/mrd/{index}",
            "/api/mrd/{index}/data?threshold=<value>",
        ],
    }))
}
