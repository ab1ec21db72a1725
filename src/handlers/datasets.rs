use actix_web::{HttpResponse, Responder, get, web};

use crate::app_state::AppState;
use crate::handlers::run_blocking;

/// 列出所有 EPSI 数据集
#[get("/api/datasets")]
pub async fn list_datasets(data: web::Data<AppState>) -> impl Responder {
    let catalog = data.catalog.clone();
    match run_blocking(move || catalog.list_datasets()).await {
        Ok(datasets) => HttpResponse::Ok().json(serde_json::json!({
            "count": datasets.len(),
            "datasets": datasets,
        })),
        Err(resp) => resp,
    }
}
