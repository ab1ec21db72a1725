use actix_web::{HttpResponse, Responder, get, http::header::ContentType, web};

use crate::app_state::AppState;
use crate::handlers::run_blocking;

/// 质子切片数量（前端滑块的取值范围）
#[get("/api/proton/count")]
pub async fn count_proton_slices(data: web::Data<AppState>) -> impl Responder {
    let catalog = data.catalog.clone();
    match run_blocking(move || catalog.count_slice_files()).await {
        Ok(count) => HttpResponse::Ok().json(serde_json::json!({ "count": count })),
        Err(resp) => resp,
    }
}

/// 渲染质子切片并以 PNG 返回
#[get("/api/proton/{index}")]
pub async fn get_proton_slice(data: web::Data<AppState>, path: web::Path<u32>) -> impl Responder {
    let index = path.into_inner();
    let renderer = data.renderer.clone();
    let options = data.render_options;

    let png = run_blocking(move || renderer.render(index, &options)?.to_png()).await;
    match png {
        Ok(bytes) => HttpResponse::Ok().content_type(ContentType::png()).body(bytes),
        Err(resp) => resp,
    }
}
