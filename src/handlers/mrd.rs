use actix_web::{HttpResponse, Responder, get, http::header::ContentType, web};
use byteorder::{LittleEndian, WriteBytesExt};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::handlers::run_blocking;

#[derive(Deserialize)]
pub struct DataQuery {
    /// 幅值阈值，缺省为 0（不过滤）
    pub threshold: Option<f64>,
}

/// 数据集摘要：文件头、形状与参数块文本
#[get("/api/mrd/{index}")]
pub async fn get_mrd_summary(data: web::Data<AppState>, path: web::Path<usize>) -> impl Responder {
    let index = path.into_inner();
    let pipeline = data.pipeline.clone();
    match run_blocking(move || pipeline.load(index).map(|file| file.summary())).await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(resp) => resp,
    }
}

/// 阈值处理后的原始数据
/// 以小端 f64 (实部, 虚部) 对按列主序输出，形状放在响应头中
#[get("/api/mrd/{index}/data")]
pub async fn get_mrd_data(
    data: web::Data<AppState>,
    path: web::Path<usize>,
    query: web::Query<DataQuery>,
) -> impl Responder {
    let index = path.into_inner();
    let threshold = query.threshold.unwrap_or(0.0);
    let pipeline = data.pipeline.clone();

    let dataset = match run_blocking(move || pipeline.process(index, threshold)).await {
        Ok(dataset) => dataset,
        Err(resp) => return resp,
    };

    let pairs = dataset.column_major_pairs();
    let mut bytes = Vec::with_capacity(pairs.len() * 2 * std::mem::size_of::<f64>());
    for (re, im) in pairs {
        if let Err(e) = bytes
            .write_f64::<LittleEndian>(re)
            .and_then(|_| bytes.write_f64::<LittleEndian>(im))
        {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "io",
                "details": e.to_string(),
            }));
        }
    }

    let shape = dataset
        .shape()
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",");

    HttpResponse::Ok()
        .content_type(ContentType::octet_stream())
        .append_header(("X-Mrd-Shape", shape))
        .append_header(("X-Mrd-Complex", dataset.is_complex().to_string()))
        .append_header(("X-Mrd-Threshold", threshold.to_string()))
        .body(bytes)
}
