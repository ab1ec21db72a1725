pub mod datasets;
pub mod health;
pub mod mrd;
pub mod proton;

use actix_web::{HttpResponse, web};
use tracing::warn;

use crate::error::Error;

pub use datasets::list_datasets;
pub use health::hello;
pub use mrd::{get_mrd_data, get_mrd_summary};
pub use proton::{count_proton_slices, get_proton_slice};

/// 将核心错误映射为 JSON 错误响应
pub fn error_response(err: &Error) -> HttpResponse {
    let mut builder = match err {
        Error::NotFound(_)
        | Error::NoMrdFile(_)
        | Error::DatasetNotFound { .. }
        | Error::SliceNotFound { .. } => HttpResponse::NotFound(),
        Error::InvalidThreshold(_) | Error::InvalidKey(_) => HttpResponse::BadRequest(),
        Error::MalformedHeader(_)
        | Error::UnsupportedElementType(_)
        | Error::TruncatedFile { .. }
        | Error::DicomDecode(_)
        | Error::DegenerateImage { .. } => HttpResponse::UnprocessableEntity(),
        Error::ImageEncode(_) | Error::Config(_) | Error::Io(_) => {
            HttpResponse::InternalServerError()
        }
    };
    warn!(kind = err.kind(), error = %err, "请求处理失败");
    builder.json(serde_json::json!({
        "error": err.kind(),
        "details": err.to_string(),
    }))
}

/// 在阻塞线程池中执行核心调用（存储访问均为阻塞 I/O）
pub async fn run_blocking<F, T>(f: F) -> Result<T, HttpResponse>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match web::block(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(error_response(&err)),
        Err(err) => Err(HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "blocking",
            "details": err.to_string(),
        }))),
    }
}
