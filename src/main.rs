use std::path::Path;

use actix_web::{App, HttpServer, web};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hpmri_backend::app_state::AppState;
use hpmri_backend::config::Config;
use hpmri_backend::routes;

/// 读取配置：`HPMRI_CONFIG` 指向的 TOML 文件（不存在时使用默认值），再应用环境变量
fn load_config() -> hpmri_backend::Result<Config> {
    let path = std::env::var("HPMRI_CONFIG").unwrap_or_else(|_| "hpmri.toml".to_string());
    let mut config = if Path::new(&path).exists() {
        Config::load(&path)?
    } else {
        Config::default()
    };
    config.apply_env()?;
    Ok(config)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR] {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app_state = match AppState::from_config(&config) {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            error!(error = %e, "初始化存储失败");
            std::process::exit(1);
        }
    };

    // 启动后台清理任务：定期丢弃过期的数据集列表快照
    if config.catalog.cache_ttl_secs > 0 {
        let catalog = app_state.catalog.clone();
        let period = std::time::Duration::from_secs(config.catalog.cache_ttl_secs);
        actix_web::rt::spawn(async move {
            let mut interval = actix_web::rt::time::interval(period);
            loop {
                interval.tick().await;
                if catalog.evict_expired() {
                    info!("[清理任务] 数据集列表快照已过期，下次请求时重新列举");
                }
            }
        });
    }

    info!(
        root = %config.storage.root.display(),
        epsi = %config.storage.epsi_prefix,
        proton = %config.storage.proton_prefix,
        series = %config.proton.series_prefix,
        "存储布局"
    );
    info!("服务器启动在 http://{}:{}", config.server.bind, config.server.port);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(routes::configure)
    })
    .bind((config.server.bind.as_str(), config.server.port))?
    .run()
    .await
}
