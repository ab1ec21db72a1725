use std::sync::Arc;
use std::time::Duration;

use crate::catalog::DatasetCatalog;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::HpMriPipeline;
use crate::proton::{DicomSliceDecoder, ProtonRenderer, RenderOptions, SliceDecoder};
use crate::storage::{LocalStorage, StorageGateway};

/// 全局应用状态，负责在各个 handler 之间共享目录、渲染器与处理流程
pub struct AppState {
    pub catalog: Arc<DatasetCatalog>,
    pub renderer: Arc<ProtonRenderer>,
    pub pipeline: Arc<HpMriPipeline>,
    pub render_options: RenderOptions,
    pub storage_root: String,
}

impl AppState {
    /// 按配置组装本地存储与核心组件
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = if config.storage.create_layout {
            LocalStorage::with_layout(
                &config.storage.root,
                &[
                    config.storage.epsi_prefix.as_str(),
                    config.storage.proton_prefix.as_str(),
                ],
            )?
        } else {
            LocalStorage::new(&config.storage.root)
        };
        Ok(Self::with_components(
            config,
            Arc::new(storage),
            Arc::new(DicomSliceDecoder),
        ))
    }

    /// 使用指定的存储与解码器组装状态
    pub fn with_components(
        config: &Config,
        storage: Arc<dyn StorageGateway>,
        decoder: Arc<dyn SliceDecoder>,
    ) -> Self {
        let catalog = Arc::new(
            DatasetCatalog::new(
                storage.clone(),
                config.storage.epsi_prefix.clone(),
                config.storage.proton_prefix.clone(),
            )
            .with_cache_ttl(Duration::from_secs(config.catalog.cache_ttl_secs)),
        );
        let renderer = Arc::new(ProtonRenderer::new(
            storage,
            decoder,
            config.storage.proton_prefix.clone(),
            config.proton.series_prefix.clone(),
            config.scratch_dir(),
        ));
        let pipeline = Arc::new(HpMriPipeline::new(catalog.clone()));

        Self {
            catalog,
            renderer,
            pipeline,
            render_options: RenderOptions::from(&config.proton),
            storage_root: config.storage.root.display().to_string(),
        }
    }
}
