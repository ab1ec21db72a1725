//! 服务配置
//!
//! 从 TOML 文件加载，缺省字段使用默认值，随后再应用环境变量覆盖：
//!
//! ```toml
//! [storage]
//! root = "./local_storage"
//! epsi_prefix = "MRS/epsi/"
//! proton_prefix = "MRS/proton/"
//!
//! [proton]
//! series_prefix = "5091"
//! flat_image = "reject"
//!
//! [catalog]
//! cache_ttl_secs = 0
//!
//! [server]
//! bind = "127.0.0.1"
//! port = 5000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::proton::FlatImagePolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub proton: ProtonConfig,
    pub catalog: CatalogConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// 本地存储布局
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 存储根目录
    pub root: PathBuf,
    /// EPSI 数据集目录前缀（相对于根目录）
    pub epsi_prefix: String,
    /// 质子 DICOM 切片目录前缀（相对于根目录）
    pub proton_prefix: String,
    /// 启动时自动创建上述目录
    pub create_layout: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./local_storage"),
            epsi_prefix: "MRS/epsi/".to_string(),
            proton_prefix: "MRS/proton/".to_string(),
            create_layout: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtonConfig {
    /// 切片文件名前缀，例如 `5091_00007.dcm` 中的 `5091`
    pub series_prefix: String,
    /// 原始像素的底噪阈值
    pub raw_floor: f64,
    /// 归一化后的显示阈值
    pub display_floor: f64,
    pub flat_image: FlatImagePolicy,
    /// 下载 DICOM 时使用的临时目录，默认使用系统临时目录
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ProtonConfig {
    fn default() -> Self {
        Self {
            series_prefix: "5091".to_string(),
            raw_floor: 5.0,
            display_floor: 0.05,
            flat_image: FlatImagePolicy::default(),
            scratch_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// 数据集列表缓存时间（秒），0 表示每次都重新列举
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// 从 TOML 文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("无法读取 {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// 使用进程环境变量覆盖配置
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// 按变量名查询覆盖值，便于在不修改进程环境的情况下测试
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("LOCAL_STORAGE_PATH") {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(bind) = lookup("HPMRI_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = lookup("HPMRI_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("HPMRI_PORT={}: {}", port, e)))?;
        }
        if let Some(prefix) = lookup("PROTON_SERIES_PREFIX") {
            self.proton.series_prefix = prefix;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.proton.display_floor.is_finite() && (0.0..=1.0).contains(&self.proton.display_floor)) {
            return Err(Error::Config(format!(
                "proton.display_floor 必须在 [0, 1] 之间，当前为 {}",
                self.proton.display_floor
            )));
        }
        if !self.proton.raw_floor.is_finite() {
            return Err(Error::Config("proton.raw_floor 必须是有限值".to_string()));
        }
        if self.proton.series_prefix.is_empty() {
            return Err(Error::Config("proton.series_prefix 不能为空".to_string()));
        }
        Ok(())
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.proton
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
