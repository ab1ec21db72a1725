use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::storage::{StorageGateway, key_file_name};

/// MRD 文件后缀（区分大小写）
pub const MRD_SUFFIX: &str = ".MRD";
/// 质子切片文件后缀
pub const DICOM_SUFFIX: &str = ".dcm";

/// 一个 EPSI 数据集：列举顺序中的位置与目录前缀
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetEntry {
    pub index: usize,
    /// 目录前缀，以 `/` 结尾，例如 `MRS/epsi/run1/`
    pub folder: String,
}

impl DatasetEntry {
    pub fn name(&self) -> &str {
        key_file_name(&self.folder)
    }
}

/// 数据集列表快照，创建后不可修改，刷新时整体替换
struct Snapshot {
    entries: Arc<Vec<DatasetEntry>>,
    taken_at: Instant,
}

/// 数据集目录
///
/// 数据集顺序即存储网关的列举顺序；本地存储保证按字典序返回，
/// 其他后端若不保证稳定顺序，数据集索引在不同调用之间可能变化
pub struct DatasetCatalog {
    storage: Arc<dyn StorageGateway>,
    epsi_prefix: String,
    proton_prefix: String,
    /// None 表示不缓存，每次调用都重新列举
    cache_ttl: Option<Duration>,
    snapshot: RwLock<Option<Snapshot>>,
}

impl DatasetCatalog {
    pub fn new(
        storage: Arc<dyn StorageGateway>,
        epsi_prefix: impl Into<String>,
        proton_prefix: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            epsi_prefix: epsi_prefix.into(),
            proton_prefix: proton_prefix.into(),
            cache_ttl: None,
            snapshot: RwLock::new(None),
        }
    }

    /// 启用数据集列表缓存，`ttl` 为零时等同于不缓存
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    pub fn storage(&self) -> &Arc<dyn StorageGateway> {
        &self.storage
    }

    pub fn proton_prefix(&self) -> &str {
        &self.proton_prefix
    }

    /// 列举所有数据集
    pub fn list_datasets(&self) -> Result<Vec<DatasetEntry>> {
        Ok(self.entries()?.as_ref().clone())
    }

    pub fn count_datasets(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    /// 按索引获取数据集
    pub fn dataset(&self, index: usize) -> Result<DatasetEntry> {
        let entries = self.entries()?;
        entries.get(index).cloned().ok_or(Error::DatasetNotFound {
            index,
            count: entries.len(),
        })
    }

    /// 找到数据集目录中第一个以 `.MRD` 结尾的文件，返回其存储键
    pub fn resolve_mrd_file(&self, index: usize) -> Result<String> {
        let entry = self.dataset(index)?;
        let files = self.storage.list_objects(&entry.folder, None)?;
        files
            .into_iter()
            .find(|key| key_file_name(key).ends_with(MRD_SUFFIX))
            .ok_or(Error::NoMrdFile(entry.folder))
    }

    /// 读取数据集的 MRD 文件内容
    pub fn read_mrd(&self, index: usize) -> Result<(String, Vec<u8>)> {
        let key = self.resolve_mrd_file(index)?;
        let bytes = self.storage.read_file(&key)?;
        debug!(index, key = %key, bytes = bytes.len(), "读取 MRD 文件");
        Ok((key, bytes))
    }

    /// 统计质子切片（`.dcm`）数量
    pub fn count_slice_files(&self) -> Result<usize> {
        let files = self.storage.list_objects(&self.proton_prefix, None)?;
        Ok(files
            .iter()
            .filter(|key| key.ends_with(DICOM_SUFFIX))
            .count())
    }

    /// 丢弃缓存的快照，下次调用时重新列举
    pub fn invalidate(&self) {
        self.snapshot.write().take();
    }

    /// 清理过期的快照
    /// 返回是否清理了快照
    pub fn evict_expired(&self) -> bool {
        let Some(ttl) = self.cache_ttl else {
            return false;
        };
        let mut snapshot = self.snapshot.write();
        match snapshot.as_ref() {
            Some(current) if current.taken_at.elapsed() >= ttl => {
                snapshot.take();
                true
            }
            _ => false,
        }
    }

    fn entries(&self) -> Result<Arc<Vec<DatasetEntry>>> {
        let Some(ttl) = self.cache_ttl else {
            return self.fetch().map(Arc::new);
        };

        if let Some(current) = self.snapshot.read().as_ref() {
            if current.taken_at.elapsed() < ttl {
                return Ok(current.entries.clone());
            }
        }

        // 列举在锁外进行，读者在刷新期间继续使用旧快照
        let entries = Arc::new(self.fetch()?);
        *self.snapshot.write() = Some(Snapshot {
            entries: entries.clone(),
            taken_at: Instant::now(),
        });
        Ok(entries)
    }

    fn fetch(&self) -> Result<Vec<DatasetEntry>> {
        let folders = self.storage.list_objects(&self.epsi_prefix, Some('/'))?;
        let entries: Vec<DatasetEntry> = folders
            .into_iter()
            .enumerate()
            .map(|(index, folder)| DatasetEntry { index, folder })
            .collect();
        info!(
            backend = self.storage.name(),
            prefix = %self.epsi_prefix,
            count = entries.len(),
            "列举 EPSI 数据集"
        );
        Ok(entries)
    }
}
