use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use super::{StorageGateway, join_key};
use crate::error::{Error, Result};

/// 本地文件系统存储
/// 所有键都相对于 `root` 解析，列举结果按字典序排序
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 创建根目录以及给定的子目录
    pub fn with_layout(root: impl Into<PathBuf>, prefixes: &[&str]) -> Result<Self> {
        let storage = Self::new(root);
        fs::create_dir_all(&storage.root)?;
        for prefix in prefixes {
            fs::create_dir_all(storage.resolve(prefix)?)?;
        }
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 将存储键转换为本地路径，拒绝 `..` 与绝对路径
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(Error::InvalidKey(key.to_string())),
            }
        }
        Ok(path)
    }

    fn not_found(key: &str, err: std::io::Error) -> Error {
        if err.kind() == ErrorKind::NotFound {
            Error::NotFound(key.to_string())
        } else {
            Error::Io(err)
        }
    }
}

impl StorageGateway for LocalStorage {
    fn list_objects(&self, prefix: &str, delimiter: Option<char>) -> Result<Vec<String>> {
        let dir = self.resolve(prefix)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(prefix, "前缀不存在，返回空列表");
                return Ok(Vec::new());
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().map(str::to_string) else {
                warn!(prefix, name = ?file_name, "跳过非 UTF-8 文件名");
                continue;
            };

            match delimiter {
                Some(delim) if file_type.is_dir() => {
                    keys.push(format!("{}{}", join_key(prefix, &name), delim));
                }
                None if file_type.is_file() => keys.push(join_key(prefix, &name)),
                _ => {}
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        fs::read(&full_path).map_err(|e| Self::not_found(path, e))
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path)?;
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, data)?;
        Ok(())
    }

    fn download_to_local(&self, path: &str, destination: &Path) -> Result<()> {
        let full_path = self.resolve(path)?;
        if !full_path.is_file() {
            return Err(Error::NotFound(path.to_string()));
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&full_path, destination).map_err(|e| Self::not_found(path, e))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
