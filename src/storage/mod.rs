mod local;

use std::path::Path;

use crate::error::Result;

pub use local::LocalStorage;

/// 对象存储网关 trait
/// 以 `/` 分隔的字符串键寻址，不同后端（本地目录、远程对象存储）需要实现这个 trait
///
/// 所有调用都是阻塞 I/O，超时与重试由调用方负责
pub trait StorageGateway: Send + Sync {
    /// 列举前缀下的条目，返回完整的键
    /// - 带分隔符：返回直接子目录，形如 `MRS/epsi/run1/`
    /// - 不带分隔符：返回前缀下的对象键
    ///
    /// 前缀不存在时返回空列表
    fn list_objects(&self, prefix: &str, delimiter: Option<char>) -> Result<Vec<String>>;

    /// 读取整个对象
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// 写入对象，必要时创建父级
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;

    /// 将对象下载到本地文件
    fn download_to_local(&self, path: &str, destination: &Path) -> Result<()>;

    /// 后端名称（用于日志和服务信息）
    fn name(&self) -> &'static str;
}

/// 拼接存储键，保证前缀与名称之间只有一个 `/`
pub fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        return name.trim_start_matches('/').to_string();
    }
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}

/// 取键的最后一段（文件名）
pub fn key_file_name(key: &str) -> &str {
    key.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(key)
}
