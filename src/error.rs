use thiserror::Error;

/// 核心模块统一的错误类型
/// 解码器与渲染器的任何异常输入都必须映射到这里的某一种错误，不允许静默返回空值
#[derive(Debug, Error)]
pub enum Error {
    /// MRD 文件头无效：长度不足、维度为负或点数乘积溢出
    #[error("MRD 文件头无效: {0}")]
    MalformedHeader(String),

    #[error("不支持的 MRD 元素类型代码: {0}")]
    UnsupportedElementType(i16),

    /// 数据区超出文件末尾
    #[error("MRD 文件被截断: 需要 {expected} 字节，实际只有 {actual} 字节")]
    TruncatedFile { expected: usize, actual: usize },

    #[error("目录中没有 .MRD 文件: {0}")]
    NoMrdFile(String),

    #[error("数据集索引越界: {index}（共 {count} 个数据集）")]
    DatasetNotFound { index: usize, count: usize },

    #[error("找不到质子切片 {index}: {key}")]
    SliceNotFound { index: u32, key: String },

    #[error("DICOM 解码失败: {0}")]
    DicomDecode(String),

    /// 像素最大值等于最小值，无法归一化
    #[error("切片像素值全部相同 ({value})，无法归一化")]
    DegenerateImage { value: f64 },

    #[error("图像编码失败: {0}")]
    ImageEncode(String),

    #[error("阈值无效: {0}")]
    InvalidThreshold(f64),

    #[error("存储中不存在: {0}")]
    NotFound(String),

    /// 存储键包含 `..` 或绝对路径
    #[error("非法的存储键: {0}")]
    InvalidKey(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// 错误种类的稳定名称，用于 HTTP 响应体与日志字段
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedHeader(_) => "malformed_header",
            Error::UnsupportedElementType(_) => "unsupported_element_type",
            Error::TruncatedFile { .. } => "truncated_file",
            Error::NoMrdFile(_) => "no_mrd_file",
            Error::DatasetNotFound { .. } => "dataset_not_found",
            Error::SliceNotFound { .. } => "slice_not_found",
            Error::DicomDecode(_) => "dicom_decode",
            Error::DegenerateImage { .. } => "degenerate_image",
            Error::ImageEncode(_) => "image_encode",
            Error::InvalidThreshold(_) => "invalid_threshold",
            Error::NotFound(_) => "not_found",
            Error::InvalidKey(_) => "invalid_key",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
