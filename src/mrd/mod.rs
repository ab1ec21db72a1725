//! MR-Solutions `.MRD` 原始数据文件解码

mod decoder;
mod header;

pub use decoder::{AxisOrder, MrdFile, MrdSummary, ParameterBlock, RawDataset, decode, reshape};
pub use header::{ElementType, HEADER_SIZE, MrdHeader, Primitive};
