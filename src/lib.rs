//! HP-MRI 数据服务
//!
//! 读取 MR-Solutions 扫描仪输出的 `.MRD` 原始数据与质子 DICOM 切片，
//! 转换为可视化使用的复数数组与 8 位灰度图像。

pub mod app_state;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mrd;
pub mod pipeline;
pub mod proton;
pub mod routes;
pub mod storage;

pub use error::{Error, Result};
