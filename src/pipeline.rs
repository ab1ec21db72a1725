use std::sync::Arc;

use num_complex::Complex64;
use tracing::info;

use crate::catalog::DatasetCatalog;
use crate::error::{Error, Result};
use crate::mrd::{self, MrdFile, RawDataset};

/// 幅值门限：幅值严格小于阈值的元素置 0，阈值为 0 时不改变数据
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeGate {
    threshold: f64,
}

impl MagnitudeGate {
    pub fn new(threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(Error::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// 返回门限处理后的新数组，输入保持不变
    pub fn apply(&self, data: &RawDataset) -> RawDataset {
        let threshold = self.threshold;
        match data {
            RawDataset::Complex(array) => RawDataset::Complex(array.mapv(|z| {
                if z.norm() < threshold { Complex64::new(0.0, 0.0) } else { z }
            })),
            RawDataset::Real(array) => {
                RawDataset::Real(array.mapv(|x| if x.abs() < threshold { 0.0 } else { x }))
            }
        }
    }
}

/// HP-MRI 数据处理流程：目录定位 → MRD 解码 → 阈值处理
pub struct HpMriPipeline {
    catalog: Arc<DatasetCatalog>,
}

impl HpMriPipeline {
    pub fn new(catalog: Arc<DatasetCatalog>) -> Self {
        Self { catalog }
    }

    /// 读取并解码指定数据集
    pub fn load(&self, dataset_index: usize) -> Result<MrdFile> {
        let (key, bytes) = self.catalog.read_mrd(dataset_index)?;
        let file = mrd::decode(&bytes)?;
        info!(
            dataset_index,
            key = %key,
            shape = ?file.data.shape(),
            element_type = file.header.element_type.code(),
            "MRD 数据集已加载"
        );
        Ok(file)
    }

    /// 解码指定数据集并应用阈值
    pub fn process(&self, dataset_index: usize, threshold: f64) -> Result<RawDataset> {
        let gate = MagnitudeGate::new(threshold)?;
        let file = self.load(dataset_index)?;
        Ok(gate.apply(&file.data))
    }
}
