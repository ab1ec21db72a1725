use byteorder::{ByteOrder, LittleEndian};
use ndarray::{Array6, ShapeBuilder};
use num_complex::Complex64;
use serde::Serialize;
use tracing::debug;

use super::header::{HEADER_SIZE, MrdHeader, Primitive};
use crate::error::{Error, Result};

/// 一维数据展开到多维数组时的轴顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// 第一个轴变化最快（Fortran 顺序），MRD 文件使用这种布局
    ColumnMajor,
    /// 最后一个轴变化最快（C 顺序）
    RowMajor,
}

/// 解码后的六维数据，轴顺序为 (samples, views, slice_views, slices, echoes, nex)
///
/// 元素类型 3 解码为实数数组，不做任何复数组合
#[derive(Debug, Clone, PartialEq)]
pub enum RawDataset {
    Complex(Array6<Complex64>),
    Real(Array6<f64>),
}

impl RawDataset {
    pub fn shape(&self) -> [usize; 6] {
        let dims = match self {
            RawDataset::Complex(data) => data.shape(),
            RawDataset::Real(data) => data.shape(),
        };
        let mut shape = [0usize; 6];
        shape.copy_from_slice(dims);
        shape
    }

    pub fn len(&self) -> usize {
        match self {
            RawDataset::Complex(data) => data.len(),
            RawDataset::Real(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, RawDataset::Complex(_))
    }

    /// 按列主序依次返回 (实部, 虚部)，实数数据的虚部为 0
    pub fn column_major_pairs(&self) -> Vec<(f64, f64)> {
        match self {
            RawDataset::Complex(data) => data.t().iter().map(|z| (z.re, z.im)).collect(),
            RawDataset::Real(data) => data.t().iter().map(|x| (*x, 0.0)).collect(),
        }
    }
}

/// 数据区之后的参数块，扫描仪写入的文本描述，这里不做解析
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterBlock(Vec<u8>);

impl ParameterBlock {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

/// 单个 MRD 文件的解码结果
#[derive(Debug, Clone)]
pub struct MrdFile {
    pub header: MrdHeader,
    pub data: RawDataset,
    pub parameters: ParameterBlock,
}

/// 数据集摘要，供前端详情页展示
#[derive(Debug, Clone, Serialize)]
pub struct MrdSummary {
    pub header: MrdHeader,
    pub element_code: i16,
    pub complex: bool,
    pub shape: [usize; 6],
    pub total_points: usize,
    pub parameter_bytes: usize,
    pub parameters: String,
}

impl MrdFile {
    pub fn summary(&self) -> MrdSummary {
        MrdSummary {
            header: self.header,
            element_code: self.header.element_type.code(),
            complex: self.data.is_complex(),
            shape: self.data.shape(),
            total_points: self.data.len(),
            parameter_bytes: self.parameters.as_bytes().len(),
            parameters: self.parameters.to_text_lossy(),
        }
    }
}

/// 解码完整的 MRD 文件
///
/// 1. 解析 512 字节文件头
/// 2. 校验数据区 `[512, 512 + 点数 × 每点字节数)` 完整
/// 3. 按元素类型读取基本数值，复数类型两两组合为 (实部, 虚部)
/// 4. 按列主序展开为六维数组
/// 5. 剩余字节作为参数块原样返回
pub fn decode(bytes: &[u8]) -> Result<MrdFile> {
    let header = MrdHeader::parse(bytes)?;
    let total_points = header.total_points()?;
    let data_len = header.data_len()?;

    let data_end = HEADER_SIZE
        .checked_add(data_len)
        .ok_or_else(|| Error::MalformedHeader(format!("数据区长度溢出: {:?}", header.dims())))?;
    if bytes.len() < data_end {
        return Err(Error::TruncatedFile {
            expected: data_end,
            actual: bytes.len(),
        });
    }

    let region = &bytes[HEADER_SIZE..data_end];
    let values = read_primitives(region, header.element_type.primitive());
    let shape = header.shape();

    let data = if header.element_type.is_complex() {
        let points = values
            .chunks_exact(2)
            .map(|pair| Complex64::new(pair[0], pair[1]))
            .collect();
        RawDataset::Complex(reshape(points, shape, AxisOrder::ColumnMajor)?)
    } else {
        RawDataset::Real(reshape(values, shape, AxisOrder::ColumnMajor)?)
    };

    debug!(
        element_type = header.element_type.code(),
        total_points,
        shape = ?shape,
        parameter_bytes = bytes.len() - data_end,
        "MRD 解码完成"
    );

    Ok(MrdFile {
        header,
        data,
        parameters: ParameterBlock::new(bytes[data_end..].to_vec()),
    })
}

/// 将扁平序列按给定的轴顺序展开为六维数组
pub fn reshape<T>(values: Vec<T>, shape: [usize; 6], order: AxisOrder) -> Result<Array6<T>> {
    let result = match order {
        AxisOrder::ColumnMajor => Array6::from_shape_vec(shape.f(), values),
        AxisOrder::RowMajor => Array6::from_shape_vec(shape, values),
    };
    result.map_err(|e| Error::MalformedHeader(format!("数据量与维度 {:?} 不匹配: {}", shape, e)))
}

/// 将小端字节读取为 f64 序列，每个基本数值对应一个元素
fn read_primitives(region: &[u8], primitive: Primitive) -> Vec<f64> {
    let size = primitive.size();
    let count = region.len() / size;
    let mut values = Vec::with_capacity(count);

    match primitive {
        Primitive::U8 => values.extend(region.iter().map(|b| f64::from(*b))),
        Primitive::I8 => values.extend(region.iter().map(|b| f64::from(*b as i8))),
        Primitive::I16 => {
            let mut buf = vec![0i16; count];
            LittleEndian::read_i16_into(region, &mut buf);
            values.extend(buf.into_iter().map(f64::from));
        }
        Primitive::I32 => {
            let mut buf = vec![0i32; count];
            LittleEndian::read_i32_into(region, &mut buf);
            values.extend(buf.into_iter().map(f64::from));
        }
        Primitive::F32 => {
            let mut buf = vec![0f32; count];
            LittleEndian::read_f32_into(region, &mut buf);
            values.extend(buf.into_iter().map(f64::from));
        }
        Primitive::F64 => {
            let mut buf = vec![0f64; count];
            LittleEndian::read_f64_into(region, &mut buf);
            values.extend(buf);
        }
    }

    values
}
