//! MRD 文件头解析
//!
//! MR-Solutions 扫描仪输出的 `.MRD` 文件以 512 字节的固定文件头开始，
//! 所有字段均为小端有符号整数。

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::{Error, Result};

/// 文件头长度，数据区从这里开始
pub const HEADER_SIZE: usize = 512;

/// 文件头字段偏移
mod offsets {
    pub const SAMPLES: usize = 0;
    pub const VIEWS: usize = 4;
    pub const SLICE_VIEWS: usize = 8;
    pub const SLICES: usize = 12;
    pub const ELEMENT_TYPE: usize = 18;
    pub const ECHOES: usize = 152;
    pub const NEX: usize = 156;
}

/// 数据区的基本数值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    U8,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl Primitive {
    pub const fn size(self) -> usize {
        match self {
            Primitive::U8 | Primitive::I8 => 1,
            Primitive::I16 => 2,
            Primitive::I32 | Primitive::F32 => 4,
            Primitive::F64 => 8,
        }
    }
}

/// 元素类型代码
/// 16–22 为复数（实部、虚部交错存储），3 为纯实数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Int16Real,
    UInt8Complex,
    Int8Complex,
    /// 代码 18 与 19 布局相同，保留原始代码以便重新编码
    Int16Complex(i16),
    Int32Complex,
    Float32Complex,
    Float64Complex,
}

impl ElementType {
    pub fn from_code(code: i16) -> Result<Self> {
        match code {
            3 => Ok(ElementType::Int16Real),
            16 => Ok(ElementType::UInt8Complex),
            17 => Ok(ElementType::Int8Complex),
            18 | 19 => Ok(ElementType::Int16Complex(code)),
            20 => Ok(ElementType::Int32Complex),
            21 => Ok(ElementType::Float32Complex),
            22 => Ok(ElementType::Float64Complex),
            other => Err(Error::UnsupportedElementType(other)),
        }
    }

    pub const fn code(self) -> i16 {
        match self {
            ElementType::Int16Real => 3,
            ElementType::UInt8Complex => 16,
            ElementType::Int8Complex => 17,
            ElementType::Int16Complex(code) => code,
            ElementType::Int32Complex => 20,
            ElementType::Float32Complex => 21,
            ElementType::Float64Complex => 22,
        }
    }

    pub const fn primitive(self) -> Primitive {
        match self {
            ElementType::Int16Real | ElementType::Int16Complex(_) => Primitive::I16,
            ElementType::UInt8Complex => Primitive::U8,
            ElementType::Int8Complex => Primitive::I8,
            ElementType::Int32Complex => Primitive::I32,
            ElementType::Float32Complex => Primitive::F32,
            ElementType::Float64Complex => Primitive::F64,
        }
    }

    pub const fn is_complex(self) -> bool {
        !matches!(self, ElementType::Int16Real)
    }

    /// 每个逻辑数据点占用的字节数
    pub const fn bytes_per_point(self) -> usize {
        let size = self.primitive().size();
        if self.is_complex() { size * 2 } else { size }
    }
}

/// MRD 文件头
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MrdHeader {
    pub samples: i32,
    pub views: i32,
    pub slice_views: i32,
    pub slices: i32,
    pub element_type: ElementType,
    pub echoes: i32,
    pub nex: i32,
}

impl MrdHeader {
    /// 从文件开头解析文件头
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::MalformedHeader(format!(
                "文件头需要 {} 字节，实际只有 {} 字节",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let read = |offset: usize| LittleEndian::read_i32(&bytes[offset..offset + 4]);
        let element_code = LittleEndian::read_i16(&bytes[offsets::ELEMENT_TYPE..]);

        let header = MrdHeader {
            samples: read(offsets::SAMPLES),
            views: read(offsets::VIEWS),
            slice_views: read(offsets::SLICE_VIEWS),
            slices: read(offsets::SLICES),
            element_type: ElementType::from_code(element_code)?,
            echoes: read(offsets::ECHOES),
            nex: read(offsets::NEX),
        };

        if let Some(negative) = header.dims().iter().find(|d| **d < 0) {
            return Err(Error::MalformedHeader(format!(
                "维度不能为负: {} (维度 {:?})",
                negative,
                header.dims()
            )));
        }

        Ok(header)
    }

    /// 维度，顺序为 (samples, views, slice_views, slices, echoes, nex)
    pub fn dims(&self) -> [i32; 6] {
        [
            self.samples,
            self.views,
            self.slice_views,
            self.slices,
            self.echoes,
            self.nex,
        ]
    }

    pub fn shape(&self) -> [usize; 6] {
        self.dims().map(|d| d.max(0) as usize)
    }

    /// 总数据点数，乘积溢出时报错
    pub fn total_points(&self) -> Result<usize> {
        self.shape().iter().try_fold(1usize, |acc, &d| {
            acc.checked_mul(d).ok_or_else(|| {
                Error::MalformedHeader(format!("维度乘积溢出: {:?}", self.dims()))
            })
        })
    }

    /// 数据区字节数
    pub fn data_len(&self) -> Result<usize> {
        self.total_points()?
            .checked_mul(self.element_type.bytes_per_point())
            .ok_or_else(|| Error::MalformedHeader(format!("数据区长度溢出: {:?}", self.dims())))
    }

    /// 将字段写回到已有的文件头缓冲区，保留区不变
    pub fn write_into(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::MalformedHeader(format!(
                "缓冲区需要 {} 字节，实际只有 {} 字节",
                HEADER_SIZE,
                buf.len()
            )));
        }
        self.write_fields(&mut buf[..HEADER_SIZE]);
        Ok(())
    }

    /// 编码为保留区全零的 512 字节文件头
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.write_fields(&mut buf);
        buf
    }

    /// `buf` 至少 HEADER_SIZE 字节
    fn write_fields(&self, buf: &mut [u8]) {
        let mut put = |offset: usize, value: i32| {
            LittleEndian::write_i32(&mut buf[offset..offset + 4], value)
        };
        put(offsets::SAMPLES, self.samples);
        put(offsets::VIEWS, self.views);
        put(offsets::SLICE_VIEWS, self.slice_views);
        put(offsets::SLICES, self.slices);
        put(offsets::ECHOES, self.echoes);
        put(offsets::NEX, self.nex);
        LittleEndian::write_i16(
            &mut buf[offsets::ELEMENT_TYPE..offsets::ELEMENT_TYPE + 2],
            self.element_type.code(),
        );
    }
}
