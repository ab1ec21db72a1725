//! 质子 DICOM 切片渲染
//!
//! 从存储下载切片到本次调用独占的临时文件，解码像素后依次执行：
//! 原始值底噪裁剪 → 最小/最大值归一化 → 显示阈值裁剪 → 缩放到 8 位灰度。

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dicom_pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder};
use image::{GrayImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ProtonConfig;
use crate::error::{Error, Result};
use crate::storage::{StorageGateway, join_key};

/// 切片文件：`<前缀>_<5 位补零索引>.dcm`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceFile {
    pub index: u32,
    pub file_name: String,
}

impl SliceFile {
    pub fn new(series_prefix: &str, index: u32) -> Self {
        Self {
            index,
            file_name: format!("{}_{:05}.dcm", series_prefix, index),
        }
    }

    /// 在质子目录下的存储键
    pub fn key(&self, proton_prefix: &str) -> String {
        join_key(proton_prefix, &self.file_name)
    }
}

/// DICOM 解码得到的二维像素数组（行优先）
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSlice {
    pub rows: u32,
    pub columns: u32,
    pub values: Vec<f64>,
}

/// DICOM 解码 trait，外部解码库在这里接入
pub trait SliceDecoder: Send + Sync {
    fn decode_file(&self, path: &Path) -> Result<PixelSlice>;
}

/// 基于 dicom-rs 的解码器，多帧文件只取第一帧
///
/// 返回存储值，不应用 RescaleSlope / RescaleIntercept，底噪裁剪作用在原始存储值上
pub struct DicomSliceDecoder;

impl SliceDecoder for DicomSliceDecoder {
    fn decode_file(&self, path: &Path) -> Result<PixelSlice> {
        let obj = dicom_object::open_file(path).map_err(|e| Error::DicomDecode(e.to_string()))?;
        let decoded = obj
            .decode_pixel_data()
            .map_err(|e| Error::DicomDecode(e.to_string()))?;

        if decoded.samples_per_pixel() != 1 {
            return Err(Error::DicomDecode(format!(
                "只支持单通道灰度图像，samples_per_pixel = {}",
                decoded.samples_per_pixel()
            )));
        }

        let rows = decoded.rows();
        let columns = decoded.columns();
        let options = ConvertOptions::new().with_modality_lut(ModalityLutOption::None);
        let mut values: Vec<f64> = decoded
            .to_vec_with_options(&options)
            .map_err(|e| Error::DicomDecode(e.to_string()))?;

        let frame_len = rows as usize * columns as usize;
        if values.len() < frame_len {
            return Err(Error::DicomDecode(format!(
                "像素数量不足: {}x{} 需要 {} 个，实际 {} 个",
                rows,
                columns,
                frame_len,
                values.len()
            )));
        }
        values.truncate(frame_len);

        Ok(PixelSlice {
            rows,
            columns,
            values,
        })
    }
}

/// 像素值全部相同时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlatImagePolicy {
    /// 返回 `DegenerateImage` 错误
    #[default]
    Reject,
    /// 返回全零图像
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// 小于该值的原始像素置 0
    pub raw_floor: f64,
    /// 归一化后小于该值的像素置 0
    pub display_floor: f64,
    pub flat_image: FlatImagePolicy,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            raw_floor: 5.0,
            display_floor: 0.05,
            flat_image: FlatImagePolicy::Reject,
        }
    }
}

impl From<&ProtonConfig> for RenderOptions {
    fn from(config: &ProtonConfig) -> Self {
        Self {
            raw_floor: config.raw_floor,
            display_floor: config.display_floor,
            flat_image: config.flat_image,
        }
    }
}

/// 8 位单通道灰度图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RenderedImage {
    /// 编码为 PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let image = GrayImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| Error::ImageEncode("像素数量与图像尺寸不匹配".to_string()))?;
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| Error::ImageEncode(e.to_string()))?;
        Ok(buffer.into_inner())
    }
}

/// 将像素数组转换为 8 位灰度图像
pub fn normalize_slice(slice: &PixelSlice, options: &RenderOptions) -> Result<RenderedImage> {
    if slice.values.is_empty() {
        return Err(Error::DicomDecode("切片不包含像素".to_string()));
    }

    let clipped: Vec<f64> = slice
        .values
        .iter()
        .map(|&v| if v < options.raw_floor { 0.0 } else { v })
        .collect();

    let (min, max) = clipped
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let range = max - min;
    let pixels = if range == 0.0 {
        match options.flat_image {
            FlatImagePolicy::Reject => return Err(Error::DegenerateImage { value: min }),
            FlatImagePolicy::Zero => vec![0u8; clipped.len()],
        }
    } else {
        clipped
            .iter()
            .map(|&v| {
                let normalized = (v - min) / range;
                let normalized = if normalized < options.display_floor {
                    0.0
                } else {
                    normalized
                };
                // 与 numpy 的 astype(uint8) 一致：截断而非四舍五入
                (normalized * 255.0) as u8
            })
            .collect()
    };

    Ok(RenderedImage {
        width: slice.columns,
        height: slice.rows,
        pixels,
    })
}

/// 本次调用独占的临时文件，离开作用域时删除
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn new(dir: &Path, file_name: &str) -> Self {
        Self {
            path: dir.join(format!("{}_{}", Uuid::new_v4(), file_name)),
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "已删除临时文件"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "删除临时文件失败"),
        }
    }
}

/// 质子切片渲染器
pub struct ProtonRenderer {
    storage: Arc<dyn StorageGateway>,
    decoder: Arc<dyn SliceDecoder>,
    proton_prefix: String,
    series_prefix: String,
    scratch_dir: PathBuf,
}

impl ProtonRenderer {
    pub fn new(
        storage: Arc<dyn StorageGateway>,
        decoder: Arc<dyn SliceDecoder>,
        proton_prefix: impl Into<String>,
        series_prefix: impl Into<String>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            decoder,
            proton_prefix: proton_prefix.into(),
            series_prefix: series_prefix.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn slice_file(&self, index: u32) -> SliceFile {
        SliceFile::new(&self.series_prefix, index)
    }

    /// 渲染指定索引的切片
    pub fn render(&self, index: u32, options: &RenderOptions) -> Result<RenderedImage> {
        let slice = self.load(index)?;
        let image = normalize_slice(&slice, options)?;
        debug!(index, width = image.width, height = image.height, "质子切片渲染完成");
        Ok(image)
    }

    /// 下载并解码切片像素
    pub fn load(&self, index: u32) -> Result<PixelSlice> {
        let slice_file = self.slice_file(index);
        let key = slice_file.key(&self.proton_prefix);
        let scratch = ScratchFile::new(&self.scratch_dir, &slice_file.file_name);

        self.storage
            .download_to_local(&key, &scratch.path)
            .map_err(|e| match e {
                Error::NotFound(_) => Error::SliceNotFound {
                    index,
                    key: key.clone(),
                },
                other => other,
            })?;

        self.decoder.decode_file(&scratch.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(values: Vec<f64>, rows: u32, columns: u32) -> PixelSlice {
        PixelSlice {
            rows,
            columns,
            values,
        }
    }

    #[test]
    fn slice_file_name_is_zero_padded() {
        let file = SliceFile::new("5091", 7);
        assert_eq!(file.file_name, "5091_00007.dcm");
        assert_eq!(file.key("MRS/proton/"), "MRS/proton/5091_00007.dcm");
        assert_eq!(SliceFile::new("5091", 123456).file_name, "5091_123456.dcm");
    }

    #[test]
    fn floor_clip_then_normalize() {
        let image = normalize_slice(&slice(vec![2.0, 10.0, 100.0], 1, 3), &RenderOptions::default())
            .unwrap();
        // 2 被裁剪为 0，归一化结果为 [0, 0.10, 1.0]
        assert_eq!(image.pixels, vec![0, 25, 255]);
        assert_eq!((image.width, image.height), (3, 1));
    }

    #[test]
    fn display_floor_zeroes_small_normalized_values() {
        // 8 归一化后为 0.04，小于 0.05
        let image =
            normalize_slice(&slice(vec![0.0, 8.0, 200.0, 100.0], 2, 2), &RenderOptions::default())
                .unwrap();
        assert_eq!(image.pixels, vec![0, 0, 255, 127]);
    }

    #[test]
    fn flat_slice_is_rejected_by_default() {
        for values in [vec![42.0; 4], vec![3.0, 1.0, 4.0, 0.0], vec![0.0; 4]] {
            let err = normalize_slice(&slice(values, 2, 2), &RenderOptions::default()).unwrap_err();
            assert!(matches!(err, Error::DegenerateImage { .. }));
        }
    }

    #[test]
    fn flat_slice_renders_black_when_configured() {
        let options = RenderOptions {
            flat_image: FlatImagePolicy::Zero,
            ..RenderOptions::default()
        };
        let image = normalize_slice(&slice(vec![42.0; 6], 2, 3), &options).unwrap();
        assert_eq!(image.pixels, vec![0; 6]);
    }

    #[test]
    fn empty_slice_is_a_decode_error() {
        let err = normalize_slice(&slice(Vec::new(), 0, 0), &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DicomDecode(_)));
    }

    #[test]
    fn png_encoding_produces_png_signature() {
        let image = RenderedImage {
            width: 2,
            height: 2,
            pixels: vec![0, 64, 128, 255],
        };
        let png = image.to_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn png_encoding_rejects_mismatched_size() {
        let image = RenderedImage {
            width: 3,
            height: 3,
            pixels: vec![0; 4],
        };
        assert!(matches!(image.to_png(), Err(Error::ImageEncode(_))));
    }

    #[test]
    fn scratch_paths_are_unique_per_call() {
        let dir = Path::new("/tmp");
        let a = ScratchFile::new(dir, "5091_00001.dcm");
        let b = ScratchFile::new(dir, "5091_00001.dcm");
        assert_ne!(a.path, b.path);
        assert!(a.path.to_string_lossy().ends_with("_5091_00001.dcm"));
    }
}
