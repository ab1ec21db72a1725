//! 集成测试共用的样本数据构造

#![allow(dead_code)]

use std::path::Path;

use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::tags;
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};

/// 构造 MRD 文件：dims 顺序为 (samples, views, slice_views, slices, echoes, nex)
pub fn mrd_bytes(dims: [i32; 6], element_type: i16, data: &[u8], parameters: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; 512];
    for (offset, value) in [0usize, 4, 8, 12, 152, 156].into_iter().zip(dims) {
        bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
    bytes[18..20].copy_from_slice(&element_type.to_le_bytes());
    bytes.extend_from_slice(data);
    bytes.extend_from_slice(parameters);
    bytes
}

pub fn f32_le(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// 写出一个 8 位单通道 MONOCHROME2 的 DICOM 文件
pub fn write_dicom_slice(path: &Path, rows: u16, columns: u16, pixels: Vec<u8>) {
    write_dicom_slice_with_rescale(path, rows, columns, pixels, None);
}

/// 同上，`rescale` 为 (RescaleSlope, RescaleIntercept)
pub fn write_dicom_slice_with_rescale(
    path: &Path,
    rows: u16,
    columns: u16,
    pixels: Vec<u8>,
    rescale: Option<(&str, &str)>,
) {
    let mut obj = InMemDicomObject::new_empty();
    obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(rows)));
    obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(columns)));
    obj.put(DataElement::new(
        tags::SAMPLES_PER_PIXEL,
        VR::US,
        PrimitiveValue::from(1u16),
    ));
    obj.put(DataElement::new(
        tags::PHOTOMETRIC_INTERPRETATION,
        VR::CS,
        PrimitiveValue::from("MONOCHROME2"),
    ));
    obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(8u16)));
    obj.put(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(8u16)));
    obj.put(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(7u16)));
    obj.put(DataElement::new(
        tags::PIXEL_REPRESENTATION,
        VR::US,
        PrimitiveValue::from(0u16),
    ));
    if let Some((slope, intercept)) = rescale {
        obj.put(DataElement::new(
            tags::RESCALE_SLOPE,
            VR::DS,
            PrimitiveValue::from(slope),
        ));
        obj.put(DataElement::new(
            tags::RESCALE_INTERCEPT,
            VR::DS,
            PrimitiveValue::from(intercept),
        ));
    }
    obj.put(DataElement::new(tags::PIXEL_DATA, VR::OB, PrimitiveValue::from(pixels)));

    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.4")
        .media_storage_sop_instance_uid("2.25.221743183549175336412959299516406387775")
        .transfer_syntax("1.2.840.10008.1.2.1");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    obj.with_meta(meta).unwrap().write_to_file(path).unwrap();
}
