//! 质子切片渲染的端到端测试

mod common;

use std::path::Path;
use std::sync::Arc;

use hpmri_backend::proton::{
    DicomSliceDecoder, FlatImagePolicy, PixelSlice, ProtonRenderer, RenderOptions, SliceDecoder,
};
use hpmri_backend::storage::{LocalStorage, StorageGateway};
use hpmri_backend::{Error, Result};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    storage: Arc<LocalStorage>,
    scratch: std::path::PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path().join("store")));
    let scratch = dir.path().join("scratch");
    std::fs::create_dir_all(&scratch).unwrap();
    Fixture {
        _dir: dir,
        storage,
        scratch,
    }
}

fn renderer(fixture: &Fixture, decoder: Arc<dyn SliceDecoder>) -> ProtonRenderer {
    ProtonRenderer::new(
        fixture.storage.clone(),
        decoder,
        "MRS/proton/",
        "5091",
        &fixture.scratch,
    )
}

fn scratch_is_empty(fixture: &Fixture) -> bool {
    std::fs::read_dir(&fixture.scratch).unwrap().next().is_none()
}

/// 不解析文件内容，直接返回预设结果的解码器
struct FixedDecoder(Option<PixelSlice>);

impl SliceDecoder for FixedDecoder {
    fn decode_file(&self, path: &Path) -> Result<PixelSlice> {
        assert!(path.is_file(), "解码时临时文件应当存在");
        self.0
            .clone()
            .ok_or_else(|| Error::DicomDecode("损坏的文件".to_string()))
    }
}

#[test]
fn renders_real_dicom_slice() {
    let fixture = fixture();
    common::write_dicom_slice(
        &fixture.storage.root().join("MRS/proton/5091_00003.dcm"),
        2,
        2,
        vec![2, 10, 100, 50],
    );

    let image = renderer(&fixture, Arc::new(DicomSliceDecoder))
        .render(3, &RenderOptions::default())
        .unwrap();

    assert_eq!((image.width, image.height), (2, 2));
    assert_eq!(image.pixels, vec![0, 25, 255, 127]);
    assert!(image.to_png().unwrap().starts_with(b"\x89PNG"));
    assert!(scratch_is_empty(&fixture));
}

#[test]
fn stored_values_are_used_without_rescale() {
    let fixture = fixture();
    let path = fixture.storage.root().join("MRS/proton/5091_00004.dcm");
    common::write_dicom_slice_with_rescale(
        &path,
        2,
        2,
        vec![2, 10, 100, 50],
        Some(("2", "-10")),
    );

    let slice = DicomSliceDecoder.decode_file(&path).unwrap();
    assert_eq!(slice.values, vec![2.0, 10.0, 100.0, 50.0]);

    // 负斜率同样不影响结果，图像不会被反转
    let inverted = fixture.storage.root().join("MRS/proton/5091_00005.dcm");
    common::write_dicom_slice_with_rescale(
        &inverted,
        2,
        2,
        vec![2, 10, 100, 50],
        Some(("-1", "0")),
    );

    let renderer = renderer(&fixture, Arc::new(DicomSliceDecoder));
    for index in [4, 5] {
        let image = renderer.render(index, &RenderOptions::default()).unwrap();
        assert_eq!(image.pixels, vec![0, 25, 255, 127]);
    }
    assert!(scratch_is_empty(&fixture));
}

#[test]
fn missing_slice_is_reported_with_key() {
    let fixture = fixture();
    let err = renderer(&fixture, Arc::new(DicomSliceDecoder))
        .render(42, &RenderOptions::default())
        .unwrap_err();
    match err {
        Error::SliceNotFound { index, key } => {
            assert_eq!(index, 42);
            assert_eq!(key, "MRS/proton/5091_00042.dcm");
        }
        other => panic!("意外的错误: {other}"),
    }
    assert!(scratch_is_empty(&fixture));
}

#[test]
fn scratch_file_is_removed_when_decoding_fails() {
    let fixture = fixture();
    fixture
        .storage
        .write_file("MRS/proton/5091_00001.dcm", b"not a dicom file")
        .unwrap();

    let err = renderer(&fixture, Arc::new(FixedDecoder(None)))
        .render(1, &RenderOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::DicomDecode(_)));
    assert!(scratch_is_empty(&fixture));

    let err = renderer(&fixture, Arc::new(DicomSliceDecoder))
        .render(1, &RenderOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::DicomDecode(_)));
    assert!(scratch_is_empty(&fixture));
}

#[test]
fn flat_slice_policy_holds_end_to_end() {
    let fixture = fixture();
    fixture
        .storage
        .write_file("MRS/proton/5091_00000.dcm", b"placeholder")
        .unwrap();
    let flat = PixelSlice {
        rows: 2,
        columns: 2,
        values: vec![80.0; 4],
    };
    let renderer = renderer(&fixture, Arc::new(FixedDecoder(Some(flat))));

    let err = renderer.render(0, &RenderOptions::default()).unwrap_err();
    assert!(matches!(err, Error::DegenerateImage { .. }));

    let options = RenderOptions {
        flat_image: FlatImagePolicy::Zero,
        ..RenderOptions::default()
    };
    assert_eq!(renderer.render(0, &options).unwrap().pixels, vec![0; 4]);
}
