//! End-to-end rendering through a real headless Chrome

#![cfg(feature = "cdp")]

use std::fs;
use svgshot::batch::{BatchOptions, BatchRasterizer};
use svgshot::EngineConfig;

fn config() -> EngineConfig {
    EngineConfig {
        sandbox: std::env::var("SVGSHOT_NO_SANDBOX").is_err(),
        ..Default::default()
    }
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_scaled_view_box_output() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("box.svg");
    fs::write(
        &src,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 300"><rect width="200" height="300" fill="black"/></svg>"#,
    )
    .unwrap();

    let engine = svgshot::new_engine(config()).expect("Failed to create engine");
    let mut rasterizer = BatchRasterizer::new(engine, BatchOptions { scale: 2.0, ..Default::default() });
    let result = rasterizer.convert_single(&src, None).unwrap();
    assert!(result.is_success(), "{:?}", result.error);
    rasterizer.close().unwrap();

    let png = fs::read(dir.path().join("box.png")).unwrap();
    assert_eq!(&png[0..8], b"\x89PNG\r\n\x1a\n");
    let img = image::load_from_memory(&png).unwrap();
    assert_eq!((img.width(), img.height()), (400, 600));
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_fallback_size_and_batch_counts() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("svg");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("plain.svg"), r#"<svg xmlns="http://www.w3.org/2000/svg"><circle cx="5" cy="5" r="4"/></svg>"#).unwrap();
    fs::write(input.join("broken.svg"), [0xffu8, 0xfe, 0xfd]).unwrap();

    let engine = svgshot::new_engine(config()).expect("Failed to create engine");
    let mut rasterizer = BatchRasterizer::new(engine, BatchOptions::default());
    let summary = rasterizer.convert_batch(&input, None).unwrap().clone();
    rasterizer.close().unwrap();

    assert_eq!((summary.success_count, summary.fail_count), (1, 1));
    assert_eq!(summary.failures[0].0, "broken.svg");

    let img = image::open(dir.path().join("png_output/plain.png")).unwrap();
    assert_eq!((img.width(), img.height()), (750, 1000));
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_multi_megabyte_document_renders() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("heavy.svg");
    let padding = "0123456789abcdef".repeat(3 * 1024 * 1024 / 16);
    fs::write(
        &src,
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 300 200"><!-- {} --><rect width="300" height="200" fill="navy"/></svg>"#,
            padding
        ),
    )
    .unwrap();
    assert!(fs::metadata(&src).unwrap().len() > 3 * 1024 * 1024);

    let engine = svgshot::new_engine(config()).expect("Failed to create engine");
    let mut rasterizer = BatchRasterizer::new(engine, BatchOptions::default());
    let result = rasterizer.convert_single(&src, None).unwrap();
    rasterizer.close().unwrap();
    assert!(result.is_success(), "{:?}", result.error);

    let img = image::open(dir.path().join("heavy.png")).unwrap();
    assert_eq!((img.width(), img.height()), (300, 200));
}
