//! Integration test: decode an in-memory image and drive the reference
//! pipeline through the headless toolkit.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use stagehand_pipeline::presets;
use stagehand_pipeline::{
    ColorCatalog, ControlValue, DynamicImage, Frame, HeadlessUi, OperationError, PipelineError,
};

/// 64x64 RGB image: dark background with a bright square over 20..44.
fn square_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(64, 64, |x, y| {
        if (20..44).contains(&x) && (20..44).contains(&y) {
            image::Rgb([240, 230, 220])
        } else {
            image::Rgb([15, 10, 5])
        }
    });
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(encoder, img.as_raw(), 64, 64, image::ExtendedColorType::Rgb8)
        .expect("encode png");
    buf
}

fn edge_columns(frame: &Frame) -> Vec<u32> {
    let gray = frame.as_image().expect("image frame").to_luma8();
    gray.enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] == 255)
        .map(|(x, _, _)| x)
        .collect()
}

#[test]
fn reference_pipeline_outlines_the_square() {
    let catalog = ColorCatalog::builtin();
    let source = stagehand_pipeline::decode(&square_png()).unwrap();
    assert_eq!(source.channel_count(), Some(3));

    let mut pipeline = presets::reference_pipeline(&catalog).unwrap();
    let mut ui = HeadlessUi::new();
    let edges = pipeline.render(&mut ui, source.clone()).unwrap();

    assert_eq!(edges.channel_count(), Some(1));
    let columns = edge_columns(&edges);
    assert!(!columns.is_empty(), "expected edges around the square");
    // A 5x5 dilation grows the square to 18..46; edges hug that boundary.
    assert!(columns.iter().all(|&x| (15..=48).contains(&x)));

    let panels = ui.take_panels();
    let headers: Vec<&str> = panels.iter().map(|p| p.header.as_str()).collect();
    assert_eq!(headers, vec!["cvtColor", "dilate", "Canny"]);
    assert_eq!(panels[0].images[0].frame, source);
    assert_eq!(panels[2].images[1].frame, edges);

    assert_eq!(pipeline.run_all(source).unwrap(), edges);
}

#[test]
fn controls_persist_and_overrides_apply() {
    let catalog = ColorCatalog::builtin();
    let source = stagehand_pipeline::decode(&square_png()).unwrap();
    let mut pipeline = presets::reference_pipeline(&catalog).unwrap();
    let mut ui = HeadlessUi::new();

    let first = pipeline.render(&mut ui, source.clone()).unwrap();
    assert_eq!(ui.state().get("Canny.threshold1"), Some(&ControlValue::Int(100)));
    assert_eq!(
        ui.state().get("cvtColor.code"),
        Some(&ControlValue::Key("COLOR_RGB2GRAY".to_string()))
    );

    ui.begin_pass();
    let again = pipeline.render(&mut ui, source.clone()).unwrap();
    assert_eq!(first, again);

    ui.set("dilate.kernel", ControlValue::Int(1));
    ui.begin_pass();
    let thinner = pipeline.render(&mut ui, source).unwrap();
    assert_ne!(first, thinner);
    let columns = edge_columns(&thinner);
    assert!(columns.iter().all(|&x| (17..=46).contains(&x)));
}

#[test]
fn line_detection_yields_segments() {
    let catalog = ColorCatalog::builtin();
    let source = stagehand_pipeline::decode(&square_png()).unwrap();
    let pipeline = presets::pipeline_from_names(["gray", "edges", "lines"], &catalog).unwrap();
    let result = pipeline.run_all(source).unwrap();
    assert!(matches!(result, Frame::Lines { dimensions, .. } if dimensions.width == 64));
}

#[test]
fn lines_are_not_accepted_downstream() {
    let catalog = ColorCatalog::builtin();
    let source = stagehand_pipeline::decode(&square_png()).unwrap();
    let mut pipeline =
        presets::pipeline_from_names(["gray", "edges", "lines", "dilate"], &catalog).unwrap();
    let mut ui = HeadlessUi::new();
    let err = pipeline.render(&mut ui, source).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Operation(OperationError::UnsupportedInput { .. })
    ));
}

#[test]
fn gray_input_needs_a_gray_aware_code() {
    let catalog = ColorCatalog::builtin();
    let gray = Frame::from(DynamicImage::ImageLuma8(image::GrayImage::new(8, 8)));
    let mut pipeline = presets::reference_pipeline(&catalog).unwrap();
    let mut ui = HeadlessUi::new();
    assert!(pipeline.render(&mut ui, gray.clone()).is_err());

    ui.set("cvtColor.code", ControlValue::Key("COLOR_GRAY2RGB".to_string()));
    ui.begin_pass();
    assert!(pipeline.render(&mut ui, gray).is_ok());
}

#[test]
fn garbage_bytes_fail_to_decode() {
    assert!(matches!(
        stagehand_pipeline::decode(b"not an image"),
        Err(PipelineError::ImageDecode(_))
    ));
    assert!(matches!(
        stagehand_pipeline::decode(&[]),
        Err(PipelineError::EmptyInput)
    ));
}
