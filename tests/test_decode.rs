mod common;

use common::*;
use marksheet::config::{SheetLayout, TrackerConfig};
use marksheet::detection::markers::track_markers;
use marksheet::detection::preprocessing::binarize;
use marksheet::build_standard_pipeline;

#[test]
fn synthetic_sheet_round_trips() -> anyhow::Result<()> {
    let answers = answers_with_mistakes(3);
    let spec = SheetSpec::new("2024157", answers.clone());
    let pipeline = build_standard_pipeline(&MarksheetConfig::default(), standard_key());

    let result = pipeline.run(sheet_context("sheet.png", &spec))?.into_result()?;

    assert_eq!(result.source, "sheet.png");
    assert_eq!(result.number, "2024157");
    assert_eq!(result.answers, answers);
    assert_eq!(result.score, 97);
    Ok(())
}

#[test]
fn markers_are_sorted_along_their_axis() -> anyhow::Result<()> {
    let spec = SheetSpec::new("0000000", single_mark_answers());
    let bitmap = binarize(&render_sheet(&spec), 240)?;
    let markers = track_markers(&bitmap, &SheetLayout::default(), &TrackerConfig::default())?;

    assert_eq!(markers.horizontal.len(), 47);
    assert_eq!(markers.vertical.len(), 25);
    assert_eq!(markers.horizontal.axis(), Axis::Horizontal);

    let xs: Vec<u32> = markers.horizontal.points().iter().map(|p| p.x).collect();
    let expected_xs: Vec<u32> = (0..47).map(column_x).collect();
    assert_eq!(xs, expected_xs);

    let ys: Vec<u32> = markers.vertical.points().iter().map(|p| p.y).collect();
    let expected_ys: Vec<u32> = (0..25).map(row_y).collect();
    assert_eq!(ys, expected_ys);
    Ok(())
}

#[test]
fn tracking_is_deterministic() -> anyhow::Result<()> {
    let spec = SheetSpec::new("1234567", answers_with_mistakes(10));
    let bitmap = binarize(&render_sheet(&spec), 240)?;
    let layout = SheetLayout::default();
    let tracker = TrackerConfig::default();

    let first = track_markers(&bitmap, &layout, &tracker)?;
    let second = track_markers(&bitmap, &layout, &tracker)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn missing_marker_fails_with_marker_count() {
    let mut spec = SheetSpec::new("1234567", single_mark_answers());
    spec.missing_bottom_markers = vec![20];
    let pipeline = build_standard_pipeline(&MarksheetConfig::default(), standard_key());

    match pipeline.run(sheet_context("damaged.png", &spec)) {
        Err(SheetError::MarkerCount {
            axis,
            expected,
            observed,
        }) => {
            assert_eq!(axis, Axis::Horizontal);
            assert_eq!(expected, 47);
            assert_eq!(observed, 46);
        }
        Err(other) => panic!("expected a marker count error, got {}", other),
        Ok(_) => panic!("damaged sheet should not decode"),
    }
}

#[test]
fn blank_number_columns_shorten_the_number() -> anyhow::Result<()> {
    let spec = SheetSpec::new("12-45-7", single_mark_answers());
    let pipeline = build_standard_pipeline(&MarksheetConfig::default(), standard_key());

    let result = pipeline.run(sheet_context("partial.png", &spec))?.into_result()?;
    assert_eq!(result.number, "12457");
    assert_eq!(result.score, 100);
    Ok(())
}

#[test]
fn topmost_mark_wins_a_number_column() -> anyhow::Result<()> {
    let spec = SheetSpec::new("5555555", single_mark_answers());
    let mut img = render_sheet(&spec);
    // Extra mark for digit 3 in the first column sits above the 5
    for y in row_y(3) - HALF..=row_y(3) + HALF {
        for x in column_x(0) - HALF..=column_x(0) + HALF {
            img.put_pixel(x, y, image::Luma([0]));
        }
    }
    let pipeline = build_standard_pipeline(&MarksheetConfig::default(), standard_key());

    let sheet = SheetContext::new("double.png", image::DynamicImage::ImageLuma8(img));
    let result = pipeline.run(sheet)?.into_result()?;
    assert_eq!(result.number, "3555555");
    Ok(())
}

#[test]
fn extra_marks_are_reported_and_cost_the_question() -> anyhow::Result<()> {
    let mut answers = single_mark_answers();
    answers[30][9] = true;
    let spec = SheetSpec::new("0000001", answers);
    let pipeline = build_standard_pipeline(&MarksheetConfig::default(), standard_key());

    let result = pipeline.run(sheet_context("extra.png", &spec))?.into_result()?;
    assert_eq!(result.answers[30], row([1, 0, 0, 0, 0, 0, 0, 0, 0, 1]));
    assert_eq!(result.score, 99);
    Ok(())
}

#[test]
fn partial_run_exposes_intermediate_stages() -> anyhow::Result<()> {
    let spec = SheetSpec::new("7654321", single_mark_answers());
    let pipeline = build_standard_pipeline(&MarksheetConfig::default(), standard_key());
    assert_eq!(
        pipeline.step_names(),
        vec!["Binarize", "Marker Tracking", "Grid Decode", "Score"]
    );

    let sheet = pipeline.run_partial(sheet_context("step.png", &spec), 2)?;
    assert!(sheet.marker_bitmap.is_some());
    assert!(sheet.markers.is_some());
    assert!(sheet.decoded.is_none());
    assert!(sheet.score.is_none());

    assert!(matches!(
        sheet.into_result(),
        Err(SheetError::MissingStage { .. })
    ));
    Ok(())
}

#[test]
fn steps_out_of_order_report_missing_stage() {
    use marksheet::detection::steps::GridDecodeStep;

    let spec = SheetSpec::new("1111111", single_mark_answers());
    let pipeline = Pipeline::new().add_step_boxed(Box::new(GridDecodeStep {
        layout: SheetLayout::default(),
    }));

    assert!(matches!(
        pipeline.run(sheet_context("bad-order.png", &spec)),
        Err(SheetError::MissingStage {
            step: "Grid Decode",
            ..
        })
    ));
}

#[test]
fn debug_mode_writes_step_images() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");
    let spec = SheetSpec::new("1234567", single_mark_answers());
    let pipeline =
        build_standard_pipeline(&MarksheetConfig::default(), standard_key()).with_debug(debug_dir.clone())?;

    pipeline.run(sheet_context("scan01.png", &spec))?;

    let sheet_dir = debug_dir.join("scan01");
    assert!(sheet_dir.join("01_binarize.png").exists());
    assert!(sheet_dir.join("02_marker_tracking.png").exists());
    assert!(sheet_dir.join("03_grid_decode.png").exists());
    assert!(!sheet_dir.join("04_score.png").exists());
    Ok(())
}

#[test]
fn debug_mode_refuses_non_empty_directory() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;
    assert!(Pipeline::new().with_debug(dir.path().to_path_buf()).is_err());
    Ok(())
}
