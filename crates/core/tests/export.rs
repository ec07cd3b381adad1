mod common;

use common::{
    editor_with_pages, init_logging, operands, page_count, page_operations, page_rotation, recorded, Recorded,
    RecordingDocument,
};
use doc_model::{
    AnnotationId, AnnotationRecord, AnnotationShape, AnnotationStyle, Color, PageAnnotations, Point,
};
use futures_lite::future::block_on;
use pdf_markup_core::asset::{encode_png, to_data_url, ImageKind};
use pdf_markup_core::{EditorError, ExportError, ShapeKind, SkipReason, SkippedItem};

const LETTER: (f32, f32) = (612.0, 792.0);

fn record(id: &str, shape: AnnotationShape) -> AnnotationRecord {
    AnnotationRecord::new(shape, AnnotationStyle::default()).with_id(AnnotationId::from(id))
}

fn snapshot(entries: Vec<(u32, AnnotationRecord)>) -> PageAnnotations {
    let mut snapshot = PageAnnotations::new();
    for (page, record) in entries {
        let mut records = snapshot.get(page).map(<[_]>::to_vec).unwrap_or_default();
        records.push(record);
        snapshot.insert(page, records);
    }
    snapshot
}

#[test]
fn overlay_top_edge_maps_to_document_bottom_edge() {
    let mut editor = editor_with_pages(&[(600.0, 800.0)]);
    let rectangle = record(
        "r",
        AnnotationShape::Rectangle { x: 10.0, y: 20.0, width: Some(40.0), height: Some(30.0) },
    );
    editor.load_annotations(&snapshot(vec![(1, rectangle)])).unwrap();

    let exported = block_on(editor.export_with::<RecordingDocument>()).unwrap();
    assert_eq!(
        recorded(&exported.bytes),
        vec![Recorded::Rectangle {
            page: 0,
            x: 10.0,
            y: 750.0,
            width: 40.0,
            height: 30.0,
            fill: Some([0.0, 0.0, 0.0]),
            border: None,
            opacity: 1.0,
        }]
    );
}

#[test]
fn highlight_is_translucent_yellow_rectangle() {
    let mut editor = editor_with_pages(&[LETTER]);
    let highlight = AnnotationRecord::new(
        AnnotationShape::Highlight { x: 100.0, y: 100.0, width: Some(200.0), height: Some(20.0) },
        AnnotationStyle::default(),
    );
    editor.load_annotations(&snapshot(vec![(1, highlight)])).unwrap();

    let calls = recorded(&block_on(editor.export_with::<RecordingDocument>()).unwrap().bytes);
    assert_eq!(
        calls,
        vec![Recorded::Rectangle {
            page: 0,
            x: 100.0,
            y: 672.0,
            width: 200.0,
            height: 20.0,
            fill: Some([1.0, 1.0, 0.0]),
            border: None,
            opacity: 0.3,
        }]
    );

    let exported = block_on(editor.export()).unwrap();
    let operations = page_operations(&exported.bytes, 1);
    let rectangle = operations.iter().find(|op| op.operator == "re").expect("rectangle drawn");
    assert_eq!(operands(rectangle), vec![100.0, 672.0, 200.0, 20.0]);
    assert!(operations.iter().any(|op| op.operator == "gs"));
    assert_eq!(exported.mime, "application/pdf");
    assert_eq!(exported.file_name, "edited.pdf");
}

#[test]
fn created_objects_export_with_their_defaults() {
    let mut editor = editor_with_pages(&[LETTER]);
    editor.add_text(1, Some(Point::new(50.0, 60.0)), Some("Approved")).unwrap();
    editor.add_whiteout(1, Some(Point::new(0.0, 0.0))).unwrap();
    editor.add_shape(1, ShapeKind::Circle, Some(Point::new(100.0, 200.0))).unwrap();
    editor.add_shape(1, ShapeKind::Line, Some(Point::new(10.0, 300.0))).unwrap();

    let calls = recorded(&block_on(editor.export_with::<RecordingDocument>()).unwrap().bytes);
    assert_eq!(
        calls,
        vec![
            Recorded::Text {
                page: 0,
                text: "Approved".into(),
                x: 50.0,
                y: 792.0 - 60.0 - 16.0,
                size: 16.0,
                opacity: 1.0,
            },
            Recorded::Rectangle {
                page: 0,
                x: 0.0,
                y: 762.0,
                width: 200.0,
                height: 30.0,
                fill: Some([1.0, 1.0, 1.0]),
                border: None,
                opacity: 1.0,
            },
            Recorded::Ellipse { page: 0, x: 150.0, y: 542.0, x_scale: 50.0, y_scale: 50.0 },
            Recorded::Line { page: 0, start: (10.0, 492.0), end: (210.0, 492.0), thickness: 2.0 },
        ]
    );
}

#[test]
fn freehand_path_points_are_flipped() {
    let mut editor = editor_with_pages(&[LETTER]);
    let path = AnnotationRecord::new(
        AnnotationShape::Path { points: vec![Point::new(0.0, 0.0), Point::new(10.0, 92.0)] },
        AnnotationStyle { color: Some(Color::RED), stroke_width: Some(4.0), ..AnnotationStyle::default() },
    );
    editor.load_annotations(&snapshot(vec![(1, path)])).unwrap();

    let calls = recorded(&block_on(editor.export_with::<RecordingDocument>()).unwrap().bytes);
    assert_eq!(
        calls,
        vec![Recorded::Polyline { page: 0, points: vec![(0.0, 792.0), (10.0, 700.0)], thickness: 4.0 }]
    );
}

#[test]
fn images_are_placed_and_bad_images_skipped() {
    init_logging();
    let mut editor = editor_with_pages(&[LETTER]);
    let png = encode_png(&image::RgbaImage::from_pixel(8, 4, image::Rgba([9, 9, 9, 255]))).unwrap();
    let placed = block_on(editor.add_image(1, Some(Point::new(20.0, 30.0)), to_data_url(ImageKind::Png, &png)))
        .unwrap()
        .expect("surface still mounted");

    let mut records = editor.annotations().get(1).unwrap().to_vec();
    records.push(record(
        "broken",
        AnnotationShape::Image {
            x: 0.0,
            y: 0.0,
            width: Some(10.0),
            height: Some(10.0),
            image_data: "data:image/png;base64,AAAA".into(),
        },
    ));
    let mut loaded = PageAnnotations::new();
    loaded.insert(1, records);
    editor.load_annotations(&loaded).unwrap();

    let exported = block_on(editor.export_with::<RecordingDocument>()).unwrap();
    assert_eq!(
        recorded(&exported.bytes),
        vec![Recorded::Image { page: 0, x: 20.0, y: 792.0 - 30.0 - 2.0, width: 4.0, height: 2.0 }]
    );
    assert_eq!(exported.report.drawn, 1);
    assert!(matches!(
        &exported.report.skipped[..],
        [SkippedItem::Annotation { page: 1, id, reason: SkipReason::ImageDecode(_) }] if id.as_str() == "broken"
    ));
    assert_ne!(placed.id.as_str(), "broken");
}

#[test]
fn annotations_on_missing_pages_are_skipped() {
    init_logging();
    let mut editor = editor_with_pages(&[LETTER]);
    let stray = record("stray", AnnotationShape::Line { x: 0.0, y: 0.0, x2: 1.0, y2: 1.0 });
    editor.load_annotations(&snapshot(vec![(4, stray)])).unwrap();

    let exported = block_on(editor.export()).unwrap();
    assert_eq!(page_count(&exported.bytes), 1);
    assert_eq!(
        exported.report.skipped,
        vec![SkippedItem::Annotation {
            page: 4,
            id: AnnotationId::from("stray"),
            reason: SkipReason::PageOutOfRange { page_count: 1 },
        }]
    );
}

#[test]
fn rotated_export_is_repeatable() {
    let mut editor = editor_with_pages(&[LETTER; 3]);
    editor.add_highlight(1, None).unwrap();
    editor.rotate_page(2, None).unwrap();

    let first = block_on(editor.export()).unwrap();
    let second = block_on(editor.export()).unwrap();

    assert_eq!(first.bytes, second.bytes);
    assert_eq!(page_rotation(&first.bytes, 3), 90);
    assert_eq!(page_rotation(&first.bytes, 1), 0);
    assert_eq!(editor.structural_edits().len(), 1);
}

#[test]
fn rotations_accumulate_and_normalize() {
    let mut editor = editor_with_pages(&[LETTER]);
    for _ in 0..5 {
        editor.rotate_page(0, None).unwrap();
    }
    editor.rotate_page(0, Some(-180)).unwrap();

    let exported = block_on(editor.export()).unwrap();
    assert_eq!(page_rotation(&exported.bytes, 1), 270);
}

#[test]
fn extreme_rotation_angles_wrap_without_overflow() {
    let mut editor = editor_with_pages(&[LETTER]);
    editor.rotate_page(0, Some(270)).unwrap();
    editor.rotate_page(0, Some(2_147_483_610)).unwrap();

    let exported = block_on(editor.export()).unwrap();
    assert_eq!(page_rotation(&exported.bytes, 1), 0);
}

#[test]
fn deletions_apply_after_marks_on_original_pages() {
    let mut editor = editor_with_pages(&[LETTER; 3]);
    editor.add_whiteout(3, Some(Point::new(10.0, 10.0))).unwrap();
    editor.delete_page(0).unwrap();
    editor.delete_page(0).unwrap();

    let calls = recorded(&block_on(editor.export_with::<RecordingDocument>()).unwrap().bytes);
    assert_eq!(calls.last(), Some(&Recorded::Remove { page: 0 }));
    assert!(matches!(calls[0], Recorded::Rectangle { page: 2, .. }));
    assert_eq!(calls.iter().filter(|call| matches!(call, Recorded::Remove { .. })).count(), 1);

    let exported = block_on(editor.export()).unwrap();
    assert_eq!(page_count(&exported.bytes), 2);
    let operations = page_operations(&exported.bytes, 2);
    let rectangle = operations.iter().find(|op| op.operator == "re").expect("whiteout kept");
    assert_eq!(operands(rectangle), vec![10.0, 752.0, 200.0, 30.0]);
}

#[test]
fn deleting_every_page_fails_without_touching_state() {
    let mut editor = editor_with_pages(&[LETTER; 2]);
    editor.delete_page(0).unwrap();
    editor.delete_page(1).unwrap();

    let result = block_on(editor.export());
    assert!(matches!(result, Err(EditorError::Export(ExportError::NoPagesLeft))));
    assert_eq!(editor.structural_edits().len(), 2);
    assert!(editor.can_undo());
}

#[test]
fn export_without_document_is_an_error() {
    let editor = pdf_markup_core::Editor::default();
    assert!(matches!(block_on(editor.export()), Err(EditorError::NoDocument)));
}

#[test]
fn exported_document_writes_to_disk() {
    let editor = editor_with_pages(&[LETTER]);
    let exported = block_on(editor.export()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = exported.write_to(dir.path()).unwrap();
    assert_eq!(std::fs::read(path).unwrap(), exported.bytes);
}
