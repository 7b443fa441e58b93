//! End-to-end editing scenarios on a document

use gpx_workshop_lib::{
    Command, Config, Document, GeoPoint, ImportStatus, ParseError, SegmentId, TrackSegment,
    WorkspaceChange, spawn_import, utils, xml,
};
use std::cell::RefCell;
use std::rc::Rc;

const RIVER_WALK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="scenario">
  <trk>
    <name>River walk</name>
    <trkseg>
      <trkpt lat="0.0000" lon="0.0000"/>
      <trkpt lat="0.0000" lon="0.0100"/>
    </trkseg>
    <trkseg>
      <trkpt lat="0.0010" lon="0.0000"/>
      <trkpt lat="0.0010" lon="0.0100"/>
    </trkseg>
  </trk>
</gpx>
"#;

fn horizontal(latitude: f64) -> TrackSegment {
    TrackSegment::new(vec![
        GeoPoint::new(latitude, 0.0),
        GeoPoint::new(latitude, 0.01),
    ])
    .unwrap()
}

/// Route library logs to the test output; set RUST_LOG to see them
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn snapshot(document: &Document) -> (Vec<SegmentId>, Vec<SegmentId>) {
    (
        document.segments().map(|s| s.id()).collect(),
        document.selected_ids(),
    )
}

#[test]
fn test_empty_input_reports_line_zero() {
    for input in ["", "   \n\t  "] {
        let err = xml::parse(input.as_bytes()).unwrap_err();
        assert_eq!(err, ParseError::EmptyContent);
        assert_eq!(err.line(), 0);
    }
}

#[test]
fn test_malformed_reports_first_bad_line() {
    let doc = "<gpx>\n  <trk>\n    <trkseg>\n    </trk>\n</gpx>\n";
    let err = xml::parse(doc.as_bytes()).unwrap_err();
    assert!(matches!(err, ParseError::Malformed { .. }));
    assert_eq!(err.line(), 4);
}

#[test]
fn test_document_without_tracks() {
    let root = xml::parse(br#"<gpx version="1.1" creator="x"></gpx>"#).unwrap();
    assert_eq!(root.name(), "gpx");
    assert!(root.children().is_empty());

    let mut document = Document::default();
    let ids = document
        .import_bytes(br#"<gpx version="1.1" creator="x"></gpx>"#)
        .unwrap();
    assert!(ids.is_empty());
    assert!(!document.can_undo());
}

#[test]
fn test_near_segment_is_chosen_over_far() {
    let mut document = Document::default();
    let ids = document.import_bytes(RIVER_WALK.as_bytes()).unwrap();
    let (near, far) = (ids[0], ids[1]);

    // About 11 m north of the first segment, 100 m south of the second
    let point = utils::wgs84_to_mercator(0.0001, 0.005);
    assert_eq!(document.closest(point, 50.0), Some(near));
    assert_ne!(document.closest(point, 50.0), Some(far));
    assert_eq!(document.closest(point, 5.0), None);
}

#[test]
fn test_closest_never_exceeds_tolerance() {
    let mut document = Document::default();
    document.append((0..20).map(|i| horizontal(i as f64 * 0.0005)).collect());

    for step in 0..50 {
        let point = utils::wgs84_to_mercator(step as f64 * 0.0003 - 0.002, 0.004 + step as f64 * 0.0002);
        for tolerance in [1.0, 10.0, 25.0, 100.0] {
            if let Some(id) = document.closest(point, tolerance) {
                let distance = document.segment(id).unwrap().distance_to(point);
                assert!(distance < tolerance, "{distance} >= {tolerance}");
            }
        }
    }
}

#[test]
fn test_select_at_replaces_selection_in_one_step() {
    let mut document = Document::default();
    let ids = document.import_bytes(RIVER_WALK.as_bytes()).unwrap();
    document.select(ids[1]);

    let point = utils::wgs84_to_mercator(0.0001, 0.005);
    assert_eq!(document.select_at(point, 50.0), Some(ids[0]));
    assert_eq!(document.selected_ids(), vec![ids[0]]);

    assert!(document.undo());
    assert_eq!(document.selected_ids(), vec![ids[1]]);
}

#[test]
fn test_select_at_already_selected_segment_drops_the_others() {
    let mut document = Document::default();
    let ids = document.import_bytes(RIVER_WALK.as_bytes()).unwrap();
    document.select(ids[0]);
    document.select(ids[1]);

    let point = utils::wgs84_to_mercator(0.0001, 0.005);
    assert_eq!(document.select_at(point, 50.0), Some(ids[0]));
    assert_eq!(document.selected_ids(), vec![ids[0]]);

    assert!(document.undo());
    assert_eq!(document.selected_ids(), vec![ids[0], ids[1]]);
}

#[test]
fn test_shift_click_toggles_without_clearing() {
    let mut document = Document::default();
    let ids = document.import_bytes(RIVER_WALK.as_bytes()).unwrap();
    document.select(ids[1]);

    let point = utils::wgs84_to_mercator(0.0001, 0.005);
    assert_eq!(document.toggle_selection_at(point, 50.0), Some(ids[0]));
    assert_eq!(document.selected_ids(), vec![ids[0], ids[1]]);

    assert!(document.undo());
    assert_eq!(document.selected_ids(), vec![ids[1]]);
}

#[test]
fn test_illegal_markup_reports_its_line() {
    let cases: [(&str, usize); 3] = [
        ("<gpx>\n<trk>\n<<trkseg/>\n</trk></gpx>", 3),
        ("<gpx>\n<trk name=\"a<b\"/>\n</gpx>", 2),
        ("<gpx>\n<trk>\n<name>a ]]> b</name>\n</trk>\n</gpx>", 3),
    ];
    for (input, line) in cases {
        let err = xml::parse(input.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }), "{input:?}: {err:?}");
        assert_eq!(err.line(), line, "{input:?}");
    }
}

#[test]
fn test_append_delete_undo_restores_segment() {
    let mut document = Document::default();
    let s1 = horizontal(0.0);
    let s2 = horizontal(1.0);
    let (id1, id2) = (s1.id(), s2.id());

    document.append(vec![s1, s2]);
    document.delete(vec![id1]);
    assert!(document.segment(id1).is_none());

    document.undo();
    assert!(document.segment(id1).is_some());
    assert!(document.segment(id2).is_some());
    assert_eq!(document.info().segment_count, 2);
}

#[test]
fn test_deselect_all_is_idempotent() {
    let mut document = Document::default();
    let segment = horizontal(0.0);
    let id = segment.id();
    document.append(vec![segment]);
    document.select(id);

    assert!(document.deselect_all());
    assert!(document.deselect_all());
    assert!(document.selected_ids().is_empty());

    // The second call restores the already-empty selection
    document.undo();
    assert!(document.selected_ids().is_empty());
    document.undo();
    assert_eq!(document.selected_ids(), vec![id]);
}

#[test]
fn test_undo_then_redo_restores_exact_state() {
    init_logging();
    let mut document = Document::default();
    let segments: Vec<TrackSegment> = (0..4).map(|i| horizontal(i as f64)).collect();
    let ids: Vec<SegmentId> = segments.iter().map(|s| s.id()).collect();
    let extra = horizontal(10.0);

    let commands = vec![
        Command::Append(segments),
        Command::Select(ids[0]),
        Command::Select(ids[2]),
        Command::Delete(vec![ids[0], ids[1]]),
        Command::SelectAll(vec![ids[2], ids[3]]),
        Command::InsertSelected(vec![extra]),
        Command::DeselectAll,
        Command::Select(ids[3]),
        Command::DeleteSelected { restore: Vec::new() },
    ];

    let mut states = vec![snapshot(&document)];
    for command in commands {
        document.execute(command);
        states.push(snapshot(&document));
    }

    // Step back through every state, checking each undo/redo pair in place
    for expected in states.iter().rev().skip(1) {
        let before = snapshot(&document);
        assert!(document.undo());
        assert_eq!(snapshot(&document), *expected);

        let after_undo = snapshot(&document);
        assert!(document.redo());
        assert_eq!(snapshot(&document), before);
        assert!(document.undo());
        assert_eq!(snapshot(&document), after_undo);
    }
    assert!(!document.undo());
}

#[test]
fn test_observer_sees_changes() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let mut document = Document::with_observer(
        Config::default(),
        Box::new(move |change: &WorkspaceChange| sink.borrow_mut().push(change.clone())),
    );

    let segment = horizontal(0.0);
    let id = segment.id();
    document.append(vec![segment]);
    document.select(id);
    document.delete_selected();

    assert_eq!(
        *log.borrow(),
        vec![
            WorkspaceChange::Added(vec![id]),
            WorkspaceChange::Selected(vec![id]),
            WorkspaceChange::Deselected(vec![id]),
            WorkspaceChange::Removed(vec![id]),
        ]
    );
    assert_eq!(document.style_of(id), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_background_import_then_apply() {
    init_logging();
    let dir = std::env::temp_dir().join(format!("gpx-workshop-scenarios-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let good = dir.join("river.gpx");
    std::fs::write(&good, RIVER_WALK).unwrap();
    let broken = dir.join("broken.gpx");
    std::fs::write(&broken, "<gpx>\n<trk>\n").unwrap();

    let handle = spawn_import(vec![good.clone(), broken.clone()]);
    let imports = handle.wait().await.unwrap();

    let mut document = Document::default();
    let report = document.apply_import(imports);
    assert_eq!(report.segment_count(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, broken);

    assert!(document.undo());
    assert_eq!(document.info().segment_count, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_import_never_reaches_document() {
    init_logging();
    let dir = std::env::temp_dir().join(format!("gpx-workshop-cancel-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("river.gpx");
    std::fs::write(&path, RIVER_WALK).unwrap();

    let mut handle = spawn_import(vec![path; 16]);
    handle.cancel();
    assert!(matches!(handle.poll(), ImportStatus::Cancelled));
    assert!(handle.wait().await.is_none());
}
