use std::sync::Arc;

use pretty_assertions::assert_eq;
use textcore::{
    Content, DiagnosticRegion, DiagnosticSeverity, DiagnosticsContainer, DiagnosticsFeed,
    DiagnosticsShifter, Position,
};

fn error(start: usize, end: usize) -> DiagnosticRegion {
    DiagnosticRegion::new(start, end, DiagnosticSeverity::Error, 7)
}

fn attached(text: &str, regions: Vec<DiagnosticRegion>) -> (Content, Arc<DiagnosticsContainer>) {
    let container = Arc::new(DiagnosticsContainer::new());
    container.set_diagnostics(regions);
    let mut content = Content::from_text(text);
    content.add_listener(Box::new(DiagnosticsShifter::new(Arc::clone(&container))));
    (content, container)
}

#[test]
fn test_regions_follow_typing() {
    let (mut content, container) = attached("hello world", vec![error(6, 11)]);

    content.insert(0, 0, "> ").unwrap();
    assert_eq!(container.all(), vec![error(8, 13)]);

    content
        .delete(Position::new(0, 8), Position::new(0, 10))
        .unwrap();
    assert_eq!(container.all(), vec![error(8, 11)]);
    assert_eq!(content.sub_sequence(8, 11).unwrap(), "rld");
}

#[test]
fn test_multiline_insert_counts_line_breaks() {
    let (mut content, container) = attached("a\nbc\nd", vec![error(5, 6)]);

    content.insert(0, 1, "\n\n").unwrap();
    assert_eq!(container.all(), vec![error(7, 8)]);
    assert_eq!(content.sub_sequence(7, 8).unwrap(), "d");
}

#[test]
fn test_crlf_insert_counts_one_char_per_break() {
    let (mut content, container) = attached("ab", vec![error(1, 2)]);

    content.insert(0, 0, "x\r\ny").unwrap();
    assert_eq!(container.all(), vec![error(4, 5)]);
    assert_eq!(content.char_at_index(4).unwrap(), 'b');
}

#[test]
fn test_deleting_a_region_drops_it() {
    let (mut content, container) =
        attached("let x = 1;\nlet y = 2;", vec![error(4, 5), error(15, 16)]);

    content
        .delete(Position::new(0, 0), Position::new(1, 0))
        .unwrap();
    assert_eq!(container.all(), vec![error(4, 5)]);
    assert_eq!(content.sub_sequence(4, 5).unwrap(), "y");
}

#[test]
fn test_undo_shifts_regions_back() {
    let (mut content, container) = attached("abc def", vec![error(4, 7)]);

    content.insert(0, 0, "xyz").unwrap();
    assert_eq!(container.all(), vec![error(7, 10)]);
    content.undo().unwrap();
    assert_eq!(container.all(), vec![error(4, 7)]);
    content.redo().unwrap();
    assert_eq!(container.all(), vec![error(7, 10)]);
}

#[test]
fn test_removed_shifter_stops_tracking() {
    let container = Arc::new(DiagnosticsContainer::new());
    container.add_diagnostic(error(1, 2));
    let mut content = Content::from_text("ab");
    let id = content.add_listener(Box::new(DiagnosticsShifter::new(Arc::clone(&container))));

    assert!(content.remove_listener(id));
    content.insert(0, 0, "zz").unwrap();
    assert_eq!(container.all(), vec![error(1, 2)]);
}

#[test]
fn test_query_range_sees_shifted_regions() {
    let (mut content, container) = attached(
        "one two three",
        vec![
            DiagnosticRegion::new(8, 13, DiagnosticSeverity::Warning, 2),
            DiagnosticRegion::new(0, 3, DiagnosticSeverity::Hint, 1),
        ],
    );

    content.insert(0, 4, "\n").unwrap();
    let hits = container.query_range(0, 9);
    assert_eq!(hits.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);
    let hits = container.query_range(9, 10);
    assert_eq!(hits.iter().map(|r| (r.start, r.end)).collect::<Vec<_>>(), vec![(9, 14)]);
}

#[test]
fn test_feed_publishes_into_attached_documents() {
    let feed = DiagnosticsFeed::new();
    let mut content = Content::from_text("fn main() {}");
    content.add_listener(Box::new(DiagnosticsShifter::new(feed.container("file:///main.rs"))));

    feed.publish("file:///main.rs", vec![error(3, 7)]);
    content.insert(0, 0, "pub ").unwrap();

    let container = feed.container("file:///main.rs");
    assert_eq!(container.all(), vec![error(7, 11)]);
    assert_eq!(content.sub_sequence(7, 11).unwrap(), "main");
    assert_eq!(feed.uris(), vec!["file:///main.rs".to_string()]);
}

#[test]
fn test_regions_serialize_as_json() {
    let region = DiagnosticRegion::new(1, 4, DiagnosticSeverity::Information, 9);
    let json = serde_json::to_string(&region).unwrap();
    let back: DiagnosticRegion = serde_json::from_str(&json).unwrap();
    assert_eq!(back, region);
    assert!(json.contains("\"Information\""));
}
