use std::fs::File;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use textcore::{
    AsyncFormatter, Content, ContentConfig, ContentError, FormatOutcome, Language, LineEnding,
    Position, ReindentFormatter,
};

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn test_file_round_trip_keeps_crlf() {
    let path = std::env::temp_dir().join(format!("textcore-io-{}.txt", std::process::id()));
    std::fs::write(&path, "first\r\nsecond\r\n").unwrap();

    let mut content = Content::read_from(File::open(&path).unwrap()).unwrap();
    assert_eq!(content.line_count(), 3);
    assert_eq!(content.line_ending(), LineEnding::Crlf);

    content.insert(1, 6, "\nthird").unwrap();
    content.write_to(File::create(&path).unwrap()).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(written, "first\r\nsecond\r\nthird\r\n");
}

#[test]
fn test_read_many_lines() {
    let text: String = (0..1000).map(|i| format!("line {i}\n")).collect();
    let content = Content::read_from(text.as_bytes()).unwrap();

    assert_eq!(content.line_count(), 1001);
    assert_eq!(content.line_text(999).unwrap(), "line 999");
    assert_eq!(content.to_string(), text);
}

#[test]
fn test_read_with_invalid_config_fails() {
    let config = ContentConfig {
        max_undo_stack_size: 0,
        ..ContentConfig::default()
    };
    assert!(matches!(
        Content::read_from_with_config("x".as_bytes(), config),
        Err(ContentError::InvalidArgument(_))
    ));
}

#[test]
fn test_read_error_surfaces_as_io() {
    let err = Content::read_from(&[0xc3u8, 0x28][..]).unwrap_err();
    assert!(matches!(err, ContentError::Io(_)));
}

fn java_formatter() -> AsyncFormatter {
    AsyncFormatter::new(Arc::new(ReindentFormatter::new(&Language::Java))).unwrap()
}

#[test]
fn test_format_range_touches_only_selected_lines() {
    let formatter = java_formatter();
    let (tx, rx) = mpsc::channel();
    formatter.set_notify(move || {
        let _ = tx.send(());
    });

    let mut content = Content::from_text("f() {\nx();\ny();\n}");
    formatter.format_range(&content, Position::new(1, 0), Position::new(1, 4));
    rx.recv_timeout(WAIT).unwrap();

    let outcome = formatter.take_outcome().unwrap();
    assert!(outcome.apply_to(&mut content).unwrap());
    assert_eq!(content.to_string(), "f() {\n    x();\ny();\n}");
}

#[test]
fn test_failed_format_leaves_content_alone() {
    let formatter = AsyncFormatter::new(Arc::new(ReindentFormatter::new(&Language::Python)))
        .unwrap();
    let mut content = Content::from_text("if x:\ny");
    formatter.format(&content);
    assert!(formatter.wait_idle(WAIT));

    let outcome = formatter.take_outcome().unwrap();
    assert!(matches!(outcome, FormatOutcome::Failed(_)));
    assert!(!outcome.apply_to(&mut content).unwrap());
    assert_eq!(content.to_string(), "if x:\ny");
}

#[test]
fn test_outcome_is_stale_after_typing() {
    let formatter = java_formatter();
    let mut content = Content::from_text("f() {\nx();\n}");
    formatter.format(&content);
    assert!(formatter.wait_idle(WAIT));

    content.insert(1, 0, "z").unwrap();
    let outcome = formatter.take_outcome().unwrap();
    assert!(matches!(
        outcome.apply_to(&mut content),
        Err(ContentError::StaleCache)
    ));
    assert_eq!(content.to_string(), "f() {\nzx();\n}");
}

#[test]
fn test_formatted_text_records_no_undo_entry() {
    let formatter = java_formatter();
    let mut content = Content::from_text("f() {\n    x();\n}");
    formatter.format(&content);
    assert!(formatter.wait_idle(WAIT));

    assert!(formatter.take_outcome().unwrap().apply_to(&mut content).unwrap());
    assert!(!content.can_undo());
}

#[test]
fn test_outcome_is_taken_once() {
    let formatter = java_formatter();
    let content = Content::from_text("f() {\nx();\n}");
    formatter.format(&content);
    formatter.format(&content);
    assert!(formatter.wait_idle(WAIT));

    assert!(formatter.take_outcome().is_some());
    assert_eq!(formatter.take_outcome(), None);
    assert!(!formatter.is_running());
}
