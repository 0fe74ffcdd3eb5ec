use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use textcore::styles::{COMMENT, KEYWORD, LITERAL, Span, TEXT_NORMAL};
use textcore::{
    AnalysisError, AnalyzeDelegate, AnalyzeResult, CodeAnalyzer, Content, ContentSnapshot,
    IncrementalAnalyzeManager, IncrementalAnalyzer, Language, LanguageAnalyzer, LineTokens,
    Position, Styles, TextAnalyzer, run_analyzer,
};

const WAIT: Duration = Duration::from_secs(5);

const JAVA: &str = concat!(
    "class Demo {\n",
    "    int count = 0;\n",
    "    void run() {\n",
    "        count++;\n",
    "    }\n",
    "}\n",
);

/// Honors `RUST_LOG` so worker logs show up with `--nocapture`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn java() -> LanguageAnalyzer {
    LanguageAnalyzer::new(&Language::Java)
}

fn full_analysis(content: &Content) -> Styles {
    run_analyzer(&java(), &content.snapshot(), &AnalyzeDelegate::always()).unwrap()
}

/// Compare styles on every character of every non-empty line.
fn assert_same_styles(content: &Content, actual: &Styles, expected: &Styles) {
    assert_eq!(actual.line_count(), content.line_count());
    for (line, text) in content.lines().iter().enumerate() {
        for column in 0..text.len() {
            assert_eq!(
                actual.style_at(line, column),
                expected.style_at(line, column),
                "style mismatch at ({line}, {column}) in {:?}",
                text.as_str()
            );
        }
    }
    assert_eq!(actual.blocks(), expected.blocks());
    assert_eq!(actual.navigation(), expected.navigation());
}

#[test]
fn test_incremental_result_matches_full_analysis() {
    init_tracing();
    let manager = IncrementalAnalyzeManager::new(java()).unwrap();
    let mut content = Content::from_text(JAVA);
    manager.reset(&content);
    content.add_listener(Box::new(manager.trigger()));

    content.insert(1, 0, "/* note\n").unwrap();
    content.insert(3, 0, "*/").unwrap();
    content
        .delete(Position::new(1, 0), Position::new(1, 2))
        .unwrap();
    content.undo().unwrap();
    content
        .replace(Position::new(4, 8), Position::new(4, 13), "total")
        .unwrap();

    assert!(manager.wait_idle(WAIT));
    let expected = full_analysis(&content);
    assert_eq!(expected.style_at(2, 4), COMMENT);
    assert_same_styles(&content, &manager.result(), &expected);
}

#[test]
fn test_incremental_manager_reports_through_callback() {
    let manager = IncrementalAnalyzeManager::new(java()).unwrap();
    let (tx, rx) = mpsc::channel();
    manager.set_callback(move |styles| {
        let _ = tx.send(styles.line_count());
    });

    manager.reset(&Content::from_text("a\nb\nc"));
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), 3);
}

/// Lines between two fence lines are literals; the fence toggles the state.
struct FenceAnalyzer;

impl IncrementalAnalyzer for FenceAnalyzer {
    type State = bool;

    fn initial_state(&self) -> bool {
        false
    }

    fn tokenize_line(&self, line: &str, in_fence: &bool) -> LineTokens<bool> {
        if line.starts_with("```") {
            return LineTokens {
                spans: vec![Span::new(0, KEYWORD)],
                state: !in_fence,
            };
        }
        let style = if *in_fence { LITERAL } else { TEXT_NORMAL };
        LineTokens {
            spans: vec![Span::new(0, style)],
            state: *in_fence,
        }
    }
}

#[test]
fn test_state_change_propagates_past_edited_line() {
    init_tracing();
    let manager = IncrementalAnalyzeManager::new(FenceAnalyzer).unwrap();
    let mut content = Content::from_text("a\n```\nb\n```\nc");
    manager.reset(&content);
    content.add_listener(Box::new(manager.trigger()));
    assert!(manager.wait_idle(WAIT));

    let styles = manager.result();
    assert_eq!(styles.style_at(2, 0), LITERAL);
    assert_eq!(styles.style_at(4, 0), TEXT_NORMAL);

    content
        .delete(Position::new(1, 0), Position::new(2, 0))
        .unwrap();
    assert!(manager.wait_idle(WAIT));

    let styles = manager.result();
    assert_eq!(styles.line_count(), 4);
    assert_eq!(styles.style_at(1, 0), TEXT_NORMAL);
    assert_eq!(styles.style_at(2, 0), KEYWORD);
    assert_eq!(styles.style_at(3, 0), LITERAL);
}

#[test]
fn test_text_analyzer_waits_for_batch_end() {
    init_tracing();
    let analyzer = TextAnalyzer::new(Arc::new(java())).unwrap();
    let mut content = Content::from_text("int x;");
    content.add_listener(Box::new(analyzer.trigger()));
    analyzer.analyze(&content);
    assert!(analyzer.wait_idle(WAIT));
    assert_eq!(analyzer.completed_passes(), 1);

    content.begin_batch_edit();
    content.insert(0, 0, "\n").unwrap();
    content.insert(0, 0, "class A {}").unwrap();
    assert!(analyzer.wait_idle(WAIT));
    assert_eq!(analyzer.completed_passes(), 1);

    // The stale result is shifted along with the text.
    let shifted = analyzer.result();
    assert_eq!(shifted.line_count(), 2);
    assert_eq!(shifted.style_at(1, 0), KEYWORD);

    content.end_batch_edit();
    assert!(analyzer.wait_idle(WAIT));
    assert_eq!(analyzer.completed_passes(), 2);
    let styles = analyzer.result();
    assert_eq!(styles.style_at(0, 0), KEYWORD);
    let labels: Vec<&str> = styles.navigation().iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["A"]);
}

/// Sleeps before delegating so that a newer request can supersede it.
struct Slow(LanguageAnalyzer);

impl CodeAnalyzer for Slow {
    fn analyze(
        &self,
        content: &ContentSnapshot,
        result: &mut AnalyzeResult,
        delegate: &AnalyzeDelegate,
    ) -> Result<(), AnalysisError> {
        std::thread::sleep(Duration::from_millis(50));
        delegate.check()?;
        self.0.analyze(content, result, delegate)
    }
}

#[test]
fn test_newer_request_supersedes_running_pass() {
    init_tracing();
    let analyzer = TextAnalyzer::new(Arc::new(Slow(java()))).unwrap();
    analyzer.analyze(&Content::from_text("x y z"));
    analyzer.analyze(&Content::from_text("class B\n{\n}"));
    assert!(analyzer.wait_idle(WAIT));

    let styles = analyzer.result();
    assert_eq!(styles.line_count(), 3);
    assert_eq!(styles.style_at(0, 0), KEYWORD);
    assert!(analyzer.completed_passes() >= 1);
}

#[test]
fn test_shutdown_ignores_later_requests() {
    let mut analyzer = TextAnalyzer::new(Arc::new(java())).unwrap();
    analyzer.shutdown();
    analyzer.analyze(&Content::from_text("class A {}"));
    assert!(analyzer.wait_idle(WAIT));
    assert_eq!(analyzer.completed_passes(), 0);
}
