use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use textcore::{AnalyzeDelegate, Content, Language, LanguageAnalyzer, run_analyzer};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 64);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06} int value = compute(\"the quick brown fox\"); // textcore benchmark line\n"
        ));
    }
    // Remove the final '\n' to avoid creating an extra trailing empty line.
    out.pop();
    out
}

fn bench_large_file_open(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("large_file_open/50k_lines", |b| {
        b.iter(|| {
            let content = Content::from_text(black_box(&text));
            black_box(content.line_count());
        })
    });
}

fn bench_read_from(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("read_from/50k_lines", |b| {
        b.iter(|| {
            let content = Content::read_from(black_box(text.as_bytes())).unwrap();
            black_box(content.len());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("typing_middle/100_inserts", |b| {
        b.iter_batched(
            || Content::from_text(&text),
            |mut content| {
                let line = content.line_count() / 2;
                for column in 0..100 {
                    content.insert(line, column, "x").unwrap();
                }
                black_box(content.undo_manager().undo_depth());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_index_lookups(c: &mut Criterion) {
    let text = large_text(50_000);
    let content = Content::from_text(&text);
    let len = content.len();

    c.bench_function("char_position/scattered", |b| {
        b.iter(|| {
            for step in 0..64 {
                let index = (step * 7919 * 64) % len;
                black_box(content.char_position(index).unwrap());
            }
        })
    });
}

fn bench_streaming_scan(c: &mut Criterion) {
    let text = large_text(5_000);
    let content = Content::from_text(&text);

    c.bench_function("stream_char_at/5k_lines", |b| {
        b.iter(|| {
            content.begin_stream_char_getting(0).unwrap();
            let mut newlines = 0usize;
            for index in 0..content.len() {
                if content.stream_char_at(index).unwrap() == '\n' {
                    newlines += 1;
                }
            }
            content.end_stream_char_getting();
            black_box(newlines);
        })
    });
}

fn bench_full_analysis(c: &mut Criterion) {
    let snapshot = Content::from_text(&large_text(5_000)).snapshot();
    let analyzer = LanguageAnalyzer::new(&Language::Java);

    c.bench_function("analysis/java_5k_lines", |b| {
        b.iter(|| {
            let styles = run_analyzer(&analyzer, &snapshot, &AnalyzeDelegate::always()).unwrap();
            black_box(styles.line_count());
        })
    });
}

criterion_group!(
    benches,
    bench_large_file_open,
    bench_read_from,
    bench_typing_in_middle,
    bench_index_lookups,
    bench_streaming_scan,
    bench_full_analysis
);
criterion_main!(benches);
