use criterion::{criterion_group, criterion_main, Criterion};

use posterforge::moderation::ModerationEngine;
use posterforge::rendering::layout;

// Benchmarks exercise the hot pure paths: moderation and line wrapping.
// Run with: cargo bench

fn bench_moderate(c: &mut Criterion) {
    let engine = ModerationEngine::new();
    let text = "金鐘六十星光閃耀，快來投資賺錢，白癡才不來，一起應援吧！".repeat(4);

    c.bench_function("moderate", |b| {
        b.iter(|| {
            let result = engine.moderate(&text);
            assert!(result.has_filtered_words());
        })
    });
}

fn bench_wrap(c: &mut Criterion) {
    let text = "金鐘六十星光閃耀一起點亮星光大道".repeat(8);
    let measure = |line: &str| line.chars().count() as f32 * 24.0;

    c.bench_function("wrap", |b| {
        b.iter(|| {
            let set = layout::wrap(&text, measure, 320.0, 28.0);
            assert!(!set.lines.is_empty());
        })
    });
}

criterion_group!(benches, bench_moderate, bench_wrap);
criterion_main!(benches);
