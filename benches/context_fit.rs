//! Benchmark for the window fitting walk

use chat_context::{ContextWindowManager, Turn, WindowOptions};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn synthetic_turns(count: usize) -> Vec<Turn> {
    (0..count)
        .map(|i| {
            let content = format!("turn {}: {}", i, "lorem ipsum dolor sit amet ".repeat(6));
            if i % 2 == 0 {
                Turn::user(content)
            } else {
                Turn::assistant(content)
            }
        })
        .collect()
}

fn bench_fit(c: &mut Criterion) {
    let turns = synthetic_turns(200);

    let manager = ContextWindowManager::new(WindowOptions {
        max_tokens: 2000,
        reserve_tokens_for_response: 500,
        ..WindowOptions::default()
    });
    c.bench_function("fit_200_turns_truncating", |b| {
        b.iter(|| manager.fit(black_box(&turns)))
    });

    let roomy = ContextWindowManager::new(WindowOptions {
        max_tokens: 100_000,
        reserve_tokens_for_response: 500,
        ..WindowOptions::default()
    });
    c.bench_function("fit_200_turns_pass_through", |b| {
        b.iter(|| roomy.fit(black_box(&turns)))
    });
}

criterion_group!(benches, bench_fit);
criterion_main!(benches);
