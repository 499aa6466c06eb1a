use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use livedom::{EditDelta, Position, Session, SyncConfig, TreeBuilder, diff_subtrees};
use livedom::{FreshIds, IdGenerator, RootAnchor};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 5_000;

// Row 0 is `<main>`; block k sits on row k + 1 and its span text starts at
// column 23.
const BLOCK: &str = "  <div class=box><span>hello</span><img src=x></div>\n";
const TEXT_COLUMN: usize = 23;

fn make_blocks(count: usize) -> String {
    let mut out = String::with_capacity(count * BLOCK.len() + 16);
    out.push_str("<main>\n");
    for _ in 0..count {
        out.push_str(BLOCK);
    }
    out.push_str("</main>\n");
    out
}

/// Text after typing `x` at the start of the span text in the middle block.
fn edited(blocks: usize) -> (String, EditDelta) {
    let source = make_blocks(blocks);
    let row = blocks / 2 + 1;
    let line_start = "<main>\n".len() + (row - 1) * BLOCK.len();
    let at = line_start + TEXT_COLUMN;
    let mut text = source.clone();
    text.insert(at, 'x');
    (text, EditDelta::insert(Position::new(row, TEXT_COLUMN), "x"))
}

fn bench_update(c: &mut Criterion, name: &str, blocks: usize, incremental: bool) {
    let source = make_blocks(blocks);
    let (text, delta) = edited(blocks);
    c.bench_function(name, |b| {
        b.iter_batched(
            || {
                let mut session = Session::new(SyncConfig {
                    incremental,
                    ..SyncConfig::default()
                });
                session.load(&source).expect("load failed");
                session
            },
            |mut session| {
                let outcome = session
                    .update(black_box(&text), std::slice::from_ref(&delta))
                    .expect("update failed");
                black_box(outcome.script.len());
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_incremental_small(c: &mut Criterion) {
    bench_update(c, "bench_incremental_small", SMALL_BLOCKS, true);
}

fn bench_incremental_large(c: &mut Criterion) {
    bench_update(c, "bench_incremental_large", LARGE_BLOCKS, true);
}

fn bench_full_large(c: &mut Criterion) {
    bench_update(c, "bench_full_large", LARGE_BLOCKS, false);
}

fn bench_build_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    let builder = TreeBuilder::default();
    c.bench_function("bench_build_large", |b| {
        b.iter(|| {
            let mut ids = IdGenerator::new();
            let root = builder
                .build(black_box(&input), Position::ZERO, &mut FreshIds::new(&mut ids))
                .expect("build failed");
            black_box(root);
        });
    });
}

fn bench_diff_identical_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    let mut ids = IdGenerator::new();
    let root = TreeBuilder::default()
        .build(&input, Position::ZERO, &mut FreshIds::new(&mut ids))
        .expect("build failed");
    let copy = root.clone();
    c.bench_function("bench_diff_identical_large", |b| {
        b.iter(|| {
            let script = diff_subtrees(black_box(&root), black_box(&copy), RootAnchor::DOCUMENT)
                .expect("diff failed");
            black_box(script.len());
        });
    });
}

criterion_group!(
    benches,
    bench_incremental_small,
    bench_incremental_large,
    bench_full_large,
    bench_build_large,
    bench_diff_identical_large
);
criterion_main!(benches);
