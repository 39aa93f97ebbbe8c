use blockdoc_core::{Editor, EditorCommand, KeyModifiers, NodeKey, Point};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

fn large_html(paragraph_count: usize) -> String {
    let mut out = String::with_capacity(paragraph_count * 96);
    for i in 0..paragraph_count {
        out.push_str(&format!(
            "<p>{i:06} the quick brown fox jumps over the <em>lazy</em> dog</p>"
        ));
    }
    out
}

fn large_editor(paragraph_count: usize) -> Editor {
    let mut editor = Editor::new();
    editor.import_html(&large_html(paragraph_count)).unwrap();
    editor
}

fn bench_large_import(c: &mut Criterion) {
    let html = large_html(10_000);
    c.bench_function("import_html/10k_paragraphs", |b| {
        b.iter(|| {
            let mut editor = Editor::new();
            editor.import_html(black_box(&html)).unwrap();
            black_box(editor.state().tree.node_count());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    c.bench_function("typing_middle/100_inserts", |b| {
        b.iter_batched(
            || {
                let mut editor = large_editor(10_000);
                let blocks = editor.state().tree.children(NodeKey::ROOT);
                let middle = blocks[blocks.len() / 2];
                let text = editor.state().tree.first_child(middle).unwrap();
                editor.update(|tx| tx.set_cursor(Point::text(text, 3)));
                editor
            },
            |mut editor| {
                for _ in 0..100 {
                    editor.dispatch(EditorCommand::InsertText("x".to_string()));
                }
                black_box(editor.version());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_enter_and_undo(c: &mut Criterion) {
    c.bench_function("enter_then_undo/50_rounds", |b| {
        b.iter_batched(
            || {
                let mut editor = large_editor(10_000);
                let first = editor.state().tree.first_child(NodeKey::ROOT).unwrap();
                editor.update(|tx| tx.select_end(first));
                editor
            },
            |mut editor| {
                for _ in 0..50 {
                    editor.dispatch(EditorCommand::KeyEnter(KeyModifiers::NONE));
                }
                while editor.undo() {}
                black_box(editor.version());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_export(c: &mut Criterion) {
    let editor = large_editor(10_000);
    c.bench_function("export_html/10k_paragraphs", |b| {
        b.iter(|| {
            black_box(editor.export_html().len());
        })
    });
}

criterion_group!(
    benches,
    bench_large_import,
    bench_typing_in_middle,
    bench_enter_and_undo,
    bench_export
);
criterion_main!(benches);
