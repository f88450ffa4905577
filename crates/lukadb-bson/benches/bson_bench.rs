use criterion::{criterion_group, criterion_main, Criterion};
use lukadb_bson::{decode, encode_to_vec, Cursor, Document, ElementType};

fn sample_document() -> Document {
    let mut likes = lukadb_bson::Array::new();
    likes.push("green");
    likes.push("night");
    likes.push("seeds");

    let mut meta = Document::new();
    meta.insert("ratio", 0.5);
    meta.insert("rank", 12i64);

    let mut doc = Document::new();
    doc.insert("name", "Grenny");
    doc.insert("type", "African Grey");
    doc.insert("male", true);
    doc.insert("age", 1);
    doc.insert("likes", likes);
    doc.insert("meta", meta);
    doc
}

fn bench_document_create(c: &mut Criterion) {
    c.bench_function("document_create", |b| {
        b.iter(|| {
            let mut doc = Document::new();
            doc.insert("name", "Luka");
            doc.insert("age", 20i64);
            doc.insert("version", "v1");
            doc
        })
    });
}

fn bench_encode(c: &mut Criterion) {
    let doc = sample_document();
    c.bench_function("encode", |b| b.iter(|| encode_to_vec(&doc)));
}

fn bench_decode(c: &mut Criterion) {
    let bytes = encode_to_vec(&sample_document()).unwrap();
    c.bench_function("decode", |b| b.iter(|| decode(&bytes)));
}

fn bench_cursor_scan(c: &mut Criterion) {
    let bytes = encode_to_vec(&sample_document()).unwrap();
    c.bench_function("cursor_scan_skip_all", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(&bytes).unwrap();
            while cursor.advance().unwrap() != ElementType::EndOfObject {
                Cursor::skip(&mut cursor).unwrap();
            }
        })
    });
}

fn bench_cursor_projection(c: &mut Criterion) {
    let bytes = encode_to_vec(&sample_document()).unwrap();
    c.bench_function("cursor_projection_one_field", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(&bytes).unwrap();
            cursor.to_document_filtered(&["age"])
        })
    });
}

criterion_group!(
    benches,
    bench_document_create,
    bench_encode,
    bench_decode,
    bench_cursor_scan,
    bench_cursor_projection,
);

criterion_main!(benches);
