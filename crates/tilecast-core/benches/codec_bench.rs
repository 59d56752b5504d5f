//! Criterion benchmarks for the Tilecast event codec.
//!
//! A busy tick can produce a few dozen events that are encoded once and
//! written to every client, so encode cost sits on the display loop.
//!
//! Run with:
//! ```bash
//! cargo bench --package tilecast-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tilecast_core::protocol::{decode_event, encode_event, EventStreamDecoder};
use tilecast_core::{InputEvent, Key, MouseButton, TRACKED_KEYS};

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    let key = InputEvent::key_down(Key::LeftControl);
    group.bench_function("KeyDown", |b| {
        b.iter(|| encode_event(black_box(&key), black_box(1), black_box(0)).unwrap())
    });

    let pointer = InputEvent::pointer_move(960.0, 540.0);
    group.bench_function("PointerMove", |b| {
        b.iter(|| encode_event(black_box(&pointer), black_box(1), black_box(0)).unwrap())
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let bytes = encode_event(&InputEvent::button_up(MouseButton::Right, 10.0, 20.0), 1, 0).unwrap();
    c.bench_function("decode/ButtonUp", |b| {
        b.iter(|| decode_event(black_box(&bytes)).unwrap())
    });
}

fn bench_stream_full_keyboard(c: &mut Criterion) {
    // Every tracked key going down in the same tick: the worst case.
    let mut stream = Vec::new();
    for (seq, key) in TRACKED_KEYS.iter().enumerate() {
        stream.extend(encode_event(&InputEvent::key_down(*key), seq as u64, 0).unwrap());
    }

    c.bench_function("stream/all_tracked_keys", |b| {
        b.iter(|| {
            let mut decoder = EventStreamDecoder::new();
            decoder.extend(black_box(&stream));
            decoder.drain_records().unwrap()
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_stream_full_keyboard);
criterion_main!(benches);
