use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use soundsync::audio::filter::FilterChain;
use soundsync::audio::frame::AudioFrame;
use soundsync::constants::{BASS_SHELF_HZ, FRAME_SIZE, SAMPLE_RATE};
use soundsync::playback::buffer::FrameAssembler;

fn pcm(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn bench_decode(c: &mut Criterion) {
    let frame = AudioFrame::new(Bytes::from(pcm(FRAME_SIZE))).unwrap();
    c.bench_function("decode_frame", |b| b.iter(|| black_box(&frame).decode()));
}

fn bench_assemble(c: &mut Criterion) {
    // Network-sized chunks that do not line up with frame boundaries
    let data = pcm(8190 * 16);
    c.bench_function("assemble_chunks", |b| {
        b.iter(|| {
            let mut assembler = FrameAssembler::new(FRAME_SIZE);
            let mut frames = 0;
            for chunk in data.chunks(8190) {
                assembler.push(chunk, |_| frames += 1);
            }
            black_box(frames)
        })
    });
}

fn bench_filter_chain(c: &mut Criterion) {
    let buffer = AudioFrame::new(Bytes::from(pcm(FRAME_SIZE))).unwrap().decode();
    let mut chain = FilterChain::new(SAMPLE_RATE, BASS_SHELF_HZ, 6.0, 1.5);
    c.bench_function("filter_chain_frame", |b| {
        b.iter(|| {
            for (&l, &r) in buffer.left.iter().zip(&buffer.right) {
                let (mut l, mut r) = (l, r);
                chain.process(&mut l, &mut r);
                black_box((l, r));
            }
        })
    });
}

criterion_group!(benches, bench_decode, bench_assemble, bench_filter_chain);
criterion_main!(benches);
