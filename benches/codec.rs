//! Benchmarks for the frame and audio codecs.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::prelude::*;

use ppm_format::{
    AudioConfig, AudioTrack, Container, ContainerBuilder, Frame, Identifier, NoKeySigner,
    ParseConfig,
    codec::{HEIGHT, WIDTH, adpcm},
};

/// Frame with each pixel set with probability `density`.
fn noisy_frame(rng: &mut StdRng, density: f64) -> Frame {
    let mut frame = Frame::default();
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            if rng.gen_bool(density) {
                frame.layer1_mut().set(x, y, true);
            }
            if rng.gen_bool(density / 2.0) {
                frame.layer2_mut().set(x, y, true);
            }
        }
    }
    frame
}

fn sample_file(frames: usize, rng: &mut StdRng) -> Vec<u8> {
    let author = Identifier::new("Bench", 0xBEEF).unwrap();
    let pcm: Vec<i16> = (0..8192 * 4)
        .map(|i| ((i as f64 * 0.03).sin() * 6000.0) as i16)
        .collect();
    ContainerBuilder::new(author)
        .frames((0..frames).map(|_| noisy_frame(rng, 0.1)))
        .track_from_pcm(AudioTrack::Bgm, &pcm)
        .build()
        .unwrap()
        .to_bytes(&NoKeySigner)
        .unwrap()
}

fn bench_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");
    let mut rng = StdRng::seed_from_u64(7);

    for density in [0.01, 0.1, 0.5] {
        let prev = noisy_frame(&mut rng, density);
        let mut frame = noisy_frame(&mut rng, density);
        frame.set_translation(3, -2);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("density_{}", density)),
            &density,
            |b, _| {
                b.iter(|| black_box(frame.encode_after(Some(black_box(&prev)))));
            },
        );
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.sample_size(20);
    let mut rng = StdRng::seed_from_u64(11);

    for frames in [8, 64, 256] {
        let bytes = sample_file(frames, &mut rng);
        for workers in [1, 0] {
            let config = ParseConfig {
                worker_threads: workers,
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{}_frames", frames), workers),
                &config,
                |b, config| {
                    b.iter(|| Container::parse_with(black_box(&bytes), config).unwrap());
                },
            );
        }
    }

    group.finish();
}

fn bench_audio(c: &mut Criterion) {
    let mut group = c.benchmark_group("audio");
    let mut rng = StdRng::seed_from_u64(3);

    let pcm: Vec<i16> = (0..8192 * 8).map(|_| rng.gen_range(-8000..8000)).collect();
    let encoded = adpcm::encode(&pcm);

    group.bench_function("encode_8s", |b| b.iter(|| adpcm::encode(black_box(&pcm))));
    group.bench_function("decode_8s", |b| b.iter(|| adpcm::decode(black_box(&encoded))));

    let container = Container::parse(&sample_file(120, &mut rng))
        .unwrap()
        .into_container();
    let config = AudioConfig::default();
    group.bench_function("master_pcm", |b| {
        b.iter(|| container.master_pcm(black_box(&config)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_frame_encode, bench_parse, bench_audio);
criterion_main!(benches);
