// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sampler_engine::audio::DecodedBuffer;
use sampler_engine::config::EngineConfig;
use sampler_engine::samples::{
    SampleId, SampleRecord, SamplerEngine, ZeroCrossings, DEFAULT_ZERO_THRESHOLD,
};
use std::time::Duration;

const SAMPLE_RATE: u32 = 48000;

fn generate_test_audio(duration_seconds: f32, sample_rate: u32) -> Vec<f32> {
    let num_samples = (duration_seconds * sample_rate as f32) as usize;
    let mut samples = Vec::with_capacity(num_samples);

    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        // A chord with enough partials to cross zero irregularly.
        let sample = 0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
            + 0.2 * (2.0 * std::f32::consts::PI * 277.18 * t).sin()
            + 0.1 * (2.0 * std::f32::consts::PI * 329.63 * t).sin();
        samples.push(sample);
    }

    samples
}

fn benchmark_zero_crossings(c: &mut Criterion) {
    let mut group = c.benchmark_group("zero_crossings");

    for seconds in [1.0f32, 10.0] {
        let buffer =
            DecodedBuffer::mono(generate_test_audio(seconds, SAMPLE_RATE), SAMPLE_RATE).unwrap();
        group.bench_with_input(
            BenchmarkId::new("build", format!("{}s", seconds)),
            &buffer,
            |b, buffer| {
                b.iter(|| black_box(ZeroCrossings::build(black_box(buffer), DEFAULT_ZERO_THRESHOLD)))
            },
        );
    }

    let buffer = DecodedBuffer::mono(generate_test_audio(10.0, SAMPLE_RATE), SAMPLE_RATE).unwrap();
    let crossings = ZeroCrossings::build(&buffer, DEFAULT_ZERO_THRESHOLD);
    group.bench_function("snap", |b| {
        let mut t = 0.0;
        b.iter(|| {
            t = (t + 0.1234) % 10.0;
            black_box(crossings.snap(black_box(t)))
        })
    });

    group.finish();
}

fn benchmark_mixer(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixer");
    group.measurement_time(Duration::from_secs(5));

    for voices in [1usize, 8, 32] {
        let (engine, mut mixer) = SamplerEngine::new(
            &EngineConfig::new()
                .with_sample_rate(SAMPLE_RATE)
                .with_channels(2),
        )
        .unwrap();
        let id = SampleId::from("chord");
        let buffer =
            DecodedBuffer::mono(generate_test_audio(2.0, SAMPLE_RATE), SAMPLE_RATE).unwrap();
        engine
            .load_sample(SampleRecord::new(id.clone()), buffer)
            .unwrap();
        engine.set_selected_sample_ids(vec![id]);
        engine.set_loop(true);
        for i in 0..voices {
            engine.play_note(36 + (i % 48) as u8).unwrap();
        }

        let block_frames = 512;
        let mut output = vec![0.0f32; block_frames * 2];
        group.bench_with_input(
            BenchmarkId::new("process_block", voices),
            &voices,
            |b, _| {
                b.iter(|| {
                    mixer.process_into_output(black_box(&mut output));
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_zero_crossings, benchmark_mixer);
criterion_main!(benches);
