use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dasp_graph::{Buffer, Input};

use blip::nodes::{LowPass, Oscillator, OscillatorMessage, Waveform};
use blip::{AudioNode, EngineConfig, ParamEvent, ProcessContext, SoundEngine, SoundName};

fn ctx(frame: u64) -> ProcessContext {
    ProcessContext {
        sample_rate: 48_000,
        buffer_size: Buffer::LEN,
        frame,
    }
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Oscillator.process() sweeping", |b| {
        let mut osc = Oscillator::new(Waveform::Sine);
        let mut output = [Buffer::default()];
        let input: [Input; 0] = [];
        let setup = [
            OscillatorMessage::Frequency(ParamEvent::SetValueAtTime { value: 800.0, time: 0.0 }),
            OscillatorMessage::Frequency(ParamEvent::ExponentialRampToValueAtTime { value: 100.0, end_time: 1e6 }),
            OscillatorMessage::Start(0.0),
        ];
        osc.process(&ctx(0), setup.into_iter(), &input, &mut output);

        let mut frame = 0;
        b.iter(move || {
            frame += Buffer::LEN as u64;
            osc.process(&ctx(frame), core::iter::empty(), &input, &mut output);
            black_box(&output);
        })
    });

    c.bench_function("LowPass.process() silent input", |b| {
        let mut filter = LowPass::new(3000.0);
        let mut output = [Buffer::default()];
        let input: [Input; 0] = [];

        b.iter(move || {
            filter.process(&ctx(0), core::iter::empty(), &input, &mut output);
            black_box(&output);
        })
    });

    c.bench_function("render every preset offline", |b| {
        b.iter(|| {
            let engine = SoundEngine::offline(EngineConfig::default().with_start_suspended(false));
            for name in SoundName::ALL {
                engine.play_sound(name);
            }
            let endpoint = engine.device().endpoint().map(|e| e.render(24_000));
            black_box(endpoint)
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
