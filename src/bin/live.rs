//! cpal-based live host: plays filtered noise on the default output device
//! while a control thread sweeps the cutoff through the shared parameter
//! store, exercising the audio-thread/control-thread split for real.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use ladder_dsp::{AtomicSampleRate, LadderFilter, ParamId, ParamStore};
use log::{error, info};

const RUN_SECONDS: u64 = 15;
const SWEEP_MIN_HZ: f32 = 200.0;
const SWEEP_MAX_HZ: f32 = 8000.0;
const SWEEP_PERIOD_SECONDS: f32 = 4.0;
const SCRATCH_FRAMES: usize = 8192;

/// xorshift32, cheap deterministic noise for the test signal.
#[inline(always)]
fn next_noise(state: &mut u32) -> f32 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *state = x;
    (x as f32 / u32::MAX as f32) * 2.0 - 1.0
}

/// Buffers owned by the audio callback, sized once before the stream
/// starts so the callback itself never allocates.
struct Scratch {
    noise_state: u32,
    in_left: Vec<f32>,
    in_right: Vec<f32>,
    out_left: Vec<f32>,
    out_right: Vec<f32>,
}

impl Scratch {
    fn new(frames: usize) -> Self {
        Self {
            noise_state: 0x1234_5678,
            in_left: vec![0.0; frames],
            in_right: vec![0.0; frames],
            out_left: vec![0.0; frames],
            out_right: vec![0.0; frames],
        }
    }
}

/// Fill an interleaved output buffer with filtered noise. Oversized device
/// requests are processed in scratch-sized chunks instead of growing the
/// buffers on the audio thread.
fn fill_output(filter: &mut LadderFilter, scratch: &mut Scratch, data: &mut [f32], channels: usize) {
    let frames = data.len() / channels;
    let mut offset = 0;
    while offset < frames {
        let chunk = (frames - offset).min(scratch.in_left.len());

        for i in 0..chunk {
            let sample = next_noise(&mut scratch.noise_state) * 0.25;
            scratch.in_left[i] = sample;
            scratch.in_right[i] = sample;
        }

        filter.process_stereo(
            &scratch.in_left[..chunk],
            &scratch.in_right[..chunk],
            &mut scratch.out_left[..chunk],
            &mut scratch.out_right[..chunk],
            chunk,
        );

        for i in 0..chunk {
            let frame = &mut data[(offset + i) * channels..(offset + i + 1) * channels];
            frame[0] = scratch.out_left[i];
            if channels > 1 {
                frame[1] = scratch.out_right[i];
            }
            for extra in frame.iter_mut().skip(2) {
                *extra = 0.0;
            }
        }

        offset += chunk;
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No default output device")?;
    let config = device
        .default_output_config()
        .context("No default output config")?;
    if config.sample_format() != SampleFormat::F32 {
        bail!("Only f32 output is supported, got {:?}", config.sample_format());
    }

    let stream_config: cpal::StreamConfig = config.into();
    let channels = stream_config.channels as usize;
    if channels == 0 {
        bail!("Output device reports zero channels");
    }

    info!(
        "Output: {} at {} Hz, {} channels",
        device.name().unwrap_or_else(|_| "unknown".to_string()),
        stream_config.sample_rate.0,
        channels
    );

    let params = Arc::new(ParamStore::new());
    params.set_value(ParamId::Drive, 0.8);
    params.set_value(ParamId::Resonance, 0.6);

    let rate = Arc::new(AtomicSampleRate::new(stream_config.sample_rate.0 as f64));
    let mut filter = LadderFilter::new(params.clone(), rate);

    // Size the scratch from the device's reported block size when it is
    // fixed, otherwise fall back to a generous constant; requests beyond
    // either are handled by chunking, never by reallocating.
    let scratch_frames = match stream_config.buffer_size {
        cpal::BufferSize::Fixed(frames) => (frames as usize).max(SCRATCH_FRAMES),
        cpal::BufferSize::Default => SCRATCH_FRAMES,
    };
    let mut scratch = Scratch::new(scratch_frames);

    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _| {
            fill_output(&mut filter, &mut scratch, data, channels);
        },
        |err| error!("Stream error: {}", err),
        None,
    )?;
    stream.play()?;

    // Control thread: logarithmic cutoff sweep through the atomic store,
    // concurrent with the running audio callback.
    let sweep_params = params.clone();
    let sweeper = std::thread::spawn(move || {
        let log_min = SWEEP_MIN_HZ.ln();
        let log_max = SWEEP_MAX_HZ.ln();
        let start = std::time::Instant::now();
        while start.elapsed() < Duration::from_secs(RUN_SECONDS) {
            let phase = start.elapsed().as_secs_f32() / SWEEP_PERIOD_SECONDS;
            let t = 0.5 - 0.5 * (2.0 * std::f32::consts::PI * phase).cos();
            let cutoff = (log_min + (log_max - log_min) * t).exp();
            sweep_params.set_value(ParamId::Cutoff, cutoff);
            std::thread::sleep(Duration::from_millis(10));
        }
    });

    info!("Playing filtered noise for {} seconds", RUN_SECONDS);
    sweeper.join().ok();
    info!("Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_filter() -> LadderFilter {
        let params = Arc::new(ParamStore::new());
        params.set_value(ParamId::Drive, 1.0);
        LadderFilter::new(params, Arc::new(AtomicSampleRate::new(48000.0)))
    }

    #[test]
    fn test_fill_output_overwrites_every_sample() {
        let mut filter = make_filter();
        let mut scratch = Scratch::new(64);
        let channels = 2;
        let mut data = vec![f32::NAN; 64 * channels];

        fill_output(&mut filter, &mut scratch, &mut data, channels);

        assert!(
            data.iter().all(|s| s.is_finite()),
            "every interleaved sample must be written"
        );
    }

    #[test]
    fn test_fill_output_chunks_oversized_requests_without_growing() {
        let mut filter = make_filter();
        // Scratch much smaller than the request forces the chunked path.
        let mut scratch = Scratch::new(16);
        let capacity_before = scratch.in_left.capacity();

        let channels = 2;
        let mut data = vec![f32::NAN; 100 * channels];
        fill_output(&mut filter, &mut scratch, &mut data, channels);

        assert!(data.iter().all(|s| s.is_finite()));
        assert_eq!(
            scratch.in_left.capacity(),
            capacity_before,
            "scratch must not grow during a callback"
        );
        assert_eq!(scratch.in_left.len(), 16);
    }

    #[test]
    fn test_fill_output_handles_mono_and_multichannel_layouts() {
        for channels in [1usize, 4] {
            let mut filter = make_filter();
            let mut scratch = Scratch::new(32);
            let mut data = vec![f32::NAN; 32 * channels];

            fill_output(&mut filter, &mut scratch, &mut data, channels);

            assert!(data.iter().all(|s| s.is_finite()));
            if channels > 2 {
                // Channels past the stereo pair are silenced.
                assert!(data.iter().skip(2).step_by(channels).all(|&s| s == 0.0));
                assert!(data.iter().skip(3).step_by(channels).all(|&s| s == 0.0));
            }
        }
    }
}
