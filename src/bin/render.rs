//! Offline renderer: runs a WAV file (or a generated impulse) through the
//! ladder filter block by block and writes the filtered result.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use ladder_dsp::{AtomicSampleRate, LadderFilter, ParamId, ParamStore, Preset};
use log::info;

const BLOCK_SIZE: usize = 512;
const DEFAULT_SAMPLE_RATE: u32 = 48000;
const DEFAULT_IMPULSE_FRAMES: usize = 48000;

struct Options {
    input: Option<PathBuf>,
    output: PathBuf,
    preset: Option<PathBuf>,
    cutoff: Option<f32>,
    resonance: Option<f32>,
    drive: Option<f32>,
    gain: Option<f32>,
    frames: usize,
}

fn parse_args() -> Result<Options> {
    let mut input = None;
    let mut output = None;
    let mut preset = None;
    let mut cutoff = None;
    let mut resonance = None;
    let mut drive = None;
    let mut gain = None;
    let mut frames = DEFAULT_IMPULSE_FRAMES;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .with_context(|| format!("{} requires a value", name))
        };
        match arg.as_str() {
            "--input" => input = Some(PathBuf::from(value("--input")?)),
            "--output" => output = Some(PathBuf::from(value("--output")?)),
            "--preset" => preset = Some(PathBuf::from(value("--preset")?)),
            "--cutoff" => cutoff = Some(value("--cutoff")?.parse()?),
            "--resonance" => resonance = Some(value("--resonance")?.parse()?),
            "--drive" => drive = Some(value("--drive")?.parse()?),
            "--gain" => gain = Some(value("--gain")?.parse()?),
            "--frames" => frames = value("--frames")?.parse()?,
            other => bail!(
                "Unknown argument: {} (expected --input/--output/--preset/--cutoff/--resonance/--drive/--gain/--frames)",
                other
            ),
        }
    }

    Ok(Options {
        input,
        output: output.context("--output is required")?,
        preset,
        cutoff,
        resonance,
        drive,
        gain,
        frames,
    })
}

/// Load a mono or stereo WAV as f32 channel buffers, duplicating mono into
/// both channels.
fn read_input(path: &PathBuf) -> Result<(Vec<f32>, Vec<f32>, u32)> {
    let mut reader =
        WavReader::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.channels > 2 {
        bail!("Expected mono or stereo input, got {} channels", spec.channels);
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let (left, right) = if spec.channels == 1 {
        (samples.clone(), samples)
    } else {
        let left: Vec<f32> = samples.iter().step_by(2).copied().collect();
        let right: Vec<f32> = samples.iter().skip(1).step_by(2).copied().collect();
        (left, right)
    };

    Ok((left, right, spec.sample_rate))
}

/// Resolve parameter sources: the preset is applied first, then flags
/// override it. Drive falls back to unity only when neither a flag nor the
/// preset supplied it, so the renderer passes signal by default.
fn apply_controls(params: &ParamStore, options: &Options, preset: Option<&Preset>) -> Result<()> {
    if let Some(preset) = preset {
        preset.apply(params).map_err(anyhow::Error::msg)?;
        info!("Applied preset '{}'", preset.name);
    }
    let preset_has_drive = preset.map_or(false, |p| p.params.contains_key("drive"));
    match options.drive {
        Some(drive) => params.set_value(ParamId::Drive, drive),
        None if !preset_has_drive => params.set_value(ParamId::Drive, 1.0),
        None => {}
    }
    if let Some(cutoff) = options.cutoff {
        params.set_value(ParamId::Cutoff, cutoff);
    }
    if let Some(resonance) = options.resonance {
        params.set_value(ParamId::Resonance, resonance);
    }
    if let Some(gain) = options.gain {
        params.set_value(ParamId::OutputGain, gain);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let options = parse_args()?;

    let (in_left, in_right, sample_rate) = match &options.input {
        Some(path) => {
            let loaded = read_input(path)?;
            info!(
                "Loaded {} ({} frames at {} Hz)",
                path.display(),
                loaded.0.len(),
                loaded.2
            );
            loaded
        }
        None => {
            info!(
                "No input file, rendering a {}-frame impulse response",
                options.frames
            );
            let mut left = vec![0.0; options.frames.max(1)];
            left[0] = 1.0;
            (left.clone(), left, DEFAULT_SAMPLE_RATE)
        }
    };

    let params = Arc::new(ParamStore::new());
    let preset = match &options.preset {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(Preset::from_json(&json).map_err(anyhow::Error::msg)?)
        }
        None => None,
    };
    apply_controls(&params, &options, preset.as_ref())?;
    info!(
        "cutoff {} Hz, resonance {}, drive {}, output gain {}",
        params.cutoff(),
        params.resonance(),
        params.drive(),
        params.output_gain()
    );

    let rate = Arc::new(AtomicSampleRate::new(sample_rate as f64));
    let mut filter = LadderFilter::new(params, rate);

    let total = in_left.len();
    let mut out_left = vec![0.0f32; total];
    let mut out_right = vec![0.0f32; total];

    let mut offset = 0;
    while offset < total {
        let frames = BLOCK_SIZE.min(total - offset);
        let end = offset + frames;
        filter.process_stereo(
            &in_left[offset..end],
            &in_right[offset..end],
            &mut out_left[offset..end],
            &mut out_right[offset..end],
            frames,
        );
        offset = end;
    }

    let non_finite = out_left
        .iter()
        .chain(out_right.iter())
        .filter(|s| !s.is_finite())
        .count();
    if non_finite > 0 {
        log::warn!(
            "{} non-finite output samples, parameters are outside the stable region",
            non_finite
        );
    }

    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&options.output, spec)
        .with_context(|| format!("Failed to create {}", options.output.display()))?;
    for (l, r) in out_left.iter().zip(out_right.iter()) {
        writer.write_sample(*l)?;
        writer.write_sample(*r)?;
    }
    writer.finalize()?;

    info!("Wrote {} frames to {}", total, options.output.display());
    Ok(())
}
