use std::sync::Arc;

use crate::host::SampleRateSource;
use crate::params::ParamStore;

pub const NUM_CHANNELS: usize = 2;

/// Pole-placement tuning constant for the two-pole smoothing stage.
/// Empirically chosen; changing it changes the filter's voicing.
const PHI: f32 = 1.61803398875;

/// Per-channel recurrence state. `delay` is a FIFO history of the
/// feedback-path output with the most recent value at index 3; `state`
/// accumulates the two-pole smoothing stage's prior outputs.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    delay: [f32; 4],
    state: [f32; 2],
}

/// Coefficients shared by every channel within one processed block.
/// Derived purely from the current parameter values and sample rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockCoefficients {
    pub cutoff_norm: f32,
    pub fb: f32,
    pub g: f32,
    pub a0: f32,
    pub a1: f32,
    pub a2: f32,
    pub b1: f32,
    pub b2: f32,
}

impl BlockCoefficients {
    /// Derive block coefficients from raw parameter values.
    ///
    /// No clamping anywhere: `cutoff_norm` at or beyond 1.0 makes `fb`
    /// diverge and the recurrence unstable. That trade-off is accepted;
    /// keeping parameters sane is the caller's job.
    pub fn derive(cutoff_hz: f32, resonance: f32, output_gain: f32, sample_rate: f64) -> Self {
        let cutoff_norm = (cutoff_hz as f64 / sample_rate) as f32;

        // Resonance feedback amount and the compensating output scale.
        // output_gain is applied as a linear multiplier even though its
        // descriptor labels it in dB.
        let fb = resonance + resonance / (1.0 - cutoff_norm);
        let g = output_gain / (1.0 + fb);

        let k = cutoff_norm * (PHI - cutoff_norm);
        let a0 = 1.0 / (1.0 + k);
        let a1 = 2.0 * a0;
        let a2 = a0;
        let b1 = 2.0 * (1.0 - cutoff_norm) * a0;
        let b2 = (1.0 - k) * a0;

        Self {
            cutoff_norm,
            fb,
            g,
            a0,
            a1,
            a2,
            b1,
            b2,
        }
    }
}

/// A four-pole ladder lowpass approximation with resonance, input drive and
/// output gain.
///
/// A 4-tap delay line supplies both the resonance feedback (tap 3, one
/// sample late) and the inputs to a transposed-form two-pole smoothing
/// recurrence (taps 0-2), standing in for four literal cascaded one-pole
/// stages. There is no saturation anywhere in the path.
///
/// Parameter values come from a shared [`ParamStore`] and the sample rate
/// from an injected [`SampleRateSource`]; both are re-read once per
/// `process` call, so control-thread changes land on block boundaries.
pub struct LadderFilter {
    params: Arc<ParamStore>,
    sample_rate: Arc<dyn SampleRateSource>,
    channels: [ChannelState; NUM_CHANNELS],
}

impl LadderFilter {
    pub fn new(params: Arc<ParamStore>, sample_rate: Arc<dyn SampleRateSource>) -> Self {
        Self {
            params,
            sample_rate,
            channels: [ChannelState::default(); NUM_CHANNELS],
        }
    }

    /// Filter `frames` samples per channel from `inputs` into `outputs`.
    ///
    /// Slices must hold exactly [`NUM_CHANNELS`] channels of at least
    /// `frames` samples each; that is a caller contract, checked only in
    /// debug builds. The call never allocates, never blocks and always
    /// completes: pathological parameter values produce non-finite samples,
    /// not errors.
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize) {
        debug_assert_eq!(inputs.len(), NUM_CHANNELS);
        debug_assert_eq!(outputs.len(), NUM_CHANNELS);
        debug_assert!(inputs.iter().all(|ch| ch.len() >= frames));
        debug_assert!(outputs.iter().all(|ch| ch.len() >= frames));

        // One parameter snapshot per block. A concurrent write lands on the
        // next block at the latest.
        let coeffs = BlockCoefficients::derive(
            self.params.cutoff(),
            self.params.resonance(),
            self.params.output_gain(),
            self.sample_rate.sample_rate(),
        );
        let drive = self.params.drive();

        for i in 0..frames {
            for ch in 0..NUM_CHANNELS {
                let state = &mut self.channels[ch];

                let input = inputs[ch][i] * drive;

                // Feedback taps the oldest slot: delay[3] still holds the
                // previous frame's value here, making this a one-sample
                // delayed read of the prior output.
                let out = coeffs.g * (input - coeffs.fb * state.delay[3]);

                state.delay[0] = state.delay[1];
                state.delay[1] = state.delay[2];
                state.delay[2] = state.delay[3];
                state.delay[3] = out;

                let y = coeffs.a0
                    * (state.delay[0] + coeffs.a1 * state.delay[1] + coeffs.a2 * state.delay[2])
                    - coeffs.b1 * state.state[0]
                    - coeffs.b2 * state.state[1];

                state.state[1] = state.state[0];
                state.state[0] = y;

                outputs[ch][i] = y;
            }
        }
    }

    /// Stereo convenience wrapper over [`Self::process`].
    pub fn process_stereo(
        &mut self,
        input_left: &[f32],
        input_right: &[f32],
        output_left: &mut [f32],
        output_right: &mut [f32],
        frames: usize,
    ) {
        let inputs: [&[f32]; NUM_CHANNELS] = [input_left, input_right];
        let mut outputs: [&mut [f32]; NUM_CHANNELS] = [output_left, output_right];
        self.process(&inputs, &mut outputs, frames);
    }

    /// Activation is a lifecycle formality: state deliberately survives
    /// activation cycles.
    pub fn activate(&mut self) {}

    pub fn deactivate(&mut self) {}

    /// The new rate is not cached anywhere; `process` re-reads the source
    /// every block, so the change applies on the next block. Retained
    /// delay/state values computed under the old rate are kept as-is, which
    /// produces a known discontinuity at the switch.
    pub fn on_sample_rate_changed(&mut self, _new_rate: f64) {}
}
