use std::sync::atomic::{AtomicU64, Ordering};

/// The one host capability the engine depends on. The current rate is
/// queried on every processed block rather than cached, so a rate change
/// takes effect on the next block.
pub trait SampleRateSource: Send + Sync {
    fn sample_rate(&self) -> f64;
}

/// Lock-free sample rate cell a host shares between its control thread and
/// the audio thread. Stored bitwise in an AtomicU64, same scheme as the
/// parameter store.
pub struct AtomicSampleRate {
    bits: AtomicU64,
}

impl AtomicSampleRate {
    pub fn new(rate: f64) -> Self {
        Self {
            bits: AtomicU64::new(rate.to_bits()),
        }
    }

    pub fn set(&self, rate: f64) {
        self.bits.store(rate.to_bits(), Ordering::Relaxed);
    }
}

impl SampleRateSource for AtomicSampleRate {
    #[inline(always)]
    fn sample_rate(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}
