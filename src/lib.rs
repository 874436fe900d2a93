pub mod filter;
pub mod host;
pub mod params;
pub mod preset;

pub use filter::{BlockCoefficients, LadderFilter, NUM_CHANNELS};
pub use host::{AtomicSampleRate, SampleRateSource};
pub use params::{ParamDescriptor, ParamId, ParamStore, DESCRIPTORS, NUM_PARAMS};
pub use preset::Preset;
