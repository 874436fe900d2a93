use std::sync::atomic::{AtomicU32, Ordering};

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::Serialize;

pub const NUM_PARAMS: usize = 4;

/// Identifies one of the four filter controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Cutoff,
    Resonance,
    Drive,
    OutputGain,
}

impl ParamId {
    pub const ALL: [ParamId; NUM_PARAMS] = [
        ParamId::Cutoff,
        ParamId::Resonance,
        ParamId::Drive,
        ParamId::OutputGain,
    ];

    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(ParamId::Cutoff),
            1 => Some(ParamId::Resonance),
            2 => Some(ParamId::Drive),
            3 => Some(ParamId::OutputGain),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Static parameter metadata published to hosts for UI and automation.
/// None of it affects the numeric path.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamDescriptor {
    pub name: &'static str,
    pub symbol: &'static str,
    pub unit: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    /// Hint that UI/automation curves should be logarithmic. Display only.
    pub logarithmic: bool,
}

pub const DESCRIPTORS: [ParamDescriptor; NUM_PARAMS] = [
    ParamDescriptor {
        name: "Cutoff",
        symbol: "cutoff",
        unit: "Hz",
        min: 20.0,
        max: 20000.0,
        default: 1000.0,
        logarithmic: true,
    },
    ParamDescriptor {
        name: "Resonance",
        symbol: "resonance",
        unit: "",
        min: 0.0,
        max: 1.0,
        default: 0.1,
        logarithmic: false,
    },
    ParamDescriptor {
        name: "Drive",
        symbol: "drive",
        unit: "",
        min: 0.0,
        max: 1.0,
        default: 0.0,
        logarithmic: false,
    },
    // The unit label is "dB" but the engine applies the raw value as a
    // linear multiplier, so the label is informational only. The live store
    // starts at 1.0 (unity) rather than this published default.
    ParamDescriptor {
        name: "Output Gain",
        symbol: "output_gain",
        unit: "dB",
        min: -60.0,
        max: 12.0,
        default: 0.0,
        logarithmic: false,
    },
];

pub fn descriptor(id: ParamId) -> &'static ParamDescriptor {
    &DESCRIPTORS[id.index()]
}

static SYMBOL_TO_PARAM: Lazy<FxHashMap<&'static str, ParamId>> = Lazy::new(|| {
    ParamId::ALL
        .iter()
        .map(|&id| (descriptor(id).symbol, id))
        .collect()
});

pub fn from_symbol(symbol: &str) -> Option<ParamId> {
    SYMBOL_TO_PARAM.get(symbol).copied()
}

/// Live parameter values shared between a control thread and the audio
/// thread. Each value is an f32 stored bitwise in an AtomicU32, so reads and
/// writes never lock, never allocate, and never tear.
///
/// Values are stored verbatim: no clamping against the descriptor ranges and
/// no unit conversion. Out-of-range values flow straight into the filter
/// math and can destabilize it.
pub struct ParamStore {
    values: [AtomicU32; NUM_PARAMS],
}

impl ParamStore {
    pub fn new() -> Self {
        Self {
            values: [
                AtomicU32::new(1000.0f32.to_bits()),
                AtomicU32::new(0.1f32.to_bits()),
                AtomicU32::new(0.0f32.to_bits()),
                AtomicU32::new(1.0f32.to_bits()),
            ],
        }
    }

    /// Current value of the parameter at `index`, as a host would query it.
    pub fn get(&self, index: u32) -> Result<f32, String> {
        let id = ParamId::from_index(index)
            .ok_or_else(|| format!("Invalid parameter index: {}", index))?;
        Ok(self.value(id))
    }

    /// Store `value` verbatim for the parameter at `index`.
    pub fn set(&self, index: u32, value: f32) -> Result<(), String> {
        let id = ParamId::from_index(index)
            .ok_or_else(|| format!("Invalid parameter index: {}", index))?;
        self.set_value(id, value);
        Ok(())
    }

    #[inline(always)]
    pub fn value(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    #[inline(always)]
    pub fn set_value(&self, id: ParamId, value: f32) {
        self.values[id.index()].store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn cutoff(&self) -> f32 {
        self.value(ParamId::Cutoff)
    }

    #[inline(always)]
    pub fn resonance(&self) -> f32 {
        self.value(ParamId::Resonance)
    }

    #[inline(always)]
    pub fn drive(&self) -> f32 {
        self.value(ParamId::Drive)
    }

    #[inline(always)]
    pub fn output_gain(&self) -> f32 {
        self.value(ParamId::OutputGain)
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_param_id_index_mapping() {
        for (i, &id) in ParamId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(ParamId::from_index(i as u32), Some(id));
        }
        assert_eq!(ParamId::from_index(4), None);
        assert_eq!(ParamId::from_index(u32::MAX), None);
    }

    #[test]
    fn test_store_defaults() {
        let store = ParamStore::new();
        assert_eq!(store.cutoff(), 1000.0);
        assert_eq!(store.resonance(), 0.1);
        assert_eq!(store.drive(), 0.0);
        // Unity gain at start, not the published 0.0 dB default.
        assert_eq!(store.output_gain(), 1.0);
    }

    #[test]
    fn test_set_get_round_trip_is_verbatim() {
        let store = ParamStore::new();

        // In-range, out-of-range, and pathological values must all survive
        // the round trip bit-exactly, since the store never clamps.
        for value in [
            440.0f32,
            -1.0,
            1e9,
            f32::MIN_POSITIVE,
            f32::INFINITY,
        ] {
            for index in 0..NUM_PARAMS as u32 {
                store.set(index, value).unwrap();
                assert_eq!(
                    store.get(index).unwrap().to_bits(),
                    value.to_bits(),
                    "parameter {} should store {} verbatim",
                    index,
                    value
                );
            }
        }
    }

    #[test]
    fn test_invalid_index_is_rejected() {
        let store = ParamStore::new();
        assert!(store.get(4).is_err());
        assert!(store.set(4, 0.5).is_err());
        assert!(store.get(100).is_err());
        // A rejected write must not disturb stored values.
        assert_eq!(store.cutoff(), 1000.0);
    }

    #[test]
    fn test_descriptor_metadata() {
        let cutoff = descriptor(ParamId::Cutoff);
        assert_eq!(cutoff.symbol, "cutoff");
        assert_eq!(cutoff.unit, "Hz");
        assert!(cutoff.logarithmic);
        assert_eq!((cutoff.min, cutoff.max), (20.0, 20000.0));

        let gain = descriptor(ParamId::OutputGain);
        assert_eq!(gain.unit, "dB");
        assert_eq!((gain.min, gain.max), (-60.0, 12.0));

        assert_eq!(from_symbol("resonance"), Some(ParamId::Resonance));
        assert_eq!(from_symbol("nope"), None);
    }

    #[test]
    fn test_descriptors_serialize_to_json() {
        let json = serde_json::to_string(&DESCRIPTORS).expect("descriptors should serialize");
        assert!(json.contains("\"symbol\":\"cutoff\""));
        assert!(json.contains("\"logarithmic\":true"));
    }

    #[test]
    fn test_concurrent_writes_never_tear() {
        let store = Arc::new(ParamStore::new());
        store.set_value(ParamId::Cutoff, 500.0);

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    store.set_value(ParamId::Cutoff, 500.0);
                    store.set_value(ParamId::Cutoff, 8000.0);
                }
            })
        };

        // Every read must observe one of the written values, never a mix of
        // their bit patterns.
        for _ in 0..10_000 {
            let v = store.cutoff();
            assert!(v == 500.0 || v == 8000.0, "torn read: {}", v);
        }

        writer.join().unwrap();
    }
}
