use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::params::{self, ParamId, ParamStore};

/// A saved set of parameter values, keyed by parameter symbol so presets
/// stay readable and stable across reorderings of the parameter list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub params: FxHashMap<String, f32>,
}

impl Preset {
    /// Snapshot the store's current values.
    pub fn capture(name: &str, store: &ParamStore) -> Self {
        let params = ParamId::ALL
            .iter()
            .map(|&id| (params::descriptor(id).symbol.to_string(), store.value(id)))
            .collect();
        Self {
            name: name.to_string(),
            params,
        }
    }

    /// Write the preset's values into `store`.
    ///
    /// Values are applied verbatim, matching the store contract: a preset
    /// edited to hold out-of-range values will destabilize the filter just
    /// like an out-of-range `set` would. Unknown symbols are rejected
    /// before anything is applied.
    pub fn apply(&self, store: &ParamStore) -> Result<(), String> {
        let mut resolved = Vec::with_capacity(self.params.len());
        for (symbol, &value) in &self.params {
            let id = params::from_symbol(symbol)
                .ok_or_else(|| format!("Unknown parameter symbol: {}", symbol))?;
            resolved.push((id, value));
        }
        for (id, value) in resolved {
            store.set_value(id, value);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize preset: {}", e))
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to parse preset JSON: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_and_apply_round_trip() {
        let store = ParamStore::new();
        store.set_value(ParamId::Cutoff, 440.0);
        store.set_value(ParamId::Resonance, 0.75);
        store.set_value(ParamId::Drive, 0.5);
        store.set_value(ParamId::OutputGain, 2.0);

        let preset = Preset::capture("bright", &store);
        let json = preset.to_json().unwrap();

        let fresh = ParamStore::new();
        let restored = Preset::from_json(&json).unwrap();
        restored.apply(&fresh).unwrap();

        assert_eq!(fresh.cutoff(), 440.0);
        assert_eq!(fresh.resonance(), 0.75);
        assert_eq!(fresh.drive(), 0.5);
        assert_eq!(fresh.output_gain(), 2.0);
    }

    #[test]
    fn test_unknown_symbol_is_rejected_atomically() {
        let store = ParamStore::new();
        let json = r#"{"name":"bad","params":{"cutoff":5000.0,"wobble":1.0}}"#;
        let preset = Preset::from_json(json).unwrap();

        let err = preset.apply(&store).unwrap_err();
        assert!(err.contains("wobble"), "error should name the symbol: {}", err);
        // The valid entry must not have been applied either.
        assert_eq!(store.cutoff(), 1000.0);
    }

    #[test]
    fn test_out_of_range_values_apply_verbatim() {
        let store = ParamStore::new();
        let json = r#"{"name":"hot","params":{"resonance":3.5}}"#;
        Preset::from_json(json).unwrap().apply(&store).unwrap();
        assert_eq!(store.resonance(), 3.5);
    }

    #[test]
    fn test_malformed_json_errors() {
        assert!(Preset::from_json("{not json").is_err());
    }
}
