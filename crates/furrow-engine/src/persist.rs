//! Save and load [`FarmState`] as bincode.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::ConfigError;
use crate::farm::FarmState;

/// Encode `state` with the standard bincode configuration.
pub fn encode_state(state: &FarmState) -> Result<Vec<u8>, ConfigError> {
    bincode::encode_to_vec(state, bincode::config::standard())
        .map_err(|e| ConfigError::Codec(e.to_string()))
}

/// Decode a state produced by [`encode_state`]. Trailing bytes are rejected.
pub fn decode_state(bytes: &[u8]) -> Result<FarmState, ConfigError> {
    let (state, read): (FarmState, usize) =
        bincode::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| ConfigError::Codec(e.to_string()))?;
    if read != bytes.len() {
        return Err(ConfigError::Codec(format!(
            "{} trailing bytes",
            bytes.len() - read
        )));
    }
    Ok(state)
}

pub fn save_state(path: &Path, state: &FarmState) -> Result<(), ConfigError> {
    let bytes = encode_state(state)?;
    fs::write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "farm: state saved");
    Ok(())
}

pub fn load_state(path: &Path) -> Result<FarmState, ConfigError> {
    let bytes = fs::read(path)?;
    decode_state(&bytes)
}
