//! State codec: the opaque per-unit state blob.
//!
//! The engine never interprets a [`StateBlob`]; only the bound Action handler
//! does. Handlers encode their typed state as JSON through [`encode`] and read
//! it back through [`decode_or_else`], which never fails: an empty blob or one
//! that does not match the expected shape yields the handler's default state
//! so the unit keeps making progress after a schema change or a
//! disabled→enabled transition.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Opaque, handler-owned bytes persisted across poll cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StateBlob(Vec<u8>);

impl StateBlob {
    /// A blob that has never been written.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Why a blob was replaced by the handler's default state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReinitReason {
    /// Nothing was ever persisted (first run).
    Empty,
    /// The bytes are not JSON, or not JSON of the expected shape.
    Mismatch(String),
}

/// Result of decoding a blob.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// The blob held a valid state.
    Stored(T),
    /// The blob was empty or foreign; `state` is the handler default.
    Reinitialized { state: T, reason: ReinitReason },
}

impl<T> Decoded<T> {
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Stored(state) | Self::Reinitialized { state, .. } => state,
        }
    }

    #[must_use]
    pub fn is_reinitialized(&self) -> bool {
        matches!(self, Self::Reinitialized { .. })
    }
}

/// Encoding a typed state into a blob failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode handler state")]
pub struct StateCodecError(#[from] serde_json::Error);

/// Decode `blob` as `T`, falling back to `default()` when it is empty or
/// does not match.
pub fn decode_or_else<T, F>(blob: &StateBlob, default: F) -> Decoded<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    if blob.is_empty() {
        return Decoded::Reinitialized {
            state: default(),
            reason: ReinitReason::Empty,
        };
    }
    match serde_json::from_slice(blob.as_bytes()) {
        Ok(state) => Decoded::Stored(state),
        Err(err) => Decoded::Reinitialized {
            state: default(),
            reason: ReinitReason::Mismatch(err.to_string()),
        },
    }
}

/// Encode a typed state into a blob.
///
/// # Errors
///
/// Returns [`StateCodecError`] if `state` cannot be serialized as JSON
/// (e.g. a map with non-string keys).
pub fn encode<T: Serialize>(state: &T) -> Result<StateBlob, StateCodecError> {
    Ok(StateBlob(serde_json::to_vec(state)?))
}
