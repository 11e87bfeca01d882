//! Serde helpers for request bodies.

use serde::{Deserialize, Deserializer};

/// Deserialize a field that distinguishes absent from `null`.
///
/// Use with `#[serde(default, deserialize_with = "...")]` on an `Option<Option<T>>`:
/// an absent field stays `None`, `null` becomes `Some(None)` and a value becomes `Some(Some(v))`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
