//! Persisted grid arrangement.
//!
//! Reorder maps, hidden sets, and explicit sizes serialize to a flat,
//! ordered key/value property map so a grid arrangement can be saved and
//! restored across sessions. Keys are versioned by a caller-chosen state
//! prefix (`"{prefix}.column.order"`, `"{prefix}.row.hidden"`, …); values
//! are comma-separated index lists and `index:size` pairs. The whole map
//! round-trips through JSON for embedding in application settings files.
//!
//! Restoring fires the matching structural events so the layers above the
//! restored one recompute their caches, exactly as if the arrangement had
//! been produced by commands.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// A flat, ordered key/value property map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Creates an empty property map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under a key, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Looks up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Removes a value. Returns it if it was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serializes the map to a JSON object string.
    pub fn to_json(&self) -> GridResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a map from a JSON object string.
    pub fn from_json(json: &str) -> GridResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A layer whose structural state can be saved to and restored from a
/// [`Properties`] map.
pub trait Persistable {
    /// Writes this layer's state under the given key prefix.
    fn save_state(&self, prefix: &str, properties: &mut Properties);

    /// Restores this layer's state from entries under the given key
    /// prefix. Missing keys leave the current state untouched; a present
    /// but undecodable entry fails without applying anything.
    fn restore_state(&self, prefix: &str, properties: &Properties) -> GridResult<()>;
}

/// Encodes a list of indices as `"2,1,0,3,4"`.
pub(crate) fn encode_index_list(indexes: &[usize]) -> String {
    indexes
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Decodes a `"2,1,0,3,4"` index list. Empty input decodes to an empty
/// list.
pub(crate) fn decode_index_list(key: &str, value: &str) -> GridResult<Vec<usize>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|part| {
            part.trim().parse::<usize>().map_err(|e| GridError::StateDecode {
                key: key.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Encodes `index:size` pairs as `"0:150,2:35"`.
pub(crate) fn encode_size_list(sizes: &[(usize, f32)]) -> String {
    sizes
        .iter()
        .map(|(index, size)| format!("{index}:{size}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Decodes a `"0:150,2:35"` size list.
pub(crate) fn decode_size_list(key: &str, value: &str) -> GridResult<Vec<(usize, f32)>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|part| {
            let mut halves = part.splitn(2, ':');
            let index = halves.next().unwrap_or_default().trim();
            let size = halves.next().ok_or_else(|| GridError::StateDecode {
                key: key.to_string(),
                reason: format!("missing ':' in {part:?}"),
            })?;
            let index = index.parse::<usize>().map_err(|e| GridError::StateDecode {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
            let size = size.trim().parse::<f32>().map_err(|e| GridError::StateDecode {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
            Ok((index, size))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_round_trip_json() {
        let mut props = Properties::new();
        props.set("v1.column.order", "2,1,0");
        props.set("v1.row.hidden", "");

        let json = props.to_json().unwrap();
        let restored = Properties::from_json(&json).unwrap();
        assert_eq!(restored, props);
        assert_eq!(restored.get("v1.column.order"), Some("2,1,0"));
    }

    #[test]
    fn test_index_list_codec() {
        let encoded = encode_index_list(&[2, 1, 0, 3, 4]);
        assert_eq!(encoded, "2,1,0,3,4");
        assert_eq!(
            decode_index_list("k", &encoded).unwrap(),
            vec![2, 1, 0, 3, 4]
        );
        assert_eq!(decode_index_list("k", "").unwrap(), Vec::<usize>::new());
        assert!(decode_index_list("k", "2,x").is_err());
    }

    #[test]
    fn test_size_list_codec() {
        let encoded = encode_size_list(&[(0, 150.0), (2, 35.5)]);
        assert_eq!(encoded, "0:150,2:35.5");
        assert_eq!(
            decode_size_list("k", &encoded).unwrap(),
            vec![(0, 150.0), (2, 35.5)]
        );
        assert!(decode_size_list("k", "0").is_err());
    }
}
