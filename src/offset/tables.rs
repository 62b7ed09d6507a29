//! Configured offset tables and their composition rule

use crate::error::{AvOffsetError, Result};
use crate::offset::AudioOffset;
use crate::stream::{AudioFormat, FpsBucket, HdrType, Signature};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;
use std::str::FromStr;

/// How per-axis offsets combine into one value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    /// HDR + audio + FPS contributions added together
    #[default]
    Sum,
    /// First axis with an entry wins, in the order audio, FPS, HDR
    MostSpecific,
}

/// Validated, immutable offset tables
#[derive(Debug, Clone, Default)]
pub struct OffsetTables {
    pub composition: Composition,
    pub hdr: BTreeMap<HdrType, AudioOffset>,
    pub audio: BTreeMap<AudioFormat, AudioOffset>,
    pub fps: BTreeMap<FpsBucket, AudioOffset>,
    /// Exact per-signature entries, checked before the axis tables
    pub signatures: HashMap<Signature, AudioOffset>,
    /// HDR types for which offsets are neither applied nor learned
    pub disabled_hdr: BTreeSet<HdrType>,
}

impl OffsetTables {
    /// Configured offset for a signature, `None` if nothing applies
    pub fn configured(&self, sig: &Signature) -> Option<AudioOffset> {
        if let Some(exact) = self.signatures.get(sig) {
            return Some(*exact);
        }

        let hdr = self.hdr.get(&sig.hdr).copied();
        let audio = self.audio.get(&sig.audio).copied();
        // An unmatched FPS axis contributes nothing
        let fps = sig.fps.bucket().and_then(|b| self.fps.get(&b).copied());

        match self.composition {
            Composition::Sum => {
                let parts = [hdr, audio, fps];
                if parts.iter().all(Option::is_none) {
                    None
                } else {
                    Some(parts.into_iter().flatten().fold(AudioOffset::ZERO, |a, b| a + b))
                }
            }
            Composition::MostSpecific => audio.or(fps).or(hdr),
        }
    }

    /// Whether offsets are managed for this HDR type
    pub fn hdr_enabled(&self, hdr: HdrType) -> bool {
        !self.disabled_hdr.contains(&hdr)
    }
}

/// Parse a raw `key = ms` table into typed keys
///
/// The whole table is rejected on the first bad key so a typo never
/// half-applies.
pub fn parse_table<K>(name: &str, raw: &BTreeMap<String, i64>) -> Result<BTreeMap<K, AudioOffset>>
where
    K: FromStr<Err = AvOffsetError> + Ord,
{
    raw.iter()
        .map(|(key, ms)| {
            key.parse::<K>()
                .map(|k| (k, AudioOffset::from_millis(*ms)))
                .map_err(|e| AvOffsetError::Configuration(format!("[offsets.{}] {}", name, e)))
        })
        .collect()
}

/// Same as `parse_table` for hashed keys
pub fn parse_hashed_table<K>(
    name: &str,
    raw: &BTreeMap<String, i64>,
) -> Result<HashMap<K, AudioOffset>>
where
    K: FromStr<Err = AvOffsetError> + Eq + Hash,
{
    raw.iter()
        .map(|(key, ms)| {
            key.parse::<K>()
                .map(|k| (k, AudioOffset::from_millis(*ms)))
                .map_err(|e| AvOffsetError::Configuration(format!("[offsets.{}] {}", name, e)))
        })
        .collect()
}
