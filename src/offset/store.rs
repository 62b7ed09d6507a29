//! Offset store: configured tables plus learned overrides

use crate::error::{AvOffsetError, Result};
use crate::offset::{AudioOffset, LearnedFile, OffsetTables, Provenance, ResolvedOffset};
use crate::stream::{HdrType, Signature};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Resolves signatures to offsets
///
/// Learned entries shadow configured ones while monitoring is enabled.
/// The store is single-writer: every mutation goes through the playback
/// event path.
#[derive(Debug)]
pub struct OffsetStore {
    tables: OffsetTables,
    learned: BTreeMap<Signature, AudioOffset>,
    monitoring: bool,
    persistence: Option<LearnedFile>,
}

impl OffsetStore {
    /// Create an in-memory store
    pub fn new(tables: OffsetTables, monitoring: bool) -> Self {
        Self {
            tables,
            learned: BTreeMap::new(),
            monitoring,
            persistence: None,
        }
    }

    /// Create an in-memory store seeded with learned entries
    ///
    /// Nothing is written back; used for read-only lookups.
    pub fn with_learned(
        tables: OffsetTables,
        monitoring: bool,
        learned: BTreeMap<Signature, AudioOffset>,
    ) -> Self {
        Self {
            tables,
            learned,
            monitoring,
            persistence: None,
        }
    }

    /// Create a store backed by a learned-offset file
    ///
    /// The file is loaded when monitoring is enabled and removed when it is
    /// not, so stale corrections never resurface.
    pub fn with_persistence(tables: OffsetTables, monitoring: bool, file: LearnedFile) -> Self {
        let learned = if monitoring {
            file.load()
        } else {
            if let Err(e) = file.remove() {
                warn!("Failed to clear learned offsets: {}", e);
            }
            BTreeMap::new()
        };

        Self {
            tables,
            learned,
            monitoring,
            persistence: Some(file),
        }
    }

    /// Resolve the effective offset for a signature; never fails
    pub fn resolve(&self, sig: &Signature) -> ResolvedOffset {
        if self.monitoring {
            if let Some(offset) = self.learned.get(sig) {
                return ResolvedOffset {
                    offset: *offset,
                    provenance: Provenance::Learned,
                };
            }
        }

        match self.tables.configured(sig) {
            Some(offset) => ResolvedOffset {
                offset,
                provenance: Provenance::Configured,
            },
            None => ResolvedOffset {
                offset: AudioOffset::ZERO,
                provenance: Provenance::Default,
            },
        }
    }

    /// Record a manual correction, replacing any earlier one for the signature
    pub fn record_learned(&mut self, sig: Signature, offset: AudioOffset) -> Result<()> {
        if !self.monitoring {
            return Err(AvOffsetError::MonitoringInactive);
        }

        let previous = self.learned.insert(sig, offset);
        info!(
            "Learned offset {} for {} (previous: {:?})",
            offset,
            sig,
            previous.map(AudioOffset::as_millis)
        );
        self.persist();
        Ok(())
    }

    /// Remove the learned entry for one signature, returns whether one existed
    pub fn clear_learned(&mut self, sig: &Signature) -> bool {
        let removed = self.learned.remove(sig).is_some();
        if removed {
            debug!("Cleared learned offset for {}", sig);
            self.persist();
        }
        removed
    }

    /// Remove every learned entry
    pub fn clear_all_learned(&mut self) {
        let count = self.learned.len();
        self.learned.clear();
        if let Some(file) = &self.persistence {
            if let Err(e) = file.remove() {
                warn!("Failed to remove learned offsets file: {}", e);
            }
        }
        debug!("Cleared {} learned offsets", count);
    }

    /// Switch monitoring mode; turning it off drops all learned entries
    pub fn set_monitoring(&mut self, enabled: bool) {
        if self.monitoring == enabled {
            return;
        }
        self.monitoring = enabled;
        info!(
            "Monitoring mode {}",
            if enabled { "enabled" } else { "disabled" }
        );
        if !enabled {
            self.clear_all_learned();
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring
    }

    /// Whether offsets are managed for this HDR type
    pub fn hdr_enabled(&self, hdr: HdrType) -> bool {
        self.tables.hdr_enabled(hdr)
    }

    pub fn learned(&self, sig: &Signature) -> Option<AudioOffset> {
        self.learned.get(sig).copied()
    }

    /// All learned entries in signature order
    pub fn learned_entries(&self) -> impl Iterator<Item = (&Signature, &AudioOffset)> {
        self.learned.iter()
    }

    pub fn tables(&self) -> &OffsetTables {
        &self.tables
    }

    fn persist(&self) {
        if let Some(file) = &self.persistence {
            if let Err(e) = file.save(&self.learned) {
                warn!("Failed to save learned offsets: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{AudioFormat, FpsAxis, FpsBucket};

    fn sig() -> Signature {
        Signature::new(
            HdrType::Hdr10,
            AudioFormat::Dd,
            FpsAxis::Bucket(FpsBucket::Fps24),
        )
    }

    fn tables() -> OffsetTables {
        let mut tables = OffsetTables::default();
        tables.hdr.insert(HdrType::Hdr10, AudioOffset::from_millis(30));
        tables
    }

    #[test]
    fn test_resolve_default_is_zero() {
        let store = OffsetStore::new(OffsetTables::default(), false);
        let resolved = store.resolve(&sig());
        assert_eq!(resolved.offset, AudioOffset::ZERO);
        assert_eq!(resolved.provenance, Provenance::Default);
    }

    #[test]
    fn test_learned_shadows_configured() {
        let mut store = OffsetStore::new(tables(), true);
        assert_eq!(store.resolve(&sig()).offset, AudioOffset::from_millis(30));

        store
            .record_learned(sig(), AudioOffset::from_millis(80))
            .unwrap();
        let resolved = store.resolve(&sig());
        assert_eq!(resolved.offset, AudioOffset::from_millis(80));
        assert_eq!(resolved.provenance, Provenance::Learned);

        store
            .record_learned(sig(), AudioOffset::from_millis(95))
            .unwrap();
        assert_eq!(store.resolve(&sig()).offset, AudioOffset::from_millis(95));
    }

    #[test]
    fn test_disabling_monitoring_restores_configured() {
        let mut store = OffsetStore::new(tables(), true);
        store
            .record_learned(sig(), AudioOffset::from_millis(80))
            .unwrap();

        store.set_monitoring(false);
        let resolved = store.resolve(&sig());
        assert_eq!(resolved.offset, AudioOffset::from_millis(30));
        assert_eq!(resolved.provenance, Provenance::Configured);
        assert_eq!(store.learned(&sig()), None);
    }

    #[test]
    fn test_record_requires_monitoring() {
        let mut store = OffsetStore::new(tables(), false);
        assert!(matches!(
            store.record_learned(sig(), AudioOffset::from_millis(80)),
            Err(AvOffsetError::MonitoringInactive)
        ));
    }

    #[test]
    fn test_clear_learned() {
        let mut store = OffsetStore::new(tables(), true);
        store
            .record_learned(sig(), AudioOffset::from_millis(80))
            .unwrap();
        assert!(store.clear_learned(&sig()));
        assert!(!store.clear_learned(&sig()));
        assert_eq!(store.resolve(&sig()).offset, AudioOffset::from_millis(30));
    }

    #[test]
    fn test_persistence_follows_monitoring() {
        let dir = tempfile::tempdir().unwrap();
        let file = LearnedFile::new(dir.path().join("learned.toml"));

        let mut store = OffsetStore::with_persistence(tables(), true, file.clone());
        store
            .record_learned(sig(), AudioOffset::from_millis(80))
            .unwrap();
        assert!(file.path().exists());

        let reloaded = OffsetStore::with_persistence(tables(), true, file.clone());
        assert_eq!(reloaded.learned(&sig()), Some(AudioOffset::from_millis(80)));

        let disabled = OffsetStore::with_persistence(tables(), false, file.clone());
        assert_eq!(disabled.learned(&sig()), None);
        assert!(!file.path().exists());
    }

    #[test]
    fn test_seeded_store_resolves_learned() {
        let mut learned = BTreeMap::new();
        learned.insert(sig(), AudioOffset::from_millis(55));

        let store = OffsetStore::with_learned(tables(), true, learned.clone());
        let resolved = store.resolve(&sig());
        assert_eq!(resolved.offset, AudioOffset::from_millis(55));
        assert_eq!(resolved.provenance, Provenance::Learned);

        let store = OffsetStore::with_learned(tables(), false, learned);
        assert_eq!(store.resolve(&sig()).offset, AudioOffset::from_millis(30));
    }
}
