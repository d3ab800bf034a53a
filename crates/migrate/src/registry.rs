//! Migration registry: the ordered catalog of known units.
//!
//! The registry is populated once, before any runner invocation, from a
//! static catalog. There are no ambient registration side effects; callers
//! construct it explicitly and hand it to the runner.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{MigrateError, MigrateResult};
use crate::unit::MigrationUnit;

/// Catalog of migration units, ordered ascending by version.
///
/// Versions order byte-wise lexically; the timestamp-derived identifiers
/// used by the catalog make that identical to temporal order. The registry
/// never reorders units.
#[derive(Default)]
pub struct MigrationRegistry {
    units: BTreeMap<String, Arc<dyn MigrationUnit>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
        }
    }

    /// Build a registry from a static catalog in one shot.
    pub fn with_units(
        units: impl IntoIterator<Item = Arc<dyn MigrationUnit>>,
    ) -> MigrateResult<Self> {
        let mut registry = Self::new();
        for unit in units {
            registry.register(unit)?;
        }
        Ok(registry)
    }

    /// Add a unit to the catalog.
    ///
    /// Fails with `DuplicateVersion` when a unit with the same version is
    /// already present. This is a catalog-construction check, not a
    /// runtime race.
    pub fn register(&mut self, unit: Arc<dyn MigrationUnit>) -> MigrateResult<()> {
        let version = unit.version().to_string();
        if self.units.contains_key(&version) {
            return Err(MigrateError::DuplicateVersion { version });
        }
        self.units.insert(version, unit);
        Ok(())
    }

    /// All units, ascending by version.
    pub fn list(&self) -> Vec<Arc<dyn MigrationUnit>> {
        self.units.values().cloned().collect()
    }

    /// Look up a unit by version.
    pub fn get(&self, version: &str) -> Option<Arc<dyn MigrationUnit>> {
        self.units.get(version).cloned()
    }

    pub fn contains(&self, version: &str) -> bool {
        self.units.contains_key(version)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingUnit;

    #[test]
    fn lists_units_in_version_order() {
        let registry = MigrationRegistry::with_units([
            RecordingUnit::arc("20250103000000"),
            RecordingUnit::arc("20250101000000"),
            RecordingUnit::arc("20250102000000"),
        ])
        .unwrap();

        let versions: Vec<_> = registry.list().iter().map(|u| u.version().to_string()).collect();
        assert_eq!(
            versions,
            vec!["20250101000000", "20250102000000", "20250103000000"]
        );
    }

    #[test]
    fn rejects_duplicate_versions() {
        let mut registry = MigrationRegistry::new();
        registry.register(RecordingUnit::arc("20250101000000")).unwrap();

        let err = registry
            .register(RecordingUnit::arc("20250101000000"))
            .unwrap_err();
        assert!(matches!(
            err,
            MigrateError::DuplicateVersion { version } if version == "20250101000000"
        ));
    }

    #[test]
    fn lookup_by_version() {
        let registry =
            MigrationRegistry::with_units([RecordingUnit::arc("20250101000000")]).unwrap();
        assert!(registry.contains("20250101000000"));
        assert!(registry.get("20250101000000").is_some());
        assert!(registry.get("20250109000000").is_none());
        assert_eq!(registry.len(), 1);
    }
}
