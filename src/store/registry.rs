//! In-memory unit and conversion records, plus the seam to the external store.

use super::types::*;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Read side of whatever owns the unit and conversion records.
///
/// The engine treats these records as the only source of truth and rebuilds
/// from a fresh read every time.
pub trait ConversionStore {
    fn units(&self) -> Result<Vec<Unit>>;
    fn conversions(&self) -> Result<Vec<Conversion>>;
}

/// On-disk layout of a registry file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    pub units: Vec<Unit>,
    #[serde(default)]
    pub conversions: Vec<Conversion>,
}

/// Keyed in-memory store.
///
/// Deleting a unit cascades to every conversion that names it. Conversions are
/// not checked against the unit set on insert; the graph builder rejects
/// dangling references when the next rebuild runs.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    units: BTreeMap<UnitId, Unit>,
    conversions: BTreeMap<(UnitId, UnitId), Conversion>,

    // Unit names are unique, like the id.
    used_names: HashSet<String>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn unit_count(&self) -> usize { self.units.len() }
    pub fn conversion_count(&self) -> usize { self.conversions.len() }

    pub fn from_file(file: RegistryFile) -> Result<Self> {
        let mut registry = Self::new();
        for unit in file.units {
            registry.insert_unit(unit)?;
        }
        for conversion in file.conversions {
            registry.insert_conversion(conversion)?;
        }
        Ok(registry)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_file(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn to_file(&self) -> RegistryFile {
        RegistryFile {
            units: self.units.values().cloned().collect(),
            conversions: self.conversions.values().cloned().collect(),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.to_file())?;
        std::fs::write(path, data)?;
        Ok(())
    }

    // --- Units ---

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_by_name(&self, name: &str) -> Option<&Unit> {
        self.units.values().find(|u| u.name == name)
    }

    pub fn insert_unit(&mut self, unit: Unit) -> Result<()> {
        if self.units.contains_key(&unit.id) {
            return Err(EngineError::Store(format!("Unit {} already exists", unit.id)));
        }
        if self.used_names.contains(&unit.name) {
            return Err(EngineError::Store(format!("Unit name '{}' is already taken", unit.name)));
        }
        self.used_names.insert(unit.name.clone());
        self.units.insert(unit.id, unit);
        Ok(())
    }

    /// Replaces the record with the same id (rename, retype, default-graphic flag).
    pub fn update_unit(&mut self, unit: Unit) -> Result<()> {
        let old_name = match self.units.get(&unit.id) {
            Some(old) => old.name.clone(),
            None => return Err(EngineError::Store(format!("Unit {} does not exist", unit.id))),
        };
        if unit.name != old_name {
            if self.used_names.contains(&unit.name) {
                return Err(EngineError::Store(format!("Unit name '{}' is already taken", unit.name)));
            }
            self.used_names.remove(&old_name);
            self.used_names.insert(unit.name.clone());
        }
        self.units.insert(unit.id, unit);
        Ok(())
    }

    /// Removes a unit and every conversion touching it. Returns the removed conversions.
    pub fn delete_unit(&mut self, id: UnitId) -> Result<Vec<Conversion>> {
        let unit = self
            .units
            .remove(&id)
            .ok_or_else(|| EngineError::Store(format!("Unit {} does not exist", id)))?;
        self.used_names.remove(&unit.name);

        let doomed: Vec<(UnitId, UnitId)> = self
            .conversions
            .keys()
            .filter(|(src, dst)| *src == id || *dst == id)
            .copied()
            .collect();
        Ok(doomed.into_iter().filter_map(|key| self.conversions.remove(&key)).collect())
    }

    // --- Conversions ---

    pub fn conversion(&self, source: UnitId, destination: UnitId) -> Option<&Conversion> {
        self.conversions.get(&(source, destination))
    }

    pub fn insert_conversion(&mut self, conversion: Conversion) -> Result<()> {
        let key = conversion.key();
        if self.conversions.contains_key(&key) {
            return Err(EngineError::Store(format!(
                "Conversion {} -> {} already exists",
                key.0, key.1
            )));
        }
        self.conversions.insert(key, conversion);
        Ok(())
    }

    pub fn update_conversion(&mut self, conversion: Conversion) -> Result<()> {
        match self.conversions.get_mut(&conversion.key()) {
            Some(slot) => {
                *slot = conversion;
                Ok(())
            }
            None => Err(EngineError::Store(format!(
                "Conversion {} -> {} does not exist",
                conversion.source_id, conversion.destination_id
            ))),
        }
    }

    pub fn delete_conversion(&mut self, source: UnitId, destination: UnitId) -> Result<Conversion> {
        self.conversions.remove(&(source, destination)).ok_or_else(|| {
            EngineError::Store(format!("Conversion {} -> {} does not exist", source, destination))
        })
    }
}

impl ConversionStore for Registry {
    fn units(&self) -> Result<Vec<Unit>> {
        Ok(self.units.values().cloned().collect())
    }

    fn conversions(&self) -> Result<Vec<Conversion>> {
        Ok(self.conversions.values().cloned().collect())
    }
}
