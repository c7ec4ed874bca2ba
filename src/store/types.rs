use crate::graph::Transform;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a unit in the external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a unit's readings represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Accumulated amount over an interval (e.g. kWh).
    Quantity,
    /// Rate at an instant (e.g. kW).
    Flow,
    /// Value that is neither summed nor averaged (e.g. a temperature sample).
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub unit_type: UnitType,
    #[serde(default)]
    pub default_graphic: bool,
}

impl Unit {
    pub fn new(id: u32, name: impl Into<String>, unit_type: UnitType) -> Self {
        Self { id: UnitId(id), name: name.into(), unit_type, default_graphic: false }
    }
}

/// A direct conversion `y = slope * x + intercept` from `source_id` to `destination_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub source_id: UnitId,
    pub destination_id: UnitId,
    pub slope: f64,
    pub intercept: f64,
    pub bidirectional: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

impl Conversion {
    pub fn new(source: u32, destination: u32, slope: f64, intercept: f64, bidirectional: bool) -> Self {
        Self {
            source_id: UnitId(source),
            destination_id: UnitId(destination),
            slope,
            intercept,
            bidirectional,
            note: String::new(),
        }
    }

    #[inline(always)]
    pub fn key(&self) -> (UnitId, UnitId) {
        (self.source_id, self.destination_id)
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.slope, self.intercept)
    }
}
