//! Unit and conversion records as handed over by the external store.
pub mod registry;
pub mod types;

pub use registry::{ConversionStore, Registry, RegistryFile};
pub use types::{Conversion, Unit, UnitId, UnitType};
