//! NSN catalog records

use serde::{Deserialize, Serialize};

/// Catalog details for a National Stock Number
///
/// Descriptive only; never replaces identifying fields on a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NsnDetails {
    pub nsn: String,
    #[serde(default)]
    pub lin: Option<String>,
    pub nomenclature: String,
    #[serde(default)]
    pub fsc: Option<String>,
    #[serde(default)]
    pub niin: Option<String>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
}

/// Catalog answer for a single lookup attempt
#[derive(Debug, Clone, PartialEq)]
pub enum NsnLookup {
    Found(NsnDetails),
    NotFound,
    /// Network failure, timeout or server error; worth retrying
    TransientError(String),
}
