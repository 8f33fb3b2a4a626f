//! The Tree record and the origin partition of its identifier space.
//!
//! Identifiers that are a multiple of [`DATASET_ID_STRIDE`] belong to records
//! ingested from the remote dataset. Every other identifier belongs to a
//! record created by a user. Nothing else in a record says where it came
//! from, so bulk deletion by origin relies on this partition alone.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Dataset-origin ids are exact multiples of this stride.
pub const DATASET_ID_STRIDE: u64 = 10;

/// Returns true if `id` falls in the dataset-origin partition.
#[inline]
pub fn is_dataset_id(id: u64) -> bool {
    id % DATASET_ID_STRIDE == 0
}

/// Where a record came from, derived from its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Ingested from the remote paginated dataset
    Dataset,
    /// Created through the catalog API
    User,
}

impl Origin {
    /// Origin class of an identifier.
    pub fn of(id: u64) -> Self {
        if is_dataset_id(id) {
            Origin::Dataset
        } else {
            Origin::User
        }
    }
}

/// Which records a bulk deletion removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every record
    All,
    /// Only records of the given origin
    Only(Origin),
}

impl Scope {
    /// Returns true if a record with this id is covered by the scope.
    pub fn covers(self, id: u64) -> bool {
        match self {
            Scope::All => true,
            Scope::Only(origin) => Origin::of(id) == origin,
        }
    }
}

impl FromStr for Scope {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Scope::All),
            "dataset" | "api" => Ok(Scope::Only(Origin::Dataset)),
            "user" | "manual" => Ok(Scope::Only(Origin::User)),
            other => Err(StoreError::InvalidOrigin(other.to_string())),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Only(Origin::Dataset) => f.write_str("dataset"),
            Scope::Only(Origin::User) => f.write_str("user"),
        }
    }
}

/// A remarkable tree.
///
/// Optional attributes serialize as `null` when absent. Numeric attributes
/// are always numbers here: string coercion happens in [`crate::validate`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    /// Identifier, 0 while unassigned
    #[serde(default)]
    pub id: u64,

    pub name: String,
    pub common_name: Option<String>,
    pub botanic_name: Option<String>,

    /// Meters, 0..=150
    pub height: Option<f64>,
    /// Centimeters, 0..=5000
    pub circumference: Option<f64>,

    /// One of "M", "A", "J"
    pub development_stage: Option<String>,
    pub plantation_year: Option<i32>,

    pub outstanding_qualification: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub genus: Option<String>,
    pub species: Option<String>,
    pub variety: Option<String>,

    /// URL of the information sign (PDF)
    pub sign: Option<String>,
    /// URL of a photograph
    pub picture: Option<String>,

    pub longitude: Option<f64>,
    /// 0..=90, the catalog only covers the northern hemisphere
    pub latitude: Option<f64>,

    pub address: Option<String>,
    pub address_bis: Option<String>,
}

impl Tree {
    /// A record with only a name, every optional attribute absent.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Same record under another id.
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    /// Origin class of this record's current id.
    pub fn origin(&self) -> Origin {
        Origin::of(self.id)
    }
}
