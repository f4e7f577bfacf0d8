//! The map catalog: every map a session's pool may draw from.

use std::collections::{BTreeSet, HashSet};

use mapban_protocol::ValidationErrors;
use serde::{Deserialize, Serialize};

/// Seven choices are made per session, so a pool needs at least seven
/// distinct maps.
pub const MIN_POOL_SIZE: usize = 7;

/// The built-in catalog used when no snapshot provides one.
pub const DEFAULT_MAPS: [&str; 20] = [
    "Bank",
    "Border",
    "Chalet",
    "Clubhouse",
    "Coastline",
    "Consulate",
    "Favela",
    "Fortress",
    "Hereford Base",
    "House",
    "Kafe",
    "Kanal",
    "Oregon",
    "Outback",
    "Presidential Plane",
    "Skyscraper",
    "Theme Park",
    "Tower",
    "Villa",
    "Yacht",
];

/// The configured universe of selectable maps.
///
/// Read-only once the server is running. Stored sorted so snapshots are
/// byte-stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapCatalog {
    maps: BTreeSet<String>,
}

impl MapCatalog {
    pub fn new<I, S>(maps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            maps: maps.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, map: &str) -> bool {
        self.maps.contains(map)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.maps.iter().map(String::as_str)
    }

    /// Checks a requested pool against this catalog, appending one entry
    /// to `errors` per problem found.
    ///
    /// A valid pool has at least [`MIN_POOL_SIZE`] entries, every entry
    /// is in the catalog, and no entry repeats.
    pub fn check_pool(&self, pool: &[String], errors: &mut ValidationErrors) {
        if pool.len() < MIN_POOL_SIZE {
            errors.push(
                "mapPool",
                format!(
                    "at least {MIN_POOL_SIZE} maps required, found {}",
                    pool.len()
                ),
            );
        }

        let mut seen = HashSet::with_capacity(pool.len());
        for map in pool {
            if !self.contains(map) {
                errors.push("mapPool", format!("map not allowed: {map}"));
            }
            if !seen.insert(map.as_str()) {
                errors.push("mapPool", format!("duplicate map in pool: {map}"));
            }
        }
    }
}

impl Default for MapCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_MAPS)
    }
}
