//! Batch inputs: the locations table and the industries list.
//!
//! Locations file: one `name,population,lat,long` line per location.
//! Industries file: one search query per line.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::error::PartitionInputError;
use crate::partition::{decide_divisions, subdivide, GeoPoint, Partition};

/// Population and centroid of one location. Either may be missing when
/// the source line could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CityData {
    pub population: Option<u64>,
    pub center: Option<GeoPoint>,
}

impl CityData {
    /// Decide how `location` is covered by jobs.
    ///
    /// A population of 0 counts as missing. Coordinates are only required
    /// when the location is split into subregions.
    pub fn partition(&self, location: &str) -> Result<Partition, PartitionInputError> {
        let population = match self.population {
            Some(p) if p > 0 => p,
            _ => {
                return Err(PartitionInputError::MissingPopulation {
                    location: location.to_string(),
                })
            }
        };
        let divisions = decide_divisions(population);
        if divisions == 1 {
            return Ok(Partition::Whole);
        }
        let center = self
            .center
            .ok_or_else(|| PartitionInputError::MissingCoordinates {
                location: location.to_string(),
                divisions,
            })?;
        Ok(subdivide(center, divisions))
    }
}

/// Locations in file order, with their city data.
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    names: Vec<String>,
    cities: HashMap<String, CityData>,
}

impl LocationTable {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read locations file: {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    /// Parse `name,population,lat,long` lines. Blank lines are skipped; a
    /// repeated name keeps its first line.
    pub fn parse(text: &str) -> Self {
        let mut table = LocationTable::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split(',').map(str::trim);
            let name = fields.next().unwrap_or_default().to_string();
            if name.is_empty() || table.cities.contains_key(&name) {
                continue;
            }
            let population = fields.next().and_then(|f| f.parse::<u64>().ok());
            let lat = fields.next().and_then(|f| f.parse::<f64>().ok());
            let long = fields.next().and_then(|f| f.parse::<f64>().ok());
            let center = match (lat, long) {
                (Some(lat), Some(long)) if lat.is_finite() && long.is_finite() => {
                    Some(GeoPoint { lat, long })
                }
                _ => None,
            };
            table.names.push(name.clone());
            table.cities.insert(name, CityData { population, center });
        }
        table
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CityData> {
        self.cities.get(name)
    }

    /// Partition plan for a named location.
    pub fn partition(&self, name: &str) -> Result<Partition, PartitionInputError> {
        self.get(name)
            .ok_or_else(|| PartitionInputError::UnknownLocation {
                location: name.to_string(),
            })?
            .partition(name)
    }
}

/// Read industries (search queries), one per line.
pub fn read_industries(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read industries file: {}", path.display()))?;
    Ok(parse_industries(&text))
}

pub fn parse_industries(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
