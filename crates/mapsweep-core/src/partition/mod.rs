//! Geographic partitioning of a location into scrape jobs.
//!
//! Small locations are scraped whole. Populous ones are cut into equal
//! angular slices around their centroid so each job's result volume stays
//! bounded. Everything here is pure.

mod slices;

pub use slices::{angular_slices, GeoPoint, Subregion};

/// Locations at or below this population are scraped as a single job.
pub const WHOLE_LOCATION_MAX_POPULATION: u64 = 100_000;

/// Population covered by one subregion of a populous location.
pub const POPULATION_PER_DIVISION: u64 = 200_000;

/// How a location is covered by jobs.
#[derive(Debug, Clone, PartialEq)]
pub enum Partition {
    /// One unconstrained job for the whole location.
    Whole,
    /// One job per slice, ordered by increasing angle.
    Subregions(Vec<Subregion>),
}

impl Partition {
    /// Number of jobs this partition schedules.
    pub fn job_count(&self) -> usize {
        match self {
            Partition::Whole => 1,
            Partition::Subregions(s) => s.len(),
        }
    }
}

/// Number of divisions for a location of the given population.
pub fn decide_divisions(population: u64) -> usize {
    if population <= WHOLE_LOCATION_MAX_POPULATION {
        return 1;
    }
    (population / POPULATION_PER_DIVISION).max(2) as usize
}

/// Split a location into `num_divisions` slices around `center`.
///
/// `num_divisions <= 1` is the whole-location case; callers pass the
/// result of [`decide_divisions`], which is never 0.
pub fn subdivide(center: GeoPoint, num_divisions: usize) -> Partition {
    if num_divisions <= 1 {
        return Partition::Whole;
    }
    Partition::Subregions(angular_slices(center, num_divisions))
}
