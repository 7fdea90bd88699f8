//! One unit of scheduled work: scrape a location, or one subregion of it,
//! for one industry.

use crate::partition::{Partition, Subregion};

/// Immutable once built. A whole-location job has no geo bounds; a
/// subregion job carries the centroid and both angles.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    industry: String,
    location: String,
    region: Option<Subregion>,
}

impl Job {
    pub fn whole_location(industry: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            industry: industry.into(),
            location: location.into(),
            region: None,
        }
    }

    pub fn subregion(
        industry: impl Into<String>,
        location: impl Into<String>,
        region: Subregion,
    ) -> Self {
        Self {
            industry: industry.into(),
            location: location.into(),
            region: Some(region),
        }
    }

    /// Jobs covering `location` according to `partition`, in angle order.
    pub fn for_partition(industry: &str, location: &str, partition: &Partition) -> Vec<Job> {
        match partition {
            Partition::Whole => vec![Job::whole_location(industry, location)],
            Partition::Subregions(slices) => slices
                .iter()
                .map(|s| Job::subregion(industry, location, *s))
                .collect(),
        }
    }

    pub fn industry(&self) -> &str {
        &self.industry
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Geo bounds, for subregion jobs.
    pub fn region(&self) -> Option<&Subregion> {
        self.region.as_ref()
    }

    pub fn is_subregion(&self) -> bool {
        self.region.is_some()
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in {}", self.industry, self.location)?;
        if let Some(r) = &self.region {
            write!(f, " [{:.3}, {:.3})", r.start_angle, r.end_angle)?;
        }
        Ok(())
    }
}
