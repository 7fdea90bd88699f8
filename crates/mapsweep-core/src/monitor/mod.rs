//! Host resource monitor driving adaptive job concurrency.
//!
//! Additive increase / additive decrease: after each finished job the
//! monitor takes one telemetry sample and recommends growing the admission
//! limit by one, or shrinking it by one when CPU or RAM is over its ceiling.
//! Sampling only on job completion keeps the limit from oscillating.

mod system;

pub use system::SystemTelemetry;

/// Point-in-time host telemetry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Global CPU utilization, 0–100.
    pub cpu_pct: f32,
    /// Used physical memory in bytes.
    pub ram_bytes: u64,
}

/// Source of telemetry samples.
pub trait Telemetry: Send {
    fn sample(&mut self) -> Reading;
}

/// Thresholds above which the host counts as overloaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ceilings {
    pub cpu_pct: f32,
    pub ram_bytes: u64,
}

impl Ceilings {
    pub fn exceeded_by(&self, reading: &Reading) -> bool {
        reading.cpu_pct > self.cpu_pct || reading.ram_bytes > self.ram_bytes
    }
}

/// Share of total memory used as the RAM ceiling when none is configured.
pub const DEFAULT_RAM_CEILING_FRACTION: f64 = 0.8;

pub struct ResourceMonitor {
    telemetry: Box<dyn Telemetry>,
    ceilings: Ceilings,
}

impl std::fmt::Debug for ResourceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceMonitor")
            .field("ceilings", &self.ceilings)
            .finish_non_exhaustive()
    }
}

impl ResourceMonitor {
    pub fn new(telemetry: Box<dyn Telemetry>, ceilings: Ceilings) -> Self {
        Self {
            telemetry,
            ceilings,
        }
    }

    /// Monitor for this host. Without an explicit RAM ceiling, 80% of
    /// total memory is used.
    pub fn for_host(cpu_ceiling_pct: f32, ram_ceiling_bytes: Option<u64>) -> Self {
        let telemetry = SystemTelemetry::new();
        let ram_bytes = ram_ceiling_bytes.unwrap_or_else(|| {
            (telemetry.total_memory() as f64 * DEFAULT_RAM_CEILING_FRACTION) as u64
        });
        Self::new(
            Box::new(telemetry),
            Ceilings {
                cpu_pct: cpu_ceiling_pct,
                ram_bytes,
            },
        )
    }

    pub fn ceilings(&self) -> Ceilings {
        self.ceilings
    }

    pub fn sample(&mut self) -> Reading {
        self.telemetry.sample()
    }

    /// Next concurrency limit given the current one and a reading.
    pub fn recommend(&self, current: usize, reading: &Reading, min: usize, max: usize) -> usize {
        recommend(current, reading, &self.ceilings, min, max)
    }
}

/// Shrink by one (floored at `min`) when over a ceiling, else grow by one
/// (capped at `max`).
pub fn recommend(current: usize, reading: &Reading, ceilings: &Ceilings, min: usize, max: usize) -> usize {
    let next = if ceilings.exceeded_by(reading) {
        current.saturating_sub(1)
    } else {
        current.saturating_add(1)
    };
    next.clamp(min, max.max(min))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    const CEILINGS: Ceilings = Ceilings {
        cpu_pct: 80.0,
        ram_bytes: 8_000_000_000,
    };

    fn calm() -> Reading {
        Reading {
            cpu_pct: 35.0,
            ram_bytes: 2_000_000_000,
        }
    }

    #[test]
    fn grows_by_one_under_ceilings() {
        assert_eq!(recommend(2, &calm(), &CEILINGS, 1, 8), 3);
    }

    #[test]
    fn capped_at_max() {
        assert_eq!(recommend(8, &calm(), &CEILINGS, 1, 8), 8);
    }

    #[test]
    fn shrinks_on_cpu_or_ram_pressure() {
        let hot_cpu = Reading {
            cpu_pct: 97.5,
            ..calm()
        };
        let full_ram = Reading {
            ram_bytes: 8_000_000_001,
            ..calm()
        };
        assert_eq!(recommend(4, &hot_cpu, &CEILINGS, 1, 8), 3);
        assert_eq!(recommend(4, &full_ram, &CEILINGS, 1, 8), 3);
    }

    #[test]
    fn floored_at_min() {
        let hot = Reading {
            cpu_pct: 100.0,
            ..calm()
        };
        assert_eq!(recommend(2, &hot, &CEILINGS, 2, 8), 2);
        assert_eq!(recommend(0, &hot, &CEILINGS, 1, 8), 1);
    }

    #[test]
    fn at_ceiling_is_not_over_it() {
        let edge = Reading {
            cpu_pct: 80.0,
            ram_bytes: 8_000_000_000,
        };
        assert_eq!(recommend(3, &edge, &CEILINGS, 1, 8), 4);
    }

    struct Scripted(VecDeque<Reading>);

    impl Telemetry for Scripted {
        fn sample(&mut self) -> Reading {
            self.0.pop_front().unwrap_or(Reading {
                cpu_pct: 0.0,
                ram_bytes: 0,
            })
        }
    }

    #[test]
    fn monitor_uses_its_telemetry_and_ceilings() {
        let hot = Reading {
            cpu_pct: 99.0,
            ram_bytes: 0,
        };
        let mut monitor = ResourceMonitor::new(
            Box::new(Scripted(VecDeque::from([calm(), hot]))),
            CEILINGS,
        );
        let r1 = monitor.sample();
        assert_eq!(monitor.recommend(3, &r1, 1, 8), 4);
        let r2 = monitor.sample();
        assert_eq!(monitor.recommend(4, &r2, 1, 8), 3);
    }

    #[test]
    fn host_monitor_reads_real_telemetry() {
        let mut monitor = ResourceMonitor::for_host(80.0, None);
        assert!(monitor.ceilings().ram_bytes > 0);
        let reading = monitor.sample();
        assert!(reading.cpu_pct >= 0.0);
        assert!(reading.ram_bytes > 0);
    }
}
