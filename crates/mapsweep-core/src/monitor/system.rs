//! Host telemetry backed by `sysinfo`.

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use super::{Reading, Telemetry};

/// Global CPU and RAM usage of the host.
///
/// CPU usage is computed between two refreshes, so the first sample after
/// construction reads close to 0; later samples cover the time since the
/// previous one.
pub struct SystemTelemetry {
    system: System,
}

impl SystemTelemetry {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
                .with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        Self { system }
    }

    /// Total physical memory in bytes.
    pub fn total_memory(&self) -> u64 {
        self.system.total_memory()
    }
}

impl Default for SystemTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry for SystemTelemetry {
    fn sample(&mut self) -> Reading {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        Reading {
            cpu_pct: self.system.global_cpu_usage(),
            ram_bytes: self.system.used_memory(),
        }
    }
}
