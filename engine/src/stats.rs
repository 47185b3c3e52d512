use std::sync::{Mutex, PoisonError};

use shared_std::models::SystemStats;
use sysinfo::System;

/// Host resource usage, backed by `sysinfo`.
///
/// The `System` is kept between calls because CPU usage is measured as the difference between two
/// refreshes; the very first snapshot after start-up reports 0%.
pub struct StatsProvider {
    system: Mutex<System>,
}

impl StatsProvider {
    pub fn new() -> Self {
        StatsProvider {
            system: Mutex::new(System::new()),
        }
    }

    pub fn snapshot(&self) -> SystemStats {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_cpu_usage();
        system.refresh_memory();

        SystemStats {
            host_name: System::host_name().unwrap_or_default(),
            os_version: System::long_os_version().unwrap_or_default(),
            cpu_usage_percent: system.global_cpu_usage(),
            total_memory_bytes: system.total_memory(),
            used_memory_bytes: system.used_memory(),
            uptime_seconds: System::uptime(),
        }
    }
}

impl Default for StatsProvider {
    fn default() -> Self {
        Self::new()
    }
}
