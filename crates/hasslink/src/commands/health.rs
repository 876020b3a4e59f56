//! Health figures for `hasslink run` on a host.
//!
//! Stack margin has no meaning for a tokio task, so only memory is reported:
//! `MemAvailable` from `/proc/meminfo` on Linux, nothing elsewhere.

use std::sync::atomic::{AtomicU64, Ordering};

use hasslink_core::{HealthProbe, HealthSnapshot};

#[derive(Debug)]
pub struct HostHealth {
    low_water: AtomicU64,
}

impl Default for HostHealth {
    fn default() -> Self {
        Self {
            low_water: AtomicU64::new(u64::MAX),
        }
    }
}

impl HostHealth {
    fn record(&self, free: Option<u64>) -> HealthSnapshot {
        let min_free_memory = free.map(|bytes| {
            let prev = self.low_water.fetch_min(bytes, Ordering::Relaxed);
            prev.min(bytes)
        });
        HealthSnapshot {
            stack_margin: None,
            free_memory: free,
            min_free_memory,
        }
    }
}

impl HealthProbe for HostHealth {
    fn snapshot(&self) -> HealthSnapshot {
        self.record(available_memory())
    }
}

#[cfg(target_os = "linux")]
fn available_memory() -> Option<u64> {
    std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|text| parse_mem_available(&text))
}

#[cfg(not(target_os = "linux"))]
fn available_memory() -> Option<u64> {
    None
}

/// `MemAvailable:   123456 kB` → bytes.
fn parse_mem_available(meminfo: &str) -> Option<u64> {
    let line = meminfo
        .lines()
        .find_map(|l| l.strip_prefix("MemAvailable:"))?;
    let kib: u64 = line.trim().trim_end_matches("kB").trim().parse().ok()?;
    kib.checked_mul(1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "\
MemTotal:       16302448 kB
MemFree:          812344 kB
MemAvailable:    9470212 kB
Buffers:          402112 kB
";

    #[test]
    fn reads_mem_available_in_bytes() {
        assert_eq!(parse_mem_available(MEMINFO), Some(9_470_212 * 1024));
        assert_eq!(parse_mem_available("MemTotal: 1 kB\n"), None);
        assert_eq!(parse_mem_available("MemAvailable: lots\n"), None);
    }

    #[test]
    fn low_water_mark_only_goes_down() {
        let probe = HostHealth::default();
        assert_eq!(probe.record(Some(900)).min_free_memory, Some(900));
        assert_eq!(probe.record(Some(400)).min_free_memory, Some(400));

        let snap = probe.record(Some(700));
        assert_eq!(snap.free_memory, Some(700));
        assert_eq!(snap.min_free_memory, Some(400));
        assert_eq!(snap.stack_margin, None);

        assert_eq!(probe.record(None), HealthSnapshot::default());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_host_reports_free_memory() {
        assert!(HostHealth::default().snapshot().free_memory.is_some());
    }
}
