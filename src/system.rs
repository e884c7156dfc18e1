//! Host resource introspection
//!
//! Backs the `/resources` endpoint. The probe is an opaque collaborator: it
//! reports what the OS reports, with no caching or retry.

use std::sync::{Mutex, PoisonError};

use sysinfo::System;

/// Point-in-time host resource usage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceUsage {
    /// Global CPU utilisation in percent
    pub cpu_percent: f32,
    /// Used memory in bytes
    pub used_memory_bytes: u64,
}

impl ResourceUsage {
    pub fn used_memory_mb(&self) -> f64 {
        self.used_memory_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Source of [`ResourceUsage`] snapshots
pub trait ResourceProbe: Send + Sync {
    fn usage(&self) -> ResourceUsage;
}

/// Probe backed by `sysinfo`
///
/// CPU utilisation is measured between consecutive calls, so the first call
/// after startup reports the usage since the probe was created.
pub struct SystemProbe {
    system: Mutex<System>,
}

impl SystemProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        // Prime the CPU counters so the first reading has a baseline
        system.refresh_cpu_usage();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SystemProbe {
    fn usage(&self) -> ResourceUsage {
        let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
        system.refresh_cpu_usage();
        system.refresh_memory();
        ResourceUsage {
            cpu_percent: system.global_cpu_usage(),
            used_memory_bytes: system.used_memory(),
        }
    }
}

/// Probe returning a fixed reading
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub ResourceUsage);

impl ResourceProbe for FixedProbe {
    fn usage(&self) -> ResourceUsage {
        self.0
    }
}
