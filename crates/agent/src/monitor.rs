//! Métricas do host via `sysinfo` (memória livre para o heartbeat).

use crate::hal::HostStats;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tracing::debug;

/// Monitor de memória do host.
pub struct HostMonitor {
    sys: System,
}

impl HostMonitor {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        Self { sys }
    }
}

impl HostStats for HostMonitor {
    fn free_memory(&mut self) -> u64 {
        self.sys.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
        let free = self.sys.available_memory();
        debug!("Memória disponível: {} KiB", free / 1024);
        free
    }
}
