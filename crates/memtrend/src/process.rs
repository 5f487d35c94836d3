//! Process table access for the monitored target
//!
//! The sampler only needs two things from the OS: turn a name into live
//! pids, and read the memory figures for one pid. [`ProcessTable`] is
//! that seam; [`SysinfoProcessTable`] is the production implementation.

use crate::error::Result;
use crate::sample::MemoryReading;
use sysinfo::{
    Pid, Process, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind,
};
use tracing::trace;

/// OS process-table collaborator
pub trait ProcessTable {
    /// Resolve a process name or pattern to live pids, lowest first
    ///
    /// # Errors
    ///
    /// Returns error if the process table cannot be queried
    fn resolve(&mut self, target: &str) -> Result<Vec<u32>>;

    /// Read memory for `pid`
    ///
    /// `Ok(None)` means the process no longer exists. `Err` is a transient
    /// failure; the caller may retry on the next tick.
    ///
    /// # Errors
    ///
    /// Returns error if the reading could not be taken this time
    fn read(&mut self, pid: u32) -> Result<Option<MemoryReading>>;
}

/// [`ProcessTable`] backed by the `sysinfo` crate
pub struct SysinfoProcessTable {
    system: System,
    own_pid: u32,
}

impl SysinfoProcessTable {
    #[must_use]
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();

        Self {
            system,
            own_pid: std::process::id(),
        }
    }

    fn percent_of_total(&self, rss_bytes: u64) -> Option<f64> {
        let total = self.system.total_memory();
        if total == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let percent = rss_bytes as f64 / total as f64 * 100.0;
        Some(percent)
    }
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SysinfoProcessTable {
    fn resolve(&mut self, target: &str) -> Result<Vec<u32>> {
        // `name()` is the kernel comm (15 chars on Linux), so cmd and exe
        // must be loaded too for long names and script arguments to match
        let refresh = ProcessRefreshKind::nothing()
            .with_memory()
            .with_cmd(UpdateKind::OnlyIfNotSet)
            .with_exe(UpdateKind::OnlyIfNotSet);
        self.system.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh);

        let mut pids: Vec<u32> = self
            .system
            .processes()
            .iter()
            .filter(|(pid, _)| pid.as_u32() != self.own_pid)
            .filter(|(_, process)| process.status() != ProcessStatus::Zombie)
            .filter(|(_, process)| process_matches(process, target))
            .map(|(pid, _)| pid.as_u32())
            .collect();

        pids.sort_unstable();
        trace!(target_name = target, matches = pids.len(), "resolved process table");
        Ok(pids)
    }

    fn read(&mut self, pid: u32) -> Result<Option<MemoryReading>> {
        let sys_pid = Pid::from_u32(pid);
        self.system.refresh_processes(ProcessesToUpdate::Some(&[sys_pid]), true);

        let reading = self
            .system
            .process(sys_pid)
            .filter(|process| process.status() != ProcessStatus::Zombie)
            .map(|process| {
                let rss = process.memory();
                MemoryReading::new(rss, process.virtual_memory(), self.percent_of_total(rss))
            });

        Ok(reading)
    }
}

fn process_matches(process: &Process, target: &str) -> bool {
    let comm = process.name().to_string_lossy();
    let exe_name = process
        .exe()
        .and_then(|exe| exe.file_name())
        .map(|name| name.to_string_lossy());
    let cmdline = process
        .cmd()
        .iter()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");

    let names: Vec<&str> = std::iter::once(&*comm)
        .chain(exe_name.as_deref())
        .collect();
    matches_target(&names, &cmdline, target)
}

/// Whether a process matches the requested target
///
/// `names` holds the short process name and, when known, the executable's
/// file name. A partial match on any name, or a command line containing
/// the target, counts. An empty target matches nothing.
#[must_use]
pub fn matches_target(names: &[&str], cmdline: &str, target: &str) -> bool {
    if target.is_empty() {
        return false;
    }
    names.iter().any(|name| name.contains(target)) || cmdline.contains(target)
}
