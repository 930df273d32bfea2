// Copyright The HiP04 Firmware Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The CPU power state table.
//!
//! Plain data plus transition bookkeeping; no hardware access. The table is
//! only ever touched under the single [`Psci`](super::Psci) spin lock, which
//! is what makes its read-modify-write sequences atomic.

/// Number of clusters in the fixed topology.
pub const MAX_CLUSTERS: usize = 4;
/// Number of cores per cluster in the fixed topology.
pub const CORES_PER_CLUSTER: usize = 4;

/// Power state of one core.
///
/// Legal transitions are `Off` → `Pending` → `On` → `Off`, plus the
/// documented `Off` → `Pending` → `Off` interlude a core passes through
/// while tearing itself down, which keeps a concurrent power-on request
/// answered with `OnPending` instead of restarting the core mid-teardown.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CoreState {
    /// The core is powered off, or was never started.
    #[default]
    Off,
    /// A power-on was requested but the core has not yet claimed its start
    /// parameters, or the core is mid power-down teardown.
    Pending,
    /// The core is running.
    On,
}

/// Start parameters stored by a power-on request and claimed exactly once by
/// the target core's boot handshake.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PendingStart {
    /// Address the started core should jump to.
    pub entry: u64,
    /// Opaque value passed through to the started core.
    pub context: u64,
}

/// Power state and pending start parameters for every core in the system.
pub struct CpuStateTable {
    states: [[CoreState; CORES_PER_CLUSTER]; MAX_CLUSTERS],
    pending: [[Option<PendingStart>; CORES_PER_CLUSTER]; MAX_CLUSTERS],
    registered: bool,
}

impl CpuStateTable {
    /// Creates a table with every core off and no calling core registered.
    pub const fn new() -> Self {
        Self {
            states: [[CoreState::Off; CORES_PER_CLUSTER]; MAX_CLUSTERS],
            pending: [[None; CORES_PER_CLUSTER]; MAX_CLUSTERS],
            registered: false,
        }
    }

    /// Returns the state of the given core.
    pub fn state(&self, cluster: usize, core: usize) -> CoreState {
        self.states[cluster][core]
    }

    /// Sets the state of the given core.
    pub fn set_state(&mut self, cluster: usize, core: usize, state: CoreState) {
        self.states[cluster][core] = state;
    }

    /// Stores start parameters for a core that has just been marked pending.
    pub fn set_pending_start(&mut self, cluster: usize, core: usize, start: PendingStart) {
        debug_assert!(self.pending[cluster][core].is_none());
        self.pending[cluster][core] = Some(start);
    }

    /// Claims the given core's start parameters, clearing the slot.
    pub fn take_pending_start(&mut self, cluster: usize, core: usize) -> Option<PendingStart> {
        self.pending[cluster][core].take()
    }

    /// Whether every core of the given cluster is off.
    ///
    /// Always derived from the per-core states, never cached.
    pub fn cluster_down(&self, cluster: usize) -> bool {
        self.states[cluster]
            .iter()
            .all(|state| *state == CoreState::Off)
    }

    /// Registers the calling core on its first table-touching call.
    ///
    /// The boot core starts running without ever going through a power-on
    /// request, so the first call it makes marks it `On` here. Returns true
    /// exactly once, in which case the caller must also enable its cluster's
    /// snoop filter bit.
    pub fn register_once(&mut self, cluster: usize, core: usize) -> bool {
        if self.registered {
            return false;
        }
        self.registered = true;
        if self.states[cluster][core] == CoreState::Off {
            self.states[cluster][core] = CoreState::On;
        }
        true
    }
}

impl Default for CpuStateTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_fully_off() {
        let table = CpuStateTable::new();
        for cluster in 0..MAX_CLUSTERS {
            assert!(table.cluster_down(cluster));
            for core in 0..CORES_PER_CLUSTER {
                assert_eq!(CoreState::Off, table.state(cluster, core));
            }
        }
    }

    #[test]
    fn cluster_down_tracks_any_live_core() {
        let mut table = CpuStateTable::new();
        table.set_state(2, 3, CoreState::Pending);
        assert!(!table.cluster_down(2));
        assert!(table.cluster_down(1));

        table.set_state(2, 3, CoreState::Off);
        assert!(table.cluster_down(2));
    }

    #[test]
    fn pending_start_is_claimed_once() {
        let mut table = CpuStateTable::new();
        let start = PendingStart {
            entry: 0xab_cdef,
            context: 0x8765_4321,
        };
        table.set_pending_start(0, 1, start);
        assert_eq!(Some(start), table.take_pending_start(0, 1));
        assert_eq!(None, table.take_pending_start(0, 1));
    }

    #[test]
    fn registration_happens_once_and_marks_caller_on() {
        let mut table = CpuStateTable::new();
        assert!(table.register_once(0, 0));
        assert_eq!(CoreState::On, table.state(0, 0));
        assert!(!table.register_once(0, 0));
        assert!(!table.register_once(1, 2));
        assert_eq!(CoreState::Off, table.state(1, 2));
    }
}
