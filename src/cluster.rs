// Copyright The HiP04 Firmware Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Cluster shared-resource sequencing.
//!
//! A cluster's L2 cache, debug logic and snoop filter membership are shared
//! by its four cores. These routines bring that shared layer up before the
//! first core of a cluster starts and tear the snoop filter down when the
//! last core leaves. Callers decide *when* from the CPU state table; this
//! module only knows *how*.

use crate::regs::{
    ClusterResetLines, FAB_SF_MODE, FABRIC_BASE, RegisterSurface, core_reset_lines,
    sc_cpu_reset_dreq, sc_cpu_reset_status, spin_until,
};

/// Powers up a cluster's shared resources.
///
/// Releases the cluster's L2 and debug reset lines, waits for the status
/// register to confirm, then enables the cluster's snoop filter bit. Must
/// only be called for a cluster whose cores are all off.
pub fn ensure_cluster_up<R: RegisterSurface>(regs: &R, cluster: usize) {
    let lines = ClusterResetLines::L2 | ClusterResetLines::DEBUG;
    regs.write32(sc_cpu_reset_dreq(cluster), lines.bits());
    spin_until(|| regs.read32(sc_cpu_reset_status(cluster)) & lines.bits() == 0);
    set_snoop_filter(regs, cluster, true);
}

/// Enables or disables coherency tracking for `cluster` in the fabric snoop
/// filter.
///
/// The fabric applies the new mask asynchronously, so the write is confirmed
/// by polling the register until it reads back the written value. Both the
/// enable (cluster power-up) and disable (last-man power-down) directions
/// require the confirmation.
pub fn set_snoop_filter<R: RegisterSurface>(regs: &R, cluster: usize, on: bool) {
    let addr = FABRIC_BASE + FAB_SF_MODE;
    let mut mode = regs.read32(addr);
    if on {
        mode |= 1 << cluster;
    } else {
        mode &= !(1 << cluster);
    }
    regs.write32(addr, mode);
    spin_until(|| regs.read32(addr) == mode);
}

/// Releases one core's reset lines (core, coprocessor, debug).
///
/// The status poll confirms the core has actually left reset before the
/// release request is re-asserted, which latches the release. The poll is
/// unbounded; a core that never leaves reset hangs the caller.
pub fn release_core_resets<R: RegisterSurface>(regs: &R, cluster: usize, core: usize) {
    let lines = core_reset_lines(core);
    regs.write32(sc_cpu_reset_dreq(cluster), lines);
    spin_until(|| regs.read32(sc_cpu_reset_status(cluster)) & lines == 0);
    regs.write32(sc_cpu_reset_dreq(cluster), lines);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::test::{Access, FakeRegisterSurface};

    #[test]
    fn cluster_up_releases_shared_lines_then_enables_snoop() {
        let regs = FakeRegisterSurface::new();

        ensure_cluster_up(&regs, 2);

        assert_eq!(
            vec![
                Access::Write(sc_cpu_reset_dreq(2), 0x2100),
                Access::Read(sc_cpu_reset_status(2)),
                Access::Read(FABRIC_BASE + FAB_SF_MODE),
                Access::Write(FABRIC_BASE + FAB_SF_MODE, 0x4),
                Access::Read(FABRIC_BASE + FAB_SF_MODE),
            ],
            regs.accesses()
        );
    }

    #[test]
    fn snoop_filter_disable_preserves_other_clusters() {
        let regs = FakeRegisterSurface::new();
        regs.preset(FABRIC_BASE + FAB_SF_MODE, 0xf);

        set_snoop_filter(&regs, 1, false);

        assert_eq!(0xd, regs.value(FABRIC_BASE + FAB_SF_MODE));
    }

    #[test]
    fn core_release_is_confirmed_then_reasserted() {
        let regs = FakeRegisterSurface::new();

        release_core_resets(&regs, 1, 3);

        assert_eq!(
            vec![
                Access::Write(sc_cpu_reset_dreq(1), 0x1088),
                Access::Read(sc_cpu_reset_status(1)),
                Access::Write(sc_cpu_reset_dreq(1), 0x1088),
            ],
            regs.accesses()
        );
    }
}
