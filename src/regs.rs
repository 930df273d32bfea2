// Copyright The HiP04 Firmware Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The fixed HiP04 memory-mapped register surface.
//!
//! Addresses and bit positions in this module are ABI for the target SoC and
//! must not be changed. All register accesses are uncached, ordered, 32-bit
//! single-register operations.

use bitflags::bitflags;
use core::hint::spin_loop;

/// Base address of the cluster fabric block holding the snoop filter control.
pub const FABRIC_BASE: usize = 0xe302_a000;
/// Offset of the snoop filter mode register within the fabric block. Bit `n`
/// enables coherency tracking for cluster `n`.
pub const FAB_SF_MODE: usize = 0x0c;
/// Base address of the system controller holding the reset-line registers.
pub const SYSCTRL_BASE: usize = 0xe3e0_0000;
/// Base address of the relocation scratch region. A freshly reset core's
/// trampoline reads a four-word record from here to find its jump target.
pub const RELOCATION_BASE: usize = 0xe000_0100;
/// Magic word the boot trampoline checks before honouring a relocation
/// record.
pub const RELOCATION_MAGIC: u32 = 0xa5a5_a5a5;
/// Base address of the interrupt distributor.
pub const GIC_DIST_BASE: usize = 0xe0c0_1000;
/// Offset of the software generated interrupt register in the distributor.
pub const GICD_SGIR: usize = 0xf00;
/// `GICD_SGIR` target list filter encoding for "all cores but the caller".
pub const SGI_TARGET_OTHERS: u32 = 1 << 24;
/// SGI event id used to wake a parked core.
pub const SGI_EVENT_CHECK: u32 = 0;
/// Base address of the GPIO block wired to the board reset circuitry.
pub const GPIO3_BASE: usize = 0xe400_2000;
/// GPIO3 data bit driving the system reset/off line; active low.
pub const GPIO3_RESET_LINE: u32 = 1 << 26;

/// Reset release request register for `cluster`.
pub const fn sc_cpu_reset_dreq(cluster: usize) -> usize {
    SYSCTRL_BASE + 0x524 + (cluster << 3)
}

/// Reset status register for `cluster`. A set bit means the corresponding
/// logic is still held in reset.
pub const fn sc_cpu_reset_status(cluster: usize) -> usize {
    SYSCTRL_BASE + 0x1520 + (cluster << 3)
}

bitflags! {
    /// Cluster-shared reset lines in the `SC_CPU_RESET_*` registers.
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub struct ClusterResetLines: u32 {
        /// The cluster's shared L2 cache.
        const L2 = 1 << 8;
        /// The cluster's shared debug logic.
        const DEBUG = 1 << 13;
    }
}

/// Reset lines for one core: the core itself, its coprocessor and its
/// per-core debug logic.
pub const fn core_reset_lines(core: usize) -> u32 {
    (1 << core) | (1 << (core + 4)) | (1 << (core + 9))
}

/// Uncached, ordered access to the fixed register map.
///
/// Implementations must perform each call as exactly one 32-bit device
/// access, without buffering, merging or reordering.
pub trait RegisterSurface {
    /// Reads the 32-bit register at `addr`.
    fn read32(&self, addr: usize) -> u32;

    /// Writes the 32-bit register at `addr`.
    fn write32(&self, addr: usize, value: u32);
}

/// Direct volatile MMIO at the fixed physical addresses.
#[cfg(all(target_arch = "aarch64", not(test)))]
pub struct Hip04Mmio;

#[cfg(all(target_arch = "aarch64", not(test)))]
impl RegisterSurface for Hip04Mmio {
    fn read32(&self, addr: usize) -> u32 {
        // SAFETY: `addr` is one of the fixed device register addresses in
        // this module, mapped as device memory for the lifetime of the
        // firmware image.
        unsafe { (addr as *const u32).read_volatile() }
    }

    fn write32(&self, addr: usize, value: u32) {
        // SAFETY: `addr` is one of the fixed device register addresses in
        // this module, mapped as device memory for the lifetime of the
        // firmware image.
        unsafe { (addr as *mut u32).write_volatile(value) }
    }
}

/// Spins until `predicate` holds.
///
/// There is deliberately no timeout: if the hardware never acknowledges a
/// request the caller never returns. No recovery action is available to
/// firmware at this level, so a hang is the accepted failure mode.
pub fn spin_until(mut predicate: impl FnMut() -> bool) {
    while !predicate() {
        spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_register_stride() {
        assert_eq!(SYSCTRL_BASE + 0x524, sc_cpu_reset_dreq(0));
        assert_eq!(SYSCTRL_BASE + 0x53c, sc_cpu_reset_dreq(3));
        assert_eq!(SYSCTRL_BASE + 0x1520, sc_cpu_reset_status(0));
        assert_eq!(SYSCTRL_BASE + 0x1538, sc_cpu_reset_status(3));
    }

    #[test]
    fn core_reset_line_positions() {
        assert_eq!(0x0211, core_reset_lines(0));
        assert_eq!(0x1088, core_reset_lines(3));
    }

    #[test]
    fn spin_until_runs_predicate_to_completion() {
        let mut remaining = 3;
        spin_until(|| {
            if remaining == 0 {
                true
            } else {
                remaining -= 1;
                false
            }
        });
        assert_eq!(0, remaining);
    }
}
