// Copyright The HiP04 Firmware Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! The seam between the power state machine and the rest of the firmware.
//!
//! Everything the PSCI handler needs from its environment other than the
//! register map comes through [`Platform`]: the caller's hardware identity,
//! the boot-stage search base for relocation records, cache maintenance and
//! the terminal low-power wait. The production implementation binds to the
//! firmware's collaborator symbols; tests substitute [`test::TestPlatform`].


/// Firmware environment collaborators for the power state machine.
pub trait Platform {
    /// Returns the calling core's hardware affinity id, with the core index
    /// in bits 0-7 and the cluster index in bits 8-15.
    fn affinity_id(&self) -> u32;

    /// Returns the physical base address of the boot stage image, where a
    /// freshly reset core's trampoline looks for relocation records.
    fn boot_stage_base(&self) -> u32;

    /// Cleans and invalidates the calling core's private data cache.
    fn flush_local_cache(&self);

    /// Cleans and invalidates the cluster-shared data cache levels.
    fn flush_shared_cache(&self);

    /// Parks the calling core in its lowest power state.
    ///
    /// On hardware this never returns. Test implementations return instead,
    /// so that callers can observe the (nominally unreachable) fallthrough.
    fn wait_for_power_down(&self);
}

/// The production platform, bound to the firmware's collaborator symbols.
#[cfg(all(target_arch = "aarch64", not(test)))]
pub struct Hip04Platform;

#[cfg(all(target_arch = "aarch64", not(test)))]
mod hip04 {
    use super::{Hip04Platform, Platform};
    use crate::aarch64::wfi;

    unsafe extern "C" {
        safe fn get_boot_stage_base() -> u32;
        safe fn plat_flush_local_dcache();
        safe fn plat_flush_shared_dcache();
    }

    impl Platform for Hip04Platform {
        fn affinity_id(&self) -> u32 {
            arm_sysregs::read_mpidr_el1().bits() as u32
        }

        fn boot_stage_base(&self) -> u32 {
            get_boot_stage_base()
        }

        fn flush_local_cache(&self) {
            plat_flush_local_dcache();
        }

        fn flush_shared_cache(&self) {
            plat_flush_shared_dcache();
        }

        fn wait_for_power_down(&self) {
            loop {
                wfi();
            }
        }
    }
}
