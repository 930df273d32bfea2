// Copyright The HiP04 Firmware Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! Thin wrappers around the AArch64 barrier and wait instructions.
//!
//! On other targets (host-side unit tests) these compile to no-ops.

#[cfg(target_arch = "aarch64")]
use core::arch::asm;

/// Issues a full-system data synchronization barrier (`dsb sy`).
pub fn dsb_sy() {
    #[cfg(target_arch = "aarch64")]
    // SAFETY: `dsb` does not violate safe Rust guarantees.
    unsafe {
        asm!("dsb sy", options(nostack));
    }
}

/// Waits for an interrupt (`wfi`).
pub fn wfi() {
    #[cfg(target_arch = "aarch64")]
    // SAFETY: `wfi` does not violate safe Rust guarantees.
    unsafe {
        asm!("wfi", options(nostack));
    }
}
