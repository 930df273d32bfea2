// Copyright The HiP04 Firmware Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! PSCI power state coordination for the HiP04 multi-cluster SoC.
//!
//! This crate implements the control-plane side of CPU power management for a
//! fixed four-cluster, four-cores-per-cluster topology: powering a core on
//! with an entry point and context value, powering the calling core off,
//! querying core and cluster power state, and driving system off/reset. The
//! hardware sequencing protocol (cluster reset lines, the cache snoop filter
//! mask, the relocation record read by the boot trampoline, the wake
//! interrupt) is part of the contract and is driven through the
//! [`regs::RegisterSurface`] seam; everything else the firmware environment
//! provides arrives through [`platform::Platform`].
//!
//! The outer call surface is a single dispatcher entry point,
//! [`psci::Psci::handle_call`], fed with the standard PSCI function
//! identifiers, plus the boot handshake retrieval call
//! [`psci::Psci::cpu_starting`] used by a core that has just been released
//! from reset.
//!
//! Hardware acknowledgment polling is unbounded by design: if the SoC never
//! acknowledges a request, the calling core hangs. There is no recovery
//! action available to firmware at this level, so no timeout is provided.

#![cfg_attr(not(test), no_std)]

pub mod aarch64;
pub mod cluster;
pub mod logger;
pub mod platform;
pub mod psci;
pub mod regs;
