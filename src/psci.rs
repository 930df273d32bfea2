// Copyright The HiP04 Firmware Contributors.
//
// SPDX-License-Identifier: BSD-3-Clause

//! PSCI call handling and the secondary-core boot handshake.
//!
//! All state lives behind one spin lock over the [`CpuStateTable`]. The lock
//! is never held across the per-core reset status poll or the wake signal;
//! the snoop filter and cluster reset confirmation loops only touch the
//! register surface and may run under it.

pub mod cpu_state;

use crate::aarch64::dsb_sy;
use crate::cluster;
use crate::platform::Platform;
use crate::regs::{
    GIC_DIST_BASE, GICD_SGIR, GPIO3_BASE, GPIO3_RESET_LINE, RELOCATION_BASE, RELOCATION_MAGIC,
    RegisterSurface, SGI_EVENT_CHECK, SGI_TARGET_OTHERS,
};
use arm_psci::{AffinityInfo, EntryPoint, ErrorCode, Function, Mpidr, Version};
use cpu_state::{CORES_PER_CLUSTER, CoreState, CpuStateTable, MAX_CLUSTERS, PendingStart};
use log::info;
use spin::mutex::SpinMutex;

const VERSION: Version = Version { major: 0, minor: 2 };

/// SMC32 function id of `AFFINITY_INFO`, decoded by hand in the dispatcher.
const AFFINITY_INFO_ID: u32 = 0x8400_0004;

/// Handler for the PSCI power management calls.
pub struct Psci<P: Platform, R: RegisterSurface> {
    platform: P,
    regs: R,
    state: SpinMutex<CpuStateTable>,
}

impl<P: Platform, R: RegisterSurface> Psci<P, R> {
    /// Creates the PSCI handler with every core recorded as off.
    pub fn new(platform: P, regs: R) -> Self {
        info!("Initialising PSCI");
        Self {
            platform,
            regs,
            state: SpinMutex::new(CpuStateTable::new()),
        }
    }

    /// Handles a PSCI call, given the function id and its three arguments.
    ///
    /// Returns the signed PSCI status code, or the call's value for queries.
    /// Unknown or unimplemented function ids report `NOT_SUPPORTED` without
    /// touching any state.
    pub fn handle_call(&self, function: u32, args: [u64; 3]) -> i64 {
        let regs = [u64::from(function), args[0], args[1], args[2]];
        match self.handle_call_inner(&regs) {
            Ok(value) => value as i64,
            Err(return_code) => u64::from(return_code) as i64,
        }
    }

    fn handle_call_inner(&self, regs: &[u64; 4]) -> Result<u64, ErrorCode> {
        const SUCCESS: u64 = 0;

        // AFFINITY_INFO is decoded by hand: level 3 is a valid query on this
        // topology and reports On, but the arm-psci parser caps the level
        // argument at 2.
        if regs[0] == u64::from(AFFINITY_INFO_ID) {
            let affinity_info = self.affinity_info(decode_mpidr(regs[1]), regs[2] as u32)?;
            return Ok(u32::from(affinity_info).into());
        }

        let function = Function::try_from(regs)?;

        match function {
            Function::Version => Ok(u32::from(VERSION).into()),
            Function::CpuOn { target_cpu, entry } => {
                self.cpu_on(target_cpu, entry)?;
                Ok(SUCCESS)
            }
            Function::CpuOff => {
                self.cpu_off()?;
                Ok(SUCCESS)
            }
            Function::SystemOff => {
                info!("SYSTEM_OFF requested");
                self.halt_system()?;
                Ok(SUCCESS)
            }
            Function::SystemReset => {
                info!("SYSTEM_RESET requested");
                self.halt_system()?;
                Ok(SUCCESS)
            }
            _ => Err(ErrorCode::NotSupported),
        }
    }

    /// Handles `CPU_ON`.
    fn cpu_on(&self, target_cpu: Mpidr, entry: EntryPoint) -> Result<(), ErrorCode> {
        let Some((cluster, core)) = decode_target(target_cpu) else {
            return Err(ErrorCode::InvalidParameters);
        };

        let mut table = self.state.lock();
        self.ensure_registered(&mut table);

        match table.state(cluster, core) {
            CoreState::Pending => return Err(ErrorCode::OnPending),
            CoreState::On => return Err(ErrorCode::AlreadyOn),
            CoreState::Off => {}
        }

        self.write_relocation_record(entry.entry_point_address());
        if table.cluster_down(cluster) {
            cluster::ensure_cluster_up(&self.regs, cluster);
        }
        table.set_state(cluster, core, CoreState::Pending);
        table.set_pending_start(
            cluster,
            core,
            PendingStart {
                entry: entry.entry_point_address(),
                context: entry.context_id(),
            },
        );
        drop(table);

        // The status poll stalls until the core leaves reset, so it must run
        // without the table lock.
        cluster::release_core_resets(&self.regs, cluster, core);
        self.signal_wake();
        Ok(())
    }

    /// Handles `CPU_OFF`. Does not return on hardware; reports `DENIED` if
    /// the terminal wait is suppressed.
    fn cpu_off(&self) -> Result<(), ErrorCode> {
        let (cluster, core) = self.own_identity();

        let mut table = self.state.lock();
        self.ensure_registered(&mut table);
        table.set_state(cluster, core, CoreState::Off);
        let last_core_out = table.cluster_down(cluster);
        // Re-marking Pending keeps a racing CPU_ON for this core answered
        // with ON_PENDING instead of restarting it mid-teardown.
        table.set_state(cluster, core, CoreState::Pending);
        drop(table);

        if last_core_out {
            self.platform.flush_shared_cache();
            cluster::set_snoop_filter(&self.regs, cluster, false);
        } else {
            self.platform.flush_local_cache();
        }

        self.state.lock().set_state(cluster, core, CoreState::Off);
        self.platform.wait_for_power_down();
        Err(ErrorCode::Denied)
    }

    /// Handles `AFFINITY_INFO`.
    fn affinity_info(
        &self,
        mpidr: Mpidr,
        lowest_affinity_level: u32,
    ) -> Result<AffinityInfo, ErrorCode> {
        if lowest_affinity_level > 3 {
            return Err(ErrorCode::InvalidParameters);
        }
        // Address bits above the topology width are NotPresent at any level.
        if mpidr.aff2 != 0 || mpidr.aff3.unwrap_or(0) != 0 {
            return Err(ErrorCode::NotPresent);
        }
        let cluster = usize::from(mpidr.aff1);
        if cluster >= MAX_CLUSTERS || usize::from(mpidr.aff0) >= CORES_PER_CLUSTER {
            return Err(ErrorCode::NotPresent);
        }

        // The topology is flat above the cluster level.
        if lowest_affinity_level >= 2 {
            return Ok(AffinityInfo::On);
        }

        let mut table = self.state.lock();
        self.ensure_registered(&mut table);

        if lowest_affinity_level == 1 {
            return Ok(if table.cluster_down(cluster) {
                AffinityInfo::Off
            } else {
                AffinityInfo::On
            });
        }

        // The core index is derived from the level argument, which is always
        // zero here, so this reports the cluster's first core.
        let core = (lowest_affinity_level & 3) as usize;
        Ok(match table.state(cluster, core) {
            CoreState::Off => AffinityInfo::Off,
            CoreState::Pending => AffinityInfo::OnPending,
            CoreState::On => AffinityInfo::On,
        })
    }

    /// Drives the board reset line low and parks the calling core.
    ///
    /// Serves both `SYSTEM_OFF` and `SYSTEM_RESET`; where the line ends up
    /// wired decides which of the two the board performs. Reports `DENIED`
    /// if the terminal wait is suppressed.
    fn halt_system(&self) -> Result<(), ErrorCode> {
        let value = self.regs.read32(GPIO3_BASE) & !GPIO3_RESET_LINE;
        self.regs.write32(GPIO3_BASE, value);
        self.platform.wait_for_power_down();
        Err(ErrorCode::Denied)
    }

    /// Boot handshake for a core released from reset.
    ///
    /// Claims the start parameters stored by the `CPU_ON` request that woke
    /// the calling core and marks it running. Returns the entry point in the
    /// upper 32 bits and the low half of the context value in the lower 32,
    /// or 0 if no start is pending for this core, in which case the caller
    /// should go back to sleep.
    pub fn cpu_starting(&self) -> u64 {
        let (cluster, core) = self.own_identity();

        let mut table = self.state.lock();
        if table.state(cluster, core) == CoreState::Pending {
            if let Some(start) = table.take_pending_start(cluster, core) {
                table.set_state(cluster, core, CoreState::On);
                return (start.entry << 32) | (start.context & 0xffff_ffff);
            }
            // Pending without parameters means the core is mid power-down
            // teardown, not being started.
        }
        0
    }

    /// The calling core's (cluster, core) indices.
    fn own_identity(&self) -> (usize, usize) {
        let affinity_id = self.platform.affinity_id();
        (
            (affinity_id as usize >> 8) & (MAX_CLUSTERS - 1),
            affinity_id as usize & (CORES_PER_CLUSTER - 1),
        )
    }

    /// Records the calling core as running on its first table-touching call
    /// and enables its cluster's snoop filter bit.
    ///
    /// The boot core never goes through a `CPU_ON` request, so this is where
    /// it enters the table. Idempotent; must be called with the lock held.
    fn ensure_registered(&self, table: &mut CpuStateTable) {
        let (cluster, core) = self.own_identity();
        if table.register_once(cluster, core) {
            cluster::set_snoop_filter(&self.regs, cluster, true);
        }
    }

    /// Publishes the relocation record the target core's boot trampoline
    /// reads to find its jump target.
    fn write_relocation_record(&self, entry: u64) {
        self.regs
            .write32(RELOCATION_BASE, self.platform.boot_stage_base());
        self.regs.write32(RELOCATION_BASE + 4, RELOCATION_MAGIC);
        self.regs.write32(RELOCATION_BASE + 8, entry as u32);
        self.regs.write32(RELOCATION_BASE + 12, 0);
    }

    /// Wakes all other cores with an SGI, after a barrier making the
    /// relocation record and state updates visible.
    fn signal_wake(&self) {
        dsb_sy();
        self.regs
            .write32(GIC_DIST_BASE + GICD_SGIR, SGI_TARGET_OTHERS | SGI_EVENT_CHECK);
    }
}

/// Decodes a raw 32-bit affinity argument into its fields.
fn decode_mpidr(value: u64) -> Mpidr {
    Mpidr {
        aff0: value as u8,
        aff1: (value >> 8) as u8,
        aff2: (value >> 16) as u8,
        aff3: None,
    }
}

/// Decodes a `CPU_ON` target into (cluster, core), rejecting anything
/// outside the fixed 4x4 topology.
fn decode_target(target_cpu: Mpidr) -> Option<(usize, usize)> {
    if target_cpu.aff2 != 0 || target_cpu.aff3.unwrap_or(0) != 0 {
        return None;
    }
    let cluster = usize::from(target_cpu.aff1);
    let core = usize::from(target_cpu.aff0);
    (cluster < MAX_CLUSTERS && core < CORES_PER_CLUSTER).then_some((cluster, core))
}
