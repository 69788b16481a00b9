use anyhow::{Context, Result};
use aya::maps::PerCpuArray;
use aya::Ebpf;
use stripprobe_common::PROBE_HITS_MAP;

use crate::domain::ProbeRole;

/// Total hits per probe role, summed across CPUs
///
/// # Errors
/// Returns an error if the `PROBE_HITS` map is missing or unreadable
pub fn probe_hit_counts(bpf: &Ebpf) -> Result<Vec<(ProbeRole, u64)>> {
    let hits: PerCpuArray<_, u64> = PerCpuArray::try_from(
        bpf.map(PROBE_HITS_MAP).context("PROBE_HITS map not found")?,
    )?;

    ProbeRole::ALL
        .iter()
        .map(|&role| -> Result<(ProbeRole, u64)> {
            let per_cpu = hits
                .get(&role.hit_slot(), 0)
                .with_context(|| format!("Failed to read hit counter for {role}"))?;
            Ok((role, per_cpu.iter().sum::<u64>()))
        })
        .collect()
}

/// Print how often each probe fired
///
/// Lets the operator confirm the offsets were right without reading the
/// trace ring: a probe bound to the wrong offset usually reports zero.
///
/// # Errors
/// Returns an error if the hit counters cannot be read
pub fn print_probe_hits(bpf: &Ebpf) -> Result<()> {
    println!("probe hits:");
    for (role, count) in probe_hit_counts(bpf)? {
        println!("   - {role}: {count}");
    }
    Ok(())
}
