//! Pre-flight checks for stripprobe
//!
//! Validates system requirements before attempting to load eBPF programs.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() and setrlimit() require unsafe

use anyhow::{bail, Context, Result};
use log::{debug, info};
use object::{Object, ObjectSection};
use std::path::Path;

/// Minimum kernel version for perf_event-based uprobe attachment
const MIN_KERNEL_VERSION: (u32, u32) = (4, 17);

/// Run all pre-flight checks before eBPF loading
///
/// `resolve_only` skips the checks that only matter for attachment.
///
/// # Errors
/// Returns an error describing the first unmet requirement
pub fn run_preflight_checks(target_path: &Path, resolve_only: bool, quiet: bool) -> Result<()> {
    check_binary_exists(target_path)?;
    check_symbol_table(target_path, quiet)?;
    if !resolve_only {
        check_privileges()?;
        check_kernel_version()?;
    }
    Ok(())
}

/// Check if running with sufficient privileges for eBPF
fn check_privileges() -> Result<()> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    // CAP_BPF + CAP_PERFMON would also do, but checking capabilities needs
    // more than libc; require root like the kernel's default policy
    bail!(
        "Permission denied: stripprobe requires root privileges to load eBPF programs.\n\n\
         Run with: sudo stripprobe ...\n\
         Or use --resolve-only to compute offsets without attaching."
    );
}

/// Check if the kernel version is sufficient for uprobe attachment
fn check_kernel_version() -> Result<()> {
    let version_str = std::fs::read_to_string("/proc/version")
        .context("Failed to read kernel version from /proc/version")?;

    let release = version_str.split_whitespace().nth(2).unwrap_or("unknown");

    let Some((major, minor)) = parse_kernel_release(release) else {
        // Can't parse, assume it's fine
        return Ok(());
    };

    if (major, minor) < MIN_KERNEL_VERSION {
        bail!(
            "Kernel version {}.{} is too old.\n\n\
             stripprobe requires Linux {}.{} or newer for perf_event uprobes.\n\
             Current kernel: {}",
            major,
            minor,
            MIN_KERNEL_VERSION.0,
            MIN_KERNEL_VERSION.1,
            release
        );
    }

    Ok(())
}

/// Parse "6.1.0-arch1-1" into (6, 1)
fn parse_kernel_release(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()?;
    Some((major, minor))
}

/// Check if the target binary exists and is a regular file
fn check_binary_exists(target_path: &Path) -> Result<()> {
    if !target_path.exists() {
        bail!(
            "Binary not found: {}\n\n\
             Make sure the path is correct and the binary exists.",
            target_path.display()
        );
    }
    if !target_path.is_file() {
        bail!(
            "Not a file: {}\n\n\
             BINARY must point to an executable file, not a directory.",
            target_path.display()
        );
    }
    Ok(())
}

/// Note when the target still has a symbol table
///
/// Offsets work either way; an unstripped target just means the relative
/// offsets could have been read from the target itself.
fn check_symbol_table(target_path: &Path, quiet: bool) -> Result<()> {
    if quiet {
        return Ok(());
    }

    let file_data = std::fs::read(target_path)
        .with_context(|| format!("Failed to read binary: {}", target_path.display()))?;

    let Ok(obj) = object::File::parse(&*file_data) else {
        // Not a valid object file, let the resolver report it
        return Ok(());
    };

    if obj.section_by_name(".symtab").is_some_and(|s| s.size() > 0) {
        info!("{} is not stripped; its own symbol table could supply the offsets", target_path.display());
    } else {
        debug!("{} has no symbol table", target_path.display());
    }

    Ok(())
}

/// Lift RLIMIT_MEMLOCK for kernels that still charge BPF maps against it
///
/// Failure is only logged: kernels 5.11+ use memcg accounting instead.
pub fn raise_memlock_rlimit() {
    let rlim = libc::rlimit { rlim_cur: libc::RLIM_INFINITY, rlim_max: libc::RLIM_INFINITY };
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        debug!("Removing RLIMIT_MEMLOCK failed: {}", std::io::Error::last_os_error());
    }
}
