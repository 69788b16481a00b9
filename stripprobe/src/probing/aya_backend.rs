//! # eBPF Program Loading and Attachment
//!
//! Production [`ProbeBackend`]: loads the instrumentation unit with aya and
//! binds its programs as uprobes/uretprobes on the target file.
//!
//! ## Attachment Points
//!
//! - **Uprobe**: `uprobe_read_entry` at the read offset
//! - **Uprobe**: `uprobe_write_entry` at the write offset
//! - **Uretprobe**: `uretprobe_write_exit` at the write offset
//!
//! aya's `UProbe::attach(symbol, offset, target, pid)` takes either no symbol
//! and a raw file offset, or a symbol plus an offset from it, so both
//! strategies map straight onto one call.

use std::fs::File;
use std::path::{Path, PathBuf};

use aya::programs::uprobe::UProbeLinkId;
use aya::programs::{ProgramError, UProbe};
use aya::Ebpf;
use log::debug;

use crate::domain::{AttachError, ProbeRole};

use super::backend::ProbeBackend;
use super::strategy::ProbeSpec;

/// Where `cargo xtask build-ebpf` leaves the instrumentation unit
pub const DEFAULT_UNIT_PATH: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/../target/bpfel-unknown-none/release/stripprobe");

pub struct AyaBackend {
    unit_path: PathBuf,
    pid: Option<i32>,
}

impl AyaBackend {
    /// `pid` restricts every probe to one process; `None` fires for all.
    #[must_use]
    pub fn new(unit_path: PathBuf, pid: Option<i32>) -> Self {
        Self { unit_path, pid }
    }
}

/// Target opened for attachment. Holding the file keeps it from being
/// replaced under us between resolution and attachment.
pub struct TargetExecutable {
    path: PathBuf,
    _file: File,
}

pub struct UProbeLink {
    role: ProbeRole,
    id: UProbeLinkId,
}

fn uprobe_program(bpf: &mut Ebpf, role: ProbeRole) -> Result<&mut UProbe, AttachError> {
    let name = role.program_name();
    let program = bpf.program_mut(name).ok_or_else(|| AttachError::ProgramNotFound(name.to_string()))?;
    program
        .try_into()
        .map_err(|e: ProgramError| AttachError::UnitLoadFailed(format!("{name} is not a uprobe: {e}")))
}

/// Render a program error with its syscall cause, flagging privilege errors.
fn describe_program_error(err: &ProgramError) -> String {
    if let ProgramError::SyscallError(syscall) = err {
        let denied = matches!(syscall.io_error.raw_os_error(), Some(libc::EACCES | libc::EPERM));
        return if denied {
            format!("{err}: {} (permission denied, run as root)", syscall.io_error)
        } else {
            format!("{err}: {}", syscall.io_error)
        };
    }
    err.to_string()
}

impl AyaBackend {
    fn attach_uprobe(
        &self,
        bpf: &mut Ebpf,
        executable: &TargetExecutable,
        spec: &ProbeSpec,
    ) -> Result<UProbeLink, AttachError> {
        let program = uprobe_program(bpf, spec.role)?;
        let id = program
            .attach(
                spec.location.symbol(),
                spec.location.primitive_offset(),
                &executable.path,
                self.pid,
            )
            .map_err(|e| AttachError::ProbeAttachFailed {
                probe: spec.role,
                binary: executable.path.display().to_string(),
                offset: spec.location.file_offset(),
                error: describe_program_error(&e),
            })?;
        Ok(UProbeLink { role: spec.role, id })
    }
}

impl ProbeBackend for AyaBackend {
    type Unit = Ebpf;
    type Executable = TargetExecutable;
    type Link = UProbeLink;

    fn supports_raw_address(&self) -> bool {
        true
    }

    fn load_unit(&mut self) -> Result<Ebpf, AttachError> {
        let mut bpf = Ebpf::load_file(&self.unit_path).map_err(|e| {
            AttachError::UnitLoadFailed(format!("{}: {e}", self.unit_path.display()))
        })?;

        for role in ProbeRole::ALL {
            uprobe_program(&mut bpf, role)?.load().map_err(|e| {
                AttachError::UnitLoadFailed(format!(
                    "{}: {}",
                    role.program_name(),
                    describe_program_error(&e)
                ))
            })?;
            debug!("Loaded program {}", role.program_name());
        }

        Ok(bpf)
    }

    fn open_executable(&mut self, path: &Path) -> Result<TargetExecutable, AttachError> {
        let file = File::open(path).map_err(|e| AttachError::OpenExecutableFailed {
            binary: path.display().to_string(),
            error: e.to_string(),
        })?;
        Ok(TargetExecutable { path: path.to_path_buf(), _file: file })
    }

    fn attach_entry_probe(
        &mut self,
        unit: &mut Ebpf,
        executable: &TargetExecutable,
        spec: &ProbeSpec,
    ) -> Result<UProbeLink, AttachError> {
        self.attach_uprobe(unit, executable, spec)
    }

    fn attach_exit_probe(
        &mut self,
        unit: &mut Ebpf,
        executable: &TargetExecutable,
        spec: &ProbeSpec,
    ) -> Result<UProbeLink, AttachError> {
        // The uretprobe kind comes from the program's section, not the call
        self.attach_uprobe(unit, executable, spec)
    }

    fn detach(&mut self, unit: &mut Ebpf, link: UProbeLink) -> Result<(), AttachError> {
        let resource = format!("{} probe", link.role);
        uprobe_program(unit, link.role)?.detach(link.id).map_err(|e| AttachError::ReleaseFailed {
            resource,
            error: describe_program_error(&e),
        })
    }

    fn close_executable(&mut self, executable: TargetExecutable) -> Result<(), AttachError> {
        drop(executable);
        Ok(())
    }

    fn close_unit(&mut self, unit: Ebpf) -> Result<(), AttachError> {
        // Dropping the Ebpf closes every program and map fd it owns
        drop(unit);
        Ok(())
    }
}
