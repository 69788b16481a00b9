//! # Probe Session
//!
//! Owns everything a run acquires: the instrumentation unit, the opened
//! target and the three probe links. Acquisition order is
//!
//! ```text
//! unit → target → read-entry → write-entry → write-exit
//! ```
//!
//! and release is always the mirror image. The links sit on a stack, and
//! [`Session::teardown`] pops it before closing the target and then the unit.
//! `Drop` runs the same teardown, so an attach failure half-way through
//! [`Session::establish`] releases exactly what was acquired before it.

use std::future::Future;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::domain::{AttachError, ProbeKind, ProbeRole, Result};

use super::backend::ProbeBackend;
use super::plan::ProbePlan;
use super::strategy::{AttachStrategy, ProbeSpec};

struct AttachedProbe<L> {
    role: ProbeRole,
    file_offset: u64,
    link: L,
}

/// Outcome of releasing a session's resources
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Descriptions of released resources, in release order
    pub released: Vec<String>,
    pub failures: Vec<AttachError>,
}

impl TeardownReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, resource: String, result: std::result::Result<(), AttachError>) {
        match result {
            Ok(()) => {
                debug!("Released {resource}");
                self.released.push(resource);
            }
            Err(e) => {
                warn!("Failed to release {resource}: {e}");
                self.failures.push(e);
            }
        }
    }
}

pub struct Session<B: ProbeBackend> {
    backend: B,
    target: PathBuf,
    unit: Option<B::Unit>,
    executable: Option<B::Executable>,
    probes: Vec<AttachedProbe<B::Link>>,
}

impl<B: ProbeBackend> Session<B> {
    /// Load the unit, open the target and attach every probe of `plan`.
    ///
    /// Any failure releases what was acquired so far, in reverse order, before
    /// the error is returned. No step is retried.
    ///
    /// # Errors
    /// A resolution error if offset mode cannot locate its anchor (nothing is
    /// loaded yet at that point), otherwise the first [`AttachError`].
    pub fn establish(backend: B, plan: &ProbePlan, strategy: &AttachStrategy) -> Result<Self> {
        let strategy = strategy.settle(backend.supports_raw_address());
        info!("Attachment strategy: {strategy}");
        let specs = plan.probe_specs(&strategy)?;

        let mut session = Session {
            backend,
            target: plan.target.clone(),
            unit: None,
            executable: None,
            probes: Vec::with_capacity(specs.len()),
        };

        let unit = session.unit.insert(session.backend.load_unit()?);
        info!("Loaded instrumentation unit");

        let executable = session.executable.insert(session.backend.open_executable(&plan.target)?);
        debug!("Opened {} for attachment", plan.target.display());

        for spec in &specs {
            info!("Attaching {} probe at {}", spec.role, spec.location);
            let link = attach(&mut session.backend, unit, executable, spec)?;
            session.probes.push(AttachedProbe {
                role: spec.role,
                file_offset: spec.location.file_offset(),
                link,
            });
            info!("Attached {} probe", spec.role);
        }

        Ok(session)
    }

    /// Attached probes with their file offsets, in attachment order
    pub fn attached(&self) -> impl Iterator<Item = (ProbeRole, u64)> + '_ {
        self.probes.iter().map(|p| (p.role, p.file_offset))
    }

    /// The loaded unit, until teardown releases it
    pub fn unit_mut(&mut self) -> Option<&mut B::Unit> {
        self.unit.as_mut()
    }

    /// Suspend until `shutdown` resolves. This is the session's only wait.
    pub async fn run_until<F: Future>(&mut self, shutdown: F) -> F::Output {
        info!(
            "{} probes attached to {}, waiting for termination signal",
            self.probes.len(),
            self.target.display()
        );
        shutdown.await
    }

    /// Release probes newest-first, then the target, then the unit.
    ///
    /// Best-effort: every resource is attempted even if an earlier release
    /// fails. Calling it again is a no-op.
    pub fn teardown(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        while let Some(probe) = self.probes.pop() {
            let Some(unit) = self.unit.as_mut() else {
                break;
            };
            let resource = format!("{} probe at 0x{:x}", probe.role, probe.file_offset);
            report.record(resource, self.backend.detach(unit, probe.link));
        }

        if let Some(executable) = self.executable.take() {
            let resource = format!("target {}", self.target.display());
            report.record(resource, self.backend.close_executable(executable));
        }

        if let Some(unit) = self.unit.take() {
            report.record("instrumentation unit".to_string(), self.backend.close_unit(unit));
        }

        report
    }
}

impl<B: ProbeBackend> Drop for Session<B> {
    fn drop(&mut self) {
        let report = self.teardown();
        if !report.released.is_empty() {
            debug!("Session dropped, released {} resources", report.released.len());
        }
    }
}

fn attach<B: ProbeBackend>(
    backend: &mut B,
    unit: &mut B::Unit,
    executable: &B::Executable,
    spec: &ProbeSpec,
) -> std::result::Result<B::Link, AttachError> {
    match spec.role.kind() {
        ProbeKind::Entry => backend.attach_entry_probe(unit, executable, spec),
        ProbeKind::Exit => backend.attach_exit_probe(unit, executable, spec),
    }
}
