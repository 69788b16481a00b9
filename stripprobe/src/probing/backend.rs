//! The seam between the orchestrator and the kernel
//!
//! A backend owns no session state. It hands out opaque handles for the
//! instrumentation unit, the opened target and each attached probe, and takes
//! them back to release them. [`Session`](super::Session) decides the order.

use std::path::Path;

use crate::domain::AttachError;

use super::strategy::ProbeSpec;

pub trait ProbeBackend {
    /// Loaded instrumentation unit (programs + maps)
    type Unit;
    /// Target executable opened for attachment
    type Executable;
    /// One live probe binding
    type Link;

    /// Whether probes can be bound by raw file offset with no symbol name
    fn supports_raw_address(&self) -> bool;

    /// Load the instrumentation unit and verify its programs.
    ///
    /// # Errors
    /// [`AttachError::UnitLoadFailed`] or [`AttachError::ProgramNotFound`].
    fn load_unit(&mut self) -> Result<Self::Unit, AttachError>;

    /// # Errors
    /// [`AttachError::OpenExecutableFailed`].
    fn open_executable(&mut self, path: &Path) -> Result<Self::Executable, AttachError>;

    /// Bind a probe that fires when execution reaches the location.
    ///
    /// # Errors
    /// [`AttachError::ProbeAttachFailed`] or [`AttachError::ProgramNotFound`].
    fn attach_entry_probe(
        &mut self,
        unit: &mut Self::Unit,
        executable: &Self::Executable,
        spec: &ProbeSpec,
    ) -> Result<Self::Link, AttachError>;

    /// Bind a probe that fires when the function at the location returns.
    ///
    /// # Errors
    /// [`AttachError::ProbeAttachFailed`] or [`AttachError::ProgramNotFound`].
    fn attach_exit_probe(
        &mut self,
        unit: &mut Self::Unit,
        executable: &Self::Executable,
        spec: &ProbeSpec,
    ) -> Result<Self::Link, AttachError>;

    /// # Errors
    /// [`AttachError::ReleaseFailed`].
    fn detach(&mut self, unit: &mut Self::Unit, link: Self::Link) -> Result<(), AttachError>;

    /// # Errors
    /// [`AttachError::ReleaseFailed`].
    fn close_executable(&mut self, executable: Self::Executable) -> Result<(), AttachError>;

    /// # Errors
    /// [`AttachError::ReleaseFailed`].
    fn close_unit(&mut self, unit: Self::Unit) -> Result<(), AttachError>;
}
