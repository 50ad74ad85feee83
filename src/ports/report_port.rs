//! Report output port trait.

use crate::domain::error::SlotwalkError;
use crate::domain::walk_forward::WalkForwardReport;
use std::path::Path;

/// Port for writing walk-forward results.
pub trait ReportPort {
    /// Writes the report under `output`, returning the paths written.
    fn write(
        &self,
        report: &WalkForwardReport,
        output: &Path,
    ) -> Result<Vec<std::path::PathBuf>, SlotwalkError>;
}
