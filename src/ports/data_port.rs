//! Trade log source port trait.

use crate::domain::error::SlotwalkError;
use crate::domain::normalize::RawTable;

pub trait DataPort {
    /// Loads the raw trade log. Rows are returned untyped; schema checks and
    /// parsing happen in [`crate::domain::normalize::normalize`].
    fn load_trades(&self) -> Result<RawTable, SlotwalkError>;

    /// A human-readable name for the source, used in progress messages.
    fn describe(&self) -> String;
}
