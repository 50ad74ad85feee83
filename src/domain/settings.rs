//! Evaluation settings as read from configuration, before they are tied to a
//! particular trade log.

use crate::domain::error::SlotwalkError;
use crate::domain::normalize::NormalizedTable;
use crate::domain::selector::SelectionConfig;
use crate::domain::walk_forward::{Mode, WalkForwardConfig};
use crate::domain::window::{Period, WindowSpec};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookbackSpec {
    Window(WindowSpec),
    /// Calendar months counted from the first trade's day.
    Months(u32),
}

impl LookbackSpec {
    pub fn resolve(&self, table: &NormalizedTable) -> Result<WindowSpec, SlotwalkError> {
        match *self {
            LookbackSpec::Window(w) => Ok(w),
            LookbackSpec::Months(months) => {
                let first = table
                    .min_entry_time()
                    .ok_or_else(|| SlotwalkError::configuration("trade log is empty"))?;
                WindowSpec::leading_months(first, months).ok_or_else(|| {
                    SlotwalkError::configuration(format!(
                        "a {} month lookback overflows the calendar",
                        months
                    ))
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSettings {
    pub trades_path: Option<String>,
    pub lookback: LookbackSpec,
    pub forward: Option<WindowSpec>,
    pub modes: BTreeSet<Mode>,
    pub selection: SelectionConfig,
    pub step: Period,
}

impl EvaluationSettings {
    pub fn walk_forward_config(
        &self,
        table: &NormalizedTable,
    ) -> Result<WalkForwardConfig, SlotwalkError> {
        Ok(WalkForwardConfig {
            lookback: self.lookback.resolve(table)?,
            forward: self.forward,
            modes: self.modes.clone(),
            selection: self.selection,
            step: self.step,
        })
    }
}
