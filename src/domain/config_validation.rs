//! Configuration validation.
//!
//! Checks every evaluation setting in the INI file before any trade data is
//! loaded.

use crate::domain::error::SlotwalkError;
use crate::domain::selector::RankMetric;
use crate::domain::walk_forward::Mode;
use crate::domain::window::Period;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::collections::BTreeSet;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_evaluation_config(config: &dyn ConfigPort) -> Result<(), SlotwalkError> {
    validate_selection(config)?;
    let modes = parse_modes(config)?;
    validate_step(config)?;
    validate_lookback(config)?;
    if modes.contains(&Mode::Fixed) {
        validate_forward(config)?;
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SlotwalkError {
    SlotwalkError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> SlotwalkError {
    SlotwalkError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

pub fn parse_enum<T: std::str::FromStr<Err = String>>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, SlotwalkError> {
    match config.get_value(section, key) {
        None => Ok(None),
        Some(v) => v.parse::<T>().map(Some).map_err(|e| invalid(section, key, e)),
    }
}

pub fn positive_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<usize, SlotwalkError> {
    if let Some(raw) = config.get_value(section, key) {
        if raw.parse::<i64>().is_err() {
            return Err(invalid(section, key, format!("{} must be an integer", key)));
        }
    }
    let value = config.get_int(section, key, default);
    if value < 1 {
        return Err(invalid(section, key, format!("{} must be at least 1", key)));
    }
    usize::try_from(value).map_err(|_| invalid(section, key, format!("{} is too large", key)))
}

pub fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, SlotwalkError> {
    match config.get_value(section, key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| invalid(section, key, format!("invalid {} format, expected YYYY-MM-DD", key))),
    }
}

fn validate_selection(config: &dyn ConfigPort) -> Result<(), SlotwalkError> {
    parse_enum::<RankMetric>(config, "selection", "rank_metric")?;
    positive_count(config, "selection", "top_n", 5)?;
    if parse_enum::<Period>(config, "selection", "period")?.is_some() {
        positive_count(config, "selection", "top_per_period", 3)?;
    }
    Ok(())
}

/// Requested walk-forward modes; anchored when none are listed.
pub fn parse_modes(config: &dyn ConfigPort) -> Result<BTreeSet<Mode>, SlotwalkError> {
    let names = config.get_list("walk_forward", "modes");
    if names.is_empty() {
        return Ok(BTreeSet::from([Mode::Anchored]));
    }
    names
        .iter()
        .map(|n| n.parse::<Mode>().map_err(|e| invalid("walk_forward", "modes", e)))
        .collect()
}

fn validate_step(config: &dyn ConfigPort) -> Result<(), SlotwalkError> {
    parse_enum::<Period>(config, "walk_forward", "step")?;
    Ok(())
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), SlotwalkError> {
    let start = parse_date(config, "lookback", "start_date")?;
    let end = parse_date(config, "lookback", "end_date")?;
    let has_months = config.get_value("lookback", "months").is_some();

    match (start, end) {
        (Some(s), Some(e)) => {
            if has_months {
                return Err(invalid(
                    "lookback",
                    "months",
                    "give either months or start_date/end_date, not both",
                ));
            }
            if s > e {
                return Err(invalid(
                    "lookback",
                    "start_date",
                    "start_date must not be after end_date",
                ));
            }
            Ok(())
        }
        (Some(_), None) => Err(missing("lookback", "end_date")),
        (None, Some(_)) => Err(missing("lookback", "start_date")),
        (None, None) if has_months => positive_count(config, "lookback", "months", 0).map(|_| ()),
        (None, None) => Err(missing("lookback", "start_date")),
    }
}

fn validate_forward(config: &dyn ConfigPort) -> Result<(), SlotwalkError> {
    let start = parse_date(config, "forward", "start_date")?
        .ok_or_else(|| missing("forward", "start_date"))?;
    let end =
        parse_date(config, "forward", "end_date")?.ok_or_else(|| missing("forward", "end_date"))?;
    if start > end {
        return Err(invalid(
            "forward",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_config_passes() {
        let config = make_config(
            r#"
[lookback]
start_date = 2023-01-01
end_date = 2023-06-30

[forward]
start_date = 2023-07-01
end_date = 2023-12-31

[selection]
rank_metric = pcr
top_n = 5
period = week
top_per_period = 2

[walk_forward]
modes = fixed, anchored, unanchored
step = month
"#,
        );
        assert!(validate_evaluation_config(&config).is_ok());
    }

    #[test]
    fn months_lookback_passes() {
        let config = make_config("[lookback]\nmonths = 6\n");
        assert!(validate_evaluation_config(&config).is_ok());
    }

    #[test]
    fn missing_lookback_fails() {
        let err = validate_evaluation_config(&make_config("[selection]\ntop_n = 3\n")).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigMissing { key, .. } if key == "start_date"));
    }

    #[test]
    fn lookback_months_and_dates_conflict() {
        let config = make_config(
            "[lookback]\nstart_date = 2023-01-01\nend_date = 2023-06-30\nmonths = 3\n",
        );
        let err = validate_evaluation_config(&config).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigInvalid { key, .. } if key == "months"));
    }

    #[test]
    fn zero_months_fails() {
        let err = validate_evaluation_config(&make_config("[lookback]\nmonths = 0\n")).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigInvalid { key, .. } if key == "months"));
    }

    #[test]
    fn inverted_lookback_fails() {
        let config = make_config("[lookback]\nstart_date = 2023-06-30\nend_date = 2023-01-01\n");
        let err = validate_evaluation_config(&config).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn bad_date_format_fails() {
        let config = make_config("[lookback]\nstart_date = 01/01/2023\nend_date = 2023-06-30\n");
        let err = validate_evaluation_config(&config).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn unknown_metric_fails() {
        let config = make_config("[lookback]\nmonths = 3\n[selection]\nrank_metric = sharpe\n");
        let err = validate_evaluation_config(&config).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigInvalid { key, .. } if key == "rank_metric"));
    }

    #[test]
    fn zero_top_n_fails() {
        let config = make_config("[lookback]\nmonths = 3\n[selection]\ntop_n = 0\n");
        let err = validate_evaluation_config(&config).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigInvalid { key, .. } if key == "top_n"));
    }

    #[test]
    fn non_numeric_top_n_fails() {
        let config = make_config("[lookback]\nmonths = 3\n[selection]\ntop_n = five\n");
        let err = validate_evaluation_config(&config).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigInvalid { key, .. } if key == "top_n"));
    }

    #[test]
    fn zero_top_per_period_fails_only_with_period() {
        let without = make_config("[lookback]\nmonths = 3\n[selection]\ntop_per_period = 0\n");
        assert!(validate_evaluation_config(&without).is_ok());

        let with = make_config(
            "[lookback]\nmonths = 3\n[selection]\nperiod = month\ntop_per_period = 0\n",
        );
        let err = validate_evaluation_config(&with).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigInvalid { key, .. } if key == "top_per_period"));
    }

    #[test]
    fn modes_default_to_anchored_and_deduplicate() {
        let none = make_config("[lookback]\nmonths = 3\n");
        assert_eq!(parse_modes(&none).unwrap(), BTreeSet::from([Mode::Anchored]));

        let repeated = make_config("[walk_forward]\nmodes = rolling, Unanchored, fixed\n");
        assert_eq!(
            parse_modes(&repeated).unwrap(),
            BTreeSet::from([Mode::Fixed, Mode::Unanchored])
        );
    }

    #[test]
    fn unknown_mode_fails() {
        let config = make_config("[lookback]\nmonths = 3\n[walk_forward]\nmodes = anchored, sideways\n");
        let err = validate_evaluation_config(&config).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigInvalid { key, .. } if key == "modes"));
    }

    #[test]
    fn unknown_step_fails() {
        let config = make_config("[lookback]\nmonths = 3\n[walk_forward]\nstep = quarter\n");
        let err = validate_evaluation_config(&config).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigInvalid { key, .. } if key == "step"));
    }

    #[test]
    fn fixed_mode_needs_forward_dates() {
        let config = make_config("[lookback]\nmonths = 3\n[walk_forward]\nmodes = fixed\n");
        let err = validate_evaluation_config(&config).unwrap_err();
        assert!(matches!(err, SlotwalkError::ConfigMissing { section, .. } if section == "forward"));
    }

    #[test]
    fn forward_ignored_without_fixed_mode() {
        let config = make_config(
            "[lookback]\nmonths = 3\n[forward]\nstart_date = garbage\n[walk_forward]\nmodes = rolling\n",
        );
        assert!(validate_evaluation_config(&config).is_ok());
    }
}
