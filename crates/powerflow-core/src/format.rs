// ── Value formatting ──
//
// Turns raw entity state strings into display strings per unit kind.
// Pure and total: anything that is not a finite number becomes a sentinel.

use crate::model::{EntityValue, UnitKind};

/// Shown for values that are not numeric, not configured, or when there is
/// no connection.
pub const UNAVAILABLE: &str = "---";

/// Shown for an entity whose fetch failed on the last tick.
pub const FETCH_FAILED: &str = "N/A";

/// Parse a raw state into a finite number.
///
/// Home Assistant reports `unavailable` / `unknown` for offline sensors;
/// those and `NaN`/`inf` all yield `None`.
pub fn parse_state(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a raw state string for display.
///
/// ```
/// use powerflow_core::format::format_value;
/// use powerflow_core::UnitKind;
///
/// assert_eq!(format_value("5", UnitKind::Power), "5 W");
/// assert_eq!(format_value("250", UnitKind::Power), "250W");
/// assert_eq!(format_value("abc", UnitKind::Power), "---");
/// ```
pub fn format_value(raw: &str, unit: UnitKind) -> String {
    parse_state(raw).map_or_else(|| UNAVAILABLE.to_owned(), |v| format_number(v, unit))
}

/// Format an already-parsed finite number.
pub fn format_number(value: f64, unit: UnitKind) -> String {
    match unit {
        UnitKind::Power => {
            // `+ 0.0` folds -0 into 0 so small negatives don't render as "-0".
            let rounded = value.round() + 0.0;
            if rounded.abs() < 10.0 {
                format!("{rounded:.0} W")
            } else {
                format!("{rounded:.0}W")
            }
        }
        UnitKind::Percentage => format!("{:.0}%", value.round() + 0.0),
        UnitKind::Currency => {
            let digits = format!("{:.3}", value.abs());
            // Sign goes ahead of the currency symbol; values that round to
            // zero stay unsigned.
            if value < 0.0 && digits != "0.000" {
                format!("-${digits}/kWh")
            } else {
                format!("${digits}/kWh")
            }
        }
    }
}

/// Parse and format in one step, keeping the numeric value alongside the
/// display string.
pub fn to_entity_value(raw: &str, unit: UnitKind) -> EntityValue {
    match parse_state(raw) {
        Some(value) => EntityValue::Available {
            value,
            display: format_number(value, unit),
        },
        None => EntityValue::Unavailable,
    }
}

/// Recover the number from a display string produced by [`format_value`].
///
/// Sentinels and anything else unparseable yield `None`.
pub fn parse_display(display: &str) -> Option<f64> {
    let trimmed = display.trim();
    if trimmed == UNAVAILABLE || trimmed == FETCH_FAILED {
        return None;
    }
    let (negative, unsigned) = match trimmed.strip_prefix("-$") {
        Some(rest) => (true, rest),
        None => (false, trimmed.trim_start_matches('$')),
    };
    let stripped = unsigned
        .trim_end_matches("/kWh")
        .trim_end_matches('%')
        .trim_end_matches('W')
        .trim();
    parse_state(stripped).map(|v| if negative { -v } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_padding_depends_on_magnitude() {
        assert_eq!(format_value("5", UnitKind::Power), "5 W");
        assert_eq!(format_value("9.4", UnitKind::Power), "9 W");
        assert_eq!(format_value("9.6", UnitKind::Power), "10W");
        assert_eq!(format_value("250", UnitKind::Power), "250W");
        assert_eq!(format_value("-300", UnitKind::Power), "-300W");
        assert_eq!(format_value("-5", UnitKind::Power), "-5 W");
        assert_eq!(format_value("-0.2", UnitKind::Power), "0 W");
    }

    #[test]
    fn percentage_and_currency() {
        assert_eq!(format_value("85.4", UnitKind::Percentage), "85%");
        assert_eq!(format_value("99.5", UnitKind::Percentage), "100%");
        assert_eq!(format_value("0.123", UnitKind::Currency), "$0.123/kWh");
        assert_eq!(format_value(" 0.08 ", UnitKind::Currency), "$0.080/kWh");
    }

    #[test]
    fn negative_prices_sign_before_symbol() {
        assert_eq!(format_value("-0.05", UnitKind::Currency), "-$0.050/kWh");
        assert_eq!(format_value("-0.0004", UnitKind::Currency), "$0.000/kWh");
        assert_eq!(format_value("-0", UnitKind::Currency), "$0.000/kWh");
        assert_eq!(parse_display("-$0.050/kWh"), Some(-0.05));
    }

    #[test]
    fn non_numeric_input_is_unavailable() {
        for raw in ["abc", "", "unavailable", "unknown", "NaN", "inf", "1.2.3"] {
            assert_eq!(format_value(raw, UnitKind::Power), UNAVAILABLE, "{raw:?}");
            assert_eq!(format_value(raw, UnitKind::Currency), UNAVAILABLE, "{raw:?}");
        }
    }

    #[test]
    fn entity_value_keeps_the_number() {
        match to_entity_value("1234.5", UnitKind::Power) {
            EntityValue::Available { value, display } => {
                assert!((value - 1234.5).abs() < f64::EPSILON);
                assert_eq!(display, "1235W");
            }
            other => panic!("expected Available, got {other:?}"),
        }
        assert_eq!(
            to_entity_value("unknown", UnitKind::Power),
            EntityValue::Unavailable
        );
    }

    #[test]
    fn parse_display_strips_units() {
        assert_eq!(parse_display("5 W"), Some(5.0));
        assert_eq!(parse_display("-300W"), Some(-300.0));
        assert_eq!(parse_display("85%"), Some(85.0));
        assert_eq!(parse_display("$0.123/kWh"), Some(0.123));
        assert_eq!(parse_display("---"), None);
        assert_eq!(parse_display("N/A"), None);
        assert_eq!(parse_display("garbage"), None);
    }
}
