//! Number and unit formatting shared by the view model and the advice prompt.
//!
//! Plain values use thousands separators and at most three fraction digits
//! (`1250000` -> `1,250,000`, `0.45` -> `0.45`). Rate values are fractions
//! rendered as whole percentages (`0.45` -> `45%`).

use crate::models::{SalesMetric, PERCENT_UNIT};

const MAX_FRACTION_DIGITS: i32 = 3;

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Formats a number with `,` grouping and up to three fraction digits.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let scale = 10f64.powi(MAX_FRACTION_DIGITS);
    let rounded = (value * scale).round() / scale;
    let text = format!("{:.*}", MAX_FRACTION_DIGITS as usize, rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::new();
    if rounded < 0.0 {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Renders a fraction as a whole percentage: `0.45` -> `45%`.
pub fn format_percent(fraction: f64) -> String {
    format!("{}%", format_number((fraction * 100.0).round()))
}

/// Formats a value with its unit. A `%` unit means the value is a fraction.
pub fn format_value(value: f64, unit: Option<&str>) -> String {
    match unit {
        Some(PERCENT_UNIT) => format_percent(value),
        Some(unit) => format!("{}{}", format_number(value), unit),
        None => format_number(value),
    }
}

/// Formats one of a metric's values, honouring the rate-metric special case.
pub fn format_metric_value(metric: &SalesMetric, value: f64) -> String {
    if metric.is_rate() {
        format_percent(value)
    } else {
        format_value(value, metric.unit.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_grouping() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(3700.0), "3,700");
        assert_eq!(format_number(1_250_000.0), "1,250,000");
        assert_eq!(format_number(-12345.0), "-12,345");
    }

    #[test]
    fn test_format_number_fractions() {
        assert_eq!(format_number(0.45), "0.45");
        assert_eq!(format_number(1234.5), "1,234.5");
        assert_eq!(format_number(1.23456), "1.235");
        assert_eq!(format_number(-0.0001), "0");
    }

    #[test]
    fn test_format_value_units() {
        assert_eq!(format_value(1250.0, Some("P")), "1,250P");
        assert_eq!(format_value(1_250_000.0, Some("円")), "1,250,000円");
        assert_eq!(format_value(18.0, Some("")), "18");
        assert_eq!(format_value(18.0, None), "18");
        assert_eq!(format_value(0.6, Some("%")), "60%");
    }

    #[test]
    fn test_rate_metric_without_unit_formats_as_percent() {
        let metric = SalesMetric {
            label: crate::models::RATE_METRIC_LABEL.to_string(),
            current: 0.45,
            target: 0.60,
            unit: None,
        };
        assert_eq!(format_metric_value(&metric, metric.current), "45%");
        assert_eq!(format_metric_value(&metric, metric.target), "60%");
    }
}
