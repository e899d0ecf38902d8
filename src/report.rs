use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use crate::types::{BenchmarkVariant, TimingResult};

/// Width of the description column.
pub const DESCRIPTION_WIDTH: usize = 35;
/// Width of the numeric part of the duration column.
pub const DURATION_WIDTH: usize = 16;
/// Printed instead of a duration when nothing measurable happened.
pub const NOT_MEASURABLE: &str = "   (not installed?)";

/// Pad or cut `description` to exactly `width` characters.
pub fn fit_description(description: &str, width: usize) -> String {
    let count = description.chars().count();
    if count <= width {
        return format!("{description:<width$}");
    }
    let keep = width.saturating_sub(3);
    let cut: String = description.chars().take(keep).collect();
    format!("{cut}...")
}

/// Milliseconds with two decimals, rounding half up on the nanosecond value.
pub fn format_millis(result: &TimingResult) -> String {
    let hundredths = (result.mean.as_nanos() + 5_000) / 10_000;
    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}

/// One report line: description column followed by the mean duration or the
/// not-measurable marker.
#[tracing::instrument(level = "trace", skip_all)]
pub fn format_line(result: &TimingResult) -> String {
    let description = fit_description(&result.variant_description, DESCRIPTION_WIDTH);
    let value = if result.below_resolution {
        NOT_MEASURABLE
            .if_supports_color(Stream::Stdout, |s| s.dimmed())
            .to_string()
    } else {
        format!("{:>width$} ms", format_millis(result), width = DURATION_WIDTH)
            .if_supports_color(Stream::Stdout, |s| s.yellow())
            .to_string()
    };
    format!("{description} {value}")
}

/// `name  description` listing for `--list`.
pub fn format_listing(variants: &[&BenchmarkVariant]) -> String {
    let width = variants.iter().map(|v| v.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for variant in variants {
        let name = format!("{:<width$}", variant.name);
        out.push_str(&format!(
            "{}  {}\n",
            name.if_supports_color(Stream::Stdout, |s| s.green()),
            variant.description
        ));
    }
    out
}

#[derive(Serialize)]
struct JsonResult<'a> {
    description: &'a str,
    mean_seconds: f64,
    mean_ms: f64,
    measurable: bool,
}

/// JSON array of results, in run order.
pub fn format_json(results: &[TimingResult]) -> String {
    let rows: Vec<JsonResult<'_>> = results
        .iter()
        .map(|r| JsonResult {
            description: &r.variant_description,
            mean_seconds: r.mean_seconds(),
            mean_ms: r.mean_seconds() * 1000.0,
            measurable: !r.below_resolution,
        })
        .collect();

    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(description: &str, mean: Duration) -> TimingResult {
        TimingResult::new(description, mean)
    }

    /// Exact-text assertions need uncoloured output, whatever stdout is.
    fn no_colour() {
        owo_colors::set_override(false);
    }

    #[test]
    fn description_of_exact_width_is_kept() {
        let desc = "a".repeat(DESCRIPTION_WIDTH);
        assert_eq!(fit_description(&desc, DESCRIPTION_WIDTH), desc);
    }

    #[test]
    fn short_description_is_padded() {
        let fitted = fit_description("short", DESCRIPTION_WIDTH);
        assert_eq!(fitted.len(), DESCRIPTION_WIDTH);
        assert!(fitted.starts_with("short "));
    }

    #[test]
    fn long_description_is_cut() {
        let desc = "b".repeat(50);
        let fitted = fit_description(&desc, DESCRIPTION_WIDTH);
        assert_eq!(fitted.chars().count(), DESCRIPTION_WIDTH);
        assert!(fitted.ends_with("..."));
    }

    #[test]
    fn multibyte_description_cut_on_char_boundary() {
        let desc = "模板".repeat(30);
        let fitted = fit_description(&desc, DESCRIPTION_WIDTH);
        assert_eq!(fitted.chars().count(), DESCRIPTION_WIDTH);
    }

    #[test]
    fn millis_round_half_up() {
        let r = result("x", Duration::from_micros(12_345));
        assert_eq!(format_millis(&r), "12.35");
        let r = result("x", Duration::from_micros(12_344));
        assert_eq!(format_millis(&r), "12.34");
        let r = result("x", Duration::from_millis(1500));
        assert_eq!(format_millis(&r), "1500.00");
    }

    #[test]
    fn line_with_duration() {
        no_colour();
        let desc = "MiniJinja template baked -O1";
        let line = format_line(&result(desc, Duration::from_micros(12_345)));
        assert!(line.starts_with(desc));
        assert!(line.ends_with("12.35 ms"));
        // description column + space + right-aligned value + " ms"
        assert_eq!(line.len(), DESCRIPTION_WIDTH + 1 + DURATION_WIDTH + 3);
    }

    #[test]
    fn line_with_exact_width_description() {
        no_colour();
        let desc = "c".repeat(DESCRIPTION_WIDTH);
        let line = format_line(&result(&desc, Duration::from_millis(3)));
        assert!(line.starts_with(&format!("{desc} ")));
        assert!(line.ends_with("3.00 ms"));
    }

    #[test]
    fn below_resolution_uses_marker() {
        no_colour();
        let r = result("noop", Duration::from_nanos(50));
        assert!(r.below_resolution);
        let line = format_line(&r);
        assert!(line.ends_with(NOT_MEASURABLE));
        assert!(!line.contains(" ms"));
    }

    #[test]
    fn resolution_boundary() {
        assert!(result("x", Duration::from_nanos(9_999)).below_resolution);
        assert!(!result("x", Duration::from_micros(10)).below_resolution);
    }

    #[test]
    fn listing_aligns_names() {
        no_colour();
        let a = BenchmarkVariant::new("short", "Short one", "t", Box::new(|| Ok(())));
        let b = BenchmarkVariant::new("much_longer", "Long one", "t", Box::new(|| Ok(())));
        let out = format_listing(&[&a, &b]);
        assert_eq!(out, "short        Short one\nmuch_longer  Long one\n");
    }

    #[test]
    fn uncoloured_line_has_no_escape_codes() {
        no_colour();
        let measured = format_line(&result("fast", Duration::from_millis(2)));
        let noop = format_line(&result("noop", Duration::ZERO));
        assert!(!measured.contains('\x1b'));
        assert!(!noop.contains('\x1b'));
    }

    #[test]
    fn json_empty() {
        assert_eq!(format_json(&[]), "[]");
    }

    #[test]
    fn json_fields() {
        let results = vec![
            result("fast", Duration::from_millis(2)),
            result("noop", Duration::ZERO),
        ];
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&format_json(&results)).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["description"], "fast");
        assert_eq!(parsed[0]["measurable"], true);
        assert!((parsed[0]["mean_ms"].as_f64().unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(parsed[1]["measurable"], false);
    }
}
