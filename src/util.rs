// Parsing and statistics helpers.
//
// All the forgiving CSV value handling lives here so the loader and the
// aggregators can work with clean typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a numeric CSV field while tolerating the usual export noise.
///
/// Trims whitespace, strips thousands separators, rejects anything with
/// alphabetic characters, and returns `None` for blanks or garbage so the
/// caller can treat the value as missing.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    s.replace(',', "").parse::<f64>().ok()
}

/// Parse a date field. Unparseable values become `None`; the row survives
/// with a missing date marker.
///
/// CPCB exports use ISO `YYYY-MM-DD`; `DD-MM-YYYY` shows up in older dumps.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d-%m-%Y"))
        .ok()
}

/// Arithmetic mean. `None` for an empty slice so callers decide the
/// fallback explicitly instead of inheriting a silent zero.
pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    Some(v.iter().sum::<f64>() / v.len() as f64)
}

/// Pearson correlation coefficient of two equal-length series.
///
/// Returns NaN when either series has zero variance or fewer than two
/// points, matching what a dataframe `corr()` reports for those cells.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return f64::NAN;
    }
    let mx = xs[..n].iter().sum::<f64>() / n as f64;
    let my = ys[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    let denom = (vx * vy).sqrt();
    if denom == 0.0 {
        f64::NAN
    } else {
        cov / denom
    }
}

/// Fixed-decimal rendering with locale thousands separators, used for every
/// numeric cell handed to the chart tables (e.g. `1,234.57`).
///
/// Non-finite values render as `NaN` so degenerate correlation cells stay
/// visible instead of turning into a bogus number.
pub fn format_number(n: f64, decimals: usize) -> String {
    if !n.is_finite() {
        return "NaN".to_string();
    }
    let s = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };
    let mut out = int_part
        .parse::<i64>()
        .unwrap_or(0)
        .to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    if n.is_sign_negative() && n != 0.0 {
        out.insert(0, '-');
    }
    out
}

/// Thousands-separated integer rendering for console counts
/// (e.g. `29,531 rows loaded`).
pub fn format_int<T: ToFormattedString>(n: T) -> String {
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_with_separators() {
        assert_eq!(parse_f64_safe(Some("1,234.5")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("  42 ")), Some(42.0));
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parses_both_date_layouts() {
        let iso = parse_date_safe(Some("2019-03-01")).unwrap();
        let dmy = parse_date_safe(Some("01-03-2019")).unwrap();
        assert_eq!(iso, dmy);
        assert_eq!(parse_date_safe(Some("not a date")), None);
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[10.0, 20.0]), Some(15.0));
    }

    #[test]
    fn pearson_perfect_and_degenerate() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&xs, &ys) - 1.0).abs() < 1e-12);
        let flat = [5.0, 5.0, 5.0, 5.0];
        assert!(pearson(&xs, &flat).is_nan());
    }

    #[test]
    fn formats_numbers() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.5, 1), "-12.5");
        assert_eq!(format_number(f64::NAN, 2), "NaN");
        assert_eq!(format_int(29531i64), "29,531");
    }
}
