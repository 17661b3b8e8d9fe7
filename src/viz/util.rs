//! Number formatting and locale mapping for labels, tooltips and axes.

use num_format::{Locale, ToFormattedString};

/// Map a locale tag to a `num_format::Locale` and its decimal separator.
///
/// Supported tags (case-insensitive): `en`, `us`, `en_US`, `de`, `de_DE`, `german`,
/// `fr`, `es`, `it`, `pt`, `nl`. Anything else formats as English.
pub fn map_locale(tag: &str) -> (&'static Locale, char) {
    match tag.to_lowercase().replace('-', "_").as_str() {
        "de" | "de_de" | "german" => (&Locale::de, ','),
        "fr" | "fr_fr" => (&Locale::fr, ','),
        "es" | "es_es" => (&Locale::es, ','),
        "it" | "it_it" => (&Locale::it, ','),
        "pt" | "pt_pt" | "pt_br" => (&Locale::pt, ','),
        "nl" | "nl_nl" => (&Locale::nl, ','),
        _ => (&Locale::en, '.'),
    }
}

fn with_separator(s: String, sep: char) -> String {
    if sep == '.' { s } else { s.replace('.', &sep.to_string()) }
}

/// Tooltip/label formatting: integers get thousands separators; other values
/// collapse to `M`/`K` above 1e6/1e3 and to two decimals below.
pub fn format_value(v: f64, locale: &str) -> String {
    if !v.is_finite() {
        return String::new();
    }
    let (loc, sep) = map_locale(locale);
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        return (v as i64).to_formatted_string(loc);
    }
    let a = v.abs();
    if a >= 1.0e6 {
        with_separator(format!("{:.1}M", v / 1.0e6), sep)
    } else if a >= 1.0e3 {
        with_separator(format!("{:.1}K", v / 1.0e3), sep)
    } else {
        with_separator(format!("{:.2}", v), sep)
    }
}

fn trim_decimals(s: String) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Compact axis tick label: `2K`, `1.5M`, `0.25`.
pub fn format_tick(v: f64) -> String {
    if !v.is_finite() {
        return String::new();
    }
    let a = v.abs();
    let s = if a >= 1.0e6 {
        format!("{}M", trim_decimals(format!("{:.1}", v / 1.0e6)))
    } else if a >= 1.0e3 {
        format!("{}K", trim_decimals(format!("{:.1}", v / 1.0e3)))
    } else {
        trim_decimals(format!("{:.2}", v))
    };
    if s == "-0" { "0".to_string() } else { s }
}

/// Percentage with one decimal, e.g. `60.0%`.
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Plain number for data exports: integers without `.0`, other values in shortest form.
pub fn format_plain(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_get_separators() {
        assert_eq!(format_value(1234567.0, "en"), "1,234,567");
        assert_eq!(format_value(1234567.0, "de"), "1.234.567");
    }

    #[test]
    fn fractions_collapse_by_magnitude() {
        assert_eq!(format_value(2_500_000.5, "en"), "2.5M");
        assert_eq!(format_value(1500.5, "en"), "1.5K");
        assert_eq!(format_value(3.14159, "en"), "3.14");
        assert_eq!(format_value(3.14159, "de"), "3,14");
    }

    #[test]
    fn ticks_are_compact() {
        assert_eq!(format_tick(2000.0), "2K");
        assert_eq!(format_tick(0.8), "0.8");
        assert_eq!(format_tick(8.0), "8");
        assert_eq!(format_tick(1_500_000.0), "1.5M");
    }

    #[test]
    fn plain_numbers_drop_trailing_zero() {
        assert_eq!(format_plain(60.0), "60");
        assert_eq!(format_plain(2.5), "2.5");
        assert_eq!(format_percent(0.6), "60.0%");
    }
}
