//! Number formatting for metric tiles and chart labels.

/// Format `value` with `decimals` fractional digits and `,` thousands
/// separators, e.g. `1234567.891` → `1,234,567.9` for one decimal.
pub fn thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && fixed.chars().any(|c| c != '0' && c != '.');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Integer count with separators.
pub fn count(n: usize) -> String {
    thousands(n as f64, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(thousands(1234567.891, 1), "1,234,567.9");
        assert_eq!(thousands(322966.749, 1), "322,966.7");
        assert_eq!(thousands(999.0, 2), "999.00");
        assert_eq!(thousands(1000.0, 0), "1,000");
        assert_eq!(thousands(0.0, 1), "0.0");
    }

    #[test]
    fn keeps_sign() {
        assert_eq!(thousands(-15379.369, 1), "-15,379.4");
        assert_eq!(thousands(-0.01, 1), "0.0");
    }

    #[test]
    fn counts() {
        assert_eq!(count(1000), "1,000");
        assert_eq!(count(42), "42");
    }
}
