/// Formats an amount with Indian digit grouping ("12,34,567.5")
pub fn format_inr(amount: f64) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    let negative = rounded < 0.0;
    let abs = rounded.abs();

    let whole = abs.trunc() as u64;
    let cents = ((abs - abs.trunc()) * 100.0).round() as u64;

    let digits = whole.to_string();
    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut parts: Vec<String> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (left, right) = rest.split_at(rest.len() - 2);
            parts.push(right.to_string());
            rest = left;
        }
        if !rest.is_empty() {
            parts.push(rest.to_string());
        }
        parts.reverse();
        format!("{},{}", parts.join(","), tail)
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if cents > 0 {
        let frac = format!("{:02}", cents);
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out
}

/// Replaces runs of whitespace with underscores for download filenames
pub fn filename_safe(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_inr_grouping() {
        assert_eq!(format_inr(0.0), "0");
        assert_eq!(format_inr(999.0), "999");
        assert_eq!(format_inr(1000.0), "1,000");
        assert_eq!(format_inr(100000.0), "1,00,000");
        assert_eq!(format_inr(1234567.0), "12,34,567");
        assert_eq!(format_inr(1500.5), "1,500.5");
        assert_eq!(format_inr(25.75), "25.75");
    }

    #[test]
    fn test_filename_safe() {
        assert_eq!(filename_safe("Jane  Q Doe"), "Jane_Q_Doe");
        assert_eq!(filename_safe("Solo"), "Solo");
    }
}
