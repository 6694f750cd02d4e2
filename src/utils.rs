/// Formats `value` with `decimals` fraction digits and `,` thousands separators.
/// Non-finite values render as `inf`, `-inf` or `nan`.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // "-0.00" reads badly in a report
    let is_negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');

    let mut out = String::new();
    if is_negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// `$1,234.56`, with the sign after the dollar sign (`$-1,234.56`).
pub fn format_currency(value: f64) -> String {
    format!("${}", format_grouped(value, 2))
}

/// Whole-dollar form used for thresholds (`$50,000`).
pub fn format_currency_whole(value: f64) -> String {
    format!("${}", format_grouped(value, 0))
}

/// One decimal place with grouping (`13.6%`, `inf%`).
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_grouped(value, 1))
}
