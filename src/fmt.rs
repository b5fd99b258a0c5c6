fn group_thousands(int_part: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format a float with thousands separators and two decimals: -1,234.56
pub fn amount(val: f64) -> String {
    if val.is_nan() {
        return "NaN".to_string();
    }
    if val.is_infinite() {
        return if val < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    let fixed = format!("{:.2}", val.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if val < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{}.{dec_part}", group_thousands(int_part))
}

/// `amount`, or an em dash when the statistic is undefined.
pub fn opt_amount(val: Option<f64>) -> String {
    val.map(amount).unwrap_or_else(|| "\u{2014}".to_string())
}

/// Integer with thousands separators: 1,056,320
pub fn number(val: i64) -> String {
    let grouped = group_thousands(&val.unsigned_abs().to_string());
    if val < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn percent(val: f64) -> String {
    format!("{val:.2}%")
}

/// Compact axis label: 1.5k, 2M.
pub fn compact(val: f64) -> String {
    let abs = val.abs();
    let sign = if val < 0.0 { "-" } else { "" };
    let (scaled, suffix) = if abs >= 1_000_000.0 {
        (abs / 1_000_000.0, "M")
    } else if abs >= 1000.0 {
        (abs / 1000.0, "k")
    } else {
        return format!("{sign}{}", abs.round() as u64);
    };
    if scaled == scaled.floor() {
        format!("{sign}{}{suffix}", scaled as u64)
    } else {
        format!("{sign}{scaled:.1}{suffix}")
    }
}
