fn group_thousands(digits: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let with_commas = group_thousands(int_part);

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Whole dollars with separators: $12,345
pub fn money_whole(val: i64) -> String {
    let with_commas = group_thousands(&val.unsigned_abs().to_string());
    if val < 0 {
        format!("-${with_commas}")
    } else {
        format!("${with_commas}")
    }
}

/// Integer with thousands separators: 1,234,567
pub fn number<T: Into<i128>>(val: T) -> String {
    let val: i128 = val.into();
    let with_commas = group_thousands(&val.unsigned_abs().to_string());
    if val < 0 {
        format!("-{with_commas}")
    } else {
        with_commas
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "$1,234.56");
        assert_eq!(money(-500.00), "-$500.00");
        assert_eq!(money(0.0), "$0.00");
        assert_eq!(money(1000000.99), "$1,000,000.99");
        assert_eq!(money(42.10), "$42.10");
    }

    #[test]
    fn test_money_whole() {
        assert_eq!(money_whole(16), "$16");
        assert_eq!(money_whole(1234567), "$1,234,567");
        assert_eq!(money_whole(-2500), "-$2,500");
    }

    #[test]
    fn test_number() {
        assert_eq!(number(0u64), "0");
        assert_eq!(number(999u32), "999");
        assert_eq!(number(1000u64), "1,000");
        assert_eq!(number(-1234567i64), "-1,234,567");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
