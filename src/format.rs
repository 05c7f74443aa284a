//! Persian-script number formatting for report output.

const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];

/// Arabic thousands separator, as used on fawiki.
const THOUSANDS_SEPARATOR: char = '٬';

/// Replaces every ASCII digit with its Persian glyph. All other characters
/// pass through unchanged.
pub fn to_persian_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '0'..='9' => PERSIAN_DIGITS[(c as usize) - ('0' as usize)],
            _ => c,
        })
        .collect()
}

/// Formats a number with thousands grouping in Persian digits,
/// e.g. 427514 becomes ۴۲۷٬۵۱۴.
pub fn format_fa_number(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(THOUSANDS_SEPARATOR);
        }
        grouped.push(c);
    }
    to_persian_digits(&grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_persian_digits() {
        assert_eq!(to_persian_digits("0123456789"), "۰۱۲۳۴۵۶۷۸۹");
        assert_eq!(to_persian_digits("رده 12 (بخش)"), "رده ۱۲ (بخش)");
        assert_eq!(to_persian_digits(""), "");
        assert_eq!(to_persian_digits("no digits"), "no digits");
    }

    #[test]
    fn test_format_fa_number() {
        assert_eq!(format_fa_number(0), "۰");
        assert_eq!(format_fa_number(42), "۴۲");
        assert_eq!(format_fa_number(999), "۹۹۹");
        assert_eq!(format_fa_number(1000), "۱٬۰۰۰");
        assert_eq!(format_fa_number(427514), "۴۲۷٬۵۱۴");
        assert_eq!(format_fa_number(1234567), "۱٬۲۳۴٬۵۶۷");
    }
}
