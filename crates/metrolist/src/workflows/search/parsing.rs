/// Base-10 integer prefix of `raw`, the way a browser's `parseInt(raw, 10)` reads it.
///
/// Leading whitespace and a sign are accepted; parsing stops at the first
/// non-digit. Returns `None` when no digits are present.
pub(crate) fn parse_leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(index, _)| index)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let magnitude = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::parse_leading_integer;

    #[test]
    fn reads_integer_prefixes() {
        assert_eq!(parse_leading_integer("40"), Some(40));
        assert_eq!(parse_leading_integer(" 2500.75"), Some(2500));
        assert_eq!(parse_leading_integer("-3"), Some(-3));
        assert_eq!(parse_leading_integer("3abc"), Some(3));
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert_eq!(parse_leading_integer(""), None);
        assert_eq!(parse_leading_integer("abc"), None);
        assert_eq!(parse_leading_integer("-"), None);
        assert_eq!(parse_leading_integer("true"), None);
    }
}
