use std::time::Duration;

/// Parses a duration string such as `30s`, `2m` or `1h30m`.
///
/// The string is a sequence of integers, each followed by one of `s`, `m`, `h` or `d`
/// for seconds, minutes, hours and days respectively.
///
/// # Returns
/// The parsed [`Duration`], or `None` if the input is empty, malformed, or overflows.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cairn_utils::time::parse_duration;
///
/// assert_eq!(parse_duration("1m30s"), Some(Duration::from_secs(90)));
/// assert_eq!(parse_duration("soon"), None);
/// ```
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    let mut chars = input.chars().peekable();

    while chars.peek().is_some() {
        let mut number_str = String::new();
        while let Some(c) = chars.next_if(char::is_ascii_digit) {
            number_str.push(c);
        }

        if number_str.is_empty() {
            return None;
        }

        let number: u64 = number_str.parse().ok()?;
        let multiplier = match chars.next()? {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            _ => return None,
        };

        total = total.checked_add(number.checked_mul(multiplier)?)?;
    }

    Some(Duration::from_secs(total))
}
