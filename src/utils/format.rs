/// Formats an amount of yen with comma thousands separators, e.g. `-1,234,567`.
pub fn yen(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        grouped.push('-');
    }
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Like [`yen`], but non-negative amounts carry a leading `+`.
pub fn signed_yen(amount: i64) -> String {
    if amount >= 0 {
        format!("+{}", yen(amount))
    } else {
        yen(amount)
    }
}

pub fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(yen(0), "0");
        assert_eq!(yen(999), "999");
        assert_eq!(yen(1000), "1,000");
        assert_eq!(yen(1234567), "1,234,567");
        assert_eq!(yen(-45000), "-45,000");
        assert_eq!(yen(i64::MIN), "-9,223,372,036,854,775,808");
    }

    #[test]
    fn sign_follows_balance() {
        assert_eq!(signed_yen(500), "+500");
        assert_eq!(signed_yen(0), "+0");
        assert_eq!(signed_yen(-1000), "-1,000");
        assert_eq!(signed_yen(12500), "+12,500");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_for_log("彦一です", 2), "彦一... (truncated)");
        assert_eq!(truncate_for_log("short", 10), "short");
    }
}
