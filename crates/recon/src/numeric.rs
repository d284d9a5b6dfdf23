//! Best-effort numeric coercion for spreadsheet values.
//!
//! Source cells come from hand-filled sheets: currency symbols,
//! thousands separators, accountant negatives, and locale decimal commas
//! all occur. Coercion failure is never an error — a value that does not
//! parse is simply "not numeric" and the caller decides what absence
//! means.

/// Parse a spreadsheet number string:
/// - strip `$`, whitespace
/// - `(123.45)` → `-123.45`
/// - `1,234.56` → `1234.56` (comma as thousands separator)
/// - `12,5` → `12.5` (single comma with 1–2 trailing digits and no dot
///   is a decimal comma)
/// - returns `None` if non-numeric characters remain after stripping
pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Parenthesized negatives: (123.45) → -123.45
    let (is_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| *c != '$' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = normalize_commas(&cleaned)?;

    // Only digits, '.', and a leading sign may remain
    for (i, c) in normalized.chars().enumerate() {
        match c {
            '0'..='9' | '.' => {}
            '-' | '+' if i == 0 && !is_negative => {}
            _ => return None,
        }
    }

    let value: f64 = normalized.parse().ok()?;
    Some(if is_negative { -value } else { value })
}

/// Decide what the commas in `s` mean and remove or convert them.
///
/// With a dot present, commas can only be thousands separators. Without
/// one, a single comma followed by one or two digits is a decimal comma;
/// anything else must group digits in threes or the value is not a
/// number.
fn normalize_commas(s: &str) -> Option<String> {
    if !s.contains(',') {
        return Some(s.to_string());
    }

    if s.contains('.') {
        return Some(s.replace(',', ""));
    }

    let groups: Vec<&str> = s.split(',').collect();
    if groups.len() == 2 && (1..=2).contains(&groups[1].len()) {
        return Some(format!("{}.{}", groups[0], groups[1]));
    }

    if groups[1..].iter().all(|g| g.len() == 3) {
        return Some(s.replace(',', ""));
    }

    None
}
