//! Text normalization shared by the listing parser and the metadata client

/// Title-cases a string
///
/// The first letter of every word is uppercased and all following letters
/// are lowercased. A word starts after any character that is neither
/// alphanumeric nor an apostrophe, so `"it's a wonderful life"` becomes
/// `"It's A Wonderful Life"`.
///
/// This differs from Python's `str.title()`, which also capitalizes after
/// apostrophes and digits (`"It'S"`, `"2Nd"`). Cache keys and stored titles
/// written by such a tool will not match the ones produced here.
pub fn title_case(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut in_word = false;

    for c in input.chars() {
        if c.is_alphabetic() {
            if in_word {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            result.push(c);
            in_word = c.is_alphanumeric() || c == '\'' || c == '\u{2019}';
        }
    }

    result
}

/// Parses a currency amount such as `"$1,234,567"` into an integer
///
/// Surrounding whitespace, one leading `$` and all `,` separators are
/// stripped. Returns `None` when what remains is not a non-negative integer.
pub fn parse_currency(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    let digits: String = trimmed
        .strip_prefix('$')
        .unwrap_or(trimmed)
        .chars()
        .filter(|&c| c != ',')
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}
