/// characters stripped by a classic `trim`. narrower than
/// [`char::is_whitespace`] on purpose so that unicode spacing is left alone
pub const TRIM_CHARS: [char; 6] = [' ', '\t', '\n', '\r', '\0', '\u{0B}'];

pub fn is_trim_char(ch: char) -> bool {
    TRIM_CHARS.contains(&ch)
}

/// true if the given string has no leading or trailing [`TRIM_CHARS`]
pub fn check_trimmed<G>(given: G) -> bool
where
    G: AsRef<str>
{
    let given_ref = given.as_ref();

    given_ref.trim_matches(is_trim_char).len() == given_ref.len()
}

/// number of bytes the string occupies once every character is narrowed to a
/// single byte, characters outside latin-1 included
pub fn narrow_byte_len<G>(given: G) -> usize
where
    G: AsRef<str>
{
    given.as_ref().chars().count()
}

pub fn check_control_leading_trailing<G>(
    given: G,
    max_chars: Option<usize>
) -> bool
where
    G: AsRef<str>
{
    let given_ref = given.as_ref();
    let mut iter = given_ref.chars();
    let mut char_count = 0;

    if let Some(ch) = iter.next() {
        char_count += 1;

        if ch.is_control() || ch.is_whitespace() {
            return false
        }
    }

    if let Some(ch) = iter.next_back() {
        char_count += 1;

        if ch.is_control() || ch.is_whitespace() {
            return false
        }
    }

    for ch in iter {
        if ch.is_control() {
            return false;
        }

        char_count += 1;
    }

    match max_chars {
        Some(max) => char_count <= max,
        None => true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    pub fn check_trimmed_chars() {
        assert!(check_trimmed("admin"));
        assert!(check_trimmed(""));
        assert!(check_trimmed("two words"));

        for ch in TRIM_CHARS {
            let leading = format!("{ch}admin");
            let trailing = format!("admin{ch}");

            assert!(!check_trimmed(&leading), "leading {:?}", ch);
            assert!(!check_trimmed(&trailing), "trailing {:?}", ch);
        }

        // non breaking space is not part of the trim set
        assert!(check_trimmed("\u{00A0}admin"));
    }

    #[test]
    pub fn narrow_byte_len_counts_chars() {
        assert_eq!(narrow_byte_len("ab"), 2);
        assert_eq!(narrow_byte_len("é"), 1);
        assert_eq!(narrow_byte_len("日本"), 2);
        assert_eq!(narrow_byte_len("😕"), 1);
    }

    #[test]
    pub fn check_control_leading_trailing_whitespace_chars() {
        assert!(!check_control_leading_trailing(" test", None), "leading whitespace characters");
        assert!(!check_control_leading_trailing("test ", None), "trailing whitespace characters");
        assert!(check_control_leading_trailing("test test", None), "inner whitespace characters");
    }

    #[test]
    pub fn check_control_leading_trailing_control_chars() {
        assert!(!check_control_leading_trailing("test\u{0000}", None), "trailing control characters");
        assert!(!check_control_leading_trailing("\u{0000}test", None), "leading control characters");
        assert!(!check_control_leading_trailing("test\u{0000}test", None), "contains control characters");
    }

    #[test]
    pub fn check_control_leading_trailing_max_length() {
        let k = crate::string_to_len(27);

        assert!(check_control_leading_trailing(&k, Some(27)));
        assert!(!check_control_leading_trailing(&k, Some(26)), "max 26 total 27");
    }
}
