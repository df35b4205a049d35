pub type UserId = i64;
pub type GroupId = i64;

/// parses a user id from its string form, rejecting anything that is not a
/// positive integer
pub fn user_id_from_str(given: &str) -> Option<UserId> {
    match given.trim().parse::<UserId>() {
        Ok(id) if id > 0 => Some(id),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn user_id_parsing() {
        assert_eq!(user_id_from_str("42"), Some(42));
        assert_eq!(user_id_from_str(" 7 "), Some(7));
        assert_eq!(user_id_from_str("0"), None);
        assert_eq!(user_id_from_str("-3"), None);
        assert_eq!(user_id_from_str("bob"), None);
    }
}
