/// number of emergency passwords issued when a user has none left
pub const DEFAULT_COUNT: usize = 10;

/// digits in a single emergency password
pub const CODE_DIGITS: usize = 16;

pub fn code_valid<G>(given: G) -> bool
where
    G: AsRef<str>
{
    let given_ref = given.as_ref();

    given_ref.len() == CODE_DIGITS && given_ref.bytes().all(|b| b.is_ascii_digit())
}
