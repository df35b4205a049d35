use email_address::EmailAddress;

use crate::validation::{check_trimmed, narrow_byte_len, check_control_leading_trailing};

pub const MIN_USERNAME_BYTES: usize = 2;
pub const MAX_NAME_CHARS: usize = 400;

/// characters that may never appear in a username
pub const USERNAME_FORBIDDEN: [char; 10] = ['<', '>', '"', '\'', '%', ';', '(', ')', '&', '\\'];

/// checks that a username is well formed: none of [`USERNAME_FORBIDDEN`] or a
/// `../` sequence, at least [`MIN_USERNAME_BYTES`] narrowed bytes and no
/// leading or trailing whitespace.
///
/// an empty username is considered compliant since there is nothing to lock
pub fn username_compliant<G>(given: G) -> bool
where
    G: AsRef<str>
{
    let given_ref = given.as_ref();

    if given_ref.is_empty() {
        return true;
    }

    if given_ref.contains(USERNAME_FORBIDDEN) || given_ref.contains("../") {
        return false;
    }

    narrow_byte_len(given_ref) >= MIN_USERNAME_BYTES && check_trimmed(given_ref)
}

/// username rules enforced when a record is stored. same as
/// [`username_compliant`] except that an empty value is rejected
pub fn username_valid<G>(given: G) -> bool
where
    G: AsRef<str>
{
    !given.as_ref().is_empty() && username_compliant(given)
}

pub fn name_valid<G>(given: G) -> bool
where
    G: AsRef<str>
{
    let given_ref = given.as_ref();

    !given_ref.is_empty() && check_control_leading_trailing(given_ref, Some(MAX_NAME_CHARS))
}

pub fn email_valid<G>(given: G) -> bool
where
    G: AsRef<str>
{
    EmailAddress::is_valid(given.as_ref())
}
