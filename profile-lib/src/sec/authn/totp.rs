use std::str::FromStr;

use serde::{Serialize, Deserialize};

pub const DEFAULT_DIGITS: u32 = 6;
pub const DEFAULT_STEP: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algo {
    SHA1,
    SHA256,
    SHA512,
}

impl Algo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algo::SHA1 => "SHA1",
            Algo::SHA256 => "SHA256",
            Algo::SHA512 => "SHA512",
        }
    }
}

impl std::default::Default for Algo {
    fn default() -> Self {
        Algo::SHA1
    }
}

impl std::fmt::Display for Algo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct FromStrError;

impl FromStr for Algo {
    type Err = FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SHA1" => Ok(Algo::SHA1),
            "SHA256" => Ok(Algo::SHA256),
            "SHA512" => Ok(Algo::SHA512),
            _ => Err(FromStrError),
        }
    }
}

pub fn digits_valid(given: &u32) -> bool {
    (6..=8).contains(given)
}

pub fn step_valid(given: &u64) -> bool {
    *given > 0 && *given <= 120
}

/// a submitted security code must be exactly the configured number of ascii
/// digits
pub fn code_valid<G>(given: G, digits: u32) -> bool
where
    G: AsRef<str>
{
    let given_ref = given.as_ref();

    given_ref.len() == digits as usize && given_ref.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn algo_strings() {
        for algo in [Algo::SHA1, Algo::SHA256, Algo::SHA512] {
            assert_eq!(Algo::from_str(algo.as_str()).ok(), Some(algo));
        }

        assert!(Algo::from_str("MD5").is_err());
    }

    #[test]
    fn settings_validation() {
        assert!(digits_valid(&6));
        assert!(!digits_valid(&4));
        assert!(digits_valid(&8));
        assert!(!digits_valid(&9));
        assert!(step_valid(&30));
        assert!(!step_valid(&0));
        assert!(!step_valid(&121));
    }

    #[test]
    fn code_validation() {
        assert!(code_valid("123456", 6));
        assert!(!code_valid("12345", 6));
        assert!(!code_valid("12345a", 6));
        assert!(!code_valid(" 123456", 6));
    }
}
