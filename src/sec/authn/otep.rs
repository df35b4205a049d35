use rand::Rng;

pub use profile_lib::sec::authn::otep::{DEFAULT_COUNT, CODE_DIGITS};

/// creates a fresh set of one time emergency passwords
pub fn create_codes(count: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    let mut rtn = Vec::with_capacity(count);

    while rtn.len() < count {
        let code: String = (0..CODE_DIGITS)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();

        // codes are unique within a set
        if !rtn.contains(&code) {
            rtn.push(code);
        }
    }

    rtn
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn creates_requested_count() {
        let codes = create_codes(DEFAULT_COUNT);

        assert_eq!(codes.len(), DEFAULT_COUNT);

        for code in &codes {
            assert!(profile_lib::sec::authn::otep::code_valid(code), "invalid code {:?}", code);
        }
    }

    #[test]
    fn zero_count_is_empty() {
        assert!(create_codes(0).is_empty());
    }
}
