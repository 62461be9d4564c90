use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

pub const DEFAULT_SUFFIX_LENGTH: usize = 5;

/// Returns `n` characters from `[a-z0-9]`, safe for DNS labels.
pub fn random_chars(n: usize) -> Result<String, getrandom::Error> {
    let mut bytes = vec![0u8; n];
    getrandom::getrandom(&mut bytes)?;

    // n bytes encode to at least n non-padding characters
    let suffix = STANDARD
        .encode(&bytes)
        .chars()
        .filter(|c| *c != '=' && *c != '\n')
        .map(|c| match c {
            '+' | '/' | '_' | '-' => '0',
            c => c.to_ascii_lowercase(),
        })
        .take(n)
        .collect();
    Ok(suffix)
}

pub fn random_suffix() -> Result<String, getrandom::Error> {
    random_chars(DEFAULT_SUFFIX_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_dns_safe(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    }

    #[test]
    fn test_random_suffix_is_five_dns_safe_chars() {
        for _ in 0..100 {
            let suffix = random_suffix().unwrap();
            assert_eq!(suffix.len(), 5);
            assert!(is_dns_safe(&suffix), "unexpected characters in {suffix}");
        }
    }

    #[test]
    fn test_random_chars_honours_length() {
        assert_eq!(random_chars(0).unwrap(), "");
        assert_eq!(random_chars(1).unwrap().len(), 1);

        let long = random_chars(63).unwrap();
        assert_eq!(long.len(), 63);
        assert!(is_dns_safe(&long));
    }
}
