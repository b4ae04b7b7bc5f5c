//! Utility functions for argument handling and transaction ids
use super::error::ContractError;
use uuid7::uuid7;

/// Trims surrounding whitespace from every incoming argument.
pub fn trim_args<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter().map(|a| a.as_ref().trim().to_string()).collect()
}

pub fn non_empty<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ContractError> {
    if value.is_empty() {
        return Err(ContractError::EmptyField(field));
    }
    Ok(value)
}

/// Keeps only the leading `dd.mm.yyyy` part of a date-time string.
pub fn date_part(value: &str) -> &str {
    match value.char_indices().nth(10) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

// a fresh nonce hashed together with the key it was issued for
pub fn new_transaction_id(key: &str) -> String {
    let mut seed = uuid7().as_bytes().to_vec();
    seed.extend_from_slice(key.as_bytes());
    sha256::digest(&seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_part_drops_time_of_day() {
        assert_eq!(date_part("01.02.2024 10:30:00"), "01.02.2024");
        assert_eq!(date_part("01.02.2024"), "01.02.2024");
        assert_eq!(date_part("1.2.24"), "1.2.24");
    }

    #[test]
    fn transaction_ids_are_unique_hex_digests() {
        let a = new_transaction_id("D1");
        let b = new_transaction_id("D1");

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn trim_args_strips_whitespace() {
        assert_eq!(trim_args(&[" a ", "\tb\n"]), vec!["a", "b"]);
    }
}
