//! Composite-key secondary index over contract identifiers
use super::error::ContractError;
use sled::{IVec, Tree};

/// Index every contract is registered under at creation.
pub const ALL_CONTRACTS_INDEX: &str = "allContr";

const SEPARATOR: u8 = 0x00;

/// Maximum number of leading parts a listing may filter on.
pub const MAX_FILTER_PARTS: usize = 3;

fn check_part(part: &str) -> Result<(), ContractError> {
    if part.as_bytes().contains(&SEPARATOR) {
        return Err(ContractError::InvalidKeyPart(part.to_string()));
    }
    Ok(())
}

/// Encodes `name` and `parts` as `\0name\0part1\0part2\0...`.
///
/// With fewer parts than a stored key has, the result is a prefix of that
/// key, which is what partial lookups scan on.
pub fn composite_key<S: AsRef<str>>(name: &str, parts: &[S]) -> Result<Vec<u8>, ContractError> {
    check_part(name)?;
    let mut key = vec![SEPARATOR];
    key.extend_from_slice(name.as_bytes());
    key.push(SEPARATOR);
    for part in parts {
        let part = part.as_ref();
        check_part(part)?;
        key.extend_from_slice(part.as_bytes());
        key.push(SEPARATOR);
    }
    Ok(key)
}

/// Inverse of [`composite_key`]: returns the index name and its parts.
pub fn split_composite_key(key: &[u8]) -> Option<(String, Vec<String>)> {
    let body = key.strip_prefix(&[SEPARATOR])?.strip_suffix(&[SEPARATOR])?;
    let mut fields = body
        .split(|b| *b == SEPARATOR)
        .map(|f| String::from_utf8(f.to_vec()).ok());

    let name = fields.next()??;
    let parts = fields.collect::<Option<Vec<_>>>()?;
    Some((name, parts))
}

pub struct IndexManager {
    tree: Tree,
}

impl IndexManager {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }

    /// Stores an empty marker under the composite key of `name` and `parts`.
    pub fn register<S: AsRef<str>>(&self, name: &str, parts: &[S]) -> Result<(), ContractError> {
        let key = composite_key(name, parts)?;
        self.tree.insert(key, IVec::default())?;
        Ok(())
    }

    /// Trailing key part of every entry under `name` whose leading parts
    /// equal `filters`, in key order.
    pub fn list_ids<S: AsRef<str>>(
        &self,
        name: &str,
        filters: &[S],
    ) -> Result<Vec<String>, ContractError> {
        if filters.len() > MAX_FILTER_PARTS {
            return Err(ContractError::ArgumentCount {
                expected: format!("at most {MAX_FILTER_PARTS} filter parts"),
                actual: filters.len(),
            });
        }
        let prefix = composite_key(name, filters)?;

        let mut ids = Vec::new();
        for entry in self.tree.scan_prefix(prefix) {
            let (key, _) = entry?;
            let Some((_, mut parts)) = split_composite_key(&key) else {
                tracing::warn!(index = name, "skipping undecodable composite key");
                continue;
            };
            if let Some(id) = parts.pop() {
                ids.push(id);
            }
        }

        if ids.is_empty() {
            return Err(ContractError::IndexNotFound(name.to_string()));
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_layout() {
        let key = composite_key("allContr", &["allContr", "D1"]).unwrap();

        assert_eq!(key, b"\0allContr\0allContr\0D1\0".to_vec());
        assert_eq!(
            split_composite_key(&key),
            Some((
                "allContr".to_string(),
                vec!["allContr".to_string(), "D1".to_string()]
            ))
        );
    }

    #[test]
    fn partial_key_is_prefix_of_full_key() {
        let full = composite_key("byCcy", &["RUB", "D7"]).unwrap();
        let partial = composite_key("byCcy", &["RUB"]).unwrap();
        let other = composite_key("byCcy", &["RU"]).unwrap();

        assert!(full.starts_with(&partial));
        assert!(!full.starts_with(&other));
    }

    #[test]
    fn nul_bytes_are_rejected() {
        assert!(matches!(
            composite_key("idx", &["a\0b"]),
            Err(ContractError::InvalidKeyPart(_))
        ));
        assert!(composite_key("i\0dx", &[] as &[&str]).is_err());
    }

    #[test]
    fn malformed_keys_do_not_split() {
        assert_eq!(split_composite_key(b"plain"), None);
        assert_eq!(split_composite_key(b"\0name"), None);
    }
}
