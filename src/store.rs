//! sled binding for contract records, their version history and the index
use super::config::DuplicatePolicy;
use super::contract::ContractRecord;
use super::error::ContractError;
use super::types::TimeStamp;
use super::utils::new_transaction_id;
use chrono::Utc;
use minicbor::bytes::ByteVec;
use sled::transaction::{ConflictableTransactionError, abort};
use sled::{Db, IVec, Transactional, Tree};
use std::sync::Arc;

const CONTRACTS_TREE: &str = "contracts";
const VERSIONS_TREE: &str = "versions";
const INDEX_TREE: &str = "index";

/// One write to a contract key, as kept in the `versions` tree.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct VersionEntry {
    #[n(0)]
    pub tx_id: String,
    #[n(1)]
    pub timestamp: TimeStamp<Utc>,
    #[n(2)]
    pub payload: Option<ByteVec>, // absent for a delete
    #[n(3)]
    pub is_delete: bool,
}

pub struct ContractStore {
    instance: Arc<Db>,
    contracts: Tree,
    versions: Tree,
    index: Tree,
}

// `<id>\0<version id>` so a prefix scan yields one key's versions in order
fn version_prefix(contract_id: &str) -> Vec<u8> {
    let mut key = contract_id.as_bytes().to_vec();
    key.push(0x00);
    key
}

fn version_key(contract_id: &str, version_id: u64) -> Vec<u8> {
    let mut key = version_prefix(contract_id);
    key.extend_from_slice(&version_id.to_be_bytes());
    key
}

fn abort_with<T>(e: ContractError) -> Result<T, ConflictableTransactionError<ContractError>> {
    abort(e)
}

impl ContractStore {
    pub fn open(instance: Arc<Db>) -> Result<Self, ContractError> {
        let contracts = instance.open_tree(CONTRACTS_TREE)?;
        let versions = instance.open_tree(VERSIONS_TREE)?;
        let index = instance.open_tree(INDEX_TREE)?;
        Ok(Self {
            instance,
            contracts,
            versions,
            index,
        })
    }

    pub fn index_tree(&self) -> Tree {
        self.index.clone()
    }

    pub fn get_raw(&self, contract_id: &str) -> Result<Option<IVec>, ContractError> {
        Ok(self.contracts.get(contract_id.as_bytes())?)
    }

    /// Writes a new record, its first version and the given index key in one
    /// transaction.
    pub fn insert(
        &self,
        record: &ContractRecord,
        index_key: &[u8],
        policy: DuplicatePolicy,
    ) -> Result<(), ContractError> {
        let contract_id = record.deal_num.as_str();
        let (encoded, version) =
            encode_write(record, &new_transaction_id(contract_id), &TimeStamp::new())?;

        (&self.contracts, &self.versions, &self.index)
            .transaction(|(contracts, versions, index)| {
                if policy == DuplicatePolicy::Reject
                    && contracts.get(contract_id.as_bytes())?.is_some()
                {
                    return abort_with(ContractError::AlreadyExists(contract_id.to_string()));
                }
                let version_key = version_key(contract_id, self.instance.generate_id()?);
                contracts.insert(contract_id.as_bytes(), encoded.as_slice())?;
                versions.insert(version_key, version.as_slice())?;
                index.insert(index_key, IVec::default())?;
                Ok(())
            })
            .map_err(ContractError::from)
    }

    /// Loads the record, applies `mutate` and writes the result back with a
    /// new version, all inside one sled transaction.
    ///
    /// sled may run the closure more than once when transactions conflict;
    /// each run starts from the committed record. An error from `mutate`
    /// aborts the transaction and nothing is written.
    pub fn update<F>(&self, contract_id: &str, mutate: F) -> Result<ContractRecord, ContractError>
    where
        F: Fn(&mut ContractRecord) -> Result<(), ContractError>,
    {
        let tx_id = new_transaction_id(contract_id);
        let timestamp = TimeStamp::new();

        (&self.contracts, &self.versions)
            .transaction(|(contracts, versions)| {
                let Some(bytes) = contracts.get(contract_id.as_bytes())? else {
                    return abort_with(ContractError::NotFound(contract_id.to_string()));
                };
                let mut record = match ContractRecord::decode(&bytes) {
                    Ok(record) => record,
                    Err(e) => return abort_with(e),
                };
                if let Err(e) = mutate(&mut record) {
                    return abort_with(e);
                }

                let (encoded, version) = match encode_write(&record, &tx_id, &timestamp) {
                    Ok(pair) => pair,
                    Err(e) => return abort_with(e),
                };
                // drawn inside the transaction so version order follows commit order
                let version_key = version_key(contract_id, self.instance.generate_id()?);
                contracts.insert(contract_id.as_bytes(), encoded)?;
                versions.insert(version_key, version)?;
                Ok(record)
            })
            .map_err(ContractError::from)
    }

    /// Every stored version of `contract_id`, oldest first.
    pub fn versions(&self, contract_id: &str) -> Result<Vec<VersionEntry>, ContractError> {
        self.versions
            .scan_prefix(version_prefix(contract_id))
            .map(|entry| -> Result<VersionEntry, ContractError> {
                let (_, value) = entry?;
                Ok(minicbor::decode(&value)?)
            })
            .collect()
    }
}

fn encode_write(
    record: &ContractRecord,
    tx_id: &str,
    timestamp: &TimeStamp<Utc>,
) -> Result<(Vec<u8>, Vec<u8>), ContractError> {
    let encoded = record.encode()?;
    let version = VersionEntry {
        tx_id: tx_id.to_string(),
        timestamp: timestamp.clone(),
        payload: Some(encoded.clone().into()),
        is_delete: false,
    };
    Ok((encoded, minicbor::to_vec(version)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_keys_sort_by_id_within_a_contract() {
        let a = version_key("D1", 9);
        let b = version_key("D1", 256);

        assert!(a < b);
        assert!(a.starts_with(&version_prefix("D1")));
        assert!(!version_key("D10", 1).starts_with(&version_prefix("D1")));
    }

    #[test]
    fn version_entry_encoding() {
        let original = VersionEntry {
            tx_id: new_transaction_id("D1"),
            timestamp: TimeStamp::new(),
            payload: Some(vec![1, 2, 3].into()),
            is_delete: false,
        };

        let encoding = minicbor::to_vec(&original).unwrap();
        let decode: VersionEntry = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }
}
