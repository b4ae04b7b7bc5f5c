//! Read-only views over stored contracts
use super::contract::ContractRecord;
use super::error::ContractError;
use super::service::ContractService;
use super::store::VersionEntry;
use super::types::TimeStamp;
use chrono::Utc;
use tracing::debug;

/// One historical version of a contract as returned by the audit query.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct AuditEntry {
    #[n(0)]
    pub tx_id: String,
    #[n(1)]
    pub timestamp: TimeStamp<Utc>,
    #[n(2)]
    pub is_delete: bool,
    #[n(3)]
    pub record: ContractRecord,
}

impl TryFrom<VersionEntry> for AuditEntry {
    type Error = ContractError;

    // a version without payload reports an empty record instead of failing
    fn try_from(version: VersionEntry) -> Result<Self, Self::Error> {
        let record = match version.payload.as_deref() {
            Some(bytes) if !bytes.is_empty() => ContractRecord::decode(bytes)?,
            _ => ContractRecord::default(),
        };
        Ok(Self {
            tx_id: version.tx_id,
            timestamp: version.timestamp,
            is_delete: version.is_delete,
            record,
        })
    }
}

impl ContractService {
    /// Stored bytes of one contract, unchanged.
    pub fn get(&self, contract_id: &str) -> Result<Vec<u8>, ContractError> {
        debug!(contract_id, "get contract");
        self.store
            .get_raw(contract_id)?
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| ContractError::NotFound(contract_id.to_string()))
    }

    pub fn get_contract(&self, contract_id: &str) -> Result<ContractRecord, ContractError> {
        ContractRecord::decode(&self.get(contract_id)?)
    }

    /// Every version ever written for `contract_id`, oldest first.
    pub fn audit_history(&self, contract_id: &str) -> Result<Vec<AuditEntry>, ContractError> {
        debug!(contract_id, "get audit history");
        self.store
            .versions(contract_id)?
            .into_iter()
            .map(AuditEntry::try_from)
            .collect()
    }

    pub fn get_audit_history(&self, contract_id: &str) -> Result<Vec<u8>, ContractError> {
        Ok(minicbor::to_vec(self.audit_history(contract_id)?)?)
    }

    /// CBOR array of the stored records listed under `index_name` whose
    /// leading key parts equal `filters`.
    pub fn list_by_index<S: AsRef<str>>(
        &self,
        index_name: &str,
        filters: &[S],
    ) -> Result<Vec<u8>, ContractError> {
        let ids = self.index.list_ids(index_name, filters)?;
        debug!(index = index_name, matches = ids.len(), "list by index");

        let mut encoder = minicbor::Encoder::new(Vec::new());
        encoder.array(ids.len() as u64)?;
        for id in &ids {
            let raw = self.get(id)?;
            encoder.writer_mut().extend_from_slice(&raw);
        }
        Ok(encoder.into_writer())
    }

    pub fn list_contracts<S: AsRef<str>>(
        &self,
        index_name: &str,
        filters: &[S],
    ) -> Result<Vec<ContractRecord>, ContractError> {
        let payload = self.list_by_index(index_name, filters)?;
        Ok(minicbor::decode(&payload)?)
    }

    /// Registers `parts` under `index_name` for later listing.
    pub fn register_index<S: AsRef<str>>(
        &self,
        index_name: &str,
        parts: &[S],
    ) -> Result<(), ContractError> {
        self.index.register(index_name, parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_version_reports_default_record() {
        let version = VersionEntry {
            tx_id: "tx".into(),
            timestamp: TimeStamp::new(),
            payload: None,
            is_delete: true,
        };

        let entry = AuditEntry::try_from(version).unwrap();
        assert!(entry.is_delete);
        assert_eq!(entry.record, ContractRecord::default());

        let version = VersionEntry {
            tx_id: "tx".into(),
            timestamp: TimeStamp::new(),
            payload: Some(Vec::new().into()),
            is_delete: false,
        };
        assert_eq!(
            AuditEntry::try_from(version).unwrap().record,
            ContractRecord::default()
        );
    }
}
