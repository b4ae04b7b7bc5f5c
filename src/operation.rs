//! Boundary operations: name lookup, argument checks and dispatch
use super::config::VersionInfo;
use super::contract::{ContractRecord, HistoryEntry, PerformanceStatus, SignedDetail, SignerSide};
use super::error::ContractError;
use super::index::MAX_FILTER_PARTS;
use super::service::{CloseRequest, CollateralUpdate, ContractService, ObligationStatusUpdate};
use super::utils::{non_empty, trim_args};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationName {
    Create,
    Get,
    GetAuditHistory,
    ListByIndex,
    AddHistoryEntry,
    AddObligationStatus,
    UpdateContract,
    CloseContract,
    SignContract,
}

const OPERATIONS: &[(&str, OperationName)] = &[
    ("addContract", OperationName::Create),
    ("create", OperationName::Create),
    ("get", OperationName::Get),
    ("getContract", OperationName::Get),
    ("getAuditHistory", OperationName::GetAuditHistory),
    ("listByIndex", OperationName::ListByIndex),
    ("addHistoryEntry", OperationName::AddHistoryEntry),
    ("addObligationStatus", OperationName::AddObligationStatus),
    ("updateContract", OperationName::UpdateContract),
    ("closeContract", OperationName::CloseContract),
    ("signContract", OperationName::SignContract),
];

/// A validated request, ready to run against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create(Box<ContractRecord>),
    Get {
        contract_id: String,
    },
    GetAuditHistory {
        contract_id: String,
    },
    ListByIndex {
        index_name: String,
        filters: Vec<String>,
    },
    AddHistoryEntry {
        contract_id: String,
        entry: HistoryEntry,
    },
    AddObligationStatus {
        contract_id: String,
        update: ObligationStatusUpdate,
    },
    UpdateContract {
        contract_id: String,
        update: CollateralUpdate,
    },
    CloseContract {
        contract_id: String,
        close: CloseRequest,
    },
    SignContract {
        contract_id: String,
        side: SignerSide,
        signature: SignedDetail,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Message(String),
    Payload(Vec<u8>),
}

impl OperationName {
    /// Resolves `function`, which may carry a `_<version>` suffix matching
    /// the running code version.
    pub fn lookup(function: &str, version: &VersionInfo) -> Result<Self, ContractError> {
        let suffix = format!("_{}", version.number);
        let base = function.strip_suffix(suffix.as_str()).unwrap_or(function);

        OPERATIONS
            .iter()
            .find(|(name, _)| *name == base)
            .map(|(_, op)| *op)
            .ok_or_else(|| ContractError::UnknownFunction(function.to_string()))
    }
}

fn exact<const N: usize>(args: Vec<String>) -> Result<[String; N], ContractError> {
    args.try_into()
        .map_err(|args: Vec<String>| ContractError::ArgumentCount {
            expected: N.to_string(),
            actual: args.len(),
        })
}

fn contract_id(value: String) -> Result<String, ContractError> {
    non_empty(&value, "Contract id")?;
    Ok(value)
}

fn parse_integer(value: &str, field: &'static str) -> Result<i64, ContractError> {
    value.parse().map_err(|_| ContractError::Parse {
        field,
        kind: "integer",
    })
}

impl Operation {
    /// Trims and checks `args` for `function`. Nothing here touches the
    /// store, so argument and number errors never leave side effects.
    pub fn parse<S: AsRef<str>>(
        function: &str,
        args: &[S],
        version: &VersionInfo,
    ) -> Result<Self, ContractError> {
        let name = OperationName::lookup(function, version)?;
        let args = trim_args(args);

        let op = match name {
            OperationName::Create => Operation::Create(Box::new(ContractRecord::from_args(&args)?)),
            OperationName::Get => {
                let [id] = exact::<1>(args)?;
                Operation::Get {
                    contract_id: contract_id(id)?,
                }
            }
            OperationName::GetAuditHistory => {
                let [id] = exact::<1>(args)?;
                Operation::GetAuditHistory {
                    contract_id: contract_id(id)?,
                }
            }
            OperationName::ListByIndex => {
                if args.is_empty() || args.len() > MAX_FILTER_PARTS + 1 {
                    return Err(ContractError::ArgumentCount {
                        expected: format!("1 to {}", MAX_FILTER_PARTS + 1),
                        actual: args.len(),
                    });
                }
                let mut args = args.into_iter();
                let index_name = args.next().unwrap_or_default();
                non_empty(&index_name, "Index name")?;
                Operation::ListByIndex {
                    index_name,
                    filters: args.collect(),
                }
            }
            OperationName::AddHistoryEntry => {
                let [id, date_time, what, who, detailing] = exact::<5>(args)?;
                Operation::AddHistoryEntry {
                    contract_id: contract_id(id)?,
                    entry: HistoryEntry::new(date_time, what, who, detailing),
                }
            }
            OperationName::AddObligationStatus => {
                let [id, commitment_id, date_time, actor, description, status] = exact::<6>(args)?;
                let status = PerformanceStatus::try_from(parse_integer(
                    &status,
                    "performance status",
                )?)?;
                Operation::AddObligationStatus {
                    contract_id: contract_id(id)?,
                    update: ObligationStatusUpdate {
                        commitment_id,
                        date_time,
                        actor,
                        description,
                        status,
                    },
                }
            }
            OperationName::UpdateContract => {
                let [id, date_time, actor, amount_note, delta] = exact::<5>(args)?;
                let quantity_delta = if delta == "0" {
                    0
                } else {
                    parse_integer(&delta, "quantity change")?
                };
                Operation::UpdateContract {
                    contract_id: contract_id(id)?,
                    update: CollateralUpdate {
                        date_time,
                        actor,
                        amount_note,
                        quantity_delta,
                    },
                }
            }
            OperationName::CloseContract => {
                let [id, commitment_a, commitment_b, close_date, actor] = exact::<5>(args)?;
                Operation::CloseContract {
                    contract_id: contract_id(id)?,
                    close: CloseRequest {
                        commitment_a,
                        commitment_b,
                        close_date,
                        actor,
                    },
                }
            }
            OperationName::SignContract => {
                let [
                    id,
                    side,
                    date_time,
                    who_signed,
                    text,
                    text_signed,
                    signature_algorithm,
                    public_key,
                    confirmation,
                ] = exact::<9>(args)?;
                Operation::SignContract {
                    contract_id: contract_id(id)?,
                    side: side.parse()?,
                    signature: SignedDetail {
                        date_time,
                        who_signed,
                        text,
                        text_signed,
                        signature_algorithm,
                        public_key,
                        confirmation: parse_integer(&confirmation, "confirmation")?,
                    },
                }
            }
        };
        Ok(op)
    }
}

impl ContractService {
    /// Parses and runs one named operation.
    pub fn invoke_function<S: AsRef<str>>(
        &self,
        function: &str,
        args: &[S],
    ) -> Result<Response, ContractError> {
        info!(function, "invoke is running");
        let op = Operation::parse(function, args, &self.config.version)?;
        self.invoke(op)
    }

    pub fn invoke(&self, op: Operation) -> Result<Response, ContractError> {
        let response = match op {
            Operation::Create(record) => Response::Message(self.create_contract(&record)?),
            Operation::Get { contract_id } => Response::Payload(self.get(&contract_id)?),
            Operation::GetAuditHistory { contract_id } => {
                Response::Payload(self.get_audit_history(&contract_id)?)
            }
            Operation::ListByIndex {
                index_name,
                filters,
            } => Response::Payload(self.list_by_index(&index_name, filters.as_slice())?),
            Operation::AddHistoryEntry { contract_id, entry } => {
                self.add_history_entry(&contract_id, entry)?;
                Response::Message(format!("History entry added to contract {contract_id}"))
            }
            Operation::AddObligationStatus {
                contract_id,
                update,
            } => {
                self.add_obligation_status(&contract_id, update)?;
                Response::Message(format!("Obligation status added to contract {contract_id}"))
            }
            Operation::UpdateContract {
                contract_id,
                update,
            } => {
                self.update_contract(&contract_id, update)?;
                Response::Message(format!("Contract {contract_id} successfully updated"))
            }
            Operation::CloseContract { contract_id, close } => {
                self.close_contract(&contract_id, close)?;
                Response::Message(format!("Contract {contract_id} successfully closed"))
            }
            Operation::SignContract {
                contract_id,
                side,
                signature,
            } => {
                let record = self.sign_contract(&contract_id, side, signature)?;
                Response::Message(format!(
                    "Contract {contract_id} signed by {side}, status {}",
                    record.status
                ))
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version() -> VersionInfo {
        VersionInfo::default()
    }

    #[test]
    fn lookup_accepts_matching_version_suffix() {
        let v = version();
        assert_eq!(
            OperationName::lookup("addContract_1.0.0", &v).unwrap(),
            OperationName::Create
        );
        assert_eq!(
            OperationName::lookup("closeContract", &v).unwrap(),
            OperationName::CloseContract
        );
        assert!(matches!(
            OperationName::lookup("addContract_2.0.0", &v),
            Err(ContractError::UnknownFunction(_))
        ));
        assert!(OperationName::lookup("deleteContract", &v).is_err());
    }

    #[test]
    fn arguments_are_trimmed() {
        let op = Operation::parse(
            "addHistoryEntry",
            &[" D1 ", " 01.02.2024 ", "note", "ops", " detail\n"],
            &version(),
        )
        .unwrap();

        assert_eq!(
            op,
            Operation::AddHistoryEntry {
                contract_id: "D1".into(),
                entry: HistoryEntry::new("01.02.2024", "note", "ops", "detail"),
            }
        );
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        let err = Operation::parse("closeContract", &["D1", "a", "b"], &version()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Incorrect number of arguments. Expecting 5, got 3"
        );

        let err = Operation::parse("listByIndex", &["i", "a", "b", "c", "d"], &version())
            .unwrap_err();
        assert!(matches!(err, ContractError::ArgumentCount { actual: 5, .. }));
    }

    #[test]
    fn numeric_fields_must_parse() {
        let err = Operation::parse(
            "addObligationStatus",
            &["D1", "c1", "01.02.2024", "ops", "paid", "done"],
            &version(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ContractError::Parse {
                field: "performance status",
                ..
            }
        ));

        let err = Operation::parse(
            "updateContract",
            &["D1", "01.02.2024", "ops", "none", "1.5"],
            &version(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ContractError::Parse {
                field: "quantity change",
                ..
            }
        ));
    }

    #[test]
    fn negative_quantity_delta_parses() {
        let op = Operation::parse(
            "updateContract",
            &["D1", "01.02.2024", "ops", "margin call", "-40"],
            &version(),
        )
        .unwrap();

        let Operation::UpdateContract { update, .. } = op else {
            panic!("expected update");
        };
        assert_eq!(update.quantity_delta, -40);
    }

    #[test]
    fn empty_contract_id_is_rejected() {
        let err = Operation::parse("get", &["  "], &version()).unwrap_err();
        assert!(matches!(err, ContractError::EmptyField(_)));
    }
}
