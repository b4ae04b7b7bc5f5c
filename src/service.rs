//! Service layer API for the repo contract lifecycle
use super::config::{DatePolicy, ServiceConfig};
use super::confirmation::{BothPartiesSigned, ConfirmationHook};
use super::contract::{
    ContractRecord, ContractStatus, HistoryEntry, Obligation, PerformanceStatus, SignedDetail,
    SignerSide,
};
use super::error::ContractError;
use super::index::{ALL_CONTRACTS_INDEX, IndexManager, composite_key};
use super::interest::{elapsed_days, parse_date, repurchase_price};
use super::store::ContractStore;
use super::types::Amount;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// New performance state for one obligation, addressed by commitment id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObligationStatusUpdate {
    pub commitment_id: String,
    pub date_time: String,
    pub actor: String,
    pub description: String,
    pub status: PerformanceStatus,
}

/// Re-valuation bookkeeping on a confirmed contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralUpdate {
    pub date_time: String,
    pub actor: String,
    pub amount_note: String,
    pub quantity_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseRequest {
    pub commitment_a: String, // cash leg, client to bank
    pub commitment_b: String, // securities leg, bank to client
    pub close_date: String,
    pub actor: String,
}

pub struct ContractService {
    pub(crate) store: ContractStore,
    pub(crate) index: IndexManager,
    pub(crate) config: ServiceConfig,
    confirmation: Box<dyn ConfirmationHook + Send + Sync>,
}

impl ContractService {
    pub fn new(instance: Arc<sled::Db>, config: ServiceConfig) -> Result<Self, ContractError> {
        let store = ContractStore::open(instance)?;
        let index = IndexManager::new(store.index_tree());
        info!(version = %config.version, "contract service ready");

        Ok(Self {
            store,
            index,
            config,
            confirmation: Box::new(BothPartiesSigned),
        })
    }

    pub fn with_confirmation_hook<H>(mut self, hook: H) -> Self
    where
        H: ConfirmationHook + Send + Sync + 'static,
    {
        self.confirmation = Box::new(hook);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Stores a freshly built record and registers it under the all-contracts
    /// index.
    pub fn create_contract(&self, record: &ContractRecord) -> Result<String, ContractError> {
        let deal_num = record.deal_num.as_str();
        let index_key = composite_key(ALL_CONTRACTS_INDEX, &[ALL_CONTRACTS_INDEX, deal_num])?;

        self.store
            .insert(record, &index_key, self.config.duplicate_policy)?;

        info!(contract_id = deal_num, "contract created");
        Ok(format!("Contract {} successfully created", deal_num))
    }

    pub fn add_history_entry(
        &self,
        contract_id: &str,
        entry: HistoryEntry,
    ) -> Result<ContractRecord, ContractError> {
        let record = self.store.update(contract_id, |record| {
            record.push_history(entry.clone());
            Ok(())
        })?;

        info!(contract_id, what = %entry.what_has_changed, "history entry added");
        Ok(record)
    }

    /// Overwrites the first obligation whose commitment id matches. The
    /// history entry is appended whether or not a match was found.
    pub fn add_obligation_status(
        &self,
        contract_id: &str,
        update: ObligationStatusUpdate,
    ) -> Result<ContractRecord, ContractError> {
        let record = self.store.update(contract_id, |record| {
            match record.obligation_mut(&update.commitment_id) {
                Some(obligation) => {
                    obligation.date_time = update.date_time.clone();
                    obligation.who_made_changes = update.actor.clone();
                    obligation.text_description = update.description.clone();
                    obligation.performance_status = update.status;
                }
                None => debug!(
                    contract_id,
                    commitment_id = %update.commitment_id,
                    "no obligation with this commitment id"
                ),
            }

            record.push_history(HistoryEntry::new(
                update.date_time.clone(),
                "Add obligation status",
                update.actor.clone(),
                format!(
                    "Commitment {}: {} (status {:?})",
                    update.commitment_id, update.description, update.status
                ),
            ));
            Ok(())
        })?;

        info!(contract_id, commitment_id = %update.commitment_id, "obligation status added");
        Ok(record)
    }

    /// Adds `quantity_delta` to the collateral quantity of a confirmed
    /// contract.
    pub fn update_contract(
        &self,
        contract_id: &str,
        update: CollateralUpdate,
    ) -> Result<ContractRecord, ContractError> {
        let record = self.store.update(contract_id, |record| {
            record.ensure_confirmed()?;

            record.collateral.quantity = record
                .collateral
                .quantity
                .checked_add(update.quantity_delta)
                .ok_or(ContractError::Parse {
                    field: "quantity change",
                    kind: "in-range integer",
                })?;

            record.push_history(HistoryEntry::new(
                update.date_time.clone(),
                "Update contract",
                update.actor.clone(),
                format!(
                    "Amount: {}; quantity change: {}",
                    update.amount_note, update.quantity_delta
                ),
            ));
            Ok(())
        })?;

        info!(
            contract_id,
            quantity = record.collateral.quantity,
            "contract updated"
        );
        Ok(record)
    }

    /// Settles a confirmed contract: books the repurchase cash leg and the
    /// return of all collateral as performed, then marks it Closed.
    pub fn close_contract(
        &self,
        contract_id: &str,
        close: CloseRequest,
    ) -> Result<ContractRecord, ContractError> {
        let record = self.store.update(contract_id, |record| {
            record.ensure_confirmed()?;

            let start = self.settlement_date(&record.leg1_date, "leg1Date", contract_id)?;
            let end = self.settlement_date(&close.close_date, "closeDate", contract_id)?;
            let days = elapsed_days(start, end);
            let price = repurchase_price(record.amount, record.repo_rate, days)?;

            record.push_obligation(Obligation {
                commitment_id: close.commitment_a.clone(),
                date_time: close.close_date.clone(),
                who_made_changes: close.actor.clone(),
                text_description: "client to bank".into(),
                amount: price,
                quantity_securities: 0,
                performance_status: PerformanceStatus::Performed,
            });
            record.push_obligation(Obligation {
                commitment_id: close.commitment_b.clone(),
                date_time: close.close_date.clone(),
                who_made_changes: close.actor.clone(),
                text_description: "bank to client".into(),
                amount: Amount::ZERO,
                quantity_securities: -record.collateral.quantity,
                performance_status: PerformanceStatus::Performed,
            });
            record.status = ContractStatus::Closed;

            record.push_history(HistoryEntry::new(
                close.close_date.clone(),
                "close contract",
                close.actor.clone(),
                format!(
                    "Contract {} closed after {} days, repurchase price {} {}",
                    contract_id, days, price, record.currency
                ),
            ));
            Ok(())
        })?;

        info!(contract_id, "contract closed");
        Ok(record)
    }

    /// Records one party's signature while the contract is New and lets the
    /// confirmation hook decide whether the deal is now Confirmed.
    pub fn sign_contract(
        &self,
        contract_id: &str,
        side: SignerSide,
        signature: SignedDetail,
    ) -> Result<ContractRecord, ContractError> {
        let record = self.store.update(contract_id, |record| {
            if record.status != ContractStatus::New {
                return Err(ContractError::SigningClosed {
                    contract_id: contract_id.to_string(),
                    status: record.status,
                });
            }
            *record.contr_signed.slot_mut(side) = signature.clone();

            let confirmed = self.confirmation.confirms(&record.contr_signed);
            if confirmed {
                record.status = ContractStatus::Confirmed;
            }

            let detail = if confirmed {
                format!("Signed by {side}, contract confirmed")
            } else {
                format!("Signed by {side}")
            };
            record.push_history(HistoryEntry::new(
                signature.date_time.clone(),
                "Sign contract",
                signature.who_signed.clone(),
                detail,
            ));
            Ok(())
        })?;

        info!(contract_id, %side, status = %record.status, "signature recorded");
        Ok(record)
    }

    fn settlement_date(
        &self,
        value: &str,
        field: &'static str,
        contract_id: &str,
    ) -> Result<NaiveDate, ContractError> {
        match parse_date(value) {
            Ok(date) => Ok(date),
            Err(e) => match self.config.date_policy {
                DatePolicy::Strict => Err(ContractError::Parse {
                    field,
                    kind: "dd.mm.yyyy date",
                }),
                DatePolicy::ZeroFallback => {
                    warn!(contract_id, field, value, error = %e, "unparsable date, using 01.01.0001");
                    Ok(NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN))
                }
            },
        }
    }
}
