//! Repo contract record and its obligation, history and signature sub-ledgers
use super::error::ContractError;
use super::types::Amount;
use super::utils::non_empty;
use std::fmt;
use std::str::FromStr;

/// Number of positional fields accepted by contract creation.
pub const CREATE_FIELD_COUNT: usize = 30;

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord,
)]
#[cbor(index_only)]
pub enum ContractStatus {
    #[default]
    #[n(0)]
    New,
    #[n(1)]
    Confirmed,
    #[n(2)]
    Closed,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cbor(index_only)]
pub enum PerformanceStatus {
    #[n(0)]
    Performed,
    #[default]
    #[n(1)]
    Pending,
    #[n(2)]
    Cancelled,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct Counterparty {
    #[n(0)]
    pub code: String, // organisation code at the depository
    #[n(1)]
    pub short_name: String,
    #[n(2)]
    pub type_of_trade: String, // S own assets, D trust, L client assets
    #[n(3)]
    pub depo_section_id: Amount,
    #[n(4)]
    pub depo_acc: String,
    #[n(5)]
    pub depo_section: String,
    #[n(6)]
    pub account: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct MasterAgreement {
    #[n(0)]
    pub code: String,
    #[n(1)]
    pub date: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct Collateral {
    #[n(0)]
    pub security_code: String,
    #[n(1)]
    pub security_isin: String,
    #[n(2)]
    pub security_name: String,
    #[n(3)]
    pub quantity: i64,
    #[n(4)]
    pub discount: Amount, // percent
    #[n(5)]
    pub price_types_priority: String,
}

/// Settlement system parameters. Stored verbatim, never interpreted.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct SuoParams {
    #[n(0)]
    pub reuse: String,
    #[n(1)]
    pub return_var: String,
    #[n(2)]
    pub shift_term_date: String,
    #[n(3)]
    pub auto_margin: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    #[n(0)]
    pub date_time_change: String,
    #[n(1)]
    pub what_has_changed: String,
    #[n(2)]
    pub who_made_changes: String,
    #[n(3)]
    pub detailing: String,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct Obligation {
    #[n(0)]
    pub commitment_id: String,
    #[n(1)]
    pub date_time: String,
    #[n(2)]
    pub who_made_changes: String,
    #[n(3)]
    pub text_description: String,
    #[n(4)]
    pub amount: Amount, // negative is an outflow bank to client
    #[n(5)]
    pub quantity_securities: i64,
    #[n(6)]
    pub performance_status: PerformanceStatus,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct SignedDetail {
    #[n(0)]
    pub date_time: String,
    #[n(1)]
    pub who_signed: String,
    #[n(2)]
    pub text: String,
    #[n(3)]
    pub text_signed: String,
    #[n(4)]
    pub signature_algorithm: String,
    #[n(5)]
    pub public_key: String,
    #[n(6)]
    pub confirmation: i64,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct ContractSignatures {
    #[n(0)]
    pub seller: SignedDetail,
    #[n(1)]
    pub buyer: SignedDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerSide {
    Seller,
    Buyer,
}

/// One repo deal. Keyed in the store by `deal_num`.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq, Eq)]
pub struct ContractRecord {
    #[n(0)]
    pub deal_num: String,
    #[n(1)]
    pub deal_date: String,
    #[n(2)]
    pub leg1_date: String,
    #[n(3)]
    pub leg2_date: String,
    #[n(4)]
    pub amount: Amount,
    #[n(5)]
    pub currency: String,
    #[n(6)]
    pub leg1_deal_type: String, // DVP1, DVP3
    #[n(7)]
    pub threshold1: Amount,
    #[n(8)]
    pub threshold2: Amount,
    #[n(9)]
    pub repo_rate: Amount, // percent per annum
    #[n(10)]
    pub int_meth: String,
    #[n(11)]
    pub collateral_receiver: Counterparty,
    #[n(12)]
    pub collateral_giver: Counterparty,
    #[n(13)]
    pub master_agreement: MasterAgreement,
    #[n(14)]
    pub collateral: Collateral,
    #[n(15)]
    pub suo_params: SuoParams,
    #[n(16)]
    pub history: Vec<HistoryEntry>,
    #[n(17)]
    pub contr_signed: ContractSignatures,
    #[n(18)]
    pub obligation_list: Vec<Obligation>,
    #[n(19)]
    pub status: ContractStatus,
}

impl ContractStatus {
    pub fn code(&self) -> u8 {
        match self {
            Self::New => 0,
            Self::Confirmed => 1,
            Self::Closed => 2,
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Confirmed => "confirmed",
            Self::Closed => "closed",
        };
        write!(f, "{} ({})", self.code(), name)
    }
}

impl TryFrom<i64> for PerformanceStatus {
    type Error = ContractError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Performed),
            1 => Ok(Self::Pending),
            2 => Ok(Self::Cancelled),
            _ => Err(ContractError::Parse {
                field: "performance status",
                kind: "0, 1 or 2",
            }),
        }
    }
}

impl FromStr for SignerSide {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "seller" => Ok(Self::Seller),
            "buyer" => Ok(Self::Buyer),
            _ => Err(ContractError::Parse {
                field: "signer side",
                kind: "seller or buyer",
            }),
        }
    }
}

impl fmt::Display for SignerSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seller => f.write_str("seller"),
            Self::Buyer => f.write_str("buyer"),
        }
    }
}

impl HistoryEntry {
    pub fn new(
        date_time_change: impl Into<String>,
        what_has_changed: impl Into<String>,
        who_made_changes: impl Into<String>,
        detailing: impl Into<String>,
    ) -> Self {
        Self {
            date_time_change: date_time_change.into(),
            what_has_changed: what_has_changed.into(),
            who_made_changes: who_made_changes.into(),
            detailing: detailing.into(),
        }
    }
}

impl ContractSignatures {
    pub fn slot_mut(&mut self, side: SignerSide) -> &mut SignedDetail {
        match side {
            SignerSide::Seller => &mut self.seller,
            SignerSide::Buyer => &mut self.buyer,
        }
    }
}

fn parse_amount(value: &str, field: &'static str) -> Result<Amount, ContractError> {
    value.parse().map_err(|_| ContractError::Parse {
        field,
        kind: "float",
    })
}

impl ContractRecord {
    /// Builds a fresh record from the 30 positional creation fields.
    ///
    /// Fields are expected already trimmed. The result has status New, a
    /// single "Create Contract" history entry and two pending seed
    /// obligations: the cash leg (negated principal, no securities) and the
    /// securities leg (no cash, full collateral quantity).
    pub fn from_args(args: &[String]) -> Result<Self, ContractError> {
        if args.len() != CREATE_FIELD_COUNT {
            return Err(ContractError::ArgumentCount {
                expected: CREATE_FIELD_COUNT.to_string(),
                actual: args.len(),
            });
        }
        let deal_num = non_empty(&args[0], "DealNum")?;

        let amount = parse_amount(&args[4], "amount")?;
        let threshold1 = parse_amount(&args[7], "threshold1")?;
        let threshold2 = parse_amount(&args[8], "threshold2")?;
        let repo_rate = parse_amount(&args[9], "repoRate")?;
        let quantity: i64 = args[20].parse().map_err(|_| ContractError::Parse {
            field: "quantity securities",
            kind: "integer",
        })?;
        let discount = parse_amount(&args[21], "discount")?;

        // depository account details are not part of the creation payload
        let collateral_receiver = Counterparty {
            code: args[11].clone(),
            short_name: args[12].clone(),
            ..Default::default()
        };
        let collateral_giver = Counterparty {
            code: args[13].clone(),
            short_name: args[14].clone(),
            ..Default::default()
        };

        let actor = &args[27];
        let leg1_date = &args[2];

        let history = vec![HistoryEntry::new(
            args[1].clone(),
            "Create Contract",
            actor.clone(),
            format!("Contract {} successfully created", deal_num),
        )];

        let obligation_list = vec![
            Obligation {
                commitment_id: args[28].clone(),
                date_time: leg1_date.clone(),
                who_made_changes: actor.clone(),
                text_description: "bank to client".into(),
                amount: -amount,
                quantity_securities: 0,
                performance_status: PerformanceStatus::Pending,
            },
            Obligation {
                commitment_id: args[29].clone(),
                date_time: leg1_date.clone(),
                who_made_changes: actor.clone(),
                text_description: "client to bank".into(),
                amount: Amount::ZERO,
                quantity_securities: quantity,
                performance_status: PerformanceStatus::Pending,
            },
        ];

        Ok(Self {
            deal_num: deal_num.to_string(),
            deal_date: args[1].clone(),
            leg1_date: leg1_date.clone(),
            leg2_date: args[3].clone(),
            amount,
            currency: args[5].clone(),
            leg1_deal_type: args[6].clone(),
            threshold1,
            threshold2,
            repo_rate,
            int_meth: args[10].clone(),
            collateral_receiver,
            collateral_giver,
            master_agreement: MasterAgreement {
                code: args[15].clone(),
                date: args[16].clone(),
            },
            collateral: Collateral {
                security_code: args[17].clone(),
                security_isin: args[18].clone(),
                security_name: args[19].clone(),
                quantity,
                discount,
                price_types_priority: args[22].clone(),
            },
            suo_params: SuoParams {
                reuse: args[23].clone(),
                return_var: args[24].clone(),
                shift_term_date: args[25].clone(),
                auto_margin: args[26].clone(),
            },
            history,
            contr_signed: ContractSignatures::default(),
            obligation_list,
            status: ContractStatus::New,
        })
    }

    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    pub fn push_obligation(&mut self, obligation: Obligation) {
        self.obligation_list.push(obligation);
    }

    /// First obligation carrying `commitment_id`, if any.
    pub fn obligation_mut(&mut self, commitment_id: &str) -> Option<&mut Obligation> {
        self.obligation_list
            .iter_mut()
            .find(|o| o.commitment_id == commitment_id)
    }

    pub fn ensure_confirmed(&self) -> Result<(), ContractError> {
        if self.status != ContractStatus::Confirmed {
            return Err(ContractError::NotConfirmed {
                contract_id: self.deal_num.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>, ContractError> {
        Ok(minicbor::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ContractError> {
        Ok(minicbor::decode(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_args() -> Vec<String> {
        let mut args: Vec<String> = (0..CREATE_FIELD_COUNT).map(|i| format!("f{i}")).collect();
        args[0] = "D1".into();
        args[2] = "01.02.2024".into();
        args[4] = "100000".into();
        args[7] = "1.5".into();
        args[8] = "2.5".into();
        args[9] = "5".into();
        args[20] = "200".into();
        args[21] = "10".into();
        args
    }

    #[test]
    fn status_encodes_as_bare_integer() {
        let encoding = minicbor::to_vec(ContractStatus::Closed).unwrap();
        let code: u8 = minicbor::decode(&encoding).unwrap();

        assert_eq!(code, 2);
    }

    #[test]
    fn from_args_seeds_both_legs() {
        let record = ContractRecord::from_args(&create_args()).unwrap();

        assert_eq!(record.status, ContractStatus::New);
        assert_eq!(record.history.len(), 1);
        assert_eq!(record.history[0].what_has_changed, "Create Contract");
        assert_eq!(record.history[0].who_made_changes, "f27");
        assert!(record.history[0].detailing.contains("D1"));

        let legs = &record.obligation_list;
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].commitment_id, "f28");
        assert_eq!(legs[0].amount, Amount::from(-100_000));
        assert_eq!(legs[0].quantity_securities, 0);
        assert_eq!(legs[1].commitment_id, "f29");
        assert_eq!(legs[1].amount, Amount::ZERO);
        assert_eq!(legs[1].quantity_securities, 200);
        assert!(
            legs.iter()
                .all(|o| o.performance_status == PerformanceStatus::Pending)
        );
    }

    #[test]
    fn from_args_names_the_bad_field() {
        let mut args = create_args();
        args[8] = "high".into();

        let err = ContractRecord::from_args(&args).unwrap_err();
        assert_eq!(err.to_string(), "Expected float value for threshold2");

        let mut args = create_args();
        args[20] = "2.5".into();

        let err = ContractRecord::from_args(&args).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected integer value for quantity securities"
        );
    }

    #[test]
    fn from_args_rejects_wrong_count_and_empty_id() {
        let mut args = create_args();
        args.pop();
        assert!(matches!(
            ContractRecord::from_args(&args),
            Err(ContractError::ArgumentCount { actual: 29, .. })
        ));

        let mut args = create_args();
        args[0] = String::new();
        assert!(matches!(
            ContractRecord::from_args(&args),
            Err(ContractError::EmptyField("DealNum"))
        ));
    }

    #[test]
    fn obligation_lookup_takes_first_match() {
        let mut record = ContractRecord::from_args(&create_args()).unwrap();
        record.obligation_list[1].commitment_id = "f28".into();

        let found = record.obligation_mut("f28").unwrap();
        assert_eq!(found.amount, Amount::from(-100_000));
    }
}
