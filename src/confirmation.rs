//! Decides when collected signatures move a contract from New to Confirmed
use super::contract::ContractSignatures;

/// Confirmation comes from the signing parties, not from the lifecycle
/// operations. The service asks the hook after every recorded signature.
pub trait ConfirmationHook {
    fn confirms(&self, signatures: &ContractSignatures) -> bool;
}

/// Confirmed once both the seller and the buyer slot carry `confirmation == 1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BothPartiesSigned;

impl ConfirmationHook for BothPartiesSigned {
    fn confirms(&self, signatures: &ContractSignatures) -> bool {
        signatures.seller.confirmation == 1 && signatures.buyer.confirmation == 1
    }
}

impl<F> ConfirmationHook for F
where
    F: Fn(&ContractSignatures) -> bool,
{
    fn confirms(&self, signatures: &ContractSignatures) -> bool {
        self(signatures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_signature_is_not_enough() {
        let mut signatures = ContractSignatures::default();
        signatures.seller.confirmation = 1;
        assert!(!BothPartiesSigned.confirms(&signatures));

        signatures.buyer.confirmation = 1;
        assert!(BothPartiesSigned.confirms(&signatures));
    }
}
