//! Per-input fee calculation.
//!
//! <https://github.com/cashubtc/nuts/blob/main/02.md>

use std::collections::HashMap;

use cashu::nuts::nut02::Id;
use cashu::Amount;
use tracing::instrument;

use crate::error::Error;

/// Total fee owed for a set of inputs, grouped by the keyset each was issued
/// from. Each keyset charges `input_fee_ppk` parts-per-thousand per input;
/// the per-keyset subtotals are summed before a single ceiling division, so
/// a wallet cannot avoid rounding up by spreading inputs across keysets.
#[instrument(skip_all)]
pub fn calculate_fee(
    proofs_count: &HashMap<Id, u64>,
    keyset_fee_ppk: &HashMap<Id, u64>,
) -> Result<Amount, Error> {
    let mut sum_fee = 0u64;

    for (keyset_id, proof_count) in proofs_count {
        let ppk = keyset_fee_ppk
            .get(keyset_id)
            .ok_or(Error::KeysetUnknown(*keyset_id))?;
        sum_fee += ppk * proof_count;
    }

    Ok(Amount::from((sum_fee + 999) / 1000))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_calculate_fee() {
        let keyset_id = Id::from_str("00456a94ab4e1c46").expect("valid id");
        let mut keyset_fees = HashMap::new();
        keyset_fees.insert(keyset_id, 2u64);

        let cases = [(1u64, 1u64), (500, 1), (1000, 2), (2000, 4), (3500, 7), (3501, 8)];
        for (count, expected) in cases {
            let mut proofs_count = HashMap::new();
            proofs_count.insert(keyset_id, count);
            let fee = calculate_fee(&proofs_count, &keyset_fees).expect("known keyset");
            assert_eq!(fee, Amount::from(expected), "count={count}");
        }
    }

    #[test]
    fn test_calculate_fee_unknown_keyset() {
        let keyset_id = Id::from_str("00456a94ab4e1c46").expect("valid id");
        let mut proofs_count = HashMap::new();
        proofs_count.insert(keyset_id, 1u64);
        assert!(calculate_fee(&proofs_count, &HashMap::new()).is_err());
    }
}
