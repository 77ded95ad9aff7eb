use std::fmt;

use alloy_primitives::Address;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::{BridgeError, InvalidInput, Result};

/// How many distinct validator signatures a message needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quorum {
    /// An explicit signature count.
    Fixed(u64),
    /// `numerator / denominator` of the current set size, rounded down, never below one.
    ///
    /// Rounding down means a ratio can land one signature below the exact fraction: four
    /// validators at `2/3` need two signatures, not three. Pick a `Fixed` count or a larger
    /// numerator where that margin matters.
    Ratio { numerator: u64, denominator: u64 },
}

impl Quorum {
    /// Signatures required from a set of `validators`, or `None` if the rule cannot be evaluated.
    ///
    /// Ratios are not clamped to one here; see [`ValidatorSet::required_signatures`].
    pub fn raw_count(&self, validators: usize) -> Option<u128> {
        match *self {
            Self::Fixed(required) => Some(u128::from(required)),
            Self::Ratio { denominator: 0, .. } => None,
            Self::Ratio {
                numerator,
                denominator,
            } => Some(u128::from(numerator) * validators as u128 / u128::from(denominator)),
        }
    }

    /// The rule expressed as a ratio. A fixed count `n` over `validators` reads as
    /// `n / validators`.
    pub fn as_ratio(&self, validators: usize) -> (u64, u64) {
        match *self {
            Self::Fixed(required) => (required, validators as u64),
            Self::Ratio {
                numerator,
                denominator,
            } => (numerator, denominator),
        }
    }

    fn check(&self, validators: usize) -> Result<()> {
        let satisfiable = match *self {
            Self::Fixed(required) => {
                required >= 1 && usize::try_from(required).is_ok_and(|r| r <= validators)
            }
            Self::Ratio {
                numerator,
                denominator,
            } => {
                numerator <= denominator
                    && self
                        .raw_count(validators)
                        .is_some_and(|raw| raw >= 1 && raw <= validators as u128)
            }
        };
        if satisfiable {
            Ok(())
        } else {
            Err(BridgeError::InvalidRatio {
                quorum: *self,
                validators,
            })
        }
    }
}

impl fmt::Display for Quorum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(required) => write!(f, "{required} signatures"),
            Self::Ratio {
                numerator,
                denominator,
            } => write!(f, "{numerator}/{denominator}"),
        }
    }
}

/// Ordered, duplicate-free validator membership together with its [`Quorum`] rule.
///
/// Every successful mutation leaves `1 <= required_signatures() <= len()`. A rejected mutation
/// leaves membership and rule exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSet {
    validators: IndexSet<Address>,
    quorum: Quorum,
}

impl ValidatorSet {
    pub fn new(validators: impl IntoIterator<Item = Address>, quorum: Quorum) -> Result<Self> {
        let mut set = IndexSet::new();
        for validator in validators {
            if validator.is_zero() {
                return Err(InvalidInput::ZeroValidator.into());
            }
            if !set.insert(validator) {
                return Err(InvalidInput::DuplicateValidator(validator).into());
            }
        }
        quorum.check(set.len())?;

        Ok(Self {
            validators: set,
            quorum,
        })
    }

    /// Re-evaluated against the current membership on every call.
    pub fn required_signatures(&self) -> usize {
        let raw = self.quorum.raw_count(self.validators.len()).unwrap_or(1);
        usize::try_from(raw).unwrap_or(usize::MAX).max(1)
    }

    pub fn quorum(&self) -> Quorum {
        self.quorum
    }

    pub fn contains(&self, validator: &Address) -> bool {
        self.validators.contains(validator)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Validators in the order they were added.
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.validators.iter()
    }

    pub fn add_validators(&mut self, validators: &[Address]) -> Result<()> {
        let mut added = IndexSet::with_capacity(validators.len());
        for &validator in validators {
            if validator.is_zero() {
                return Err(InvalidInput::ZeroValidator.into());
            }
            if self.validators.contains(&validator) || !added.insert(validator) {
                return Err(InvalidInput::DuplicateValidator(validator).into());
            }
        }
        // a fixed count stays satisfiable and a ratio only grows, so no quorum check is needed
        self.validators.extend(added);
        Ok(())
    }

    pub fn remove_validators(&mut self, validators: &[Address]) -> Result<()> {
        let mut removed = IndexSet::with_capacity(validators.len());
        for &validator in validators {
            if !self.validators.contains(&validator) || !removed.insert(validator) {
                return Err(InvalidInput::UnknownValidator(validator).into());
            }
        }

        let remaining = self.validators.len() - removed.len();
        let required = self.required_signatures();
        if remaining < required {
            return Err(BridgeError::QuorumUnderflow {
                remaining,
                required,
            });
        }

        self.validators.retain(|validator| !removed.contains(validator));
        Ok(())
    }

    /// Replaces the quorum rule, returning the previous one.
    pub fn set_quorum(&mut self, quorum: Quorum) -> Result<Quorum> {
        quorum.check(self.validators.len())?;
        Ok(std::mem::replace(&mut self.quorum, quorum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn addrs(n: u8) -> Vec<Address> {
        (1..=n).map(Address::repeat_byte).collect()
    }

    fn ratio(numerator: u64, denominator: u64) -> Quorum {
        Quorum::Ratio {
            numerator,
            denominator,
        }
    }

    #[test_case(ratio(10, 9), 9 => 0 ; "ratio above one is rejected")]
    #[test_case(ratio(1, 3), 3 => 1 ; "one third of three")]
    #[test_case(ratio(2, 3), 9 => 6 ; "two thirds of nine")]
    #[test_case(ratio(2, 3), 4 => 2 ; "two thirds of four rounds down")]
    #[test_case(ratio(1, 1), 5 => 5 ; "unanimous")]
    #[test_case(Quorum::Fixed(3), 9 => 3 ; "fixed count")]
    fn test_required_signatures(quorum: Quorum, n: u8) -> usize {
        ValidatorSet::new(addrs(n), quorum)
            .map(|set| set.required_signatures())
            .unwrap_or(0)
    }

    #[test]
    fn test_ratio_of_ten_validators() -> eyre::Result<()> {
        // 10 validators at 3/9 -> floor(30 / 9) = 3 signatures
        let set = ValidatorSet::new(addrs(10), ratio(3, 9))?;
        assert_eq!(set.required_signatures(), 3);
        Ok(())
    }

    #[test_case(ratio(1, 0) ; "zero denominator")]
    #[test_case(ratio(0, 5) ; "zero numerator")]
    #[test_case(ratio(1, 10) ; "rounds to zero")]
    #[test_case(Quorum::Fixed(0) ; "fixed zero")]
    #[test_case(Quorum::Fixed(6) ; "fixed above size")]
    #[test_case(Quorum::Fixed(u64::MAX) ; "fixed beyond usize")]
    #[test_case(Quorum::Fixed((1 << 32) + 1) ; "fixed past 32 bits")]
    fn test_rejects_invalid_quorum(quorum: Quorum) {
        let mut set = ValidatorSet::new(addrs(5), Quorum::Fixed(2)).unwrap();
        let before = set.clone();
        let err = set.set_quorum(quorum).unwrap_err();
        assert_eq!(
            err,
            BridgeError::InvalidRatio {
                quorum,
                validators: 5,
            }
        );
        assert_eq!(set, before);
    }

    #[test]
    fn test_add_rejects_zero_and_duplicates() {
        let mut set = ValidatorSet::new(addrs(3), Quorum::Fixed(2)).unwrap();

        // Test 1: zero address
        let err = set
            .add_validators(&[Address::repeat_byte(9), Address::ZERO])
            .unwrap_err();
        assert_eq!(err, InvalidInput::ZeroValidator.into());

        // Test 2: already present
        let err = set.add_validators(&[Address::repeat_byte(2)]).unwrap_err();
        assert_eq!(
            err,
            InvalidInput::DuplicateValidator(Address::repeat_byte(2)).into()
        );

        // Test 3: duplicated within the batch
        let dup = Address::repeat_byte(8);
        let err = set.add_validators(&[dup, dup]).unwrap_err();
        assert_eq!(err, InvalidInput::DuplicateValidator(dup).into());

        assert_eq!(
            set.len(),
            3,
            "rejected additions must not change membership"
        );
    }

    #[test]
    fn test_remove_guards_quorum() -> eyre::Result<()> {
        let validators = addrs(4);
        let mut set = ValidatorSet::new(validators.clone(), Quorum::Fixed(3))?;

        let err = set.remove_validators(&validators[..2]).unwrap_err();
        assert_eq!(
            err,
            BridgeError::QuorumUnderflow {
                remaining: 2,
                required: 3,
            }
        );
        assert_eq!(set.len(), 4);

        let err = set
            .remove_validators(&[Address::repeat_byte(0x77)])
            .unwrap_err();
        assert_eq!(
            err,
            InvalidInput::UnknownValidator(Address::repeat_byte(0x77)).into()
        );

        set.remove_validators(&validators[1..2])?;
        assert_eq!(
            set.iter().copied().collect::<Vec<_>>(),
            vec![validators[0], validators[2], validators[3]]
        );
        Ok(())
    }

    #[test]
    fn test_ratio_follows_membership() -> eyre::Result<()> {
        let mut set = ValidatorSet::new(addrs(3), ratio(2, 3))?;
        assert_eq!(set.required_signatures(), 2);

        set.add_validators(&[
            Address::repeat_byte(0x10),
            Address::repeat_byte(0x11),
            Address::repeat_byte(0x12),
        ])?;
        assert_eq!(set.required_signatures(), 4);

        set.remove_validators(&[Address::repeat_byte(1), Address::repeat_byte(2)])?;
        assert_eq!(set.required_signatures(), 2);
        Ok(())
    }

    #[test]
    fn test_set_quorum_returns_previous() -> eyre::Result<()> {
        let mut set = ValidatorSet::new(addrs(4), Quorum::Fixed(2))?;
        let previous = set.set_quorum(ratio(3, 4))?;
        assert_eq!(previous, Quorum::Fixed(2));
        assert_eq!(set.required_signatures(), 3);
        Ok(())
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(Vec<u8>),
        Remove(Vec<u8>),
        Fixed(u64),
        Ratio(u64, u64),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            proptest::collection::vec(0u8..16, 1..4).prop_map(Op::Add),
            proptest::collection::vec(1u8..16, 1..4).prop_map(Op::Remove),
            (0u64..12).prop_map(Op::Fixed),
            (0u64..12, 0u64..12).prop_map(|(n, d)| Op::Ratio(n, d)),
        ]
    }

    fn snapshot(set: &ValidatorSet) -> (Vec<Address>, Quorum) {
        (set.iter().copied().collect(), set.quorum())
    }

    fn to_addresses(bytes: Vec<u8>) -> Vec<Address> {
        bytes.into_iter().map(Address::repeat_byte).collect()
    }

    proptest! {
        #[test]
        fn quorum_stays_satisfiable(ops in proptest::collection::vec(arb_op(), 1..40)) {
            let mut set = ValidatorSet::new(addrs(3), Quorum::Fixed(2)).unwrap();
            for op in ops {
                let before = snapshot(&set);
                let result = match op {
                    Op::Add(bytes) => set.add_validators(&to_addresses(bytes)),
                    Op::Remove(bytes) => set.remove_validators(&to_addresses(bytes)),
                    Op::Fixed(n) => set.set_quorum(Quorum::Fixed(n)).map(drop),
                    Op::Ratio(n, d) => set.set_quorum(ratio(n, d)).map(drop),
                };
                if result.is_err() {
                    prop_assert_eq!(snapshot(&set), before);
                }
                let required = set.required_signatures();
                prop_assert!(required >= 1);
                prop_assert!(required <= set.len());
            }
        }
    }
}
