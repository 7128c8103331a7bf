//! Parameter-scoping condition
//!
//! Decodes the guarded call by its selector and compares argument words.
//! Calls with any other selector are denied.

use super::{ConditionContext, ConditionError, PermissionCondition};
use quorum_core::calldata::{self, Selector, Word};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Comparison between two operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    /// left == right
    Eq,
    /// left != right
    Ne,
    /// left > right
    Gt,
    /// left >= right
    Ge,
    /// left < right
    Lt,
    /// left <= right
    Le,
}

impl Comparison {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Ge => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Le => ordering != Ordering::Greater,
        }
    }
}

/// Operand of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Argument word at this index
    Argument(usize),
    /// Fixed word
    Constant(Word),
}

impl Operand {
    fn resolve(self, data: &[u8]) -> Result<Word, ConditionError> {
        match self {
            Operand::Constant(word) => Ok(word),
            Operand::Argument(index) => {
                calldata::argument(data, index).ok_or_else(|| ConditionError::MalformedData {
                    reason: format!("missing argument {index}"),
                })
            }
        }
    }
}

/// Grants only calls to one selector whose arguments satisfy a comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterScopeCondition {
    selector: Selector,
    left: Operand,
    comparison: Comparison,
    right: Operand,
}

impl ParameterScopeCondition {
    /// Scope `selector` to calls where `left <comparison> right`
    pub fn new(selector: Selector, left: Operand, comparison: Comparison, right: Operand) -> Self {
        Self {
            selector,
            left,
            comparison,
            right,
        }
    }

    /// Scope `selector` to calls whose argument `a` is greater than argument `b`
    pub fn argument_greater_than(selector: Selector, a: usize, b: usize) -> Self {
        Self::new(
            selector,
            Operand::Argument(a),
            Comparison::Gt,
            Operand::Argument(b),
        )
    }

    /// Selector this condition is scoped to
    pub fn selector(&self) -> Selector {
        self.selector
    }
}

impl PermissionCondition for ParameterScopeCondition {
    fn is_granted(&self, ctx: &ConditionContext<'_>) -> Result<bool, ConditionError> {
        if calldata::selector_of(ctx.data) != Some(self.selector) {
            debug!(selector = %self.selector, "call selector out of scope");
            return Ok(false);
        }
        let left = self.left.resolve(ctx.data)?;
        let right = self.right.resolve(ctx.data)?;
        Ok(self.comparison.holds(left.cmp(&right)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::calldata::{encode_call, word_from_u128};
    use quorum_core::{Address, PermissionId};

    fn check(condition: &ParameterScopeCondition, data: &[u8]) -> Result<bool, ConditionError> {
        condition.is_granted(&ConditionContext {
            target: Address::from_label("dao"),
            who: Address::from_label("alice"),
            permission_id: PermissionId::from_name("WITHDRAW_PERMISSION"),
            data,
        })
    }

    #[test]
    fn test_first_argument_must_exceed_second() {
        let withdraw = Selector::from_signature("withdraw(uint256,uint256)");
        let condition = ParameterScopeCondition::argument_greater_than(withdraw, 0, 1);
        let call = |a, b| encode_call(withdraw, &[word_from_u128(a), word_from_u128(b)]);

        assert_eq!(check(&condition, &call(10, 1)), Ok(true));
        assert_eq!(check(&condition, &call(1, 1)), Ok(false));
        assert_eq!(check(&condition, &call(1, 10)), Ok(false));
    }

    #[test]
    fn test_other_selector_is_denied() {
        let withdraw = Selector::from_signature("withdraw(uint256,uint256)");
        let deposit = Selector::from_signature("deposit(uint256,uint256)");
        let condition = ParameterScopeCondition::argument_greater_than(withdraw, 0, 1);
        let data = encode_call(deposit, &[word_from_u128(10), word_from_u128(1)]);

        assert_eq!(check(&condition, &data), Ok(false));
    }

    #[test]
    fn test_truncated_arguments_are_an_error() {
        let withdraw = Selector::from_signature("withdraw(uint256,uint256)");
        let condition = ParameterScopeCondition::argument_greater_than(withdraw, 0, 1);
        let data = encode_call(withdraw, &[word_from_u128(10)]);

        assert!(matches!(
            check(&condition, &data),
            Err(ConditionError::MalformedData { .. })
        ));
    }

    #[test]
    fn test_constant_bound() {
        let mint = Selector::from_signature("mint(uint256)");
        let condition = ParameterScopeCondition::new(
            mint,
            Operand::Argument(0),
            Comparison::Le,
            Operand::Constant(word_from_u128(1_000)),
        );

        assert_eq!(check(&condition, &encode_call(mint, &[word_from_u128(1_000)])), Ok(true));
        assert_eq!(check(&condition, &encode_call(mint, &[word_from_u128(1_001)])), Ok(false));
    }
}
