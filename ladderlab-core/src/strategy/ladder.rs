//! The validated, ordered legs of one strategy+token pair.

use serde::{Deserialize, Serialize};

use super::StrategyError;
use crate::domain::{StrategyId, Target, TokenId};

/// Ordered target/stop-loss legs for a single strategy on a single token.
///
/// Construction validates the ladder; an existing `Ladder` is always
/// non-empty with strictly increasing targets and each stop at or below its
/// target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LadderRepr")]
pub struct Ladder {
    strategy_id: StrategyId,
    token_id: TokenId,
    legs: Vec<Target>,
}

/// Unvalidated wire form; deserialization goes through `Ladder::new`.
#[derive(Deserialize)]
struct LadderRepr {
    strategy_id: StrategyId,
    token_id: TokenId,
    legs: Vec<Target>,
}

impl TryFrom<LadderRepr> for Ladder {
    type Error = StrategyError;

    fn try_from(repr: LadderRepr) -> Result<Self, Self::Error> {
        Ladder::new(repr.strategy_id, repr.token_id, repr.legs)
    }
}

impl Ladder {
    pub fn new(
        strategy_id: StrategyId,
        token_id: TokenId,
        legs: Vec<Target>,
    ) -> Result<Self, StrategyError> {
        if legs.is_empty() {
            return Err(StrategyError::EmptyLadder {
                strategy: strategy_id,
                token: token_id,
            });
        }
        for (index, leg) in legs.iter().enumerate() {
            if leg.strategy_id != strategy_id || leg.token_id.is_some_and(|t| t != token_id) {
                return Err(StrategyError::ForeignLeg {
                    strategy: strategy_id,
                    token: token_id,
                    target: leg.id,
                });
            }
            if !leg.target_percent.is_finite() || !leg.stoploss_percent.is_finite() {
                return Err(StrategyError::NonFiniteLeg {
                    strategy: strategy_id,
                    index,
                });
            }
            if leg.stoploss_percent > leg.target_percent {
                return Err(StrategyError::StopAboveTarget {
                    strategy: strategy_id,
                    index,
                    target: leg.target_percent,
                    stop: leg.stoploss_percent,
                });
            }
            if index > 0 && leg.target_percent <= legs[index - 1].target_percent {
                return Err(StrategyError::NonIncreasingTargets {
                    strategy: strategy_id,
                    token: token_id,
                    index,
                });
            }
        }
        Ok(Self {
            strategy_id,
            token_id,
            legs,
        })
    }

    pub fn strategy_id(&self) -> StrategyId {
        self.strategy_id
    }

    pub fn token_id(&self) -> TokenId {
        self.token_id
    }

    pub fn legs(&self) -> &[Target] {
        &self.legs
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// The leg at `index`, clamped to the last leg.
    pub fn leg(&self, index: usize) -> &Target {
        &self.legs[index.min(self.legs.len() - 1)]
    }

    /// Index of the leg after `index`, if any.
    pub fn next(&self, index: usize) -> Option<usize> {
        let next = index + 1;
        (next < self.legs.len()).then_some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TargetId;

    fn leg(id: u64, target: f64, stop: f64) -> Target {
        Target {
            id: TargetId(id),
            strategy_id: StrategyId(1),
            token_id: None,
            target_percent: target,
            stoploss_percent: stop,
        }
    }

    #[test]
    fn accepts_seed_ladder() {
        let ladder = Ladder::new(
            StrategyId(1),
            TokenId(1),
            vec![leg(1, 0.0, -1.85), leg(2, 0.6, 0.6)],
        )
        .unwrap();
        assert_eq!(ladder.len(), 2);
        assert_eq!(ladder.next(0), Some(1));
        assert_eq!(ladder.next(1), None);
        assert_eq!(ladder.leg(7).target_percent, 0.6);
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            Ladder::new(StrategyId(1), TokenId(1), vec![]),
            Err(StrategyError::EmptyLadder { .. })
        ));
    }

    #[test]
    fn rejects_non_increasing_targets() {
        let err = Ladder::new(
            StrategyId(1),
            TokenId(1),
            vec![leg(1, 0.0, -1.0), leg(2, 0.5, 0.0), leg(3, 0.5, 0.2)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StrategyError::NonIncreasingTargets { index: 2, .. }
        ));
    }

    #[test]
    fn rejects_stop_above_target() {
        let err =
            Ladder::new(StrategyId(1), TokenId(1), vec![leg(1, 0.5, 0.8)]).unwrap_err();
        assert!(matches!(err, StrategyError::StopAboveTarget { index: 0, .. }));
    }

    #[test]
    fn deserialization_validates() {
        let ladder = Ladder::new(StrategyId(1), TokenId(1), vec![leg(1, 0.0, -1.0)]).unwrap();
        let json = serde_json::to_string(&ladder).unwrap();
        assert_eq!(serde_json::from_str::<Ladder>(&json).unwrap(), ladder);

        let empty = r#"{"strategy_id":1,"token_id":1,"legs":[]}"#;
        let err = serde_json::from_str::<Ladder>(empty).unwrap_err();
        assert!(err.to_string().contains("no ladder"));

        let inverted = r#"{"strategy_id":1,"token_id":1,"legs":[
            {"id":1,"strategy_id":1,"target_percent":0.5,"stoploss_percent":0.8}]}"#;
        assert!(serde_json::from_str::<Ladder>(inverted).is_err());
    }

    #[test]
    fn rejects_leg_of_other_token() {
        let mut foreign = leg(1, 0.0, -1.0);
        foreign.token_id = Some(TokenId(9));
        assert!(matches!(
            Ladder::new(StrategyId(1), TokenId(1), vec![foreign]),
            Err(StrategyError::ForeignLeg { .. })
        ));
    }
}
