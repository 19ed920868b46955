//! Indexed, validated strategy definitions.
//!
//! Parent/child chaining is an explicit `parent_id` reference, resolved into
//! child index lists here. A `StrategyPlan` is the per-run view: one root, its
//! descendants, their resolved sides and their ladders for a single token.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Ladder, StrategyError};
use crate::domain::{Side, Strategy, StrategyId, Target, Token, TokenId};

/// All tokens, strategies and targets known to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyBook {
    tokens: BTreeMap<TokenId, Token>,
    strategies: BTreeMap<StrategyId, Strategy>,
    /// Legs in declaration order (ascending target id).
    targets: Vec<Target>,
    children: BTreeMap<StrategyId, Vec<StrategyId>>,
}

impl StrategyBook {
    /// Index and validate. Fails on duplicate ids, unknown parents, parent
    /// cycles, orphan targets and invalid contribution/leverage values.
    ///
    /// Ladders are validated per token when a plan is built, because the
    /// override-vs-default choice depends on the token.
    pub fn new(
        tokens: Vec<Token>,
        strategies: Vec<Strategy>,
        mut targets: Vec<Target>,
    ) -> Result<Self, StrategyError> {
        let mut token_map = BTreeMap::new();
        for token in tokens {
            let id = token.id;
            if token_map.insert(id, token).is_some() {
                return Err(StrategyError::DuplicateToken(id));
            }
        }

        let mut strategy_map = BTreeMap::new();
        for strategy in strategies {
            let id = strategy.id;
            if !(strategy.contribution_percent.is_finite() && strategy.contribution_percent > 0.0)
            {
                return Err(StrategyError::InvalidContribution {
                    strategy: id,
                    value: strategy.contribution_percent,
                });
            }
            if !(strategy.leverage.is_finite() && strategy.leverage > 0.0) {
                return Err(StrategyError::InvalidLeverage {
                    strategy: id,
                    leverage: strategy.leverage,
                });
            }
            if strategy_map.insert(id, strategy).is_some() {
                return Err(StrategyError::DuplicateStrategy(id));
            }
        }

        let mut children: BTreeMap<StrategyId, Vec<StrategyId>> = BTreeMap::new();
        for strategy in strategy_map.values() {
            if let Some(parent) = strategy.parent_id {
                if !strategy_map.contains_key(&parent) {
                    return Err(StrategyError::UnknownParent {
                        strategy: strategy.id,
                        parent,
                    });
                }
                children.entry(parent).or_default().push(strategy.id);
            }
        }

        // Any parent chain longer than the number of strategies loops.
        for &start in strategy_map.keys() {
            let mut current = start;
            let mut steps = 0;
            while let Some(parent) = strategy_map[&current].parent_id {
                steps += 1;
                if parent == start || steps > strategy_map.len() {
                    return Err(StrategyError::ParentCycle(start));
                }
                current = parent;
            }
        }

        for target in &targets {
            if !strategy_map.contains_key(&target.strategy_id) {
                return Err(StrategyError::OrphanTarget {
                    target: target.id,
                    strategy: target.strategy_id,
                });
            }
        }
        targets.sort_by_key(|t| t.id);

        Ok(Self {
            tokens: token_map,
            strategies: strategy_map,
            targets,
            children,
        })
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(&id)
    }

    pub fn strategy(&self, id: StrategyId) -> Option<&Strategy> {
        self.strategies.get(&id)
    }

    pub fn strategies(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.values()
    }

    /// Direct children of `id`, ascending by id.
    pub fn children(&self, id: StrategyId) -> &[StrategyId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Materialize the ladder of `strategy` on `token`.
    ///
    /// Token-scoped legs win; the strategy's default legs are the fallback.
    pub fn ladder(&self, strategy: StrategyId, token: TokenId) -> Result<Ladder, StrategyError> {
        let scoped: Vec<Target> = self
            .targets
            .iter()
            .filter(|t| t.strategy_id == strategy && t.token_id == Some(token))
            .cloned()
            .collect();
        let legs = if scoped.is_empty() {
            self.targets
                .iter()
                .filter(|t| t.strategy_id == strategy && t.token_id.is_none())
                .cloned()
                .collect()
        } else {
            scoped
        };
        Ladder::new(strategy, token, legs)
    }

    /// Resolved entry side of `id`: a root's own side, or the parent's side
    /// transformed by each child's direction down the chain.
    pub fn resolved_side(&self, id: StrategyId) -> Result<Side, StrategyError> {
        let strategy = self
            .strategy(id)
            .ok_or(StrategyError::UnknownStrategy(id))?;
        match strategy.parent_id {
            None => Ok(strategy.side),
            Some(parent) => Ok(strategy.direction.resolve(self.resolved_side(parent)?)),
        }
    }

    /// Build the run plan rooted at `root` for `token`.
    ///
    /// Every strategy in the subtree must have a valid ladder for the token
    /// and a leverage within the token's cap.
    pub fn plan(&self, root: StrategyId, token: TokenId) -> Result<StrategyPlan, StrategyError> {
        let token_def = self
            .token(token)
            .ok_or(StrategyError::UnknownToken(token))?
            .clone();
        if !token_def.active {
            return Err(StrategyError::InactiveToken(token));
        }

        let mut nodes: Vec<PlanNode> = Vec::new();
        let mut queue: Vec<(StrategyId, Option<usize>, Side)> =
            vec![(root, None, self.resolved_side(root)?)];
        let mut seen = BTreeSet::new();

        // Breadth-first so that node 0 is the root and parents precede children.
        let mut head = 0;
        while head < queue.len() {
            let (id, parent, side) = queue[head];
            head += 1;
            if !seen.insert(id) {
                continue;
            }
            let strategy = self
                .strategy(id)
                .ok_or(StrategyError::UnknownStrategy(id))?
                .clone();
            if strategy.leverage > token_def.leverage_cap {
                return Err(StrategyError::LeverageAboveCap {
                    strategy: id,
                    token,
                    leverage: strategy.leverage,
                    cap: token_def.leverage_cap,
                });
            }
            let ladder = self.ladder(id, token)?;
            let index = nodes.len();
            if let Some(p) = parent {
                nodes[p].children.push(index);
            }
            for &child in self.children(id) {
                let child_side = self
                    .strategy(child)
                    .ok_or(StrategyError::UnknownStrategy(child))?
                    .direction
                    .resolve(side);
                queue.push((child, Some(index), child_side));
            }
            nodes.push(PlanNode {
                strategy,
                side,
                ladder,
                parent,
                children: Vec::new(),
            });
        }

        Ok(StrategyPlan {
            token: token_def,
            nodes,
        })
    }
}

/// One strategy inside a run plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanNode {
    pub strategy: Strategy,
    /// Side every position of this node opens on.
    pub side: Side,
    pub ladder: Ladder,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Per-run strategy view: node 0 is the root, parents precede children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyPlan {
    pub token: Token,
    pub nodes: Vec<PlanNode>,
}

impl StrategyPlan {
    pub fn root(&self) -> &PlanNode {
        &self.nodes[0]
    }
}
