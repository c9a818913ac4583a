//! Deterministic proposal ranking.

use rust_decimal::Decimal;

use crate::domain::Proposal;

/// A proposal scored and positioned for the admission walk
#[derive(Debug, Clone)]
pub struct RankedProposal {
    pub proposal: Proposal,
    /// Confidence times the proposing unit's weight at ranking time
    pub score: Decimal,
    /// 1-based position in the walk
    pub rank: u32,
}

/// Order proposals for admission.
///
/// Score is confidence times the unit's current weight, descending. Ties
/// break on ascending strategy id, then market id, then side, so a
/// replayed round walks reservations in the same order.
pub fn rank_proposals(
    proposals: Vec<Proposal>,
    weight_of: impl Fn(&str) -> Decimal,
) -> Vec<RankedProposal> {
    let mut scored: Vec<RankedProposal> = proposals
        .into_iter()
        .map(|proposal| {
            let score = (proposal.confidence * weight_of(&proposal.strategy_id)).round_dp(8);
            RankedProposal {
                proposal,
                score,
                rank: 0,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.proposal.strategy_id.cmp(&b.proposal.strategy_id))
            .then_with(|| a.proposal.market_id.cmp(&b.proposal.market_id))
            .then_with(|| a.proposal.side.cmp(&b.proposal.side))
    });
    for (position, ranked) in scored.iter_mut().enumerate() {
        ranked.rank = (position + 1) as u32;
    }
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn proposal(strategy_id: &str, market_id: &str, confidence: Decimal) -> Proposal {
        Proposal::buy(strategy_id, market_id, dec!(25), dec!(0.5), confidence)
    }

    #[test]
    fn test_orders_by_weighted_score_descending() {
        let ranked = rank_proposals(
            vec![
                proposal("momentum", "a", dec!(0.6)),
                proposal("whale", "b", dec!(0.9)),
                proposal("value", "c", dec!(0.8)),
            ],
            |_| Decimal::ONE,
        );

        let order: Vec<&str> = ranked
            .iter()
            .map(|r| r.proposal.strategy_id.as_str())
            .collect();
        assert_eq!(order, vec!["whale", "value", "momentum"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn test_weight_shifts_the_outcome() {
        // same confidence, but contrarian carries twice the weight
        let ranked = rank_proposals(
            vec![
                proposal("momentum", "a", dec!(0.7)),
                proposal("contrarian", "b", dec!(0.7)),
            ],
            |id| {
                if id == "contrarian" {
                    dec!(2)
                } else {
                    Decimal::ONE
                }
            },
        );
        assert_eq!(ranked[0].proposal.strategy_id, "contrarian");
        assert_eq!(ranked[0].score, dec!(1.4));
    }

    #[test]
    fn test_ties_break_on_ascending_strategy_id() {
        let ranked = rank_proposals(
            vec![
                proposal("whale", "m", dec!(0.7)),
                proposal("contrarian", "m", dec!(0.7)),
                proposal("momentum", "m", dec!(0.7)),
            ],
            |_| Decimal::ONE,
        );
        let order: Vec<&str> = ranked
            .iter()
            .map(|r| r.proposal.strategy_id.as_str())
            .collect();
        assert_eq!(order, vec!["contrarian", "momentum", "whale"]);
    }

    #[test]
    fn test_replay_produces_identical_order() {
        let build = || {
            vec![
                proposal("momentum", "b", dec!(0.7)),
                proposal("momentum", "a", dec!(0.7)),
                proposal("whale", "a", dec!(0.9)),
            ]
        };
        let first: Vec<String> = rank_proposals(build(), |_| Decimal::ONE)
            .into_iter()
            .map(|r| format!("{}/{}", r.proposal.strategy_id, r.proposal.market_id))
            .collect();
        let second: Vec<String> = rank_proposals(build(), |_| Decimal::ONE)
            .into_iter()
            .map(|r| format!("{}/{}", r.proposal.strategy_id, r.proposal.market_id))
            .collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["whale/a", "momentum/a", "momentum/b"]);
    }
}
