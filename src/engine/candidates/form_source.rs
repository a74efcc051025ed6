//! Candidates from broker form tags.

use super::{CandidateChain, GeneratorKind};
use crate::domain::Order;

/// All roll-sourced orders of the group form one candidate. A single tagged
/// order is still a candidate: a broker-confirmed roll with no later activity.
pub fn group_roll_sourced<'a>(group: &[&'a Order]) -> Vec<CandidateChain<'a>> {
    let tagged: Vec<&'a Order> = group.iter().copied().filter(|o| o.roll_sourced).collect();
    if tagged.is_empty() {
        return Vec::new();
    }
    vec![CandidateChain::new(tagged, GeneratorKind::FormSource)]
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    #[test]
    fn test_single_tagged_roll_is_a_candidate() {
        let a = sto("a", 0, "790", exp(3, 15), "1");
        let mut b = roll("b", 5, ("790", exp(3, 15)), ("790", exp(3, 22)), "1");
        b.roll_sourced = true;
        let group = vec![&a, &b];

        let candidates = group_roll_sourced(&group);

        assert_eq!(candidates.len(), 1);
        assert_eq!(ids(&candidates[0].orders), vec!["b"]);
        assert_eq!(candidates[0].source, GeneratorKind::FormSource);
    }

    #[test]
    fn test_untagged_group_yields_nothing() {
        let a = sto("a", 0, "790", exp(3, 15), "1");
        assert!(group_roll_sourced(&[&a]).is_empty());
    }
}
