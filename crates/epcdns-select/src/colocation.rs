//! Pairing candidates of two selections (TS 29.303 §5.6).
//!
//! When an SGW and a PGW are selected together, pairs hosted on the same
//! node are preferred, then pairs that are topologically close, then plain
//! DNS priority.

use std::cmp::{Ordering, Reverse};

use crate::selector::Candidate;

/// How a pair was ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PairType {
    /// Both candidates share a canonical node name.
    Colocated = 1,
    /// Both candidates are `topon`; ranked by shared labels.
    TopologicalDistance = 2,
    /// Everything else; ranked by order and preference.
    DnsPriority = 3,
}

/// One candidate from each list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColocatedCandidate {
    first: Candidate,
    second: Candidate,
    pair_type: PairType,
    topological_matches: usize,
}

impl ColocatedCandidate {
    /// Classify a pair.
    pub fn new(first: Candidate, second: Candidate) -> Self {
        let (a, b) = (first.canonical_name(), second.canonical_name());
        let matches = a.topological_matches(b);
        let pair_type = if a.same_node(b) {
            PairType::Colocated
        } else if a.is_topon() && b.is_topon() {
            PairType::TopologicalDistance
        } else {
            PairType::DnsPriority
        };

        Self {
            first,
            second,
            pair_type,
            topological_matches: matches,
        }
    }

    /// Candidate from the first list.
    pub fn first(&self) -> &Candidate {
        &self.first
    }

    /// Candidate from the second list.
    pub fn second(&self) -> &Candidate {
        &self.second
    }

    /// How the pair was classified.
    pub fn pair_type(&self) -> PairType {
        self.pair_type
    }

    /// Labels both canonical names share, counted from the right.
    pub fn topological_matches(&self) -> usize {
        self.topological_matches
    }

    fn rank(&self) -> (PairType, Reverse<usize>) {
        match self.pair_type {
            PairType::TopologicalDistance => (self.pair_type, Reverse(self.topological_matches)),
            _ => (self.pair_type, Reverse(0)),
        }
    }
}

impl PartialOrd for ColocatedCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ColocatedCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| {
                (self.first.order(), self.first.preference(), self.second.order(), self.second.preference()).cmp(&(
                    other.first.order(),
                    other.first.preference(),
                    other.second.order(),
                    other.second.preference(),
                ))
            })
            .then_with(|| self.first.cmp(&other.first))
            .then_with(|| self.second.cmp(&other.second))
    }
}

/// Every pairing of two candidate lists, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColocatedCandidateList {
    pairs: Vec<ColocatedCandidate>,
}

impl ColocatedCandidateList {
    /// Pair every candidate of `first` with every candidate of `second` and
    /// sort the pairs.
    pub fn new<'a, I, J>(first: I, second: J) -> Self
    where
        I: IntoIterator<Item = &'a Candidate>,
        J: IntoIterator<Item = &'a Candidate>,
    {
        let second: Vec<&Candidate> = second.into_iter().collect();
        let mut pairs: Vec<ColocatedCandidate> = first
            .into_iter()
            .flat_map(|a| second.iter().map(move |b| ColocatedCandidate::new(a.clone(), (*b).clone())))
            .collect();
        pairs.sort();
        Self { pairs }
    }

    /// Pairs, best first.
    pub fn pairs(&self) -> &[ColocatedCandidate] {
        &self.pairs
    }

    /// The best pair, if any.
    pub fn first(&self) -> Option<&ColocatedCandidate> {
        self.pairs.first()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when either list was empty.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over pairs, best first.
    pub fn iter(&self) -> std::slice::Iter<'_, ColocatedCandidate> {
        self.pairs.iter()
    }
}

impl<'a> IntoIterator for &'a ColocatedCandidateList {
    type Item = &'a ColocatedCandidate;
    type IntoIter = std::slice::Iter<'a, ColocatedCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}
