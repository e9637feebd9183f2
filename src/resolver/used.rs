//! Fragment claim tracking.

use std::collections::HashSet;

use crate::domain::{FragmentKey, MatcherKind};

/// Who claimed a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Claim {
    /// A record produced for a tagger tag of this kind
    Tagged(MatcherKind),
    /// A record produced by the fallback scan for this kind
    Fallback(MatcherKind),
}

/// Set of `(fragment, claim)` pairs built up during one resolution.
///
/// A fragment may be claimed once per kind: a later phone tag cannot take a
/// fragment an earlier phone tag already took, but an email tag still can.
/// Owned by a single `resolve` call so concurrent documents never share it.
#[derive(Debug, Default, Clone)]
pub struct UsedFragments {
    claims: HashSet<(FragmentKey, Claim)>,
}

impl UsedFragments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a claim. Returns false if it was already present.
    pub fn claim(&mut self, key: FragmentKey, claim: Claim) -> bool {
        self.claims.insert((key, claim))
    }

    /// True if any record of `kind` (tag-driven or fallback) holds the
    /// fragment.
    pub fn is_claimed_for(&self, key: FragmentKey, kind: MatcherKind) -> bool {
        self.claims.contains(&(key, Claim::Tagged(kind)))
            || self.claims.contains(&(key, Claim::Fallback(kind)))
    }
}
