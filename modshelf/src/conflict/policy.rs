//! Fixed conflict policies for unattended runs.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use super::{Conflict, ConflictDecision, ConflictResolver};

/// Configured answer to install conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Always replace the existing file.
    Overwrite,
    /// Always keep the existing file.
    Keep,
    /// Always stop the install.
    #[default]
    Abort,
    /// Ask a human when one is available, otherwise abort.
    Ask,
}

impl ConflictPolicy {
    /// Every policy, in display order.
    pub const ALL: [ConflictPolicy; 4] = [Self::Ask, Self::Overwrite, Self::Keep, Self::Abort];

    /// Config file spelling.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Keep => "keep",
            Self::Abort => "abort",
            Self::Ask => "ask",
        }
    }

    /// Decision applied without a human.
    pub fn unattended_decision(&self) -> ConflictDecision {
        match self {
            Self::Overwrite => ConflictDecision::Overwrite,
            Self::Keep => ConflictDecision::Keep,
            Self::Abort | Self::Ask => ConflictDecision::Abort,
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown conflict policy '{0}' (expected ask, overwrite, keep or abort)")]
pub struct ParsePolicyError(String);

impl FromStr for ConflictPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(Self::Overwrite),
            "keep" => Ok(Self::Keep),
            "abort" => Ok(Self::Abort),
            "ask" => Ok(Self::Ask),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// Resolver that answers every conflict with the policy's decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyResolver {
    policy: ConflictPolicy,
}

impl PolicyResolver {
    /// Create a resolver for the given policy.
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    /// The configured policy.
    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }
}

impl ConflictResolver for PolicyResolver {
    fn resolve(&self, conflict: &Conflict) -> ConflictDecision {
        let decision = self.policy.unattended_decision();
        debug!(
            path = %conflict.path.display(),
            policy = %self.policy,
            decision = %decision,
            "Resolved conflict by policy"
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::package::ModId;

    #[test]
    fn test_parse_policy() {
        assert_eq!("overwrite".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Overwrite));
        assert_eq!(" Keep ".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Keep));
        assert_eq!("ASK".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Ask));
        assert!("sometimes".parse::<ConflictPolicy>().is_err());
    }

    #[test]
    fn test_names_round_trip() {
        for policy in ConflictPolicy::ALL {
            assert_eq!(policy.name().parse::<ConflictPolicy>(), Ok(policy));
        }
    }

    #[test]
    fn test_default_is_abort() {
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::Abort);
        assert_eq!(
            ConflictPolicy::Ask.unattended_decision(),
            ConflictDecision::Abort
        );
    }

    #[test]
    fn test_policy_resolver_is_deterministic() {
        let resolver = PolicyResolver::new(ConflictPolicy::Keep);
        let conflict = Conflict {
            path: PathBuf::from("a.cfg"),
            existing_owner: None,
            candidate: ModId::new("example.com/foo"),
            candidate_name: "Foo".to_string(),
        };

        assert_eq!(resolver.resolve(&conflict), ConflictDecision::Keep);
        assert_eq!(resolver.resolve(&conflict), ConflictDecision::Keep);
    }
}
