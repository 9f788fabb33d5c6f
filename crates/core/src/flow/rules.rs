//! Connection rules deciding whether two doorways may be joined.

use std::cmp::Reverse;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::template::{DoorwayTemplate, TileTemplate};
use crate::types::Tags;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionResult {
    Allow,
    Deny,
    Passthrough,
}

/// A candidate doorway pairing presented to the rule chain.
#[derive(Clone, Copy, Debug)]
pub struct ProposedConnection<'a> {
    pub previous_tile: &'a TileTemplate,
    pub previous_doorway: &'a DoorwayTemplate,
    pub next_tile: &'a TileTemplate,
    pub next_doorway: &'a DoorwayTemplate,
}

impl ProposedConnection<'_> {
    pub fn sockets_match(&self) -> bool {
        self.previous_doorway.socket == self.next_doorway.socket
    }
}

pub trait ConnectionRule {
    /// Higher priorities are consulted first.
    fn priority(&self) -> i32 {
        0
    }

    fn evaluate(&self, connection: &ProposedConnection<'_>) -> ConnectionResult;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPair {
    pub a: String,
    pub b: String,
}

impl TagPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self { a: a.into(), b: b.into() }
    }

    fn matches(&self, first: &Tags, second: &Tags) -> bool {
        (first.contains(&self.a) && second.contains(&self.b))
            || (first.contains(&self.b) && second.contains(&self.a))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagPairMode {
    /// Only pairings matching a listed tag pair may connect.
    #[default]
    Accept,
    /// Pairings matching a listed tag pair may never connect.
    Reject,
}

impl TagPairMode {
    fn decide(self, pairs: &[TagPair], first: &Tags, second: &Tags) -> ConnectionResult {
        if pairs.is_empty() {
            return ConnectionResult::Passthrough;
        }
        let matched = pairs.iter().any(|pair| pair.matches(first, second));
        match (self, matched) {
            (TagPairMode::Accept, false) | (TagPairMode::Reject, true) => ConnectionResult::Deny,
            _ => ConnectionResult::Passthrough,
        }
    }
}

/// Data-driven rules that can be authored in a flow file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ConnectionRuleSpec {
    TilePairTags {
        #[serde(default)]
        priority: i32,
        #[serde(default)]
        mode: TagPairMode,
        pairs: Vec<TagPair>,
    },
    DoorwayPairTags {
        #[serde(default)]
        priority: i32,
        #[serde(default)]
        mode: TagPairMode,
        pairs: Vec<TagPair>,
    },
    /// Allows two different sockets to connect.
    SocketPair {
        #[serde(default)]
        priority: i32,
        a: String,
        b: String,
    },
}

impl ConnectionRule for ConnectionRuleSpec {
    fn priority(&self) -> i32 {
        match self {
            ConnectionRuleSpec::TilePairTags { priority, .. }
            | ConnectionRuleSpec::DoorwayPairTags { priority, .. }
            | ConnectionRuleSpec::SocketPair { priority, .. } => *priority,
        }
    }

    fn evaluate(&self, connection: &ProposedConnection<'_>) -> ConnectionResult {
        match self {
            ConnectionRuleSpec::TilePairTags { mode, pairs, .. } => {
                mode.decide(pairs, &connection.previous_tile.tags, &connection.next_tile.tags)
            }
            ConnectionRuleSpec::DoorwayPairTags { mode, pairs, .. } => mode.decide(
                pairs,
                &connection.previous_doorway.tags,
                &connection.next_doorway.tags,
            ),
            ConnectionRuleSpec::SocketPair { a, b, .. } => {
                let first = &connection.previous_doorway.socket;
                let second = &connection.next_doorway.socket;
                if (first == a && second == b) || (first == b && second == a) {
                    ConnectionResult::Allow
                } else {
                    ConnectionResult::Passthrough
                }
            }
        }
    }
}

/// Rules ordered by descending priority; ties keep insertion order.
#[derive(Default)]
pub struct RuleChain {
    rules: Vec<Box<dyn ConnectionRule>>,
}

impl fmt::Debug for RuleChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleChain").field("rules", &self.rules.len()).finish()
    }
}

impl RuleChain {
    pub fn from_specs(specs: &[ConnectionRuleSpec]) -> Self {
        let mut chain = Self::default();
        for spec in specs {
            chain.push(Box::new(spec.clone()));
        }
        chain
    }

    pub fn push(&mut self, rule: Box<dyn ConnectionRule>) {
        self.rules.push(rule);
        self.rules.sort_by_key(|rule| Reverse(rule.priority()));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The first rule that decides wins; otherwise sockets must match.
    pub fn can_connect(&self, connection: &ProposedConnection<'_>) -> bool {
        for rule in &self.rules {
            match rule.evaluate(connection) {
                ConnectionResult::Allow => return true,
                ConnectionResult::Deny => return false,
                ConnectionResult::Passthrough => {}
            }
        }
        connection.sockets_match()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Axis, Bounds, Direction, Vec3};
    use crate::library::{DoorwaySpec, TilePrefab};
    use crate::types::PrefabId;

    fn template(name: &str, tags: &[&str], socket: &str) -> TileTemplate {
        let bounds = Bounds::from_corners(Vec3::ZERO, Vec3::new(2.0, 2.0, 2.0));
        let prefab = TilePrefab::new(name, bounds)
            .with_doorway(
                DoorwaySpec::new(Vec3::new(2.0, 0.0, 1.0), Direction::PosX).with_socket(socket),
            )
            .with_tags(Tags::new(tags.iter().copied()));
        TileTemplate::from_prefab(PrefabId(0), &prefab, Axis::Y)
    }

    fn propose<'a>(a: &'a TileTemplate, b: &'a TileTemplate) -> ProposedConnection<'a> {
        ProposedConnection {
            previous_tile: a,
            previous_doorway: &a.doorways[0],
            next_tile: b,
            next_doorway: &b.doorways[0],
        }
    }

    struct Fixed(i32, ConnectionResult);

    impl ConnectionRule for Fixed {
        fn priority(&self) -> i32 {
            self.0
        }

        fn evaluate(&self, _connection: &ProposedConnection<'_>) -> ConnectionResult {
            self.1
        }
    }

    #[test]
    fn empty_chain_falls_back_to_socket_equality() {
        let chain = RuleChain::default();
        let a = template("a", &[], "default");
        let b = template("b", &[], "default");
        let wide = template("wide", &[], "wide");
        assert!(chain.can_connect(&propose(&a, &b)));
        assert!(!chain.can_connect(&propose(&a, &wide)));
    }

    #[test]
    fn socket_pair_rule_allows_mismatched_sockets() {
        let chain = RuleChain::from_specs(&[ConnectionRuleSpec::SocketPair {
            priority: 0,
            a: "wide".to_string(),
            b: "default".to_string(),
        }]);
        let a = template("a", &[], "default");
        let wide = template("wide", &[], "wide");
        assert!(chain.can_connect(&propose(&a, &wide)));
        assert!(chain.can_connect(&propose(&wide, &a)));
    }

    #[test]
    fn tag_pair_modes_accept_and_reject() {
        let pairs = vec![TagPair::new("cave", "castle")];
        let accept = RuleChain::from_specs(&[ConnectionRuleSpec::TilePairTags {
            priority: 0,
            mode: TagPairMode::Accept,
            pairs: pairs.clone(),
        }]);
        let reject = RuleChain::from_specs(&[ConnectionRuleSpec::TilePairTags {
            priority: 0,
            mode: TagPairMode::Reject,
            pairs,
        }]);
        let cave = template("cave", &["cave"], "default");
        let castle = template("castle", &["castle"], "default");
        let plain = template("plain", &[], "default");

        assert!(accept.can_connect(&propose(&castle, &cave)));
        assert!(!accept.can_connect(&propose(&plain, &cave)));
        assert!(!reject.can_connect(&propose(&cave, &castle)));
        assert!(reject.can_connect(&propose(&plain, &cave)));
    }

    #[test]
    fn higher_priority_rules_decide_first() {
        let mut chain = RuleChain::default();
        chain.push(Box::new(Fixed(1, ConnectionResult::Deny)));
        chain.push(Box::new(Fixed(5, ConnectionResult::Allow)));
        chain.push(Box::new(Fixed(9, ConnectionResult::Passthrough)));
        let a = template("a", &[], "default");
        let wide = template("wide", &[], "wide");
        assert_eq!(chain.len(), 3);
        assert!(chain.can_connect(&propose(&a, &wide)));
    }
}
