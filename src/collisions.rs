use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What happens when two entities meet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CollisionType {
    Bump,
    Push,
    Custom(String),
}

impl From<String> for CollisionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "bump" => CollisionType::Bump,
            "push" => CollisionType::Push,
            _ => CollisionType::Custom(s),
        }
    }
}

impl From<CollisionType> for String {
    fn from(t: CollisionType) -> Self {
        match t {
            CollisionType::Bump => "bump".to_string(),
            CollisionType::Push => "push".to_string(),
            CollisionType::Custom(s) => s,
        }
    }
}

/// One `[a, b, type]` rule as authored in the pusher/merger editors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionRule(pub String, pub String, pub CollisionType);

/// Sparse pair lookup. Pairs are unordered: `(a, b)` and `(b, a)` share one
/// entry, stored under the lexicographically smaller id first.
#[derive(Resource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CollisionRule>", into = "Vec<CollisionRule>")]
pub struct CollisionTable {
    entries: HashMap<String, HashMap<String, CollisionType>>,
}

fn canonical<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl CollisionTable {
    pub fn lookup(&self, a: &str, b: &str) -> Option<&CollisionType> {
        let (first, second) = canonical(a, b);
        self.entries.get(first)?.get(second)
    }

    /// Insert or overwrite; returns the previous type for the pair.
    pub fn set(&mut self, a: &str, b: &str, kind: CollisionType) -> Option<CollisionType> {
        let (first, second) = canonical(a, b);
        self.entries
            .entry(first.to_string())
            .or_default()
            .insert(second.to_string(), kind)
    }

    pub fn remove(&mut self, a: &str, b: &str) -> Option<CollisionType> {
        let (first, second) = canonical(a, b);
        let inner = self.entries.get_mut(first)?;
        let removed = inner.remove(second);
        if inner.is_empty() {
            self.entries.remove(first);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All rules, sorted for stable output.
    pub fn rules(&self) -> Vec<CollisionRule> {
        let mut rules: Vec<CollisionRule> = self
            .entries
            .iter()
            .flat_map(|(a, inner)| {
                inner
                    .iter()
                    .map(move |(b, t)| CollisionRule(a.clone(), b.clone(), t.clone()))
            })
            .collect();
        rules.sort_by(|x, y| (&x.0, &x.1).cmp(&(&y.0, &y.1)));
        rules
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl From<Vec<CollisionRule>> for CollisionTable {
    fn from(rules: Vec<CollisionRule>) -> Self {
        let mut table = CollisionTable::default();
        for CollisionRule(a, b, kind) in rules {
            table.set(&a, &b, kind);
        }
        table
    }
}

impl From<CollisionTable> for Vec<CollisionRule> {
    fn from(table: CollisionTable) -> Self {
        table.rules()
    }
}
