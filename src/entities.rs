use serde::{Deserialize, Serialize};

use crate::error::BoardError;
use crate::inventory::{Effector, Inventory};
use crate::sequence::SequenceStep;

/// Hit points. `max` tracks the highest `current` ever reached and never drops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hp {
    pub current: i32,
    pub max: i32,
}

impl Hp {
    pub fn new(points: i32) -> Self {
        Self {
            current: points,
            max: points,
        }
    }

    pub fn add(&mut self, points: i32) {
        self.current = self.current.saturating_add(points);
        if self.current > self.max {
            self.max = self.current;
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }
}

/// Anything placed on the board. Optional parts exist only when supplied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub emoji: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Inventory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp: Option<Hp>,
}

impl EntityDef {
    pub fn new(emoji: impl Into<String>, inventory: Option<Inventory>, hp_points: Option<i32>) -> Self {
        Self {
            emoji: emoji.into(),
            inventory,
            // zero points means "no hp", same as leaving it out
            hp: hp_points.filter(|p| *p != 0).map(Hp::new),
        }
    }
}

/// Transform into `to` once hp crosses `at`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Evolve {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub at: i32,
}

impl Evolve {
    pub fn is_set(&self) -> bool {
        !self.to.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Devolve {
    #[serde(default)]
    pub to: String,
}

impl Devolve {
    pub fn is_set(&self) -> bool {
        !self.to.is_empty()
    }
}

/// What an interactable leaves behind. Serialized as `[item, amount]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Drops(pub String, pub u32);

impl Drops {
    pub fn item(&self) -> Option<Effector> {
        if self.0.is_empty() {
            return None;
        }
        Some(if self.1 == 0 {
            Effector::infinite(self.0.clone())
        } else {
            Effector::finite(self.0.clone(), self.1 as i32)
        })
    }
}

/// Who a side effect applies to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SideEffectTarget {
    Any,
    Emoji(String),
}

impl SideEffectTarget {
    pub fn matches(&self, emoji: &str) -> bool {
        match self {
            SideEffectTarget::Any => true,
            SideEffectTarget::Emoji(e) => e == emoji,
        }
    }
}

impl From<String> for SideEffectTarget {
    fn from(s: String) -> Self {
        if s == "any" {
            SideEffectTarget::Any
        } else {
            SideEffectTarget::Emoji(s)
        }
    }
}

impl From<SideEffectTarget> for String {
    fn from(t: SideEffectTarget) -> Self {
        match t {
            SideEffectTarget::Any => "any".to_string(),
            SideEffectTarget::Emoji(e) => e,
        }
    }
}

/// Hp delta, or `"talk"` for a dialogue-only interaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum SideEffectMagnitude {
    Points(i32),
    Talk,
}

impl TryFrom<serde_json::Value> for SideEffectMagnitude {
    type Error = String;

    fn try_from(v: serde_json::Value) -> Result<Self, Self::Error> {
        match v {
            serde_json::Value::String(s) if s == "talk" => Ok(SideEffectMagnitude::Talk),
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(SideEffectMagnitude::Points)
                .ok_or_else(|| format!("side effect magnitude {n} is not an integer")),
            other => Err(format!("expected a number or \"talk\", got {other}")),
        }
    }
}

impl From<SideEffectMagnitude> for serde_json::Value {
    fn from(m: SideEffectMagnitude) -> Self {
        match m {
            SideEffectMagnitude::Points(p) => serde_json::json!(p),
            SideEffectMagnitude::Talk => serde_json::json!("talk"),
        }
    }
}

/// `(target, magnitude)` applied when the player interacts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffect(pub SideEffectTarget, pub SideEffectMagnitude);

/// World object the player can strike to run its sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interactable {
    pub emoji: String,
    #[serde(default)]
    pub sequence: Vec<SequenceStep>,
    /// Older files point at a stored event instead of carrying steps. Read
    /// only; loading a level copies that event's steps into `sequence`.
    #[serde(default, rename = "eventId", alias = "eventID", skip_serializing)]
    pub legacy_event: Option<String>,
    pub hp: i32,
    #[serde(default)]
    pub side_effects: Vec<SideEffect>,
    #[serde(default)]
    pub evolve: Evolve,
    #[serde(default)]
    pub devolve: Devolve,
    #[serde(default)]
    pub drops: Drops,
}

impl Interactable {
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.emoji.is_empty() {
            return Err(BoardError::config("interactable needs an emoji"));
        }
        if self.hp <= 0 {
            return Err(BoardError::config(format!(
                "interactable '{}' must start with positive hp, got {}",
                self.emoji, self.hp
            )));
        }
        Ok(())
    }
}

/// Actor the player can become.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Controllable {
    pub emoji: String,
    pub hp: i32,
    #[serde(default)]
    pub side_effects: Vec<SideEffect>,
    #[serde(default)]
    pub evolve: Evolve,
    #[serde(default)]
    pub devolve: Devolve,
}

impl Controllable {
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.emoji.is_empty() {
            return Err(BoardError::config("controllable needs an emoji"));
        }
        if self.hp <= 0 {
            return Err(BoardError::config(format!(
                "controllable '{}' must start with positive hp, got {}",
                self.emoji, self.hp
            )));
        }
        Ok(())
    }

    /// Emoji the actor turns into at the given hp, if any rule fires.
    pub fn transform_for(&self, hp: &Hp) -> Option<&str> {
        if self.evolve.is_set() && hp.current >= self.evolve.at {
            return Some(&self.evolve.to);
        }
        if self.devolve.is_set() && hp.is_depleted() {
            return Some(&self.devolve.to);
        }
        None
    }
}

/// Fires `event_id` when an `a` entity bumps into `b`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub a: String,
    /// `"any"` matches every entity.
    pub b: SideEffectTarget,
    pub event_id: String,
}

impl Condition {
    pub fn matches(&self, a: &str, b: &str) -> bool {
        self.a == a && self.b.matches(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hp_max_tracks_running_maximum() {
        let mut hp = Hp::new(3);
        let mut running_max = 3;
        for delta in [2, -4, 1, 7, -10, 3] {
            hp.add(delta);
            running_max = running_max.max(hp.current);
            assert!(hp.current <= hp.max);
            assert_eq!(hp.max, running_max);
        }
        assert_eq!(hp.max, 9);
    }

    #[test]
    fn entity_optional_parts_only_when_given() {
        let bare = EntityDef::new("🌲", None, None);
        assert!(bare.hp.is_none());
        assert!(bare.inventory.is_none());

        let json = serde_json::to_value(&bare).expect("serialize");
        assert_eq!(json, serde_json::json!({ "emoji": "🌲" }));

        let with_hp = EntityDef::new("🐸", Some(Inventory::new()), Some(5));
        assert_eq!(with_hp.hp, Some(Hp::new(5)));
        assert!(with_hp.inventory.is_some());
    }

    #[test]
    fn interactable_parses_editor_shape() {
        let raw = serde_json::json!({
            "emoji": "🪨",
            "sequence": [{ "type": "spawn", "index": 2, "emoji": "🪵" }],
            "hp": 3,
            "sideEffects": [["any", -1], ["🧙", "talk"]],
            "evolve": { "to": "🪵", "at": 1 },
            "devolve": { "to": "" },
            "drops": ["💎", 2]
        });
        let parsed: Interactable = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(
            parsed.sequence,
            vec![SequenceStep::Spawn {
                index: 2,
                emoji: "🪵".into()
            }]
        );
        assert!(parsed.legacy_event.is_none());
        assert_eq!(
            parsed.side_effects,
            vec![
                SideEffect(SideEffectTarget::Any, SideEffectMagnitude::Points(-1)),
                SideEffect(
                    SideEffectTarget::Emoji("🧙".to_string()),
                    SideEffectMagnitude::Talk
                ),
            ]
        );
        assert!(parsed.evolve.is_set());
        assert!(!parsed.devolve.is_set());
        assert_eq!(parsed.drops.item(), Some(Effector::finite("💎", 2)));
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn legacy_event_key_is_read_but_not_written() {
        let raw = serde_json::json!({ "emoji": "🪨", "eventID": "4", "hp": 1 });
        let parsed: Interactable = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(parsed.legacy_event.as_deref(), Some("4"));
        let out = serde_json::to_value(&parsed).expect("serialize");
        assert!(out.get("eventId").is_none());
        assert_eq!(out["sequence"], serde_json::json!([]));
    }

    #[test]
    fn side_effect_rejects_unknown_magnitude() {
        let raw = serde_json::json!(["any", "shout"]);
        assert!(serde_json::from_value::<SideEffect>(raw).is_err());
    }

    #[test]
    fn definitions_reject_non_positive_hp() {
        let interactable = Interactable {
            emoji: "🪨".to_string(),
            sequence: vec![],
            legacy_event: None,
            hp: 0,
            side_effects: vec![],
            evolve: Evolve::default(),
            devolve: Devolve::default(),
            drops: Drops::default(),
        };
        assert!(matches!(
            interactable.validate(),
            Err(BoardError::Configuration(_))
        ));

        let controllable = Controllable {
            emoji: "🧙".to_string(),
            hp: -2,
            side_effects: vec![],
            evolve: Evolve::default(),
            devolve: Devolve::default(),
        };
        assert!(controllable.validate().is_err());
    }

    #[test]
    fn controllable_transforms_on_thresholds() {
        let ctrl = Controllable {
            emoji: "🐛".to_string(),
            hp: 2,
            side_effects: vec![],
            evolve: Evolve {
                to: "🦋".to_string(),
                at: 5,
            },
            devolve: Devolve {
                to: "🥚".to_string(),
            },
        };
        let mut hp = Hp::new(2);
        assert_eq!(ctrl.transform_for(&hp), None);
        hp.add(3);
        assert_eq!(ctrl.transform_for(&hp), Some("🦋"));
        hp.add(-5);
        assert_eq!(ctrl.transform_for(&hp), Some("🥚"));
    }

    #[test]
    fn condition_matches_specific_or_any() {
        let c: Condition =
            serde_json::from_str(r#"{"a":"🐸","b":"any","eventId":"3"}"#).unwrap();
        assert!(c.matches("🐸", "🪷"));
        assert!(!c.matches("🐟", "🪷"));
        let c = Condition {
            b: SideEffectTarget::Emoji("🪷".into()),
            ..c
        };
        assert!(c.matches("🐸", "🪷"));
        assert!(!c.matches("🐸", "🪨"));
    }
}
