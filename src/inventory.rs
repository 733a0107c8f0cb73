use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::BoardError;

/// Charges left on an effector. `"Infinite"` never depletes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum EffectorHp {
    Finite(i32),
    Infinite,
}

impl TryFrom<serde_json::Value> for EffectorHp {
    type Error = String;

    fn try_from(v: serde_json::Value) -> Result<Self, Self::Error> {
        match v {
            serde_json::Value::String(s) if s == "Infinite" => Ok(EffectorHp::Infinite),
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(EffectorHp::Finite)
                .ok_or_else(|| format!("effector hp {n} is not an integer")),
            other => Err(format!("expected a number or \"Infinite\", got {other}")),
        }
    }
}

impl From<EffectorHp> for serde_json::Value {
    fn from(hp: EffectorHp) -> Self {
        match hp {
            EffectorHp::Finite(p) => serde_json::json!(p),
            EffectorHp::Infinite => serde_json::json!("Infinite"),
        }
    }
}

/// A consumable or equippable effect carried in an inventory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effector {
    pub emoji: String,
    pub hp: EffectorHp,
}

impl Effector {
    pub fn finite(emoji: impl Into<String>, hp: i32) -> Self {
        Self {
            emoji: emoji.into(),
            hp: EffectorHp::Finite(hp),
        }
    }

    pub fn infinite(emoji: impl Into<String>) -> Self {
        Self {
            emoji: emoji.into(),
            hp: EffectorHp::Infinite,
        }
    }

    /// Use one charge. Returns false once the effector is spent.
    pub fn consume(&mut self) -> bool {
        match &mut self.hp {
            EffectorHp::Infinite => true,
            EffectorHp::Finite(left) if *left > 0 => {
                *left -= 1;
                true
            }
            EffectorHp::Finite(_) => false,
        }
    }
}

/// Entity inventory keyed by slot number.
pub type Inventory = BTreeMap<u32, Effector>;

/// The player's fixed-size hot bar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInventory {
    pub slots: Vec<Option<Effector>>,
}

impl PlayerInventory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Put the item into the first empty slot and return that slot.
    pub fn add_item(&mut self, item: Effector) -> Result<usize, BoardError> {
        let capacity = self.capacity();
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(BoardError::InventoryFull { capacity })?;
        self.slots[slot] = Some(item);
        Ok(slot)
    }

    pub fn remove_item_at(&mut self, slot: usize) -> Option<Effector> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    /// Spend one charge of the item in `slot`, clearing the slot when spent.
    pub fn use_item_at(&mut self, slot: usize) -> Option<Effector> {
        let entry = self.slots.get_mut(slot)?;
        let item = entry.as_mut()?;
        let used = item.clone();
        if !item.consume() || item.hp == EffectorHp::Finite(0) {
            *entry = None;
        }
        Some(used)
    }

    pub fn as_map(&self) -> Inventory {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.clone().map(|e| (i as u32, e)))
            .collect()
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_item_fills_first_empty_slot_until_full() {
        let mut inv = PlayerInventory::with_capacity(2);
        assert_eq!(inv.add_item(Effector::infinite("🗡️")).unwrap(), 0);
        assert_eq!(inv.add_item(Effector::finite("🍎", 3)).unwrap(), 1);
        assert_eq!(
            inv.add_item(Effector::finite("🍌", 1)),
            Err(BoardError::InventoryFull { capacity: 2 })
        );

        inv.remove_item_at(0);
        assert_eq!(inv.add_item(Effector::finite("🍌", 1)).unwrap(), 0);
        let held: Vec<String> = inv.as_map().into_values().map(|e| e.emoji).collect();
        assert_eq!(held, vec!["🍌".to_string(), "🍎".to_string()]);
    }

    #[test]
    fn finite_effector_is_cleared_when_spent() {
        let mut inv = PlayerInventory::with_capacity(4);
        inv.add_item(Effector::finite("🍎", 2)).unwrap();
        inv.add_item(Effector::infinite("🛡️")).unwrap();

        assert!(inv.use_item_at(0).is_some());
        assert!(inv.slots[0].is_some());
        assert!(inv.use_item_at(0).is_some());
        assert!(inv.slots[0].is_none());

        for _ in 0..10 {
            assert!(inv.use_item_at(1).is_some());
        }
        assert!(inv.slots[1].is_some());
        assert!(inv.use_item_at(3).is_none());
    }

    #[test]
    fn effector_hp_serializes_like_the_editor() {
        let json = serde_json::to_value(Effector::infinite("🔥")).unwrap();
        assert_eq!(json, serde_json::json!({ "emoji": "🔥", "hp": "Infinite" }));
        let parsed: Effector =
            serde_json::from_value(serde_json::json!({ "emoji": "💧", "hp": 4 })).unwrap();
        assert_eq!(parsed, Effector::finite("💧", 4));
        assert!(serde_json::from_value::<Effector>(
            serde_json::json!({ "emoji": "💧", "hp": "lots" })
        )
        .is_err());
    }

    #[test]
    fn as_map_keeps_slot_numbers() {
        let mut inv = PlayerInventory::with_capacity(4);
        inv.slots[2] = Some(Effector::infinite("🔑"));
        let map = inv.as_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&2).map(|e| e.emoji.as_str()), Some("🔑"));
    }
}
