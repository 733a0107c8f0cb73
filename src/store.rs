use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type SubscriptionId = u64;

type Listener<T> = Box<dyn FnMut(&BTreeMap<String, T>) + Send + Sync>;

/// A map of values under generated keys. Every mutation hands the full
/// contents to each subscriber.
#[derive(Resource)]
pub struct KeyedStore<T: Send + Sync + 'static> {
    entries: BTreeMap<String, T>,
    next_key: u64,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
    next_subscription: SubscriptionId,
}

impl<T: Send + Sync + 'static> Default for KeyedStore<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_key: 1,
            listeners: Vec::new(),
            next_subscription: 1,
        }
    }
}

impl<T: Send + Sync + 'static> KeyedStore<T> {
    /// Rebuild from saved entries. New keys continue after the highest
    /// numeric key present.
    pub fn from_entries(entries: BTreeMap<String, T>) -> Self {
        let next_key = entries
            .keys()
            .filter_map(|k| k.parse::<u64>().ok())
            .max()
            .map_or(1, |k| k + 1);
        Self {
            entries,
            next_key,
            ..Default::default()
        }
    }

    /// Insert under a fresh key and return it. Keys never repeat.
    pub fn add(&mut self, value: T) -> String {
        let mut key = self.next_key.to_string();
        while self.entries.contains_key(&key) {
            self.next_key += 1;
            key = self.next_key.to_string();
        }
        self.next_key += 1;
        self.entries.insert(key.clone(), value);
        self.notify();
        key
    }

    pub fn update(&mut self, key: &str, value: T) {
        self.entries.insert(key.to_string(), value);
        self.notify();
    }

    pub fn remove(&mut self, key: &str) -> Option<T> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &T)> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &BTreeMap<String, T> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace all contents, keeping subscribers.
    pub fn replace(&mut self, entries: BTreeMap<String, T>) {
        let fresh = Self::from_entries(entries);
        self.entries = fresh.entries;
        self.next_key = fresh.next_key;
        self.notify();
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&BTreeMap<String, T>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener(&self.entries);
        }
    }
}

/// Colours offered in the paint picker.
#[derive(Resource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette(pub BTreeSet<String>);

impl ColorPalette {
    pub fn add_color(&mut self, color: &str) -> bool {
        !color.is_empty() && self.0.insert(color.to_string())
    }

    pub fn remove_color(&mut self, color: &str) -> bool {
        self.0.remove(color)
    }
}

/// Emoji that never move or interact.
#[derive(Resource, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Statics(pub BTreeSet<String>);

impl Statics {
    pub fn toggle(&mut self, emoji: &str, add: bool) {
        if emoji.is_empty() {
            return;
        }
        if add {
            self.0.insert(emoji.to_string());
        } else {
            self.0.remove(emoji);
        }
    }

    pub fn contains(&self, emoji: &str) -> bool {
        self.0.contains(emoji)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn add_generates_unique_keys() {
        let mut store = KeyedStore::<u32>::default();
        let keys: Vec<String> = (0..100).map(|i| store.add(i)).collect();
        let unique: BTreeSet<&String> = keys.iter().collect();
        assert_eq!(unique.len(), 100);
        assert_eq!(store.len(), 100);
    }

    #[test]
    fn keys_continue_after_restored_entries() {
        let mut saved = BTreeMap::new();
        saved.insert("7".to_string(), "seven");
        saved.insert("custom".to_string(), "named");
        let mut store = KeyedStore::from_entries(saved);
        assert_eq!(store.add("eight"), "8");

        store.update("9", "taken");
        assert_eq!(store.add("ten"), "10");
    }

    #[test]
    fn subscribers_see_every_mutation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut store = KeyedStore::<&'static str>::default();
        let sink = seen.clone();
        let sub = store.subscribe(move |entries| {
            sink.lock().unwrap().push(entries.len());
        });

        let key = store.add("a");
        store.add("b");
        store.update(&key, "a2");
        store.remove(&key);
        store.remove("missing");
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 2, 1]);

        assert!(store.unsubscribe(sub));
        store.add("c");
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[test]
    fn palette_ignores_empty_colors() {
        let mut palette = ColorPalette::default();
        assert!(!palette.add_color(""));
        assert!(palette.add_color("#ff00ff"));
        assert!(!palette.add_color("#ff00ff"));
        assert!(palette.remove_color("#ff00ff"));
        assert!(palette.0.is_empty());
    }

    #[test]
    fn statics_toggle() {
        let mut statics = Statics::default();
        statics.toggle("🧱", true);
        statics.toggle("", true);
        assert!(statics.contains("🧱"));
        assert_eq!(statics.0.len(), 1);
        statics.toggle("🧱", false);
        assert!(!statics.contains("🧱"));
    }
}
