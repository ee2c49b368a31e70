use std::collections::{BTreeMap, BTreeSet};
use std::mem;

#[derive(Debug, Clone, PartialEq)]
enum Slot<V> {
    Set(V),
    Removed,
}

/// An ordered map with copy-on-write child layers.
///
/// Reads fall through to the parent layers, writes always land in
/// the topmost one. Removing an inherited key leaves a tombstone.
#[derive(Debug, Clone)]
pub struct Layer<K: Ord, V> {
    parent: Option<Box<Layer<K, V>>>,
    data: BTreeMap<K, Slot<V>>,
}

impl<K: Ord, V> Default for Layer<K, V> {
    fn default() -> Self {
        Self {
            parent: None,
            data: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, V: Clone> Layer<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layers above the root one.
    pub fn depth(&self) -> usize {
        match self.parent {
            Some(ref parent) => parent.depth() + 1,
            None => 0,
        }
    }

    pub fn push(&mut self) {
        let parent = mem::take(self);
        self.parent = Some(Box::new(parent));
    }

    /// Drops the topmost layer. Returns `false` if there was nothing to drop.
    pub fn pop(&mut self) -> bool {
        match self.parent.take() {
            Some(parent) => {
                *self = *parent;
                true
            }
            None => false,
        }
    }

    /// Merges the topmost layer into its parent.
    pub fn commit(&mut self) -> bool {
        let mut parent = match self.parent.take() {
            Some(parent) => parent,
            None => return false,
        };
        for (key, slot) in mem::take(&mut self.data) {
            match slot {
                Slot::Set(value) => parent.insert(key, value),
                Slot::Removed => {
                    parent.remove(&key);
                }
            }
        }
        *self = *parent;
        true
    }

    pub fn get_opt(&self, key: &K) -> Option<&V> {
        match self.data.get(key) {
            Some(Slot::Set(value)) => Some(value),
            Some(Slot::Removed) => None,
            None => self.parent.as_ref().and_then(|parent| parent.get_opt(key)),
        }
    }

    /// Copies an inherited value into the topmost layer before handing it out.
    pub fn get_opt_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.data.contains_key(key) {
            let inherited = self
                .parent
                .as_ref()
                .and_then(|parent| parent.get_opt(key))
                .cloned()?;
            self.data.insert(key.clone(), Slot::Set(inherited));
        }
        match self.data.get_mut(key) {
            Some(Slot::Set(value)) => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get_opt(key).is_some()
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.data.insert(key, Slot::Set(value));
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.get_opt(key).cloned();
        let inherited = self
            .parent
            .as_ref()
            .map_or(false, |parent| parent.contains(key));
        if inherited {
            self.data.insert(key.clone(), Slot::Removed);
        } else {
            self.data.remove(key);
        }
        removed
    }

    /// All visible keys in ascending order.
    pub fn keys(&self) -> Vec<K> {
        let mut keys = BTreeSet::new();
        self.collect_keys(&mut keys);
        keys.into_iter().collect()
    }

    fn collect_keys(&self, keys: &mut BTreeSet<K>) {
        if let Some(ref parent) = self.parent {
            parent.collect_keys(keys);
        }
        for (key, slot) in &self.data {
            match slot {
                Slot::Set(_) => {
                    keys.insert(key.clone());
                }
                Slot::Removed => {
                    keys.remove(key);
                }
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            layer: self,
            keys: self.keys().into_iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct Iter<'a, K: Ord, V> {
    layer: &'a Layer<K, V>,
    keys: std::vec::IntoIter<K>,
}

impl<'a, K: Ord + Clone, V: Clone> Iterator for Iter<'a, K, V> {
    type Item = (K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let layer = self.layer;
        for key in &mut self.keys {
            if let Some(value) = layer.get_opt(&key) {
                return Some((key, value));
            }
        }
        None
    }
}

/// A single value with the same push/pop/commit discipline as `Layer`.
#[derive(Debug, Clone)]
pub struct Stacked<T> {
    parent: Option<Box<Stacked<T>>>,
    value: T,
}

impl<T: Clone> Stacked<T> {
    pub fn new(value: T) -> Self {
        Self {
            parent: None,
            value,
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn depth(&self) -> usize {
        match self.parent {
            Some(ref parent) => parent.depth() + 1,
            None => 0,
        }
    }

    pub fn push(&mut self) {
        let child = Stacked::new(self.value.clone());
        let parent = mem::replace(self, child);
        self.parent = Some(Box::new(parent));
    }

    pub fn pop(&mut self) -> bool {
        match self.parent.take() {
            Some(parent) => {
                *self = *parent;
                true
            }
            None => false,
        }
    }

    pub fn commit(&mut self) -> bool {
        match self.parent.take() {
            Some(parent) => {
                self.parent = parent.parent;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Layer, Stacked};

    fn basic_layer() -> Layer<i32, &'static str> {
        let mut layer = Layer::new();
        layer.insert(1, "one");
        layer.insert(2, "two");
        layer
    }

    #[test]
    fn reads_fall_through() {
        let mut layer = basic_layer();
        layer.push();
        assert_eq!(layer.depth(), 1);
        assert_eq!(layer.get_opt(&1), Some(&"one"));
        assert_eq!(layer.keys(), vec![1, 2]);
    }

    #[test]
    fn pop_discards_writes() {
        let mut layer = basic_layer();
        layer.push();
        layer.insert(3, "three");
        layer.remove(&1);
        *layer.get_opt_mut(&2).unwrap() = "TWO";
        assert_eq!(layer.keys(), vec![2, 3]);
        assert!(layer.pop());
        assert_eq!(layer.keys(), vec![1, 2]);
        assert_eq!(layer.get_opt(&2), Some(&"two"));
        assert!(!layer.pop());
    }

    #[test]
    fn commit_merges_writes() {
        let mut layer = basic_layer();
        layer.push();
        layer.insert(3, "three");
        layer.remove(&1);
        *layer.get_opt_mut(&2).unwrap() = "TWO";
        assert!(layer.commit());
        assert_eq!(layer.depth(), 0);
        let items: Vec<_> = layer.iter().collect();
        assert_eq!(items, vec![(2, &"TWO"), (3, &"three")]);
    }

    #[test]
    fn remove_then_reinsert() {
        let mut layer = basic_layer();
        layer.push();
        assert_eq!(layer.remove(&1), Some("one"));
        assert!(layer.get_opt_mut(&1).is_none());
        layer.insert(1, "uno");
        assert_eq!(layer.get_opt(&1), Some(&"uno"));
        layer.pop();
        assert_eq!(layer.get_opt(&1), Some(&"one"));
    }

    #[test]
    fn nested_layers() {
        let mut layer = basic_layer();
        layer.push();
        layer.insert(3, "three");
        layer.push();
        layer.remove(&3);
        assert_eq!(layer.len(), 2);
        layer.commit();
        assert_eq!(layer.len(), 2);
        layer.pop();
        assert_eq!(layer.keys(), vec![1, 2]);
    }

    #[test]
    fn stacked_value() {
        let mut turn = Stacked::new(1);
        turn.push();
        *turn.get_mut() = 2;
        assert_eq!(turn.depth(), 1);
        turn.pop();
        assert_eq!(*turn.get(), 1);
        turn.push();
        *turn.get_mut() = 3;
        turn.commit();
        assert_eq!(*turn.get(), 3);
        assert_eq!(turn.depth(), 0);
    }
}
