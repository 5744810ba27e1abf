//! Union-find over arbitrary hashable keys.

use std::collections::HashMap;
use std::hash::Hash;

/// Disjoint sets with union by rank. `find` compresses paths as it goes;
/// `find_root` leaves the structure untouched for read-only callers.
#[derive(Debug, Clone)]
pub struct DisjointSet<K> {
    index: HashMap<K, usize>,
    keys: Vec<K>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl<K> Default for DisjointSet<K> {
    fn default() -> Self {
        DisjointSet {
            index: HashMap::new(),
            keys: Vec::new(),
            parent: Vec::new(),
            rank: Vec::new(),
        }
    }
}

impl<K: Clone + Eq + Hash> DisjointSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.keys.iter()
    }

    /// Index of `key`, adding it as a singleton set if it is new.
    pub fn insert(&mut self, key: K) -> usize {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.keys.len();
        self.index.insert(key.clone(), id);
        self.keys.push(key);
        self.parent.push(id);
        self.rank.push(0);
        id
    }

    pub fn find(&mut self, key: &K) -> Option<usize> {
        let id = *self.index.get(key)?;
        Some(self.find_id(id))
    }

    fn find_id(&mut self, mut id: usize) -> usize {
        while self.parent[id] != id {
            // Path halving
            self.parent[id] = self.parent[self.parent[id]];
            id = self.parent[id];
        }
        id
    }

    pub fn find_root(&self, key: &K) -> Option<usize> {
        let mut id = *self.index.get(key)?;
        while self.parent[id] != id {
            id = self.parent[id];
        }
        Some(id)
    }

    /// Merge the sets holding `a` and `b`, inserting either if missing.
    /// Returns `(root, absorbed)`, where `absorbed` is the root that stopped
    /// being one, if the sets were distinct.
    pub fn union(&mut self, a: K, b: K) -> (usize, Option<usize>) {
        let a = self.insert(a);
        let b = self.insert(b);
        let ra = self.find_id(a);
        let rb = self.find_id(b);
        if ra == rb {
            return (ra, None);
        }
        let (root, child) = match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => (rb, ra),
            std::cmp::Ordering::Greater => (ra, rb),
            std::cmp::Ordering::Equal => {
                self.rank[ra] += 1;
                (ra, rb)
            }
        };
        self.parent[child] = root;
        (root, Some(child))
    }

    pub fn same_set(&self, a: &K, b: &K) -> bool {
        match (self.find_root(a), self.find_root(b)) {
            (Some(ra), Some(rb)) => ra == rb,
            _ => false,
        }
    }

    /// Current set representatives.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.parent.len()).filter(move |&id| self.parent[id] == id)
    }

    /// Members of the set rooted at `root`, in insertion order.
    pub fn members(&self, root: usize) -> impl Iterator<Item = &K> + '_ {
        self.keys
            .iter()
            .enumerate()
            .filter(move |(id, _)| self.root_of(*id) == root)
            .map(|(_, key)| key)
    }

    fn root_of(&self, mut id: usize) -> usize {
        while self.parent[id] != id {
            id = self.parent[id];
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_are_disjoint() {
        let mut set = DisjointSet::new();
        set.insert("a");
        set.insert("b");
        assert!(!set.same_set(&"a", &"b"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn union_is_transitive() {
        let mut set = DisjointSet::new();
        set.union("a", "b");
        set.union("c", "d");
        assert!(!set.same_set(&"a", &"d"));
        set.union("b", "c");
        assert!(set.same_set(&"a", &"d"));
        assert_eq!(set.find(&"a"), set.find(&"d"));
    }

    #[test]
    fn union_reports_absorbed_root() {
        let mut set = DisjointSet::new();
        let (_, absorbed) = set.union(1, 2);
        assert!(absorbed.is_some());
        let (_, absorbed) = set.union(2, 1);
        assert_eq!(absorbed, None);
    }

    #[test]
    fn members_in_insertion_order() {
        let mut set = DisjointSet::new();
        set.union("x", "y");
        set.insert("z");
        set.union("w", "x");
        let root = set.find_root(&"w").unwrap();
        let members: Vec<_> = set.members(root).copied().collect();
        assert_eq!(members, vec!["x", "y", "w"]);
    }

    #[test]
    fn unknown_keys_have_no_root() {
        let set: DisjointSet<&str> = DisjointSet::new();
        assert_eq!(set.find_root(&"nope"), None);
        assert!(!set.same_set(&"nope", &"nope"));
    }
}
