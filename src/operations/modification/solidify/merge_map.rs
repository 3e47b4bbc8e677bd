/// Forward map from every vertex to the canonical vertex it is welded into.
///
/// The canonical vertex of a class is always its smallest member, and
/// `canonical` of a canonical vertex is the vertex itself.
#[derive(Debug, Clone)]
pub struct VertexMergeMap {
    map: Vec<usize>,
    /// Members per canonical vertex; empty for welded-away vertices.
    members: Vec<Vec<usize>>,
}

impl VertexMergeMap {
    /// Creates the identity map over `len` vertices.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            map: (0..len).collect(),
            members: (0..len).map(|v| vec![v]).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The canonical vertex of `v`.
    #[must_use]
    pub fn canonical(&self, v: usize) -> usize {
        self.map[v]
    }

    #[must_use]
    pub fn is_canonical(&self, v: usize) -> bool {
        self.map[v] == v
    }

    /// All vertices mapped onto the canonical vertex `v`.
    #[must_use]
    pub fn members(&self, v: usize) -> &[usize] {
        &self.members[v]
    }

    /// Number of vertices welded into `v` besides itself.
    #[must_use]
    pub fn absorbed(&self, v: usize) -> usize {
        self.members[v].len().saturating_sub(1)
    }

    /// Welds the class of canonical vertex `drop` into canonical vertex `keep`.
    ///
    /// Requires `keep < drop` so the smallest member stays canonical.
    pub fn merge(&mut self, keep: usize, drop: usize) {
        debug_assert!(keep < drop && self.is_canonical(keep) && self.is_canonical(drop));
        let moved = std::mem::take(&mut self.members[drop]);
        for &m in &moved {
            self.map[m] = keep;
        }
        self.members[keep].extend(moved);
    }

    /// The forward map as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_until_merged() {
        let map = VertexMergeMap::new(4);
        assert!((0..4).all(|v| map.canonical(v) == v));
        assert_eq!(map.absorbed(2), 0);
    }

    #[test]
    fn merge_moves_whole_class() {
        let mut map = VertexMergeMap::new(5);
        map.merge(3, 4);
        map.merge(1, 3);
        assert_eq!(map.canonical(4), 1);
        assert_eq!(map.canonical(3), 1);
        assert_eq!(map.absorbed(1), 2);
        assert!(map.members(3).is_empty());
    }

    #[test]
    fn canonical_is_idempotent() {
        let mut map = VertexMergeMap::new(6);
        map.merge(0, 5);
        map.merge(2, 3);
        map.merge(0, 2);
        for v in 0..6 {
            let c = map.canonical(v);
            assert_eq!(map.canonical(c), c);
        }
    }
}
