/// Read access to per-vertex group weights.
pub trait VertexWeights {
    /// Index of the group called `name`, if it exists.
    fn group_index(&self, name: &str) -> Option<usize>;

    /// Weight of `vertex` in `group`, `0.0` when the vertex is not a member.
    fn weight(&self, vertex: usize, group: usize) -> f64;
}

/// Named vertex groups with sparse per-vertex membership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexGroups {
    names: Vec<String>,
    /// `(group, weight)` pairs per vertex.
    members: Vec<Vec<(usize, f64)>>,
}

impl VertexGroups {
    /// Creates storage for `vertex_count` vertices and no groups.
    #[must_use]
    pub fn new(vertex_count: usize) -> Self {
        Self {
            names: Vec::new(),
            members: vec![Vec::new(); vertex_count],
        }
    }

    /// Adds a group, or returns the index of an existing group with that name.
    pub fn add_group(&mut self, name: impl Into<String>) -> usize {
        let name = name.into();
        if let Some(index) = self.group_index(&name) {
            return index;
        }
        self.names.push(name);
        self.names.len() - 1
    }

    /// Group names in index order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of vertices covered.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.members.len()
    }

    /// Sets the weight of `vertex` in `group`, adding the membership if needed.
    ///
    /// Out-of-range vertices are ignored.
    pub fn set_weight(&mut self, vertex: usize, group: usize, weight: f64) {
        let Some(entries) = self.members.get_mut(vertex) else {
            return;
        };
        if let Some(entry) = entries.iter_mut().find(|(g, _)| *g == group) {
            entry.1 = weight;
        } else {
            entries.push((group, weight));
        }
    }

    /// All memberships of `vertex`.
    #[must_use]
    pub fn memberships(&self, vertex: usize) -> &[(usize, f64)] {
        self.members.get(vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Builds groups for a new mesh whose vertex `i` copies the memberships of
    /// `sources[i]` in `self`.
    #[must_use]
    pub fn remapped(&self, sources: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            members: sources
                .iter()
                .map(|&src| self.memberships(src).to_vec())
                .collect(),
        }
    }
}

impl VertexWeights for VertexGroups {
    fn group_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn weight(&self, vertex: usize, group: usize) -> f64 {
        self.memberships(vertex)
            .iter()
            .find(|(g, _)| *g == group)
            .map_or(0.0, |(_, w)| *w)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_membership_weighs_zero() {
        let mut groups = VertexGroups::new(3);
        let g = groups.add_group("thick");
        groups.set_weight(1, g, 0.75);
        assert!((groups.weight(1, g) - 0.75).abs() < 1e-12);
        assert!(groups.weight(0, g).abs() < 1e-12);
        assert!(groups.weight(7, g).abs() < 1e-12);
    }

    #[test]
    fn add_group_is_idempotent_by_name() {
        let mut groups = VertexGroups::new(1);
        let a = groups.add_group("a");
        let b = groups.add_group("b");
        assert_eq!(groups.add_group("a"), a);
        assert_eq!(groups.group_index("b"), Some(b));
        assert_eq!(groups.group_index("c"), None);
    }

    #[test]
    fn set_weight_overwrites() {
        let mut groups = VertexGroups::new(1);
        let g = groups.add_group("a");
        groups.set_weight(0, g, 0.2);
        groups.set_weight(0, g, 1.0);
        assert_eq!(groups.memberships(0).len(), 1);
        assert!((groups.weight(0, g) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn remap_copies_source_memberships() {
        let mut groups = VertexGroups::new(2);
        let g = groups.add_group("a");
        groups.set_weight(1, g, 0.5);
        let remapped = groups.remapped(&[1, 1, 0]);
        assert_eq!(remapped.vertex_count(), 3);
        assert!((remapped.weight(0, g) - 0.5).abs() < 1e-12);
        assert!((remapped.weight(1, g) - 0.5).abs() < 1e-12);
        assert!(remapped.weight(2, g).abs() < 1e-12);
    }
}
