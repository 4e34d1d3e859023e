use std::fmt;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Population variance of the targets that reached a node.
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Variance(f64);

impl Variance {
    /// Create a new variance value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Compute the population variance of the targets selected by `indices`.
    ///
    /// Uses a two-pass mean-then-deviation sum so that near-constant targets
    /// do not lose precision. Returns zero for an empty selection.
    pub(crate) fn of(targets: &[f64], indices: &[usize]) -> Self {
        if indices.is_empty() {
            return Self(0.0);
        }
        let n = indices.len() as f64;
        let mean = indices.iter().map(|&i| targets[i]).sum::<f64>() / n;
        let ss = indices
            .iter()
            .map(|&i| {
                let d = targets[i] - mean;
                d * d
            })
            .sum::<f64>();
        Self(ss / n)
    }

    /// Return the raw variance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Variance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a regression tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`] rather than pointers. Each arena belongs to exactly one
/// tree, so every child is owned by exactly one parent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Threshold value: samples with feature <= threshold go left.
        threshold: f64,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Target variance at this node before splitting.
        variance: Variance,
        /// Number of training samples that reached this node.
        n_samples: usize,
        /// Parent variance minus the weighted child variance.
        variance_reduction: f64,
    },
    /// A terminal leaf node.
    Leaf {
        /// Mean target of the training samples in this leaf.
        value: f64,
        /// Target variance at this leaf.
        variance: Variance,
        /// Number of training samples in this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Return the target variance at this node (before splitting for interior nodes).
    #[must_use]
    pub fn variance(&self) -> Variance {
        match self {
            Node::Split { variance, .. } | Node::Leaf { variance, .. } => *variance,
        }
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}
