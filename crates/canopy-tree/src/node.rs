use std::fmt;

/// Zero-based feature column index as reported by the training process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    #[must_use]
    pub const fn new(index: usize) -> Self {
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
    /// The root of every tree sits at arena position 0.
    pub const ROOT: NodeIndex = NodeIndex(0);

    /// Create a new node index from a zero-based arena position.
    #[must_use]
    pub const fn new(index: usize) -> Self {
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

/// Criterion-agnostic impurity value.
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    /// Create a new impurity value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// One axis of the 2D feature space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Feature 0, the horizontal axis.
    X,
    /// Feature 1, the vertical axis.
    Y,
}

impl Axis {
    /// Map a feature index onto an axis. Only features 0 and 1 exist in 2D.
    #[must_use]
    pub fn from_feature(feature: FeatureIndex) -> Option<Self> {
        match feature.index() {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            _ => None,
        }
    }

    /// Return the feature index this axis corresponds to.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }

    /// Short lowercase label used in error messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
        }
    }
}

/// A node in a trained decision tree arena.
///
/// The layout follows the flat per-node arrays exported by common CART
/// implementations: a leaf flag, optional split fields, and optional child
/// links. Nothing here is checked on construction; structural and numeric
/// problems surface from [`DecisionTree::validate`](crate::DecisionTree::validate).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub(crate) is_leaf: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) feature: Option<FeatureIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) left: Option<NodeIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) right: Option<NodeIndex>,
    pub(crate) impurity: Impurity,
    pub(crate) n_samples: usize,
    pub(crate) value: Vec<f64>,
}

impl Node {
    /// Create a terminal leaf.
    ///
    /// `value` holds per-class weighted counts for classification or a
    /// single mean target for regression.
    #[must_use]
    pub fn leaf(impurity: f64, n_samples: usize, value: Vec<f64>) -> Self {
        Self {
            is_leaf: true,
            feature: None,
            threshold: None,
            left: None,
            right: None,
            impurity: Impurity::new(impurity),
            n_samples,
            value,
        }
    }

    /// Create an internal split node.
    ///
    /// Samples with `feature <= threshold` go to `left`.
    #[must_use]
    pub fn split(
        feature: usize,
        threshold: f64,
        left: NodeIndex,
        right: NodeIndex,
        impurity: f64,
        n_samples: usize,
        value: Vec<f64>,
    ) -> Self {
        Self {
            is_leaf: false,
            feature: Some(FeatureIndex::new(feature)),
            threshold: Some(threshold),
            left: Some(left),
            right: Some(right),
            impurity: Impurity::new(impurity),
            n_samples,
            value,
        }
    }

    /// Return `true` if this node is flagged as a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// Return the split feature, if any.
    #[must_use]
    pub fn feature(&self) -> Option<FeatureIndex> {
        self.feature
    }

    /// Return the split threshold, if any.
    #[must_use]
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    /// Return the left child link, if any.
    #[must_use]
    pub fn left(&self) -> Option<NodeIndex> {
        self.left
    }

    /// Return the right child link, if any.
    #[must_use]
    pub fn right(&self) -> Option<NodeIndex> {
        self.right
    }

    /// Return the impurity reported by the training criterion.
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        self.impurity
    }

    /// Return the number of training samples that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Return the class weights (classification) or the single mean target (regression).
    #[must_use]
    pub fn value(&self) -> &[f64] {
        &self.value
    }
}
