use crate::node::NodeIndex;

/// Coarse classification of a [`TreeError`].
///
/// Every error aborts the whole call; the kind tells the caller whether the
/// tree itself, the requested bounds, or a numeric field was at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed node links, leaf/internal mismatch, or a bad feature index.
    InvalidTreeStructure,
    /// The starting bounding box has non-positive extent.
    DegenerateRange,
    /// Non-finite or out-of-domain numeric field.
    NumericAnomaly,
}

/// Errors from tree serialization and partition extraction.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Returned when the node arena is empty.
    #[error("tree has no nodes")]
    EmptyTree,

    /// Returned when an internal node is missing one or both child links.
    #[error("internal node {node} is missing its child links")]
    MissingChildren {
        /// The offending node.
        node: NodeIndex,
    },

    /// Returned when an internal node has no feature index or threshold.
    #[error("internal node {node} is missing its feature index or threshold")]
    MissingSplit {
        /// The offending node.
        node: NodeIndex,
    },

    /// Returned when a node flagged as a leaf still carries child links.
    #[error("leaf node {node} has child links")]
    LeafWithChildren {
        /// The offending node.
        node: NodeIndex,
    },

    /// Returned when a split references a feature other than axis 0 or 1.
    #[error("node {node} splits on feature {feature}, expected 0 or 1")]
    InvalidFeatureIndex {
        /// The offending node.
        node: NodeIndex,
        /// The feature index found on the node.
        feature: usize,
    },

    /// Returned when a child link points outside the node arena.
    #[error("node {node} links to child {child}, but the tree has {n_nodes} nodes")]
    ChildOutOfBounds {
        /// The node holding the link.
        node: NodeIndex,
        /// The out-of-range child index.
        child: usize,
        /// The number of nodes in the arena.
        n_nodes: usize,
    },

    /// Returned when a node is reachable along more than one path.
    #[error("node {node} is reachable more than once (cycle or shared child)")]
    RevisitedNode {
        /// The node reached twice.
        node: NodeIndex,
    },

    /// Returned when a node has an empty value vector.
    #[error("node {node} has an empty value vector")]
    EmptyValue {
        /// The offending node.
        node: NodeIndex,
    },

    /// Returned when a node's value length differs from the root's.
    #[error("node {node} has {got} values, expected {expected}")]
    ValueLengthMismatch {
        /// The offending node.
        node: NodeIndex,
        /// The value length established by the root.
        expected: usize,
        /// The value length found on this node.
        got: usize,
    },

    /// Returned when the children's sample counts do not add up to the parent's.
    #[error("node {node} has {n_samples} samples, but its children hold {n_left} + {n_right}")]
    SampleCountMismatch {
        /// The parent node.
        node: NodeIndex,
        /// Samples at the parent.
        n_samples: usize,
        /// Samples at the left child.
        n_left: usize,
        /// Samples at the right child.
        n_right: usize,
    },

    /// Returned when the serializer is given a feature-name list of the wrong size.
    #[error("expected exactly 2 feature names, got {got}")]
    FeatureNameCount {
        /// The number of names provided.
        got: usize,
    },

    /// Returned when a starting range is empty, inverted, or non-finite.
    #[error("degenerate {axis} range [{min}, {max}]: min must be finite and below max")]
    DegenerateRange {
        /// Axis label (`"x"` or `"y"`).
        axis: &'static str,
        /// The lower bound provided.
        min: f64,
        /// The upper bound provided.
        max: f64,
    },

    /// Returned when a bounding box is requested around zero points.
    #[error("cannot frame a bounding box around an empty point set")]
    EmptyPointSet,

    /// Returned when a node reports zero training samples.
    #[error("node {node} has zero samples")]
    ZeroSamples {
        /// The offending node.
        node: NodeIndex,
    },

    /// Returned when a node's impurity is NaN, infinite, or negative.
    #[error("node {node} has invalid impurity {impurity}")]
    InvalidImpurity {
        /// The offending node.
        node: NodeIndex,
        /// The impurity found on the node.
        impurity: f64,
    },

    /// Returned when a split threshold is NaN or infinite.
    #[error("node {node} has non-finite threshold {threshold}")]
    NonFiniteThreshold {
        /// The offending node.
        node: NodeIndex,
        /// The threshold found on the node.
        threshold: f64,
    },

    /// Returned when a value entry is NaN or infinite.
    #[error("node {node} has a non-finite value at position {position}")]
    NonFiniteValue {
        /// The offending node.
        node: NodeIndex,
        /// Position within the value vector.
        position: usize,
    },

    /// Returned when class weights contain a negative entry or do not sum to a positive total.
    #[error("node {node} has invalid class weights (sum {sum})")]
    InvalidClassWeights {
        /// The offending node.
        node: NodeIndex,
        /// The sum of the class weights.
        sum: f64,
    },

    /// Returned when the information gain of a split is not finite.
    #[error("split at node {node} has non-finite gain {gain}")]
    NonFiniteGain {
        /// The split node.
        node: NodeIndex,
        /// The computed gain.
        gain: f64,
    },
}

impl TreeError {
    /// Return the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreeError::EmptyTree
            | TreeError::MissingChildren { .. }
            | TreeError::MissingSplit { .. }
            | TreeError::LeafWithChildren { .. }
            | TreeError::InvalidFeatureIndex { .. }
            | TreeError::ChildOutOfBounds { .. }
            | TreeError::RevisitedNode { .. }
            | TreeError::EmptyValue { .. }
            | TreeError::ValueLengthMismatch { .. }
            | TreeError::SampleCountMismatch { .. }
            | TreeError::FeatureNameCount { .. } => ErrorKind::InvalidTreeStructure,
            TreeError::DegenerateRange { .. } | TreeError::EmptyPointSet => {
                ErrorKind::DegenerateRange
            }
            TreeError::ZeroSamples { .. }
            | TreeError::InvalidImpurity { .. }
            | TreeError::NonFiniteThreshold { .. }
            | TreeError::NonFiniteValue { .. }
            | TreeError::InvalidClassWeights { .. }
            | TreeError::NonFiniteGain { .. } => ErrorKind::NumericAnomaly,
        }
    }
}
