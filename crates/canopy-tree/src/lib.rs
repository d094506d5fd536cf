//! Read-only views over trained binary decision trees.
//!
//! Pure math library with no I/O. Given a tree produced by any CART-style
//! trainer over a 2D feature space, builds a nested structure document
//! (per-node probabilities, impurity terms, information gain) and the
//! exact rectangular partition of a bounding box that the tree induces.

mod criterion;
mod ensemble;
mod error;
mod node;
mod partition;
mod serialize;
mod stats;
mod tree;

pub use criterion::{Criterion, CriterionNames, Formula, ImpurityTerms};
pub use ensemble::{partition_ensemble, serialize_ensemble};
pub use error::{ErrorKind, TreeError};
pub use node::{Axis, FeatureIndex, Impurity, Node, NodeIndex};
pub use partition::{AxisRange, BoundingBox, Partition, Rectangle, partition, partition_box};
pub use serialize::{MathDetails, SerializedNode, TreeSerializer};
pub use stats::{
    ClassificationStats, NodeStats, Prediction, RegressionStats, TaskMode, information_gain,
};
pub use tree::{DecisionTree, ResolvedSplit, ValidatedTree};
