//! Nested, visualization-ready documents describing a tree's structure.

use tracing::{debug, instrument};

use crate::{
    TreeError,
    criterion::CriterionNames,
    node::NodeIndex,
    stats::{NodeStats, information_gain},
    tree::{DecisionTree, ValidatedTree},
};

/// Per-node statistics block of a serialized node.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MathDetails {
    criterion: String,
    impurity: f64,
    n_samples: usize,
    value: Vec<f64>,
    #[serde(flatten)]
    stats: NodeStats,
}

impl MathDetails {
    /// Display name of the criterion.
    #[must_use]
    pub fn criterion(&self) -> &str {
        &self.criterion
    }

    /// Impurity reported by the training criterion.
    #[must_use]
    pub fn impurity(&self) -> f64 {
        self.impurity
    }

    /// Samples that reached the node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Raw class weights or regression mean.
    #[must_use]
    pub fn value(&self) -> &[f64] {
        &self.value
    }

    /// Task-specific derived statistics.
    #[must_use]
    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }
}

/// One node of the serialized tree document.
///
/// Serializes with a `"type"` tag of `"split"` or `"leaf"`. Split nodes
/// list their children as `[left, right]`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SerializedNode {
    /// An internal node.
    Split {
        /// Arena position of the node.
        id: NodeIndex,
        /// Name of the split feature.
        name: String,
        /// Split feature index (0 or 1).
        feature: usize,
        /// Split threshold; `<=` goes left.
        threshold: f64,
        /// Impurity before the split.
        impurity: f64,
        /// Samples reaching the node.
        samples: usize,
        /// Raw class weights or regression mean.
        value: Vec<f64>,
        /// Weighted impurity decrease achieved by the split.
        gain: f64,
        /// Derived statistics.
        math: MathDetails,
        /// `[left, right]`.
        children: Vec<SerializedNode>,
    },
    /// A terminal node.
    Leaf {
        /// Arena position of the node.
        id: NodeIndex,
        /// Always `"Leaf"`.
        name: String,
        /// Impurity at the leaf.
        impurity: f64,
        /// Samples reaching the leaf.
        samples: usize,
        /// Raw class weights or regression mean.
        value: Vec<f64>,
        /// Derived statistics.
        math: MathDetails,
    },
}

impl SerializedNode {
    /// Arena position of the source node.
    #[must_use]
    pub fn id(&self) -> NodeIndex {
        match self {
            SerializedNode::Split { id, .. } | SerializedNode::Leaf { id, .. } => *id,
        }
    }

    /// Impurity reported at this node.
    #[must_use]
    pub fn impurity(&self) -> f64 {
        match self {
            SerializedNode::Split { impurity, .. } | SerializedNode::Leaf { impurity, .. } => {
                *impurity
            }
        }
    }

    /// Samples reaching this node.
    #[must_use]
    pub fn samples(&self) -> usize {
        match self {
            SerializedNode::Split { samples, .. } | SerializedNode::Leaf { samples, .. } => {
                *samples
            }
        }
    }

    /// Statistics block.
    #[must_use]
    pub fn math(&self) -> &MathDetails {
        match self {
            SerializedNode::Split { math, .. } | SerializedNode::Leaf { math, .. } => math,
        }
    }

    /// Information gain, present on split nodes only.
    #[must_use]
    pub fn gain(&self) -> Option<f64> {
        match self {
            SerializedNode::Split { gain, .. } => Some(*gain),
            SerializedNode::Leaf { .. } => None,
        }
    }

    /// `[left, right]` children, present on split nodes only.
    #[must_use]
    pub fn children(&self) -> Option<&[SerializedNode; 2]> {
        match self {
            SerializedNode::Split { children, .. } => children.as_slice().try_into().ok(),
            SerializedNode::Leaf { .. } => None,
        }
    }

    fn take_children(&mut self) -> Vec<SerializedNode> {
        match self {
            SerializedNode::Split { children, .. } => std::mem::take(children),
            SerializedNode::Leaf { .. } => Vec::new(),
        }
    }

    /// Return `true` for leaves.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, SerializedNode::Leaf { .. })
    }

    /// All leaves in left-to-right order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&SerializedNode> {
        let mut leaves = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node.children() {
                Some([left, right]) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => leaves.push(node),
            }
        }
        leaves
    }
}

// Deep documents would otherwise drop recursively, one frame per level.
impl Drop for SerializedNode {
    fn drop(&mut self) {
        let mut pending = self.take_children();
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.take_children());
        }
    }
}

/// Serializes trained trees into nested documents.
///
/// Construct via [`TreeSerializer::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter         | Default                         |
/// |-------------------|---------------------------------|
/// | `feature_names`   | `"Feature 0"`, `"Feature 1"`    |
/// | `criterion_names` | [`CriterionNames::default`]     |
#[derive(Debug, Clone)]
pub struct TreeSerializer {
    feature_names: [String; 2],
    criterion_names: CriterionNames,
}

impl TreeSerializer {
    /// Create a serializer labelling axes 0 and 1 with `feature_names`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::FeatureNameCount`] unless exactly two names are given.
    pub fn new(feature_names: &[String]) -> Result<Self, TreeError> {
        let [x, y] = feature_names else {
            return Err(TreeError::FeatureNameCount {
                got: feature_names.len(),
            });
        };
        Ok(Self {
            feature_names: [x.clone(), y.clone()],
            criterion_names: CriterionNames::default(),
        })
    }

    /// Set the criterion display-name table.
    #[must_use]
    pub fn with_criterion_names(mut self, criterion_names: CriterionNames) -> Self {
        self.criterion_names = criterion_names;
        self
    }

    /// Return the axis labels.
    #[must_use]
    pub fn feature_names(&self) -> &[String; 2] {
        &self.feature_names
    }

    /// Return the criterion display-name table.
    #[must_use]
    pub fn criterion_names(&self) -> &CriterionNames {
        &self.criterion_names
    }

    /// Serialize the whole tree, root first.
    ///
    /// Children are serialized before their parent so each split's gain is
    /// computed from finished child statistics. The walk keeps its own
    /// stack, so tree depth is not limited by the thread's stack size.
    /// Nothing is returned unless the whole tree serializes.
    ///
    /// # Errors
    ///
    /// Any error from [`DecisionTree::validate`], or
    /// [`TreeError::NonFiniteGain`] when a split's gain overflows.
    #[instrument(skip_all, fields(n_nodes = tree.n_nodes(), criterion = %tree.criterion()))]
    pub fn serialize(&self, tree: &DecisionTree) -> Result<SerializedNode, TreeError> {
        let view = tree.validate()?;
        let criterion = self.criterion_names.display_name(tree.criterion());

        // Finished subtrees; a split pops its two children when it completes.
        let mut done: Vec<SerializedNode> = Vec::new();
        let mut stack = vec![Visit::Enter(NodeIndex::ROOT)];

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(idx) => match view.split(idx) {
                    Some(split) => {
                        stack.push(Visit::Finish(idx));
                        stack.push(Visit::Enter(split.right));
                        stack.push(Visit::Enter(split.left));
                    }
                    None => done.push(self.leaf_node(&view, idx, criterion)),
                },
                Visit::Finish(idx) => {
                    let right = done.pop().expect("right subtree finishes before its parent");
                    let left = done.pop().expect("left subtree finishes before its parent");
                    done.push(self.split_node(&view, idx, criterion, [left, right])?);
                }
            }
        }

        let root = done.pop().expect("the root finishes last");
        debug!(
            n_leaves = view.n_leaves(),
            depth = view.depth(),
            "tree serialized"
        );
        Ok(root)
    }

    fn math(&self, view: &ValidatedTree<'_>, idx: NodeIndex, criterion: &str) -> MathDetails {
        let node = view.node(idx);
        MathDetails {
            criterion: criterion.to_string(),
            impurity: node.impurity().value(),
            n_samples: node.n_samples(),
            value: node.value().to_vec(),
            stats: NodeStats::compute(
                view.task(),
                view.tree().criterion(),
                node.value(),
                node.n_samples(),
            ),
        }
    }

    fn leaf_node(
        &self,
        view: &ValidatedTree<'_>,
        idx: NodeIndex,
        criterion: &str,
    ) -> SerializedNode {
        let node = view.node(idx);
        SerializedNode::Leaf {
            id: idx,
            name: "Leaf".to_string(),
            impurity: node.impurity().value(),
            samples: node.n_samples(),
            value: node.value().to_vec(),
            math: self.math(view, idx, criterion),
        }
    }

    fn split_node(
        &self,
        view: &ValidatedTree<'_>,
        idx: NodeIndex,
        criterion: &str,
        [left, right]: [SerializedNode; 2],
    ) -> Result<SerializedNode, TreeError> {
        let node = view.node(idx);
        let split = view.split(idx).expect("split nodes are only finished after entering them");
        let impurity = node.impurity().value();

        let gain = information_gain(
            impurity,
            node.n_samples(),
            (left.impurity(), left.samples()),
            (right.impurity(), right.samples()),
        );
        if !gain.is_finite() {
            return Err(TreeError::NonFiniteGain { node: idx, gain });
        }

        Ok(SerializedNode::Split {
            id: idx,
            name: self.feature_names[split.axis.index()].clone(),
            feature: split.axis.index(),
            threshold: split.threshold,
            impurity,
            samples: node.n_samples(),
            value: node.value().to_vec(),
            gain,
            math: self.math(view, idx, criterion),
            children: vec![left, right],
        })
    }
}

/// Work item of the post-order walk.
enum Visit {
    /// Schedule a node's children, or finish it directly if it is a leaf.
    Enter(NodeIndex),
    /// Combine a split's two finished children.
    Finish(NodeIndex),
}

impl Default for TreeSerializer {
    fn default() -> Self {
        Self {
            feature_names: ["Feature 0".to_string(), "Feature 1".to_string()],
            criterion_names: CriterionNames::default(),
        }
    }
}
