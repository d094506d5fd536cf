use tracing::{debug, instrument};

use crate::{
    TreeError,
    criterion::Criterion,
    node::{Axis, Node, NodeIndex},
    stats::{Prediction, TaskMode},
};

/// A trained binary decision tree over a 2D feature space.
///
/// Stored as an arena-based `Vec<Node>` with index references, root at
/// index 0. The tree is consumed read-only; every derived view is
/// computed on demand from a [`ValidatedTree`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) criterion: Criterion,
    pub(crate) nodes: Vec<Node>,
}

impl DecisionTree {
    /// Wrap an arena of nodes produced by a training process.
    ///
    /// No checks happen here; see [`DecisionTree::validate`].
    #[must_use]
    pub fn new(criterion: Criterion, nodes: Vec<Node>) -> Self {
        Self { criterion, nodes }
    }

    /// Return the criterion the tree was trained with.
    #[must_use]
    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    /// Return the node arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the total number of nodes in the arena.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Check everything the serializer and partition extractor rely on.
    ///
    /// Walks every node reachable from the root with an explicit stack, so
    /// malformed links never recurse unboundedly. Nodes unreachable from
    /// the root are ignored.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyTree`] | the arena is empty |
    /// | [`TreeError::EmptyValue`] | a node has no value entries |
    /// | [`TreeError::ValueLengthMismatch`] | a value length differs from the root's |
    /// | [`TreeError::MissingChildren`] | an internal node lacks a child link |
    /// | [`TreeError::MissingSplit`] | an internal node lacks feature or threshold |
    /// | [`TreeError::LeafWithChildren`] | a leaf carries child links |
    /// | [`TreeError::InvalidFeatureIndex`] | a split feature is not 0 or 1 |
    /// | [`TreeError::ChildOutOfBounds`] | a child link leaves the arena |
    /// | [`TreeError::RevisitedNode`] | a node is reachable twice |
    /// | [`TreeError::SampleCountMismatch`] | children's samples don't sum to the parent's |
    /// | [`TreeError::ZeroSamples`] | a node has zero samples |
    /// | [`TreeError::InvalidImpurity`] | impurity is non-finite or negative |
    /// | [`TreeError::NonFiniteThreshold`] | a threshold is non-finite |
    /// | [`TreeError::NonFiniteValue`] | a value entry is non-finite |
    /// | [`TreeError::InvalidClassWeights`] | class weights are negative or sum to zero |
    #[instrument(skip(self), fields(n_nodes = self.nodes.len(), criterion = %self.criterion))]
    pub fn validate(&self) -> Result<ValidatedTree<'_>, TreeError> {
        let root = self.nodes.first().ok_or(TreeError::EmptyTree)?;
        if root.value.is_empty() {
            return Err(TreeError::EmptyValue {
                node: NodeIndex::ROOT,
            });
        }
        let task = TaskMode::from_value_len(root.value.len());

        let n_nodes = self.nodes.len();
        let mut visited = vec![false; n_nodes];
        let mut splits: Vec<Option<ResolvedSplit>> = vec![None; n_nodes];
        let mut n_leaves = 0usize;
        let mut depth = 0usize;

        visited[0] = true;
        let mut stack = vec![(NodeIndex::ROOT, 0usize)];

        while let Some((idx, d)) = stack.pop() {
            let node = &self.nodes[idx.index()];
            check_numbers(idx, node, task)?;
            depth = depth.max(d);

            if node.is_leaf {
                if node.left.is_some() || node.right.is_some() {
                    return Err(TreeError::LeafWithChildren { node: idx });
                }
                n_leaves += 1;
                continue;
            }

            let split = self.resolve_split(idx, node)?;
            for child in [split.left, split.right] {
                if visited[child.index()] {
                    return Err(TreeError::RevisitedNode { node: child });
                }
                visited[child.index()] = true;
            }

            let n_left = self.nodes[split.left.index()].n_samples;
            let n_right = self.nodes[split.right.index()].n_samples;
            if n_left.checked_add(n_right) != Some(node.n_samples) {
                return Err(TreeError::SampleCountMismatch {
                    node: idx,
                    n_samples: node.n_samples,
                    n_left,
                    n_right,
                });
            }

            stack.push((split.right, d + 1));
            stack.push((split.left, d + 1));
            splits[idx.index()] = Some(split);
        }

        let n_reachable = visited.iter().filter(|&&v| v).count();
        debug!(
            n_reachable,
            n_leaves,
            depth,
            classification = task.is_classification(),
            "tree validated"
        );

        Ok(ValidatedTree {
            tree: self,
            task,
            splits,
            n_leaves,
            depth,
        })
    }

    /// Check an internal node's split fields and child links.
    fn resolve_split(&self, idx: NodeIndex, node: &Node) -> Result<ResolvedSplit, TreeError> {
        let (Some(left), Some(right)) = (node.left, node.right) else {
            return Err(TreeError::MissingChildren { node: idx });
        };
        let (Some(feature), Some(threshold)) = (node.feature, node.threshold) else {
            return Err(TreeError::MissingSplit { node: idx });
        };
        let axis = Axis::from_feature(feature).ok_or(TreeError::InvalidFeatureIndex {
            node: idx,
            feature: feature.index(),
        })?;
        if !threshold.is_finite() {
            return Err(TreeError::NonFiniteThreshold {
                node: idx,
                threshold,
            });
        }
        for child in [left, right] {
            if child.index() >= self.nodes.len() {
                return Err(TreeError::ChildOutOfBounds {
                    node: idx,
                    child: child.index(),
                    n_nodes: self.nodes.len(),
                });
            }
        }
        Ok(ResolvedSplit {
            axis,
            threshold,
            left,
            right,
        })
    }

    /// Predict for a single 2D point.
    ///
    /// Traverses from the root: at each split, goes left when
    /// `point[feature] <= threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Any error from [`DecisionTree::validate`].
    pub fn predict(&self, point: [f64; 2]) -> Result<Prediction, TreeError> {
        Ok(self.validate()?.predict(point))
    }
}

/// Split fields of an internal node after validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSplit {
    /// Axis the split cuts.
    pub axis: Axis,
    /// Cut position; `<=` goes left.
    pub threshold: f64,
    /// Left child.
    pub left: NodeIndex,
    /// Right child.
    pub right: NodeIndex,
}

/// A [`DecisionTree`] borrowed after a successful [`DecisionTree::validate`].
///
/// Every node reachable from the root is known to be well-formed, so the
/// walks built on top of it cannot fail on structure.
#[derive(Debug, Clone)]
pub struct ValidatedTree<'a> {
    tree: &'a DecisionTree,
    task: TaskMode,
    splits: Vec<Option<ResolvedSplit>>,
    n_leaves: usize,
    depth: usize,
}

impl<'a> ValidatedTree<'a> {
    /// Return the underlying tree.
    #[must_use]
    pub fn tree(&self) -> &'a DecisionTree {
        self.tree
    }

    /// Return the task mode inferred from the root.
    #[must_use]
    pub fn task(&self) -> TaskMode {
        self.task
    }

    /// Return the node at `idx`.
    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> &'a Node {
        &self.tree.nodes[idx.index()]
    }

    /// Return the resolved split at `idx`, or `None` for a leaf.
    #[must_use]
    pub fn split(&self, idx: NodeIndex) -> Option<&ResolvedSplit> {
        self.splits[idx.index()].as_ref()
    }

    /// Return the number of leaves reachable from the root.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Return the maximum depth. A single-leaf tree has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Return the prediction a leaf makes.
    #[must_use]
    pub fn leaf_prediction(&self, idx: NodeIndex) -> Prediction {
        Prediction::from_value(self.task, &self.node(idx).value)
    }

    /// Return the leaf a 2D point falls into.
    #[must_use]
    pub fn leaf_for(&self, point: [f64; 2]) -> NodeIndex {
        let mut idx = NodeIndex::ROOT;
        while let Some(split) = self.split(idx) {
            idx = if point[split.axis.index()] <= split.threshold {
                split.left
            } else {
                split.right
            };
        }
        idx
    }

    /// Predict for a single 2D point.
    #[must_use]
    pub fn predict(&self, point: [f64; 2]) -> Prediction {
        self.leaf_prediction(self.leaf_for(point))
    }
}

/// Numeric checks shared by leaves and internal nodes.
fn check_numbers(idx: NodeIndex, node: &Node, task: TaskMode) -> Result<(), TreeError> {
    if node.n_samples == 0 {
        return Err(TreeError::ZeroSamples { node: idx });
    }

    let impurity = node.impurity.value();
    if !impurity.is_finite() || impurity < 0.0 {
        return Err(TreeError::InvalidImpurity {
            node: idx,
            impurity,
        });
    }

    if node.value.is_empty() {
        return Err(TreeError::EmptyValue { node: idx });
    }
    if node.value.len() != task.value_len() {
        return Err(TreeError::ValueLengthMismatch {
            node: idx,
            expected: task.value_len(),
            got: node.value.len(),
        });
    }
    if let Some(position) = node.value.iter().position(|v| !v.is_finite()) {
        return Err(TreeError::NonFiniteValue {
            node: idx,
            position,
        });
    }

    if task.is_classification() {
        let sum: f64 = node.value.iter().sum();
        if node.value.iter().any(|&w| w < 0.0) || sum <= 0.0 {
            return Err(TreeError::InvalidClassWeights { node: idx, sum });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Root splits x at 0.5; the right child splits y at 0.3.
    fn two_level_tree() -> DecisionTree {
        DecisionTree::new(
            Criterion::Gini,
            vec![
                Node::split(0, 0.5, NodeIndex::new(1), NodeIndex::new(2), 0.5, 10, vec![5.0, 5.0]),
                Node::leaf(0.0, 4, vec![4.0, 0.0]),
                Node::split(
                    1,
                    0.3,
                    NodeIndex::new(3),
                    NodeIndex::new(4),
                    0.277_777_8,
                    6,
                    vec![1.0, 5.0],
                ),
                Node::leaf(0.5, 2, vec![1.0, 1.0]),
                Node::leaf(0.0, 4, vec![0.0, 4.0]),
            ],
        )
    }

    #[test]
    fn valid_tree_summaries() {
        let tree = two_level_tree();
        let view = tree.validate().unwrap();
        assert_eq!(view.n_leaves(), 3);
        assert_eq!(view.depth(), 2);
        assert_eq!(view.task(), TaskMode::Classification { n_classes: 2 });
    }

    #[test]
    fn single_leaf_depth_zero() {
        let tree = DecisionTree::new(Criterion::Gini, vec![Node::leaf(0.444, 15, vec![10.0, 5.0])]);
        let view = tree.validate().unwrap();
        assert_eq!(view.depth(), 0);
        assert_eq!(view.n_leaves(), 1);
        assert!(view.split(NodeIndex::ROOT).is_none());
    }

    #[test]
    fn predict_follows_thresholds() {
        let tree = two_level_tree();
        assert_eq!(tree.predict([0.2, 0.9]).unwrap(), Prediction::Class(0));
        assert_eq!(tree.predict([0.8, 0.9]).unwrap(), Prediction::Class(1));
        // Tie [1, 1] resolves to class 0.
        assert_eq!(tree.predict([0.8, 0.1]).unwrap(), Prediction::Class(0));
    }

    #[test]
    fn predict_threshold_goes_left() {
        let tree = two_level_tree();
        let view = tree.validate().unwrap();
        assert_eq!(view.leaf_for([0.5, 0.0]), NodeIndex::new(1));
    }

    #[test]
    fn empty_tree_error() {
        let tree = DecisionTree::new(Criterion::Gini, vec![]);
        assert!(matches!(tree.validate().unwrap_err(), TreeError::EmptyTree));
    }

    #[test]
    fn missing_children_error() {
        let mut tree = two_level_tree();
        tree.nodes[0].left = None;
        tree.nodes[0].right = None;
        let err = tree.validate().unwrap_err();
        assert!(matches!(err, TreeError::MissingChildren { node } if node == NodeIndex::ROOT));
        assert_eq!(err.kind(), ErrorKind::InvalidTreeStructure);
    }

    #[test]
    fn missing_threshold_error() {
        let mut tree = two_level_tree();
        tree.nodes[2].threshold = None;
        assert!(matches!(
            tree.validate().unwrap_err(),
            TreeError::MissingSplit { .. }
        ));
    }

    #[test]
    fn leaf_with_children_error() {
        let mut tree = two_level_tree();
        tree.nodes[1].left = Some(NodeIndex::new(3));
        assert!(matches!(
            tree.validate().unwrap_err(),
            TreeError::LeafWithChildren { .. }
        ));
    }

    #[test]
    fn bad_feature_index_error() {
        let mut tree = two_level_tree();
        tree.nodes[2].feature = Some(crate::node::FeatureIndex::new(2));
        let err = tree.validate().unwrap_err();
        assert!(matches!(err, TreeError::InvalidFeatureIndex { feature: 2, .. }));
    }

    #[test]
    fn child_out_of_bounds_error() {
        let mut tree = two_level_tree();
        tree.nodes[2].right = Some(NodeIndex::new(99));
        assert!(matches!(
            tree.validate().unwrap_err(),
            TreeError::ChildOutOfBounds { child: 99, n_nodes: 5, .. }
        ));
    }

    #[test]
    fn cycle_is_rejected() {
        let mut tree = two_level_tree();
        tree.nodes[2].left = Some(NodeIndex::ROOT);
        tree.nodes[2].right = Some(NodeIndex::new(4));
        assert!(matches!(
            tree.validate().unwrap_err(),
            TreeError::RevisitedNode { .. }
        ));
    }

    #[test]
    fn shared_child_is_rejected() {
        let mut tree = two_level_tree();
        tree.nodes[0].right = Some(NodeIndex::new(1));
        assert!(matches!(
            tree.validate().unwrap_err(),
            TreeError::RevisitedNode { .. }
        ));
    }

    #[test]
    fn sample_count_mismatch_error() {
        let mut tree = two_level_tree();
        tree.nodes[1].n_samples = 3;
        assert!(matches!(
            tree.validate().unwrap_err(),
            TreeError::SampleCountMismatch { n_left: 3, n_right: 6, .. }
        ));
    }

    #[test]
    fn value_length_mismatch_error() {
        let mut tree = two_level_tree();
        tree.nodes[4].value = vec![0.0, 3.0, 1.0];
        assert!(matches!(
            tree.validate().unwrap_err(),
            TreeError::ValueLengthMismatch { expected: 2, got: 3, .. }
        ));
    }

    #[test]
    fn task_mode_follows_value_length_not_criterion() {
        let tree = DecisionTree::new(
            Criterion::SquaredError,
            vec![Node::leaf(0.375, 4, vec![3.0, 1.0])],
        );
        let view = tree.validate().unwrap();
        assert_eq!(view.task(), TaskMode::Classification { n_classes: 2 });
        assert_eq!(view.predict([0.0, 0.0]), Prediction::Class(0));
    }

    #[test]
    fn overflowing_child_samples_are_a_mismatch() {
        let tree = DecisionTree::new(
            Criterion::Gini,
            vec![
                Node::split(0, 0.5, NodeIndex::new(1), NodeIndex::new(2), 0.5, 10, vec![5.0, 5.0]),
                Node::leaf(0.0, usize::MAX, vec![5.0, 0.0]),
                Node::leaf(0.0, 11, vec![0.0, 5.0]),
            ],
        );
        let err = tree.validate().unwrap_err();
        assert!(matches!(
            err,
            TreeError::SampleCountMismatch { n_samples: 10, n_right: 11, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::InvalidTreeStructure);
    }

    #[test]
    fn zero_samples_is_numeric_anomaly() {
        let tree = DecisionTree::new(Criterion::Gini, vec![Node::leaf(0.0, 0, vec![1.0, 0.0])]);
        let err = tree.validate().unwrap_err();
        assert!(matches!(err, TreeError::ZeroSamples { .. }));
        assert_eq!(err.kind(), ErrorKind::NumericAnomaly);
    }

    #[test]
    fn negative_impurity_error() {
        let tree = DecisionTree::new(Criterion::Gini, vec![Node::leaf(-0.1, 3, vec![1.0, 2.0])]);
        assert!(matches!(
            tree.validate().unwrap_err(),
            TreeError::InvalidImpurity { .. }
        ));
    }

    #[test]
    fn nan_impurity_error() {
        let tree = DecisionTree::new(
            Criterion::Gini,
            vec![Node::leaf(f64::NAN, 3, vec![1.0, 2.0])],
        );
        assert!(matches!(
            tree.validate().unwrap_err(),
            TreeError::InvalidImpurity { .. }
        ));
    }

    #[test]
    fn infinite_threshold_error() {
        let mut tree = two_level_tree();
        tree.nodes[0].threshold = Some(f64::INFINITY);
        assert!(matches!(
            tree.validate().unwrap_err(),
            TreeError::NonFiniteThreshold { .. }
        ));
    }

    #[test]
    fn zero_class_weights_error() {
        let tree = DecisionTree::new(Criterion::Gini, vec![Node::leaf(0.0, 3, vec![0.0, 0.0])]);
        assert!(matches!(
            tree.validate().unwrap_err(),
            TreeError::InvalidClassWeights { .. }
        ));
    }

    #[test]
    fn regression_tree_allows_negative_values() {
        let tree = DecisionTree::new(
            Criterion::SquaredError,
            vec![
                Node::split(1, 0.0, NodeIndex::new(1), NodeIndex::new(2), 4.0, 4, vec![0.0]),
                Node::leaf(0.0, 2, vec![-2.0]),
                Node::leaf(0.0, 2, vec![2.0]),
            ],
        );
        let view = tree.validate().unwrap();
        assert_eq!(view.task(), TaskMode::Regression);
        assert_eq!(view.predict([0.0, -1.0]), Prediction::Value(-2.0));
    }

    #[test]
    fn unreachable_nodes_are_ignored() {
        let mut tree = two_level_tree();
        tree.nodes.push(Node::leaf(f64::NAN, 0, vec![]));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn tree_json_round_trip() {
        let tree = two_level_tree();
        let json = serde_json::to_string(&tree).unwrap();
        let parsed: DecisionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tree);
    }
}
