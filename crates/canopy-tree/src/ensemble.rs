//! Per-member fan-out for forests and boosted ensembles.
//!
//! Each member tree is an independent call into the serializer or the
//! partition extractor, so members are processed in parallel with no
//! shared state. The first failing member aborts the batch.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::{
    TreeError,
    partition::{BoundingBox, Partition, partition_box},
    serialize::{SerializedNode, TreeSerializer},
    tree::DecisionTree,
};

/// Serialize every member tree in parallel, preserving member order.
///
/// # Errors
///
/// The first error returned by [`TreeSerializer::serialize`] for any member.
#[instrument(skip_all, fields(n_trees = trees.len()))]
pub fn serialize_ensemble(
    serializer: &TreeSerializer,
    trees: &[DecisionTree],
) -> Result<Vec<SerializedNode>, TreeError> {
    let docs: Vec<SerializedNode> = trees
        .par_iter()
        .map(|tree| serializer.serialize(tree))
        .collect::<Result<_, _>>()?;
    debug!(n_docs = docs.len(), "ensemble serialized");
    Ok(docs)
}

/// Partition the same box by every member tree in parallel, preserving member order.
///
/// # Errors
///
/// The first error returned by [`partition_box`] for any member.
#[instrument(skip_all, fields(n_trees = trees.len()))]
pub fn partition_ensemble(
    trees: &[DecisionTree],
    bounds: &BoundingBox,
) -> Result<Vec<Partition>, TreeError> {
    let partitions: Vec<Partition> = trees
        .par_iter()
        .map(|tree| partition_box(tree, bounds))
        .collect::<Result<_, _>>()?;
    debug!(
        n_rectangles = partitions.iter().map(|p| p.rectangles().len()).sum::<usize>(),
        "ensemble partitioned"
    );
    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criterion::Criterion;
    use crate::node::{Node, NodeIndex};

    fn stump(threshold: f64) -> DecisionTree {
        DecisionTree::new(
            Criterion::Gini,
            vec![
                Node::split(
                    0,
                    threshold,
                    NodeIndex::new(1),
                    NodeIndex::new(2),
                    0.5,
                    4,
                    vec![2.0, 2.0],
                ),
                Node::leaf(0.0, 2, vec![2.0, 0.0]),
                Node::leaf(0.0, 2, vec![0.0, 2.0]),
            ],
        )
    }

    #[test]
    fn serialize_preserves_member_order() {
        let trees: Vec<DecisionTree> = (1..=8).map(|i| stump(i as f64 / 10.0)).collect();
        let docs = serialize_ensemble(&TreeSerializer::default(), &trees).unwrap();
        assert_eq!(docs.len(), 8);
        for (i, doc) in docs.iter().enumerate() {
            match doc {
                SerializedNode::Split { threshold, .. } => {
                    assert!((threshold - (i + 1) as f64 / 10.0).abs() < 1e-12);
                }
                SerializedNode::Leaf { .. } => panic!("expected a split at the root"),
            }
        }
    }

    #[test]
    fn partition_every_member() {
        let trees = vec![stump(0.25), stump(0.75)];
        let bounds = BoundingBox::new((0.0, 1.0), (0.0, 1.0)).unwrap();
        let parts = partition_ensemble(&trees, &bounds).unwrap();
        assert_eq!(parts.len(), 2);
        assert!((parts[0].rectangles()[0].width - 0.25).abs() < 1e-12);
        assert!((parts[1].rectangles()[0].width - 0.75).abs() < 1e-12);
    }

    #[test]
    fn one_bad_member_fails_the_batch() {
        let mut bad = stump(0.5);
        bad.nodes[0].left = None;
        let trees = vec![stump(0.5), bad, stump(0.5)];
        let err = serialize_ensemble(&TreeSerializer::default(), &trees).unwrap_err();
        assert!(matches!(err, TreeError::MissingChildren { .. }));
    }

    #[test]
    fn empty_ensemble_is_empty() {
        let bounds = BoundingBox::new((0.0, 1.0), (0.0, 1.0)).unwrap();
        assert!(partition_ensemble(&[], &bounds).unwrap().is_empty());
    }
}
