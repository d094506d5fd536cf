//! Domain types for canopy-io.

use canopy_tree::DecisionTree;

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trees loaded from one tree file, plus optional context for rendering.
///
/// Produced by [`TreeReader`](crate::TreeReader). A single-tree file
/// yields a one-element `trees` vector.
#[derive(Debug)]
pub struct TreeDataset {
    /// Axis labels, when the file provides them.
    feature_names: Option<Vec<String>>,
    /// Training points, when the file provides them; used to frame partitions.
    points: Vec<[f64; 2]>,
    /// Member trees in file order.
    trees: Vec<DecisionTree>,
}

impl TreeDataset {
    /// Create a new tree dataset.
    pub(crate) fn new(
        feature_names: Option<Vec<String>>,
        points: Vec<[f64; 2]>,
        trees: Vec<DecisionTree>,
    ) -> Self {
        Self {
            feature_names,
            points,
            trees,
        }
    }

    /// Return the axis labels, if present.
    #[must_use]
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Return the training points (possibly empty).
    #[must_use]
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// Return the member trees.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the number of member trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
