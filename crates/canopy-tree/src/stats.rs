//! Per-node derived statistics for classification and regression trees.

use crate::criterion::{Criterion, Formula};

/// Whether a tree predicts classes or a continuous target.
///
/// Decided once per tree from the root's value length: more than one
/// entry means per-class weights, exactly one means a regression mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskMode {
    /// Per-class weighted counts at every node.
    Classification {
        /// Number of classes (length of every node's value vector).
        n_classes: usize,
    },
    /// A single fitted mean at every node.
    Regression,
}

impl TaskMode {
    /// Infer the task from the length of a node's value vector.
    #[must_use]
    pub fn from_value_len(len: usize) -> Self {
        if len > 1 {
            TaskMode::Classification { n_classes: len }
        } else {
            TaskMode::Regression
        }
    }

    /// Length every node's value vector must have under this task.
    #[must_use]
    pub fn value_len(self) -> usize {
        match self {
            TaskMode::Classification { n_classes } => n_classes,
            TaskMode::Regression => 1,
        }
    }

    /// Return `true` for classification trees.
    #[must_use]
    pub fn is_classification(self) -> bool {
        matches!(self, TaskMode::Classification { .. })
    }
}

/// The prediction a leaf makes: a class label or a regression value.
///
/// Serializes as a bare number so renderers can use it directly.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Prediction {
    /// Index of the class with the largest weight.
    Class(usize),
    /// Fitted mean target.
    Value(f64),
}

impl Prediction {
    /// Prediction for a node's (already validated) value vector.
    pub(crate) fn from_value(task: TaskMode, value: &[f64]) -> Self {
        match task {
            TaskMode::Classification { .. } => Prediction::Class(argmax(value)),
            TaskMode::Regression => Prediction::Value(value[0]),
        }
    }
}

/// Index of the largest entry; ties go to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Impurity decrease achieved by a split.
///
/// `parent_impurity - (n_left/n * left_impurity + n_right/n * right_impurity)`.
/// The result may be negative; callers decide whether a non-finite result
/// is acceptable.
#[must_use]
pub fn information_gain(
    parent_impurity: f64,
    n_samples: usize,
    left: (f64, usize),
    right: (f64, usize),
) -> f64 {
    let n = n_samples as f64;
    let (left_impurity, n_left) = left;
    let (right_impurity, n_right) = right;
    let weighted_left = (n_left as f64 / n) * left_impurity;
    let weighted_right = (n_right as f64 / n) * right_impurity;
    parent_impurity - (weighted_left + weighted_right)
}

/// Derived statistics of a classification node.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClassificationStats {
    probs: Vec<f64>,
    class_counts: Vec<f64>,
    predicted_class: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    terms: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    formula: Option<Formula>,
}

impl ClassificationStats {
    /// Normalize class weights into probabilities and per-class terms.
    ///
    /// `value` must hold non-negative weights with a positive sum.
    pub(crate) fn compute(criterion: Criterion, value: &[f64], n_samples: usize) -> Self {
        let total: f64 = value.iter().sum();
        let probs: Vec<f64> = value.iter().map(|&w| w / total).collect();
        // Weights may be normalized or sample-weighted; rescale to the sample count.
        let class_counts = probs.iter().map(|&p| p * n_samples as f64).collect();
        let (terms, formula) = match criterion.impurity_terms(&probs) {
            Some(breakdown) => (Some(breakdown.terms), Some(breakdown.formula)),
            None => (None, None),
        };
        Self {
            predicted_class: argmax(value),
            probs,
            class_counts,
            terms,
            formula,
        }
    }

    /// Class probabilities, summing to 1.
    #[must_use]
    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    /// Probabilities scaled back to the node's sample count.
    #[must_use]
    pub fn class_counts(&self) -> &[f64] {
        &self.class_counts
    }

    /// The class with the largest weight.
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        self.predicted_class
    }

    /// Per-class impurity terms, when the criterion has a breakdown.
    #[must_use]
    pub fn terms(&self) -> Option<&[f64]> {
        self.terms.as_deref()
    }

    /// Formula combining the terms, when the criterion has a breakdown.
    #[must_use]
    pub fn formula(&self) -> Option<Formula> {
        self.formula
    }

    /// Impurity recomputed from the terms.
    #[must_use]
    pub fn recomputed_impurity(&self) -> Option<f64> {
        match (&self.terms, self.formula) {
            (Some(terms), Some(formula)) => Some(formula.evaluate(terms)),
            _ => None,
        }
    }
}

/// Derived statistics of a regression node.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RegressionStats {
    prediction: f64,
}

impl RegressionStats {
    /// The node's fitted scalar prediction.
    #[must_use]
    pub fn prediction(&self) -> f64 {
        self.prediction
    }
}

/// Task-specific statistics, chosen once per tree by its [`TaskMode`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum NodeStats {
    /// Probabilities, counts, and criterion terms.
    Classification(ClassificationStats),
    /// The scalar prediction.
    Regression(RegressionStats),
}

impl NodeStats {
    /// Compute the statistics for one node's validated value vector.
    pub(crate) fn compute(
        task: TaskMode,
        criterion: Criterion,
        value: &[f64],
        n_samples: usize,
    ) -> Self {
        match task {
            TaskMode::Classification { .. } => NodeStats::Classification(
                ClassificationStats::compute(criterion, value, n_samples),
            ),
            TaskMode::Regression => NodeStats::Regression(RegressionStats {
                prediction: value[0],
            }),
        }
    }

    /// Return the classification statistics, if this is a classification node.
    #[must_use]
    pub fn as_classification(&self) -> Option<&ClassificationStats> {
        match self {
            NodeStats::Classification(stats) => Some(stats),
            NodeStats::Regression(_) => None,
        }
    }

    /// Return the regression statistics, if this is a regression node.
    #[must_use]
    pub fn as_regression(&self) -> Option<&RegressionStats> {
        match self {
            NodeStats::Regression(stats) => Some(stats),
            NodeStats::Classification(_) => None,
        }
    }
}
