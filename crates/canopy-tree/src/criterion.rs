use std::collections::BTreeMap;
use std::fmt;

/// Impurity criterion the tree was trained with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Shannon entropy in bits: -Σ(p_i · log2(p_i))
    Entropy,
    /// Log loss; identical impurity to `Entropy`.
    LogLoss,
    /// Mean squared error around the node mean.
    #[serde(alias = "mse")]
    SquaredError,
    /// Mean squared error with Friedman's improvement score.
    FriedmanMse,
    /// Mean absolute error around the node median.
    AbsoluteError,
    /// Half mean Poisson deviance.
    Poisson,
}

impl Criterion {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
            Criterion::LogLoss => "log_loss",
            Criterion::SquaredError => "squared_error",
            Criterion::FriedmanMse => "friedman_mse",
            Criterion::AbsoluteError => "absolute_error",
            Criterion::Poisson => "poisson",
        }
    }

    /// Return `true` for criteria that measure class heterogeneity.
    #[must_use]
    pub fn is_classification(self) -> bool {
        matches!(self, Criterion::Gini | Criterion::Entropy | Criterion::LogLoss)
    }

    /// Break the impurity of a class distribution into per-class terms.
    ///
    /// Returns `None` for criteria without a per-class breakdown (the
    /// regression criteria).
    #[must_use]
    pub fn impurity_terms(self, probs: &[f64]) -> Option<ImpurityTerms> {
        match self {
            Criterion::Gini => Some(ImpurityTerms {
                terms: probs.iter().map(|&p| p * p).collect(),
                formula: Formula::GiniComplement,
            }),
            Criterion::Entropy | Criterion::LogLoss => Some(ImpurityTerms {
                // p = 0 contributes nothing; substituting 0 keeps log2(0) out.
                terms: probs
                    .iter()
                    .map(|&p| if p > 0.0 { -p * p.log2() } else { 0.0 })
                    .collect(),
                formula: Formula::Entropy,
            }),
            Criterion::SquaredError
            | Criterion::FriedmanMse
            | Criterion::AbsoluteError
            | Criterion::Poisson => None,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How per-class terms combine back into the impurity.
///
/// Serializes as its [`Formula::as_str`] string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    /// Gini: one minus the sum of squared probabilities.
    GiniComplement,
    /// Entropy: the terms are already negated, so the impurity is their sum.
    Entropy,
}

impl Formula {
    /// Human-readable formula string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Formula::GiniComplement => "1 - sum(p^2)",
            Formula::Entropy => "-sum(p * log2(p))",
        }
    }

    /// Recombine per-class terms into an impurity value.
    #[must_use]
    pub fn evaluate(self, terms: &[f64]) -> f64 {
        let sum: f64 = terms.iter().sum();
        match self {
            Formula::GiniComplement => 1.0 - sum,
            Formula::Entropy => sum,
        }
    }
}

impl serde::Serialize for Formula {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Per-class impurity terms plus the formula that combines them.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpurityTerms {
    pub(crate) terms: Vec<f64>,
    pub(crate) formula: Formula,
}

impl ImpurityTerms {
    /// Return the per-class terms.
    #[must_use]
    pub fn terms(&self) -> &[f64] {
        &self.terms
    }

    /// Return the combining formula.
    #[must_use]
    pub fn formula(&self) -> Formula {
        self.formula
    }

    /// Impurity recomputed from the terms.
    #[must_use]
    pub fn impurity(&self) -> f64 {
        self.formula.evaluate(&self.terms)
    }
}

/// Lookup table from criterion to the name shown in serialized documents.
///
/// The default table reports `squared_error` as `mse` and every other
/// criterion under its canonical name. Criteria missing from the table
/// fall back to [`Criterion::as_str`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionNames {
    names: BTreeMap<Criterion, String>,
}

impl CriterionNames {
    /// A table that reports every criterion under its canonical name.
    #[must_use]
    pub fn canonical() -> Self {
        Self {
            names: BTreeMap::new(),
        }
    }

    /// Override the display name for one criterion.
    #[must_use]
    pub fn with_name(mut self, criterion: Criterion, name: impl Into<String>) -> Self {
        self.names.insert(criterion, name.into());
        self
    }

    /// Return the display name for `criterion`.
    #[must_use]
    pub fn display_name(&self, criterion: Criterion) -> &str {
        self.names
            .get(&criterion)
            .map_or(criterion.as_str(), String::as_str)
    }
}

impl Default for CriterionNames {
    fn default() -> Self {
        Self::canonical().with_name(Criterion::SquaredError, "mse")
    }
}
