//! JSON tree-file reader.

use std::path::{Path, PathBuf};

use canopy_tree::{Criterion, DecisionTree, Node};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::TreeDataset;

/// Reads one tree or an ensemble of trees from a JSON file.
///
/// Two layouts are accepted. A single tree:
///
/// ```json
/// { "criterion": "gini", "nodes": [ ... ], "feature_names": ["x", "y"] }
/// ```
///
/// and an ensemble, whose members share the optional context keys:
///
/// ```json
/// { "trees": [ { "criterion": "gini", "nodes": [ ... ] }, ... ], "points": [[0.1, 0.2]] }
/// ```
///
/// Node objects carry `is_leaf`, `impurity`, `n_samples`, `value`, and for
/// splits `feature`, `threshold`, `left`, `right`. Tree structure is not
/// checked here; that happens per call in the serializer and extractor.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::JsonParse`] | Malformed JSON, wrong field types, or a non-finite point |
/// | [`IoError::MissingTree`] | Neither layout is present |
/// | [`IoError::EmptyEnsemble`] | `trees` is an empty list |
pub struct TreeReader {
    path: PathBuf,
}

impl TreeReader {
    /// Create a new reader for the given JSON file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and decode the tree file, returning a [`TreeDataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<TreeDataset, IoError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        debug!(bytes = text.len(), "read tree file");

        let file: TreeFile = serde_json::from_str(&text).map_err(|e| IoError::JsonParse {
            path: self.path.clone(),
            line: e.line(),
            column: e.column(),
            source: e,
        })?;

        let trees = match (file.trees, file.criterion, file.nodes) {
            (Some(trees), _, _) => {
                if trees.is_empty() {
                    return Err(IoError::EmptyEnsemble {
                        path: self.path.clone(),
                    });
                }
                trees
            }
            (None, Some(criterion), Some(nodes)) => vec![DecisionTree::new(criterion, nodes)],
            _ => {
                return Err(IoError::MissingTree {
                    path: self.path.clone(),
                });
            }
        };

        info!(
            n_trees = trees.len(),
            n_nodes = trees.iter().map(DecisionTree::n_nodes).sum::<usize>(),
            n_points = file.points.len(),
            "trees loaded"
        );

        Ok(TreeDataset::new(file.feature_names, file.points, trees))
    }
}

// --- Shadow struct for JSON deserialization ---

#[derive(Deserialize)]
struct TreeFile {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    #[serde(default)]
    points: Vec<[f64; 2]>,
    #[serde(default)]
    trees: Option<Vec<DecisionTree>>,
    #[serde(default)]
    criterion: Option<Criterion>,
    #[serde(default)]
    nodes: Option<Vec<Node>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const STUMP_NODES: &str = r#"[
        {"is_leaf": false, "feature": 0, "threshold": 0.5, "left": 1, "right": 2,
         "impurity": 0.5, "n_samples": 4, "value": [2.0, 2.0]},
        {"is_leaf": true, "impurity": 0.0, "n_samples": 2, "value": [2.0, 0.0]},
        {"is_leaf": true, "impurity": 0.0, "n_samples": 2, "value": [0.0, 2.0]}
    ]"#;

    fn write_json(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn single_tree() {
        let f = write_json(&format!(
            r#"{{"criterion": "gini", "nodes": {STUMP_NODES}, "feature_names": ["age", "income"]}}"#
        ));
        let ds = TreeReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_trees(), 1);
        assert_eq!(ds.trees()[0].n_nodes(), 3);
        assert_eq!(ds.trees()[0].criterion(), Criterion::Gini);
        assert_eq!(ds.feature_names().unwrap(), ["age", "income"]);
        assert!(ds.points().is_empty());
    }

    #[test]
    fn ensemble_with_points() {
        let f = write_json(&format!(
            r#"{{"trees": [
                {{"criterion": "entropy", "nodes": {STUMP_NODES}}},
                {{"criterion": "gini", "nodes": {STUMP_NODES}}}
            ], "points": [[0.0, 1.0], [2.0, 3.0]]}}"#
        ));
        let ds = TreeReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_trees(), 2);
        assert_eq!(ds.trees()[0].criterion(), Criterion::Entropy);
        assert_eq!(ds.points(), [[0.0, 1.0], [2.0, 3.0]]);
        assert!(ds.feature_names().is_none());
    }

    #[test]
    fn mse_alias_accepted() {
        let f = write_json(
            r#"{"criterion": "mse", "nodes": [
                {"is_leaf": true, "impurity": 1.5, "n_samples": 10, "value": [3.2]}
            ]}"#,
        );
        let ds = TreeReader::new(f.path()).read().unwrap();
        assert_eq!(ds.trees()[0].criterion(), Criterion::SquaredError);
    }

    #[test]
    fn file_not_found() {
        let result = TreeReader::new(Path::new("/nonexistent/tree.json")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn malformed_json_reports_position() {
        let f = write_json("{\n  \"criterion\": \"gini\",\n  \"nodes\": [,]\n}");
        match TreeReader::new(f.path()).read() {
            Err(IoError::JsonParse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected JsonParse, got {other:?}"),
        }
    }

    #[test]
    fn unknown_criterion_is_parse_error() {
        let f = write_json(&format!(r#"{{"criterion": "hinge", "nodes": {STUMP_NODES}}}"#));
        let result = TreeReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::JsonParse { .. })));
    }

    #[test]
    fn missing_nodes() {
        let f = write_json(r#"{"criterion": "gini"}"#);
        let result = TreeReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::MissingTree { .. })));
    }

    #[test]
    fn empty_ensemble() {
        let f = write_json(r#"{"trees": []}"#);
        let result = TreeReader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyEnsemble { .. })));
    }
}
