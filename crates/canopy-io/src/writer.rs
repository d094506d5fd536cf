//! JSON artifact writer for structure documents and partitions.

use std::fs;
use std::path::{Path, PathBuf};

use canopy_tree::{BoundingBox, Partition, Rectangle, SerializedNode};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes serialized trees and partitions to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_structure.json` and
/// `{experiment}_boundaries.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write structure documents, one per member tree, to `{experiment}_structure.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | A document holds a value JSON cannot encode |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n_trees = docs.len()))]
    pub fn write_structure(
        &self,
        feature_names: &[String; 2],
        docs: &[SerializedNode],
    ) -> Result<(), IoError> {
        let path = self.structure_path();

        let artifact = StructureArtifact {
            experiment: self.experiment.as_str(),
            n_trees: docs.len(),
            feature_names,
            trees: docs,
        };

        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "structure written");
        Ok(())
    }

    /// Write per-tree partitions of a shared box to `{experiment}_boundaries.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | A rectangle holds a value JSON cannot encode |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(n_trees = partitions.len()))]
    pub fn write_boundaries(
        &self,
        bounds: &BoundingBox,
        partitions: &[Partition],
    ) -> Result<(), IoError> {
        let path = self.boundaries_path();

        let trees: Vec<BoundaryEntry<'_>> = partitions
            .iter()
            .enumerate()
            .map(|(tree, p)| BoundaryEntry {
                tree,
                n_rectangles: p.rectangles().len(),
                rectangles: p.rectangles(),
            })
            .collect();

        let artifact = BoundariesArtifact {
            experiment: self.experiment.as_str(),
            n_trees: partitions.len(),
            bounds,
            trees,
        };

        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "boundaries written");
        Ok(())
    }

    /// Path of the structure artifact: `{output_dir}/{experiment}_structure.json`.
    #[must_use]
    pub fn structure_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_structure.json", self.experiment.as_str()))
    }

    /// Path of the boundaries artifact: `{output_dir}/{experiment}_boundaries.json`.
    #[must_use]
    pub fn boundaries_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_boundaries.json", self.experiment.as_str()))
    }

    fn write_json<T: Serialize>(&self, path: &Path, artifact: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, &json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct StructureArtifact<'a> {
    experiment: &'a str,
    n_trees: usize,
    feature_names: &'a [String; 2],
    trees: &'a [SerializedNode],
}

#[derive(Serialize)]
struct BoundariesArtifact<'a> {
    experiment: &'a str,
    n_trees: usize,
    bounds: &'a BoundingBox,
    trees: Vec<BoundaryEntry<'a>>,
}

#[derive(Serialize)]
struct BoundaryEntry<'a> {
    tree: usize,
    n_rectangles: usize,
    rectangles: &'a [Rectangle],
}
