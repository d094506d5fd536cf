//! End-to-end integration tests: tree JSON -> serialize/partition -> JSON artifacts.

use std::fs;
use std::path::Path;

use canopy_io::{ExperimentName, IoError, ResultWriter, TreeReader};
use canopy_tree::{
    BoundingBox, ErrorKind, Prediction, TreeSerializer, partition_box, partition_ensemble,
    serialize_ensemble,
};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn classifier_structure_round_trip() {
    let dataset = TreeReader::new(&fixture_path("classifier.json"))
        .read()
        .expect("fixture should parse");
    assert_eq!(dataset.n_trees(), 1);

    let serializer = TreeSerializer::new(dataset.feature_names().unwrap()).unwrap();
    let docs = serialize_ensemble(&serializer, dataset.trees()).unwrap();

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(
        dir.path(),
        ExperimentName::new("iris_rt".into()).unwrap(),
    )
    .unwrap();
    writer.write_structure(serializer.feature_names(), &docs).unwrap();

    let content = read_json(&dir.path().join("iris_rt_structure.json"));
    assert_eq!(content["experiment"], "iris_rt");

    let root = &content["trees"][0];
    assert_eq!(root["name"], "petal_length");
    assert_eq!(root["samples"], 8);
    assert_eq!(root["math"]["criterion"], "gini");
    assert_eq!(root["math"]["formula"], "1 - sum(p^2)");

    // 0.65625 - (2/8 * 0 + 6/8 * 0.5)
    let gain = root["gain"].as_f64().unwrap();
    assert!((gain - 0.28125).abs() < 1e-12, "gain {gain}");

    let right = &root["children"][1];
    assert_eq!(right["name"], "petal_width");
    let leaf = &right["children"][1];
    assert_eq!(leaf["type"], "leaf");
    assert_eq!(leaf["name"], "Leaf");
    assert_eq!(leaf["math"]["predicted_class"], 2);
    let probs: Vec<f64> = leaf["math"]["probs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p.as_f64().unwrap())
        .collect();
    assert_eq!(probs, vec![0.0, 0.0, 1.0]);
}

#[test]
fn classifier_boundaries_from_points() {
    let dataset = TreeReader::new(&fixture_path("classifier.json")).read().unwrap();
    let bounds = BoundingBox::around_points(dataset.points(), 0.5).unwrap();
    assert!((bounds.x().min() - 0.8).abs() < 1e-12);
    assert!((bounds.y().max() - 3.0).abs() < 1e-12);

    let part = partition_box(&dataset.trees()[0], &bounds).unwrap();
    let rects = part.rectangles();
    assert_eq!(rects.len(), 3);
    assert_eq!(rects[0].predicted_value, Prediction::Class(0));
    assert!((rects[0].width - (2.45 - 0.8)).abs() < 1e-12);
    assert_eq!(rects[1].predicted_value, Prediction::Class(1));
    assert!((rects[1].y_max() - 1.75).abs() < 1e-12);
    assert_eq!(rects[2].predicted_value, Prediction::Class(2));
    assert!((part.total_area() - bounds.area()).abs() < 1e-9);

    let dir = TempDir::new().unwrap();
    let writer =
        ResultWriter::new(dir.path(), ExperimentName::new("iris".into()).unwrap()).unwrap();
    writer.write_boundaries(&bounds, &[part]).unwrap();

    let content = read_json(&writer.boundaries_path());
    assert_eq!(content["trees"][0]["rectangles"].as_array().unwrap().len(), 3);
    assert_eq!(content["trees"][0]["rectangles"][2]["leaf"], 4);
}

#[test]
fn regression_forest_pipeline() {
    let dataset = TreeReader::new(&fixture_path("forest.json")).read().unwrap();
    assert_eq!(dataset.n_trees(), 2);

    let docs = serialize_ensemble(&TreeSerializer::default(), dataset.trees()).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].math().criterion(), "mse");
    assert!((docs[0].gain().unwrap() - 9.0).abs() < 1e-12);
    assert_eq!(docs[1].leaves().len(), 3);

    let bounds = BoundingBox::around_points(dataset.points(), 0.5).unwrap();
    let partitions = partition_ensemble(dataset.trees(), &bounds).unwrap();
    assert_eq!(partitions[0].rectangles().len(), 2);
    assert_eq!(partitions[1].rectangles().len(), 3);
    let located = partitions[1].locate([3.0, 9.0]).unwrap();
    assert_eq!(located.predicted_value, Prediction::Value(9.0));

    let dir = TempDir::new().unwrap();
    let writer =
        ResultWriter::new(dir.path(), ExperimentName::new("forest".into()).unwrap()).unwrap();
    writer
        .write_structure(&["Feature 0".into(), "Feature 1".into()], &docs)
        .unwrap();
    writer.write_boundaries(&bounds, &partitions).unwrap();

    let structure = read_json(&writer.structure_path());
    assert_eq!(structure["n_trees"], 2);
    assert!(structure["trees"][1]["math"]["probs"].is_null());
    let boundaries = read_json(&writer.boundaries_path());
    assert_eq!(boundaries["trees"][1]["tree"], 1);
    assert_eq!(boundaries["trees"][0]["rectangles"][1]["predicted_value"], 6.5);
}

#[test]
fn malformed_links_surface_from_the_core() {
    let dataset = TreeReader::new(&fixture_path("broken_link.json")).read().unwrap();
    let err = TreeSerializer::default()
        .serialize(&dataset.trees()[0])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTreeStructure);

    let bounds = BoundingBox::new((0.0, 1.0), (0.0, 1.0)).unwrap();
    let err = partition_box(&dataset.trees()[0], &bounds).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTreeStructure);
}

#[test]
fn invalid_experiment_name_rejected() {
    let result = ExperimentName::new("bad name!".into());
    assert!(matches!(result, Err(IoError::InvalidExperimentName { .. })));
}
