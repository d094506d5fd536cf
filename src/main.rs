use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use canopy_io::{ExperimentName, ResultWriter, TreeDataset, TreeReader};
use canopy_tree::{
    BoundingBox, DecisionTree, TaskMode, TreeSerializer, partition_ensemble, serialize_ensemble,
};

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Structure documents and exact 2D decision regions for trained decision trees")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for ensemble processing (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Arguments shared by the commands that write artifacts.
#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Path to the tree JSON file (single tree or ensemble)
    #[arg(long)]
    tree: PathBuf,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Maximum number of ensemble members to process
    #[arg(long, default_value_t = 50)]
    limit: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a tree file and print per-tree summaries
    Inspect {
        /// Path to the tree JSON file (single tree or ensemble)
        #[arg(long)]
        tree: PathBuf,
    },

    /// Write the nested structure document of every tree
    Serialize {
        #[command(flatten)]
        output: OutputArgs,

        /// Axis names for features 0 and 1, comma separated (overrides the file)
        #[arg(long, value_delimiter = ',')]
        feature_names: Option<Vec<String>>,
    },

    /// Write the rectangles each tree induces on a bounding box
    Partition {
        #[command(flatten)]
        output: OutputArgs,

        /// Left edge of the box
        #[arg(long, allow_negative_numbers = true)]
        x_min: Option<f64>,

        /// Right edge of the box
        #[arg(long, allow_negative_numbers = true)]
        x_max: Option<f64>,

        /// Bottom edge of the box
        #[arg(long, allow_negative_numbers = true)]
        y_min: Option<f64>,

        /// Top edge of the box
        #[arg(long, allow_negative_numbers = true)]
        y_max: Option<f64>,

        /// Margin around the file's points when no explicit box is given
        #[arg(long, default_value_t = 0.5)]
        padding: f64,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct InspectOutput {
    n_trees: usize,
    n_points: usize,
    trees: Vec<TreeSummary>,
}

#[derive(Serialize)]
struct TreeSummary {
    criterion: String,
    task: &'static str,
    n_classes: Option<usize>,
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
}

#[derive(Serialize)]
struct SerializeOutput {
    experiment: String,
    n_trees: usize,
    feature_names: [String; 2],
    path: PathBuf,
}

#[derive(Serialize)]
struct PartitionOutput {
    experiment: String,
    n_trees: usize,
    bounds: BoundingBox,
    n_rectangles: Vec<usize>,
    path: PathBuf,
}

fn read_dataset(path: &Path) -> Result<TreeDataset> {
    TreeReader::new(path)
        .read()
        .with_context(|| format!("failed to read tree file {}", path.display()))
}

/// Cap the member list at `limit`, logging when trees are dropped.
fn limited(trees: &[DecisionTree], limit: usize) -> Result<&[DecisionTree]> {
    if limit == 0 {
        anyhow::bail!("--limit must be at least 1");
    }
    if trees.len() > limit {
        warn!(n_trees = trees.len(), limit, "ensemble truncated");
        return Ok(&trees[..limit]);
    }
    Ok(trees)
}

fn summarize(tree: &DecisionTree) -> Result<TreeSummary> {
    let validated = tree.validate()?;
    let (task, n_classes) = match validated.task() {
        TaskMode::Classification { n_classes } => ("classification", Some(n_classes)),
        TaskMode::Regression => ("regression", None),
    };
    Ok(TreeSummary {
        criterion: tree.criterion().to_string(),
        task,
        n_classes,
        n_nodes: tree.n_nodes(),
        n_leaves: validated.n_leaves(),
        depth: validated.depth(),
    })
}

fn resolve_bounds(
    dataset: &TreeDataset,
    (x_min, x_max, y_min, y_max): (Option<f64>, Option<f64>, Option<f64>, Option<f64>),
    padding: f64,
) -> Result<BoundingBox> {
    let bounds = match (x_min, x_max, y_min, y_max) {
        (Some(x_min), Some(x_max), Some(y_min), Some(y_max)) => {
            BoundingBox::new((x_min, x_max), (y_min, y_max)).context("invalid bounding box")?
        }
        (None, None, None, None) => BoundingBox::around_points(dataset.points(), padding)
            .context("tree file has no usable points; pass --x-min/--x-max/--y-min/--y-max")?,
        _ => anyhow::bail!("--x-min, --x-max, --y-min and --y-max must be given together"),
    };
    info!(
        x_min = bounds.x().min(),
        x_max = bounds.x().max(),
        y_min = bounds.y().min(),
        y_max = bounds.y().max(),
        "bounding box resolved"
    );
    Ok(bounds)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Inspect { tree } => {
            let dataset = read_dataset(&tree)?;

            let trees = dataset
                .trees()
                .iter()
                .enumerate()
                .map(|(i, t)| summarize(t).with_context(|| format!("tree {i} is invalid")))
                .collect::<Result<Vec<_>>>()?;

            let output = InspectOutput {
                n_trees: dataset.n_trees(),
                n_points: dataset.points().len(),
                trees,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Serialize {
            output,
            feature_names,
        } => {
            let experiment_name = ExperimentName::new(output.experiment.clone())?;

            // 1. Read trees
            let dataset = read_dataset(&output.tree)?;
            let trees = limited(dataset.trees(), output.limit)?;

            // 2. Pick axis names: flag, then file, then defaults
            let serializer = match feature_names.as_deref().or(dataset.feature_names()) {
                Some(names) => TreeSerializer::new(names).context("invalid feature names")?,
                None => TreeSerializer::default(),
            };

            // 3. Serialize every member
            let docs = serialize_ensemble(&serializer, trees).context("serialization failed")?;

            // 4. Write structure JSON
            let writer = ResultWriter::new(&output.output_dir, experiment_name)?;
            writer.write_structure(serializer.feature_names(), &docs)?;

            // 5. Print summary
            let summary = SerializeOutput {
                experiment: output.experiment,
                n_trees: docs.len(),
                feature_names: serializer.feature_names().clone(),
                path: writer.structure_path(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Partition {
            output,
            x_min,
            x_max,
            y_min,
            y_max,
            padding,
        } => {
            let experiment_name = ExperimentName::new(output.experiment.clone())?;

            // 1. Read trees
            let dataset = read_dataset(&output.tree)?;
            let trees = limited(dataset.trees(), output.limit)?;

            // 2. Resolve the box
            let bounds = resolve_bounds(&dataset, (x_min, x_max, y_min, y_max), padding)?;

            // 3. Partition every member
            let partitions =
                partition_ensemble(trees, &bounds).context("partition extraction failed")?;

            // 4. Write boundaries JSON
            let writer = ResultWriter::new(&output.output_dir, experiment_name)?;
            writer.write_boundaries(&bounds, &partitions)?;

            // 5. Print summary
            let summary = PartitionOutput {
                experiment: output.experiment,
                n_trees: partitions.len(),
                bounds,
                n_rectangles: partitions.iter().map(|p| p.rectangles().len()).collect(),
                path: writer.boundaries_path(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
