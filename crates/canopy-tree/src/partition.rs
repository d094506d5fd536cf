//! Exact axis-aligned partition of a 2D box induced by a tree.

use tracing::{debug, instrument};

use crate::{
    TreeError,
    node::{Axis, NodeIndex},
    stats::Prediction,
    tree::DecisionTree,
};

/// A closed interval `[min, max]` along one axis.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct AxisRange {
    min: f64,
    max: f64,
}

impl AxisRange {
    /// Lower bound.
    #[must_use]
    pub fn min(self) -> f64 {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub fn max(self) -> f64 {
        self.max
    }

    /// `max - min`; zero for a collapsed range.
    #[must_use]
    pub fn extent(self) -> f64 {
        self.max - self.min
    }

    fn contains(self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }

    /// Cut at `threshold`, clamped into the range so neither half inverts.
    fn cut(self, threshold: f64) -> (Self, Self) {
        let at = threshold.clamp(self.min, self.max);
        (
            Self {
                min: self.min,
                max: at,
            },
            Self {
                min: at,
                max: self.max,
            },
        )
    }
}

/// The axis-aligned box a partition is computed over.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct BoundingBox {
    x: AxisRange,
    y: AxisRange,
}

impl BoundingBox {
    /// Create a box from `(min, max)` ranges.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::DegenerateRange`] when either range is
    /// non-finite or has `min >= max`.
    pub fn new(x_range: (f64, f64), y_range: (f64, f64)) -> Result<Self, TreeError> {
        Ok(Self {
            x: checked_range("x", x_range)?,
            y: checked_range("y", y_range)?,
        })
    }

    /// Frame a set of points, padding the data extent by `padding` on every side.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`TreeError::EmptyPointSet`] | `points` is empty |
    /// | [`TreeError::DegenerateRange`] | the padded extent is still non-positive or non-finite |
    pub fn around_points(points: &[[f64; 2]], padding: f64) -> Result<Self, TreeError> {
        let first = points.first().ok_or(TreeError::EmptyPointSet)?;
        let mut lo = *first;
        let mut hi = *first;
        for p in &points[1..] {
            for axis in 0..2 {
                lo[axis] = lo[axis].min(p[axis]);
                hi[axis] = hi[axis].max(p[axis]);
            }
        }
        Self::new(
            (lo[0] - padding, hi[0] + padding),
            (lo[1] - padding, hi[1] + padding),
        )
    }

    /// Horizontal range.
    #[must_use]
    pub fn x(&self) -> AxisRange {
        self.x
    }

    /// Vertical range.
    #[must_use]
    pub fn y(&self) -> AxisRange {
        self.y
    }

    /// Width times height.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.x.extent() * self.y.extent()
    }

    fn split(&self, axis: Axis, threshold: f64) -> (Self, Self) {
        match axis {
            Axis::X => {
                let (left, right) = self.x.cut(threshold);
                (Self { x: left, ..*self }, Self { x: right, ..*self })
            }
            Axis::Y => {
                let (left, right) = self.y.cut(threshold);
                (Self { y: left, ..*self }, Self { y: right, ..*self })
            }
        }
    }
}

fn checked_range(axis: &'static str, (min, max): (f64, f64)) -> Result<AxisRange, TreeError> {
    if !min.is_finite() || !max.is_finite() || min >= max {
        return Err(TreeError::DegenerateRange { axis, min, max });
    }
    Ok(AxisRange { min, max })
}

/// The region of the box that one leaf is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Rectangle {
    /// Left edge.
    pub x_min: f64,
    /// Bottom edge.
    pub y_min: f64,
    /// Horizontal extent; zero when a threshold fell outside the live box.
    pub width: f64,
    /// Vertical extent; zero when a threshold fell outside the live box.
    pub height: f64,
    /// Class label or regression value of the leaf.
    pub predicted_value: Prediction,
    /// Impurity of the leaf.
    pub impurity: f64,
    /// Arena position of the leaf.
    pub leaf: NodeIndex,
}

impl Rectangle {
    /// Width times height.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Right edge.
    #[must_use]
    pub fn x_max(&self) -> f64 {
        self.x_min + self.width
    }

    /// Top edge.
    #[must_use]
    pub fn y_max(&self) -> f64 {
        self.y_min + self.height
    }

    /// Return `true` if the closed rectangle contains `point`.
    #[must_use]
    pub fn contains(&self, point: [f64; 2]) -> bool {
        self.x_min <= point[0]
            && point[0] <= self.x_max()
            && self.y_min <= point[1]
            && point[1] <= self.y_max()
    }

    fn from_box(
        bounds: &BoundingBox,
        predicted_value: Prediction,
        impurity: f64,
        leaf: NodeIndex,
    ) -> Self {
        Self {
            x_min: bounds.x.min,
            y_min: bounds.y.min,
            width: bounds.x.extent(),
            height: bounds.y.extent(),
            predicted_value,
            impurity,
            leaf,
        }
    }
}

/// Rectangles tiling a [`BoundingBox`], one per leaf, in left-to-right leaf order.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Partition {
    bounds: BoundingBox,
    rectangles: Vec<Rectangle>,
}

impl Partition {
    /// The box that was partitioned.
    #[must_use]
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// The emitted rectangles, including zero-area ones.
    #[must_use]
    pub fn rectangles(&self) -> &[Rectangle] {
        &self.rectangles
    }

    /// Sum of rectangle areas; equals the box area up to rounding.
    #[must_use]
    pub fn total_area(&self) -> f64 {
        self.rectangles.iter().map(Rectangle::area).sum()
    }

    /// First rectangle (in emission order) whose closed region contains `point`.
    #[must_use]
    pub fn locate(&self, point: [f64; 2]) -> Option<&Rectangle> {
        self.rectangles.iter().find(|r| r.contains(point))
    }
}

/// Partition the box `x_range` × `y_range` by the tree's splits.
///
/// # Errors
///
/// [`TreeError::DegenerateRange`] for a bad box, otherwise any error from
/// [`DecisionTree::validate`].
pub fn partition(
    tree: &DecisionTree,
    x_range: (f64, f64),
    y_range: (f64, f64),
) -> Result<Partition, TreeError> {
    let bounds = BoundingBox::new(x_range, y_range)?;
    partition_box(tree, &bounds)
}

/// Partition an already validated [`BoundingBox`] by the tree's splits.
///
/// Each internal node cuts the live box at its threshold (clamped into
/// the box) before its children are visited; each leaf emits the box it
/// receives.
///
/// # Errors
///
/// Any error from [`DecisionTree::validate`].
#[instrument(skip_all, fields(n_nodes = tree.n_nodes()))]
pub fn partition_box(tree: &DecisionTree, bounds: &BoundingBox) -> Result<Partition, TreeError> {
    let view = tree.validate()?;
    let mut rectangles = Vec::with_capacity(view.n_leaves());
    let mut stack = vec![(NodeIndex::ROOT, *bounds)];

    while let Some((idx, live)) = stack.pop() {
        match view.split(idx) {
            Some(split) => {
                let (left, right) = live.split(split.axis, split.threshold);
                stack.push((split.right, right));
                stack.push((split.left, left));
            }
            None => {
                let node = view.node(idx);
                rectangles.push(Rectangle::from_box(
                    &live,
                    view.leaf_prediction(idx),
                    node.impurity().value(),
                    idx,
                ));
            }
        }
    }

    let n_empty = rectangles.iter().filter(|r| r.area() == 0.0).count();
    debug!(n_rectangles = rectangles.len(), n_empty, "partition extracted");

    Ok(Partition {
        bounds: *bounds,
        rectangles,
    })
}
