use glam::Vec2;
use serde::Serialize;

/// An axis-aligned bounding box in image pixel coordinates.
///
/// `min` is the top-left corner and `max` the bottom-right corner; the Y axis
/// grows downward as it does in the source photo.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bbox {
    /// Top-left corner.
    pub min: Vec2,
    /// Bottom-right corner.
    pub max: Vec2,
}

impl Bbox {
    /// Creates a bounding box from its top-left and bottom-right corners.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use pestcount_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 5.0));
    /// assert_eq!(bbox.width(), 10.0);
    /// ```
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from `left, top, right, bottom` edges.
    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(Vec2::new(left, top), Vec2::new(right, bottom))
    }

    /// Creates a bounding box from a center point and size vector.
    ///
    /// This is the box encoding of YOLO-style heads, which emit
    /// `(center_x, center_y, width, height)` per anchor.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use pestcount_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_center_size(Vec2::new(100.0, 200.0), Vec2::new(50.0, 80.0));
    /// assert_eq!(bbox.min, Vec2::new(75.0, 160.0));
    /// assert_eq!(bbox.max, Vec2::new(125.0, 240.0));
    /// ```
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half_size = size / 2.0;
        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }

    pub fn left(&self) -> f32 {
        self.min.x
    }

    pub fn top(&self) -> f32 {
        self.min.y
    }

    pub fn right(&self) -> f32 {
        self.max.x
    }

    pub fn bottom(&self) -> f32 {
        self.max.y
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// Area of the box (width × height).
    ///
    /// A degenerate or inverted box has an area of zero or less; callers that
    /// divide by an area must guard against that.
    pub fn area(&self) -> f32 {
        let size = self.size();
        size.x * size.y
    }

    /// Area shared by this box and `other`, or `0.0` when they do not overlap.
    ///
    /// Boxes that only touch along an edge do not intersect.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use pestcount_core::analysis::bbox::Bbox;
    /// let bbox1 = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 4.0));
    /// let bbox2 = Bbox::new(Vec2::new(2.0, 2.0), Vec2::new(6.0, 6.0));
    /// assert_eq!(bbox1.intersection(&bbox2), 4.0);
    /// ```
    pub fn intersection(&self, other: &Self) -> f32 {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);

        if max.x > min.x && max.y > min.y {
            (max.x - min.x) * (max.y - min.y)
        } else {
            0.
        }
    }

    /// Intersection over Union with `other`.
    ///
    /// `IoU = intersection / (area1 + area2 - intersection)`. Returns `0.0` for
    /// non-intersecting boxes, so both stay independently eligible during
    /// suppression.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use pestcount_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
    /// assert_eq!(bbox.iou(&bbox), 1.0);
    /// ```
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection_area = self.intersection(other);
        if intersection_area <= 0.0 {
            return 0.0;
        }
        let union_area = self.area() + other.area() - intersection_area;

        if union_area > 0.0 {
            intersection_area / union_area
        } else {
            0.0
        }
    }

    /// Clamps the box so it stays within `min_bounds..=max_bounds`.
    pub fn clamp(&self, min_bounds: Vec2, max_bounds: Vec2) -> Self {
        Self {
            min: self.min.max(min_bounds).min(max_bounds),
            max: self.max.min(max_bounds).max(min_bounds),
        }
    }
}
