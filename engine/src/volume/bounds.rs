//! World-space bounding boxes of sparse grids.

use glam::Vec3;

use super::grid::SparseGrid;

/// Axis-aligned box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl WorldBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point. `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// True when any axis has zero (or negative, or non-finite) extent.
    pub fn is_degenerate(&self) -> bool {
        let size = self.size();
        !size.is_finite() || size.min_element() <= 0.0
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Resolves the precise world-space box of a grid.
///
/// The active index box is inclusive on both ends, so the covered index
/// region is `[min, max + 1)`. All eight corners go through the grid
/// transform, which keeps the result tight for rotated transforms too.
/// Returns `None` when the grid has no active voxels.
pub fn resolve_world_box(grid: &dyn SparseGrid) -> Option<WorldBox> {
    let (index_min, index_max) = grid.active_index_bounds()?;
    let lo = index_min.as_vec3();
    let hi = index_max.as_vec3() + Vec3::ONE;
    let transform = grid.transform();

    let corners = (0..8).map(|corner| {
        let pick = |bit: u32, lo: f32, hi: f32| if corner & bit == 0 { lo } else { hi };
        let index = Vec3::new(pick(1, lo.x, hi.x), pick(2, lo.y, hi.y), pick(4, lo.z, hi.z));
        transform.to_world_vector(index)
    });

    WorldBox::from_points(corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;
    use crate::volume::grid::SparseVoxelGrid;
    use crate::volume::transform::GridTransform;

    #[test]
    fn test_box_center_and_size() {
        let bounds = WorldBox::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 4.0, 6.0));
        assert_eq!(bounds.center(), Vec3::new(1.0, 2.0, 4.0));
        assert_eq!(bounds.size(), Vec3::splat(4.0));
        assert!(!bounds.is_degenerate());
    }

    #[test]
    fn test_flat_box_is_degenerate() {
        let bounds = WorldBox::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0));
        assert!(bounds.is_degenerate());
    }

    #[test]
    fn test_resolve_covers_whole_voxels() {
        let mut grid = SparseVoxelGrid::new("density", GridTransform::uniform(0.5), 0.0);
        grid.set_value(IVec3::new(0, 0, 0), 1.0);
        grid.set_value(IVec3::new(3, 1, 7), 1.0);

        let bounds = resolve_world_box(&grid).unwrap();
        assert_eq!(bounds.min, Vec3::ZERO);
        assert_eq!(bounds.max, Vec3::new(2.0, 1.0, 4.0));
    }

    #[test]
    fn test_resolve_empty_grid() {
        let grid = SparseVoxelGrid::new("empty", GridTransform::uniform(1.0), 0.0);
        assert!(resolve_world_box(&grid).is_none());
    }

    #[test]
    fn test_resolve_voxel_at_index_limit() {
        let mut grid = SparseVoxelGrid::new("edge", GridTransform::uniform(1.0), 0.0);
        grid.set_value(IVec3::new(i32::MAX, 0, 0), 1.0);

        let bounds = resolve_world_box(&grid).unwrap();
        assert!(bounds.max.x >= bounds.min.x);
        assert_eq!(bounds.max.y, 1.0);
    }
}
