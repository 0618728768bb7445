//! Frame geometry derived from the prologue.

use crate::error::{GridFrameError, Result};
use crate::msg::prologue::{GridOrigin, Prologue};

/// Order in which a strip's lines are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// Stored bottom to top (south first); strips are flipped on read.
    North,
    /// Stored top to bottom.
    South,
}

/// Affine pixel → projected-metre transform of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X of the upper-left corner.
    pub origin_x: f64,
    /// Column width in metres.
    pub pixel_width: f64,
    /// Y of the upper-left corner.
    pub origin_y: f64,
    /// Row height in metres (negative, rows grow southward).
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Projected coordinates of a pixel centre.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// The six coefficients in `[x0, dx, 0, y0, 0, dy]` order.
    pub fn to_array(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            self.pixel_height,
        ]
    }
}

/// Placement of the high-resolution sub-image halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HrvLayout {
    /// Last frame row of the upper section.
    pub split_row: usize,
    /// Westmost planned column of the lower section.
    pub west_column_offset: i64,
    /// Upper west column minus lower west column.
    pub shift: i64,
}

impl HrvLayout {
    /// Destination column offset for samples of a frame row.
    ///
    /// Rows up to and including the split row are displaced by `-shift`
    /// relative to the lower section.
    pub fn column_offset(&self, width: usize, frame_row: usize) -> i64 {
        let base = width as i64 - self.west_column_offset - 1;
        if frame_row <= self.split_row {
            base - self.shift
        } else {
            base
        }
    }
}

/// Immutable description of a frame's size, strips and georeferencing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub width: usize,
    pub height: usize,
    /// Lines per strip (the last strip may hold fewer).
    pub strip_height: usize,
    pub strip_count: usize,
    pub scan: ScanDirection,
    pub hrv: Option<HrvLayout>,
    pub transform: GeoTransform,
}

impl FrameGeometry {
    /// Geometry of the VIS/IR (`hrv = false`) or HRV sub-image.
    ///
    /// # Errors
    ///
    /// Returns [`GridFrameError::InvalidPrologue`] if the reference grid has
    /// no lines or columns.
    pub fn from_prologue(prologue: &Prologue, hrv: bool) -> Result<Self> {
        let image = &prologue.image;
        let (grid, strip_count) = if hrv {
            (&image.hrv_grid, 24)
        } else {
            (&image.vis_ir_grid, 8)
        };

        if grid.lines <= 0 || grid.columns <= 0 {
            return Err(GridFrameError::InvalidPrologue {
                reason: format!(
                    "reference grid is {} × {}",
                    grid.columns, grid.lines
                ),
            });
        }
        let width = grid.columns as usize;
        let height = grid.lines as usize;

        let scan = match grid.origin {
            GridOrigin::SouthEast | GridOrigin::SouthWest => ScanDirection::North,
            GridOrigin::NorthEast | GridOrigin::NorthWest => ScanDirection::South,
        };

        let pixel_width = grid.column_step_km as f64 * 1000.0;
        let pixel_height = grid.line_step_km as f64 * 1000.0;
        let transform = GeoTransform {
            origin_x: -(width as f64) / 2.0 * pixel_width,
            pixel_width,
            origin_y: height as f64 / 2.0 * pixel_height,
            pixel_height: -pixel_height,
        };

        let hrv = hrv.then(|| {
            let upper = &image.hrv_upper_coverage;
            let lower = &image.hrv_lower_coverage;
            HrvLayout {
                split_row: (upper.north_line as i64 - upper.south_line as i64).unsigned_abs() as usize,
                west_column_offset: lower.west_column as i64,
                shift: upper.west_column as i64 - lower.west_column as i64,
            }
        });

        Ok(Self {
            width,
            height,
            strip_height: height.div_ceil(strip_count),
            strip_count,
            scan,
            hrv,
            transform,
        })
    }

    /// Strip number (1-based) holding a block.
    ///
    /// North-scanned images number their strips from the south, so block 0
    /// at the top of the frame is the last strip.
    pub fn strip_for_block(&self, block: usize) -> usize {
        match self.scan {
            ScanDirection::North => self.strip_count - block,
            ScanDirection::South => block + 1,
        }
    }

    /// Destination column offset for a frame row (0 outside HRV).
    pub fn column_offset(&self, frame_row: usize) -> i64 {
        self.hrv
            .map(|layout| layout.column_offset(self.width, frame_row))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::prologue::tests::sample_prologue;

    #[test]
    fn test_vis_ir_geometry() {
        let geometry = FrameGeometry::from_prologue(&sample_prologue(), false).unwrap();
        assert_eq!(geometry.width, 3712);
        assert_eq!(geometry.height, 3712);
        assert_eq!(geometry.strip_count, 8);
        assert_eq!(geometry.strip_height, 464);
        assert_eq!(geometry.scan, ScanDirection::North);
        assert!(geometry.hrv.is_none());
        assert_eq!(geometry.column_offset(0), 0);

        let t = geometry.transform;
        assert!((t.pixel_width - 3000.403).abs() < 1e-2);
        assert!((t.origin_x + 3712.0 / 2.0 * t.pixel_width).abs() < 1e-6);
        assert!(t.pixel_height < 0.0);
    }

    #[test]
    fn test_hrv_geometry() {
        let geometry = FrameGeometry::from_prologue(&sample_prologue(), true).unwrap();
        assert_eq!(geometry.strip_count, 24);
        assert_eq!(geometry.strip_height, 464);
        let layout = geometry.hrv.unwrap();
        assert_eq!(layout.split_row, 11136 - 8065);
        assert_eq!(layout.west_column_offset, 7631);
        assert_eq!(layout.shift, 5568 - 7631);
    }

    #[test]
    fn test_strip_for_block() {
        let mut geometry = FrameGeometry::from_prologue(&sample_prologue(), false).unwrap();
        assert_eq!(geometry.strip_for_block(0), 8);
        assert_eq!(geometry.strip_for_block(7), 1);

        geometry.scan = ScanDirection::South;
        assert_eq!(geometry.strip_for_block(0), 1);
        assert_eq!(geometry.strip_for_block(7), 8);
    }

    #[test]
    fn test_hrv_column_offset() {
        let layout = HrvLayout {
            split_row: 3,
            west_column_offset: 4,
            shift: 2,
        };
        // Base offset 10 - 4 - 1 = 5
        assert_eq!(layout.column_offset(10, 4), 5);
        assert_eq!(layout.column_offset(10, 3), 3);
        assert_eq!(layout.column_offset(10, 0), 3);
    }

    #[test]
    fn test_pixel_center() {
        let t = GeoTransform {
            origin_x: -1000.0,
            pixel_width: 100.0,
            origin_y: 500.0,
            pixel_height: -50.0,
        };
        assert_eq!(t.pixel_center(0, 0), (-950.0, 475.0));
        assert_eq!(t.pixel_center(2, 3), (-650.0, 375.0));
    }

    #[test]
    fn test_empty_grid_is_invalid() {
        let mut prologue = sample_prologue();
        prologue.image.vis_ir_grid.lines = 0;
        assert!(FrameGeometry::from_prologue(&prologue, false).is_err());
    }
}
