//! Inverse-distance-weighted hole filling.

use crate::dted::tile::TileBuffer;

/// Fills no-data posts from their known neighbours.
///
/// Each missing post becomes the inverse-distance-weighted mean of the known
/// posts inside a square window of `2·radius + 1` posts, clipped to the tile.
/// Posts without any known neighbour stay no-data.
///
/// A fill reads only the original buffer: values filled in one pass never
/// contribute to other posts of the same pass.
///
/// # Example
///
/// ```ignore
/// use gridframe::dted::fill::GapFiller;
///
/// let filler = GapFiller::new(3);
/// let (filled, count) = filler.fill(&buffer);
/// ```
#[derive(Debug, Clone)]
pub struct GapFiller {
    radius: usize,
    /// Row-major `(2r+1)²` weights, zero at the centre
    kernel: Vec<f64>,
}

impl GapFiller {
    /// Precompute the kernel for a search radius in posts.
    pub fn new(radius: usize) -> Self {
        let size = 2 * radius + 1;
        let r = radius as isize;
        let mut kernel = Vec::with_capacity(size * size);
        for dy in -r..=r {
            for dx in -r..=r {
                kernel.push(inverse_distance(dx, dy));
            }
        }
        Self { radius, kernel }
    }

    /// Search radius in posts.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Weight applied to a neighbour at offset `(dx, dy)`.
    pub fn weight(&self, dx: isize, dy: isize) -> f64 {
        let r = self.radius as isize;
        if dx.abs() > r || dy.abs() > r {
            return 0.0;
        }
        let size = 2 * r + 1;
        self.kernel[((dy + r) * size + (dx + r)) as usize]
    }

    /// Fill the holes of `source`, returning the new buffer and the number of
    /// posts that were filled.
    pub fn fill(&self, source: &TileBuffer) -> (TileBuffer, usize) {
        let mut output = source.clone();
        if self.radius == 0 {
            return (output, 0);
        }

        let width = source.width();
        let height = source.height();
        let r = self.radius as isize;

        // Columns with no allocated neighbour within the radius have nothing to fill from
        let allocated: Vec<bool> = (0..width).map(|c| source.column(c).is_some()).collect();
        let mut filled = 0;

        for col in 0..width {
            let lo = col.saturating_sub(self.radius);
            let hi = (col + self.radius).min(width - 1);
            if !allocated[lo..=hi].iter().any(|&a| a) {
                continue;
            }

            for row in 0..height {
                if !source.is_missing(col, row) {
                    continue;
                }

                let mut weighted_sum = 0.0;
                let mut weight_sum = 0.0;
                for dx in -r..=r {
                    let c = col as isize + dx;
                    if c < 0 || c >= width as isize || !allocated[c as usize] {
                        continue;
                    }
                    for dy in -r..=r {
                        let rr = row as isize + dy;
                        if rr < 0 || rr >= height as isize {
                            continue;
                        }
                        if source.is_missing(c as usize, rr as usize) {
                            continue;
                        }
                        let w = self.weight(dx, dy);
                        weighted_sum += w * source.get(c as usize, rr as usize) as f64;
                        weight_sum += w;
                    }
                }

                if weight_sum > 0.0 {
                    let value = (weighted_sum / weight_sum + 0.5).floor() as i16;
                    output.set(col, row, value);
                    filled += 1;
                }
            }
        }

        (output, filled)
    }
}

fn inverse_distance(dx: isize, dy: isize) -> f64 {
    if dx == 0 && dy == 0 {
        0.0
    } else {
        1.0 / ((dx * dx + dy * dy) as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dted::file::NODATA_VALUE;

    #[test]
    fn test_kernel_weights() {
        let filler = GapFiller::new(2);
        assert_eq!(filler.weight(0, 0), 0.0);
        assert_eq!(filler.weight(1, 0), 1.0);
        assert_eq!(filler.weight(0, -2), 0.5);
        assert!((filler.weight(1, 1) - 1.0 / 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(filler.weight(3, 0), 0.0);
    }

    #[test]
    fn test_single_neighbour_copies_value() {
        let mut buffer = TileBuffer::new(10, 10);
        buffer.set(4, 4, 1234);

        let (filled, count) = GapFiller::new(3).fill(&buffer);
        assert_eq!(filled.get(4, 4), 1234);
        assert_eq!(filled.get(6, 7), 1234);
        assert_eq!(filled.get(1, 1), 1234);
        // Outside the window
        assert_eq!(filled.get(8, 4), NODATA_VALUE);
        assert_eq!(count, 7 * 7 - 1);
    }

    #[test]
    fn test_no_neighbours_stays_missing() {
        let mut buffer = TileBuffer::new(20, 20);
        buffer.set(0, 0, 5);

        let (filled, _) = GapFiller::new(2).fill(&buffer);
        assert_eq!(filled.get(10, 10), NODATA_VALUE);
        assert!(filled.column(10).is_none());
    }

    #[test]
    fn test_weighted_mean() {
        let mut buffer = TileBuffer::new(5, 1);
        buffer.set(0, 0, 100);
        buffer.set(3, 0, 400);

        // Post 1: (100·1 + 400·½) / 1.5 = 200
        let (filled, _) = GapFiller::new(2).fill(&buffer);
        assert_eq!(filled.get(1, 0), 200);
    }

    #[test]
    fn test_single_pass() {
        let mut buffer = TileBuffer::new(5, 1);
        buffer.set(0, 0, 10);

        // Post 2 is two posts away from the only source; post 1 being filled
        // in the same pass must not pull post 3 into range.
        let (filled, _) = GapFiller::new(2).fill(&buffer);
        assert_eq!(filled.get(1, 0), 10);
        assert_eq!(filled.get(2, 0), 10);
        assert_eq!(filled.get(3, 0), NODATA_VALUE);
    }
}
