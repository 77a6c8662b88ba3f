use tracing::{debug, warn};

use crate::consts::{
    BLOCK_LOG2_MAX, BLOCK_LOG2_MIN, CELL_SET_HEIGHT_MAX, CELL_SET_WIDTH_MAX, GRID_HEIGHT_MAX,
    GRID_WIDTH_MAX,
};
use crate::geometry::Size;

/// Placement of the statistics cell grid over the BDS output.
///
/// `width` and `height` count cells; each cell is
/// `2^block_width_log2 x 2^block_height_log2` pixels. Both exponents are
/// held in `[BLOCK_LOG2_MIN, BLOCK_LOG2_MAX]` and the covered area never
/// exceeds the BDS output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridDescriptor {
    pub width: u32,
    pub height: u32,
    pub block_width_log2: u32,
    pub block_height_log2: u32,
    pub x_start: u32,
    pub y_start: u32,
}

impl GridDescriptor {
    pub fn cells(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Pixel width covered by the grid.
    pub fn covered_width(&self) -> u32 {
        self.width << self.block_width_log2
    }

    /// Pixel height covered by the grid.
    pub fn covered_height(&self) -> u32 {
        self.height << self.block_height_log2
    }
}

/// Fit one axis: pick the block exponent whose covered span is closest to
/// `target`, preferring the smaller exponent on ties.
fn fit_axis(target: u32, cells_per_set_max: u32, cells_store_max: u32) -> (u32, u32, u32) {
    let mut best: Option<(u32, u32, u32)> = None;

    for log2 in BLOCK_LOG2_MIN..=BLOCK_LOG2_MAX {
        let cells = (target >> log2)
            .min(cells_per_set_max)
            .min(cells_store_max);
        let covered = cells << log2;
        let error = target.abs_diff(covered);

        match best {
            Some((_, _, best_error)) if error >= best_error => {}
            _ => best = Some((cells, log2, error)),
        }
    }

    // The range [3, 7] is non-empty, so an entry always exists.
    let (cells, log2, error) = best.unwrap();
    (cells, log2, error)
}

/// Resolve the statistics grid for a BDS output size.
///
/// Minimizes the summed horizontal and vertical coverage error over all
/// block exponent pairs. The grid is anchored at the origin; a grid
/// covering less than 80% of the BDS area is worth a warning since the
/// uncovered border is invisible to every algorithm.
pub fn resolve_grid(bds_output: Size) -> GridDescriptor {
    let (width, bw_log2, _) = fit_axis(bds_output.width, CELL_SET_WIDTH_MAX, GRID_WIDTH_MAX);
    let (height, bh_log2, _) = fit_axis(bds_output.height, CELL_SET_HEIGHT_MAX, GRID_HEIGHT_MAX);

    let grid = GridDescriptor {
        width,
        height,
        block_width_log2: bw_log2,
        block_height_log2: bh_log2,
        x_start: 0,
        y_start: 0,
    };

    let covered = grid.covered_width() as u64 * grid.covered_height() as u64;
    let total = bds_output.area();
    if covered * 100 < total * 80 {
        warn!(
            %bds_output,
            grid_width = grid.width,
            grid_height = grid.height,
            coverage_pct = covered * 100 / total,
            "statistics grid covers less than 80% of the BDS output"
        );
    }

    debug!(
        %bds_output,
        width = grid.width,
        height = grid.height,
        block_width_log2 = grid.block_width_log2,
        block_height_log2 = grid.block_height_log2,
        "resolved statistics grid"
    );

    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_matches_720p_exactly() {
        let grid = resolve_grid(Size::new(1280, 720));
        assert_eq!(grid.width, 80);
        assert_eq!(grid.height, 45);
        assert_eq!(grid.block_width_log2, 4);
        assert_eq!(grid.block_height_log2, 4);
        assert_eq!(grid.covered_width(), 1280);
        assert_eq!(grid.covered_height(), 720);
    }

    #[test]
    fn grid_never_exceeds_output() {
        for &(w, h) in &[(640, 480), (1920, 1080), (2592, 1944), (320, 240)] {
            let grid = resolve_grid(Size::new(w, h));
            assert!(grid.covered_width() <= w, "{w}x{h}");
            assert!(grid.covered_height() <= h, "{w}x{h}");
            assert!((3..=7).contains(&grid.block_width_log2));
            assert!((3..=7).contains(&grid.block_height_log2));
        }
    }
}
