//! Quadtree cell decomposition: image → breadth-first cell list
//!
//! Builds the spatial addressing for one square signal: every cell from the
//! root (whole image) down to the 1×1 leaves, with explicit parent/child
//! linkage. Leaves copy their texel color; interior averages are filled in
//! later by the wavelet build.
//!
//! Author: Moroya Sakamoto

use std::collections::VecDeque;

use glam::Vec3;

use super::{Cell, CellGrid, QUADRANTS};
use crate::types::RadianceMap;

/// Decompose a radiance map into its full quadtree cell list.
///
/// Cells are emitted breadth-first (root first), so `level` is non-decreasing
/// with index and each level occupies one contiguous run. Every interior cell
/// spawns exactly four children in quadrant order TL, TR, BL, BR, each with
/// half the parent's side.
///
/// The map's construction already guarantees a power-of-two resolution, so
/// decomposition itself cannot fail.
pub fn build_cell_grid(image: &RadianceMap) -> CellGrid {
    let resolution = image.resolution();
    let max_level = image.max_level();

    // Full quadtree over N² leaves: (4^(L+1) - 1) / 3 cells.
    let total_cells = ((resolution * resolution * 4) - 1) / 3;
    let mut cells: Vec<Cell> = Vec::with_capacity(total_cells);
    let mut level_first_index = vec![u32::MAX; max_level as usize + 1];

    let root_is_interior = resolution > 1;
    cells.push(Cell {
        color: if root_is_interior {
            Vec3::ZERO
        } else {
            image.texel_at(0)
        },
        level: 0,
        side: resolution as u32,
        image_offset: 0,
        is_interior: root_is_interior,
        parent: None,
        first_child: None,
    });
    level_first_index[0] = 0;

    let mut queue = VecDeque::new();
    queue.push_back(0u32);

    while let Some(index) = queue.pop_front() {
        let (parent_offset, parent_level, child_side) = {
            let cell = &cells[index as usize];
            if !cell.is_interior {
                continue;
            }
            (cell.image_offset, cell.level, cell.side / 2)
        };

        let first_child = cells.len() as u32;
        cells[index as usize].first_child = Some(first_child);

        let child_level = parent_level + 1;
        if level_first_index[child_level as usize] == u32::MAX {
            level_first_index[child_level as usize] = first_child;
        }

        for (row, col) in QUADRANTS {
            let image_offset =
                parent_offset + resolution * row * child_side as usize + col * child_side as usize;
            let is_interior = child_side > 1;
            let child_index = cells.len() as u32;
            cells.push(Cell {
                color: if is_interior {
                    Vec3::ZERO
                } else {
                    image.texel_at(image_offset)
                },
                level: child_level,
                side: child_side,
                image_offset,
                is_interior,
                parent: Some(index),
                first_child: None,
            });
            if is_interior {
                queue.push_back(child_index);
            }
        }
    }

    CellGrid {
        cells,
        level_first_index,
        resolution,
        max_level,
    }
}
