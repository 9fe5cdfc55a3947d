//! Irradiance Probe Grid Tests
//!
//! Tests for:
//! - Grid construction and per-axis spacing
//! - Flattened index bijectivity
//! - Probe world positions
//! - Degenerate (single-layer) grids

use glam::{UVec3, Vec3};

use candela::IrradianceGrid;

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

#[test]
fn grid_rejects_zero_dimensions() {
    assert!(IrradianceGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::new(0, 2, 2)).is_err());
    assert!(IrradianceGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::new(2, 0, 2)).is_err());
    assert!(IrradianceGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::new(2, 2, 0)).is_err());
    assert!(IrradianceGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::new(1, 1, 1)).is_ok());
}

#[test]
fn spacing_spans_bounds() {
    let grid = IrradianceGrid::new(
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(10.0, 20.0, 30.0),
        UVec3::new(3, 5, 7),
    )
    .unwrap();

    assert!(approx(grid.delta.x, 5.0));
    assert!(approx(grid.delta.y, 5.0));
    assert!(approx(grid.delta.z, 5.0));

    // The last cell lands exactly on the end corner.
    let last = grid.position(2, 4, 6);
    assert!((last - grid.end).length() < EPSILON);
}

#[test]
fn single_layer_axis_has_zero_spacing() {
    let grid = IrradianceGrid::new(
        Vec3::ZERO,
        Vec3::new(10.0, 10.0, 10.0),
        UVec3::new(1, 4, 4),
    )
    .unwrap();
    assert!(approx(grid.delta.x, 0.0));
    assert!(approx(grid.position(0, 0, 0).x, 0.0));
}

#[test]
fn index_is_a_bijection() {
    let grid = IrradianceGrid::new(
        Vec3::new(-125.0, 11.0, -330.0),
        Vec3::new(300.0, 230.0, 120.0),
        UVec3::new(8, 6, 10),
    )
    .unwrap();

    assert_eq!(grid.probe_count(), 480);

    let mut seen = vec![false; grid.probe_count()];
    for cell in grid.cells() {
        let index = grid.index(cell.x, cell.y, cell.z);
        assert!(
            index < grid.probe_count(),
            "index {index} out of range for cell {cell:?}"
        );
        assert!(!seen[index], "index {index} hit twice (cell {cell:?})");
        seen[index] = true;
    }
    assert!(seen.iter().all(|s| *s), "every index must be covered");
}

#[test]
fn index_formula_matches_row_major_layout() {
    let grid = IrradianceGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::new(4, 3, 2)).unwrap();
    assert_eq!(grid.index(0, 0, 0), 0);
    assert_eq!(grid.index(1, 0, 0), 1);
    assert_eq!(grid.index(0, 1, 0), 4);
    assert_eq!(grid.index(0, 0, 1), 12);
    assert_eq!(grid.index(3, 2, 1), 23);
}

#[test]
fn cells_enumerate_in_bake_order() {
    let grid = IrradianceGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::new(2, 2, 2)).unwrap();
    let cells: Vec<UVec3> = grid.cells().collect();
    assert_eq!(cells.len(), 8);
    // x varies fastest, then y, then z.
    assert_eq!(cells[0], UVec3::new(0, 0, 0));
    assert_eq!(cells[1], UVec3::new(1, 0, 0));
    assert_eq!(cells[2], UVec3::new(0, 1, 0));
    assert_eq!(cells[4], UVec3::new(0, 0, 1));
}
