//! Irradiance Persistence Tests
//!
//! Tests for:
//! - Save/load round trip with exact floating-point equality
//! - File size matching the fixed record layout
//! - Rejection of missing, truncated and wrong-format files

use std::path::PathBuf;

use glam::{UVec3, Vec3};

use candela::renderer::baking::io::{
    HEADER_SIZE, PROBE_RECORD_SIZE, load_irradiance, save_irradiance,
};
use candela::renderer::baking::sh::SphericalHarmonics9;
use candela::{CandelaError, IrradianceGrid, IrradianceProbe, IrradianceVolume};

/// A unique scratch path under the system temp directory.
fn scratch_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "candela_{}_{}_{name}.bin",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    path
}

fn test_volume(dims: UVec3) -> IrradianceVolume {
    let grid = IrradianceGrid::new(
        Vec3::new(-125.0, 11.0, -330.0),
        Vec3::new(300.0, 230.0, 120.0),
        dims,
    )
    .unwrap();

    let probes = grid
        .cells()
        .enumerate()
        .map(|(i, cell)| {
            let mut floats = [0.0f32; 27];
            for (j, value) in floats.iter_mut().enumerate() {
                // Awkward, irrational-ish values so bit-exactness means
                // something.
                *value = (i as f32 + 1.0) * 0.318_309_87 + j as f32 * 0.123_456_79;
            }
            IrradianceProbe {
                index: cell,
                position: grid.position(cell.x, cell.y, cell.z),
                sh: SphericalHarmonics9::from_floats(&floats),
            }
        })
        .collect();

    IrradianceVolume { grid, probes }
}

#[test]
fn round_trip_is_bit_exact() {
    let volume = test_volume(UVec3::new(3, 2, 4));
    let path = scratch_path("roundtrip");

    save_irradiance(&path, &volume).unwrap();
    let loaded = load_irradiance(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.grid, volume.grid);
    assert_eq!(loaded.probes.len(), volume.probes.len());
    for (a, b) in loaded.probes.iter().zip(&volume.probes) {
        assert_eq!(a.index, b.index);
        assert_eq!(a.position, b.position, "positions must match exactly");
        assert_eq!(a.sh, b.sh, "coefficients must match exactly");
    }
}

#[test]
fn file_size_matches_record_layout() {
    // The grid from the reference bake: 8 x 6 x 10 = 480 probes.
    let volume = test_volume(UVec3::new(8, 6, 10));
    assert_eq!(volume.probes.len(), 480);

    let path = scratch_path("size");
    save_irradiance(&path, &volume).unwrap();
    let len = std::fs::metadata(&path).unwrap().len() as usize;
    std::fs::remove_file(&path).ok();

    assert_eq!(len, HEADER_SIZE + 480 * PROBE_RECORD_SIZE);
}

#[test]
fn missing_file_reports_failure() {
    let path = scratch_path("missing");
    let result = load_irradiance(&path);
    assert!(matches!(result, Err(CandelaError::IoError(_))));
}

#[test]
fn truncated_file_is_rejected() {
    let volume = test_volume(UVec3::new(2, 2, 2));
    let path = scratch_path("truncated");
    save_irradiance(&path, &volume).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() - 16]).unwrap();

    let result = load_irradiance(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(result, Err(CandelaError::TruncatedFile { .. })));
}

#[test]
fn wrong_magic_is_rejected() {
    let volume = test_volume(UVec3::new(1, 1, 1));
    let path = scratch_path("magic");
    save_irradiance(&path, &volume).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[0] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    let result = load_irradiance(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(result, Err(CandelaError::InvalidMagic(_))));
}

#[test]
fn wrong_version_is_rejected() {
    let volume = test_volume(UVec3::new(1, 1, 1));
    let path = scratch_path("version");
    save_irradiance(&path, &volume).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    // The version word sits right after the magic.
    bytes[4] = 99;
    std::fs::write(&path, &bytes).unwrap();

    let result = load_irradiance(&path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(
        result,
        Err(CandelaError::UnsupportedVersion { found: 99, .. })
    ));
}
