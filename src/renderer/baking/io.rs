//! Irradiance persistence.
//!
//! A baked probe volume is written as a fixed-layout binary blob: a header
//! (magic, format version, grid bounds, spacing, dimensions, probe count)
//! followed by one record per probe (lattice index, world position, 27 SH
//! floats). The layout is raw `repr(C)` data, so a save/load round trip
//! reproduces every float bit-exactly.
//!
//! Reads validate the magic word, version, and that the payload length
//! matches the probe count before touching any state; a missing or
//! malformed file is reported to the caller with nothing mutated.

use std::path::Path;

use bytemuck::Zeroable;
use glam::{UVec3, Vec3};

use crate::errors::{CandelaError, Result};
use crate::renderer::baking::irradiance::{IrradianceGrid, IrradianceProbe, IrradianceVolume};
use crate::renderer::baking::sh::SphericalHarmonics9;

/// `b"CIRR"` little-endian.
const MAGIC: u32 = u32::from_le_bytes(*b"CIRR");
/// Bump when the record layout changes.
const FORMAT_VERSION: u32 = 1;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FileHeader {
    magic: u32,
    version: u32,
    start: [f32; 3],
    end: [f32; 3],
    delta: [f32; 3],
    dims: [f32; 3],
    num_probes: i32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FileProbe {
    index: [f32; 3],
    position: [f32; 3],
    sh: [f32; 27],
}

/// On-disk size of one probe record.
pub const PROBE_RECORD_SIZE: usize = std::mem::size_of::<FileProbe>();
/// On-disk size of the file header.
pub const HEADER_SIZE: usize = std::mem::size_of::<FileHeader>();

/// Writes a probe volume to `path`.
pub fn save_irradiance(path: &Path, volume: &IrradianceVolume) -> Result<()> {
    let grid = &volume.grid;
    let header = FileHeader {
        magic: MAGIC,
        version: FORMAT_VERSION,
        start: grid.start.to_array(),
        end: grid.end.to_array(),
        delta: grid.delta.to_array(),
        dims: [grid.dims.x as f32, grid.dims.y as f32, grid.dims.z as f32],
        num_probes: volume.probes.len() as i32,
    };

    let records: Vec<FileProbe> = volume
        .probes
        .iter()
        .map(|p| FileProbe {
            index: [p.index.x as f32, p.index.y as f32, p.index.z as f32],
            position: p.position.to_array(),
            sh: p.sh.to_floats(),
        })
        .collect();

    let mut bytes = Vec::with_capacity(HEADER_SIZE + records.len() * PROBE_RECORD_SIZE);
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    bytes.extend_from_slice(bytemuck::cast_slice(&records));
    std::fs::write(path, bytes)?;

    log::info!(
        "saved irradiance: {} probes to {}",
        volume.probes.len(),
        path.display()
    );
    Ok(())
}

/// Reads a probe volume from `path`.
pub fn load_irradiance(path: &Path) -> Result<IrradianceVolume> {
    let bytes = std::fs::read(path)?;

    if bytes.len() < HEADER_SIZE {
        return Err(CandelaError::TruncatedFile {
            expected: HEADER_SIZE,
            found: bytes.len(),
        });
    }

    let mut header = FileHeader::zeroed();
    bytemuck::bytes_of_mut(&mut header).copy_from_slice(&bytes[..HEADER_SIZE]);

    if header.magic != MAGIC {
        return Err(CandelaError::InvalidMagic(header.magic));
    }
    if header.version != FORMAT_VERSION {
        return Err(CandelaError::UnsupportedVersion {
            found: header.version,
            expected: FORMAT_VERSION,
        });
    }

    let num_probes = header.num_probes.max(0) as usize;
    let expected = HEADER_SIZE + num_probes * PROBE_RECORD_SIZE;
    if bytes.len() != expected {
        return Err(CandelaError::TruncatedFile {
            expected,
            found: bytes.len(),
        });
    }

    let grid = IrradianceGrid::new(
        Vec3::from_array(header.start),
        Vec3::from_array(header.end),
        UVec3::new(
            header.dims[0] as u32,
            header.dims[1] as u32,
            header.dims[2] as u32,
        ),
    )?;

    let mut probes = Vec::with_capacity(num_probes);
    for i in 0..num_probes {
        let offset = HEADER_SIZE + i * PROBE_RECORD_SIZE;
        let mut record = FileProbe::zeroed();
        bytemuck::bytes_of_mut(&mut record)
            .copy_from_slice(&bytes[offset..offset + PROBE_RECORD_SIZE]);
        probes.push(IrradianceProbe {
            index: UVec3::new(
                record.index[0] as u32,
                record.index[1] as u32,
                record.index[2] as u32,
            ),
            position: Vec3::from_array(record.position),
            sh: SphericalHarmonics9::from_floats(&record.sh),
        });
    }

    Ok(IrradianceVolume { grid, probes })
}
