//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! The main error type [`CandelaError`] covers GPU initialization failures,
//! irradiance persistence errors and resource validation errors. All public
//! APIs that can fail return [`Result<T>`], an alias for
//! `std::result::Result<T, CandelaError>`.
//!
//! Per-frame degradation (a missing shader or texture for a single pass) is
//! deliberately *not* an error: the affected pass skips its draws for that
//! frame and rendering continues. Errors are reserved for operations with a
//! caller that can meaningfully react, such as device bring-up and the
//! irradiance bake/load cycle.

use thiserror::Error;

/// The main error type for the Candela renderer.
#[derive(Error, Debug)]
pub enum CandelaError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// A GPU readback (buffer mapping) failed during a bake.
    #[error("GPU readback failed: {0}")]
    ReadbackFailed(String),

    // ========================================================================
    // Irradiance Persistence Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The irradiance file does not start with the expected magic word.
    #[error("Irradiance file has invalid magic: {0:#010x}")]
    InvalidMagic(u32),

    /// The irradiance file was written by an incompatible format version.
    #[error("Unsupported irradiance file version: {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the file header
        found: u32,
        /// Version this build writes and reads
        expected: u32,
    },

    /// The irradiance file is shorter than its header claims.
    #[error("Truncated irradiance file: expected {expected} bytes, found {found}")]
    TruncatedFile {
        /// Size implied by the header
        expected: usize,
        /// Actual payload size on disk
        found: usize,
    },

    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// A probe grid dimension was zero.
    #[error("Invalid probe grid dimensions: ({0}, {1}, {2}); all axes must be >= 1")]
    InvalidGridDims(u32, u32, u32),

    /// Save was requested before any irradiance bake or load.
    #[error("No irradiance data to save; bake or load a volume first")]
    NoIrradianceData,
}

/// Alias for `Result<T, CandelaError>`.
pub type Result<T> = std::result::Result<T, CandelaError>;
