//! Offline-style baking: irradiance probes and reflection probes.
//!
//! Bakes run synchronously on the render queue and block until their GPU
//! readbacks complete. They are triggered on demand, never per frame.

pub mod io;
pub mod irradiance;
pub mod mipmap;
pub mod reflection;
pub mod sh;
