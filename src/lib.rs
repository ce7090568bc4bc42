// src/lib.rs
//! Doom-format BSP node building.
//!
//! ```
//! use rust_nodes::{BspLevel, BuildOptions, Level};
//!
//! let mut level = Level::new("ROOM");
//! let sector = level.add_sector(0, 128);
//! level.add_loop(&[(0.0, 0.0), (0.0, 64.0), (64.0, 64.0), (64.0, 0.0)], sector);
//!
//! let bsp = BspLevel::build(&level, &BuildOptions::gl()).unwrap();
//! assert_eq!(bsp.subsectors.len(), 1);
//! assert_eq!(bsp.segs.len(), 4);
//! ```

pub mod bsp;
pub mod config;
pub mod document;
pub mod error;
pub mod map;

pub use bsp::BspLevel;
pub use config::BuildOptions;
pub use error::{BuildError, ConfigError};
pub use map::Level;
