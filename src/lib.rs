//! # motion-tables
//!
//! Stores named, variable-size 2D `f32` tables (one row per motion frame)
//! in a single compressed, self-describing hierarchical container file and
//! reads them back.
//!
//! The container is this crate's own `MTbl` format (see [`container`]). It
//! is not HDF5 and cannot read or write `.h5` files.
//!
//! ## Modules
//!
//! - [`util`] - Error types
//! - [`container`] - Low-level group/dataset container format
//! - [`core`] - Deflate filter and frame timing
//! - [`codec`] - Table collection <-> container file
//! - [`motion`] - [`MotionClip`] with frame/time helpers
//!
//! ## Example
//!
//! ```no_run
//! use motion_tables::{MotionClip, TableCollection};
//!
//! let mut tables = TableCollection::new();
//! tables.insert("hips".to_string(), vec![vec![0.0, 1.0, 0.0]; 90]);
//!
//! let clip = MotionClip::from_tables(tables);
//! clip.save("walk.mtb")?;
//!
//! let loaded = MotionClip::open("walk.mtb")?;
//! assert_eq!(loaded.total_length(), 3.0);
//! # Ok::<(), motion_tables::Error>(())
//! ```

pub mod util;
pub mod container;
pub mod core;
pub mod codec;
pub mod motion;

// Re-export commonly used types
pub use util::{Error, Result};
pub use codec::{
    decode, encode, read_file_to_collection, write_collection_to_file, Table, TableCollection,
    DATASET_NAME,
};
pub use motion::{MotionClip, DEFAULT_COMPRESSION_LEVEL};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::codec::{decode, encode, Table, TableCollection};
    pub use crate::core::{Chrono, FrameRate, FPS};
    pub use crate::motion::MotionClip;
}
