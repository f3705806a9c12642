//! Program images.
//!
//! An image is a raw sequence of big-endian 16-bit words with no header,
//! copied verbatim into memory at [`PC_START`](crate::cpu::PC_START).

pub mod loader;

pub use loader::{load_image, parse_image, read_image, ImageError, DEFAULT_IMAGE};
