//! **assetkit** - a reusable Rust library for reading Unity asset files.
//!
//! # Layers
//! | Module | Purpose |
//! |--------|---------|
//! | [`io`]          | Endian-aware reader and writer |
//! | [`version`]     | Engine version strings |
//! | [`compression`] | LZ4 / LZMA block decompression |
//! | [`formats`]     | Bundle and serialized file parsers |
//! | [`objects`]     | Typed objects and lazy decoding |
//! | [`collection`]  | [`AssetCollection`]: loading and reference resolution |
//! | [`handler`]     | Reopening loaded files and resources |
//! | [`texture`]     | Texture decoding to RGBA8 and DDS interchange |
//! | [`options`]     | Loader and per-game options |
//!
//! # Example
//! ```no_run
//! use assetkit::AssetCollection;
//!
//! let mut assets = AssetCollection::new();
//! assets.load_file("data.unity3d")?;
//! for object in assets.objects() {
//!     println!("{} {} {:?}", object.path_id(), object.class_id(), object.name());
//! }
//! # Ok::<(), assetkit::Error>(())
//! ```
//!
//! The library logs through the [`log`] facade and never installs a logger.

pub mod collection;
pub mod compression;
pub mod error;
pub mod file;
pub mod formats;
pub mod handler;
pub mod io;
pub mod objects;
pub mod options;
pub mod texture;
pub mod version;

#[cfg(test)]
mod test_util;

pub use collection::{AssetCollection, ResourceEntry};
pub use error::{Error, Result};
pub use file::SerializedFile;
pub use handler::{FileHandler, Tag};
pub use objects::{ClassId, ObjectData, PPtr, SerializedObject};
pub use options::{CoreOptions, GameOptions};
pub use texture::{TextureDecoder, TextureFormat};
pub use version::UnityVersion;
