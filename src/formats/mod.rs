//! Parsers for the engine's container formats.
//!
//! Both parsers follow the same conventions:
//!
//! * **Generic over** [`std::io::Read`] + [`std::io::Seek`] - pass a [`std::fs::File`], a
//!   [`std::io::Cursor`], or anything else that implements both traits.
//! * **Metadata first** - `parse` reads headers and tables and builds an
//!   in-memory description. Object payloads are sliced out of shared
//!   buffers and decoded later, on request.
//! * **Compression is separate** - block decompression lives in
//!   [`crate::compression`]; the bundle parser calls into it.
//!
//! ## Format overview
//!
//! | Module         | Format | Description |
//! |----------------|--------|-------------|
//! | [`bundle`]     | UnityFS / UnityRaw / UnityWeb | Multi-block archive of serialized files and streamed resources |
//! | [`serialized`] | Serialized file | Versioned header, type table, object table and external references |

pub mod bundle;
pub mod serialized;
