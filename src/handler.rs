//! Where loaded bytes come from, and how to reopen them.
//!
//! Every loaded file remembers a [`Tag`] naming its origin and the
//! [`FileHandler`] able to open that tag again. Streamed resources are
//! read back through the same pair.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use crate::formats::bundle::Bundle;
use crate::{Error, Result};

/// Origin of a loaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// A file on disk.
    Path(PathBuf),
    /// A block inside a bundle, by block path.
    Block { path: String },
    /// A caller-supplied buffer.
    Memory(String),
}

impl Tag {
    /// Name used to register the file: the block path or the file name.
    pub fn logical_name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            Self::Block { path } => path.clone(),
            Self::Memory(name) => name.clone(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Block { path } => write!(f, "block:{path}"),
            Self::Memory(name) => write!(f, "memory:{name}"),
        }
    }
}

/// Any seekable byte source.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Opens the bytes behind a [`Tag`].
pub trait FileHandler: fmt::Debug + Send + Sync {
    fn open(&self, tag: &Tag) -> Result<Box<dyn ReadSeek + Send>>;
}

/// Opens [`Tag::Path`] from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsHandler;

impl FileHandler for FsHandler {
    fn open(&self, tag: &Tag) -> Result<Box<dyn ReadSeek + Send>> {
        match tag {
            Tag::Path(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            other => Err(Error::UnsupportedTag(other.to_string())),
        }
    }
}

/// Opens [`Tag::Block`] from one parsed bundle.
#[derive(Debug, Clone)]
pub struct BundleHandler {
    bundle: Arc<Bundle>,
}

impl BundleHandler {
    pub fn new(bundle: Arc<Bundle>) -> Self {
        Self { bundle }
    }

    pub fn bundle(&self) -> &Arc<Bundle> {
        &self.bundle
    }
}

impl FileHandler for BundleHandler {
    fn open(&self, tag: &Tag) -> Result<Box<dyn ReadSeek + Send>> {
        let Tag::Block { path } = tag else {
            return Err(Error::UnsupportedTag(tag.to_string()));
        };
        let block = self
            .bundle
            .block(path)
            .ok_or_else(|| Error::MissingResource(path.clone()))?;
        Ok(Box::new(Cursor::new(self.bundle.open_block(block)?)))
    }
}

/// Opens [`Tag::Memory`] from buffers registered by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandler {
    buffers: BTreeMap<String, Bytes>,
}

impl MemoryHandler {
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Bytes>) {
        self.buffers.insert(name.into(), data.into());
    }
}

impl FileHandler for MemoryHandler {
    fn open(&self, tag: &Tag) -> Result<Box<dyn ReadSeek + Send>> {
        let Tag::Memory(name) = tag else {
            return Err(Error::UnsupportedTag(tag.to_string()));
        };
        let data = self
            .buffers
            .get(name)
            .ok_or_else(|| Error::MissingResource(name.clone()))?;
        Ok(Box::new(Cursor::new(data.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::BundleBuilder;

    #[test]
    fn test_logical_names() {
        let path = Tag::Path(PathBuf::from("/data/level0"));
        assert_eq!(path.logical_name(), "level0");
        let block = Tag::Block {
            path: "CAB-1".into(),
        };
        assert_eq!(block.logical_name(), "CAB-1");
        assert_eq!(block.to_string(), "block:CAB-1");
    }

    #[test]
    fn test_bundle_handler_opens_blocks() {
        let bytes = BundleBuilder::new().node("CAB-1.resS", b"pixels", false).build();
        let bundle = Bundle::parse(&mut Cursor::new(&bytes)).unwrap();
        let handler = BundleHandler::new(Arc::new(bundle));

        let mut out = Vec::new();
        handler
            .open(&Tag::Block {
                path: "cab-1.ress".into(),
            })
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, b"pixels");

        assert!(matches!(
            handler.open(&Tag::Block { path: "nope".into() }),
            Err(Error::MissingResource(_))
        ));
        assert!(matches!(
            handler.open(&Tag::Memory("x".into())),
            Err(Error::UnsupportedTag(_))
        ));
    }

    #[test]
    fn test_memory_handler() {
        let mut handler = MemoryHandler::default();
        handler.insert("a", b"abc".to_vec());
        let mut out = String::new();
        handler
            .open(&Tag::Memory("a".into()))
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "abc");
        assert!(FsHandler.open(&Tag::Memory("a".into())).is_err());
    }
}
