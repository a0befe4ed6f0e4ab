//! The object graph: every loaded bundle, serialized file and resource.
//!
//! ## Registries
//! | Map | Key | Filled by |
//! |-----|-----|-----------|
//! | files            | logical file name | serialized files, loose or in bundles |
//! | resource streams | `*.resS` name     | streamed texture/mesh data |
//! | resources        | `*.resource` name | streamed audio/video data |
//!
//! Keys are the last path segment, compared without ASCII case. A logical
//! name is registered at most once; later loads of the same name are
//! no-ops.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, trace, warn};

use crate::file::SerializedFile;
use crate::formats::bundle::Bundle;
use crate::formats::serialized::file_key;
use crate::handler::{BundleHandler, FileHandler, FsHandler, ReadSeek, Tag};
use crate::objects::{PPtr, SerializedObject};
use crate::options::CoreOptions;
use crate::texture::TextureDecoder;
use crate::version::UnityVersion;
use crate::{Error, Result};

/// Where a non-serialized block or loose resource can be reopened.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub tag: Tag,
    pub handler: Arc<dyn FileHandler>,
}

impl ResourceEntry {
    pub fn open(&self) -> Result<Box<dyn ReadSeek + Send>> {
        self.handler.open(&self.tag)
    }
}

/// Kind of a loose resource, from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceKind {
    Stream,
    Resource,
}

impl ResourceKind {
    fn from_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        if ext.eq_ignore_ascii_case("ress") {
            Some(Self::Stream)
        } else if ext.eq_ignore_ascii_case("resource") {
            Some(Self::Resource)
        } else {
            None
        }
    }
}

/// Loaded bundles, files and resources, with reference resolution across
/// all of them.
#[derive(Debug, Default)]
pub struct AssetCollection {
    options: CoreOptions,
    bundles: Vec<Arc<Bundle>>,
    files: BTreeMap<String, SerializedFile>,
    resource_streams: BTreeMap<String, ResourceEntry>,
    resources: BTreeMap<String, ResourceEntry>,
}

impl AssetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CoreOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &CoreOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut CoreOptions {
        &mut self.options
    }

    /// Parse one bundle from `stream` and load every block.
    pub fn load_bundle<R: Read + Seek>(&mut self, mut stream: R, tag: &Tag) -> Result<()> {
        debug!("loading bundle {tag}");
        let bundle = Bundle::parse(&mut stream)?;
        self.add_bundle(bundle)
    }

    /// Load the blocks of an already parsed bundle.
    ///
    /// Serialized blocks are parsed with the bundle's engine version as
    /// fallback. Other blocks are registered as resources by extension.
    /// Every serialized block is parsed before anything is registered, so a
    /// failing block leaves the collection untouched.
    pub fn add_bundle(&mut self, bundle: Bundle) -> Result<()> {
        let bundle = Arc::new(bundle);
        let handler: Arc<dyn FileHandler> = Arc::new(BundleHandler::new(bundle.clone()));
        let fallback = bundle.header.engine();

        let mut parsed: BTreeMap<String, SerializedFile> = BTreeMap::new();
        let mut resources = Vec::new();
        for block in &bundle.container.blocks {
            let tag = Tag::Block {
                path: block.path.clone(),
            };
            if !block.is_serialized_file() {
                resources.push(tag);
                continue;
            }
            let key = file_key(&tag.logical_name());
            if parsed.contains_key(&key) {
                debug!("{tag} already loaded");
                continue;
            }
            let data = bundle.open_block(block)?;
            if let Some(file) = self.parse_serialized(data, tag, handler.clone(), fallback)? {
                parsed.insert(key, file);
            }
        }

        self.files.append(&mut parsed);
        for tag in resources {
            self.register_resource(tag, handler.clone());
        }
        self.bundles.push(bundle);
        Ok(())
    }

    /// Parse and load bundles laid end to end in `stream`.
    pub fn load_bundle_sequence<R: Read + Seek>(
        &mut self,
        mut stream: R,
        tag: &Tag,
        align: u64,
    ) -> Result<()> {
        let bundles = Bundle::parse_sequence(&mut stream, align)?;
        debug!("loading {} bundles from {tag}", bundles.len());
        for bundle in bundles {
            self.add_bundle(bundle)?;
        }
        Ok(())
    }

    /// Load a serialized file from `stream`.
    ///
    /// When a file of the same logical name is already registered this is a
    /// no-op and `stream` is dropped unread. Pass `&mut stream` to keep it.
    pub fn load_serialized_file<R: Read>(
        &mut self,
        mut stream: R,
        tag: Tag,
        handler: Arc<dyn FileHandler>,
        fallback: Option<UnityVersion>,
    ) -> Result<()> {
        if self.files.contains_key(&file_key(&tag.logical_name())) {
            debug!("{tag} already loaded");
            return Ok(());
        }
        let mut data = Vec::new();
        stream.read_to_end(&mut data)?;
        self.load_serialized_bytes(Bytes::from(data), tag, handler, fallback)
    }

    /// Load a serialized file held in memory.
    pub fn load_serialized_bytes(
        &mut self,
        data: Bytes,
        tag: Tag,
        handler: Arc<dyn FileHandler>,
        fallback: Option<UnityVersion>,
    ) -> Result<()> {
        if let Some(file) = self.parse_serialized(data, tag, handler, fallback)? {
            self.files.insert(file.key().to_owned(), file);
        }
        Ok(())
    }

    /// Parse a serialized file and build its objects without registering
    /// it. `None` when a file of that name is already registered.
    fn parse_serialized(
        &self,
        data: Bytes,
        tag: Tag,
        handler: Arc<dyn FileHandler>,
        fallback: Option<UnityVersion>,
    ) -> Result<Option<SerializedFile>> {
        if self.files.contains_key(&file_key(&tag.logical_name())) {
            debug!("{tag} already loaded");
            return Ok(None);
        }
        debug!("loading serialized file {tag} ({} bytes)", data.len());
        let mut file = SerializedFile::parse(data, tag, handler, fallback)?;
        file.build_objects(&self.options.ignore_class_ids);
        Ok(Some(file))
    }

    /// Sniff `stream` and load it as a serialized file, a bundle sequence
    /// or a loose resource.
    pub fn load_stream<R: Read + Seek>(
        &mut self,
        mut stream: R,
        tag: Tag,
        handler: Arc<dyn FileHandler>,
    ) -> Result<()> {
        if SerializedFile::is_serialized_file(&mut stream)? {
            self.load_serialized_file(stream, tag, handler, None)
        } else if Bundle::is_bundle(&mut stream)? {
            self.load_bundle_sequence(stream, &tag, 1)
        } else {
            self.register_resource(tag, handler);
            Ok(())
        }
    }

    /// Open `path` and load it as [`Self::load_stream`] does.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!("loading {}", path.display());
        let stream = BufReader::new(File::open(path)?);
        self.load_stream(stream, Tag::Path(path.to_path_buf()), Arc::new(FsHandler))
    }

    /// Register a loose resource by extension. Returns whether it was kept.
    pub fn register_resource(&mut self, tag: Tag, handler: Arc<dyn FileHandler>) -> bool {
        let name = tag.logical_name();
        let map = match ResourceKind::from_name(&name) {
            Some(ResourceKind::Stream) => &mut self.resource_streams,
            Some(ResourceKind::Resource) => &mut self.resources,
            None => {
                warn!("dropping {tag}: not a serialized file and no known resource extension");
                return false;
            }
        };
        trace!("registered resource {name}");
        map.insert(file_key(&name), ResourceEntry { tag, handler });
        true
    }

    /// Read `size` bytes at `offset` from a streamed resource.
    ///
    /// `path` may be a full archive path; only its last segment is used.
    pub fn read_resource(&self, path: &str, offset: u64, size: u32) -> Result<Vec<u8>> {
        let key = file_key(path);
        let entry = self
            .resource_streams
            .get(&key)
            .or_else(|| self.resources.get(&key))
            .ok_or_else(|| Error::MissingResource(path.to_owned()))?;
        trace!("reading {size} bytes at {offset} from {}", entry.tag);
        let mut stream = entry.open()?;
        stream.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size as usize];
        stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Forget everything loaded. Options are kept.
    pub fn reset(&mut self) {
        self.bundles.clear();
        self.files.clear();
        self.resource_streams.clear();
        self.resources.clear();
    }

    pub fn bundles(&self) -> &[Arc<Bundle>] {
        &self.bundles
    }

    pub fn files(&self) -> impl Iterator<Item = &SerializedFile> {
        self.files.values()
    }

    /// Look up a file by logical name, ignoring case and any directories.
    pub fn file(&self, name: &str) -> Option<&SerializedFile> {
        self.files.get(&file_key(name))
    }

    /// Every object of every file.
    pub fn objects(&self) -> impl Iterator<Item = &SerializedObject> {
        self.files.values().flat_map(SerializedFile::objects)
    }

    pub fn resource_streams(&self) -> impl Iterator<Item = (&str, &ResourceEntry)> {
        self.resource_streams.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &ResourceEntry)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn resource_stream(&self, name: &str) -> Option<&ResourceEntry> {
        self.resource_streams.get(&file_key(name))
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceEntry> {
        self.resources.get(&file_key(name))
    }

    /// Follow `pptr` as seen from `from`.
    ///
    /// `None` for null references, for external indices the owning file
    /// does not declare, and for targets that are not loaded.
    pub fn resolve<'a>(&'a self, from: &SerializedObject, pptr: PPtr) -> Option<&'a SerializedObject> {
        if pptr.is_null() {
            return None;
        }
        let key = match pptr.file_id {
            0 => from.file_key().to_owned(),
            id => {
                let owner = self.files.get(from.file_key())?;
                let index = usize::try_from(id).ok()?.checked_sub(1)?;
                owner.externals().get(index)?.file_key()
            }
        };
        self.files.get(&key)?.object(pptr.path_id)
    }

    /// Decode a texture object to RGBA8, fetching streamed data as needed.
    ///
    /// `Ok(None)` when `object` is not a texture or its data does not
    /// decode.
    pub fn decode_texture(
        &self,
        object: &SerializedObject,
        decoder: &TextureDecoder,
    ) -> Result<Option<Vec<u8>>> {
        let Some(texture) = object.data()?.as_texture2d() else {
            return Ok(None);
        };
        let data = texture.image_data(self)?;
        Ok(decoder.decode(&texture.encoded(&data, object.version())))
    }
}
