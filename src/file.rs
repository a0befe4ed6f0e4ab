//! A loaded serialized file and its object table.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::{Cursor, Read, Seek};
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, trace, warn};

use crate::formats::serialized::{
    self, ExternalInfo, Platform, SerializedHeader, SerializedMetadata, SerializedVersion,
};
use crate::handler::{FileHandler, Tag};
use crate::io::EndianReader;
use crate::objects::{ClassId, SerializedObject};
use crate::version::UnityVersion;
use crate::{Error, Result};

/// What every object of a file needs to decode itself later.
#[derive(Debug)]
pub(crate) struct FileContext {
    pub name: String,
    pub key: String,
    pub data: Bytes,
    pub big_endian: bool,
    pub serialized_version: SerializedVersion,
    pub platform: Platform,
    /// Effective engine version, after any fallback.
    pub version: UnityVersion,
}

/// A parsed serialized file.
pub struct SerializedFile {
    pub name: String,
    pub tag: Tag,
    pub header: SerializedHeader,
    pub metadata: SerializedMetadata,
    context: Arc<FileContext>,
    handler: Arc<dyn FileHandler>,
    objects: BTreeMap<i64, SerializedObject>,
}

impl SerializedFile {
    /// Sniff for a serialized file header without consuming the stream.
    pub fn is_serialized_file<R: Read + Seek>(r: &mut R) -> Result<bool> {
        serialized::is_serialized_file(r)
    }

    /// Parse header and metadata. Objects are not built yet.
    ///
    /// `fallback` replaces the engine version when the header's is missing
    /// or the all-zero sentinel.
    pub(crate) fn parse(
        data: Bytes,
        tag: Tag,
        handler: Arc<dyn FileHandler>,
        fallback: Option<UnityVersion>,
    ) -> Result<Self> {
        let name = tag.logical_name();
        let mut r = EndianReader::new(Cursor::new(data.clone()), true);
        let header = SerializedHeader::parse(&mut r)?;
        if header.version.0 == 0 || header.version > SerializedVersion::LARGE_FILES {
            return Err(Error::UnsupportedVersion(header.version.0));
        }
        let metadata = SerializedMetadata::parse(&mut r, &header)?;

        let version = match header.unity_version().filter(|v| !v.is_unknown()) {
            Some(v) => v,
            None => fallback.filter(|v| !v.is_unknown()).unwrap_or(UnityVersion::MIN),
        };

        debug!(
            "parsed serialized file {name}: format {}, engine {version}, {} objects, {} externals",
            header.version.0,
            metadata.objects.len(),
            metadata.externals.len()
        );

        let context = Arc::new(FileContext {
            key: serialized::file_key(&name),
            name: name.clone(),
            data,
            big_endian: header.big_endian,
            serialized_version: header.version,
            platform: header.platform,
            version,
        });

        Ok(Self {
            name,
            tag,
            header,
            metadata,
            context,
            handler,
            objects: BTreeMap::new(),
        })
    }

    /// Build the object table. A record that fails to construct is logged
    /// and registered as a placeholder.
    pub(crate) fn build_objects(&mut self, ignore: &BTreeSet<ClassId>) {
        for info in &self.metadata.objects {
            let path_id = info.path_id;
            let class_id = info.class_id;
            let object = if ignore.contains(&class_id) {
                trace!("{path_id} ({class_id}) ignored by options");
                SerializedObject::placeholder(info.clone(), self.context.clone())
            } else {
                match SerializedObject::construct(info.clone(), self.context.clone()) {
                    Ok(object) => {
                        trace!("{path_id} ({class_id}) constructed");
                        object
                    }
                    Err(err) => {
                        warn!(
                            "failed to decode {path_id} (type {class_id}) in {}: {err}",
                            self.name
                        );
                        SerializedObject::placeholder(info.clone(), self.context.clone())
                    }
                }
            };
            self.objects.insert(path_id, object);
        }
    }

    /// Case-insensitive registry key.
    pub fn key(&self) -> &str {
        &self.context.key
    }

    /// Effective engine version.
    pub fn version(&self) -> UnityVersion {
        self.context.version
    }

    pub fn platform(&self) -> Platform {
        self.context.platform
    }

    pub fn handler(&self) -> &Arc<dyn FileHandler> {
        &self.handler
    }

    pub fn externals(&self) -> &[ExternalInfo] {
        &self.metadata.externals
    }

    pub fn object(&self, path_id: i64) -> Option<&SerializedObject> {
        self.objects.get(&path_id)
    }

    /// Objects in path id order.
    pub fn objects(&self) -> impl Iterator<Item = &SerializedObject> {
        self.objects.values()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

impl fmt::Debug for SerializedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializedFile")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("version", &self.context.version)
            .field("format", &self.header.version)
            .field("objects", &self.objects.len())
            .finish()
    }
}
