//! Objects stored in serialized files.
//!
//! Every object record becomes a [`SerializedObject`]. Construction at load
//! time only validates the record and reads the leading name field. The
//! rest of the payload is decoded into [`ObjectData`] the first time it is
//! asked for and cached from then on.
//!
//! | Module | Kind |
//! |--------|------|
//! | [`game_object`] | [`GameObject`] |
//! | [`transform`]   | [`Transform`] (also used for `RectTransform`) |
//! | [`material`]    | [`Material`] and its property sheet |
//! | [`texture2d`]   | [`Texture2D`] |
//! | [`text_asset`]  | [`TextAsset`] |
//!
//! Any other class id, and any record whose construction fails, is kept as
//! a placeholder carrying only its identity and raw bytes.

pub mod class_id;
pub mod game_object;
pub mod material;
pub mod math;
pub mod text_asset;
pub mod texture2d;
pub mod transform;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::Cursor;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use log::warn;

pub use class_id::ClassId;
pub use game_object::GameObject;
pub use material::{Material, PropertySheet, TexEnv};
pub use math::{ColorRgba, Quaternion, Vector2, Vector3};
pub use text_asset::TextAsset;
pub use texture2d::{StreamingInfo, Texture2D, TextureSettings};
pub use transform::Transform;

use crate::file::FileContext;
use crate::formats::serialized::{ObjectInfo, SerializedVersion};
use crate::io::EndianReader;
use crate::version::UnityVersion;
use crate::{Error, Result};

/// Weak reference to an object, possibly in another file.
///
/// `file_id` 0 is the referencing file itself; `n > 0` names the owning
/// file's `n - 1`th external. A zero `path_id` is a null reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PPtr {
    pub file_id: i32,
    pub path_id: i64,
}

impl PPtr {
    pub const NULL: Self = Self {
        file_id: 0,
        path_id: 0,
    };

    pub fn is_null(&self) -> bool {
        self.path_id == 0
    }
}

/// Cursor over one object's payload, aware of the owning file's versions.
pub struct ObjectReader {
    inner: EndianReader<Cursor<Bytes>>,
    pub serialized_version: SerializedVersion,
    pub version: UnityVersion,
}

impl ObjectReader {
    pub(crate) fn new(payload: Bytes, file: &FileContext) -> Self {
        Self {
            inner: EndianReader::new(Cursor::new(payload), file.big_endian),
            serialized_version: file.serialized_version,
            version: file.version,
        }
    }

    pub fn read_pptr(&mut self) -> Result<PPtr> {
        let file_id = self.read_i32()?;
        let path_id = if self.serialized_version < SerializedVersion::WIDE_PATH_IDS {
            i64::from(self.read_i32()?)
        } else {
            self.read_i64()?
        };
        Ok(PPtr { file_id, path_id })
    }

    /// Non-negative `i32` element count, bounded by the remaining bytes.
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_i32()?;
        if count < 0 {
            return Err(Error::NegativeLength(count));
        }
        if count as u64 > self.unconsumed()? {
            return Err(Error::InvalidRange);
        }
        Ok(count as usize)
    }

    pub fn read_pptr_vec(&mut self) -> Result<Vec<PPtr>> {
        let count = self.read_count()?;
        (0..count).map(|_| self.read_pptr()).collect()
    }

    pub fn read_string_vec(&mut self) -> Result<Vec<String>> {
        let count = self.read_count()?;
        (0..count).map(|_| self.read_aligned_string()).collect()
    }

    /// Length-prefixed byte array, aligned to 4. The bytes share the
    /// payload buffer.
    pub fn read_byte_array(&mut self) -> Result<Bytes> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(Error::NegativeLength(len));
        }
        let bytes = self.read_shared(len as usize)?;
        self.align(4)?;
        Ok(bytes)
    }

    /// `len` bytes sharing the payload buffer.
    pub fn read_shared(&mut self, len: usize) -> Result<Bytes> {
        let start = self.position()? as usize;
        let payload = self.inner.get_ref().get_ref();
        let end = start.checked_add(len).ok_or(Error::InvalidRange)?;
        if end > payload.len() {
            return Err(Error::InvalidRange);
        }
        let bytes = payload.slice(start..end);
        self.skip(len as i64)?;
        Ok(bytes)
    }
}

impl Deref for ObjectReader {
    type Target = EndianReader<Cursor<Bytes>>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ObjectReader {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// Decoded contents of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectData {
    GameObject(GameObject),
    Transform(Transform),
    Material(Material),
    Texture2D(Texture2D),
    TextAsset(TextAsset),
    /// Unmodelled kind or failed construction.
    Placeholder,
}

impl ObjectData {
    pub fn as_game_object(&self) -> Option<&GameObject> {
        match self {
            Self::GameObject(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_transform(&self) -> Option<&Transform> {
        match self {
            Self::Transform(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_material(&self) -> Option<&Material> {
        match self {
            Self::Material(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_texture2d(&self) -> Option<&Texture2D> {
        match self {
            Self::Texture2D(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text_asset(&self) -> Option<&TextAsset> {
        match self {
            Self::TextAsset(v) => Some(v),
            _ => None,
        }
    }

    /// Object name, for kinds that carry one.
    pub fn into_name(self) -> Option<String> {
        match self {
            Self::GameObject(v) => Some(v.name),
            Self::Material(v) => Some(v.name),
            Self::Texture2D(v) => Some(v.name),
            Self::TextAsset(v) => Some(v.name),
            Self::Transform(_) | Self::Placeholder => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

/// Whether objects of `class_id` get a typed decoder.
pub fn is_modelled(class_id: ClassId) -> bool {
    matches!(
        class_id,
        ClassId::GameObject
            | ClassId::Transform
            | ClassId::RectTransform
            | ClassId::Material
            | ClassId::Texture2D
            | ClassId::TextAsset
    )
}

/// One object record of a loaded file.
///
/// Equality and hashing use `(path_id, class_id)` only.
pub struct SerializedObject {
    info: ObjectInfo,
    file: Arc<FileContext>,
    payload: Bytes,
    name: Option<String>,
    data: OnceLock<ObjectData>,
}

impl SerializedObject {
    /// Build a typed object. The payload is fully read once to validate it,
    /// so a malformed body fails here rather than on first access; the
    /// decoded fields are not kept.
    pub(crate) fn construct(info: ObjectInfo, file: Arc<FileContext>) -> Result<Self> {
        let payload = payload_slice(&info, &file).ok_or(Error::InvalidRange)?;
        let data = OnceLock::new();
        let name = if is_modelled(info.class_id) {
            decode_payload(info.class_id, payload.clone(), &file)?.into_name()
        } else {
            let _ = data.set(ObjectData::Placeholder);
            None
        };
        Ok(Self {
            info,
            file,
            payload,
            name,
            data,
        })
    }

    /// The fallback kind. Cannot fail: an out-of-range record simply keeps
    /// no payload.
    pub(crate) fn placeholder(info: ObjectInfo, file: Arc<FileContext>) -> Self {
        let payload = payload_slice(&info, &file).unwrap_or_default();
        let data = OnceLock::new();
        let _ = data.set(ObjectData::Placeholder);
        Self {
            info,
            file,
            payload,
            name: None,
            data,
        }
    }

    pub fn path_id(&self) -> i64 {
        self.info.path_id
    }

    pub fn class_id(&self) -> ClassId {
        self.info.class_id
    }

    pub fn info(&self) -> &ObjectInfo {
        &self.info
    }

    /// Name read at load time, for kinds that carry one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Logical name of the owning file.
    pub fn file_name(&self) -> &str {
        &self.file.name
    }

    pub(crate) fn file_key(&self) -> &str {
        &self.file.key
    }

    /// Effective engine version of the owning file.
    pub fn version(&self) -> UnityVersion {
        self.file.version
    }

    /// Undecoded payload bytes.
    pub fn raw_data(&self) -> &Bytes {
        &self.payload
    }

    /// True until the payload has been decoded.
    pub fn should_deserialize(&self) -> bool {
        self.data.get().is_none()
    }

    /// Decoded contents, decoding on first access.
    ///
    /// A failed decode is returned as an error and retried on the next call.
    pub fn data(&self) -> Result<&ObjectData> {
        if let Some(data) = self.data.get() {
            return Ok(data);
        }
        let decoded = self.decode()?;
        Ok(self.data.get_or_init(|| decoded))
    }

    /// Force decoding now.
    pub fn deserialize(&self) -> Result<()> {
        self.data().map(|_| ())
    }

    fn decode(&self) -> Result<ObjectData> {
        decode_payload(self.info.class_id, self.payload.clone(), &self.file)
    }

    fn typed<T>(&self, pick: impl FnOnce(&ObjectData) -> Option<&T>) -> Option<&T> {
        match self.data() {
            Ok(data) => pick(data),
            Err(err) => {
                warn!(
                    "failed to deserialize {} ({}) in {}: {err}",
                    self.info.path_id, self.info.class_id, self.file.name
                );
                None
            }
        }
    }

    pub fn game_object(&self) -> Option<&GameObject> {
        self.typed(ObjectData::as_game_object)
    }

    pub fn transform(&self) -> Option<&Transform> {
        self.typed(ObjectData::as_transform)
    }

    pub fn material(&self) -> Option<&Material> {
        self.typed(ObjectData::as_material)
    }

    pub fn texture2d(&self) -> Option<&Texture2D> {
        self.typed(ObjectData::as_texture2d)
    }

    pub fn text_asset(&self) -> Option<&TextAsset> {
        self.typed(ObjectData::as_text_asset)
    }
}

fn payload_slice(info: &ObjectInfo, file: &FileContext) -> Option<Bytes> {
    let start = usize::try_from(info.byte_start).ok()?;
    let end = start.checked_add(info.byte_size as usize)?;
    (end <= file.data.len()).then(|| file.data.slice(start..end))
}

fn decode_payload(class_id: ClassId, payload: Bytes, file: &FileContext) -> Result<ObjectData> {
    let mut r = ObjectReader::new(payload, file);
    Ok(match class_id {
        ClassId::GameObject => ObjectData::GameObject(GameObject::read(&mut r)?),
        ClassId::Transform | ClassId::RectTransform => {
            ObjectData::Transform(Transform::read(&mut r)?)
        }
        ClassId::Material => ObjectData::Material(Material::read(&mut r)?),
        ClassId::Texture2D => ObjectData::Texture2D(Texture2D::read(&mut r)?),
        ClassId::TextAsset => ObjectData::TextAsset(TextAsset::read(&mut r)?),
        _ => ObjectData::Placeholder,
    })
}

impl fmt::Debug for SerializedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializedObject")
            .field("path_id", &self.info.path_id)
            .field("class_id", &self.info.class_id)
            .field("file", &self.file.name)
            .field("name", &self.name)
            .field("deserialized", &!self.should_deserialize())
            .finish()
    }
}

impl PartialEq for SerializedObject {
    fn eq(&self, other: &Self) -> bool {
        self.info.path_id == other.info.path_id && self.info.class_id == other.info.class_id
    }
}

impl Eq for SerializedObject {}

impl Hash for SerializedObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.info.path_id.hash(state);
        self.info.class_id.hash(state);
    }
}
