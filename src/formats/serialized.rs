//! Serialized file - one versioned asset container.
//!
//! ## Layout
//! ```text
//! [0x00] MetadataSize                         (u32 BE)
//! [0x04] FileSize                             (u32 BE)
//! [0x08] Version                              (u32 BE)
//! [0x0C] DataOffset                           (u32 BE)
//! --- version < 9: the rest of the header lives at FileSize - MetadataSize
//! [0x10] Endianness (1 = big)                 (u8), aligned to 4
//! --- version >= 22
//!        MetadataSize                         (u32 BE)
//!        FileSize                             (i64 BE)
//!        DataOffset                           (i64 BE)
//!        LargeAddressable                     (u64 BE)
//! --- from here on the file's own byte order applies
//!        EngineVersion (version >= 7)         (null-terminated)
//!        TargetPlatform (version >= 8)        (i32)
//!        TypeTreeEnabled (version >= 13)      (u8)
//!        Types, Objects, Scripts, Externals, RefTypes, UserInformation
//! [DataOffset]
//!        Object payloads
//! ```
//!
//! Every version gate below is load-bearing: reading one field too many or
//! too few misaligns everything after it.

use std::io::{Read, Seek, SeekFrom};

use crate::io::EndianReader;
use crate::objects::ClassId;
use crate::version::UnityVersion;
use crate::{Error, Result};

/// Serialized file format version, a totally ordered integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SerializedVersion(pub u32);

impl SerializedVersion {
    pub const MIN: Self = Self(0);
    /// Legacy type trees carry a variable count.
    pub const VARIABLE_COUNT: Self = Self(2);
    pub const HAS_GUIDS: Self = Self(5);
    pub const HAS_EXTERNAL_TEMP_PATH: Self = Self(6);
    /// Engine version string present.
    pub const UNITY_VERSION: Self = Self(7);
    /// Target platform present.
    pub const TARGET_PLATFORM: Self = Self(8);
    /// Endianness and header fields moved from the tail to the front.
    pub const HEADER_CONTENT_AT_FRONT: Self = Self(9);
    pub const HAS_SCRIPT_TYPE_INDEX: Self = Self(11);
    pub const BLOB_TYPE_TREE: Self = Self(12);
    /// Type trees may be switched off.
    pub const TYPE_TREE_ENABLED_SWITCH: Self = Self(13);
    /// Path ids are always 64-bit.
    pub const WIDE_PATH_IDS: Self = Self(14);
    pub const STRIPPED_OBJECTS: Self = Self(15);
    pub const REFACTORED_CLASS_ID: Self = Self(16);
    pub const REFACTOR_TYPE_DATA: Self = Self(17);
    pub const NODE_TYPE_FLAGS: Self = Self(19);
    pub const REF_OBJECTS: Self = Self(20);
    pub const TYPE_DEPENDENCIES: Self = Self(21);
    /// 64-bit sizes and offsets.
    pub const LARGE_FILES: Self = Self(22);
}

/// Build target recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Unknown,
    NoTarget,
    StandaloneOsx,
    StandaloneWindows,
    Ios,
    Android,
    StandaloneWindows64,
    WebGl,
    StandaloneLinux64,
    Ps4,
    XboxOne,
    Switch,
    Other(i32),
}

impl From<i32> for Platform {
    fn from(value: i32) -> Self {
        match value {
            -2 => Self::NoTarget,
            2 => Self::StandaloneOsx,
            5 => Self::StandaloneWindows,
            9 => Self::Ios,
            13 => Self::Android,
            19 => Self::StandaloneWindows64,
            20 => Self::WebGl,
            24 => Self::StandaloneLinux64,
            31 => Self::Ps4,
            33 => Self::XboxOne,
            38 => Self::Switch,
            other => Self::Other(other),
        }
    }
}

/// Parsed serialized file header.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedHeader {
    /// Size of the metadata block.
    pub header_size: i32,
    /// Declared total file size.
    pub size: i64,
    pub version: SerializedVersion,
    /// Offset of the object data section.
    pub offset: i64,
    pub big_endian: bool,
    pub large_addressable: u64,
    /// Empty before [`SerializedVersion::UNITY_VERSION`].
    pub engine_version: String,
    pub platform: Platform,
    pub type_tree_enabled: bool,
}

type HeaderField<R> = fn(&mut EndianReader<R>, &mut SerializedHeader) -> Result<()>;

/// Version-gated header fields, applied in order to every header whose
/// version reaches the threshold. The `MIN` entry is the point where the
/// file's own byte order takes over from the big-endian prologue.
fn header_fields<R: Read + Seek>() -> [(SerializedVersion, HeaderField<R>); 5] {
    [
        (SerializedVersion::LARGE_FILES, read_large_file_fields),
        (SerializedVersion::MIN, apply_file_endianness),
        (SerializedVersion::UNITY_VERSION, read_engine_version),
        (SerializedVersion::TARGET_PLATFORM, read_target_platform),
        (SerializedVersion::TYPE_TREE_ENABLED_SWITCH, read_type_tree_enabled),
    ]
}

fn read_large_file_fields<R: Read + Seek>(
    r: &mut EndianReader<R>,
    h: &mut SerializedHeader,
) -> Result<()> {
    h.header_size = r.read_i32()?;
    h.size = r.read_i64()?;
    h.offset = r.read_i64()?;
    h.large_addressable = r.read_u64()?;
    Ok(())
}

fn apply_file_endianness<R: Read + Seek>(
    r: &mut EndianReader<R>,
    h: &mut SerializedHeader,
) -> Result<()> {
    r.set_big_endian(h.big_endian);
    Ok(())
}

fn read_engine_version<R: Read + Seek>(
    r: &mut EndianReader<R>,
    h: &mut SerializedHeader,
) -> Result<()> {
    h.engine_version = r.read_null_string(0)?;
    Ok(())
}

fn read_target_platform<R: Read + Seek>(
    r: &mut EndianReader<R>,
    h: &mut SerializedHeader,
) -> Result<()> {
    h.platform = Platform::from(r.read_i32()?);
    Ok(())
}

fn read_type_tree_enabled<R: Read + Seek>(
    r: &mut EndianReader<R>,
    h: &mut SerializedHeader,
) -> Result<()> {
    h.type_tree_enabled = r.read_bool();
    Ok(())
}

impl SerializedHeader {
    /// Parse a header. `r` must be positioned at the start of the file.
    ///
    /// The reader's byte order is left set to the file's own order.
    pub fn parse<R: Read + Seek>(r: &mut EndianReader<R>) -> Result<Self> {
        r.set_big_endian(true);
        let header_size = r.read_i32()?;
        let size = i64::from(r.read_i32()?);
        let version = SerializedVersion(r.read_u32()?);
        let offset = i64::from(r.read_i32()?);

        if version < SerializedVersion::HEADER_CONTENT_AT_FRONT {
            let tail = u64::try_from(size - i64::from(header_size))
                .map_err(|_| Error::InvalidRange)?;
            r.seek(SeekFrom::Start(tail))?;
        }

        let big_endian = r.read_bool();
        r.align(4)?;

        let mut header = Self {
            header_size,
            size,
            version,
            offset,
            big_endian,
            large_addressable: 0,
            engine_version: String::new(),
            platform: Platform::Unknown,
            type_tree_enabled: true,
        };

        for (threshold, read_field) in header_fields::<R>() {
            if version >= threshold {
                read_field(r, &mut header)?;
            }
        }

        Ok(header)
    }

    /// Structured engine version, `None` when absent or malformed.
    pub fn unity_version(&self) -> Option<UnityVersion> {
        UnityVersion::parse_safe(&self.engine_version)
    }
}

/// One node of a flattened type tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeTreeNode {
    pub version: i32,
    pub level: u8,
    pub type_flags: i32,
    pub type_name: String,
    pub name: String,
    pub byte_size: i32,
    pub index: i32,
    pub meta_flags: i32,
    pub ref_type_hash: u64,
}

/// Field layout description for one type, depth-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTree {
    pub nodes: Vec<TypeTreeNode>,
}

/// Class, namespace and assembly of a managed reference type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefTypeName {
    pub class_name: String,
    pub namespace: String,
    pub assembly: String,
}

/// Entry of the type table.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedType {
    pub class_id: ClassId,
    pub is_stripped: bool,
    pub script_type_index: i16,
    pub script_id: Option<[u8; 16]>,
    pub old_type_hash: Option<[u8; 16]>,
    pub type_tree: Option<TypeTree>,
    pub type_dependencies: Vec<i32>,
    pub ref_type: Option<RefTypeName>,
}

/// Location and kind of one object record.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    pub path_id: i64,
    /// Absolute offset of the payload within the file.
    pub byte_start: u64,
    pub byte_size: u32,
    pub type_id: i32,
    pub class_id: ClassId,
    pub is_destroyed: u16,
    pub script_type_index: i16,
    pub stripped: bool,
}

/// Reference to a script object, possibly in another file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptIdentifier {
    pub file_index: i32,
    pub path_id: i64,
}

/// Another file this file's objects may point into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalInfo {
    pub temp_path: String,
    pub guid: [u8; 16],
    pub kind: i32,
    /// Path as recorded, e.g. `archive:/CAB-1234/CAB-1234`.
    pub path: String,
}

impl ExternalInfo {
    /// Logical key of the target file: the last path segment, lowercased.
    pub fn file_key(&self) -> String {
        file_key(&self.path)
    }
}

/// Case-insensitive lookup key for a logical file path.
pub(crate) fn file_key(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
        .to_ascii_lowercase()
}

/// Everything recorded between the header and the data section.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedMetadata {
    pub types: Vec<SerializedType>,
    pub big_id_enabled: bool,
    pub objects: Vec<ObjectInfo>,
    pub scripts: Vec<ScriptIdentifier>,
    pub externals: Vec<ExternalInfo>,
    pub ref_types: Vec<SerializedType>,
    pub user_information: String,
}

/// Read a non-negative `i32` element count.
fn read_count<R: Read + Seek>(r: &mut EndianReader<R>) -> Result<usize> {
    let count = r.read_i32()?;
    if count < 0 {
        return Err(Error::NegativeLength(count));
    }
    if count as u64 > r.unconsumed()? {
        return Err(Error::InvalidRange);
    }
    Ok(count as usize)
}

impl SerializedMetadata {
    /// Parse the metadata that follows `header`.
    ///
    /// `r` must be positioned right after the header with the file's byte
    /// order applied, as [`SerializedHeader::parse`] leaves it.
    pub fn parse<R: Read + Seek>(
        r: &mut EndianReader<R>,
        header: &SerializedHeader,
    ) -> Result<Self> {
        let version = header.version;
        let ctx = TypeContext {
            version,
            type_tree_enabled: header.type_tree_enabled,
        };

        let type_count = read_count(r)?;
        let mut types = Vec::with_capacity(type_count);
        for _ in 0..type_count {
            types.push(ctx.read_type(r, false)?);
        }

        let big_id_enabled = if version >= SerializedVersion::UNITY_VERSION
            && version < SerializedVersion::WIDE_PATH_IDS
        {
            r.read_i32()? != 0
        } else {
            false
        };

        let object_count = read_count(r)?;
        let mut objects = Vec::with_capacity(object_count);
        for _ in 0..object_count {
            objects.push(read_object_info(r, header, &types, big_id_enabled)?);
        }

        let mut scripts = Vec::new();
        if version >= SerializedVersion::HAS_SCRIPT_TYPE_INDEX {
            let count = read_count(r)?;
            scripts.reserve(count);
            for _ in 0..count {
                let file_index = r.read_i32()?;
                let path_id = if version < SerializedVersion::WIDE_PATH_IDS {
                    i64::from(r.read_i32()?)
                } else {
                    r.align(4)?;
                    r.read_i64()?
                };
                scripts.push(ScriptIdentifier {
                    file_index,
                    path_id,
                });
            }
        }

        let external_count = read_count(r)?;
        let mut externals = Vec::with_capacity(external_count);
        for _ in 0..external_count {
            let temp_path = if version >= SerializedVersion::HAS_EXTERNAL_TEMP_PATH {
                r.read_null_string(0)?
            } else {
                String::new()
            };
            let (guid, kind) = if version >= SerializedVersion::HAS_GUIDS {
                (r.read_fixed::<16>()?, r.read_i32()?)
            } else {
                ([0u8; 16], 0)
            };
            let path = r.read_null_string(0)?;
            externals.push(ExternalInfo {
                temp_path,
                guid,
                kind,
                path,
            });
        }

        let mut ref_types = Vec::new();
        if version >= SerializedVersion::REF_OBJECTS {
            let count = read_count(r)?;
            ref_types.reserve(count);
            for _ in 0..count {
                ref_types.push(ctx.read_type(r, true)?);
            }
        }

        let user_information = if version >= SerializedVersion::HAS_GUIDS {
            r.read_null_string(0)?
        } else {
            String::new()
        };

        Ok(Self {
            types,
            big_id_enabled,
            objects,
            scripts,
            externals,
            ref_types,
            user_information,
        })
    }
}

fn read_object_info<R: Read + Seek>(
    r: &mut EndianReader<R>,
    header: &SerializedHeader,
    types: &[SerializedType],
    big_id_enabled: bool,
) -> Result<ObjectInfo> {
    let version = header.version;

    let path_id = if big_id_enabled {
        r.read_i64()?
    } else if version < SerializedVersion::WIDE_PATH_IDS {
        i64::from(r.read_i32()?)
    } else {
        r.align(4)?;
        r.read_i64()?
    };

    let relative_start = if version >= SerializedVersion::LARGE_FILES {
        r.read_i64()?
    } else {
        i64::from(r.read_u32()?)
    };
    let byte_start = relative_start
        .checked_add(header.offset)
        .and_then(|start| u64::try_from(start).ok())
        .ok_or(Error::InvalidRange)?;
    let byte_size = r.read_u32()?;
    let type_id = r.read_i32()?;

    let class_id = if version < SerializedVersion::REFACTORED_CLASS_ID {
        ClassId::from(i32::from(r.read_u16()?))
    } else {
        usize::try_from(type_id)
            .ok()
            .and_then(|i| types.get(i))
            .map(|t| t.class_id)
            .ok_or(Error::Parse("object type index out of range"))?
    };

    let is_destroyed = if version < SerializedVersion::HAS_SCRIPT_TYPE_INDEX {
        r.read_u16()?
    } else {
        0
    };

    let script_type_index = if version >= SerializedVersion::HAS_SCRIPT_TYPE_INDEX
        && version < SerializedVersion::REFACTOR_TYPE_DATA
    {
        r.read_i16()?
    } else {
        -1
    };

    let stripped = if version == SerializedVersion::STRIPPED_OBJECTS
        || version == SerializedVersion::REFACTORED_CLASS_ID
    {
        r.read_u8()? != 0
    } else {
        false
    };

    Ok(ObjectInfo {
        path_id,
        byte_start,
        byte_size,
        type_id,
        class_id,
        is_destroyed,
        script_type_index,
        stripped,
    })
}

const MAX_TYPE_TREE_DEPTH: u8 = 64;

struct TypeContext {
    version: SerializedVersion,
    type_tree_enabled: bool,
}

impl TypeContext {
    fn read_type<R: Read + Seek>(
        &self,
        r: &mut EndianReader<R>,
        is_ref_type: bool,
    ) -> Result<SerializedType> {
        let version = self.version;
        let class_id = ClassId::from(r.read_i32()?);

        let is_stripped = version >= SerializedVersion::REFACTORED_CLASS_ID && r.read_bool();

        let script_type_index = if version >= SerializedVersion::REFACTOR_TYPE_DATA {
            r.read_i16()?
        } else {
            -1
        };

        let mut script_id = None;
        let mut old_type_hash = None;
        if version >= SerializedVersion::TYPE_TREE_ENABLED_SWITCH {
            let raw_class = i32::from(class_id);
            let has_script_id = (is_ref_type && script_type_index >= 0)
                || (version < SerializedVersion::REFACTORED_CLASS_ID && raw_class < 0)
                || (version >= SerializedVersion::REFACTORED_CLASS_ID
                    && class_id == ClassId::MonoBehaviour);
            if has_script_id {
                script_id = Some(r.read_fixed::<16>()?);
            }
            old_type_hash = Some(r.read_fixed::<16>()?);
        }

        let mut type_tree = None;
        let mut type_dependencies = Vec::new();
        let mut ref_type = None;
        if self.type_tree_enabled {
            let tree = if version >= SerializedVersion::BLOB_TYPE_TREE || version.0 == 10 {
                self.read_blob_tree(r)?
            } else {
                let mut tree = TypeTree::default();
                self.read_legacy_node(r, 0, &mut tree)?;
                tree
            };
            type_tree = Some(tree);

            if version >= SerializedVersion::TYPE_DEPENDENCIES {
                if is_ref_type {
                    ref_type = Some(RefTypeName {
                        class_name: r.read_null_string(0)?,
                        namespace: r.read_null_string(0)?,
                        assembly: r.read_null_string(0)?,
                    });
                } else {
                    let count = read_count(r)?;
                    type_dependencies = r.read_i32_array(count)?;
                }
            }
        }

        Ok(SerializedType {
            class_id,
            is_stripped,
            script_type_index,
            script_id,
            old_type_hash,
            type_tree,
            type_dependencies,
            ref_type,
        })
    }

    fn read_blob_tree<R: Read + Seek>(&self, r: &mut EndianReader<R>) -> Result<TypeTree> {
        let node_count = read_count(r)?;
        let string_size = read_count(r)?;

        let mut raw = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            let version = i32::from(r.read_u16()?);
            let level = r.read_u8()?;
            let type_flags = i32::from(r.read_u8()?);
            let type_offset = r.read_u32()?;
            let name_offset = r.read_u32()?;
            let byte_size = r.read_i32()?;
            let index = r.read_i32()?;
            let meta_flags = r.read_i32()?;
            let ref_type_hash = if self.version >= SerializedVersion::NODE_TYPE_FLAGS {
                r.read_u64()?
            } else {
                0
            };
            raw.push((
                version,
                level,
                type_flags,
                type_offset,
                name_offset,
                byte_size,
                index,
                meta_flags,
                ref_type_hash,
            ));
        }

        let strings = r.read_bytes(string_size)?;
        let nodes = raw
            .into_iter()
            .map(
                |(version, level, type_flags, type_offset, name_offset, byte_size, index, meta_flags, ref_type_hash)| {
                    TypeTreeNode {
                        version,
                        level,
                        type_flags,
                        type_name: tree_string(&strings, type_offset),
                        name: tree_string(&strings, name_offset),
                        byte_size,
                        index,
                        meta_flags,
                        ref_type_hash,
                    }
                },
            )
            .collect();

        Ok(TypeTree { nodes })
    }

    fn read_legacy_node<R: Read + Seek>(
        &self,
        r: &mut EndianReader<R>,
        level: u8,
        tree: &mut TypeTree,
    ) -> Result<()> {
        if level > MAX_TYPE_TREE_DEPTH {
            return Err(Error::Parse("type tree nested too deeply"));
        }
        let version = self.version;
        let type_name = r.read_null_string(0)?;
        let name = r.read_null_string(0)?;
        let byte_size = r.read_i32()?;
        if version == SerializedVersion::VARIABLE_COUNT {
            let _variable_count = r.read_i32()?;
        }
        let index = if version.0 != 3 { r.read_i32()? } else { 0 };
        let type_flags = r.read_i32()?;
        let node_version = r.read_i32()?;
        let meta_flags = if version.0 != 3 { r.read_i32()? } else { 0 };
        tree.nodes.push(TypeTreeNode {
            version: node_version,
            level,
            type_flags,
            type_name,
            name,
            byte_size,
            index,
            meta_flags,
            ref_type_hash: 0,
        });

        let children = read_count(r)?;
        for _ in 0..children {
            self.read_legacy_node(r, level + 1, tree)?;
        }
        Ok(())
    }
}

/// Strings shared by every blob type tree, addressed with the high bit set.
const COMMON_STRINGS: &str = "AABB\0AnimationClip\0AnimationCurve\0AnimationState\0Array\0Base\0\
BitField\0bitset\0bool\0char\0ColorRGBA\0Component\0data\0deque\0double\0dynamic_array\0\
FastPropertyName\0first\0float\0Font\0GameObject\0Generic Mono\0GradientNEW\0GUID\0GUIStyle\0\
int\0list\0long long\0map\0Matrix4x4f\0MdFour\0MonoBehaviour\0MonoScript\0m_ByteSize\0m_Curve\0\
m_EditorClassIdentifier\0m_EditorHideFlags\0m_Enabled\0m_ExtensionPtr\0m_GameObject\0m_Index\0\
m_IsArray\0m_IsStatic\0m_MetaFlag\0m_Name\0m_ObjectHideFlags\0m_PrefabInternal\0\
m_PrefabParentObject\0m_Script\0m_StaticEditorFlags\0m_Type\0m_Version\0Object\0pair\0\
PPtr<Component>\0PPtr<GameObject>\0PPtr<Material>\0PPtr<MonoBehaviour>\0PPtr<MonoScript>\0\
PPtr<Object>\0PPtr<Prefab>\0PPtr<Sprite>\0PPtr<TextAsset>\0PPtr<Texture>\0PPtr<Texture2D>\0\
PPtr<Transform>\0Prefab\0Quaternionf\0Rectf\0RectInt\0RectOffset\0second\0set\0short\0size\0\
SInt16\0SInt32\0SInt64\0SInt8\0staticvector\0string\0TextAsset\0TextMesh\0Texture\0Texture2D\0\
Transform\0TypelessData\0UInt16\0UInt32\0UInt64\0UInt8\0unsigned int\0unsigned long long\0\
unsigned short\0vector\0Vector2f\0Vector3f\0Vector4f\0m_ScriptingClassIdentifier\0Gradient\0\
Type*\0int2_storage\0int3_storage\0BoundsInt\0m_CorrespondingSourceObject\0m_PrefabInstance\0\
m_PrefabAsset\0FileSize\0Hash128\0";

fn tree_string(local: &[u8], offset: u32) -> String {
    let (buf, start) = if offset & 0x8000_0000 == 0 {
        (local, offset as usize)
    } else {
        (COMMON_STRINGS.as_bytes(), (offset & 0x7FFF_FFFF) as usize)
    };
    let Some(slice) = buf.get(start..) else {
        return offset.to_string();
    };
    let end = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
    String::from_utf8_lossy(&slice[..end]).into_owned()
}

/// Check whether `r` looks like a serialized file without consuming it.
///
/// The header sizes must agree with the stream length. The stream position
/// is restored before returning.
pub fn is_serialized_file<R: Read + Seek>(r: &mut R) -> Result<bool> {
    let start = r.stream_position()?;
    let len = r.seek(SeekFrom::End(0))?;
    r.seek(SeekFrom::Start(start))?;
    let available = len.saturating_sub(start);
    let found = sniff_header(&mut EndianReader::new(&mut *r, true), available).unwrap_or(false);
    r.seek(SeekFrom::Start(start))?;
    Ok(found)
}

fn sniff_header<R: Read + Seek>(r: &mut EndianReader<R>, available: u64) -> Result<bool> {
    if available < 20 {
        return Ok(false);
    }
    let _header_size = r.read_u32()?;
    let mut size = u64::from(r.read_u32()?);
    let version = r.read_u32()?;
    let mut offset = u64::from(r.read_u32()?);
    if version == 0 || version > 0xFF {
        return Ok(false);
    }
    if SerializedVersion(version) >= SerializedVersion::LARGE_FILES {
        if available < 48 {
            return Ok(false);
        }
        r.skip(4)?;
        let _header_size = r.read_u32()?;
        size = r.read_u64()?;
        offset = r.read_u64()?;
    }
    Ok(size == available && offset <= size)
}
