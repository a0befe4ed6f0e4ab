//! Fixture builders shared by the unit tests.
//!
//! Every builder writes with the crate's own [`EndianWriter`] and mirrors
//! the layout its parser expects, field for field.

use std::collections::BTreeSet;
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;

use crate::file::SerializedFile;
use crate::formats::serialized::SerializedVersion;
use crate::handler::{MemoryHandler, Tag};
use crate::io::EndianWriter;
use crate::objects::{ClassId, StreamingInfo};
use crate::texture::TextureFormat;
use crate::version::UnityVersion;

pub type Writer = EndianWriter<Cursor<Vec<u8>>>;

type Body = Box<dyn FnOnce(&mut Writer, SerializedVersion, UnityVersion)>;

struct ObjectFixture {
    path_id: i64,
    class_id: ClassId,
    body: Body,
}

// offsets into the shared blob type tree string table
const COMMON_BASE: u32 = 0x8000_0000 | 55;
const COMMON_M_NAME: u32 = 0x8000_0000 | 427;
const COMMON_STRING: u32 = 0x8000_0000 | 840;

/// Builds a serialized file of any format version.
pub struct SerializedFileBuilder {
    version: SerializedVersion,
    big_endian: bool,
    large_addressable: u64,
    type_tree: bool,
    engine: String,
    externals: Vec<String>,
    objects: Vec<ObjectFixture>,
}

impl SerializedFileBuilder {
    pub fn new(version: u32) -> Self {
        Self {
            version: SerializedVersion(version),
            big_endian: false,
            large_addressable: 0,
            type_tree: true,
            engine: "2019.4.31f1".into(),
            externals: Vec::new(),
            objects: Vec::new(),
        }
    }

    pub fn big_endian(mut self, big_endian: bool) -> Self {
        self.big_endian = big_endian;
        self
    }

    pub fn large_addressable(mut self, value: u64) -> Self {
        self.large_addressable = value;
        self
    }

    /// Only written from the type tree switch version on; older files
    /// always carry trees.
    pub fn type_tree(mut self, enabled: bool) -> Self {
        self.type_tree = enabled;
        self
    }

    pub fn engine(mut self, engine: &str) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn external(mut self, path: &str) -> Self {
        self.externals.push(path.into());
        self
    }

    /// An object whose payload is written by `body`.
    pub fn object<F>(mut self, path_id: i64, class_id: ClassId, body: F) -> Self
    where
        F: FnOnce(&mut Writer, SerializedVersion) + 'static,
    {
        self.objects.push(ObjectFixture {
            path_id,
            class_id,
            body: Box::new(move |w: &mut Writer, sv: SerializedVersion, _: UnityVersion| {
                body(w, sv)
            }),
        });
        self
    }

    pub fn raw_object(self, path_id: i64, class_id: ClassId, payload: Vec<u8>) -> Self {
        self.object(path_id, class_id, move |w, _| w.write_bytes(&payload).unwrap())
    }

    pub fn text_asset(self, path_id: i64, name: &str, script: &[u8]) -> Self {
        let name = name.to_owned();
        let script = script.to_vec();
        self.object(path_id, ClassId::TextAsset, move |w, _| {
            w.write_aligned_string(&name).unwrap();
            w.write_i32(script.len() as i32).unwrap();
            w.write_bytes(&script).unwrap();
            w.align(4).unwrap();
        })
    }

    pub fn transform(
        self,
        path_id: i64,
        game_object: (i32, i64),
        children: &[(i32, i64)],
        father: (i32, i64),
    ) -> Self {
        let children = children.to_vec();
        self.object(path_id, ClassId::Transform, move |w, sv| {
            write_pptr(w, sv, game_object.0, game_object.1);
            for v in [0.0f32, 0.0, 0.0, 1.0, 1.0, 2.0, 3.0, 1.0, 1.0, 1.0] {
                w.write_f32(v).unwrap();
            }
            w.write_i32(children.len() as i32).unwrap();
            for &(file_id, path_id) in &children {
                write_pptr(w, sv, file_id, path_id);
            }
            write_pptr(w, sv, father.0, father.1);
        })
    }

    pub fn texture2d(mut self, path_id: i64, fixture: TextureFixture) -> Self {
        self.objects.push(ObjectFixture {
            path_id,
            class_id: ClassId::Texture2D,
            body: Box::new(move |w: &mut Writer, _: SerializedVersion, v: UnityVersion| {
                fixture.write(w, v)
            }),
        });
        self
    }

    fn has_type_trees(&self) -> bool {
        self.version < SerializedVersion::TYPE_TREE_ENABLED_SWITCH || self.type_tree
    }

    pub fn build(self) -> Vec<u8> {
        let v = self.version;
        let engine = UnityVersion::parse_safe(&self.engine).unwrap_or_default();

        let type_tree = self.has_type_trees();

        let mut payloads = Vec::with_capacity(self.objects.len());
        let mut kinds = Vec::with_capacity(self.objects.len());
        for object in self.objects {
            let mut w = EndianWriter::new(Cursor::new(Vec::new()), self.big_endian);
            (object.body)(&mut w, v, engine);
            payloads.push(w.into_inner().into_inner());
            kinds.push((object.path_id, object.class_id));
        }

        let mut types: Vec<ClassId> = Vec::new();
        for &(_, class_id) in &kinds {
            if !types.contains(&class_id) {
                types.push(class_id);
            }
        }

        // relative payload offsets, each 8-aligned
        let mut data = Vec::new();
        let mut starts = Vec::new();
        for payload in &payloads {
            data.resize(data.len().div_ceil(8) * 8, 0);
            starts.push(data.len() as u64);
            data.extend_from_slice(payload);
        }

        let meta = Metadata {
            version: v,
            big_endian: self.big_endian,
            type_tree,
            engine: &self.engine,
            types: &types,
            objects: kinds
                .iter()
                .zip(&starts)
                .zip(&payloads)
                .map(|((&(path_id, class_id), &start), payload)| {
                    let type_index = types.iter().position(|&t| t == class_id).unwrap_or(0);
                    (path_id, class_id, start, payload.len() as u32, type_index as i32)
                })
                .collect(),
            externals: &self.externals,
        };

        let mut w = EndianWriter::new(Cursor::new(Vec::new()), true);
        if v < SerializedVersion::HEADER_CONTENT_AT_FRONT {
            // header, data, then the endianness byte and metadata at the tail
            w.write_bytes(&[0u8; 16]).unwrap();
            let data_offset = 16u64;
            w.write_bytes(&data).unwrap();
            w.align(4).unwrap();
            let tail = w.position().unwrap();
            w.write_u8(self.big_endian as u8).unwrap();
            w.write_bytes(&[0u8; 3]).unwrap();
            w.set_big_endian(self.big_endian);
            meta.write(&mut w);
            let mut out = w.into_inner().into_inner();
            let len = out.len() as u64;
            patch_u32(&mut out, 0, (len - tail) as u32);
            patch_u32(&mut out, 4, len as u32);
            patch_u32(&mut out, 8, v.0);
            patch_u32(&mut out, 12, data_offset as u32);
            return out;
        }

        w.write_bytes(&[0u8; 16]).unwrap();
        w.write_u8(self.big_endian as u8).unwrap();
        w.write_bytes(&[0u8; 3]).unwrap();
        if v >= SerializedVersion::LARGE_FILES {
            w.write_bytes(&[0u8; 28]).unwrap();
        }
        let metadata_start = w.position().unwrap();
        w.set_big_endian(self.big_endian);
        meta.write(&mut w);
        let metadata_size = w.position().unwrap() - metadata_start;
        w.align(16).unwrap();
        let data_offset = w.position().unwrap();
        w.write_bytes(&data).unwrap();

        let mut out = w.into_inner().into_inner();
        let len = out.len() as u64;
        patch_u32(&mut out, 0, metadata_size as u32);
        patch_u32(&mut out, 8, v.0);
        if v >= SerializedVersion::LARGE_FILES {
            patch_u32(&mut out, 20, metadata_size as u32);
            out[24..32].copy_from_slice(&len.to_be_bytes());
            out[32..40].copy_from_slice(&data_offset.to_be_bytes());
            out[40..48].copy_from_slice(&self.large_addressable.to_be_bytes());
        } else {
            patch_u32(&mut out, 4, len as u32);
            patch_u32(&mut out, 12, data_offset as u32);
        }
        out
    }
}

fn patch_u32(out: &mut [u8], at: usize, value: u32) {
    out[at..at + 4].copy_from_slice(&value.to_be_bytes());
}

struct Metadata<'a> {
    version: SerializedVersion,
    big_endian: bool,
    type_tree: bool,
    engine: &'a str,
    types: &'a [ClassId],
    /// (path id, class id, relative start, size, type index)
    objects: Vec<(i64, ClassId, u64, u32, i32)>,
    externals: &'a [String],
}

impl Metadata<'_> {
    fn write(&self, w: &mut Writer) {
        let v = self.version;
        debug_assert_eq!(w.is_big_endian(), self.big_endian);

        if v >= SerializedVersion::UNITY_VERSION {
            w.write_null_string(self.engine).unwrap();
        }
        if v >= SerializedVersion::TARGET_PLATFORM {
            w.write_i32(19).unwrap();
        }
        if v >= SerializedVersion::TYPE_TREE_ENABLED_SWITCH {
            w.write_bool(self.type_tree).unwrap();
        }

        w.write_i32(self.types.len() as i32).unwrap();
        for &class_id in self.types {
            self.write_type(w, class_id);
        }

        if v >= SerializedVersion::UNITY_VERSION && v < SerializedVersion::WIDE_PATH_IDS {
            w.write_i32(0).unwrap();
        }

        w.write_i32(self.objects.len() as i32).unwrap();
        for &(path_id, class_id, start, size, type_index) in &self.objects {
            if v < SerializedVersion::WIDE_PATH_IDS {
                w.write_i32(path_id as i32).unwrap();
            } else {
                w.align(4).unwrap();
                w.write_i64(path_id).unwrap();
            }
            if v >= SerializedVersion::LARGE_FILES {
                w.write_i64(start as i64).unwrap();
            } else {
                w.write_u32(start as u32).unwrap();
            }
            w.write_u32(size).unwrap();
            w.write_i32(type_index).unwrap();
            if v < SerializedVersion::REFACTORED_CLASS_ID {
                w.write_u16(i32::from(class_id) as u16).unwrap();
            }
            if v < SerializedVersion::HAS_SCRIPT_TYPE_INDEX {
                w.write_u16(0).unwrap();
            }
            if v >= SerializedVersion::HAS_SCRIPT_TYPE_INDEX
                && v < SerializedVersion::REFACTOR_TYPE_DATA
            {
                w.write_i16(-1).unwrap();
            }
            if v == SerializedVersion::STRIPPED_OBJECTS
                || v == SerializedVersion::REFACTORED_CLASS_ID
            {
                w.write_u8(0).unwrap();
            }
        }

        if v >= SerializedVersion::HAS_SCRIPT_TYPE_INDEX {
            w.write_i32(0).unwrap();
        }

        w.write_i32(self.externals.len() as i32).unwrap();
        for path in self.externals {
            if v >= SerializedVersion::HAS_EXTERNAL_TEMP_PATH {
                w.write_null_string("").unwrap();
            }
            if v >= SerializedVersion::HAS_GUIDS {
                w.write_bytes(&[0xAB; 16]).unwrap();
                w.write_i32(0).unwrap();
            }
            w.write_null_string(path).unwrap();
        }

        if v >= SerializedVersion::REF_OBJECTS {
            w.write_i32(0).unwrap();
        }
        if v >= SerializedVersion::HAS_GUIDS {
            w.write_null_string("").unwrap();
        }
    }

    fn write_type(&self, w: &mut Writer, class_id: ClassId) {
        let v = self.version;
        w.write_i32(i32::from(class_id)).unwrap();
        if v >= SerializedVersion::REFACTORED_CLASS_ID {
            w.write_bool(false).unwrap();
        }
        if v >= SerializedVersion::REFACTOR_TYPE_DATA {
            w.write_i16(-1).unwrap();
        }
        if v >= SerializedVersion::TYPE_TREE_ENABLED_SWITCH {
            let raw = i32::from(class_id);
            if (v < SerializedVersion::REFACTORED_CLASS_ID && raw < 0)
                || (v >= SerializedVersion::REFACTORED_CLASS_ID
                    && class_id == ClassId::MonoBehaviour)
            {
                w.write_bytes(&[0u8; 16]).unwrap();
            }
            w.write_bytes(&[0u8; 16]).unwrap();
        }
        if !self.type_tree {
            return;
        }

        let type_name = class_id.name().unwrap_or("Object");
        if v >= SerializedVersion::BLOB_TYPE_TREE || v.0 == 10 {
            let mut strings = type_name.as_bytes().to_vec();
            strings.push(0);
            let nodes = [(0u8, 0u32, COMMON_BASE, -1i32), (1, COMMON_STRING, COMMON_M_NAME, -1)];
            w.write_i32(nodes.len() as i32).unwrap();
            w.write_i32(strings.len() as i32).unwrap();
            for (index, (level, type_offset, name_offset, byte_size)) in nodes.into_iter().enumerate() {
                w.write_u16(1).unwrap();
                w.write_u8(level).unwrap();
                w.write_u8(0).unwrap();
                w.write_u32(type_offset).unwrap();
                w.write_u32(name_offset).unwrap();
                w.write_i32(byte_size).unwrap();
                w.write_i32(index as i32).unwrap();
                w.write_i32(0).unwrap();
                if v >= SerializedVersion::NODE_TYPE_FLAGS {
                    w.write_u64(0).unwrap();
                }
            }
            w.write_bytes(&strings).unwrap();
        } else {
            self.write_legacy_node(w, type_name, "Base", 1);
            self.write_legacy_node(w, "string", "m_Name", 0);
        }

        if v >= SerializedVersion::TYPE_DEPENDENCIES {
            w.write_i32(0).unwrap();
        }
    }

    fn write_legacy_node(&self, w: &mut Writer, type_name: &str, name: &str, children: i32) {
        let v = self.version;
        w.write_null_string(type_name).unwrap();
        w.write_null_string(name).unwrap();
        w.write_i32(-1).unwrap();
        if v == SerializedVersion::VARIABLE_COUNT {
            w.write_i32(0).unwrap();
        }
        if v.0 != 3 {
            w.write_i32(0).unwrap();
        }
        w.write_i32(0).unwrap();
        w.write_i32(1).unwrap();
        if v.0 != 3 {
            w.write_i32(0).unwrap();
        }
        w.write_i32(children).unwrap();
    }
}

/// Write a reference in the width the format version uses.
pub fn write_pptr(w: &mut Writer, sv: SerializedVersion, file_id: i32, path_id: i64) {
    w.write_i32(file_id).unwrap();
    if sv < SerializedVersion::WIDE_PATH_IDS {
        w.write_i32(path_id as i32).unwrap();
    } else {
        w.write_i64(path_id).unwrap();
    }
}

/// Parse `bytes` as a standalone file and build its objects.
pub fn load_single(bytes: Vec<u8>) -> SerializedFile {
    let mut file = SerializedFile::parse(
        Bytes::from(bytes),
        Tag::Memory("test".into()),
        Arc::new(MemoryHandler::default()),
        None,
    )
    .unwrap();
    file.build_objects(&BTreeSet::new());
    file
}

/// A texture payload, written in whatever layout the engine version uses.
pub struct TextureFixture {
    name: String,
    format: TextureFormat,
    width: u32,
    height: u32,
    mip_flag: bool,
    image: Vec<u8>,
    stream: Option<StreamingInfo>,
}

impl TextureFixture {
    pub fn inline(name: &str, format: TextureFormat, width: u32, height: u32, image: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            format,
            width,
            height,
            mip_flag: false,
            image,
            stream: None,
        }
    }

    pub fn streamed(
        name: &str,
        format: TextureFormat,
        width: u32,
        height: u32,
        stream: StreamingInfo,
    ) -> Self {
        Self {
            stream: Some(stream),
            ..Self::inline(name, format, width, height, Vec::new())
        }
    }

    pub fn mip_flag(mut self, mip_flag: bool) -> Self {
        self.mip_flag = mip_flag;
        self
    }

    fn write(self, w: &mut Writer, v: UnityVersion) {
        let v2020 = UnityVersion::new(2020, 0, 0);
        w.write_aligned_string(&self.name).unwrap();
        if v >= UnityVersion::V2017_3 {
            w.write_i32(0).unwrap();
            w.write_bool(false).unwrap();
            if v >= UnityVersion::V2020_2 {
                w.write_bool(false).unwrap();
            }
            w.align(4).unwrap();
        }

        w.write_i32(self.width as i32).unwrap();
        w.write_i32(self.height as i32).unwrap();
        w.write_i32(self.image.len() as i32).unwrap();
        if v >= v2020 {
            w.write_i32(0).unwrap();
        }
        w.write_i32(i32::from(self.format)).unwrap();

        if v < UnityVersion::V5_2 {
            w.write_bool(self.mip_flag).unwrap();
        } else {
            let levels = if self.mip_flag {
                u32::BITS - self.width.max(self.height).max(1).leading_zeros()
            } else {
                1
            };
            w.write_i32(levels as i32).unwrap();
        }

        if v >= UnityVersion::V2_6 {
            w.write_bool(true).unwrap();
        }
        if v >= v2020 {
            w.write_bool(false).unwrap();
        }
        if v >= UnityVersion::V2019_3 {
            w.write_bool(false).unwrap();
        }
        if v >= UnityVersion::V3_0 && v < UnityVersion::V5_5 {
            w.write_bool(true).unwrap();
        }
        if v >= UnityVersion::V2018_2 {
            w.write_bool(false).unwrap();
        }
        w.align(4).unwrap();
        if v >= UnityVersion::V2018_2 {
            w.write_i32(0).unwrap();
        }

        w.write_i32(1).unwrap();
        w.write_i32(2).unwrap();

        w.write_i32(1).unwrap();
        w.write_i32(1).unwrap();
        w.write_f32(0.0).unwrap();
        if v >= UnityVersion::V2017_1 {
            for wrap in [1, 1, 1] {
                w.write_i32(wrap).unwrap();
            }
        } else {
            w.write_i32(1).unwrap();
        }
        if v >= UnityVersion::V3_0 {
            w.write_i32(0).unwrap();
        }
        if v >= UnityVersion::V3_5 {
            w.write_i32(1).unwrap();
        }
        if v >= UnityVersion::V2020_2 {
            w.write_i32(0).unwrap();
            w.align(4).unwrap();
        }

        match self.stream {
            Some(stream) => {
                w.write_i32(0).unwrap();
                if v >= UnityVersion::V2020_1 {
                    w.write_u64(stream.offset).unwrap();
                } else {
                    w.write_u32(stream.offset as u32).unwrap();
                }
                w.write_u32(stream.size).unwrap();
                w.write_aligned_string(&stream.path).unwrap();
            }
            None => {
                w.write_i32(self.image.len() as i32).unwrap();
                w.write_bytes(&self.image).unwrap();
            }
        }
    }
}

/// Builds `UnityFS` bundles, format version 7.
#[derive(Default)]
pub struct BundleBuilder {
    nodes: Vec<(String, Vec<u8>, bool)>,
    lz4: bool,
    lzma: bool,
    block_info_at_end: bool,
    corrupt_node_size: u64,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, path: &str, data: &[u8], serialized: bool) -> Self {
        self.nodes.push((path.into(), data.to_vec(), serialized));
        self
    }

    /// Compress block info and every storage block with LZ4.
    pub fn lz4(mut self, lz4: bool) -> Self {
        self.lz4 = lz4;
        self
    }

    /// Compress block info and every storage block with raw LZMA. Takes
    /// precedence over [`Self::lz4`].
    pub fn lzma(mut self, lzma: bool) -> Self {
        self.lzma = lzma;
        self
    }

    pub fn block_info_at_end(mut self, at_end: bool) -> Self {
        self.block_info_at_end = at_end;
        self
    }

    /// Inflate the first node's declared size past the data segment.
    pub fn corrupt_node_size(mut self, extra: u64) -> Self {
        self.corrupt_node_size = extra;
        self
    }

    fn pack(&self, data: &[u8]) -> Vec<u8> {
        if self.lzma {
            compress_lzma(data)
        } else if self.lz4 {
            compress_lz4(data)
        } else {
            data.to_vec()
        }
    }

    pub fn build(self) -> Vec<u8> {
        let compression: u16 = match (self.lzma, self.lz4) {
            (true, _) => 1,
            (false, true) => 2,
            (false, false) => 0,
        };

        let mut storage = Vec::new();
        let mut packed_blocks = Vec::new();
        for (_, data, _) in &self.nodes {
            let packed = self.pack(data);
            storage.push((data.len() as u32, packed.len() as u32));
            packed_blocks.extend_from_slice(&packed);
        }

        let mut info = EndianWriter::new(Cursor::new(Vec::new()), true);
        info.write_bytes(&[0x11; 16]).unwrap();
        info.write_i32(storage.len() as i32).unwrap();
        for &(uncompressed, compressed) in &storage {
            info.write_u32(uncompressed).unwrap();
            info.write_u32(compressed).unwrap();
            info.write_u16(compression).unwrap();
        }
        info.write_i32(self.nodes.len() as i32).unwrap();
        let mut offset = 0u64;
        for (i, (path, data, serialized)) in self.nodes.iter().enumerate() {
            let extra = if i == 0 { self.corrupt_node_size } else { 0 };
            info.write_i64(offset as i64).unwrap();
            info.write_i64((data.len() as u64 + extra) as i64).unwrap();
            info.write_u32(if *serialized { 4 } else { 0 }).unwrap();
            info.write_null_string(path).unwrap();
            offset += data.len() as u64;
        }
        let info = info.into_inner().into_inner();
        let packed_info = self.pack(&info);

        let mut flags = u32::from(compression);
        if self.block_info_at_end {
            flags |= 0x80;
        }

        let mut w = EndianWriter::new(Cursor::new(Vec::new()), true);
        w.write_null_string("UnityFS").unwrap();
        w.write_i32(7).unwrap();
        w.write_null_string("5.x.x").unwrap();
        w.write_null_string("2019.4.31f1").unwrap();
        let size_at = w.position().unwrap() as usize;
        w.write_i64(0).unwrap();
        w.write_u32(packed_info.len() as u32).unwrap();
        w.write_u32(info.len() as u32).unwrap();
        w.write_u32(flags).unwrap();
        w.align(16).unwrap();
        if self.block_info_at_end {
            w.write_bytes(&packed_blocks).unwrap();
            w.write_bytes(&packed_info).unwrap();
        } else {
            w.write_bytes(&packed_info).unwrap();
            w.write_bytes(&packed_blocks).unwrap();
        }

        let mut out = w.into_inner().into_inner();
        let len = out.len() as i64;
        out[size_at..size_at + 8].copy_from_slice(&len.to_be_bytes());
        out
    }
}

#[cfg(feature = "compression")]
fn compress_lz4(data: &[u8]) -> Vec<u8> {
    lz4_flex::block::compress(data)
}

#[cfg(not(feature = "compression"))]
fn compress_lz4(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

/// Properties and stream only, as `UnityFS` stores LZMA blocks.
#[cfg(feature = "compression")]
pub fn compress_lzma(data: &[u8]) -> Vec<u8> {
    use lzma_rs::compress::{Options, UnpackedSize};

    let options = Options {
        unpacked_size: UnpackedSize::SkipWritingToHeader,
    };
    let mut out = Vec::new();
    lzma_rs::lzma_compress_with_options(&mut Cursor::new(data), &mut out, &options).unwrap();
    out
}

#[cfg(not(feature = "compression"))]
pub fn compress_lzma(data: &[u8]) -> Vec<u8> {
    data.to_vec()
}

/// Build a `UnityRaw` bundle, format version 3, holding `nodes`.
pub fn build_raw_bundle(nodes: &[(&str, &[u8])]) -> Vec<u8> {
    let dir_size: usize = 4 + nodes.iter().map(|(p, _)| p.len() + 1 + 8).sum::<usize>();

    let mut payload = EndianWriter::new(Cursor::new(Vec::new()), true);
    payload.write_i32(nodes.len() as i32).unwrap();
    let mut offset = dir_size as u32;
    for (path, data) in nodes {
        payload.write_null_string(path).unwrap();
        payload.write_u32(offset).unwrap();
        payload.write_u32(data.len() as u32).unwrap();
        offset += data.len() as u32;
    }
    for (_, data) in nodes {
        payload.write_bytes(data).unwrap();
    }
    let payload = payload.into_inner().into_inner();

    let mut w = EndianWriter::new(Cursor::new(Vec::new()), true);
    w.write_null_string("UnityRaw").unwrap();
    w.write_i32(3).unwrap();
    w.write_null_string("3.x.x").unwrap();
    w.write_null_string("4.7.2f1").unwrap();
    // eight fixed words follow
    let header_size = w.position().unwrap() as u32 + 8 * 4;
    w.write_u32(payload.len() as u32).unwrap();
    w.write_u32(header_size).unwrap();
    w.write_u32(1).unwrap();
    w.write_i32(1).unwrap();
    w.write_u32(payload.len() as u32).unwrap();
    w.write_u32(payload.len() as u32).unwrap();
    w.write_u32(header_size + payload.len() as u32).unwrap();
    w.write_u32(0).unwrap();
    w.write_bytes(&payload).unwrap();
    w.into_inner().into_inner()
}

/// Shared view of a [`DropTracker`].
#[derive(Debug, Default)]
pub struct TrackerState {
    pub dropped: AtomicBool,
    pub reads: AtomicUsize,
}

/// A stream that records reads and when it is dropped.
pub struct DropTracker {
    inner: Cursor<Vec<u8>>,
    state: Arc<TrackerState>,
}

impl DropTracker {
    pub fn new(data: Vec<u8>) -> (Self, Arc<TrackerState>) {
        let state = Arc::new(TrackerState::default());
        (
            Self {
                inner: Cursor::new(data),
                state: state.clone(),
            },
            state,
        )
    }
}

impl Read for DropTracker {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.state.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(buf)
    }
}

impl Drop for DropTracker {
    fn drop(&mut self) {
        self.state.dropped.store(true, Ordering::SeqCst);
    }
}
