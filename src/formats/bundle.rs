//! Asset bundles - multi-block containers of serialized files and resources.
//!
//! ## Common header
//! ```text
//! Signature        (null-terminated: UnityFS / UnityWeb / UnityRaw / UnityArchive)
//! FormatVersion    (i32 BE)
//! EngineVersion    (null-terminated, often the placeholder 5.x.x)
//! EngineRevision   (null-terminated, e.g. 2019.4.31f1)
//! ```
//! The character at index 5 of the signature selects the body layout.
//!
//! ## UnityFS body (all fields BE)
//! ```text
//! Size                       (i64)  total bundle size
//! CompressedBlockInfoSize    (u32)
//! UncompressedBlockInfoSize  (u32)
//! ArchiveFlags               (u32)  low 6 bits = block info compression
//! --- FormatVersion >= 7: align to 16
//! BlockInfo                  here, or at Size - CompressedBlockInfoSize
//!                            when BLOCK_INFO_AT_END is set
//! --- BLOCK_INFO_NEEDS_PADDING: align to 16
//! StorageBlocks              one compressed run per storage block
//! ```
//!
//! ## Block info (decompressed, BE)
//! ```text
//! Hash                   (16 bytes)
//! StorageBlockCount      (i32)  × { Uncompressed u32, Compressed u32, Flags u16 }
//! NodeCount              (i32)  × { Offset i64, Size i64, Flags u32, Path cstr }
//! ```
//! Node offsets address the concatenation of all decompressed storage
//! blocks.
//!
//! ## UnityRaw / UnityWeb body (BE)
//! ```text
//! --- FormatVersion >= 4: Hash (16 bytes), Crc (u32)
//! MinimumStreamedBytes   (u32)
//! HeaderSize             (u32)  data starts here
//! LevelsBeforeStreaming  (u32)
//! LevelCount             (i32)  × { Compressed u32, Uncompressed u32 }
//! --- FormatVersion >= 2: CompleteFileSize (u32)
//! --- FormatVersion >= 3: FileInfoHeaderSize (u32)
//! [HeaderSize] payload   LZMA with full header for UnityWeb, stored for UnityRaw
//! ```
//! The payload opens with its own directory: `Count i32` then
//! `{ Path cstr, Offset u32, Size u32 }` per node.

use std::io::{Cursor, Read, Seek, SeekFrom};

use bitflags::bitflags;
use bytes::Bytes;
use log::{debug, trace};

use crate::compression::{Compression, decompress_block};
use crate::formats::serialized::is_serialized_file;
use crate::io::EndianReader;
use crate::version::UnityVersion;
use crate::{Error, Result};

/// Container family, from the sixth signature character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleFormat {
    Fs,
    Web,
    Raw,
    Archive,
    Unknown,
}

impl BundleFormat {
    fn from_signature(signature: &str) -> Self {
        match signature.as_bytes().get(5) {
            Some(b'F') => Self::Fs,
            Some(b'W') => Self::Web,
            Some(b'R') => Self::Raw,
            Some(b'A') => Self::Archive,
            _ => Self::Unknown,
        }
    }
}

/// The leading record shared by every bundle family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnityBundle {
    pub signature: String,
    pub format_version: i32,
    pub engine_version: String,
    pub engine_revision: String,
}

impl UnityBundle {
    fn parse<R: Read + Seek>(r: &mut EndianReader<R>) -> Result<Self> {
        Ok(Self {
            signature: r.read_null_string(16)?,
            format_version: r.read_i32()?,
            engine_version: r.read_null_string(0)?,
            engine_revision: r.read_null_string(0)?,
        })
    }

    pub fn format(&self) -> BundleFormat {
        BundleFormat::from_signature(&self.signature)
    }

    /// Parsed engine version, `None` for placeholders such as `5.x.x`.
    pub fn version(&self) -> Option<UnityVersion> {
        UnityVersion::parse_safe(&self.engine_version)
    }

    pub fn revision(&self) -> Option<UnityVersion> {
        UnityVersion::parse_safe(&self.engine_revision)
    }

    /// Best available engine version: the revision, then the version string.
    pub fn engine(&self) -> Option<UnityVersion> {
        self.revision().or_else(|| self.version())
    }
}

bitflags! {
    /// `UnityFS` archive flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ArchiveFlags: u32 {
        const COMPRESSION_MASK = 0x3F;
        const BLOCKS_AND_DIRECTORY_COMBINED = 0x40;
        const BLOCK_INFO_AT_END = 0x80;
        const OLD_WEB_PLUGIN_COMPATIBILITY = 0x100;
        const BLOCK_INFO_NEEDS_PADDING = 0x200;
    }
}

bitflags! {
    /// Storage block flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StorageBlockFlags: u16 {
        const COMPRESSION_MASK = 0x3F;
        const STREAMED = 0x40;
    }
}

bitflags! {
    /// Directory node flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlockFlags: u32 {
        const DIRECTORY = 0x1;
        const DELETED = 0x2;
        const SERIALIZED_FILE = 0x4;
    }
}

/// One compressed run of the data segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageBlock {
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub flags: StorageBlockFlags,
}

impl StorageBlock {
    pub fn compression(&self) -> Result<Compression> {
        Compression::from_flags(u32::from(self.flags.bits()))
    }
}

/// One named entry of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub path: String,
    /// Offset within the decompressed data segment.
    pub offset: u64,
    pub size: u64,
    pub flags: BlockFlags,
}

impl Block {
    pub fn is_serialized_file(&self) -> bool {
        self.flags.contains(BlockFlags::SERIALIZED_FILE)
    }
}

/// Block table of a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    pub hash: [u8; 16],
    pub storage_blocks: Vec<StorageBlock>,
    pub blocks: Vec<Block>,
}

/// A parsed bundle with its data segment fully decompressed.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub header: UnityBundle,
    pub container: Container,
    /// Total bundle length in the source stream.
    pub size: u64,
    data: Bytes,
}

const SIGNATURES: [&[u8]; 4] = [b"UnityFS\0", b"UnityWeb\0", b"UnityRaw\0", b"UnityArchive\0"];

impl Bundle {
    /// Parse one bundle. `r` must be positioned at its signature.
    ///
    /// On success `r` is left at the end of the bundle.
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let start = r.stream_position()?;
        let mut er = EndianReader::new(&mut *r, true);
        let header = UnityBundle::parse(&mut er)?;

        let (container, data, size) = match header.format() {
            BundleFormat::Fs => read_fs(&mut er, &header, start)?,
            BundleFormat::Raw | BundleFormat::Web => read_web_raw(&mut er, &header, start)?,
            BundleFormat::Archive | BundleFormat::Unknown => {
                return Err(Error::UnsupportedBundle(header.signature));
            }
        };

        for block in &container.blocks {
            let end = block.offset.checked_add(block.size).ok_or(Error::InvalidRange)?;
            if end > data.len() as u64 {
                return Err(Error::InvalidRange);
            }
        }

        debug!(
            "parsed {} bundle v{} ({}): {} blocks, {} data bytes",
            header.signature,
            header.format_version,
            header.engine_revision,
            container.blocks.len(),
            data.len()
        );

        r.seek(SeekFrom::Start(start + size))?;
        Ok(Self {
            header,
            container,
            size,
            data: Bytes::from(data),
        })
    }

    /// Check for a known bundle signature. The stream position is restored.
    pub fn is_bundle<R: Read + Seek>(r: &mut R) -> Result<bool> {
        let start = r.stream_position()?;
        let mut buf = [0u8; 13];
        let mut filled = 0;
        while filled < buf.len() {
            match r.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        r.seek(SeekFrom::Start(start))?;
        let head = &buf[..filled];
        Ok(SIGNATURES.iter().any(|sig| head.starts_with(sig)))
    }

    /// Parse bundles laid end to end from the current position, each
    /// starting on an `align` boundary relative to that position.
    ///
    /// Stops at the end of the stream or at the first position that does not
    /// hold a bundle signature (trailing padding).
    pub fn parse_sequence<R: Read + Seek>(r: &mut R, align: u64) -> Result<Vec<Self>> {
        let align = align.max(1);
        let origin = r.stream_position()?;
        let len = r.seek(SeekFrom::End(0))?;
        r.seek(SeekFrom::Start(origin))?;
        let mut bundles = Vec::new();
        loop {
            let pos = r.stream_position()? - origin;
            let aligned = origin + pos.div_ceil(align) * align;
            if aligned >= len {
                break;
            }
            r.seek(SeekFrom::Start(aligned))?;
            if !Self::is_bundle(r)? {
                break;
            }
            bundles.push(Self::parse(r)?);
        }
        debug!("parsed bundle sequence of {}", bundles.len());
        Ok(bundles)
    }

    /// The bytes of one block, sharing the bundle's buffer.
    pub fn open_block(&self, block: &Block) -> Result<Bytes> {
        let start = usize::try_from(block.offset).map_err(|_| Error::InvalidRange)?;
        let len = usize::try_from(block.size).map_err(|_| Error::InvalidRange)?;
        let end = start.checked_add(len).ok_or(Error::InvalidRange)?;
        if end > self.data.len() {
            return Err(Error::InvalidRange);
        }
        Ok(self.data.slice(start..end))
    }

    /// Find a block by path, ignoring ASCII case.
    pub fn block(&self, path: &str) -> Option<&Block> {
        self.container
            .blocks
            .iter()
            .find(|b| b.path.eq_ignore_ascii_case(path))
    }
}

fn align_from<R: Read + Seek>(r: &mut EndianReader<R>, start: u64, alignment: u64) -> Result<()> {
    let rel = r.position()? - start;
    let rem = rel % alignment;
    if rem != 0 {
        r.skip((alignment - rem) as i64)?;
    }
    Ok(())
}

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

fn read_fs<R: Read + Seek>(
    r: &mut EndianReader<R>,
    header: &UnityBundle,
    start: u64,
) -> Result<(Container, Vec<u8>, u64)> {
    if header.format_version < 6 {
        return Err(Error::UnsupportedVersion(header.format_version as u32));
    }
    let size = u64::try_from(r.read_i64()?).map_err(|_| Error::InvalidRange)?;
    let compressed_info_size = r.read_u32()?;
    let uncompressed_info_size = r.read_u32()?;
    let flags = ArchiveFlags::from_bits_retain(r.read_u32()?);

    if header.format_version >= 7 {
        align_from(r, start, 16)?;
    }

    let raw_info = if flags.contains(ArchiveFlags::BLOCK_INFO_AT_END) {
        let data_start = r.position()?;
        let info_start = (start + size)
            .checked_sub(u64::from(compressed_info_size))
            .ok_or(Error::InvalidRange)?;
        r.seek(SeekFrom::Start(info_start))?;
        let raw = r.read_bytes(compressed_info_size as usize)?;
        r.seek(SeekFrom::Start(data_start))?;
        raw
    } else {
        let raw = r.read_bytes(compressed_info_size as usize)?;
        if flags.contains(ArchiveFlags::BLOCK_INFO_NEEDS_PADDING) {
            align_from(r, start, 16)?;
        }
        raw
    };

    let info = decompress_block(
        Compression::from_flags(flags.bits())?,
        &raw_info,
        uncompressed_info_size as usize,
    )?;
    let container = read_block_info(&info)?;

    let total: u64 = container
        .storage_blocks
        .iter()
        .map(|b| u64::from(b.uncompressed_size))
        .sum();
    let total = usize::try_from(total).map_err(|_| Error::InvalidRange)?;
    let mut data = Vec::with_capacity(total.min(MAX_PREALLOCATION));
    for block in &container.storage_blocks {
        let packed = r.read_bytes(block.compressed_size as usize)?;
        trace!(
            "storage block {:?}: {} -> {} bytes",
            block.compression()?,
            block.compressed_size,
            block.uncompressed_size
        );
        data.extend(decompress_block(
            block.compression()?,
            &packed,
            block.uncompressed_size as usize,
        )?);
    }

    Ok((container, data, size))
}

// Block tables are untrusted; past this the segment grows as blocks decode.
const MAX_PREALLOCATION: usize = 64 << 20;

fn read_block_info(info: &[u8]) -> Result<Container> {
    let mut r = EndianReader::new(Cursor::new(info), true);
    let hash = r.read_fixed::<16>()?;

    let count = read_count(&mut r)?;
    let mut storage_blocks = Vec::with_capacity(count);
    for _ in 0..count {
        storage_blocks.push(StorageBlock {
            uncompressed_size: r.read_u32()?,
            compressed_size: r.read_u32()?,
            flags: StorageBlockFlags::from_bits_retain(r.read_u16()?),
        });
    }

    let count = read_count(&mut r)?;
    let mut blocks = Vec::with_capacity(count);
    for _ in 0..count {
        let offset = u64::try_from(r.read_i64()?).map_err(|_| Error::InvalidRange)?;
        let size = u64::try_from(r.read_i64()?).map_err(|_| Error::InvalidRange)?;
        let flags = BlockFlags::from_bits_retain(r.read_u32()?);
        let path = r.read_null_string(0)?;
        blocks.push(Block {
            path,
            offset,
            size,
            flags,
        });
    }

    Ok(Container {
        hash,
        storage_blocks,
        blocks,
    })
}

fn read_web_raw<R: Read + Seek>(
    r: &mut EndianReader<R>,
    header: &UnityBundle,
    start: u64,
) -> Result<(Container, Vec<u8>, u64)> {
    let version = header.format_version;
    let mut hash = [0u8; 16];
    if version >= 4 {
        hash = r.read_fixed::<16>()?;
        let _crc = r.read_u32()?;
    }
    let _minimum_streamed_bytes = r.read_u32()?;
    let header_size = r.read_u32()?;
    let _levels_before_streaming = r.read_u32()?;

    let level_count = read_count(r)?;
    let web = header.format() == BundleFormat::Web;
    let level_flags = if web {
        StorageBlockFlags::from_bits_retain(1)
    } else {
        StorageBlockFlags::empty()
    };
    let mut storage_blocks = Vec::with_capacity(level_count);
    for _ in 0..level_count {
        let compressed_size = r.read_u32()?;
        let uncompressed_size = r.read_u32()?;
        storage_blocks.push(StorageBlock {
            uncompressed_size,
            compressed_size,
            flags: level_flags,
        });
    }
    let complete_size = if version >= 2 { Some(r.read_u32()?) } else { None };
    if version >= 3 {
        let _file_info_header_size = r.read_u32()?;
    }

    // levels are cumulative, the last one spans the whole payload
    let last = *storage_blocks
        .last()
        .ok_or(Error::Parse("bundle has no levels"))?;
    r.seek(SeekFrom::Start(start + u64::from(header_size)))?;
    let packed = r.read_bytes(last.compressed_size as usize)?;
    let data = if web { decompress_web(&packed)? } else { packed };

    let mut dir = EndianReader::new(Cursor::new(data.as_slice()), true);
    let count = read_count(&mut dir)?;
    let mut blocks = Vec::with_capacity(count);
    for _ in 0..count {
        let path = dir.read_null_string(0)?;
        let offset = u64::from(dir.read_u32()?);
        let size = u64::from(dir.read_u32()?);
        let flags = match node_slice(&data, offset, size) {
            Some(node) if is_serialized_file(&mut Cursor::new(node))? => BlockFlags::SERIALIZED_FILE,
            _ => BlockFlags::empty(),
        };
        blocks.push(Block {
            path,
            offset,
            size,
            flags,
        });
    }

    let size = complete_size
        .filter(|&s| s != 0)
        .map(u64::from)
        .unwrap_or(u64::from(header_size) + u64::from(last.compressed_size));

    Ok((
        Container {
            hash,
            storage_blocks,
            blocks,
        },
        data,
        size,
    ))
}

fn node_slice(data: &[u8], offset: u64, size: u64) -> Option<&[u8]> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(usize::try_from(size).ok()?)?;
    data.get(start..end)
}

#[cfg(feature = "compression")]
fn decompress_web(packed: &[u8]) -> Result<Vec<u8>> {
    crate::compression::lzma::decompress_lzma(packed)
}

#[cfg(not(feature = "compression"))]
fn decompress_web(_packed: &[u8]) -> Result<Vec<u8>> {
    Err(Error::UnsupportedCompression(1))
}
