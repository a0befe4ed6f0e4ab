use std::borrow::Cow;

use bytes::Bytes;

use super::ObjectReader;
use crate::Result;

/// Raw text or binary blob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextAsset {
    pub name: String,
    pub script: Bytes,
}

impl TextAsset {
    pub(crate) fn read(r: &mut ObjectReader) -> Result<Self> {
        let name = r.read_aligned_string()?;
        let script = r.read_byte_array()?;
        Ok(Self { name, script })
    }

    /// The script bytes as text, invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.script)
    }
}
