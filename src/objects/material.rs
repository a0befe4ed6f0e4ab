//! Materials and their saved shader properties.

use std::collections::BTreeMap;

use super::{ColorRgba, ObjectReader, PPtr, Vector2};
use crate::Result;
use crate::version::UnityVersion;

/// A texture slot: the texture plus its UV transform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TexEnv {
    pub texture: PPtr,
    pub scale: Vector2,
    pub offset: Vector2,
}

/// Saved shader properties by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySheet {
    pub textures: BTreeMap<String, TexEnv>,
    /// Present from 2021.1.
    pub ints: BTreeMap<String, i32>,
    pub floats: BTreeMap<String, f32>,
    pub colors: BTreeMap<String, ColorRgba>,
}

impl PropertySheet {
    fn read(r: &mut ObjectReader) -> Result<Self> {
        let mut sheet = Self::default();

        let count = r.read_count()?;
        for _ in 0..count {
            let name = r.read_aligned_string()?;
            let env = TexEnv {
                texture: r.read_pptr()?,
                scale: r.read_struct()?,
                offset: r.read_struct()?,
            };
            sheet.textures.insert(name, env);
        }

        if r.version >= UnityVersion::V2021_1 {
            let count = r.read_count()?;
            for _ in 0..count {
                let name = r.read_aligned_string()?;
                sheet.ints.insert(name, r.read_i32()?);
            }
        }

        let count = r.read_count()?;
        for _ in 0..count {
            let name = r.read_aligned_string()?;
            sheet.floats.insert(name, r.read_f32()?);
        }

        let count = r.read_count()?;
        for _ in 0..count {
            let name = r.read_aligned_string()?;
            sheet.colors.insert(name, r.read_struct()?);
        }

        Ok(sheet)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub name: String,
    pub shader: PPtr,
    /// Enabled keywords. Before 2021.3 this is the space-separated list.
    pub keywords: Vec<String>,
    /// Keywords the shader no longer declares (2021.3+).
    pub invalid_keywords: Vec<String>,
    pub lightmap_flags: u32,
    pub enable_instancing: bool,
    pub double_sided_gi: bool,
    /// `-1` uses the shader's queue.
    pub custom_render_queue: i32,
    pub string_tags: BTreeMap<String, String>,
    pub disabled_passes: Vec<String>,
    pub properties: PropertySheet,
}

impl Material {
    pub(crate) fn read(r: &mut ObjectReader) -> Result<Self> {
        let v = r.version;
        let mut m = Self {
            name: r.read_aligned_string()?,
            shader: r.read_pptr()?,
            custom_render_queue: -1,
            ..Self::default()
        };

        if v >= UnityVersion::V2021_3 {
            m.keywords = r.read_string_vec()?;
            m.invalid_keywords = r.read_string_vec()?;
        } else if v >= UnityVersion::V5_0 {
            m.keywords = r
                .read_aligned_string()?
                .split(' ')
                .filter(|k| !k.is_empty())
                .map(str::to_owned)
                .collect();
        } else if v >= UnityVersion::V4_1 {
            m.keywords = r.read_string_vec()?;
        }

        if v >= UnityVersion::V4_3 {
            m.lightmap_flags = r.read_u32()?;
        }
        if v >= UnityVersion::V5_6 {
            m.enable_instancing = r.read_bool();
        }
        if v >= UnityVersion::V2017_1 {
            m.double_sided_gi = r.read_bool();
        }
        if v >= UnityVersion::V5_6 {
            r.align(4)?;
        }
        if v >= UnityVersion::V4_3 {
            m.custom_render_queue = r.read_i32()?;
        }

        if v >= UnityVersion::V5_1 {
            let count = r.read_count()?;
            for _ in 0..count {
                let key = r.read_aligned_string()?;
                let value = r.read_aligned_string()?;
                m.string_tags.insert(key, value);
            }
        }
        if v >= UnityVersion::V5_6 {
            m.disabled_passes = r.read_string_vec()?;
        }

        m.properties = PropertySheet::read(r)?;
        Ok(m)
    }

    /// Texture bound to a named slot such as `_MainTex`.
    pub fn texture(&self, slot: &str) -> Option<PPtr> {
        self.properties
            .textures
            .get(slot)
            .map(|env| env.texture)
            .filter(|t| !t.is_null())
    }
}
