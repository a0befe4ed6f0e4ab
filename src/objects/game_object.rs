//! Scene graph nodes.

use super::{ClassId, ObjectReader, PPtr, SerializedObject};
use crate::Result;
use crate::collection::AssetCollection;
use crate::version::UnityVersion;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameObject {
    pub name: String,
    pub components: Vec<PPtr>,
    pub layer: u32,
    pub tag: u16,
    pub is_active: bool,
}

impl GameObject {
    pub(crate) fn read(r: &mut ObjectReader) -> Result<Self> {
        let count = r.read_count()?;
        let mut components = Vec::with_capacity(count);
        for _ in 0..count {
            // older layouts store the component's class id inline
            if r.version < UnityVersion::V5_5 {
                let _class_id = r.read_i32()?;
            }
            components.push(r.read_pptr()?);
        }
        let layer = r.read_u32()?;
        let name = r.read_aligned_string()?;
        let tag = r.read_u16()?;
        let is_active = r.read_bool();
        Ok(Self {
            name,
            components,
            layer,
            tag,
            is_active,
        })
    }

    /// Components that resolve in `collection`. `owner` is the object this
    /// game object was decoded from.
    pub fn resolved_components<'a>(
        &'a self,
        collection: &'a AssetCollection,
        owner: &'a SerializedObject,
    ) -> impl Iterator<Item = &'a SerializedObject> + 'a {
        self.components
            .iter()
            .filter_map(move |&pptr| collection.resolve(owner, pptr))
    }

    /// The transform (or rect transform) component, if loaded.
    pub fn find_transform<'a>(
        &'a self,
        collection: &'a AssetCollection,
        owner: &'a SerializedObject,
    ) -> Option<&'a SerializedObject> {
        self.resolved_components(collection, owner).find(|c| {
            matches!(c.class_id(), ClassId::Transform | ClassId::RectTransform)
        })
    }
}
