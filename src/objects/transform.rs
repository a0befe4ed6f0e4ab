//! Local transforms and hierarchy links.

use super::{ObjectReader, PPtr, Quaternion, SerializedObject, Vector3};
use crate::Result;
use crate::collection::AssetCollection;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transform {
    pub game_object: PPtr,
    pub rotation: Quaternion,
    pub position: Vector3,
    pub scale: Vector3,
    pub children: Vec<PPtr>,
    pub father: PPtr,
}

impl Transform {
    pub(crate) fn read(r: &mut ObjectReader) -> Result<Self> {
        let game_object = r.read_pptr()?;
        let rotation = r.read_struct()?;
        let position = r.read_struct()?;
        let scale = r.read_struct()?;
        let children = r.read_pptr_vec()?;
        let father = r.read_pptr()?;
        Ok(Self {
            game_object,
            rotation,
            position,
            scale,
            children,
            father,
        })
    }

    pub fn resolved_children<'a>(
        &'a self,
        collection: &'a AssetCollection,
        owner: &'a SerializedObject,
    ) -> impl Iterator<Item = &'a SerializedObject> + 'a {
        self.children
            .iter()
            .filter_map(move |&pptr| collection.resolve(owner, pptr))
    }

    pub fn resolved_father<'a>(
        &self,
        collection: &'a AssetCollection,
        owner: &SerializedObject,
    ) -> Option<&'a SerializedObject> {
        collection.resolve(owner, self.father)
    }
}
