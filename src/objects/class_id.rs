//! Object kind identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generates the closed set of modelled kinds plus an `Other` escape hatch
/// that keeps every id round-trippable.
macro_rules! class_ids {
    ($($name:ident = $value:literal),* $(,)?) => {
        /// Identifies an object's concrete kind.
        ///
        /// Only a subset of the engine's several hundred kinds is named;
        /// everything else is carried as [`ClassId::Other`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "i32", into = "i32")]
        pub enum ClassId {
            $($name,)*
            Other(i32),
        }

        impl From<i32> for ClassId {
            fn from(value: i32) -> Self {
                match value {
                    $($value => Self::$name,)*
                    other => Self::Other(other),
                }
            }
        }

        impl From<ClassId> for i32 {
            fn from(value: ClassId) -> Self {
                match value {
                    $(ClassId::$name => $value,)*
                    ClassId::Other(other) => other,
                }
            }
        }

        impl ClassId {
            /// Name of a known kind, `None` for [`ClassId::Other`].
            pub fn name(self) -> Option<&'static str> {
                match self {
                    $(Self::$name => Some(stringify!($name)),)*
                    Self::Other(_) => None,
                }
            }
        }
    };
}

class_ids! {
    Object = 0,
    GameObject = 1,
    Component = 2,
    Transform = 4,
    Material = 21,
    MeshRenderer = 23,
    Texture2D = 28,
    MeshFilter = 33,
    Mesh = 43,
    Shader = 48,
    TextAsset = 49,
    AudioClip = 83,
    MonoBehaviour = 114,
    MonoScript = 115,
    SkinnedMeshRenderer = 137,
    AssetBundle = 142,
    ResourceManager = 147,
    PreloadData = 150,
    Sprite = 213,
    RectTransform = 224,
    SpriteAtlas = 687078895,
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "ClassId({})", i32::from(*self)),
        }
    }
}
