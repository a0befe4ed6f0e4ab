use std::env;

use assetkit::{AssetCollection, ClassId, Result, TextureDecoder};

fn main() -> Result<()> {
    let mut assets = AssetCollection::new();
    for path in env::args().skip(1) {
        assets.load_file(&path)?;
    }

    let decoder = TextureDecoder::new();
    for file in assets.files() {
        println!("{} ({}, {} objects)", file.name, file.version(), file.object_count());
        for object in file.objects() {
            let name = object.name().unwrap_or("-");
            println!("  {:>20} {:<16} {name}", object.path_id(), object.class_id().to_string());
            if object.class_id() == ClassId::Texture2D {
                match assets.decode_texture(object, &decoder)? {
                    Some(rgba) => println!("  {:>20} decoded {} bytes", "", rgba.len()),
                    None => println!("  {:>20} not decodable", ""),
                }
            }
        }
    }

    Ok(())
}
