//! Files written to temporary directories by tests.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;

/// External image referenced by the triangle scene's base color.
pub const ALBEDO_FILE: &str = "albedo.png";

/// A 2x2 PNG.
pub fn png_bytes() -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 100, 50, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

pub fn write_albedo(dir: &Path) -> PathBuf {
    let path = dir.join(ALBEDO_FILE);
    std::fs::write(&path, png_bytes()).unwrap();
    path
}

/// Write `triangle.gltf` into `dir`.
///
/// Node 0 ("parent") translates by (5, 0, 0) and holds node 1 ("child"),
/// which draws one unit triangle in the z = 0 plane with UVs. The material
/// samples `albedo.png` for base color and an embedded PNG for emission,
/// and tints specular through `KHR_materials_specular`.
pub fn write_triangle_gltf(dir: &Path) -> PathBuf {
    let mut buffer = Vec::new();
    for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        buffer.extend_from_slice(&value.to_le_bytes());
    }
    for value in [0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0] {
        buffer.extend_from_slice(&value.to_le_bytes());
    }
    for index in [0u16, 1, 2] {
        buffer.extend_from_slice(&index.to_le_bytes());
    }

    let engine = base64::engine::general_purpose::STANDARD;
    let json = format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "extensionsUsed": ["KHR_materials_specular"],
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [
    {{ "name": "parent", "translation": [5.0, 0.0, 0.0], "children": [1] }},
    {{ "name": "child", "mesh": 0 }}
  ],
  "meshes": [{{
    "name": "triangle",
    "primitives": [{{
      "attributes": {{ "POSITION": 0, "TEXCOORD_0": 1 }},
      "indices": 2,
      "material": 0
    }}]
  }}],
  "materials": [{{
    "name": "painted",
    "pbrMetallicRoughness": {{
      "baseColorFactor": [1.0, 0.5, 0.25, 1.0],
      "metallicFactor": 0.25,
      "roughnessFactor": 0.5,
      "baseColorTexture": {{ "index": 0 }}
    }},
    "emissiveTexture": {{ "index": 1 }},
    "extensions": {{
      "KHR_materials_specular": {{ "specularColorFactor": [0.5, 0.25, 0.125] }}
    }},
    "doubleSided": true
  }}],
  "textures": [{{ "source": 0 }}, {{ "source": 1 }}],
  "images": [
    {{ "uri": "{albedo}" }},
    {{ "uri": "data:image/png;base64,{image}" }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
       "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" }},
    {{ "bufferView": 2, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 24 }},
    {{ "buffer": 0, "byteOffset": 60, "byteLength": 6 }}
  ],
  "buffers": [{{
    "byteLength": {length},
    "uri": "data:application/octet-stream;base64,{data}"
  }}]
}}"#,
        albedo = ALBEDO_FILE,
        image = engine.encode(png_bytes()),
        length = buffer.len(),
        data = engine.encode(&buffer),
    );

    let path = dir.join("triangle.gltf");
    std::fs::write(&path, json).unwrap();
    path
}
