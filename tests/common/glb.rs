//! Builds a small binary glTF in memory.
//!
//! Layout: node "body" (one triangle) with child "label" (two triangles
//! sharing the vertex data, the second without material). The material
//! samples an embedded PNG as base colour.

use std::io::Cursor;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

fn png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([40, 40, 48, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn pad(bytes: &mut Vec<u8>, with: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(with);
    }
}

fn bin_chunk() -> (Vec<u8>, usize) {
    let mut bin = Vec::new();
    for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        p.iter().for_each(|c| bin.extend_from_slice(&c.to_le_bytes()));
    }
    for i in [0u16, 1, 2] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    pad(&mut bin, 0);
    let png = png();
    let png_len = png.len();
    bin.extend(png);
    (bin, png_len)
}

fn json(bin_len: usize, png_len: usize) -> String {
    format!(
        r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"name": "Scene", "nodes": [0]}}],
  "nodes": [
    {{"name": "body", "mesh": 0, "children": [1]}},
    {{"name": "label", "mesh": 1, "translation": [0.0, 0.1, 0.0]}}
  ],
  "meshes": [
    {{"name": "body", "primitives": [
      {{"attributes": {{"POSITION": 0}}, "indices": 1, "material": 0}}
    ]}},
    {{"name": "label", "primitives": [
      {{"attributes": {{"POSITION": 0}}, "indices": 1, "material": 0}},
      {{"attributes": {{"POSITION": 0}}, "indices": 1}}
    ]}}
  ],
  "materials": [{{
    "name": "floppy",
    "pbrMetallicRoughness": {{
      "baseColorFactor": [1.0, 1.0, 1.0, 1.0],
      "baseColorTexture": {{"index": 0}},
      "metallicFactor": 0.5
    }}
  }}],
  "textures": [{{"source": 0}}],
  "images": [{{"bufferView": 2, "mimeType": "image/png"}}],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
    {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}}
  ],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963}},
    {{"buffer": 0, "byteOffset": 44, "byteLength": {png_len}}}
  ],
  "buffers": [{{"byteLength": {bin_len}}}]
}}"#
    )
}

/// The floppy stand-in as GLB bytes.
pub fn floppy() -> Vec<u8> {
    let (mut bin, png_len) = bin_chunk();
    let bin_len = bin.len();
    pad(&mut bin, 0);

    let mut json = json(bin_len, png_len).into_bytes();
    pad(&mut json, b' ');

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(GLB_MAGIC);
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend(json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
    glb.extend(bin);
    glb
}
