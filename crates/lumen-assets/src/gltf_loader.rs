use std::ops::Range;
use std::path::Path;

use base64::Engine;
use glam::Mat4;
use gltf::mesh::Mode;
use tracing::{debug, warn};

use crate::config::PostProcess;
use crate::error::AssetError;
use crate::importer::SceneImporter;
use crate::postprocess;
use crate::source::{
    EmbeddedTexture, MaterialKey, PropertyValue, RawMaterial, RawMesh, RawNode, RawScene,
    TextureKind, EMBEDDED_TEXTURE_MARKER,
};

/// Scene importer for glTF 2.0 files (.gltf or .glb).
///
/// Each mesh primitive becomes one raw mesh. The root nodes of the default
/// scene are gathered under a synthetic identity root. Images stored in
/// buffers or `data:` URIs become embedded textures; other image URIs are
/// passed through as external references.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfImporter;

impl GltfImporter {
    pub fn new() -> Self {
        Self
    }
}

impl SceneImporter for GltfImporter {
    fn import(&self, path: &Path, flags: &PostProcess) -> Result<RawScene, AssetError> {
        let fail = |message: String| AssetError::ImportFailed(path.to_path_buf(), message);

        let gltf::Gltf { document, blob } =
            gltf::Gltf::open(path).map_err(|e| fail(e.to_string()))?;
        let buffers = gltf::import_buffers(&document, path.parent(), blob)
            .map_err(|e| fail(e.to_string()))?;

        log_unsupported(flags);

        let (embedded_textures, image_refs) = read_images(&document, &buffers);

        let mut meshes = Vec::new();
        let mut mesh_ranges = Vec::new();
        for mesh in document.meshes() {
            let start = meshes.len();
            let primitive_count = mesh.primitives().len();
            let base_name = mesh
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("mesh{}", mesh.index()));

            for primitive in mesh.primitives() {
                let name = if primitive_count > 1 {
                    format!("{}-{}", base_name, primitive.index())
                } else {
                    base_name.clone()
                };
                meshes.push(read_primitive(name, &primitive, &buffers, flags));
            }
            mesh_ranges.push(start..meshes.len());
        }

        let materials = document
            .materials()
            .map(|material| read_material(&material, &image_refs))
            .collect();

        let mut nodes: Vec<RawNode> = document
            .nodes()
            .map(|node| read_node(&node, &mesh_ranges))
            .collect();

        let scene = document.default_scene().or_else(|| document.scenes().next());
        let root = scene.map(|scene| {
            nodes.push(
                RawNode::new(scene.name().unwrap_or("root"))
                    .with_children(scene.nodes().map(|node| node.index())),
            );
            nodes.len() - 1
        });

        debug!(
            "glTF '{}': {} nodes, {} meshes, {} materials, {} embedded textures",
            path.display(),
            nodes.len(),
            meshes.len(),
            document.materials().len(),
            embedded_textures.len()
        );

        Ok(RawScene {
            nodes,
            root,
            meshes,
            materials,
            embedded_textures,
            incomplete: false,
        })
    }
}

fn log_unsupported(flags: &PostProcess) {
    let unsupported = [
        ("optimize_meshes", flags.optimize_meshes),
        ("optimize_graph", flags.optimize_graph),
        ("fix_infacing_normals", flags.fix_infacing_normals),
        ("gen_bounding_boxes", flags.gen_bounding_boxes),
    ];
    for (step, _) in unsupported.iter().filter(|(_, requested)| *requested) {
        debug!("glTF importer does not apply post-process step '{}'", step);
    }
}

fn read_node(node: &gltf::Node<'_>, mesh_ranges: &[Range<usize>]) -> RawNode {
    let meshes = node
        .mesh()
        .and_then(|mesh| mesh_ranges.get(mesh.index()).cloned())
        .into_iter()
        .flatten();

    RawNode::new(node.name().unwrap_or_default())
        .with_transform(Mat4::from_cols_array_2d(&node.transform().matrix()))
        .with_meshes(meshes)
        .with_children(node.children().map(|child| child.index()))
}

fn read_primitive(
    name: String,
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
    flags: &PostProcess,
) -> RawMesh {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|iter| iter.collect())
        .unwrap_or_default();
    if positions.is_empty() {
        warn!("Mesh '{}' has no positions", name);
    }

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|idx| idx.into_u32().collect())
        .unwrap_or_else(|| (0..positions.len() as u32).collect());

    let mut mesh = RawMesh {
        faces: faces(primitive.mode(), &indices, flags.triangulate),
        normals: reader.read_normals().map(|iter| iter.collect()),
        tex_coords: reader.read_tex_coords(0).map(|tc| tc.into_f32().collect()),
        colors: reader.read_colors(0).map(|c| c.into_rgba_f32().collect()),
        material_index: primitive.material().index(),
        positions,
        name,
        ..Default::default()
    };

    if flags.gen_smooth_normals {
        postprocess::generate_smooth_normals(&mut mesh);
    }

    let gltf_tangents: Option<Vec<[f32; 4]>> = reader.read_tangents().map(|iter| iter.collect());
    match gltf_tangents {
        Some(tangents) => postprocess::bitangents_from_tangents(&mut mesh, &tangents),
        None if flags.calc_tangent_space => postprocess::calc_tangent_space(&mut mesh),
        None => {}
    }

    if flags.flip_uvs {
        postprocess::flip_uvs(&mut mesh);
    }
    if flags.join_identical_vertices {
        postprocess::join_identical_vertices(&mut mesh);
    }

    mesh
}

fn faces(mode: Mode, indices: &[u32], triangulate: bool) -> Vec<Vec<u32>> {
    match mode {
        Mode::Triangles => indices.chunks_exact(3).map(<[u32]>::to_vec).collect(),
        Mode::TriangleStrip if triangulate => postprocess::strip_to_triangles(indices),
        Mode::TriangleFan if triangulate => postprocess::fan_to_triangles(indices),
        Mode::TriangleStrip | Mode::TriangleFan => vec![indices.to_vec()],
        Mode::Points => indices.iter().map(|&i| vec![i]).collect(),
        Mode::Lines => indices.chunks_exact(2).map(<[u32]>::to_vec).collect(),
        Mode::LineStrip => indices.windows(2).map(<[u32]>::to_vec).collect(),
        Mode::LineLoop => {
            let mut lines: Vec<Vec<u32>> = indices.windows(2).map(<[u32]>::to_vec).collect();
            if let (Some(&first), Some(&last)) = (indices.first(), indices.last()) {
                if indices.len() > 2 {
                    lines.push(vec![last, first]);
                }
            }
            lines
        }
    }
}

/// Collect embedded images and the texture reference of every image.
///
/// The returned references are indexed by glTF image index; `None` marks an
/// image whose data could not be read.
fn read_images(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> (Vec<EmbeddedTexture>, Vec<Option<String>>) {
    let mut embedded = Vec::new();
    let mut references = Vec::new();

    for image in document.images() {
        let data = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let start = view.offset();
                let bytes = buffers
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.0.get(start..start + view.length()));
                bytes.map(|bytes| (bytes.to_vec(), format_hint(mime_type)))
            }
            gltf::image::Source::Uri { uri, mime_type } => match uri.strip_prefix("data:") {
                Some(data_uri) => decode_data_uri(data_uri, mime_type),
                None => {
                    references.push(Some(uri.to_string()));
                    continue;
                }
            },
        };

        let reference = match data {
            Some((data, format_hint)) => {
                embedded.push(EmbeddedTexture::Compressed { data, format_hint });
                Some(format!("{}{}", EMBEDDED_TEXTURE_MARKER, embedded.len() - 1))
            }
            None => {
                warn!("Could not read data of image {}", image.index());
                None
            }
        };
        references.push(reference);
    }

    (embedded, references)
}

/// Decode the part of a `data:` URI after the scheme.
fn decode_data_uri(data_uri: &str, mime_type: Option<&str>) -> Option<(Vec<u8>, String)> {
    let (header, payload) = data_uri.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    let mime = mime_type.unwrap_or(media_type);
    Some((bytes, format_hint(mime)))
}

fn format_hint(mime_type: &str) -> String {
    match mime_type {
        "image/jpeg" => "jpg".to_string(),
        other => other.rsplit('/').next().unwrap_or(other).to_string(),
    }
}

fn read_material(material: &gltf::Material<'_>, image_refs: &[Option<String>]) -> RawMaterial {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();
    let [er, eg, eb] = material.emissive_factor();

    let mut raw = RawMaterial::new()
        .with(MaterialKey::DiffuseColor, PropertyValue::Color([r, g, b, a]))
        .with(MaterialKey::MetallicFactor, PropertyValue::Float(pbr.metallic_factor()))
        .with(MaterialKey::RoughnessFactor, PropertyValue::Float(pbr.roughness_factor()))
        .with(MaterialKey::EmissiveColor, PropertyValue::Color([er, eg, eb, 1.0]))
        .with(MaterialKey::Opacity, PropertyValue::Float(a))
        .with(MaterialKey::TwoSided, PropertyValue::Bool(material.double_sided()));

    if let Some(name) = material.name() {
        raw = raw.with(MaterialKey::Name, PropertyValue::Text(name.to_string()));
    }
    if let Some(strength) = material.emissive_strength() {
        raw = raw.with(MaterialKey::EmissiveIntensity, PropertyValue::Float(strength));
    }
    let specular = material.specular();
    if let Some(specular) = &specular {
        let [sr, sg, sb] = specular.specular_color_factor();
        raw = raw.with(MaterialKey::SpecularColor, PropertyValue::Color([sr, sg, sb, 1.0]));
    }

    let reference = |texture: gltf::Texture<'_>| -> Option<String> {
        image_refs.get(texture.source().index()).cloned().flatten()
    };

    let slots = [
        (TextureKind::BaseColor, pbr.base_color_texture().map(|info| info.texture())),
        (TextureKind::Normal, material.normal_texture().map(|info| info.texture())),
        // Combined metallic-roughness maps carry no dedicated role.
        (
            TextureKind::Unknown,
            pbr.metallic_roughness_texture().map(|info| info.texture()),
        ),
        (TextureKind::Lightmap, material.occlusion_texture().map(|info| info.texture())),
        (TextureKind::Emissive, material.emissive_texture().map(|info| info.texture())),
        (
            TextureKind::Specular,
            specular
                .as_ref()
                .and_then(|s| s.specular_color_texture().or_else(|| s.specular_texture()))
                .map(|info| info.texture()),
        ),
    ];

    for (kind, texture) in slots {
        if let Some(path) = texture.and_then(reference) {
            raw = raw.with_texture(kind, path);
        }
    }

    raw
}
