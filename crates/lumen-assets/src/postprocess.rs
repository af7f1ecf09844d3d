//! Geometry post-processing applied by importers that read raw file data.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use crate::source::RawMesh;

/// Expand a triangle strip into a list, keeping a consistent winding.
pub fn strip_to_triangles(strip: &[u32]) -> Vec<Vec<u32>> {
    strip
        .windows(3)
        .enumerate()
        .map(|(i, w)| {
            if i % 2 == 0 {
                vec![w[0], w[1], w[2]]
            } else {
                vec![w[1], w[0], w[2]]
            }
        })
        .collect()
}

/// Expand a triangle fan into a list.
pub fn fan_to_triangles(fan: &[u32]) -> Vec<Vec<u32>> {
    match fan.split_first() {
        Some((&center, rest)) => rest.windows(2).map(|w| vec![center, w[0], w[1]]).collect(),
        None => Vec::new(),
    }
}

/// `v = 1 - v` for every texture coordinate.
pub fn flip_uvs(mesh: &mut RawMesh) {
    if let Some(tex_coords) = &mut mesh.tex_coords {
        for uv in tex_coords.iter_mut() {
            uv[1] = 1.0 - uv[1];
        }
    }
}

fn triangles(mesh: &RawMesh) -> impl Iterator<Item = [usize; 3]> + '_ {
    let count = mesh.positions.len();
    mesh.faces
        .iter()
        .filter(|face| face.len() == 3)
        .map(|face| [face[0] as usize, face[1] as usize, face[2] as usize])
        .filter(move |tri| tri.iter().all(|&i| i < count))
}

/// Area-weighted smooth normals, for meshes that have none.
pub fn generate_smooth_normals(mesh: &mut RawMesh) {
    if mesh.normals.is_some() {
        return;
    }

    let positions: Vec<Vec3> = mesh.positions.iter().map(|p| Vec3::from_array(*p)).collect();
    let mut accumulated = vec![Vec3::ZERO; positions.len()];

    for [a, b, c] in triangles(mesh) {
        let face_normal = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        accumulated[a] += face_normal;
        accumulated[b] += face_normal;
        accumulated[c] += face_normal;
    }

    mesh.normals = Some(
        accumulated
            .into_iter()
            .map(|n| n.normalize_or_zero().to_array())
            .collect(),
    );
}

/// Derive bitangents from glTF-style tangents whose `w` holds handedness.
pub fn bitangents_from_tangents(mesh: &mut RawMesh, tangents: &[[f32; 4]]) {
    let Some(normals) = &mesh.normals else {
        return;
    };

    let (tangent_out, bitangent_out): (Vec<_>, Vec<_>) = tangents
        .iter()
        .zip(normals)
        .map(|(t, n)| {
            let tangent = Vec3::new(t[0], t[1], t[2]);
            let bitangent = Vec3::from_array(*n).cross(tangent) * t[3];
            (tangent.to_array(), bitangent.to_array())
        })
        .unzip();

    mesh.tangents = Some(tangent_out);
    mesh.bitangents = Some(bitangent_out);
}

/// Per-vertex tangent frames from positions, normals and UVs.
///
/// Leaves the mesh untouched when normals or UVs are missing.
pub fn calc_tangent_space(mesh: &mut RawMesh) {
    let (Some(normals), Some(uvs)) = (&mesh.normals, &mesh.tex_coords) else {
        return;
    };
    if normals.len() != mesh.positions.len() || uvs.len() != mesh.positions.len() {
        return;
    }

    let positions: Vec<Vec3> = mesh.positions.iter().map(|p| Vec3::from_array(*p)).collect();
    let uvs: Vec<Vec2> = uvs.iter().map(|uv| Vec2::from_array(*uv)).collect();
    let mut tan = vec![Vec3::ZERO; positions.len()];
    let mut bitan = vec![Vec3::ZERO; positions.len()];

    for [a, b, c] in triangles(mesh) {
        let edge1 = positions[b] - positions[a];
        let edge2 = positions[c] - positions[a];
        let duv1 = uvs[b] - uvs[a];
        let duv2 = uvs[c] - uvs[a];

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let t = (edge1 * duv2.y - edge2 * duv1.y) * r;
        let s = (edge2 * duv1.x - edge1 * duv2.x) * r;

        for i in [a, b, c] {
            tan[i] += t;
            bitan[i] += s;
        }
    }

    let (tangents, bitangents): (Vec<_>, Vec<_>) = normals
        .iter()
        .zip(tan.iter().zip(&bitan))
        .map(|(n, (t, s))| {
            let n = Vec3::from_array(*n);
            // Gram-Schmidt against the normal, then pick handedness.
            let tangent = (*t - n * n.dot(*t)).normalize_or_zero();
            let mut bitangent = n.cross(tangent);
            if bitangent.dot(*s) < 0.0 {
                bitangent = -bitangent;
            }
            (tangent.to_array(), bitangent.to_array())
        })
        .unzip();

    mesh.tangents = Some(tangents);
    mesh.bitangents = Some(bitangents);
}

/// Merge vertices whose attributes are bit-identical and rewrite faces.
pub fn join_identical_vertices(mesh: &mut RawMesh) {
    let count = mesh.positions.len();
    let mut remap = Vec::with_capacity(count);
    let mut unique: HashMap<Vec<u32>, u32> = HashMap::new();
    let mut kept = Vec::new();

    for i in 0..count {
        let key = vertex_key(mesh, i);
        let next = kept.len() as u32;
        let index = *unique.entry(key).or_insert_with(|| {
            kept.push(i);
            next
        });
        remap.push(index);
    }

    if kept.len() == count {
        return;
    }

    fn gather<T: Copy>(channel: &mut Option<Vec<T>>, kept: &[usize]) {
        if let Some(values) = channel {
            *values = kept.iter().filter_map(|&i| values.get(i).copied()).collect();
        }
    }

    mesh.positions = kept.iter().map(|&i| mesh.positions[i]).collect();
    gather(&mut mesh.normals, &kept);
    gather(&mut mesh.tex_coords, &kept);
    gather(&mut mesh.tangents, &kept);
    gather(&mut mesh.bitangents, &kept);
    gather(&mut mesh.colors, &kept);

    for face in &mut mesh.faces {
        for index in face.iter_mut() {
            if let Some(&mapped) = remap.get(*index as usize) {
                *index = mapped;
            }
        }
    }
}

fn vertex_key(mesh: &RawMesh, i: usize) -> Vec<u32> {
    let mut key: Vec<u32> = mesh.positions[i].iter().map(|f| f.to_bits()).collect();
    let mut push = |values: Option<&[f32]>| {
        if let Some(values) = values {
            key.extend(values.iter().map(|f| f.to_bits()));
        }
    };
    push(mesh.normals.as_ref().and_then(|v| v.get(i)).map(|a| a.as_slice()));
    push(mesh.tex_coords.as_ref().and_then(|v| v.get(i)).map(|a| a.as_slice()));
    push(mesh.tangents.as_ref().and_then(|v| v.get(i)).map(|a| a.as_slice()));
    push(mesh.bitangents.as_ref().and_then(|v| v.get(i)).map(|a| a.as_slice()));
    push(mesh.colors.as_ref().and_then(|v| v.get(i)).map(|a| a.as_slice()));
    key
}
