//! PBR material records and their resolution from raw material properties.

use lumen_core::Color;
use tracing::warn;

use crate::source::{MaterialKey, MaterialSource, TextureKind};
use crate::texture_resolver::TextureResolver;

/// Lowest roughness handed to the renderer; smaller values make the
/// specular lobe degenerate.
pub const MIN_ROUGHNESS: f32 = 0.04;

/// Path fragment identifying a combined metallic-roughness map among
/// untyped textures.
pub const METALLIC_ROUGHNESS_MARKER: &str = "metallicRoughness";

/// Texture slots of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Albedo,
    Normal,
    Metallic,
    Roughness,
    MetallicRoughness,
    AmbientOcclusion,
    Emissive,
    Specular,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 8] = [
        TextureSlot::Albedo,
        TextureSlot::Normal,
        TextureSlot::Metallic,
        TextureSlot::Roughness,
        TextureSlot::MetallicRoughness,
        TextureSlot::AmbientOcclusion,
        TextureSlot::Emissive,
        TextureSlot::Specular,
    ];
}

/// Indices into the owning model's texture list, one per slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureSlots {
    pub albedo: Option<usize>,
    pub normal: Option<usize>,
    pub metallic: Option<usize>,
    pub roughness: Option<usize>,
    pub metallic_roughness: Option<usize>,
    pub ambient_occlusion: Option<usize>,
    pub emissive: Option<usize>,
    pub specular: Option<usize>,
}

impl TextureSlots {
    pub fn get(&self, slot: TextureSlot) -> Option<usize> {
        match slot {
            TextureSlot::Albedo => self.albedo,
            TextureSlot::Normal => self.normal,
            TextureSlot::Metallic => self.metallic,
            TextureSlot::Roughness => self.roughness,
            TextureSlot::MetallicRoughness => self.metallic_roughness,
            TextureSlot::AmbientOcclusion => self.ambient_occlusion,
            TextureSlot::Emissive => self.emissive,
            TextureSlot::Specular => self.specular,
        }
    }

    /// Iterate over the slots that hold a texture.
    pub fn iter(&self) -> impl Iterator<Item = (TextureSlot, usize)> + '_ {
        TextureSlot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|index| (slot, index)))
    }
}

/// A resolved PBR material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    pub name: String,
    pub albedo: Color,
    /// In [0, 1].
    pub metallic: f32,
    /// At least [`MIN_ROUGHNESS`].
    pub roughness: f32,
    pub emissive: Color,
    pub emissive_strength: f32,
    /// Phong specular tint.
    pub specular: Color,
    pub ambient: Color,
    /// In [0, 1].
    pub opacity: f32,
    pub double_sided: bool,
    pub textures: TextureSlots,
}

impl Default for MaterialRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            albedo: Color::WHITE,
            metallic: 0.0,
            roughness: 1.0,
            emissive: Color::BLACK,
            emissive_strength: 1.0,
            specular: Color::WHITE,
            ambient: Color::rgb(0.1, 0.1, 0.1),
            opacity: 1.0,
            double_sided: false,
            textures: TextureSlots::default(),
        }
    }
}

/// Build a [`MaterialRecord`] from a raw material, resolving its textures
/// into the model's texture list.
pub fn resolve_material(
    material: &dyn MaterialSource,
    textures: &mut TextureResolver<'_>,
) -> MaterialRecord {
    let defaults = MaterialRecord::default();

    let metallic = material
        .scalar(MaterialKey::MetallicFactor)
        .or_else(|| material.scalar(MaterialKey::Reflectivity))
        .unwrap_or(defaults.metallic);

    let roughness = material
        .scalar(MaterialKey::RoughnessFactor)
        .or_else(|| {
            material
                .scalar(MaterialKey::Shininess)
                .map(|shininess| 1.0 - shininess / 100.0)
        })
        .unwrap_or(defaults.roughness);

    let name = material.text(MaterialKey::Name).unwrap_or_default().to_string();

    MaterialRecord {
        albedo: material
            .color(MaterialKey::DiffuseColor)
            .map(Color::from_array)
            .unwrap_or(defaults.albedo),
        metallic: metallic.clamp(0.0, 1.0),
        roughness: roughness.max(MIN_ROUGHNESS),
        emissive: material
            .color(MaterialKey::EmissiveColor)
            .map(Color::from_array)
            .unwrap_or(defaults.emissive),
        emissive_strength: material
            .scalar(MaterialKey::EmissiveIntensity)
            .unwrap_or(defaults.emissive_strength),
        specular: material
            .color(MaterialKey::SpecularColor)
            .map(Color::from_array)
            .unwrap_or(defaults.specular),
        ambient: material
            .color(MaterialKey::AmbientColor)
            .map(Color::from_array)
            .unwrap_or(defaults.ambient),
        opacity: material
            .scalar(MaterialKey::Opacity)
            .unwrap_or(defaults.opacity)
            .clamp(0.0, 1.0),
        double_sided: material
            .flag(MaterialKey::TwoSided)
            .unwrap_or(defaults.double_sided),
        textures: resolve_slots(&name, material, textures),
        name,
    }
}

fn resolve_slots(
    name: &str,
    material: &dyn MaterialSource,
    textures: &mut TextureResolver<'_>,
) -> TextureSlots {
    let mut probe = |kinds: &[TextureKind]| -> Option<usize> {
        kinds.iter().find_map(|&kind| {
            let reference = material.texture(kind)?;
            load_slot(name, reference, kind, textures)
        })
    };

    let albedo = probe(&[TextureKind::Diffuse, TextureKind::BaseColor]);
    let normal = probe(&[TextureKind::Normal, TextureKind::Height]);
    let metallic = probe(&[TextureKind::Metalness]);
    let roughness = probe(&[TextureKind::Roughness]);
    let ambient_occlusion = probe(&[TextureKind::AmbientOcclusion, TextureKind::Lightmap]);
    let emissive = probe(&[TextureKind::Emissive]);
    let specular = probe(&[TextureKind::Specular]);

    // Combined maps arrive untyped; only the file name tells them apart.
    let metallic_roughness = material
        .texture(TextureKind::Unknown)
        .filter(|reference| reference.contains(METALLIC_ROUGHNESS_MARKER))
        .and_then(|reference| {
            load_slot(name, reference, TextureKind::MetallicRoughness, textures)
        });

    TextureSlots {
        albedo,
        normal,
        metallic,
        roughness,
        metallic_roughness,
        ambient_occlusion,
        emissive,
        specular,
    }
}

fn load_slot(
    material: &str,
    reference: &str,
    kind: TextureKind,
    textures: &mut TextureResolver<'_>,
) -> Option<usize> {
    match textures.resolve(reference, kind) {
        Ok(index) => Some(index),
        Err(e) => {
            warn!(
                "Material '{}': skipping {} texture: {}",
                material,
                kind.label(),
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TextureCache;
    use crate::source::{EmbeddedTexture, PropertyValue, RawMaterial};
    use std::path::Path;
    use std::sync::Arc;

    use approx::assert_relative_eq;

    fn resolve(material: &RawMaterial) -> MaterialRecord {
        let cache = TextureCache::new();
        let mut textures = Vec::new();
        let mut resolver =
            TextureResolver::new(Path::new("/assets"), &cache, &[], &mut textures)
                .require_files(false);
        resolve_material(material, &mut resolver)
    }

    #[test]
    fn empty_material_uses_defaults() {
        let record = resolve(&RawMaterial::new());
        assert_eq!(record, MaterialRecord::default());
        assert_eq!(record.textures.iter().count(), 0);
    }

    #[test]
    fn explicit_factors_are_used() {
        let record = resolve(
            &RawMaterial::new()
                .with(MaterialKey::Name, PropertyValue::Text("brass".into()))
                .with(MaterialKey::DiffuseColor, PropertyValue::Color([0.8, 0.6, 0.2, 1.0]))
                .with(MaterialKey::MetallicFactor, PropertyValue::Float(0.9))
                .with(MaterialKey::Reflectivity, PropertyValue::Float(0.1))
                .with(MaterialKey::RoughnessFactor, PropertyValue::Float(0.3))
                .with(MaterialKey::Shininess, PropertyValue::Float(90.0))
                .with(MaterialKey::EmissiveColor, PropertyValue::Color([1.0, 0.5, 0.0, 1.0]))
                .with(MaterialKey::EmissiveIntensity, PropertyValue::Float(4.0))
                .with(MaterialKey::Opacity, PropertyValue::Float(0.5))
                .with(MaterialKey::TwoSided, PropertyValue::Bool(true)),
        );

        assert_eq!(record.name, "brass");
        assert_eq!(record.albedo, Color::rgba(0.8, 0.6, 0.2, 1.0));
        assert_relative_eq!(record.metallic, 0.9);
        assert_relative_eq!(record.roughness, 0.3);
        assert_eq!(record.emissive, Color::rgb(1.0, 0.5, 0.0));
        assert_relative_eq!(record.emissive_strength, 4.0);
        assert_relative_eq!(record.opacity, 0.5);
        assert!(record.double_sided);
    }

    #[test]
    fn phong_colors_default_to_white_and_grey() {
        let record = resolve(&RawMaterial::new());
        assert_eq!(record.specular, Color::WHITE);
        assert_eq!(record.ambient, Color::rgb(0.1, 0.1, 0.1));
    }

    #[test]
    fn phong_colors_and_specular_map_are_read() {
        let record = resolve(
            &RawMaterial::new()
                .with(MaterialKey::SpecularColor, PropertyValue::Color([0.5, 0.4, 0.3, 1.0]))
                .with(MaterialKey::AmbientColor, PropertyValue::Color([0.2, 0.2, 0.25, 1.0]))
                .with_texture(TextureKind::Diffuse, "wood.png")
                .with_texture(TextureKind::Specular, "wood_spec.png"),
        );

        assert_eq!(record.specular, Color::rgb(0.5, 0.4, 0.3));
        assert_eq!(record.ambient, Color::rgb(0.2, 0.2, 0.25));
        assert_eq!(record.textures.specular, Some(1));
        assert_eq!(
            record.textures.iter().last(),
            Some((TextureSlot::Specular, 1))
        );
    }

    #[test]
    fn reflectivity_stands_in_for_metallic() {
        let record =
            resolve(&RawMaterial::new().with(MaterialKey::Reflectivity, PropertyValue::Float(0.25)));
        assert_relative_eq!(record.metallic, 0.25);
    }

    #[test]
    fn roughness_derived_from_shininess() {
        let record =
            resolve(&RawMaterial::new().with(MaterialKey::Shininess, PropertyValue::Float(25.0)));
        assert_relative_eq!(record.roughness, 0.75);
    }

    #[test]
    fn roughness_never_below_floor() {
        let inputs = [
            (MaterialKey::RoughnessFactor, 0.0),
            (MaterialKey::RoughnessFactor, -2.0),
            (MaterialKey::Shininess, 100.0),
            (MaterialKey::Shininess, 500.0),
            (MaterialKey::Shininess, 0.0),
            (MaterialKey::Shininess, -50.0),
        ];
        for (key, value) in inputs {
            let record = resolve(&RawMaterial::new().with(key, PropertyValue::Float(value)));
            assert!(
                record.roughness >= MIN_ROUGHNESS,
                "{:?} = {} gave roughness {}",
                key,
                value,
                record.roughness
            );
        }
    }

    #[test]
    fn factors_are_clamped() {
        let record = resolve(
            &RawMaterial::new()
                .with(MaterialKey::MetallicFactor, PropertyValue::Float(3.0))
                .with(MaterialKey::Opacity, PropertyValue::Float(-1.0)),
        );
        assert_eq!(record.metallic, 1.0);
        assert_eq!(record.opacity, 0.0);
    }

    #[test]
    fn texture_slot_fallbacks() {
        let record = resolve(
            &RawMaterial::new()
                .with_texture(TextureKind::BaseColor, "base.png")
                .with_texture(TextureKind::Height, "bump.png")
                .with_texture(TextureKind::Lightmap, "light.png"),
        );
        assert_eq!(record.textures.albedo, Some(0));
        assert_eq!(record.textures.normal, Some(1));
        assert_eq!(record.textures.ambient_occlusion, Some(2));
        assert_eq!(record.textures.metallic, None);
    }

    #[test]
    fn diffuse_preferred_over_base_color() {
        let cache = TextureCache::new();
        let mut textures = Vec::new();
        let mut resolver = TextureResolver::new(Path::new("/assets"), &cache, &[], &mut textures)
            .require_files(false);
        let record = resolve_material(
            &RawMaterial::new()
                .with_texture(TextureKind::BaseColor, "base.png")
                .with_texture(TextureKind::Diffuse, "diffuse.png"),
            &mut resolver,
        );
        drop(resolver);

        let albedo = record.textures.albedo.unwrap();
        assert_eq!(textures[albedo].path(), Some(Path::new("/assets/diffuse.png")));
        assert_eq!(textures.len(), 1);
    }

    #[test]
    fn metallic_roughness_needs_marker_in_path() {
        let with_marker = resolve(
            &RawMaterial::new().with_texture(TextureKind::Unknown, "Helmet_metallicRoughness.png"),
        );
        assert_eq!(with_marker.textures.metallic_roughness, Some(0));

        let without_marker =
            resolve(&RawMaterial::new().with_texture(TextureKind::Unknown, "Helmet_orm.png"));
        assert_eq!(without_marker.textures.metallic_roughness, None);
    }

    #[test]
    fn missing_texture_leaves_slot_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TextureCache::new();
        let mut textures = Vec::new();
        let mut resolver = TextureResolver::new(dir.path(), &cache, &[], &mut textures);

        let record = resolve_material(
            &RawMaterial::new()
                .with_texture(TextureKind::Diffuse, "missing.png")
                .with_texture(TextureKind::Normal, "*0"),
            &mut resolver,
        );

        assert_eq!(record.textures, TextureSlots::default());
    }

    #[test]
    fn embedded_textures_fill_slots() {
        let embedded = vec![
            EmbeddedTexture::Compressed {
                data: vec![1, 2, 3],
                format_hint: "png".into(),
            },
            EmbeddedTexture::Uncompressed {
                width: 1,
                height: 1,
                texels: vec![255; 4],
            },
        ];
        let cache = TextureCache::new();
        let mut textures: Vec<Arc<_>> = Vec::new();
        let mut resolver =
            TextureResolver::new(Path::new("/assets"), &cache, &embedded, &mut textures);

        let record = resolve_material(
            &RawMaterial::new()
                .with_texture(TextureKind::Emissive, "*1")
                .with_texture(TextureKind::Diffuse, "*0"),
            &mut resolver,
        );
        drop(resolver);

        // Albedo is probed before emissive, so it lands first.
        assert_eq!(record.textures.albedo, Some(0));
        assert_eq!(record.textures.emissive, Some(1));
        assert_eq!(textures[0].kind, TextureKind::Diffuse);
        assert_eq!(textures[1].kind, TextureKind::Emissive);
        assert!(cache.is_empty());
    }
}
