use glam::{Vec3, Vec4};

/// Alpha cutoff applied to `MASK` materials that do not declare one.
pub const DEFAULT_MASK_CUTOFF: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Workflow {
    #[default]
    MetallicRoughness,
    SpecularGlossiness,
}

/// Reference to one of the model's textures plus the UV set it samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureRef {
    pub texture: usize,
    pub tex_coord: u32,
}

impl TextureRef {
    fn from_info(info: &gltf::texture::Info<'_>) -> Self {
        Self {
            texture: info.texture().index(),
            tex_coord: info.tex_coord(),
        }
    }
}

/// Parameters of `KHR_materials_pbrSpecularGlossiness`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpecularGlossiness {
    pub specular_glossiness_texture: Option<TextureRef>,
    pub diffuse_texture: Option<TextureRef>,
    pub diffuse_factor: Vec4,
    pub specular_factor: Vec3,
}

impl Default for SpecularGlossiness {
    fn default() -> Self {
        Self {
            specular_glossiness_texture: None,
            diffuse_texture: None,
            diffuse_factor: Vec4::ONE,
            specular_factor: Vec3::ZERO,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Source material index; `None` for the synthetic default material.
    pub index: Option<usize>,
    pub name: String,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub base_color_factor: Vec4,
    pub emissive_factor: Vec4,
    pub base_color_texture: Option<TextureRef>,
    pub metallic_roughness_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
    pub occlusion_texture: Option<TextureRef>,
    pub emissive_texture: Option<TextureRef>,
    pub specular_glossiness: SpecularGlossiness,
    pub workflow: Workflow,
    pub unlit: bool,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            index: None,
            name: "default".to_string(),
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 1.0,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            base_color_factor: Vec4::ONE,
            emissive_factor: Vec4::new(0.0, 0.0, 0.0, 1.0),
            base_color_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
            specular_glossiness: SpecularGlossiness::default(),
            workflow: Workflow::MetallicRoughness,
            unlit: false,
            double_sided: false,
        }
    }
}

impl Material {
    pub fn from_gltf(material: &gltf::Material<'_>) -> Self {
        let pbr = material.pbr_metallic_roughness();
        let mut out = Material {
            index: material.index(),
            name: material
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0))),
            metallic_factor: pbr.metallic_factor(),
            roughness_factor: pbr.roughness_factor(),
            base_color_factor: Vec4::from_array(pbr.base_color_factor()),
            emissive_factor: Vec3::from_array(material.emissive_factor()).extend(1.0),
            base_color_texture: pbr.base_color_texture().as_ref().map(TextureRef::from_info),
            metallic_roughness_texture: pbr
                .metallic_roughness_texture()
                .as_ref()
                .map(TextureRef::from_info),
            normal_texture: material.normal_texture().map(|t| TextureRef {
                texture: t.texture().index(),
                tex_coord: t.tex_coord(),
            }),
            occlusion_texture: material.occlusion_texture().map(|t| TextureRef {
                texture: t.texture().index(),
                tex_coord: t.tex_coord(),
            }),
            emissive_texture: material.emissive_texture().as_ref().map(TextureRef::from_info),
            unlit: material.unlit(),
            double_sided: material.double_sided(),
            ..Material::default()
        };

        match material.alpha_mode() {
            gltf::material::AlphaMode::Opaque => {}
            gltf::material::AlphaMode::Mask => {
                out.alpha_mode = AlphaMode::Mask;
                out.alpha_cutoff = DEFAULT_MASK_CUTOFF;
            }
            gltf::material::AlphaMode::Blend => out.alpha_mode = AlphaMode::Blend,
        }
        if let Some(cutoff) = material.alpha_cutoff() {
            out.alpha_cutoff = cutoff;
        }

        if let Some(sg) = material.pbr_specular_glossiness() {
            if let Some(info) = sg.specular_glossiness_texture() {
                out.specular_glossiness.specular_glossiness_texture = Some(TextureRef::from_info(&info));
                out.workflow = Workflow::SpecularGlossiness;
            }
            out.specular_glossiness.diffuse_texture = sg.diffuse_texture().as_ref().map(TextureRef::from_info);
            out.specular_glossiness.diffuse_factor = Vec4::from_array(sg.diffuse_factor());
            out.specular_glossiness.specular_factor = Vec3::from_array(sg.specular_factor());
        }

        out
    }
}

/// Resolves every material of the document and appends the default material
/// last, so that it is always present and never shadows a real index.
pub fn load_materials(document: &gltf::Document) -> Vec<Material> {
    let mut materials: Vec<Material> = document
        .materials()
        .map(|material| Material::from_gltf(&material))
        .collect();
    materials.push(Material::default());
    materials
}
