use bitflags::bitflags;
use mt_keys::Key;

bitflags! {
    /// Bit flags packed into [`Chunk2::param_flags`].
    #[derive(Default)]
    pub struct ParamFlags: u8 {
        const DEFAULT_FOR_BODY_TYPE = 1 << 0;
        const DEFAULT_THUMBNAIL_PART = 1 << 1;
        const ALLOW_FOR_RANDOM = 1 << 2;
        const SHOW_IN_UI = 1 << 3;
        const SHOW_IN_SIM_INFO_PANEL = 1 << 4;
        const SHOW_IN_CAS_DEMO = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preset {
    pub complete_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub category: u16,
    pub value: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LodAsset {
    pub sorting: i32,
    pub spec_level: i32,
    pub cast_shadow: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lod {
    pub level: u8,
    pub unused: u32,
    pub assets: Vec<LodAsset>,
    pub lod_keys: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Override {
    pub region: u8,
    pub layer_bits: u32,
}

impl Override {
    pub fn layer(&self) -> f32 {
        f32::from_bits(self.layer_bits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceKeyEntry {
    pub instance: u64,
    pub group: u32,
    pub type_id: u32,
}

impl ResourceKeyEntry {
    pub fn key(&self) -> Key {
        Key::new(self.type_id, self.group, self.instance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chunk1 {
    pub version: u32,
    pub data_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chunk2 {
    pub display_index_bits: u32,
    pub secondary_display_index: u16,
    pub prototype_id: u32,
    pub aural_material_hash: u32,
    pub param_flags: ParamFlags,
    pub exclude_part_flags: u64,
    pub exclude_modifier_region_flags: u32,
}

impl Chunk2 {
    pub fn display_index(&self) -> f32 {
        f32::from_bits(self.display_index_bits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chunk3 {
    pub simoleon_price: u32,
    pub part_title_key: u32,
    pub part_desc_key: u32,
    pub unique_texture_space: u8,
    pub body_type: i32,
    pub unused1: i32,
    pub age_gender: u32,
    pub unused2: u8,
    pub unused3: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chunk4 {
    pub buff_res_key: u8,
    pub variant_thumb_key: u8,
    pub voice_effect_hash: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chunk5 {
    pub naked_key: u8,
    pub parent_key: u8,
    pub sort_layer: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chunk6 {
    pub diffuse_key: u8,
    pub shadow_key: u8,
    pub composition_method: u8,
    pub region_map_key: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chunk7 {
    pub normal_map_key: u8,
    pub specular_map_key: u8,
    pub normal_uv_body_type: u32,
    pub emission_map_key: u8,
}

/// A fully decoded CAS Part resource. Every variable-length run (presets,
/// tags, swatch colors, ...) is counted implicitly by its `Vec`'s length;
/// the wire's explicit count fields are re-derived on write rather than
/// stored.
#[derive(Debug, Clone, Default)]
pub struct CasPart {
    pub chunk1: Chunk1,
    pub presets: Vec<Preset>,
    pub name: String,
    pub chunk2: Chunk2,
    pub tags: Vec<Tag>,
    pub chunk3: Chunk3,
    pub swatch_colors: Vec<u32>,
    pub chunk4: Chunk4,
    pub aural_material_sets: Vec<u32>,
    pub chunk5: Chunk5,
    pub lods: Vec<Lod>,
    pub slot_keys: Vec<u8>,
    pub chunk6: Chunk6,
    pub region_layer_overrides: Vec<Override>,
    pub chunk7: Chunk7,
    pub resource_keys: Vec<ResourceKeyEntry>,
}

impl CasPart {
    pub fn show_in_ui(&self) -> bool {
        self.chunk2.param_flags.contains(ParamFlags::SHOW_IN_UI)
    }
}
