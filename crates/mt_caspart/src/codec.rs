use std::io::{Cursor, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::types::{
    CasPart, Chunk1, Chunk2, Chunk3, Chunk4, Chunk5, Chunk6, Chunk7, Lod, LodAsset, Override,
    ParamFlags, Preset, ResourceKeyEntry, Tag,
};
use crate::Error;

/// Decodes a CAS Part resource, following the chunk order fixed by the
/// format exactly: each `Chunk*` is a flat run of scalars, interleaved with
/// the variable-length arrays whose counts live in the surrounding chunks.
pub fn read(bytes: &[u8]) -> Result<CasPart, Error> {
    let mut r = Cursor::new(bytes);

    let version = r.read_u32::<LE>()?;
    let data_size = r.read_u32::<LE>()?;
    let num_presets = r.read_u32::<LE>()?;
    let chunk1 = Chunk1 { version, data_size };

    let mut presets = Vec::with_capacity(num_presets as usize);
    for _ in 0..num_presets {
        let complete_id = r.read_u64::<LE>()?;
        let num_params = r.read_u8()?;
        if num_params != 0 {
            return Err(Error::Unsupported("preset parameters"));
        }
        presets.push(Preset { complete_id });
    }

    let name = read_name(&mut r)?;

    let display_index_bits = r.read_u32::<LE>()?;
    let secondary_display_index = r.read_u16::<LE>()?;
    let prototype_id = r.read_u32::<LE>()?;
    let aural_material_hash = r.read_u32::<LE>()?;
    let param_flags = ParamFlags::from_bits_truncate(r.read_u8()?);
    let exclude_part_flags = r.read_u64::<LE>()?;
    let exclude_modifier_region_flags = r.read_u32::<LE>()?;
    let num_tags = r.read_u32::<LE>()?;
    let chunk2 = Chunk2 {
        display_index_bits,
        secondary_display_index,
        prototype_id,
        aural_material_hash,
        param_flags,
        exclude_part_flags,
        exclude_modifier_region_flags,
    };

    let mut tags = Vec::with_capacity(num_tags as usize);
    for _ in 0..num_tags {
        tags.push(Tag {
            category: r.read_u16::<LE>()?,
            value: r.read_u16::<LE>()?,
        });
    }

    let simoleon_price = r.read_u32::<LE>()?;
    let part_title_key = r.read_u32::<LE>()?;
    let part_desc_key = r.read_u32::<LE>()?;
    let unique_texture_space = r.read_u8()?;
    let body_type = r.read_i32::<LE>()?;
    let unused1 = r.read_i32::<LE>()?;
    let age_gender = r.read_u32::<LE>()?;
    let unused2 = r.read_u8()?;
    let unused3 = if unused2 > 0 { Some(r.read_u8()?) } else { None };
    let chunk3 = Chunk3 {
        simoleon_price,
        part_title_key,
        part_desc_key,
        unique_texture_space,
        body_type,
        unused1,
        age_gender,
        unused2,
        unused3,
    };

    let num_swatch_colors = r.read_u8()?;
    let mut swatch_colors = Vec::with_capacity(num_swatch_colors as usize);
    for _ in 0..num_swatch_colors {
        swatch_colors.push(r.read_u32::<LE>()?);
    }

    let buff_res_key = r.read_u8()?;
    let variant_thumb_key = r.read_u8()?;
    let voice_effect_hash = r.read_u64::<LE>()?;
    let used_material_count = r.read_u8()?;
    let chunk4 = Chunk4 {
        buff_res_key,
        variant_thumb_key,
        voice_effect_hash,
    };

    let mut aural_material_sets = Vec::with_capacity(used_material_count as usize);
    for _ in 0..used_material_count {
        aural_material_sets.push(r.read_u32::<LE>()?);
    }

    let naked_key = r.read_u8()?;
    let parent_key = r.read_u8()?;
    let sort_layer = r.read_i32::<LE>()?;
    let num_lods = r.read_u8()?;
    let chunk5 = Chunk5 {
        naked_key,
        parent_key,
        sort_layer,
    };

    let mut lods = Vec::with_capacity(num_lods as usize);
    for _ in 0..num_lods {
        lods.push(read_lod(&mut r)?);
    }

    let num_slot_keys = r.read_u8()?;
    let mut slot_keys = Vec::with_capacity(num_slot_keys as usize);
    for _ in 0..num_slot_keys {
        slot_keys.push(r.read_u8()?);
    }

    let diffuse_key = r.read_u8()?;
    let shadow_key = r.read_u8()?;
    let composition_method = r.read_u8()?;
    let region_map_key = r.read_u8()?;
    let num_overrides = r.read_u8()?;
    let chunk6 = Chunk6 {
        diffuse_key,
        shadow_key,
        composition_method,
        region_map_key,
    };

    let mut region_layer_overrides = Vec::with_capacity(num_overrides as usize);
    for _ in 0..num_overrides {
        region_layer_overrides.push(Override {
            region: r.read_u8()?,
            layer_bits: r.read_u32::<LE>()?,
        });
    }

    let normal_map_key = r.read_u8()?;
    let specular_map_key = r.read_u8()?;
    let normal_uv_body_type = r.read_u32::<LE>()?;
    let emission_map_key = r.read_u8()?;
    let num_resource_keys = r.read_u8()?;
    let chunk7 = Chunk7 {
        normal_map_key,
        specular_map_key,
        normal_uv_body_type,
        emission_map_key,
    };

    let mut resource_keys = Vec::with_capacity(num_resource_keys as usize);
    for _ in 0..num_resource_keys {
        resource_keys.push(ResourceKeyEntry {
            instance: r.read_u64::<LE>()?,
            group: r.read_u32::<LE>()?,
            type_id: r.read_u32::<LE>()?,
        });
    }

    Ok(CasPart {
        chunk1,
        presets,
        name,
        chunk2,
        tags,
        chunk3,
        swatch_colors,
        chunk4,
        aural_material_sets,
        chunk5,
        lods,
        slot_keys,
        chunk6,
        region_layer_overrides,
        chunk7,
        resource_keys,
    })
}

fn read_lod<R: Read>(r: &mut R) -> Result<Lod, Error> {
    let level = r.read_u8()?;
    let unused = r.read_u32::<LE>()?;
    let num_assets = r.read_u8()?;
    let mut assets = Vec::with_capacity(num_assets as usize);
    for _ in 0..num_assets {
        assets.push(LodAsset {
            sorting: r.read_i32::<LE>()?,
            spec_level: r.read_i32::<LE>()?,
            cast_shadow: r.read_i32::<LE>()?,
        });
    }
    let num_lod_keys = r.read_u8()?;
    let mut lod_keys = Vec::with_capacity(num_lod_keys as usize);
    for _ in 0..num_lod_keys {
        lod_keys.push(r.read_u8()?);
    }
    Ok(Lod {
        level,
        unused,
        assets,
        lod_keys,
    })
}

/// Reads the 7-bit-continuation length prefix followed by the name's
/// `[0x00, byte]` code-unit pairs.
fn read_name<R: Read>(r: &mut R) -> Result<String, Error> {
    let low = r.read_u8()?;
    let size = if low > 127 {
        let high = r.read_u8()?;
        ((low as u32) & 0x7F) | ((high as u32) << 7)
    } else {
        low as u32
    };
    let mut bytes = Vec::with_capacity(size as usize / 2);
    for _ in 0..(size / 2) {
        r.read_u8()?; // high byte of the UTF-16 code unit, always zero for the names this format stores.
        bytes.push(r.read_u8()?);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Encodes a CAS Part resource back to bytes, byte-identical for input
/// produced by [`read`] on the same platform.
pub fn write(part: &CasPart) -> Result<Vec<u8>, Error> {
    let mut w = Cursor::new(Vec::new());

    w.write_u32::<LE>(part.chunk1.version)?;
    w.write_u32::<LE>(part.chunk1.data_size)?;
    w.write_u32::<LE>(part.presets.len() as u32)?;
    for preset in &part.presets {
        w.write_u64::<LE>(preset.complete_id)?;
        w.write_u8(0)?;
    }

    write_name(&mut w, &part.name)?;

    w.write_u32::<LE>(part.chunk2.display_index_bits)?;
    w.write_u16::<LE>(part.chunk2.secondary_display_index)?;
    w.write_u32::<LE>(part.chunk2.prototype_id)?;
    w.write_u32::<LE>(part.chunk2.aural_material_hash)?;
    w.write_u8(part.chunk2.param_flags.bits())?;
    w.write_u64::<LE>(part.chunk2.exclude_part_flags)?;
    w.write_u32::<LE>(part.chunk2.exclude_modifier_region_flags)?;
    w.write_u32::<LE>(part.tags.len() as u32)?;
    for tag in &part.tags {
        w.write_u16::<LE>(tag.category)?;
        w.write_u16::<LE>(tag.value)?;
    }

    w.write_u32::<LE>(part.chunk3.simoleon_price)?;
    w.write_u32::<LE>(part.chunk3.part_title_key)?;
    w.write_u32::<LE>(part.chunk3.part_desc_key)?;
    w.write_u8(part.chunk3.unique_texture_space)?;
    w.write_i32::<LE>(part.chunk3.body_type)?;
    w.write_i32::<LE>(part.chunk3.unused1)?;
    w.write_u32::<LE>(part.chunk3.age_gender)?;
    w.write_u8(part.chunk3.unused2)?;
    if part.chunk3.unused2 > 0 {
        let unused3 = part.chunk3.unused3.ok_or(Error::Malformed(
            "chunk3.unused2 > 0 requires chunk3.unused3 to be set",
        ))?;
        w.write_u8(unused3)?;
    }

    w.write_u8(part.swatch_colors.len() as u8)?;
    for swatch in &part.swatch_colors {
        w.write_u32::<LE>(*swatch)?;
    }

    w.write_u8(part.chunk4.buff_res_key)?;
    w.write_u8(part.chunk4.variant_thumb_key)?;
    w.write_u64::<LE>(part.chunk4.voice_effect_hash)?;
    w.write_u8(part.aural_material_sets.len() as u8)?;
    for set in &part.aural_material_sets {
        w.write_u32::<LE>(*set)?;
    }

    w.write_u8(part.chunk5.naked_key)?;
    w.write_u8(part.chunk5.parent_key)?;
    w.write_i32::<LE>(part.chunk5.sort_layer)?;
    w.write_u8(part.lods.len() as u8)?;
    for lod in &part.lods {
        write_lod(&mut w, lod)?;
    }

    w.write_u8(part.slot_keys.len() as u8)?;
    w.write_all(&part.slot_keys)?;

    w.write_u8(part.chunk6.diffuse_key)?;
    w.write_u8(part.chunk6.shadow_key)?;
    w.write_u8(part.chunk6.composition_method)?;
    w.write_u8(part.chunk6.region_map_key)?;
    w.write_u8(part.region_layer_overrides.len() as u8)?;
    for o in &part.region_layer_overrides {
        w.write_u8(o.region)?;
        w.write_u32::<LE>(o.layer_bits)?;
    }

    w.write_u8(part.chunk7.normal_map_key)?;
    w.write_u8(part.chunk7.specular_map_key)?;
    w.write_u32::<LE>(part.chunk7.normal_uv_body_type)?;
    w.write_u8(part.chunk7.emission_map_key)?;
    w.write_u8(part.resource_keys.len() as u8)?;
    for rk in &part.resource_keys {
        w.write_u64::<LE>(rk.instance)?;
        w.write_u32::<LE>(rk.group)?;
        w.write_u32::<LE>(rk.type_id)?;
    }

    Ok(w.into_inner())
}

fn write_lod<W: Write>(w: &mut W, lod: &Lod) -> Result<(), Error> {
    w.write_u8(lod.level)?;
    w.write_u32::<LE>(lod.unused)?;
    w.write_u8(lod.assets.len() as u8)?;
    for asset in &lod.assets {
        w.write_i32::<LE>(asset.sorting)?;
        w.write_i32::<LE>(asset.spec_level)?;
        w.write_i32::<LE>(asset.cast_shadow)?;
    }
    w.write_u8(lod.lod_keys.len() as u8)?;
    w.write_all(&lod.lod_keys)?;
    Ok(())
}

fn write_name<W: Write>(w: &mut W, name: &str) -> Result<(), Error> {
    if !name.is_ascii() {
        return Err(Error::Malformed("CAS part names must be ASCII"));
    }
    let size = name.len() * 2;
    if size > 127 {
        w.write_u8(((size & 0x7F) | 0x80) as u8)?;
        w.write_u8((size >> 7) as u8)?;
    } else {
        w.write_u8(size as u8)?;
    }
    for byte in name.bytes() {
        w.write_u8(0)?;
        w.write_u8(byte)?;
    }
    Ok(())
}
