//! Classification codes, block codes and the tables that relate them.
//!
//! Grid cells hold a `u32` laid out as:
//!
//! | bits   | meaning                                        |
//! |--------|------------------------------------------------|
//! | 0..8   | classification                                 |
//! | 8..12  | block light                                    |
//! | 31     | custom block: the remaining bits are the block |
//!
//! Block codes are `id | data << 8`.

/// Empty cell, and the "nearest other class" filter target.
pub const NONE: u8 = 0;
pub const UNASSIGNED: u8 = 1;
pub const GROUND: u8 = 2;
pub const VEGETATION_LOW: u8 = 3;
pub const VEGETATION_MEDIUM: u8 = 4;
pub const VEGETATION_HIGH: u8 = 5;
pub const BUILDING: u8 = 6;
pub const LOW_POINT: u8 = 7;
pub const WATER: u8 = 9;

pub const ROOF_TERRACOTTA: u8 = 64;
pub const ROOF_DARK: u8 = 65;
pub const ROOF_LIGHT: u8 = 66;

pub const GROUND_GRASS: u8 = 70;
pub const GROUND_ASPHALT: u8 = 71;
pub const GROUND_GRAVEL: u8 = 72;
pub const GROUND_FIELD: u8 = 73;

/// Cell flag marking a literal block code.
pub const CUSTOM_BLOCK_FLAG: u32 = 1 << 31;

pub const BLOCK_AIR: u32 = 0;
pub const BLOCK_GRASS: u32 = 2;
pub const BLOCK_DIRT: u32 = 3;
pub const BLOCK_STILL_WATER: u32 = 9;
pub const BLOCK_GRAVEL: u32 = 13;
pub const BLOCK_LEAVES: u32 = 18;
pub const BLOCK_BIRCH_LEAVES: u32 = 0x212;
pub const BLOCK_WOOL_WHITE: u32 = 0x023;
pub const BLOCK_WOOL_GRAY: u32 = 0x723;
pub const BLOCK_WOOL_BLACK: u32 = 0xF23;
pub const BLOCK_DOUBLE_STONE_SLAB: u32 = 43;
pub const BLOCK_STONE_BRICKS: u32 = 98;
pub const BLOCK_HARDENED_CLAY: u32 = 172;
pub const BLOCK_STAINED_CLAY_GRAY: u32 = 0x79F;
pub const BLOCK_STAINED_CLAY_BLACK: u32 = 0xF9F;

/// Classification stored in a cell value.
#[inline]
pub fn class_of(cell: u32) -> u8 {
    if cell & CUSTOM_BLOCK_FLAG != 0 {
        UNASSIGNED
    } else {
        (cell & 0xFF) as u8
    }
}

/// Empty or unassigned: may be overwritten by any useful classification.
#[inline]
pub fn is_trivial(class: u8) -> bool {
    class == NONE || class == UNASSIGNED
}

#[inline]
pub fn is_ground_family(class: u8) -> bool {
    class == GROUND || (GROUND_GRASS..=GROUND_FIELD).contains(&class)
}

#[inline]
pub fn is_building_family(class: u8) -> bool {
    class == BUILDING || (ROOF_TERRACOTTA..=ROOF_LIGHT).contains(&class)
}

/// Block code for a classification.
pub fn block_for_class(class: u8) -> u32 {
    match class {
        NONE => BLOCK_AIR,
        UNASSIGNED => BLOCK_WOOL_WHITE,
        GROUND => BLOCK_DIRT,
        VEGETATION_LOW => BLOCK_GRASS,
        VEGETATION_MEDIUM => BLOCK_BIRCH_LEAVES,
        VEGETATION_HIGH => BLOCK_LEAVES,
        BUILDING => BLOCK_STONE_BRICKS,
        LOW_POINT => BLOCK_WOOL_BLACK,
        WATER => BLOCK_STILL_WATER,
        ROOF_TERRACOTTA => BLOCK_HARDENED_CLAY,
        ROOF_DARK => BLOCK_STAINED_CLAY_GRAY,
        ROOF_LIGHT => BLOCK_DOUBLE_STONE_SLAB,
        GROUND_GRASS => BLOCK_GRASS,
        GROUND_ASPHALT => BLOCK_STAINED_CLAY_BLACK,
        GROUND_GRAVEL => BLOCK_GRAVEL,
        GROUND_FIELD => BLOCK_DIRT,
        _ => BLOCK_WOOL_GRAY,
    }
}

/// Map a cell value to its final block value.
///
/// Custom blocks pass through with the flag cleared. Otherwise the
/// classification is looked up and the block light moved to bits 16..20.
#[inline]
pub fn final_transform(cell: u32) -> u32 {
    if cell & CUSTOM_BLOCK_FLAG != 0 {
        return cell & !CUSTOM_BLOCK_FLAG;
    }
    let class = (cell & 0xFF) as u8;
    let light = (cell >> 8) & 0xF;
    (light << 16) | block_for_class(class)
}

/// One reference color of the aerial-imagery palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub rgb: [u8; 3],
    pub class: u8,
}

/// Palette used to specialize classes from aerial imagery.
pub const PALETTE: &[PaletteEntry] = &[
    PaletteEntry { rgb: [178, 92, 62], class: ROOF_TERRACOTTA },
    PaletteEntry { rgb: [70, 70, 75], class: ROOF_DARK },
    PaletteEntry { rgb: [190, 190, 185], class: ROOF_LIGHT },
    PaletteEntry { rgb: [86, 125, 70], class: GROUND_GRASS },
    PaletteEntry { rgb: [95, 95, 100], class: GROUND_ASPHALT },
    PaletteEntry { rgb: [160, 150, 135], class: GROUND_GRAVEL },
    PaletteEntry { rgb: [150, 130, 90], class: GROUND_FIELD },
    PaletteEntry { rgb: [40, 70, 95], class: WATER },
];

/// Default maximum RGB distance for a palette match.
pub const DEFAULT_PALETTE_MAX_DISTANCE: f64 = 60.0;

/// Palette classes a cell of class `class` may be specialized into.
pub fn allowed_targets(class: u8) -> &'static [u8] {
    match class {
        BUILDING => &[ROOF_TERRACOTTA, ROOF_DARK, ROOF_LIGHT],
        GROUND => &[
            GROUND_GRASS,
            GROUND_ASPHALT,
            GROUND_GRAVEL,
            GROUND_FIELD,
            WATER,
        ],
        VEGETATION_LOW => &[GROUND_GRASS, GROUND_FIELD],
        _ => &[],
    }
}

#[inline]
fn rgb_distance_sq(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as i32 - y as i32;
            (d * d) as u32
        })
        .sum()
}

/// Nearest palette class to `rgb` among `allowed` (all entries if `None`)
/// within `max_distance`.
pub fn match_palette(rgb: [u8; 3], allowed: Option<&[u8]>, max_distance: f64) -> Option<u8> {
    let limit = (max_distance * max_distance) as u32;
    PALETTE
        .iter()
        .filter(|e| allowed.map_or(true, |a| a.contains(&e.class)))
        .map(|e| (rgb_distance_sq(rgb, e.rgb), e.class))
        .filter(|&(d2, _)| d2 <= limit)
        .min_by_key(|&(d2, _)| d2)
        .map(|(_, class)| class)
}

/// A proximity reclassification rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationFilter {
    /// Class to assign; [`NONE`] means "class of the nearest point that is
    /// not a source class".
    pub target: u8,
    pub sources: &'static [u8],
    pub radius: f64,
    pub threshold: f64,
}

/// Filters in application order.
pub const FILTERS: &[ClassificationFilter] = &[
    ClassificationFilter {
        target: BUILDING,
        sources: &[VEGETATION_LOW, VEGETATION_MEDIUM, VEGETATION_HIGH],
        radius: 2.0,
        threshold: 0.3,
    },
    ClassificationFilter {
        target: WATER,
        sources: &[GROUND],
        radius: 2.0,
        threshold: 0.2,
    },
    ClassificationFilter {
        target: NONE,
        sources: &[UNASSIGNED, LOW_POINT],
        radius: 1.5,
        threshold: 0.0,
    },
];
