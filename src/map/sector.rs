// src/map/sector.rs

use std::io::{self, Read, Seek};
use byteorder::{LE, ReadBytesExt};
use serde::{Deserialize, Serialize};

/// A sector in classic DOOM format (26 bytes).
///
/// Layout (all little-endian):
///
/// ```text
/// offset  field          type / size
/// ------  -------------  ------------
///  0-1    floor_height   i16
///  2-3    ceiling_height i16
///  4-11   floor_tex      [u8; 8]
/// 12-19   ceiling_tex    [u8; 8]
/// 20-21   light_level    i16
/// 22-23   special_type   i16
/// 24-25   tag            i16
/// ```
///
/// The node builder only ever refers to sectors by index; the fields are
/// carried so a loaded level round-trips through JSON intact.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sector {
    /// The floor height (in map units).
    pub floor_height: i32,

    /// The ceiling height (in map units).
    pub ceiling_height: i32,

    /// The name of the floor flat, up to 8 chars.
    pub floor_tex: String,

    /// The name of the ceiling flat, up to 8 chars.
    pub ceiling_tex: String,

    /// Light level (0-255 in classic DOOM).
    pub light: i32,

    /// Special type (a.k.a. "effect" or "sector type").
    pub r#type: i32,

    /// Sector tag, used to link linedefs, etc.
    pub tag: i32,
}

impl Sector {
    /// Creates a plain sector with the given heights and no textures.
    pub fn new(floor_height: i32, ceiling_height: i32) -> Self {
        Sector {
            floor_height,
            ceiling_height,
            light: 160,
            ..Default::default()
        }
    }

    /// Reads a `Sector` from a classic DOOM WAD in its 26-byte format.
    /// Flat names are uppercased and trimmed of trailing zeros/spaces.
    pub fn from_wad<R: Read + Seek>(reader: &mut R) -> io::Result<Self> {
        let floor_height = reader.read_i16::<LE>()? as i32;
        let ceiling_height = reader.read_i16::<LE>()? as i32;
        let floor_tex = read_name8(reader)?;
        let ceiling_tex = read_name8(reader)?;
        let light = reader.read_i16::<LE>()? as i32;
        let r#type = reader.read_i16::<LE>()? as i32;
        let tag = reader.read_i16::<LE>()? as i32;

        Ok(Sector {
            floor_height,
            ceiling_height,
            floor_tex,
            ceiling_tex,
            light,
            r#type,
            tag,
        })
    }
}

/// Reads an 8-byte lump-style name (flat or texture).
/// Trims trailing `\0` and spaces, uppercases it.
pub(crate) fn read_name8<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;

    let raw = buf
        .iter()
        .map(|&c| c as char)
        .collect::<String>()
        .to_uppercase();

    let trimmed = raw.trim_end_matches(|c: char| c == '\0' || c.is_whitespace());
    Ok(trimmed.to_string())
}
