// src/map/sidedef.rs

use std::io::{self, Read, Seek};
use byteorder::{LE, ReadBytesExt};
use serde::{Deserialize, Serialize};

use crate::map::sector::read_name8;

/// A sidedef in classic DOOM format (30 bytes total).
///
/// Layout (all little-endian):
///
/// ```text
/// offset  field       type / size
/// ------  ----------  ------------
///  0-1    x_offset    i16
///  2-3    y_offset    i16
///  4-11   upper_tex   [u8; 8]
/// 12-19   lower_tex   [u8; 8]
/// 20-27   mid_tex     [u8; 8]
/// 28-29   sector      i16  (index into sector list)
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SideDef {
    #[serde(default)]
    pub x_offset: i32,
    #[serde(default)]
    pub y_offset: i32,
    #[serde(default)]
    pub upper_tex: String,
    #[serde(default)]
    pub lower_tex: String,
    #[serde(default)]
    pub mid_tex: String,

    /// Index of the sector this side faces.
    pub sector: usize,
}

impl SideDef {
    /// Creates an untextured side facing `sector`.
    pub fn new(sector: usize) -> Self {
        SideDef {
            sector,
            ..Default::default()
        }
    }

    /// Reads a `SideDef` from a DOOM WAD in the 30-byte classic format.
    /// Texture names are uppercased and trimmed.
    pub fn from_wad<R: Read + Seek>(reader: &mut R) -> io::Result<Self> {
        let x_offset = reader.read_i16::<LE>()? as i32;
        let y_offset = reader.read_i16::<LE>()? as i32;

        let upper_tex = read_name8(reader)?;
        let lower_tex = read_name8(reader)?;
        let mid_tex = read_name8(reader)?;

        let sector = reader.read_u16::<LE>()? as usize;

        Ok(SideDef {
            x_offset,
            y_offset,
            upper_tex,
            lower_tex,
            mid_tex,
            sector,
        })
    }
}
