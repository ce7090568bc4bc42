// src/map/linedef.rs
use std::io::{self, Read, Seek};
use byteorder::{LE, ReadBytesExt};
use serde::{Deserialize, Serialize};

/// Sidedef slot value meaning "no side" in the classic format.
const NO_SIDE: u16 = 0xFFFF;

/// A map line. `right` is the front side, `left` the back side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDef {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub flags: i32,
    #[serde(default)]
    pub line_type: i32,
    #[serde(default)]
    pub tag: i32,
    pub right: Option<usize>,
    #[serde(default)]
    pub left: Option<usize>,
}

impl LineDef {
    pub fn new(start: usize, end: usize, right: Option<usize>, left: Option<usize>) -> Self {
        LineDef {
            start,
            end,
            flags: 0,
            line_type: 0,
            tag: 0,
            right,
            left,
        }
    }

    /// Reads a classic 14-byte linedef.
    pub fn from_wad<R: Read + Seek>(reader: &mut R) -> io::Result<Self> {
        Ok(LineDef {
            start: reader.read_u16::<LE>()? as usize,
            end: reader.read_u16::<LE>()? as usize,
            flags: reader.read_i16::<LE>()? as i32,
            line_type: reader.read_i16::<LE>()? as i32,
            tag: reader.read_i16::<LE>()? as i32,
            right: side_slot(reader.read_u16::<LE>()?),
            left: side_slot(reader.read_u16::<LE>()?),
        })
    }

    pub fn is_two_sided(&self) -> bool {
        self.right.is_some() && self.left.is_some()
    }
}

fn side_slot(raw: u16) -> Option<usize> {
    if raw == NO_SIDE {
        None
    } else {
        Some(raw as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_from_wad_one_sided() {
        let mut raw = Vec::new();
        for v in [3u16, 7, 1, 0, 0, 12, 0xFFFF] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        let line = LineDef::from_wad(&mut Cursor::new(raw)).unwrap();
        assert_eq!(line.start, 3);
        assert_eq!(line.end, 7);
        assert_eq!(line.flags, 1);
        assert_eq!(line.right, Some(12));
        assert_eq!(line.left, None);
        assert!(!line.is_two_sided());
    }
}
