// src/map/vertex.rs
use std::io::{self, Read, Seek};
use byteorder::{LE, ReadBytesExt};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Self {
        Vertex { x, y }
    }

    /// Reads a classic 4-byte vertex (two `i16` map units).
    pub fn from_wad<R: Read + Seek>(reader: &mut R) -> io::Result<Self> {
        Ok(Vertex {
            x: reader.read_i16::<LE>()? as f64,
            y: reader.read_i16::<LE>()? as f64,
        })
    }
}
