// src/document/document.rs

use crate::map::{Level, LineDef, Sector, SideDef, Vertex};
use byteorder::{ReadBytesExt, LE};
use log::{debug, warn};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::str;

/// A single lump entry from the WAD directory.
#[derive(Debug, Clone)]
pub struct LumpEntry {
    pub offset: u32,
    pub size: u32,
    pub name: String,
}

/// A grouping of lumps that form a level.
#[derive(Debug, Clone)]
pub struct LevelInfo {
    pub name: String,
    pub lump_indices: Vec<usize>,
}

/// A WAD held in memory, with its directory grouped into levels.
#[derive(Debug, Default)]
pub struct Document {
    directory: Vec<LumpEntry>,
    levels: Vec<LevelInfo>,
    wad_data: Vec<u8>,
}

const FILELUMP_SIZE: usize = 16; // 4 bytes (filepos) + 4 bytes (size) + 8 bytes (name)

// Record sizes of the classic lumps.
const THING_SIZE: u32 = 10;
const VERTEX_SIZE: u32 = 4;
const LINEDEF_SIZE: u32 = 14;
const SIDEDEF_SIZE: u32 = 30;
const SECTOR_SIZE: u32 = 26;

/// Doom-format thing types that mark a polyobject spawn spot.
const POLY_SPAWN_TYPES: std::ops::RangeInclusive<i16> = 9301..=9303;

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    // --- WAD Loading and Level Selection ---

    /// Loads a WAD file from the given reader: header, directory and level
    /// grouping. The whole file is kept in memory so levels can be loaded
    /// on demand.
    pub fn load_wad<R: Read + Seek>(&mut self, reader: &mut R) -> io::Result<()> {
        *self = Self::default();

        let total_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        let mut full_data = Vec::with_capacity(total_size as usize);
        reader.read_to_end(&mut full_data)?;

        let mut cursor = Cursor::new(&full_data);

        // --- Read Header ---
        let mut header_buf = [0u8; 12];
        cursor.read_exact(&mut header_buf)?;
        let ident = &header_buf[0..4];
        if ident != b"IWAD" && ident != b"PWAD" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid WAD identifier: {}", String::from_utf8_lossy(ident)),
            ));
        }
        let num_lumps = (&header_buf[4..8]).read_u32::<LE>()? as usize;
        let infotableofs = (&header_buf[8..12]).read_u32::<LE>()? as u64;
        let dir_end = infotableofs + (num_lumps * FILELUMP_SIZE) as u64;
        if dir_end > total_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Directory extends past the end of the file",
            ));
        }

        // --- Read Directory ---
        cursor.seek(SeekFrom::Start(infotableofs))?;
        let mut directory = Vec::with_capacity(num_lumps);
        for _ in 0..num_lumps {
            let lump_offset = cursor.read_u32::<LE>()?;
            let lump_size = cursor.read_u32::<LE>()?;
            let mut name_bytes = [0u8; 8];
            cursor.read_exact(&mut name_bytes)?;
            let lump_name = str::from_utf8(&name_bytes)
                .unwrap_or("")
                .trim_end_matches('\0')
                .to_ascii_uppercase();

            if lump_offset as u64 + lump_size as u64 > total_size {
                warn!(
                    "lump '{}' has invalid offset/size ({}+{} > {})",
                    lump_name, lump_offset, lump_size, total_size
                );
                continue;
            }
            directory.push(LumpEntry {
                offset: lump_offset,
                size: lump_size,
                name: lump_name,
            });
        }

        self.levels = Self::group_levels(&directory);
        self.directory = directory;
        self.wad_data = full_data;
        debug!(
            "read {} lumps, {} levels",
            self.directory.len(),
            self.levels.len()
        );
        Ok(())
    }

    /// Groups lumps from the directory into levels based on markers (e.g. "MAP01" or "E1M1").
    fn group_levels(directory: &[LumpEntry]) -> Vec<LevelInfo> {
        let mut levels = Vec::new();
        let mut current_level: Option<LevelInfo> = None;

        for (i, entry) in directory.iter().enumerate() {
            if Self::is_level_marker(&entry.name) {
                if let Some(lvl) = current_level.take() {
                    levels.push(lvl);
                }
                current_level = Some(LevelInfo {
                    name: entry.name.clone(),
                    lump_indices: Vec::new(),
                });
            } else if let Some(ref mut lvl) = current_level {
                lvl.lump_indices.push(i);
            }
        }
        if let Some(lvl) = current_level {
            levels.push(lvl);
        }
        levels
    }

    /// Returns true if the lump name indicates a level marker.
    fn is_level_marker(name: &str) -> bool {
        let b = name.as_bytes();
        match b {
            [b'M', b'A', b'P', d1, d2] => d1.is_ascii_digit() && d2.is_ascii_digit(),
            [b'E', e, b'M', m] => e.is_ascii_digit() && m.is_ascii_digit(),
            _ => false,
        }
    }

    /// Returns a list of available level markers.
    pub fn available_levels(&self) -> Vec<String> {
        self.levels.iter().map(|lvl| lvl.name.clone()).collect()
    }

    /// Loads the geometry for a specific level (by its marker, e.g. "MAP01").
    pub fn load_level(&self, level_name: &str) -> io::Result<Level> {
        let level_info = self
            .levels
            .iter()
            .find(|lvl| lvl.name.eq_ignore_ascii_case(level_name))
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("Level {} not found", level_name))
            })?;

        let mut level = Level::new(level_info.name.clone());
        for &index in &level_info.lump_indices {
            let entry = &self.directory[index];
            match entry.name.as_str() {
                "THINGS" => {
                    self.load_poly_spots(entry, &mut level)?;
                }
                "VERTEXES" => {
                    level.vertices = self.load_records(entry, VERTEX_SIZE, Vertex::from_wad)?;
                }
                "LINEDEFS" => {
                    level.linedefs = self.load_records(entry, LINEDEF_SIZE, LineDef::from_wad)?;
                }
                "SIDEDEFS" => {
                    level.sidedefs = self.load_records(entry, SIDEDEF_SIZE, SideDef::from_wad)?;
                }
                "SECTORS" => {
                    level.sectors = self.load_records(entry, SECTOR_SIZE, Sector::from_wad)?;
                }
                _ => { /* Ignore other lumps, including old node data */ }
            }
        }

        debug!(
            "{}: {} vertices, {} linedefs, {} sidedefs, {} sectors",
            level.name,
            level.vertices.len(),
            level.linedefs.len(),
            level.sidedefs.len(),
            level.sectors.len()
        );
        Ok(level)
    }

    // --- Lump-loading helper functions ---

    fn lump_cursor<'a>(&'a self, entry: &LumpEntry) -> Cursor<&'a [u8]> {
        let start = entry.offset as usize;
        Cursor::new(&self.wad_data[start..start + entry.size as usize])
    }

    fn load_records<'a, T>(
        &'a self,
        entry: &LumpEntry,
        record_size: u32,
        read: fn(&mut Cursor<&'a [u8]>) -> io::Result<T>,
    ) -> io::Result<Vec<T>> {
        if entry.size % record_size != 0 {
            warn!(
                "{} lump size {} is not a multiple of {}",
                entry.name, entry.size, record_size
            );
        }
        let count = entry.size / record_size;
        let mut cursor = self.lump_cursor(entry);
        (0..count).map(|_| read(&mut cursor)).collect()
    }

    fn load_poly_spots(&self, entry: &LumpEntry, level: &mut Level) -> io::Result<()> {
        let mut cursor = self.lump_cursor(entry);
        for _ in 0..entry.size / THING_SIZE {
            let x = cursor.read_i16::<LE>()?;
            let y = cursor.read_i16::<LE>()?;
            let _angle = cursor.read_i16::<LE>()?;
            let thing_type = cursor.read_i16::<LE>()?;
            let _options = cursor.read_i16::<LE>()?;
            if POLY_SPAWN_TYPES.contains(&thing_type) {
                level.add_poly_spot(x as f64, y as f64);
            }
        }
        Ok(())
    }
}
