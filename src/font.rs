use crate::error::{MeasureError, RenderError};
use crate::measure::{FixedAdvanceMeasurer, TextMeasurer};
use crate::types::Pt;
use rustybuzz::UnicodeBuffer;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

// Standard PDF faces, measured with fixed advances when no file backs them.
const STANDARD_FACES: &[&str] = &[
    "helvetica",
    "helvetica-bold",
    "helvetica-oblique",
    "helvetica-boldoblique",
    "times",
    "times-roman",
    "times-bold",
    "times-italic",
    "times-bolditalic",
    "courier",
    "courier-bold",
    "courier-oblique",
    "courier-boldoblique",
    "symbol",
    "zapfdingbats",
];

const LATIN1_FIRST: u32 = 0x20;
const LATIN1_LAST: u32 = 0xFF;
const WIDTH_MEMO_CAPACITY: usize = 20_000;

type MemoKey = (usize, i64, String);

/// Bounded width memo. Cleared wholesale when it fills up.
#[derive(Debug)]
struct WidthMemo {
    widths: HashMap<MemoKey, Pt>,
    capacity: usize,
}

impl WidthMemo {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            widths: HashMap::new(),
            capacity,
        }
    }

    fn lookup(&self, key: &MemoKey) -> Option<Pt> {
        self.widths.get(key).copied()
    }

    fn remember(&mut self, key: MemoKey, width: Pt) {
        if self.widths.len() >= self.capacity && !self.widths.contains_key(&key) {
            self.widths.clear();
        }
        self.widths.insert(key, width);
    }
}

/// Advance and kerning tables for the Latin-1 range, in 1/1000 em.
#[derive(Debug)]
struct Latin1Table {
    // (glyph id, advance) per code point from U+0020.
    glyphs: Vec<(u16, u16)>,
    kerning: HashMap<(u16, u16), i16>,
}

#[derive(Debug)]
struct LoadedFont {
    bytes: Vec<u8>,
    table: Latin1Table,
}

/// Font files registered for measurement, looked up by any of their names.
///
/// Read-only once built, so one registry can back any number of concurrent
/// renders; the width memo is the only interior state and sits behind a mutex.
#[derive(Debug)]
pub struct FontRegistry {
    loaded: Vec<LoadedFont>,
    by_name: HashMap<String, usize>,
    shape_unicode: bool,
    standard: FixedAdvanceMeasurer,
    memo: Mutex<WidthMemo>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self {
            loaded: Vec::new(),
            by_name: HashMap::new(),
            shape_unicode: true,
            standard: FixedAdvanceMeasurer::default(),
            memo: Mutex::new(WidthMemo::with_capacity(WIDTH_MEMO_CAPACITY)),
        }
    }

    /// With shaping off, text outside Latin-1 fails to measure.
    pub fn set_use_full_unicode_metrics(&mut self, enabled: bool) {
        self.shape_unicode = enabled;
        // Memoized widths depend on the mode.
        if let Ok(memo) = self.memo.get_mut() {
            memo.widths.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    /// Registers every `.ttf`/`.otf` directly inside `dir`. Unreadable files are skipped.
    pub fn register_dir(&mut self, dir: impl AsRef<Path>) {
        let Ok(listing) = fs::read_dir(dir.as_ref()) else {
            return;
        };
        let mut files: Vec<_> = listing
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_font_extension(p))
            .collect();
        // First registration of an alias wins, so order must be stable.
        files.sort();
        for file in files {
            let _ = self.register_file(file);
        }
    }

    pub fn register_file(&mut self, file: impl AsRef<Path>) -> Result<String, RenderError> {
        let file = file.as_ref();
        if !has_font_extension(file) {
            return Err(RenderError::Asset(format!(
                "unsupported font file {}",
                file.display()
            )));
        }
        let bytes = fs::read(file)?;
        let stem = file.file_stem().and_then(|s| s.to_str());
        self.register_bytes(bytes, stem)
    }

    /// Parses `bytes` and registers the face under its PostScript, full and
    /// family names plus `source_name`. Returns the primary name.
    pub fn register_bytes(
        &mut self,
        bytes: Vec<u8>,
        source_name: Option<&str>,
    ) -> Result<String, RenderError> {
        let label = source_name.unwrap_or("EmbeddedFont");
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| RenderError::Asset(format!("invalid font data for {label}: {e}")))?;
        let names = face_names(&face, source_name);
        let table = Latin1Table::read(&face);
        let slot = self.loaded.len();
        self.loaded.push(LoadedFont { bytes, table });

        for name in &names {
            let key = name_key(name);
            if !key.is_empty() {
                self.by_name.entry(key).or_insert(slot);
            }
        }
        Ok(names
            .into_iter()
            .next()
            .unwrap_or_else(|| label.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&name_key(name))
    }

    fn width_of(&self, slot: usize, name: &str, font_size: Pt, text: &str) -> Result<Pt, MeasureError> {
        let key: MemoKey = (slot, font_size.to_milli_i64(), text.to_string());
        if let Some(hit) = self.memo.lock().ok().and_then(|memo| memo.lookup(&key)) {
            return Ok(hit);
        }
        let font = self
            .loaded
            .get(slot)
            .ok_or_else(|| MeasureError::UnknownFont(name.to_string()))?;
        let units = if !self.shape_unicode || text.chars().all(is_latin1) {
            font.table.advance_units(name, text)?
        } else {
            shaped_advance_units(&font.bytes, name, text)?
        };
        let width = if units > 0 {
            font_size.mul_ratio(units, 1000)
        } else {
            Pt::ZERO
        };
        if let Ok(mut memo) = self.memo.lock() {
            memo.remember(key, width);
        }
        Ok(width)
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasurer for FontRegistry {
    fn text_width(&self, text: &str, font_name: &str, font_size: Pt) -> Result<Pt, MeasureError> {
        let key = name_key(font_name);
        match self.by_name.get(&key) {
            Some(&slot) => self.width_of(slot, font_name, font_size, text),
            None if STANDARD_FACES.contains(&key.as_str()) => {
                self.standard.text_width(text, font_name, font_size)
            }
            None => Err(MeasureError::UnknownFont(font_name.to_string())),
        }
    }
}

fn is_latin1(ch: char) -> bool {
    (LATIN1_FIRST..=LATIN1_LAST).contains(&u32::from(ch))
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf"))
}

fn to_thousandths(value: i32, units_per_em: i32) -> i32 {
    let upem = i64::from(units_per_em.max(1));
    let scaled = (i64::from(value) * 1000 * 2 + upem * i64::from(value.signum())) / (2 * upem);
    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

impl Latin1Table {
    fn read(face: &ttf_parser::Face<'_>) -> Self {
        let upem = i32::from(face.units_per_em());
        let glyphs: Vec<(u16, u16)> = (LATIN1_FIRST..=LATIN1_LAST)
            .map(|code| {
                let gid = char::from_u32(code).and_then(|ch| face.glyph_index(ch));
                let advance = gid.and_then(|g| face.glyph_hor_advance(g)).unwrap_or(0);
                let width = to_thousandths(i32::from(advance), upem).clamp(0, i32::from(u16::MAX));
                (gid.map_or(0, |g| g.0), width as u16)
            })
            .collect();
        let kerning = read_kerning(face, &glyphs, upem);
        Self { glyphs, kerning }
    }

    fn advance_units(&self, name: &str, text: &str) -> Result<i32, MeasureError> {
        let missing = |ch| MeasureError::UnsupportedGlyph {
            font: name.to_string(),
            ch,
        };
        let mut units = 0i32;
        let mut previous = None;
        for ch in text.chars() {
            let index = u32::from(ch)
                .checked_sub(LATIN1_FIRST)
                .filter(|_| is_latin1(ch))
                .ok_or_else(|| missing(ch))?;
            let (gid, advance) = self.glyphs[index as usize];
            if gid == 0 && ch != ' ' {
                return Err(missing(ch));
            }
            units = units.saturating_add(i32::from(advance));
            if let Some(adjust) = previous.and_then(|left| self.kerning.get(&(left, gid))) {
                units = units.saturating_add(i32::from(*adjust));
            }
            previous = Some(gid);
        }
        Ok(units)
    }
}

// Pair adjustments from the legacy `kern` table, restricted to Latin-1 glyphs.
fn read_kerning(
    face: &ttf_parser::Face<'_>,
    glyphs: &[(u16, u16)],
    upem: i32,
) -> HashMap<(u16, u16), i16> {
    let mut pairs = HashMap::new();
    let Some(kern) = face.tables().kern else {
        return pairs;
    };
    let usable: Vec<_> = kern
        .subtables
        .into_iter()
        .filter(|sub| sub.horizontal && !sub.has_cross_stream && !sub.has_state_machine)
        .collect();
    if usable.is_empty() {
        return pairs;
    }
    let ids: Vec<u16> = glyphs.iter().map(|(gid, _)| *gid).filter(|gid| *gid != 0).collect();
    for &left in &ids {
        for &right in &ids {
            let raw: i32 = usable
                .iter()
                .filter_map(|sub| {
                    sub.glyphs_kerning(ttf_parser::GlyphId(left), ttf_parser::GlyphId(right))
                })
                .map(i32::from)
                .sum();
            let adjust = clamp_i16(to_thousandths(raw, upem));
            if adjust != 0 {
                pairs.insert((left, right), adjust);
            }
        }
    }
    pairs
}

// Full shaping for text beyond Latin-1; only the summed advances matter here.
fn shaped_advance_units(bytes: &[u8], name: &str, text: &str) -> Result<i32, MeasureError> {
    let face = rustybuzz::Face::from_slice(bytes, 0)
        .ok_or_else(|| MeasureError::UnknownFont(name.to_string()))?;
    if let Some(ch) = text
        .chars()
        .find(|ch| !ch.is_whitespace() && face.glyph_index(*ch).is_none())
    {
        return Err(MeasureError::UnsupportedGlyph {
            font: name.to_string(),
            ch,
        });
    }
    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    buffer.guess_segment_properties();
    let shaped = rustybuzz::shape(&face, &[], buffer);
    let upem = i32::from(face.units_per_em());
    Ok(shaped
        .glyph_positions()
        .iter()
        .map(|pos| to_thousandths(pos.x_advance, upem))
        .fold(0i32, i32::saturating_add))
}

// PostScript name first, then full name, family, and the file stem.
fn face_names(face: &ttf_parser::Face<'_>, source_name: Option<&str>) -> Vec<String> {
    use ttf_parser::name::name_id;

    let wanted = [
        &[name_id::POST_SCRIPT_NAME][..],
        &[name_id::FULL_NAME][..],
        &[name_id::TYPOGRAPHIC_FAMILY, name_id::FAMILY][..],
    ];
    let mut names: Vec<String> = Vec::new();
    for ids in wanted {
        let found = face
            .names()
            .into_iter()
            .filter(|entry| ids.contains(&entry.name_id))
            .find_map(|entry| entry.to_string());
        if let Some(name) = found {
            names.push(name);
        }
    }
    if let Some(stem) = source_name.filter(|s| !s.is_empty()) {
        names.push(stem.to_string());
    }
    names.dedup();
    names
}

fn name_key(name: &str) -> String {
    name.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_ascii_lowercase()
}
