//! Minimal ISO-BMFF reader that pulls the EXIF item out of a HEIC file.
//!
//! Walks just enough of the box tree to find it:
//! - `meta` (full box) at the top level
//! - `iinf` → `infe` entries, looking for item type `Exif`
//! - `iloc` for that item's extents (file offsets, or offsets into `idat`)
//!
//! The item body starts with a 4-byte big-endian offset to the TIFF header.
//! The bytes between are usually `Exif\0\0`. The result is normalised to an
//! APP1 payload (`Exif\0\0` + TIFF) so it can be spliced into a JPEG as is.
//!
//! Zero external dependencies.

use super::exif::{ExifSegment, MAX_PAYLOAD};
use thiserror::Error;

const EXIF_HEADER: &[u8] = b"Exif\0\0";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeifExifError {
    #[error("no 'meta' box found")]
    NoMeta,
    #[error("no Exif item in the file")]
    NoExifItem,
    #[error("Exif item {0} has no location")]
    NoLocation(u32),
    #[error("truncated or malformed '{0}' box")]
    Malformed(&'static str),
    #[error("unsupported iloc construction method {0}")]
    UnsupportedConstruction(u16),
    #[error("EXIF block of {0} bytes does not fit in a JPEG segment")]
    TooLarge(usize),
}

/// Extract the EXIF block of a HEIC file as an APP1 payload.
pub fn extract_heic_exif(data: &[u8]) -> Result<ExifSegment, HeifExifError> {
    let meta = boxes(data)
        .find(|b| &b.kind == b"meta")
        .ok_or(HeifExifError::NoMeta)?;
    let meta_children = meta
        .body
        .get(4..)
        .ok_or(HeifExifError::Malformed("meta"))?;

    let mut exif_id = None;
    let mut locations = Vec::new();
    let mut idat: &[u8] = &[];
    for child in boxes(meta_children) {
        match &child.kind {
            b"iinf" => exif_id = find_exif_item(child.body)?,
            b"iloc" => locations = parse_iloc(child.body)?,
            b"idat" => idat = child.body,
            _ => {}
        }
    }

    let id = exif_id.ok_or(HeifExifError::NoExifItem)?;
    let location = locations
        .into_iter()
        .find(|l| l.item_id == id)
        .ok_or(HeifExifError::NoLocation(id))?;

    let source = match location.construction_method {
        0 => data,
        1 => idat,
        other => return Err(HeifExifError::UnsupportedConstruction(other)),
    };

    let mut item = Vec::new();
    for &(offset, length) in &location.extents {
        let start = location
            .base_offset
            .checked_add(offset)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or(HeifExifError::Malformed("iloc"))?;
        // A zero length extent runs to the end of the source
        let end = if length == 0 {
            source.len()
        } else {
            usize::try_from(length)
                .ok()
                .and_then(|len| start.checked_add(len))
                .ok_or(HeifExifError::Malformed("iloc"))?
        };
        let bytes = source
            .get(start..end)
            .ok_or(HeifExifError::Malformed("iloc"))?;
        item.extend_from_slice(bytes);
    }

    let payload = app1_payload(&item)?;
    let len = payload.len();
    ExifSegment::new(payload).ok_or(HeifExifError::TooLarge(len))
}

/// Turn an Exif item body into `Exif\0\0` + TIFF.
fn app1_payload(item: &[u8]) -> Result<Vec<u8>, HeifExifError> {
    let mut reader = Reader::new(item, "Exif");
    let tiff_offset = reader.u32()? as usize;
    let rest = reader.rest();

    if rest.starts_with(EXIF_HEADER) {
        return Ok(rest.to_vec());
    }
    let tiff = rest
        .get(tiff_offset..)
        .ok_or(HeifExifError::Malformed("Exif"))?;
    if tiff.len() + EXIF_HEADER.len() > MAX_PAYLOAD {
        return Err(HeifExifError::TooLarge(tiff.len() + EXIF_HEADER.len()));
    }
    let mut payload = EXIF_HEADER.to_vec();
    payload.extend_from_slice(tiff);
    Ok(payload)
}

/// Item id of the first `infe` whose type is `Exif`.
fn find_exif_item(iinf: &[u8]) -> Result<Option<u32>, HeifExifError> {
    let mut reader = Reader::new(iinf, "iinf");
    let version = reader.u8()?;
    reader.skip(3)?;
    if version == 0 {
        reader.u16()?;
    } else {
        reader.u32()?;
    }

    for entry in boxes(reader.rest()).filter(|b| &b.kind == b"infe") {
        let mut infe = Reader::new(entry.body, "infe");
        let version = infe.u8()?;
        infe.skip(3)?;
        // Versions 0 and 1 predate item types
        if version < 2 {
            continue;
        }
        let item_id = if version == 2 {
            infe.u16()? as u32
        } else {
            infe.u32()?
        };
        infe.u16()?; // protection index
        if infe.take(4)? == b"Exif" {
            return Ok(Some(item_id));
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ItemLocation {
    item_id: u32,
    construction_method: u16,
    base_offset: u64,
    /// (offset, length) pairs.
    extents: Vec<(u64, u64)>,
}

fn parse_iloc(iloc: &[u8]) -> Result<Vec<ItemLocation>, HeifExifError> {
    let mut r = Reader::new(iloc, "iloc");
    let version = r.u8()?;
    r.skip(3)?;

    let sizes = r.u16()?;
    let offset_size = (sizes >> 12) as usize;
    let length_size = ((sizes >> 8) & 0xF) as usize;
    let base_offset_size = ((sizes >> 4) & 0xF) as usize;
    let index_size = if version >= 1 {
        (sizes & 0xF) as usize
    } else {
        0
    };

    let item_count = if version < 2 {
        r.u16()? as u32
    } else {
        r.u32()?
    };

    let mut items = Vec::with_capacity(item_count.min(1024) as usize);
    for _ in 0..item_count {
        let item_id = if version < 2 {
            r.u16()? as u32
        } else {
            r.u32()?
        };
        let construction_method = if version >= 1 { r.u16()? & 0xF } else { 0 };
        r.u16()?; // data reference index
        let base_offset = r.sized(base_offset_size)?;
        let extent_count = r.u16()?;

        let mut extents = Vec::with_capacity(extent_count as usize);
        for _ in 0..extent_count {
            if index_size > 0 {
                r.sized(index_size)?;
            }
            let offset = r.sized(offset_size)?;
            let length = r.sized(length_size)?;
            extents.push((offset, length));
        }

        items.push(ItemLocation {
            item_id,
            construction_method,
            base_offset,
            extents,
        });
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// Box iteration and bounds-checked reading
// ---------------------------------------------------------------------------

struct BmffBox<'a> {
    kind: [u8; 4],
    body: &'a [u8],
}

/// Iterate sibling boxes. Stops at the first malformed header.
fn boxes(data: &[u8]) -> impl Iterator<Item = BmffBox<'_>> {
    let mut rest = data;
    std::iter::from_fn(move || {
        let mut r = Reader::new(rest, "box");
        let size = r.u32().ok()? as u64;
        let kind: [u8; 4] = r.take(4).ok()?.try_into().ok()?;
        let (header, total) = match size {
            0 => (8, rest.len() as u64),
            1 => (16, r.u64().ok()?),
            n => (8, n),
        };
        let total = usize::try_from(total).ok()?;
        if total < header || total > rest.len() {
            return None;
        }
        let body = &rest[header..total];
        rest = &rest[total..];
        Some(BmffBox { kind, body })
    })
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    context: &'static str,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], context: &'static str) -> Self {
        Self {
            data,
            pos: 0,
            context,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], HeifExifError> {
        let bytes = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or(HeifExifError::Malformed(self.context))?;
        self.pos += n;
        Ok(bytes)
    }

    fn skip(&mut self, n: usize) -> Result<(), HeifExifError> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8, HeifExifError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, HeifExifError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, HeifExifError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, HeifExifError> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Big-endian integer of 0, 4 or 8 bytes, as iloc field sizes allow.
    fn sized(&mut self, size: usize) -> Result<u64, HeifExifError> {
        match size {
            0 => Ok(0),
            4 => self.u32().map(u64::from),
            8 => self.u64(),
            _ => Err(HeifExifError::Malformed(self.context)),
        }
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }
}
