//! The layer and mask information section.
//! Layer pixels are not decoded, only the extents of the sub-blocks are recorded,
//! which is enough to find the composite image data behind this section.

use crate::io::*;
use crate::error::*;
use super::Version;


/// Signature of additional information blocks.
pub const BLOCK_SIGNATURE: FourCC = FourCC::new(b"8BIM");

/// Alternative signature of additional information blocks.
pub const LARGE_BLOCK_SIGNATURE: FourCC = FourCC::new(b"8B64");

/// Keys whose additional information length is 8 bytes wide in large documents.
pub const WIDE_LENGTH_KEYS: [FourCC; 13] = [
    FourCC::new(b"LMsk"), FourCC::new(b"Lr16"), FourCC::new(b"Lr32"),
    FourCC::new(b"Layr"), FourCC::new(b"Mt16"), FourCC::new(b"Mt32"),
    FourCC::new(b"Mtrn"), FourCC::new(b"Alph"), FourCC::new(b"FMsk"),
    FourCC::new(b"lnk2"), FourCC::new(b"FEid"), FourCC::new(b"FXid"),
    FourCC::new(b"PxSD"),
];


/// Summary of the layer info block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerInfo {

    /// Absolute position of the block contents.
    pub offset: usize,

    /// Number of bytes in the block, without the length prefix.
    pub length: usize,

    /// Raw layer count. Negative if the first alpha channel holds the merged transparency.
    pub layer_count: i16,
}

impl LayerInfo {

    /// Number of layers in the document.
    pub fn layer_count(&self) -> usize {
        self.layer_count.unsigned_abs() as usize
    }

    /// Whether the first alpha channel contains the transparency of the merged result.
    pub fn has_merged_alpha(&self) -> bool {
        self.layer_count < 0
    }

    fn read(reader: &mut PsdReader<impl Read + Seek>, section_end: usize, version: Version) -> Result<Self> {
        let length = version.read_length(reader)?;
        let offset = reader.position();
        let end = offset.checked_add(length).ok_or_else(|| Error::invalid("layer info length"))?;

        if end > section_end {
            return Err(Error::invalid("layer info exceeds the layer and mask section"));
        }

        let layer_count = if length >= 2 { reader.read_i16()? } else { 0 };
        reader.seek_to(end)?;

        Ok(LayerInfo { offset, length, layer_count })
    }
}


/// Location of the global layer mask block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalLayerMask {

    /// Absolute position of the block contents.
    pub offset: usize,

    /// Number of bytes in the block.
    pub length: usize,
}

impl GlobalLayerMask {
    fn read(reader: &mut PsdReader<impl Read + Seek>, section_end: usize) -> Result<Self> {
        let length = reader.read_u32()? as usize;
        let offset = reader.position();

        if offset + length > section_end {
            return Err(Error::invalid("global layer mask exceeds the layer and mask section"));
        }

        reader.skip(length)?;
        Ok(GlobalLayerMask { offset, length })
    }
}


/// Location of one tagged additional information block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdditionalInfo {

    /// Either `8BIM` or `8B64`.
    pub signature: FourCC,

    /// What kind of information the block contains, for example `lnk2`.
    pub key: FourCC,

    /// Absolute position of the block contents.
    pub offset: usize,

    /// Number of bytes in the block, without padding.
    pub length: usize,
}

impl AdditionalInfo {

    /// Whether the length field of this key is 8 bytes wide in the specified version.
    pub fn has_wide_length(key: FourCC, version: Version) -> bool {
        version.is_large() && WIDE_LENGTH_KEYS.contains(&key)
    }

    /// Read blocks until the section ends or a block without a valid signature starts.
    fn read_all(reader: &mut PsdReader<impl Read + Seek>, section_end: usize, version: Version) -> Result<Vec<Self>> {
        let mut blocks = Vec::new();

        while reader.position() + 8 <= section_end {
            let signature = reader.read_four_cc()?;
            if signature != BLOCK_SIGNATURE && signature != LARGE_BLOCK_SIGNATURE {
                break;
            }

            let key = reader.read_four_cc()?;
            let wide = Self::has_wide_length(key, version);
            let field_size = if wide { 8 } else { 4 };

            if reader.position() + field_size > section_end {
                return Err(Error::invalid(format!("truncated length of additional layer information {}", key)));
            }

            let length = if wide { u64_to_usize(reader.read_u64()?, "additional layer information length")? }
                else { reader.read_u32()? as usize };

            let offset = reader.position();
            if length > section_end - offset {
                return Err(Error::invalid(format!("additional layer information {} exceeds section bounds", key)));
            }

            let padding = length & 1;
            if offset + length + padding > section_end {
                return Err(Error::invalid("additional layer information padding exceeds section bounds"));
            }

            reader.skip(length + padding)?;
            blocks.push(AdditionalInfo { signature, key, offset, length });
        }

        Ok(blocks)
    }
}


/// Summary of the layer and mask information section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerAndMaskInfo {

    /// Absolute position of the section contents.
    pub offset: usize,

    /// Number of bytes in the section, without the length prefix. Zero if empty.
    pub length: usize,

    /// Summary of the layer records.
    pub layer_info: LayerInfo,

    /// Location of the global mask, if present.
    pub global_mask: Option<GlobalLayerMask>,

    /// Tagged blocks behind the global mask.
    pub additional: Vec<AdditionalInfo>,
}

impl LayerAndMaskInfo {

    /// Read the section and leave the reader at its end,
    /// which is where the composite image data starts.
    pub fn read(reader: &mut PsdReader<impl Read + Seek>, version: Version) -> Result<Self> {
        let length = version.read_length(reader)?;
        let offset = reader.position();
        let end = offset.checked_add(length).ok_or_else(|| Error::invalid("layer and mask section length"))?;

        reader.ensure_within_stream(end, "layer and mask section")?;

        if length == 0 {
            return Ok(LayerAndMaskInfo { offset, ..Default::default() });
        }

        let layer_info = LayerInfo::read(reader, end, version)?;
        let mut global_mask = None;
        let mut additional = Vec::new();

        if reader.position() + 4 <= end {
            global_mask = Some(GlobalLayerMask::read(reader, end)?);
            additional = AdditionalInfo::read_all(reader, end, version)?;
        }

        if reader.position() > end {
            return Err(Error::invalid("layer and mask section is misaligned"));
        }

        reader.seek_to(end)?;

        log::debug!(
            "layer and mask section: {} bytes, {} layers, {} additional blocks",
            length, layer_info.layer_count(), additional.len()
        );

        Ok(LayerAndMaskInfo { offset, length, layer_info, global_mask, additional })
    }
}
