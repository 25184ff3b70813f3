//! The image resources section: tagged blocks of document-wide information,
//! such as the embedded color profile.
//! Only the location of each block is kept, the contents are read on demand.

use crate::io::*;
use crate::error::*;


/// Signature of every image resource block.
pub const RESOURCE_SIGNATURE: FourCC = FourCC::new(b"8BIM");

/// Resource id of the embedded ICC profile.
pub const ICC_PROFILE_RESOURCE_ID: u16 = 0x040F;


/// Describes one resource block without its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBlock {

    /// Numeric identifier, for example `ICC_PROFILE_RESOURCE_ID`.
    pub id: u16,

    /// Usually empty.
    pub name: String,

    /// Absolute position of the first data byte.
    pub data_offset: usize,

    /// Number of data bytes, without padding.
    pub data_length: usize,
}

impl ResourceBlock {

    /// Read the contents of this block from the stream.
    /// The bytes are not cached; every call reads them again.
    pub fn read_bytes(&self, reader: &mut PsdReader<impl Read + Seek>) -> Result<Vec<u8>> {
        reader.seek_to(self.data_offset)?;
        reader.read_byte_vec(self.data_length)
    }
}


/// All resource blocks, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageResources {

    /// Absolute position of the first block.
    pub offset: usize,

    /// Number of bytes in the section, without the length prefix.
    pub length: usize,

    /// The blocks in the order they appear in the file.
    pub blocks: Vec<ResourceBlock>,
}

impl ImageResources {

    /// Read all block headers, skipping their contents.
    /// Fails if a block claims more bytes than the section holds.
    pub fn read(reader: &mut PsdReader<impl Read + Seek>) -> Result<Self> {
        let length = reader.read_u32()? as usize;
        let offset = reader.position();
        let end = offset + length;

        reader.ensure_within_stream(end, "image resources section")?;

        let mut blocks = Vec::new();

        while reader.position() < end {
            reader.expect_signature(RESOURCE_SIGNATURE)?;

            let id = reader.read_u16()?;
            let name = reader.read_pascal_string(2)?;
            let data_length = reader.read_u32()? as usize;
            let data_offset = reader.position();

            if data_length > end.saturating_sub(data_offset) {
                return Err(Error::invalid(format!("image resource block {} exceeds section bounds", id)));
            }

            reader.skip(data_length + (data_length & 1))?;
            blocks.push(ResourceBlock { id, name, data_offset, data_length });
        }

        if reader.position() != end {
            return Err(Error::invalid("image resources section is misaligned"));
        }

        Ok(ImageResources { offset, length, blocks })
    }

    /// The first block with the specified id.
    pub fn find(&self, id: u16) -> Option<&ResourceBlock> {
        self.blocks.iter().find(|block| block.id == id)
    }

    /// The embedded ICC profile block, if any.
    pub fn icc_profile(&self) -> Option<&ResourceBlock> {
        self.find(ICC_PROFILE_RESOURCE_ID)
    }
}
