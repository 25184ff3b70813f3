//! Writes small synthetic documents for the integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use psd_composite::prelude::*;


pub const RAW: u16 = 0;
pub const RLE: u16 = 1;
pub const ZIP: u16 = 2;
pub const ZIP_PREDICTION: u16 = 3;

pub const ALL_COMPRESSIONS: [u16; 4] = [RAW, RLE, ZIP, ZIP_PREDICTION];

pub const MODE_INDEXED: u16 = 2;
pub const MODE_RGB: u16 = 3;
pub const MODE_CMYK: u16 = 4;
pub const MODE_GRAYSCALE: u16 = 1;


/// The contents of a document, to be serialized with `build`.
#[derive(Debug, Clone)]
pub struct PsdBuilder {
    pub version: u16,
    pub width: usize,
    pub height: usize,
    pub depth: u16,
    pub color_mode: u16,
    pub planes: Vec<Vec<u8>>,
    pub color_mode_data: Vec<u8>,
    pub resources: Vec<(u16, Vec<u8>)>,
    pub compression: u16,
}

impl PsdBuilder {

    /// A document with one plane per channel, each filled by `sample(channel, x, y)`.
    pub fn new(color_mode: u16, width: usize, height: usize, channels: usize, sample: impl Fn(usize, usize, usize) -> u8) -> Self {
        let planes = (0 .. channels)
            .map(|channel| {
                (0 .. height).flat_map(|y| (0 .. width).map(move |x| (x, y)))
                    .map(|(x, y)| sample(channel, x, y))
                    .collect()
            })
            .collect();

        PsdBuilder {
            version: 1, width, height, depth: 8, color_mode, planes,
            color_mode_data: Vec::new(),
            resources: Vec::new(),
            compression: RAW,
        }
    }

    pub fn with_compression(mut self, compression: u16) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn with_resource(mut self, id: u16, data: Vec<u8>) -> Self {
        self.resources.push((id, data));
        self
    }

    pub fn with_color_mode_data(mut self, data: Vec<u8>) -> Self {
        self.color_mode_data = data;
        self
    }

    fn row(&self, channel: usize, y: usize) -> &[u8] {
        &self.planes[channel][y * self.width .. (y + 1) * self.width]
    }

    fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0 .. self.planes.len()).flat_map(move |channel| (0 .. self.height).map(move |y| self.row(channel, y)))
    }

    pub fn resource_section(&self) -> Vec<u8> {
        let mut section = Vec::new();

        for (id, data) in &self.resources {
            section.extend_from_slice(b"8BIM");
            section.extend_from_slice(&id.to_be_bytes());
            section.extend_from_slice(&[0, 0]); // empty name, padded
            section.extend_from_slice(&(data.len() as u32).to_be_bytes());
            section.extend_from_slice(data);
            if data.len() % 2 == 1 { section.push(0); }
        }

        section
    }

    pub fn payload(&self) -> Vec<u8> {
        match self.compression {
            RAW => self.rows().flatten().copied().collect(),

            RLE => {
                let packed: Vec<Vec<u8>> = self.rows().map(pack_bits).collect();
                let mut payload = Vec::new();

                for row in &packed {
                    if self.version == 1 { payload.extend_from_slice(&(row.len() as u16).to_be_bytes()); }
                    else { payload.extend_from_slice(&(row.len() as u32).to_be_bytes()); }
                }

                payload.extend(packed.concat());
                payload
            },

            ZIP | ZIP_PREDICTION => {
                let mut raw = Vec::new();

                for row in self.rows() {
                    let mut row = row.to_vec();
                    if self.compression == ZIP_PREDICTION { apply_prediction(&mut row); }
                    raw.extend(row);
                }

                miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6)
            },

            other => panic!("unknown compression {}", other),
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = b"8BPS".to_vec();
        bytes.extend_from_slice(&self.version.to_be_bytes());
        bytes.extend_from_slice(&[0; 6]);
        bytes.extend_from_slice(&(self.planes.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&(self.height as u32).to_be_bytes());
        bytes.extend_from_slice(&(self.width as u32).to_be_bytes());
        bytes.extend_from_slice(&self.depth.to_be_bytes());
        bytes.extend_from_slice(&self.color_mode.to_be_bytes());

        bytes.extend_from_slice(&(self.color_mode_data.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.color_mode_data);

        let resources = self.resource_section();
        bytes.extend_from_slice(&(resources.len() as u32).to_be_bytes());
        bytes.extend(resources);

        // empty layer and mask section
        if self.version == 1 { bytes.extend_from_slice(&0_u32.to_be_bytes()); }
        else { bytes.extend_from_slice(&0_u64.to_be_bytes()); }

        bytes.extend_from_slice(&self.compression.to_be_bytes());
        bytes.extend(self.payload());
        bytes
    }
}


/// Read the sections of serialized document bytes.
pub fn open(bytes: Vec<u8>) -> (Document, PsdReader<Cursor<Vec<u8>>>) {
    let mut reader = PsdReader::new(Cursor::new(bytes)).unwrap();
    let document = Document::read(&mut reader).unwrap();
    (document, reader)
}

/// Options that produce raw red, green, blue and alpha bytes.
pub fn plain_options() -> DecodeOptions {
    DecodeOptions::default()
        .with_format(SurfaceFormat::new(PixelFormat::Rgba8888, AlphaType::Straight))
        .with_color_management(false)
}

pub fn decode(bytes: Vec<u8>, options: DecodeOptions) -> Result<DecodedImage> {
    let (document, mut reader) = open(bytes);
    CompositeDecoder::new(options).decode(&mut reader, &document, &CancelToken::new(), None)
}


/// A straightforward PackBits encoder.
pub fn pack_bits(row: &[u8]) -> Vec<u8> {
    let mut packed = Vec::new();
    let mut index = 0;

    while index < row.len() {
        let run = row[index ..].iter().take(128).take_while(|&&byte| byte == row[index]).count();

        if run >= 2 {
            packed.push((1 - run as i16) as i8 as u8);
            packed.push(row[index]);
            index += run;
        }
        else {
            let start = index;
            index += 1;

            while index < row.len() && index - start < 128 && !(index + 1 < row.len() && row[index] == row[index + 1]) {
                index += 1;
            }

            packed.push((index - start - 1) as u8);
            packed.extend_from_slice(&row[start .. index]);
        }
    }

    packed
}

/// Replace every byte by its difference to the left neighbour.
pub fn apply_prediction(row: &mut [u8]) {
    for x in (1 .. row.len()).rev() {
        row[x] = row[x].wrapping_sub(row[x - 1]);
    }
}

/// A value that changes with every coordinate, for recognizable images.
pub fn pattern(channel: usize, x: usize, y: usize) -> u8 {
    (channel * 71 + x * 13 + y * 7 + (x * y) % 5) as u8
}
