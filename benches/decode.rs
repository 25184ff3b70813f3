#[macro_use]
extern crate bencher;

extern crate psd_composite;
use psd_composite::prelude::*;

use bencher::Bencher;
use std::io::Cursor;

#[path = "../tests/common/mod.rs"]
mod common;
use common::*;


fn document(mode: u16, channels: usize, compression: u16) -> Vec<u8> {
    PsdBuilder::new(mode, 2048, 1024, channels, pattern).with_compression(compression).build()
}

fn decode_full(bench: &mut Bencher, bytes: Vec<u8>, options: DecodeOptions) {
    let decoder = CompositeDecoder::new(options);

    bench.iter(||{
        let mut reader = PsdReader::new(Cursor::new(bytes.as_slice())).unwrap();
        let document = Document::read(&mut reader).unwrap();
        let image = decoder.decode(&mut reader, &document, &CancelToken::new(), None).unwrap();
        bencher::black_box(image);
    })
}

/// Raw planes, only interleaving
fn decode_rgb_raw(bench: &mut Bencher) {
    decode_full(bench, document(MODE_RGB, 4, RAW), DecodeOptions::default().with_color_management(false));
}

/// Packed rows
fn decode_rgb_rle(bench: &mut Bencher) {
    decode_full(bench, document(MODE_RGB, 4, RLE), DecodeOptions::default().with_color_management(false));
}

/// One zlib stream with the delta filter
fn decode_rgb_zip_prediction(bench: &mut Bencher) {
    decode_full(bench, document(MODE_RGB, 3, ZIP_PREDICTION), DecodeOptions::default().with_color_management(false));
}

/// Uncalibrated cmyk with the gamma and neutral corrections
fn decode_cmyk_tuned(bench: &mut Bencher) {
    decode_full(bench, document(MODE_CMYK, 4, RLE), DecodeOptions::default().with_color_management(false));
}

/// Nearest neighbour preview, skipping most packed rows
fn decode_preview_rle(bench: &mut Bencher) {
    let bytes = document(MODE_RGB, 4, RLE);
    let decoder = CompositeDecoder::new(DecodeOptions::default().with_color_management(false));

    bench.iter(||{
        let mut reader = PsdReader::new(Cursor::new(bytes.as_slice())).unwrap();
        let document = Document::read(&mut reader).unwrap();
        let image = decoder.decode_preview(&mut reader, &document, Vec2(256, 256), &CancelToken::new()).unwrap();
        bencher::black_box(image);
    })
}

/// All tiles, center band first
fn fill_tiles_rle(bench: &mut Bencher) {
    let bytes = document(MODE_RGB, 4, RLE);
    let decoder = CompositeDecoder::new(DecodeOptions::default().with_color_management(false));

    bench.iter(||{
        let mut reader = PsdReader::new(Cursor::new(bytes.as_slice())).unwrap();
        let document = Document::read(&mut reader).unwrap();
        let mut tiled = decoder.create_tiled(&document, TileEdge::Hint(512)).unwrap();
        decoder.fill_tiles(&mut reader, &document, &mut tiled, None, &CancelToken::new(), &mut |_, _| {}).unwrap();
        bencher::black_box(tiled);
    })
}

benchmark_group!(benches,
    decode_rgb_raw,
    decode_rgb_rle,
    decode_rgb_zip_prediction,
    decode_cmyk_tuned,
    decode_preview_rle,
    fill_tiles_rle
);

benchmark_main!(benches);
