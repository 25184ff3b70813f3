//! Decodes synthetic documents at full resolution and as previews.

mod common;

use std::io::Cursor;
use psd_composite::prelude::*;
use psd_composite::color::CmykTuning;
use common::*;


#[test]
fn rgb_pixels_survive_all_compressions(){
    for version in [1, 2] {
        for compression in ALL_COMPRESSIONS {
            let bytes = PsdBuilder::new(MODE_RGB, 37, 23, 3, pattern)
                .with_version(version).with_compression(compression)
                .build();

            let image = decode(bytes, plain_options()).unwrap();
            assert_eq!(image.surface.size, Vec2(37, 23));

            for y in 0 .. 23 {
                for x in 0 .. 37 {
                    assert_eq!(
                        image.surface.pixel(Vec2(x, y)),
                        [pattern(0, x, y), pattern(1, x, y), pattern(2, x, y), 255],
                        "version {} compression {} at {}, {}", version, compression, x, y
                    );
                }
            }
        }
    }
}

#[test]
fn metadata_names_the_compression(){
    let names = ["Raw", "RLE", "ZIP", "ZIP with prediction"];

    for (compression, name) in ALL_COMPRESSIONS.into_iter().zip(names) {
        let bytes = PsdBuilder::new(MODE_RGB, 4, 4, 3, pattern).with_compression(compression).build();
        let image = decode(bytes, plain_options()).unwrap();

        assert_eq!(image.metadata.compression_name(), name);
        assert_eq!(image.metadata.embedded_profile_name, None);
        assert_eq!(image.metadata.effective_profile_name, None);
    }
}

#[test]
fn default_format_is_premultiplied_bgra(){
    let sample = |channel: usize, _: usize, _: usize| [200, 100, 50, 128][channel];
    let bytes = PsdBuilder::new(MODE_RGB, 2, 2, 4, sample).with_compression(RLE).build();

    let image = decode(bytes, DecodeOptions::default().with_color_management(false)).unwrap();
    assert_eq!(image.surface.format, SurfaceFormat::default());
    assert_eq!(image.surface.pixel(Vec2(1, 1)), [25, 50, 100, 128]);
    assert_eq!(image.surface.rgba(Vec2(1, 1)), [100, 50, 25, 128]);
}

#[test]
fn spot_channels_are_not_decoded(){
    // red, green, blue, alpha, and one spot channel that must be ignored
    let sample = |channel: usize, x: usize, _: usize| match channel {
        3 => 255,
        4 => 7,
        _ => (x * 10 + channel) as u8,
    };

    for compression in ALL_COMPRESSIONS {
        let bytes = PsdBuilder::new(MODE_RGB, 5, 3, 5, sample).with_compression(compression).build();
        let image = decode(bytes, plain_options()).unwrap();
        assert_eq!(image.surface.pixel(Vec2(4, 2)), [40, 41, 42, 255]);
    }
}

#[test]
fn cmyk_white_and_black(){
    // stored values are inverted ink: 255 is no ink
    let sample = |channel: usize, x: usize, _: usize| match (channel, x) {
        (_, 0) => 255,
        (3, 1) => 0,
        _ => 255,
    };

    let options = plain_options().with_cmyk_tuning(CmykTuning::disabled());

    for compression in ALL_COMPRESSIONS {
        let bytes = PsdBuilder::new(MODE_CMYK, 2, 1, 4, sample).with_compression(compression).build();
        let image = decode(bytes, options.clone()).unwrap();

        assert_eq!(image.surface.pixel(Vec2(0, 0)), [255, 255, 255, 255]);
        assert_eq!(image.surface.pixel(Vec2(1, 0)), [0, 0, 0, 255]);
    }
}

#[test]
fn cmyk_tuning_changes_neutrals(){
    let bytes = PsdBuilder::new(MODE_CMYK, 1, 1, 4, |_, _, _| 128).build();

    let plain = decode(bytes.clone(), plain_options().with_cmyk_tuning(CmykTuning::disabled())).unwrap();
    let tuned = decode(bytes, plain_options()).unwrap();

    // (128 * 128 + 127) / 255
    assert_eq!(plain.surface.pixel(Vec2(0, 0)), [64, 64, 64, 255]);
    assert_ne!(tuned.surface.pixel(Vec2(0, 0)), plain.surface.pixel(Vec2(0, 0)));

    let [red, green, blue, _] = tuned.surface.pixel(Vec2(0, 0));
    assert!(red > blue && blue > green);
}

#[test]
fn indexed_single_pixel(){
    let mut palette = vec![0_u8; 768];
    palette[5] = 10;
    palette[256 + 5] = 20;
    palette[512 + 5] = 30;

    for compression in ALL_COMPRESSIONS {
        let bytes = PsdBuilder::new(MODE_INDEXED, 1, 1, 1, |_, _, _| 5)
            .with_color_mode_data(palette.clone())
            .with_compression(compression)
            .build();

        let image = decode(bytes, plain_options()).unwrap();
        assert_eq!(image.surface.size, Vec2(1, 1));
        assert_eq!(image.surface.pixel(Vec2(0, 0)), [10, 20, 30, 255]);
    }
}

#[test]
fn indexed_palette_override(){
    let mut palette = vec![0_u8; 768];
    palette[9] = 1;
    palette[256 + 9] = 2;
    palette[512 + 9] = 3;

    let bytes = PsdBuilder::new(MODE_INDEXED, 1, 1, 1, |_, _, _| 9)
        .with_color_mode_data(vec![255; 768])
        .build();

    let image = decode(bytes, plain_options().with_palette(palette)).unwrap();
    assert_eq!(image.surface.pixel(Vec2(0, 0)), [1, 2, 3, 255]);
}

#[test]
fn preview_fits_and_keeps_aspect(){
    let builder = PsdBuilder::new(MODE_RGB, 300, 200, 3, pattern);

    for compression in ALL_COMPRESSIONS {
        let bytes = builder.clone().with_compression(compression).build();
        let (document, mut reader) = open(bytes);
        let decoder = CompositeDecoder::new(plain_options());

        let preview = document.decode_preview(&mut reader, &decoder, Vec2(64, 64), &CancelToken::new()).unwrap();
        assert_eq!(preview.surface.size, Vec2(64, 42));

        // nearest neighbour: target 10 maps to source 10 * 300 / 64
        let source = Vec2(10 * 300 / 64, 5 * 200 / 42);
        assert_eq!(
            preview.surface.pixel(Vec2(10, 5)),
            [pattern(0, source.x(), source.y()), pattern(1, source.x(), source.y()), pattern(2, source.x(), source.y()), 255]
        );
    }
}

#[test]
fn preview_never_upsamples(){
    let bytes = PsdBuilder::new(MODE_RGB, 12, 9, 3, pattern).with_compression(RLE).build();
    let (document, mut reader) = open(bytes);
    let decoder = CompositeDecoder::new(plain_options());

    let preview = document.decode_preview(&mut reader, &decoder, Vec2(1000, 1000), &CancelToken::new()).unwrap();
    assert_eq!(preview.surface.size, Vec2(12, 9));
    assert_eq!(preview.surface.pixel(Vec2(11, 8)), [pattern(0, 11, 8), pattern(1, 11, 8), pattern(2, 11, 8), 255]);
}

#[test]
fn cancellation_after_some_rows(){
    let bytes = PsdBuilder::new(MODE_RGB, 64, 64, 3, pattern).with_compression(RLE).build();
    let (document, mut reader) = open(bytes);

    let cancel = CancelToken::new();
    let mut rows_seen = 0;

    let result = {
        let token = cancel.clone();
        let mut progress = |done: usize, total: usize| {
            assert_eq!(total, 3 * 64);
            rows_seen = done;
            if done == 10 { token.cancel(); }
        };

        CompositeDecoder::new(plain_options()).decode(&mut reader, &document, &cancel, Some(&mut progress))
    };

    assert!(matches!(result, Err(Error::Aborted)));
    assert_eq!(rows_seen, 10);
}

#[test]
fn progress_reaches_total(){
    let bytes = PsdBuilder::new(MODE_RGB, 8, 5, 4, pattern).with_compression(ZIP).build();
    let (document, mut reader) = open(bytes);

    let mut last = (0, 0);
    let mut progress = |done: usize, total: usize| last = (done, total);

    CompositeDecoder::new(plain_options())
        .decode(&mut reader, &document, &CancelToken::new(), Some(&mut progress))
        .unwrap();

    assert_eq!(last, (20, 20));
}

#[test]
fn surface_limit_is_checked_before_decoding(){
    let bytes = PsdBuilder::new(MODE_RGB, 100, 100, 3, pattern).build();
    let result = decode(bytes, plain_options().with_max_surface_bytes(100 * 100 * 4 - 1));

    match result {
        Err(Error::TooLarge { required, limit }) => {
            assert_eq!(required, 40_000);
            assert_eq!(limit, 39_999);
        },
        other => panic!("expected a size error, got {:?}", other.map(|image| image.surface.size)),
    }
}

#[test]
fn unsupported_modes_and_depths(){
    let bytes = PsdBuilder::new(MODE_GRAYSCALE, 4, 4, 1, pattern).build();
    assert!(matches!(decode(bytes, plain_options()), Err(Error::NotSupported(_))));

    let mut builder = PsdBuilder::new(MODE_RGB, 4, 4, 3, pattern);
    builder.depth = 16;
    builder.planes.iter_mut().for_each(|plane| plane.extend(plane.clone()));
    assert!(matches!(decode(builder.build(), plain_options()), Err(Error::NotSupported(_))));
}

#[test]
fn header_probe_without_seeking(){
    let bytes = PsdBuilder::new(MODE_CMYK, 30, 20, 5, pattern).with_version(2).build();

    let header = Document::read_header(&bytes[..]).unwrap();
    assert_eq!(header.size, Vec2(30, 20));
    assert_eq!(header.channel_count, 5);
    assert!(header.version.is_large());
}

#[test]
fn structural_errors(){
    let valid = PsdBuilder::new(MODE_RGB, 4, 4, 3, pattern).build();

    let mut bad_signature = valid.clone();
    bad_signature[0] = b'9';
    assert!(matches!(Document::read_header(&bad_signature[..]), Err(Error::Invalid(_))));

    let mut bad_version = valid.clone();
    bad_version[5] = 3;
    assert!(matches!(Document::read_header(&bad_version[..]), Err(Error::NotSupported(_))));

    let mut no_channels = valid.clone();
    no_channels[12 .. 14].copy_from_slice(&0_u16.to_be_bytes());
    assert!(matches!(Document::read_header(&no_channels[..]), Err(Error::Invalid(_))));

    let mut too_many_channels = valid;
    too_many_channels[12 .. 14].copy_from_slice(&57_u16.to_be_bytes());
    assert!(matches!(Document::read_header(&too_many_channels[..]), Err(Error::Invalid(_))));
}

#[test]
fn truncated_resources_fail_before_decoding(){
    let bytes = PsdBuilder::new(MODE_RGB, 4, 4, 3, pattern)
        .with_resource(1000, vec![1, 2, 3])
        .build();

    // the resource section length follows the header and the empty color mode data
    let length_offset = 26 + 4;
    let mut truncated = bytes[.. length_offset].to_vec();
    truncated.extend_from_slice(&10_000_u32.to_be_bytes());
    truncated.extend_from_slice(&bytes[length_offset + 4 .. length_offset + 4 + 12]);

    let mut reader = PsdReader::new(Cursor::new(truncated)).unwrap();
    match Document::read(&mut reader) {
        Err(Error::Invalid(message)) => assert!(message.contains("image resources"), "{}", message),
        other => panic!("expected a structural error, got {:?}", other.map(|document| document.header)),
    }
}

#[test]
fn corrupt_row_table_is_rejected_upfront(){
    let mut bytes = PsdBuilder::new(MODE_RGB, 4, 4, 3, pattern).with_compression(RLE).build();

    // first table entry follows the header, three empty section lengths and the compression tag
    let table_offset = 26 + 4 + 4 + 4 + 2;
    bytes[table_offset] = 0x7F;

    assert!(matches!(decode(bytes.clone(), plain_options()), Err(Error::Invalid(_))));
    assert!(decode(bytes, plain_options().with_payload_validation(false)).is_err());
}
