//! Loads documents with a preview first and full resolution tiles in the background.

#![cfg(feature = "rayon")]

mod common;

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::mpsc::{channel, Sender};
use std::time::Duration;

use psd_composite::prelude::*;
use psd_composite::decode::DecodeMetadata;
use psd_composite::progressive::{Loading, ProgressiveEvents, ProgressiveLoader, ProgressiveSettings};
use common::*;


enum Event {
    Ready { size: Vec2<usize>, is_final: bool },
    Tile(TileInfo),
    Complete(Result<(TiledImage, DecodeMetadata)>),
}

struct Forward(Sender<Event>);

impl ProgressiveEvents for Forward {
    fn on_ready(&mut self, image: DecodedImage, is_final: bool) {
        self.0.send(Event::Ready { size: image.surface.size, is_final }).unwrap();
    }

    fn on_tile(&mut self, info: TileInfo, _: &RgbaSurface) {
        self.0.send(Event::Tile(info)).unwrap();
    }

    fn on_complete(&mut self, result: Result<(TiledImage, DecodeMetadata)>) {
        self.0.send(Event::Complete(result)).unwrap();
    }
}

fn loader(full_decode_threshold: u64) -> ProgressiveLoader {
    let settings = ProgressiveSettings {
        preview_size: Vec2(100, 100),
        full_decode_threshold,
        tile_edge: TileEdge::Hint(256),
    };

    ProgressiveLoader::new(CompositeDecoder::new(plain_options()), settings).unwrap()
}

fn opener(bytes: Vec<u8>) -> impl Fn() -> Result<Cursor<Vec<u8>>> + Send + 'static {
    move || Ok(Cursor::new(bytes.clone()))
}


#[test]
fn small_documents_are_decoded_at_once(){
    let bytes = PsdBuilder::new(MODE_RGB, 300, 200, 3, pattern).with_compression(RLE).build();
    let (sender, receiver) = channel();

    let progressive = loader(u64::MAX);
    let loading = progressive.load(opener(bytes), Forward(sender), CancelToken::new()).unwrap();
    assert!(matches!(loading, Loading::Complete));

    match receiver.recv_timeout(Duration::from_secs(10)).unwrap() {
        Event::Ready { size, is_final } => {
            assert_eq!(size, Vec2(300, 200));
            assert!(is_final);
        },
        _ => panic!("expected the full image first"),
    }

    assert!(receiver.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn large_documents_show_a_preview_then_tiles(){
    let bytes = PsdBuilder::new(MODE_RGB, 600, 400, 3, pattern).with_compression(RLE).build();
    let full = decode(bytes.clone(), plain_options()).unwrap().surface;
    let (sender, receiver) = channel();

    let progressive = loader(0);
    let loading = progressive.load(opener(bytes), Forward(sender), CancelToken::new()).unwrap();

    match loading {
        Loading::Tiling { scheduler } => assert_eq!(scheduler.layout().tile_count, Vec2(3, 2)),
        Loading::Complete => panic!("expected tiling"),
    }

    match receiver.recv_timeout(Duration::from_secs(10)).unwrap() {
        Event::Ready { size, is_final } => {
            assert_eq!(size, Vec2(100, 66));
            assert!(!is_final);
        },
        _ => panic!("expected the preview first"),
    }

    let mut tiles = HashSet::new();

    loop {
        match receiver.recv_timeout(Duration::from_secs(10)).unwrap() {
            Event::Tile(info) => assert!(tiles.insert(info.index), "tile {:?} delivered twice", info.index),
            Event::Ready { .. } => panic!("only one image may be ready"),

            Event::Complete(result) => {
                let (tiled, metadata) = result.unwrap();
                assert_eq!(tiled.to_surface().unwrap().data, full.data);
                assert_eq!(metadata.compression_name(), "RLE");
                break;
            },
        }
    }

    assert_eq!(tiles.len(), 6);
}

#[test]
fn cancelled_loads_complete_with_an_abort(){
    let bytes = PsdBuilder::new(MODE_RGB, 600, 400, 3, pattern).with_compression(ZIP).build();
    let (sender, receiver) = channel();

    let cancel = CancelToken::new();
    let progressive = loader(0);
    let loading = progressive.load(opener(bytes), Forward(sender), cancel.clone()).unwrap();
    assert!(matches!(loading, Loading::Tiling { .. }));
    cancel.cancel();

    let completion = std::iter::from_fn(|| receiver.recv_timeout(Duration::from_secs(10)).ok())
        .find_map(|event| match event {
            Event::Complete(result) => Some(result),
            _ => None,
        });

    // the background decode may have finished before the cancellation
    match completion {
        Some(Err(error)) => assert!(error.is_aborted()),
        Some(Ok((tiled, _))) => assert!(tiled.is_complete()),
        None => panic!("the load never completed"),
    }
}

#[test]
fn errors_before_the_first_image_are_returned(){
    let mut bytes = PsdBuilder::new(MODE_RGB, 600, 400, 3, pattern).build();
    bytes[0] = b'X';

    let (sender, receiver) = channel();
    let progressive = loader(0);
    let result = progressive.load(opener(bytes), Forward(sender), CancelToken::new());

    assert!(matches!(result, Err(Error::Invalid(_))));
    assert!(receiver.recv_timeout(Duration::from_millis(100)).is_err());
}
