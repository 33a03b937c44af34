use super::*;
use crate::foundation::core::Fps;

fn solid(width: u32, height: u32, rgb: [u8; 3]) -> FrameRGBA {
    FrameRGBA {
        width,
        height,
        data: [rgb[0], rgb[1], rgb[2], 255].repeat((width * height) as usize),
    }
}

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_encode_gif");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

#[test]
fn writes_a_decodable_animation() {
    let out = scratch("three.gif");
    let mut sink = GifSink::new(&out);
    sink.begin(SinkConfig {
        width: 8,
        height: 6,
        fps: Fps::default(),
    })
    .unwrap();
    for (i, rgb) in [[255, 0, 0], [0, 255, 0], [0, 0, 255]].into_iter().enumerate() {
        sink.push_frame(FrameIndex(i as u64), &solid(8, 6, rgb)).unwrap();
    }
    sink.end().unwrap();

    use image::AnimationDecoder as _;
    let file = std::io::BufReader::new(std::fs::File::open(&out).unwrap());
    let decoder = image::codecs::gif::GifDecoder::new(file).unwrap();
    let frames = decoder.into_frames().collect_frames().unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].buffer().dimensions(), (8, 6));
}

#[test]
fn codec_id_is_gif() {
    assert_eq!(GifSink::new("x.gif").codec(), "gif");
}

#[test]
fn end_without_begin_fails() {
    let mut sink = GifSink::new(scratch("unused.gif"));
    assert!(matches!(sink.end(), Err(LakebloomError::Encode(_))));
}

#[cfg(target_os = "linux")]
#[test]
fn write_failure_while_finishing_is_reported() {
    // Every write to /dev/full fails with ENOSPC; small frames stay buffered until `end`.
    let full = PathBuf::from("/dev/full");
    if !full.exists() {
        return;
    }
    let mut sink = GifSink::new(&full);
    sink.begin(SinkConfig {
        width: 4,
        height: 4,
        fps: Fps::default(),
    })
    .unwrap();
    sink.push_frame(FrameIndex(0), &solid(4, 4, [10, 20, 30])).unwrap();

    let err = sink.end().unwrap_err();
    assert!(
        matches!(&err, LakebloomError::Encode(msg) if msg.contains("failed to write")),
        "{err}"
    );
}
