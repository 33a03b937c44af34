use super::*;

fn scratch(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_encode_assemble").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_png(path: &Path, width: u32, height: u32, rgb: [u8; 3]) {
    let data = [rgb[0], rgb[1], rgb[2], 255].repeat((width * height) as usize);
    image::save_buffer(path, &data, width, height, image::ColorType::Rgba8).unwrap();
}

fn gif_assembler(strictness: Strictness) -> VideoAssembler {
    VideoAssembler::new(AssembleOpts {
        backend: VideoBackend::Gif,
        strictness,
        ..AssembleOpts::default()
    })
}

#[test]
fn list_frames_filters_and_sorts_case_insensitively() {
    let dir = scratch("listing");
    write_png(&dir.join("spatial_0002.png"), 2, 2, [0, 0, 0]);
    write_png(&dir.join("spatial_0000.png"), 2, 2, [0, 0, 0]);
    std::fs::copy(dir.join("spatial_0000.png"), dir.join("spatial_0001.PNG")).unwrap();
    std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();
    std::fs::create_dir_all(dir.join("nested.png")).unwrap();

    let names: Vec<String> = list_frames(&dir)
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["spatial_0000.png", "spatial_0001.PNG", "spatial_0002.png"]
    );
}

#[test]
fn missing_directory_is_not_found() {
    let dir = scratch("missing").join("does_not_exist");
    let err = gif_assembler(Strictness::Lenient)
        .assemble(&dir, &dir.join("out.gif"), Fps::default())
        .unwrap_err();
    assert!(matches!(err, LakebloomError::NotFound(ref m) if m.contains("does_not_exist")));
}

#[test]
fn empty_directory_is_empty_input_in_both_modes() {
    let dir = scratch("empty");
    std::fs::write(dir.join("readme.txt"), b"no frames here").unwrap();
    let out = dir.join("video").join("out.gif");

    for strictness in [Strictness::Strict, Strictness::Lenient] {
        let err = gif_assembler(strictness)
            .assemble(&dir, &out, Fps::default())
            .unwrap_err();
        assert!(matches!(err, LakebloomError::EmptyInput(_)));
    }
    assert!(!out.exists());
}

#[test]
fn unreadable_frame_is_malformed() {
    let dir = scratch("garbage");
    write_png(&dir.join("spatial_0000.png"), 4, 4, [1, 2, 3]);
    std::fs::write(dir.join("spatial_0001.png"), b"not a png").unwrap();
    let out = dir.join("out.gif");

    let err = gif_assembler(Strictness::Lenient)
        .assemble(&dir, &out, Fps::default())
        .unwrap_err();
    assert!(matches!(err, LakebloomError::MalformedFrame(ref m) if m.contains("spatial_0001.png")));
    assert!(!out.exists());
}

#[test]
fn size_mismatch_is_malformed() {
    let dir = scratch("mismatch");
    write_png(&dir.join("spatial_0000.png"), 4, 4, [1, 2, 3]);
    write_png(&dir.join("spatial_0001.png"), 6, 4, [1, 2, 3]);

    let err = gif_assembler(Strictness::Strict)
        .assemble(&dir, &dir.join("out.gif"), Fps::default())
        .unwrap_err();
    assert!(matches!(err, LakebloomError::MalformedFrame(_)));
}

#[test]
fn odd_frames_are_rejected_for_ffmpeg_before_any_backend_check() {
    let dir = scratch("odd");
    write_png(&dir.join("spatial_0000.png"), 5, 4, [1, 2, 3]);
    let assembler = VideoAssembler::new(AssembleOpts {
        backend: VideoBackend::Ffmpeg,
        strictness: Strictness::Lenient,
        ..AssembleOpts::default()
    });
    let err = assembler
        .assemble(&dir, &dir.join("out.mp4"), Fps::default())
        .unwrap_err();
    assert!(matches!(err, LakebloomError::MalformedFrame(_)));
}

#[test]
fn gif_backend_writes_exactly_one_file() {
    let dir = scratch("gif_ok");
    let frames = dir.join("frames");
    std::fs::create_dir_all(&frames).unwrap();
    for i in 0..4u8 {
        write_png(
            &frames.join(format!("spatial_{i:04}.png")),
            6,
            4,
            [i * 60, 0, 255 - i * 60],
        );
    }
    let out_dir = dir.join("output");
    let out = out_dir.join("lake.gif");

    let artifact = gif_assembler(Strictness::Strict)
        .assemble(&frames, &out, Fps::integer(6).unwrap())
        .unwrap()
        .unwrap();

    assert_eq!(artifact.path, out);
    assert_eq!(artifact.frames, 4);
    assert_eq!(artifact.codec, "gif");
    assert_eq!((artifact.width, artifact.height), (6, 4));
    let produced: Vec<_> = std::fs::read_dir(&out_dir).unwrap().collect();
    assert_eq!(produced.len(), 1);
    assert!(out.is_file());
}

#[test]
fn unavailable_ffmpeg_follows_strictness() {
    if VideoBackend::Ffmpeg.is_available() {
        return;
    }
    let dir = scratch("no_ffmpeg");
    write_png(&dir.join("spatial_0000.png"), 4, 4, [1, 2, 3]);
    let out = dir.join("out.mp4");

    let strict = VideoAssembler::new(AssembleOpts {
        strictness: Strictness::Strict,
        ..AssembleOpts::default()
    });
    let err = strict.assemble(&dir, &out, Fps::default()).unwrap_err();
    assert!(err.is_backend_unavailable());

    let lenient = VideoAssembler::new(AssembleOpts::default());
    assert_eq!(lenient.assemble(&dir, &out, Fps::default()).unwrap(), None);
    assert!(!out.exists());
}

#[test]
fn opts_round_trip_through_json_with_millis() {
    let opts = AssembleOpts {
        backend: VideoBackend::Gif,
        strictness: Strictness::Strict,
        encode_timeout: Some(Duration::from_millis(1500)),
        bg_rgb: [1, 2, 3],
    };
    let json = serde_json::to_value(&opts).unwrap();
    assert_eq!(json["encode_timeout"], 1500);
    assert_eq!(json["backend"], "gif");
    let back: AssembleOpts = serde_json::from_value(json).unwrap();
    assert_eq!(back, opts);

    let partial: AssembleOpts = serde_json::from_str(r#"{"strictness":"strict"}"#).unwrap();
    assert_eq!(partial.backend, VideoBackend::Ffmpeg);
    assert_eq!(partial.encode_timeout, None);
}
