use ascii_encoder::prelude::*;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("ascii-encoder").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("ASCII edge sketches"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("ascii-encoder").unwrap();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_requires_inputs() {
    let mut cmd = Command::cargo_bin("ascii-encoder").unwrap();
    cmd.assert().failure();
}

#[test]
fn test_cli_missing_file() {
    let mut cmd = Command::cargo_bin("ascii-encoder").unwrap();
    cmd.arg("nonexistent.mp4");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_unreadable_input_fails_without_output() {
    // A file that exists but is not a video: the open must fail, the exit
    // code must signal failure, and no output file may be created
    let temp_dir = tempdir().unwrap();
    let bogus = temp_dir.path().join("bogus.mov");
    std::fs::write(&bogus, b"this is not a video").unwrap();

    let mut cmd = Command::cargo_bin("ascii-encoder").unwrap();
    cmd.arg(bogus.to_str().unwrap());
    cmd.assert().failure();

    let expected_output = temp_dir.path().join("bogus_out.mp4");
    assert!(
        !expected_output.exists(),
        "no output file should exist for a failed input"
    );
}

mod unit_tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(500), "0.500s");
        assert_eq!(format_elapsed(61042), "61.042s");
    }

    #[test]
    fn test_output_naming() {
        let config = RenderConfig::default();
        assert_eq!(
            config.output_path(&PathBuf::from("demo.mov")),
            PathBuf::from("demo_out.mp4")
        );
    }
}

mod decoder_tests {
    use super::*;

    /// Generate a short test clip with the ffmpeg CLI, or `None` when the
    /// tool is unavailable so the test can skip instead of failing
    fn create_test_video(dir: &std::path::Path) -> Option<PathBuf> {
        let video_path = dir.join("sample.mp4");
        let output = std::process::Command::new("ffmpeg")
            .args([
                "-f",
                "lavfi",
                "-i",
                "testsrc=duration=1:size=160x120:rate=10",
                "-pix_fmt",
                "yuv420p",
                "-y",
                video_path.to_str().unwrap(),
            ])
            .output();
        match output {
            Ok(result) if result.status.success() => Some(video_path),
            _ => None,
        }
    }

    /// Draining past the end of the stream must keep answering `End`, not
    /// fail because the flush request was already delivered
    #[test]
    fn test_reads_past_end_stay_end() {
        let temp_dir = tempdir().unwrap();
        let Some(video) = create_test_video(temp_dir.path()) else {
            eprintln!("ffmpeg CLI not available, skipping");
            return;
        };
        let mut decoder = match VideoDecoder::new(&video) {
            Ok(decoder) => decoder,
            Err(e) => {
                eprintln!("decoder unavailable ({}), skipping", e);
                return;
            }
        };

        let mut decoded = 0;
        loop {
            match decoder.read_frame().unwrap() {
                FrameRead::Frame(_) => decoded += 1,
                FrameRead::Empty => {}
                FrameRead::End => break,
            }
        }
        assert!(decoded > 0, "test clip should decode at least one frame");

        for _ in 0..3 {
            let read = decoder.read_frame().expect("read after end must not fail");
            assert!(matches!(read, FrameRead::End));
        }
    }
}

mod pipeline_tests {
    use super::*;
    use anyhow::Result;
    use image::RgbImage;

    fn small_config() -> RenderConfig {
        RenderConfig {
            columns: 6,
            rows: 4,
            glyph_scale: 1,
            blur_kernel: 3,
            edge_low: 10.0,
            edge_ratio: 3.0,
            density_threshold: 5.0,
            ..Default::default()
        }
    }

    struct OneShotSource {
        stats: SourceStats,
        frame: Option<VideoFrame>,
    }

    impl FrameSource for OneShotSource {
        fn stats(&self) -> SourceStats {
            self.stats
        }

        fn next_frame(&mut self) -> Result<FrameRead> {
            Ok(match self.frame.take() {
                Some(frame) => FrameRead::Frame(frame),
                None => FrameRead::End,
            })
        }
    }

    #[derive(Default)]
    struct CountingSink {
        written: usize,
        finished: bool,
    }

    impl FrameSink for CountingSink {
        fn write(&mut self, _canvas: &RgbImage, _index: i64) -> Result<()> {
            self.written += 1;
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn gradient_frame(width: u32, height: u32) -> VideoFrame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let v = ((x + y) % 256) as u8;
                data.extend_from_slice(&[v, v, v]);
            }
        }
        VideoFrame {
            data,
            width,
            height,
            timestamp: 0.0,
            frame_number: 0,
        }
    }

    /// Grid cardinality is a function of the grid alone, not the resolution
    #[test]
    fn test_cell_count_across_resolutions() {
        let config = small_config();
        for (w, h) in [(60u32, 40u32), (120, 90), (645, 481)] {
            let grid = TextGrid::new(config.columns, config.rows, w, h).unwrap();
            let frame = gradient_frame(w, h);
            let detector = EdgeDetector::new(3, 10.0, 30.0);
            let edges = detector.detect(&frame);
            let samples = sample_cells(&frame, &edges, &grid);
            assert_eq!(samples.len(), 24);
        }
    }

    /// Full source-to-sink run finalizes the sink exactly once
    #[test]
    fn test_run_finalizes_sink() {
        let config = small_config();
        let pipeline = Pipeline::new(config.clone()).unwrap();
        let grid = TextGrid::new(config.columns, config.rows, 60, 40).unwrap();
        let renderer = GlyphRenderer::new(&config);

        let source = OneShotSource {
            stats: SourceStats {
                frames: 1,
                width: 60,
                height: 40,
                fps: 25.0,
            },
            frame: Some(gradient_frame(60, 40)),
        };
        let mut sink = CountingSink::default();
        let (read, rendered, skipped) = pipeline
            .run(source, &mut sink, &grid, &renderer, None)
            .unwrap();

        assert_eq!((read, rendered, skipped), (1, 1, 0));
        assert_eq!(sink.written, 1);
        assert!(sink.finished);
    }
}
