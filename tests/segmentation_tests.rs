//! # Strip Segmentation Tests
//!
//! Drives `recognize_document` with stub recognizers: strip ordering,
//! failure propagation, progress aggregation, cancellation and timeouts.


#[cfg(test)]
mod tests {
    use super::test_helpers::{assert_monotonic, banded_page, drain_progress, LevelRecognizer};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use transcribex::ocr_config::{PageSegMode, RecognitionConfig};
    use transcribex::ocr_errors::OcrError;
    use transcribex::preprocessing::{BinarizeMode, CropSpec, PreprocessConfig};
    use transcribex::progress::ProgressReporter;
    use transcribex::segmentation::recognize_document;

    const LEVELS: [u8; 4] = [20, 80, 140, 200];
    const LABELS: [(u8, &str); 4] = [(20, "A"), (80, "B"), (140, "C"), (200, "D")];
    const TIMEOUT: Duration = Duration::from_secs(30);

    fn pass_through() -> PreprocessConfig {
        PreprocessConfig {
            crop: CropSpec::NONE,
            binarize: BinarizeMode::None,
            ..Default::default()
        }
    }

    fn four_strips(overlap: f32) -> RecognitionConfig {
        RecognitionConfig {
            language: "lat".to_string(),
            page_seg_mode: PageSegMode::SingleBlock,
            strip_mode: true,
            strip_count: 4,
            overlap_fraction: overlap,
        }
    }

    /// Four quarters read as A, B, C, D come back in top-to-bottom order
    #[tokio::test]
    async fn test_strip_ordering_four_quarters() {
        let page = banded_page(30, 10, &LEVELS);
        let recognizer = LevelRecognizer::new(&LABELS);
        let (progress, _receiver) = ProgressReporter::channel();

        let text = recognize_document(
            &page,
            &pass_through(),
            &four_strips(0.0),
            &recognizer,
            &progress,
            &CancellationToken::new(),
            TIMEOUT,
        )
        .await
        .unwrap();

        assert_eq!(text, "A\nB\nC\nD\n");
    }

    /// Every strip is recognized in single-line mode on a quarter-height image
    #[tokio::test]
    async fn test_strips_use_single_line_mode() {
        let page = banded_page(30, 10, &LEVELS);
        let recognizer = LevelRecognizer::new(&LABELS);

        recognize_document(
            &page,
            &pass_through(),
            &four_strips(0.0),
            &recognizer,
            &ProgressReporter::silent(),
            &CancellationToken::new(),
            TIMEOUT,
        )
        .await
        .unwrap();

        let calls = recognizer.calls();
        assert_eq!(calls.len(), 4);
        for call in &calls {
            assert_eq!(call.page_seg_mode, PageSegMode::SingleLine);
            assert_eq!(call.language, "lat");
            assert_eq!((call.width, call.height), (30, 10));
        }
    }

    /// Overlapping strips are taller than a quarter but still read in order
    #[tokio::test]
    async fn test_overlapping_strips_share_seams() {
        let page = banded_page(20, 25, &LEVELS);
        let recognizer = LevelRecognizer::new(&LABELS);

        let text = recognize_document(
            &page,
            &pass_through(),
            &four_strips(0.08),
            &recognizer,
            &ProgressReporter::silent(),
            &CancellationToken::new(),
            TIMEOUT,
        )
        .await
        .unwrap();

        assert_eq!(text, "A\nB\nC\nD\n");

        // 100px page: outer strips gain 8px, inner strips 16px
        let heights: Vec<u32> = recognizer.calls().iter().map(|c| c.height).collect();
        assert_eq!(heights, vec![33, 41, 41, 33]);
    }

    /// Horizontal crop is applied to every strip
    #[tokio::test]
    async fn test_horizontal_crop_preserved_across_strips() {
        let page = banded_page(100, 10, &LEVELS);
        let recognizer = LevelRecognizer::new(&LABELS);
        let config = PreprocessConfig {
            crop: CropSpec::new(35.0, 5.0, 10.0, 20.0),
            ..pass_through()
        };

        recognize_document(
            &page,
            &config,
            &four_strips(0.0),
            &recognizer,
            &ProgressReporter::silent(),
            &CancellationToken::new(),
            TIMEOUT,
        )
        .await
        .unwrap();

        for call in recognizer.calls() {
            assert_eq!((call.width, call.height), (70, 10));
        }
    }

    /// A failure on strip 2 of 4 fails the whole request without partial text
    #[tokio::test]
    async fn test_failure_on_third_strip_discards_everything() {
        let page = banded_page(30, 10, &LEVELS);
        let recognizer = LevelRecognizer::new(&LABELS).failing_on(2);
        let (progress, mut receiver) = ProgressReporter::channel();

        let result = recognize_document(
            &page,
            &pass_through(),
            &four_strips(0.0),
            &recognizer,
            &progress,
            &CancellationToken::new(),
            TIMEOUT,
        )
        .await;

        match result {
            Err(OcrError::Recognition { strip, message }) => {
                assert_eq!(strip, Some(2));
                assert!(message.contains("stub failure"));
            }
            other => panic!("expected a recognition error, got {:?}", other),
        }

        // The fourth strip is never dispatched
        assert_eq!(recognizer.calls().len(), 3);

        let events = drain_progress(&mut receiver);
        assert_monotonic(&events);
        assert!(events.iter().all(|event| event.percent < 100));
    }

    /// Progress never decreases and reaches 100 only at the very end
    #[tokio::test]
    async fn test_progress_is_monotonic_and_completes() {
        let page = banded_page(30, 10, &LEVELS);
        let recognizer = LevelRecognizer::new(&LABELS);
        let (progress, mut receiver) = ProgressReporter::channel();

        recognize_document(
            &page,
            &pass_through(),
            &four_strips(0.0),
            &recognizer,
            &progress,
            &CancellationToken::new(),
            TIMEOUT,
        )
        .await
        .unwrap();

        let events = drain_progress(&mut receiver);
        assert!(!events.is_empty());
        assert_monotonic(&events);

        let (last, rest) = events.split_last().unwrap();
        assert_eq!(last.percent, 100);
        assert!(rest.iter().all(|event| event.percent < 100));

        // Completion of strip 1 of 4 is reported as 50%
        assert!(events
            .iter()
            .any(|event| event.strip == Some(1) && event.percent == 50));
        // Half-way through strip 0 of 4 is 13% (rounded from 12.5)
        assert!(events
            .iter()
            .any(|event| event.strip == Some(0) && event.percent == 13));
    }

    /// Cancelling before the request starts dispatches nothing
    #[tokio::test]
    async fn test_cancelled_before_start() {
        let page = banded_page(30, 10, &LEVELS);
        let recognizer = LevelRecognizer::new(&LABELS);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = recognize_document(
            &page,
            &pass_through(),
            &four_strips(0.0),
            &recognizer,
            &ProgressReporter::silent(),
            &cancel,
            TIMEOUT,
        )
        .await;

        assert_eq!(
            result,
            Err(OcrError::Cancelled {
                completed_strips: 0
            })
        );
        assert!(recognizer.calls().is_empty());
    }

    /// The in-flight strip completes but no new strip starts after cancellation
    #[tokio::test]
    async fn test_cancelled_mid_request() {
        let page = banded_page(30, 10, &LEVELS);
        let cancel = CancellationToken::new();
        let recognizer = LevelRecognizer::new(&LABELS).cancelling_on(1, cancel.clone());

        let result = recognize_document(
            &page,
            &pass_through(),
            &four_strips(0.0),
            &recognizer,
            &ProgressReporter::silent(),
            &cancel,
            TIMEOUT,
        )
        .await;

        assert_eq!(
            result,
            Err(OcrError::Cancelled {
                completed_strips: 2
            })
        );
        assert_eq!(recognizer.calls().len(), 2);
    }

    /// A stalled strip fails with a timeout naming that strip
    #[tokio::test]
    async fn test_strip_timeout() {
        let page = banded_page(30, 10, &LEVELS);
        let recognizer = LevelRecognizer::new(&LABELS).stalling_on(1);

        let result = recognize_document(
            &page,
            &pass_through(),
            &four_strips(0.0),
            &recognizer,
            &ProgressReporter::silent(),
            &CancellationToken::new(),
            Duration::from_millis(50),
        )
        .await;

        assert!(matches!(
            result,
            Err(OcrError::Timeout {
                strip: Some(1),
                ..
            })
        ));
        assert_eq!(recognizer.calls().len(), 2);
    }

    /// Whole-image mode makes one call with the configured mode and keeps the text as is
    #[tokio::test]
    async fn test_whole_image_mode() {
        let page = banded_page(30, 10, &[140, 140]);
        let recognizer = LevelRecognizer::new(&LABELS);
        let (progress, mut receiver) = ProgressReporter::channel();
        let recognition = RecognitionConfig {
            strip_mode: false,
            page_seg_mode: PageSegMode::SingleColumn,
            ..four_strips(0.0)
        };

        let text = recognize_document(
            &page,
            &pass_through(),
            &recognition,
            &recognizer,
            &progress,
            &CancellationToken::new(),
            TIMEOUT,
        )
        .await
        .unwrap();

        assert_eq!(text, " C\n");
        let calls = recognizer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].page_seg_mode, PageSegMode::SingleColumn);
        assert_eq!((calls[0].width, calls[0].height), (30, 20));

        let percents: Vec<u8> = drain_progress(&mut receiver)
            .iter()
            .map(|event| event.percent)
            .collect();
        assert_eq!(percents, vec![25, 50, 99, 100]);
    }

    /// Invalid strip settings are rejected before any recognition
    #[tokio::test]
    async fn test_invalid_recognition_config() {
        let page = banded_page(30, 10, &LEVELS);
        let recognizer = LevelRecognizer::new(&LABELS);
        let recognition = RecognitionConfig {
            overlap_fraction: 1.0,
            ..four_strips(0.0)
        };

        let result = recognize_document(
            &page,
            &pass_through(),
            &recognition,
            &recognizer,
            &ProgressReporter::silent(),
            &CancellationToken::new(),
            TIMEOUT,
        )
        .await;

        assert!(matches!(result, Err(OcrError::InvalidConfig(_))));
        assert!(recognizer.calls().is_empty());
    }

    /// A crop that consumes the page is reported as a degenerate region
    #[tokio::test]
    async fn test_degenerate_crop_in_whole_image_mode() {
        let page = banded_page(30, 10, &LEVELS);
        let recognizer = LevelRecognizer::new(&LABELS);
        let config = PreprocessConfig {
            crop: CropSpec::new(0.0, 0.0, 60.0, 40.0),
            ..pass_through()
        };
        let recognition = RecognitionConfig {
            strip_mode: false,
            ..four_strips(0.0)
        };

        let result = recognize_document(
            &page,
            &config,
            &recognition,
            &recognizer,
            &ProgressReporter::silent(),
            &CancellationToken::new(),
            TIMEOUT,
        )
        .await;

        assert!(matches!(result, Err(OcrError::DegenerateRegion(_))));
    }
}
