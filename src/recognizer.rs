//! # Recognizer Capability
//!
//! The text recognition engine is consumed as an opaque capability: it takes a
//! raster and a language/layout request and asynchronously produces text,
//! reporting a progress ratio in `[0, 1]` along the way.
//!
//! Implementations must be callable repeatedly (once per strip) without
//! carrying state from one call to the next.

use async_trait::async_trait;
use image::RgbaImage;

use crate::ocr_config::PageSegMode;
use crate::ocr_errors::OcrError;

/// Progress sink handed to a recognizer; receives ratios in `[0, 1]`.
pub type ProgressFn<'a> = &'a (dyn Fn(f32) + Send + Sync);

/// Language and layout of a single recognizer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    pub language: String,
    pub page_seg_mode: PageSegMode,
}

impl RecognitionRequest {
    pub fn new(language: impl Into<String>, page_seg_mode: PageSegMode) -> Self {
        Self {
            language: language.into(),
            page_seg_mode,
        }
    }
}

/// External text recognition engine.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognize the text in `image`.
    ///
    /// `progress` may be invoked any number of times with a non-decreasing
    /// ratio. Errors are reported as `OcrError::Recognition`; the caller
    /// attaches the strip index.
    async fn recognize(
        &self,
        image: &RgbaImage,
        request: &RecognitionRequest,
        progress: ProgressFn<'_>,
    ) -> Result<String, OcrError>;
}

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractRecognizer;

#[cfg(feature = "tesseract")]
mod tesseract {
    use std::io::Cursor;

    use async_trait::async_trait;
    use image::{ImageFormat, RgbaImage};
    use leptess::LepTess;

    use super::{ProgressFn, RecognitionRequest, Recognizer};
    use crate::ocr_errors::OcrError;

    /// Tesseract-backed recognizer.
    ///
    /// A fresh engine is created per call so strips never share state; the
    /// blocking work runs on tokio's blocking pool.
    #[derive(Debug, Clone, Default)]
    pub struct TesseractRecognizer {
        tessdata_path: Option<String>,
    }

    impl TesseractRecognizer {
        pub fn new(tessdata_path: Option<String>) -> Self {
            Self { tessdata_path }
        }
    }

    fn recognition_error(message: String) -> OcrError {
        OcrError::Recognition {
            strip: None,
            message,
        }
    }

    #[async_trait]
    impl Recognizer for TesseractRecognizer {
        async fn recognize(
            &self,
            image: &RgbaImage,
            request: &RecognitionRequest,
            progress: ProgressFn<'_>,
        ) -> Result<String, OcrError> {
            progress(0.0);

            let mut png = Vec::new();
            image
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| recognition_error(format!("Failed to encode image for OCR: {e}")))?;

            let tessdata_path = self.tessdata_path.clone();
            let request = request.clone();

            let text = tokio::task::spawn_blocking(move || -> Result<String, OcrError> {
                let mut tess = LepTess::new(tessdata_path.as_deref(), &request.language)
                    .map_err(|e| {
                        recognition_error(format!("Failed to initialize Tesseract: {e}"))
                    })?;

                tess.set_variable(
                    leptess::Variable::TesseditPagesegMode,
                    request.page_seg_mode.as_str(),
                )
                .map_err(|e| recognition_error(format!("Failed to set PSM: {e}")))?;

                tess.set_image_from_mem(&png).map_err(|e| {
                    recognition_error(format!("Failed to load image for OCR: {e}"))
                })?;

                tess.get_utf8_text().map_err(|e| {
                    recognition_error(format!("Failed to extract text from image: {e}"))
                })
            })
            .await
            .map_err(|e| recognition_error(format!("OCR task panicked: {e}")))??;

            progress(1.0);
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct EchoRecognizer;

    #[async_trait]
    impl Recognizer for EchoRecognizer {
        async fn recognize(
            &self,
            image: &RgbaImage,
            request: &RecognitionRequest,
            progress: ProgressFn<'_>,
        ) -> Result<String, OcrError> {
            progress(0.5);
            progress(1.0);
            Ok(format!(
                "{}x{} {} psm{}",
                image.width(),
                image.height(),
                request.language,
                request.page_seg_mode.code()
            ))
        }
    }

    #[tokio::test]
    async fn test_recognizer_trait_object() {
        let recognizer: Box<dyn Recognizer> = Box::new(EchoRecognizer);
        let seen = Mutex::new(Vec::new());
        let sink = |ratio: f32| seen.lock().push(ratio);

        let text = recognizer
            .recognize(
                &RgbaImage::new(3, 2),
                &RecognitionRequest::new("lat", PageSegMode::SingleLine),
                &sink,
            )
            .await
            .unwrap();

        assert_eq!(text, "3x2 lat psm7");
        assert_eq!(*seen.lock(), vec![0.5, 1.0]);
    }
}
