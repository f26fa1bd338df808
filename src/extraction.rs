use std::path::Path;

use crate::{
    error::{Error, Result},
    item_id::ItemId,
    media,
    ocr::OcrEngine,
    preprocess::Preprocessor,
    text_index::{IndexEntry, TextIndex},
};

/// What happened when an item went through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Text was recognized and written to the index (possibly empty).
    Indexed(String),
    /// An index entry already existed; no work was done.
    AlreadyIndexed,
    /// The media type is not OCR-eligible; nothing was written.
    Skipped,
}

/// Image normalization + OCR, writing results into the text index.
pub struct Extractor {
    preprocessor: Preprocessor,
    ocr: Box<dyn OcrEngine>,
}

impl Extractor {
    pub fn new(preprocessor: Preprocessor, ocr: Box<dyn OcrEngine>) -> Self {
        Self { preprocessor, ocr }
    }

    /// Run the pipeline for the item stored at `path`.
    ///
    /// Failures leave no index entry behind, so a later recovery pass
    /// retries the item.
    pub fn extract(
        &self,
        index: &TextIndex,
        id: ItemId,
        extension: &str,
        path: &Path,
    ) -> Result<Extraction> {
        if !media::is_ocr_eligible(extension) {
            tracing::debug!(%id, extension, "not OCR-eligible, skipping");
            return Ok(Extraction::Skipped);
        }
        if index.contains(id.get())? {
            return Ok(Extraction::AlreadyIndexed);
        }

        let text = self.recognize(path).map_err(|e| Error::Extraction {
            id: id.get(),
            reason: e.to_string(),
        })?;

        tracing::debug!(%id, text = %text, "recognized text");

        index.upsert(&IndexEntry {
            id: id.get(),
            text: text.clone(),
            extension: extension.to_string(),
        })?;

        Ok(Extraction::Indexed(text))
    }

    fn recognize(&self, path: &Path) -> Result<String> {
        let image = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?;
        let prepared = self.preprocessor.prepare(&image);
        if prepared.inverted {
            tracing::debug!(
                path = %path.display(),
                dark_fraction = prepared.dark_fraction,
                "inverted mostly-dark image"
            );
        }

        // Removed when dropped, on every return path.
        let scratch = tempfile::Builder::new()
            .prefix("quotevault-ocr-")
            .suffix(".png")
            .tempfile()?;
        prepared
            .image
            .save_with_format(scratch.path(), image::ImageFormat::Png)?;

        self.ocr.recognize(scratch.path())
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("preprocessor", &self.preprocessor)
            .finish_non_exhaustive()
    }
}
