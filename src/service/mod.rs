pub mod classifier;
pub mod extractor;
pub mod matcher;
pub mod merger;
pub mod pipeline;
pub mod signals;

pub use extractor::{OcrBackend, PdfTextExtractor, TesseractOcr, TextExtractor};
pub use pipeline::{BatchError, BatchOutput, BatchProcessor};
