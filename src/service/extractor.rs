use std::io::Write;
use std::path::Path;
use std::process::Command;

use crate::config::ExtractionConfig;
use crate::models::{ExtractedText, ExtractionFailure, InputDocument};

/// Reconhecimento de texto em página rasterizada. A implementação real
/// chama pdftoppm + tesseract; os testes injetam um backend de texto fixo
/// para rodar sem nenhum motor de OCR instalado.
pub trait OcrBackend: Send + Sync {
    fn is_available(&self) -> bool;

    /// Reconhece uma página (1-based) de um PDF já materializado em disco.
    fn recognize_page(
        &self,
        pdf: &Path,
        page: u32,
        scratch: &Path,
    ) -> Result<String, ExtractionFailure>;
}

/// Backend de OCR via executáveis do sistema: rasteriza com pdftoppm e
/// reconhece com tesseract usando um modelo de idioma fixo.
pub struct TesseractOcr {
    lang: String,
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(lang: impl Into<String>, dpi: u32) -> Self {
        Self {
            lang: lang.into(),
            dpi,
        }
    }
}

impl OcrBackend for TesseractOcr {
    fn is_available(&self) -> bool {
        which::which("pdftoppm").is_ok() && which::which("tesseract").is_ok()
    }

    fn recognize_page(
        &self,
        pdf: &Path,
        page: u32,
        scratch: &Path,
    ) -> Result<String, ExtractionFailure> {
        // 1. rasteriza a página em PNG dentro do diretório do lote
        let prefix = scratch.join(format!("ocr-p{page}"));
        let out = Command::new("pdftoppm")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-png")
            .arg("-singlefile")
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| ExtractionFailure::ToolFailure {
                tool: "pdftoppm",
                message: e.to_string(),
            })?;
        if !out.status.success() {
            return Err(ExtractionFailure::ToolFailure {
                tool: "pdftoppm",
                message: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        let image = prefix.with_extension("png");
        if !image.exists() {
            return Err(ExtractionFailure::ToolFailure {
                tool: "pdftoppm",
                message: format!("imagem não gerada para a página {page}"),
            });
        }

        // 2. tesseract direto para stdout
        let out = Command::new("tesseract")
            .arg(&image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .arg("--psm")
            .arg("6")
            .output()
            .map_err(|e| ExtractionFailure::ToolFailure {
                tool: "tesseract",
                message: e.to_string(),
            })?;
        if !out.status.success() {
            return Err(ExtractionFailure::ToolFailure {
                tool: "tesseract",
                message: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

/// Extrai o texto de um documento inteiro. Contrato: nunca derruba o
/// lote; qualquer falha vira `ExtractionFailure` e o chamador segue com
/// texto vazio.
pub trait TextExtractor: Send + Sync {
    fn extract(
        &self,
        document: &InputDocument,
        scratch: &Path,
    ) -> Result<ExtractedText, ExtractionFailure>;
}

/// Extração em duas camadas: pdftotext para a camada de texto embutida e
/// OCR para páginas digitalizadas (quase sem caracteres visíveis).
pub struct PdfTextExtractor {
    ocr: Box<dyn OcrBackend>,
    min_page_chars: usize,
}

impl PdfTextExtractor {
    pub fn new(ocr: Box<dyn OcrBackend>, min_page_chars: usize) -> Self {
        Self {
            ocr,
            min_page_chars,
        }
    }

    pub fn from_config(cfg: &ExtractionConfig) -> Self {
        Self::new(
            Box::new(TesseractOcr::new(cfg.ocr_lang.clone(), cfg.ocr_dpi)),
            cfg.min_page_chars,
        )
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(
        &self,
        document: &InputDocument,
        scratch: &Path,
    ) -> Result<ExtractedText, ExtractionFailure> {
        // 1. valida o PDF e obtém o total de páginas
        let page_count = lopdf::Document::load_mem(&document.bytes)
            .map_err(|e| ExtractionFailure::InvalidPdf(e.to_string()))?
            .get_pages()
            .len();

        // 2. materializa os bytes no diretório do lote
        let mut file = tempfile::Builder::new()
            .prefix("doc-")
            .suffix(".pdf")
            .tempfile_in(scratch)
            .map_err(|e| ExtractionFailure::Io(e.to_string()))?;
        file.write_all(&document.bytes)
            .and_then(|_| file.flush())
            .map_err(|e| ExtractionFailure::Io(e.to_string()))?;
        let pdf_path = file.path();

        // 3. camada de texto embutida, uma passada, páginas separadas por \f
        if which::which("pdftotext").is_err() {
            return Err(ExtractionFailure::MissingDependency("pdftotext".into()));
        }
        let out = Command::new("pdftotext")
            .arg("-layout")
            .arg("-q")
            .arg(pdf_path)
            .arg("-")
            .output()
            .map_err(|e| ExtractionFailure::ToolFailure {
                tool: "pdftotext",
                message: e.to_string(),
            })?;
        if !out.status.success() {
            return Err(ExtractionFailure::ToolFailure {
                tool: "pdftotext",
                message: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        let raw = String::from_utf8_lossy(&out.stdout);
        let mut pages: Vec<String> = raw.split('\u{000C}').map(str::to_string).collect();
        pages.resize(page_count, String::new());

        // 4. páginas sem camada de texto vão para OCR; falha em uma página
        // não descarta o que as outras já renderam
        let suspects = suspect_pages(&pages, self.min_page_chars);
        if !suspects.is_empty() {
            if self.ocr.is_available() {
                for idx in suspects {
                    match self.ocr.recognize_page(pdf_path, idx as u32 + 1, scratch) {
                        Ok(text) => pages[idx] = text,
                        Err(err) => tracing::warn!(
                            "OCR falhou na página {} de {}: {}",
                            idx + 1,
                            document.filename,
                            err
                        ),
                    }
                }
            } else {
                tracing::warn!(
                    "OCR indisponível: {} página(s) de {} sem camada de texto",
                    suspects.len(),
                    document.filename
                );
            }
        }

        Ok(ExtractedText::from_pages(pages))
    }
}

/// Índices (0-based) das páginas com menos caracteres visíveis que o
/// limiar, candidatas a OCR.
fn suspect_pages(pages: &[String], min_chars: usize) -> Vec<usize> {
    pages
        .iter()
        .enumerate()
        .filter(|(_, page)| page.chars().filter(|c| !c.is_whitespace()).count() < min_chars)
        .map(|(idx, _)| idx)
        .collect()
}
