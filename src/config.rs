use serde::{Deserialize, Serialize};

/// Configuração da aplicação
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Limite do corpo do upload, em megabytes.
    pub max_upload_mb: usize,
}

/// Parâmetros da extração de texto e do OCR de reserva.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Modelo de idioma do tesseract.
    pub ocr_lang: String,
    /// Resolução do pdftoppm ao rasterizar páginas digitalizadas.
    pub ocr_dpi: u32,
    /// Página com menos caracteres visíveis que isso vai para OCR.
    pub min_page_chars: usize,
    /// CNPJs extras a ignorar, além da denylist compilada.
    pub extra_denylist: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_upload_mb: 100,
            },
            extraction: ExtractionConfig {
                ocr_lang: "por".to_string(),
                ocr_dpi: 300,
                min_page_chars: 20,
                extra_denylist: Vec::new(),
            },
        }
    }
}

impl AppConfig {
    /// Carrega a configuração das variáveis de ambiente, com os mesmos
    /// defaults de `Default`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
                max_upload_mb: std::env::var("SERVER_MAX_UPLOAD_MB")
                    .ok()
                    .and_then(|m| m.parse().ok())
                    .unwrap_or(defaults.server.max_upload_mb),
            },
            extraction: ExtractionConfig {
                ocr_lang: std::env::var("OCR_LANG").unwrap_or(defaults.extraction.ocr_lang),
                ocr_dpi: std::env::var("OCR_DPI")
                    .ok()
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(defaults.extraction.ocr_dpi),
                min_page_chars: std::env::var("OCR_MIN_PAGE_CHARS")
                    .ok()
                    .and_then(|m| m.parse().ok())
                    .unwrap_or(defaults.extraction.min_page_chars),
                extra_denylist: std::env::var("TAXID_DENYLIST")
                    .map(|raw| {
                        raw.split(',')
                            .map(|id| id.trim().to_string())
                            .filter(|id| !id.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
        }
    }
}
