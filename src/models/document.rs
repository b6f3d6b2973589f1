use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::SignalSet;

/// Documento recebido no upload. A identidade é o nome original do arquivo
/// (não necessariamente único); os bytes não mudam depois da leitura.
#[derive(Debug, Clone)]
pub struct InputDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl InputDocument {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// Texto extraído de um documento, uma string por página.
#[derive(Debug, Clone, Default)]
pub struct ExtractedText {
    pub pages: Vec<String>,
}

impl ExtractedText {
    pub fn from_pages(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// Texto corrido do documento inteiro, com form feed entre páginas.
    pub fn full_text(&self) -> String {
        self.pages.join("\u{000C}")
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }
}

/// Falha de extração de um único documento. Nunca aborta o lote: o
/// chamador registra o aviso e segue com texto vazio (= sem sinais).
#[derive(Debug, Clone, Error)]
pub enum ExtractionFailure {
    #[error("PDF inválido ou corrompido: {0}")]
    InvalidPdf(String),

    #[error("executável não encontrado no PATH: {0}")]
    MissingDependency(String),

    #[error("{tool} falhou: {message}")]
    ToolFailure { tool: &'static str, message: String },

    #[error("falha de E/S no diretório de trabalho: {0}")]
    Io(String),
}

/// Papel do documento no pareamento, derivado apenas do nome do arquivo.
/// Calculado uma vez na classificação e nunca recalculado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentRole {
    /// Comprovante de pagamento (PIX, transferência, recibo).
    ProofOfPayment,
    /// Documento de origem da cobrança (NF, boleto, fatura).
    SourceDocument,
}

/// Documento pronto para o pareamento: bytes originais + sinais + papel.
#[derive(Debug, Clone)]
pub struct ClassifiedDocument {
    pub document: InputDocument,
    pub signals: SignalSet,
    pub role: DocumentRole,
}
