use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::{
    BatchReport, ClassifiedDocument, ExtractedText, GroupStatus, GroupSummary, InputDocument,
    OutputArtifact,
};
use crate::service::extractor::{PdfTextExtractor, TextExtractor};
use crate::service::{classifier, matcher, merger, signals};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("nenhum arquivo recebido")]
    EmptyBatch,

    #[error("falha ao criar o diretório de trabalho do lote: {0}")]
    Scratch(String),

    #[error(transparent)]
    Package(#[from] merger::PackageError),
}

/// Saída completa de um lote: relatório + PDFs individuais + ZIP final.
#[derive(Debug)]
pub struct BatchOutput {
    pub report: BatchReport,
    pub artifacts: Vec<OutputArtifact>,
    pub archive: Vec<u8>,
    pub archive_name: String,
}

/// Orquestra um lote do início ao fim: extração de texto → sinais →
/// classificação → pareamento → merge → empacotamento. Um lote por
/// chamada; nada sobrevive além do ZIP devolvido.
pub struct BatchProcessor {
    extractor: Arc<dyn TextExtractor>,
    extra_denylist: BTreeSet<String>,
}

impl BatchProcessor {
    pub fn new(extractor: Arc<dyn TextExtractor>) -> Self {
        Self {
            extractor,
            extra_denylist: BTreeSet::new(),
        }
    }

    /// CNPJs adicionais a ignorar, além da denylist compilada (cada
    /// instalação tem o próprio papel timbrado).
    pub fn with_denylist(mut self, extra: impl IntoIterator<Item = String>) -> Self {
        self.extra_denylist = extra
            .into_iter()
            .map(|id| signals::normalize_tax_id(&id))
            .filter(|id| !id.is_empty())
            .collect();
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Arc::new(PdfTextExtractor::from_config(&config.extraction)))
            .with_denylist(config.extraction.extra_denylist.clone())
    }

    pub fn process(&self, documents: Vec<InputDocument>) -> Result<BatchOutput, BatchError> {
        if documents.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        let started = std::time::Instant::now();
        let mut warnings = Vec::new();
        let mut infos = Vec::new();

        // 1. diretório de trabalho do lote, removido em qualquer saída
        let scratch = tempfile::tempdir().map_err(|e| BatchError::Scratch(e.to_string()))?;

        // 2. extração de texto em paralelo; falha vira texto vazio, nunca
        // derruba o lote (a ordem de chegada é preservada no collect)
        tracing::info!("lote com {} arquivo(s), extraindo texto", documents.len());
        let extracted: Vec<(InputDocument, ExtractedText, Option<String>)> = documents
            .into_par_iter()
            .map(|doc| {
                match self.extractor.extract(&doc, scratch.path()) {
                    Ok(text) => (doc, text, None),
                    Err(err) => {
                        let warning =
                            format!("falha ao extrair texto de {}: {}", doc.filename, err);
                        (doc, ExtractedText::default(), Some(warning))
                    }
                }
            })
            .collect();

        // 3. sinais + papel por arquivo
        let mut classified = Vec::with_capacity(extracted.len());
        for (doc, text, failure) in extracted {
            if let Some(warning) = failure {
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }
            let mut doc_signals = signals::extract_signals(&text.full_text());
            for denied in &self.extra_denylist {
                doc_signals.tax_ids.remove(denied);
            }
            if doc_signals.is_empty() {
                infos.push(format!("{}: nenhum sinal encontrado no texto", doc.filename));
            }
            let role = classifier::classify(&doc.filename);
            classified.push(ClassifiedDocument {
                document: doc,
                signals: doc_signals,
                role,
            });
        }

        // 4. pareamento
        let groups = matcher::match_documents(classified);

        // 5. merge por grupo; falha isola só o grupo
        let mut artifacts = Vec::with_capacity(groups.len());
        let mut summaries = Vec::with_capacity(groups.len());
        for group in &groups {
            match merger::merge_group(group) {
                Ok(artifact) => {
                    if group.status == GroupStatus::Unmatched {
                        warnings.push(format!(
                            "sem correspondência para {}",
                            group.members[0].filename
                        ));
                    }
                    summaries.push(GroupSummary {
                        output: artifact.filename.clone(),
                        members: group.members.iter().map(|m| m.filename.clone()).collect(),
                        matched_by: match group.status {
                            GroupStatus::Matched(signal) => Some(signal.label().to_string()),
                            GroupStatus::Unmatched => None,
                        },
                    });
                    artifacts.push(artifact);
                }
                Err(err) => {
                    let warning = format!("falha ao montar {}: {}", group.key, err);
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        // 6. empacota tudo + relatório
        let report = BatchReport {
            groups: summaries,
            warnings,
            infos,
        };
        let archive = merger::package_archive(&artifacts, &report)?;
        let archive_name = format!(
            "Comprovantes_Conciliados_{}.zip",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        tracing::info!(
            "lote concluído em {:.1?}: {} grupo(s), {} artefato(s), {} aviso(s)",
            started.elapsed(),
            report.groups.len(),
            artifacts.len(),
            report.warnings.len()
        );

        Ok(BatchOutput {
            report,
            artifacts,
            archive,
            archive_name,
        })
    }
}
