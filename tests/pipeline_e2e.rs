//! Cenários de ponta a ponta do lote, sem nenhum motor de OCR instalado:
//! a extração é injetada como backend de texto fixo e os PDFs de entrada
//! são sintetizados com o lopdf.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use nf_match_rust::models::{ExtractedText, ExtractionFailure, InputDocument, UNMATCHED_PREFIX};
use nf_match_rust::service::BatchError;
use nf_match_rust::{BatchProcessor, TextExtractor};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

/// Extrator de teste: texto fixo por nome de arquivo; nome desconhecido
/// simula um PDF que não pôde ser lido.
struct FixedTextExtractor {
    texts: HashMap<String, String>,
}

impl FixedTextExtractor {
    fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            texts: entries
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
        }
    }
}

impl TextExtractor for FixedTextExtractor {
    fn extract(
        &self,
        document: &InputDocument,
        _scratch: &Path,
    ) -> Result<ExtractedText, ExtractionFailure> {
        match self.texts.get(&document.filename) {
            Some(text) => Ok(ExtractedText::from_pages(vec![text.clone()])),
            None => Err(ExtractionFailure::InvalidPdf(
                "sem camada de texto no teste".to_string(),
            )),
        }
    }
}

/// PDF mínimo de uma página com um marcador no stream de conteúdo, para
/// conferir a ordem das páginas depois do merge.
fn tiny_pdf(marker: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 750.into()]),
            Operation::new("Tj", vec![Object::string_literal(marker)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("conteúdo codificável"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("PDF de teste serializável");
    bytes
}

/// Conteúdo (decomprimido) de cada página, na ordem do documento.
fn page_contents(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).expect("PDF de saída legível");
    doc.get_pages()
        .into_iter()
        .map(|(_, page_id)| {
            String::from_utf8_lossy(&doc.get_page_content(page_id).expect("conteúdo da página"))
                .to_string()
        })
        .collect()
}

fn processor(entries: &[(&str, &str)]) -> BatchProcessor {
    BatchProcessor::new(Arc::new(FixedTextExtractor::new(entries)))
}

fn archive_names(archive: &[u8]) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive.to_vec())).expect("ZIP legível");
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

#[test]
fn id_and_amount_match_merges_proof_before_source() {
    let processor = processor(&[
        (
            "(BTG) NF 100 Fornecedor X.pdf",
            "Nota Fiscal 100\nFornecedor X Ltda\nCNPJ 11.222.333/0001-44\nTotal: 1.000,00",
        ),
        (
            "PIX Comprovante.pdf",
            "Comprovante PIX\nCNPJ 11.222.333/0001-44\nValor: 1.000,00",
        ),
    ]);
    let documents = vec![
        InputDocument::new("(BTG) NF 100 Fornecedor X.pdf", tiny_pdf("MARCA-NF-100")),
        InputDocument::new("PIX Comprovante.pdf", tiny_pdf("MARCA-PIX")),
    ];

    let output = processor.process(documents).unwrap();

    assert_eq!(output.report.groups.len(), 1);
    assert_eq!(
        output.report.groups[0].matched_by.as_deref(),
        Some("CNPJ/CPF + valor")
    );
    assert!(output.report.warnings.is_empty());

    assert_eq!(output.artifacts.len(), 1);
    let artifact = &output.artifacts[0];
    assert_eq!(artifact.filename, "(BTG) NF 100 Fornecedor X.pdf");

    // comprovante vem antes da nota no PDF final
    let pages = page_contents(&artifact.bytes);
    assert_eq!(pages.len(), 2);
    assert!(pages[0].contains("MARCA-PIX"));
    assert!(pages[1].contains("MARCA-NF-100"));

    let names = archive_names(&output.archive);
    assert!(names.contains(&"(BTG) NF 100 Fornecedor X.pdf".to_string()));
    assert!(names.contains(&"relatorio.csv".to_string()));
}

#[test]
fn id_only_match_when_amount_is_off_by_more_than_tolerance() {
    // 1.005,50 está 0,55% acima de 1.000,00: fora da tolerância de valor,
    // mas o CNPJ em comum ainda fecha o grupo
    let processor = processor(&[
        (
            "NF 200.pdf",
            "CNPJ 11.222.333/0001-44\nTotal: 1.000,00",
        ),
        (
            "Comprovante TED.pdf",
            "CNPJ 11.222.333/0001-44\nValor: 1.005,50",
        ),
    ]);
    let documents = vec![
        InputDocument::new("NF 200.pdf", tiny_pdf("MARCA-NF-200")),
        InputDocument::new("Comprovante TED.pdf", tiny_pdf("MARCA-TED")),
    ];

    let output = processor.process(documents).unwrap();

    assert_eq!(output.report.groups.len(), 1);
    assert_eq!(output.report.groups[0].matched_by.as_deref(), Some("CNPJ/CPF"));
    let pages = page_contents(&output.artifacts[0].bytes);
    assert_eq!(pages.len(), 2);
}

#[test]
fn proof_without_any_signal_is_flagged_as_orphan() {
    let processor = processor(&[("Comprovante sem dados.pdf", "")]);
    let documents = vec![InputDocument::new(
        "Comprovante sem dados.pdf",
        tiny_pdf("MARCA-ORFAO"),
    )];

    let output = processor.process(documents).unwrap();

    assert_eq!(output.artifacts.len(), 1);
    assert_eq!(
        output.artifacts[0].filename,
        format!("{}Comprovante sem dados.pdf", UNMATCHED_PREFIX)
    );
    assert!(output
        .report
        .warnings
        .iter()
        .any(|w| w.contains("sem correspondência")));
    assert!(output
        .report
        .infos
        .iter()
        .any(|i| i.contains("nenhum sinal encontrado")));
}

#[test]
fn proofs_follow_amounts_when_sources_share_the_same_id() {
    let processor = processor(&[
        ("NF 300.pdf", "CNPJ 11.222.333/0001-44\nTotal: 1.000,00"),
        ("NF 301.pdf", "CNPJ 11.222.333/0001-44\nTotal: 2.500,00"),
        (
            "Comprovante 2500.pdf",
            "CNPJ 11.222.333/0001-44\nValor: 2.500,00",
        ),
        (
            "Comprovante 1000.pdf",
            "CNPJ 11.222.333/0001-44\nValor: 1.000,00",
        ),
    ]);
    let documents = vec![
        InputDocument::new("NF 300.pdf", tiny_pdf("MARCA-NF-300")),
        InputDocument::new("NF 301.pdf", tiny_pdf("MARCA-NF-301")),
        InputDocument::new("Comprovante 2500.pdf", tiny_pdf("MARCA-2500")),
        InputDocument::new("Comprovante 1000.pdf", tiny_pdf("MARCA-1000")),
    ];

    let output = processor.process(documents).unwrap();
    assert_eq!(output.artifacts.len(), 2);

    let nf300 = output
        .artifacts
        .iter()
        .find(|a| a.filename == "NF 300.pdf")
        .unwrap();
    let pages = page_contents(&nf300.bytes);
    assert!(pages[0].contains("MARCA-1000"));
    assert!(pages[1].contains("MARCA-NF-300"));

    let nf301 = output
        .artifacts
        .iter()
        .find(|a| a.filename == "NF 301.pdf")
        .unwrap();
    let pages = page_contents(&nf301.bytes);
    assert!(pages[0].contains("MARCA-2500"));
    assert!(pages[1].contains("MARCA-NF-301"));
}

#[test]
fn extraction_failure_becomes_warning_and_document_still_comes_out() {
    // "NF ilegivel.pdf" não está no extrator de teste: a extração falha,
    // o lote segue e o arquivo sai como item sem correspondência
    let processor = processor(&[]);
    let documents = vec![InputDocument::new("NF ilegivel.pdf", tiny_pdf("MARCA-X"))];

    let output = processor.process(documents).unwrap();

    assert!(output
        .report
        .warnings
        .iter()
        .any(|w| w.contains("falha ao extrair texto de NF ilegivel.pdf")));
    assert_eq!(output.artifacts.len(), 1);
    assert_eq!(
        output.artifacts[0].filename,
        format!("{}NF ilegivel.pdf", UNMATCHED_PREFIX)
    );
}

#[test]
fn empty_batch_is_rejected() {
    let processor = processor(&[]);
    let err = processor.process(Vec::new()).unwrap_err();
    assert!(matches!(err, BatchError::EmptyBatch));
}
