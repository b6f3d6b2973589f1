use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use thiserror::Error;

use crate::models::{BatchReport, MatchGroup, OutputArtifact};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("falha ao ler {filename}: {message}")]
    UnreadableMember { filename: String, message: String },

    #[error("nenhuma página encontrada nos membros do grupo")]
    NoPages,

    #[error("falha ao gravar o PDF final: {0}")]
    Write(String),
}

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("falha ao montar o arquivo ZIP: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("falha de E/S ao gravar o ZIP: {0}")]
    Io(#[from] std::io::Error),

    #[error("falha ao gerar o relatório CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Concatena os PDFs de um grupo em um único arquivo, na ordem dos
/// membros (comprovantes primeiro, origem por último, por convenção o
/// pagamento vem antes da cobrança). Falha aqui afeta só este grupo.
pub fn merge_group(group: &MatchGroup) -> Result<OutputArtifact, MergeError> {
    // 1. carrega todos os membros; membro ilegível aborta o grupo
    let mut documents = Vec::with_capacity(group.members.len());
    for member in &group.members {
        let doc = Document::load_mem(&member.bytes).map_err(|e| MergeError::UnreadableMember {
            filename: member.filename.clone(),
            message: e.to_string(),
        })?;
        documents.push(doc);
    }

    // 2. funde as árvores de páginas e serializa
    let mut merged = merge_documents(documents)?;
    let mut bytes = Vec::new();
    merged
        .save_to(&mut bytes)
        .map_err(|e| MergeError::Write(e.to_string()))?;

    Ok(OutputArtifact {
        filename: pdf_filename(&group.key),
        bytes,
    })
}

/// Garante a extensão .pdf na chave do grupo.
fn pdf_filename(key: &str) -> String {
    if key.to_lowercase().ends_with(".pdf") {
        key.to_string()
    } else {
        format!("{key}.pdf")
    }
}

/// Fusão de árvore de páginas do lopdf: renumera os objetos de cada
/// documento para faixas disjuntas, reaproveita um único Catalog/Pages e
/// reaponta o Parent de cada página.
fn merge_documents(inputs: Vec<Document>) -> Result<Document, MergeError> {
    let mut max_id = 1;
    let mut page_objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut all_objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in inputs {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;
        for (_, object_id) in doc.get_pages() {
            if let Ok(object) = doc.get_object(object_id) {
                page_objects.insert(object_id, object.to_owned());
            }
        }
        all_objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Object)> = None;
    let mut page_tree: Option<(ObjectId, Object)> = None;

    for (object_id, object) in all_objects {
        let kind = object
            .as_dict()
            .ok()
            .and_then(|dict| dict.get(b"Type").ok())
            .and_then(|t| t.as_name().ok())
            .map(|name| name.to_vec())
            .unwrap_or_default();

        match kind.as_slice() {
            b"Catalog" => {
                let id = catalog.as_ref().map(|(id, _)| *id).unwrap_or(object_id);
                catalog = Some((id, object));
            }
            b"Pages" => {
                // acumula os atributos herdáveis dos vários /Pages em um só
                if let Ok(dict) = object.as_dict() {
                    let mut dict = dict.clone();
                    if let Some((_, existing)) = &page_tree {
                        if let Ok(old) = existing.as_dict() {
                            dict.extend(old);
                        }
                    }
                    let id = page_tree.as_ref().map(|(id, _)| *id).unwrap_or(object_id);
                    page_tree = Some((id, Object::Dictionary(dict)));
                }
            }
            // páginas entram depois, já com o Parent novo; outlines caem
            b"Page" | b"Outlines" | b"Outline" => {}
            _ => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let (pages_id, pages_obj) = page_tree.ok_or(MergeError::NoPages)?;
    let (catalog_id, catalog_obj) = catalog.ok_or(MergeError::NoPages)?;
    if page_objects.is_empty() {
        return Err(MergeError::NoPages);
    }

    for (object_id, object) in &page_objects {
        if let Ok(dict) = object.as_dict() {
            let mut dict = dict.clone();
            dict.set("Parent", pages_id);
            merged.objects.insert(*object_id, Object::Dictionary(dict));
        }
    }

    if let Ok(dict) = pages_obj.as_dict() {
        let mut dict = dict.clone();
        dict.set("Count", page_objects.len() as u32);
        dict.set(
            "Kids",
            page_objects
                .keys()
                .map(|id| Object::Reference(*id))
                .collect::<Vec<_>>(),
        );
        merged.objects.insert(pages_id, Object::Dictionary(dict));
    }

    if let Ok(dict) = catalog_obj.as_dict() {
        let mut dict = dict.clone();
        dict.set("Pages", pages_id);
        dict.remove(b"Outlines");
        merged.objects.insert(catalog_id, Object::Dictionary(dict));
    }

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.compress();
    Ok(merged)
}

/// Empacota todos os artefatos + relatorio.csv em um único ZIP.
pub fn package_archive(
    artifacts: &[OutputArtifact],
    report: &BatchReport,
) -> Result<Vec<u8>, PackageError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for artifact in artifacts {
        writer.start_file(artifact.filename.as_str(), options)?;
        writer.write_all(&artifact.bytes)?;
    }

    writer.start_file("relatorio.csv", options)?;
    writer.write_all(&report_csv(report)?)?;

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Uma linha por grupo: arquivo de saída, membros, critério do pareamento.
fn report_csv(report: &BatchReport) -> Result<Vec<u8>, PackageError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["arquivo_saida", "documentos", "criterio"])?;
    for group in &report.groups {
        let members = group.members.join("; ");
        let matched_by = group.matched_by.as_deref().unwrap_or("sem correspondencia");
        wtr.write_record([group.output.as_str(), members.as_str(), matched_by])?;
    }
    for warning in &report.warnings {
        wtr.write_record(["aviso", warning.as_str(), ""])?;
    }
    wtr.into_inner()
        .map_err(|e| PackageError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupSummary;
    use std::io::Read;

    #[test]
    fn group_keys_keep_or_gain_pdf_extension() {
        assert_eq!(pdf_filename("NF 10.pdf"), "NF 10.pdf");
        assert_eq!(pdf_filename("NF 10.PDF"), "NF 10.PDF");
        assert_eq!(pdf_filename("NF 10"), "NF 10.pdf");
    }

    #[test]
    fn archive_contains_artifacts_and_report() {
        let artifacts = vec![OutputArtifact {
            filename: "NF 10.pdf".to_string(),
            bytes: b"%PDF-1.5 fake".to_vec(),
        }];
        let report = BatchReport {
            groups: vec![GroupSummary {
                output: "NF 10.pdf".to_string(),
                members: vec!["PIX.pdf".to_string(), "NF 10.pdf".to_string()],
                matched_by: Some("CNPJ/CPF + valor".to_string()),
            }],
            warnings: vec!["sem correspondência para X.pdf".to_string()],
            infos: vec![],
        };

        let archive = package_archive(&artifacts, &report).unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();

        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"NF 10.pdf".to_string()));
        assert!(names.contains(&"relatorio.csv".to_string()));

        let mut csv_text = String::new();
        zip.by_name("relatorio.csv")
            .unwrap()
            .read_to_string(&mut csv_text)
            .unwrap();
        assert!(csv_text.contains("CNPJ/CPF + valor"));
        assert!(csv_text.contains("sem correspondência para X.pdf"));
    }

    #[test]
    fn unreadable_member_fails_only_with_its_filename() {
        let group = MatchGroup {
            key: "NF quebrada.pdf".to_string(),
            members: vec![crate::models::InputDocument::new(
                "NF quebrada.pdf",
                b"nao e um pdf".to_vec(),
            )],
            status: crate::models::GroupStatus::Unmatched,
        };
        let err = merge_group(&group).unwrap_err();
        match err {
            MergeError::UnreadableMember { filename, .. } => {
                assert_eq!(filename, "NF quebrada.pdf")
            }
            other => panic!("erro inesperado: {other}"),
        }
    }
}
