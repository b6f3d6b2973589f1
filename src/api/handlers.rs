use crate::models::BatchReport;
use crate::models::InputDocument;
use crate::service::{BatchError, BatchOutput, BatchProcessor};
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

/// Resposta padrão de erro/estado.
#[derive(Debug, Serialize)]
pub struct BatchMatchResponse {
    pub success: bool,
    pub message: String,
}

/// Resposta do endpoint de relatório (sem os bytes dos PDFs).
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub success: bool,
    pub message: String,
    pub report: Option<BatchReport>,
}

/// Verificação de saúde
pub async fn health_check() -> &'static str {
    "OK"
}

/// Upload multipart de PDFs → ZIP com os grupos montados + relatorio.csv.
pub async fn conciliar(
    State(processor): State<Arc<BatchProcessor>>,
    multipart: Multipart,
) -> Response {
    match run_batch(processor, multipart).await {
        Ok(output) => {
            let disposition = format!("attachment; filename=\"{}\"", output.archive_name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                output.archive,
            )
                .into_response()
        }
        Err(response) => response,
    }
}

/// Mesmo processamento, devolvendo só o relatório em JSON.
pub async fn conciliar_relatorio(
    State(processor): State<Arc<BatchProcessor>>,
    multipart: Multipart,
) -> Response {
    match run_batch(processor, multipart).await {
        Ok(output) => {
            let response = ReportResponse {
                success: true,
                message: format!(
                    "{} grupo(s) montado(s), {} aviso(s)",
                    output.report.groups.len(),
                    output.report.warnings.len()
                ),
                report: Some(output.report),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(response) => response,
    }
}

/// Lê o multipart e roda o lote em uma thread de bloqueio; o pipeline é
/// síncrono de ponta a ponta.
async fn run_batch(
    processor: Arc<BatchProcessor>,
    mut multipart: Multipart,
) -> Result<BatchOutput, Response> {
    let mut documents = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                match field.bytes().await {
                    Ok(bytes) if !bytes.is_empty() => {
                        documents.push(InputDocument::new(filename, bytes.to_vec()));
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        return Err(error_response(
                            StatusCode::BAD_REQUEST,
                            format!("upload inválido ({filename}): {e}"),
                        ))
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("upload inválido: {e}"),
                ))
            }
        }
    }

    let joined = tokio::task::spawn_blocking(move || processor.process(documents)).await;
    match joined {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(BatchError::EmptyBatch)) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "nenhum arquivo recebido".to_string(),
        )),
        Ok(Err(e)) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {e}"),
        )),
        Err(e) => Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {e}"),
        )),
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    let response = BatchMatchResponse {
        success: false,
        message,
    };
    (status, Json(response)).into_response()
}
