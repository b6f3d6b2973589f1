use serde::{Deserialize, Serialize};

use super::InputDocument;

/// Prefixo de saída para itens que terminaram o pareamento sem par.
/// Sem acento de propósito: o nome vira arquivo dentro do ZIP.
pub const UNMATCHED_PREFIX: &str = "Sem Correspondencia - ";

/// Qual combinação de sinais fechou o grupo, da mais forte para a mais
/// fraca. Registrada no relatório para o usuário auditar o pareamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchSignal {
    TaxIdAndAmount,
    TaxIdOnly,
    AmountOnly,
    SupplierName,
}

impl MatchSignal {
    pub fn label(&self) -> &'static str {
        match self {
            MatchSignal::TaxIdAndAmount => "CNPJ/CPF + valor",
            MatchSignal::TaxIdOnly => "CNPJ/CPF",
            MatchSignal::AmountOnly => "valor",
            MatchSignal::SupplierName => "nome do favorecido",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupStatus {
    Matched(MatchSignal),
    Unmatched,
}

/// Grupo de saída: comprovante(s) primeiro, documento de origem por último,
/// ou um item órfão sozinho. A chave é o nome canônico do PDF final
/// (normalmente o nome do próprio documento de origem).
#[derive(Debug, Clone)]
pub struct MatchGroup {
    pub key: String,
    pub members: Vec<InputDocument>,
    pub status: GroupStatus,
}

/// PDF final nomeado, pronto para download individual ou dentro do ZIP.
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Linha do relatório por grupo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Nome do PDF gerado.
    pub output: String,
    /// Nomes dos arquivos originais que compõem o grupo.
    pub members: Vec<String>,
    /// Critério que fechou o grupo; `None` para itens sem correspondência.
    pub matched_by: Option<String>,
}

/// Resultado de um lote, devolvido pela API e gravado como relatorio.csv.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub groups: Vec<GroupSummary>,
    pub warnings: Vec<String>,
    pub infos: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_to_json() {
        let report = BatchReport {
            groups: vec![GroupSummary {
                output: "NF 10.pdf".to_string(),
                members: vec!["Comprovante.pdf".to_string(), "NF 10.pdf".to_string()],
                matched_by: Some(MatchSignal::TaxIdAndAmount.label().to_string()),
            }],
            warnings: vec![],
            infos: vec![],
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("NF 10.pdf"));
        assert!(json.contains("CNPJ/CPF + valor"));
    }
}
