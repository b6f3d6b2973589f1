use crate::models::DocumentRole;

/// Tabela de palavras-chave que marcam um arquivo como comprovante de
/// pagamento. Comparadas em minúsculas, em qualquer posição do nome.
/// Qualquer nome sem essas palavras é tratado como documento de origem
/// (NF, boleto, fatura). Só o nome do arquivo é consultado, nunca o
/// conteúdo: arquivo mal nomeado é classificado errado mesmo.
const PROOF_KEYWORDS: &[&str] = &[
    "comprovante",
    "pix",
    "transf", // transferencia, transferência, transf.
    "ted",
    "recibo",
    "pagamento",
    "pagto",
];

/// Função total: todo nome de arquivo recebe exatamente um papel.
pub fn classify(filename: &str) -> DocumentRole {
    let lower = filename.to_lowercase();
    if PROOF_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        DocumentRole::ProofOfPayment
    } else {
        DocumentRole::SourceDocument
    }
}
