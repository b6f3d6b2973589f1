use bigdecimal::BigDecimal;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::models::SignalSet;

/// Valores no formato brasileiro: milhar com ponto, decimal com vírgula.
/// O prefixo impede que o sufixo de um token malformado ("1.23,45")
/// passe por valor válido.
static AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\d.,])(\d{1,3}(?:\.\d{3})*,\d{2})\b").unwrap());

/// CNPJ: 14 dígitos, com ou sem pontuação.
static CNPJ_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}\b").unwrap());

/// CPF: 11 dígitos, com ou sem pontuação.
static CPF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}\.?\d{3}\.?\d{3}-?\d{2}\b").unwrap());

/// Rótulo seguido do nome do favorecido/fornecedor, na mesma linha.
static LABELED_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:favorecido|benefici[áa]rio|raz[ãa]o social|nome)[^\S\r\n]*[:\-][^\S\r\n]*(\S[^\r\n]*)")
        .unwrap()
});

/// Sequência de duas ou mais palavras capitalizadas, último recurso
/// quando nenhuma linha rotulada existe.
static CAPITALIZED_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\p{Lu}[\p{L}.&]+(?:[^\S\r\n]+\p{Lu}[\p{L}.&]+)+").unwrap());

/// CNPJs de template que aparecem em todos os documentos do mesmo emissor
/// (rodapé do internet banking, cabeçalho do escritório de contabilidade)
/// e cruzariam qualquer comprovante com qualquer nota.
const TAX_ID_DENYLIST: &[&str] = &[
    "30306294000145", // Banco BTG Pactual, rodapé de comprovante
    "00000000000191", // Banco do Brasil, boleto padrão
    "60701190000104", // Itaú Unibanco, cabeçalho de comprovante
];

/// Extrai os três sinais de uma vez.
pub fn extract_signals(text: &str) -> SignalSet {
    SignalSet {
        amounts: find_amounts(text),
        tax_ids: find_tax_ids(text),
        supplier_name: find_supplier_name(text),
    }
}

/// Valores monetários do texto, já como decimal exato. Tokens que não
/// parseiam são descartados em silêncio.
pub fn find_amounts(text: &str) -> BTreeSet<BigDecimal> {
    AMOUNT_RE
        .captures_iter(text)
        .filter_map(|cap| {
            let normalized = cap[1].replace('.', "").replace(',', ".");
            BigDecimal::from_str(&normalized).ok()
        })
        .collect()
}

/// CNPJs e CPFs do texto, normalizados para dígitos e sem os IDs da
/// denylist. Pontuação nunca diferencia dois IDs iguais.
pub fn find_tax_ids(text: &str) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    for re in [&*CNPJ_RE, &*CPF_RE] {
        for m in re.find_iter(text) {
            ids.insert(normalize_tax_id(m.as_str()));
        }
    }
    for denied in TAX_ID_DENYLIST {
        ids.remove(*denied);
    }
    ids
}

/// Mantém apenas os dígitos. Idempotente por construção.
pub fn normalize_tax_id(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Nome do favorecido: primeira linha rotulada, senão a primeira sequência
/// de palavras capitalizadas. Sinal fraco, usado só como desempate final.
pub fn find_supplier_name(text: &str) -> Option<String> {
    for cap in LABELED_NAME_RE.captures_iter(text) {
        let name = cap[1].trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }
    CAPITALIZED_RUN_RE
        .find(text)
        .map(|m| m.as_str().trim().to_string())
}
