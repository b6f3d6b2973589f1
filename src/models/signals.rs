use bigdecimal::BigDecimal;
use std::collections::BTreeSet;

/// Sinais candidatos extraídos do texto de um documento. Cada sinal é
/// parcialmente confiável; o pareamento combina os três em ordem de força.
#[derive(Debug, Clone, Default)]
pub struct SignalSet {
    /// Valores monetários em decimal exato (nunca ponto flutuante).
    pub amounts: BTreeSet<BigDecimal>,
    /// CNPJs/CPFs normalizados para dígitos, já sem os IDs de rodapé.
    pub tax_ids: BTreeSet<String>,
    /// Nome do favorecido/fornecedor, quando algum foi encontrado.
    pub supplier_name: Option<String>,
}

impl SignalSet {
    /// Documento sem nenhum sinal: estado válido que leva ao caminho órfão.
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty() && self.tax_ids.is_empty() && self.supplier_name.is_none()
    }

    /// Interseção de CNPJ/CPF com outro conjunto de sinais.
    pub fn shares_tax_id(&self, other: &SignalSet) -> bool {
        self.tax_ids.intersection(&other.tax_ids).next().is_some()
    }
}
