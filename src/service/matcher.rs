use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use std::str::FromStr;

use crate::models::{
    ClassifiedDocument, DocumentRole, GroupStatus, MatchGroup, MatchSignal, SignalSet,
    UNMATCHED_PREFIX,
};

/// Tolerância relativa na comparação de valores: 0,5%. Extração e OCR
/// erram o dígito menos significativo com frequência, então valor nunca
/// é comparado por igualdade exata.
static AMOUNT_TOLERANCE: Lazy<BigDecimal> =
    Lazy::new(|| BigDecimal::from_str("0.005").unwrap());

/// Similaridade mínima de nome para fechar grupo só pelo favorecido.
const NAME_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Arena de comprovantes: a ordem de chegada é preservada e cada entrada
/// reivindicada é marcada, nunca removida no meio da iteração. Um
/// comprovante pertence a no máximo um grupo.
struct ProofPool {
    proofs: Vec<ClassifiedDocument>,
    claimed: IndexSet<usize>,
}

impl ProofPool {
    fn new(proofs: Vec<ClassifiedDocument>) -> Self {
        Self {
            proofs,
            claimed: IndexSet::new(),
        }
    }

    /// Comprovantes ainda livres, na ordem de chegada.
    fn available(&self) -> impl Iterator<Item = (usize, &ClassifiedDocument)> {
        self.proofs
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.claimed.contains(idx))
    }

    fn claim(&mut self, idx: usize) -> ClassifiedDocument {
        self.claimed.insert(idx);
        self.proofs[idx].clone()
    }

    /// Consome a arena devolvendo os comprovantes que sobraram livres.
    fn into_unclaimed(self) -> Vec<ClassifiedDocument> {
        let claimed = self.claimed;
        self.proofs
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !claimed.contains(idx))
            .map(|(_, proof)| proof)
            .collect()
    }
}

/// Pareia os documentos de um lote. Para cada documento de origem, na
/// ordem de chegada, procura um comprovante no pool atual testando as
/// combinações de sinais da mais forte para a mais fraca:
///
/// 1. CNPJ/CPF em comum E valor dentro da tolerância;
/// 2. só CNPJ/CPF em comum;
/// 3. só valor dentro da tolerância;
/// 4. similaridade de nome do favorecido acima do corte.
///
/// Nas rodadas 1–3 vence o primeiro comprovante livre na ordem do pool;
/// na rodada 4 vence o maior placar. Origem sem par e comprovante sem
/// dono nunca somem: viram grupos explícitos "sem correspondência".
pub fn match_documents(documents: Vec<ClassifiedDocument>) -> Vec<MatchGroup> {
    // 1. separa origem e comprovantes preservando a ordem de chegada
    let mut sources = Vec::new();
    let mut proofs = Vec::new();
    for doc in documents {
        match doc.role {
            DocumentRole::SourceDocument => sources.push(doc),
            DocumentRole::ProofOfPayment => proofs.push(doc),
        }
    }
    tracing::info!(
        "pareando {} documento(s) de origem com {} comprovante(s)",
        sources.len(),
        proofs.len()
    );

    let mut pool = ProofPool::new(proofs);
    let mut groups = Vec::new();

    // 2. uma rodada completa por documento de origem, contra o pool atual
    for source in sources {
        let hit = find_by_id_and_amount(&source, &pool)
            .map(|idx| (idx, MatchSignal::TaxIdAndAmount))
            .or_else(|| find_by_id(&source, &pool).map(|idx| (idx, MatchSignal::TaxIdOnly)))
            .or_else(|| find_by_amount(&source, &pool).map(|idx| (idx, MatchSignal::AmountOnly)))
            .or_else(|| find_by_name(&source, &pool).map(|idx| (idx, MatchSignal::SupplierName)));

        match hit {
            Some((idx, signal)) => {
                let proof = pool.claim(idx);
                tracing::info!(
                    "{} ← {} ({})",
                    source.document.filename,
                    proof.document.filename,
                    signal.label()
                );
                groups.push(MatchGroup {
                    key: source.document.filename.clone(),
                    members: vec![proof.document, source.document],
                    status: GroupStatus::Matched(signal),
                });
            }
            None => {
                tracing::warn!(
                    "nenhum comprovante encontrado para {}",
                    source.document.filename
                );
                groups.push(MatchGroup {
                    key: format!("{}{}", UNMATCHED_PREFIX, source.document.filename),
                    members: vec![source.document],
                    status: GroupStatus::Unmatched,
                });
            }
        }
    }

    // 3. comprovantes livres ao final viram grupos órfãos individuais
    for proof in pool.into_unclaimed() {
        tracing::warn!("comprovante órfão: {}", proof.document.filename);
        groups.push(MatchGroup {
            key: format!("{}{}", UNMATCHED_PREFIX, proof.document.filename),
            members: vec![proof.document],
            status: GroupStatus::Unmatched,
        });
    }

    groups
}

/// |a - b| / b <= 0,005, pulando b = 0. Reescrito sem divisão:
/// |a - b| <= |b| * 0,005, exato em BigDecimal.
pub fn amounts_within_tolerance(a: &BigDecimal, b: &BigDecimal) -> bool {
    if b.is_zero() {
        return false;
    }
    let diff = (a - b).abs();
    diff <= b.abs() * &*AMOUNT_TOLERANCE
}

/// Algum par (valor do comprovante, valor da origem) dentro da tolerância.
fn shares_amount(proof: &SignalSet, source: &SignalSet) -> bool {
    source
        .amounts
        .iter()
        .any(|b| proof.amounts.iter().any(|a| amounts_within_tolerance(a, b)))
}

fn find_by_id_and_amount(source: &ClassifiedDocument, pool: &ProofPool) -> Option<usize> {
    pool.available()
        .find(|(_, proof)| {
            proof.signals.shares_tax_id(&source.signals)
                && shares_amount(&proof.signals, &source.signals)
        })
        .map(|(idx, _)| idx)
}

fn find_by_id(source: &ClassifiedDocument, pool: &ProofPool) -> Option<usize> {
    pool.available()
        .find(|(_, proof)| proof.signals.shares_tax_id(&source.signals))
        .map(|(idx, _)| idx)
}

fn find_by_amount(source: &ClassifiedDocument, pool: &ProofPool) -> Option<usize> {
    pool.available()
        .find(|(_, proof)| shares_amount(&proof.signals, &source.signals))
        .map(|(idx, _)| idx)
}

/// Rodada 4: melhor placar de similaridade acima do corte, entre todos os
/// comprovantes livres. Abaixo do corte não há grupo.
fn find_by_name(source: &ClassifiedDocument, pool: &ProofPool) -> Option<usize> {
    let source_name = source.signals.supplier_name.as_deref()?;

    let mut best: Option<(usize, f64)> = None;
    for (idx, proof) in pool.available() {
        let Some(name) = proof.signals.supplier_name.as_deref() else {
            continue;
        };
        let score = name_similarity(name, source_name);
        if score <= NAME_SIMILARITY_THRESHOLD {
            continue;
        }
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Similaridade 0–1 entre nomes: coeficiente de Dice sobre bigramas,
/// indiferente a caixa, acentos e pontuação.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_name(a);
    let b = normalize_name(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let bigrams = |s: &str| -> Vec<(char, char)> {
        let chars: Vec<char> = s.chars().collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    };
    let left = bigrams(&a);
    let mut right = bigrams(&b);
    let total = left.len() + right.len();
    if total == 0 {
        return 0.0;
    }

    let mut shared = 0usize;
    for gram in &left {
        if let Some(pos) = right.iter().position(|g| g == gram) {
            right.swap_remove(pos);
            shared += 1;
        }
    }
    (2.0 * shared as f64) / (total as f64)
}

/// Minúsculas, sem acentos, só letras/dígitos/espaço, espaços colapsados.
fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_space = true;
    for c in name.to_lowercase().chars() {
        let c = strip_accent(c);
        if c.is_alphanumeric() {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

fn strip_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        _ => c,
    }
}
