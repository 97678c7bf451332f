//! Keyword relevance used by hybrid search.
//!
//! BM25 over the candidate pool: document frequencies and the average length come
//! from the pool itself, and pool scores are divided by the best one so they land
//! in `[0, 1]` next to cosine similarity.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use super::model::PassageHit;

const K1: f64 = 1.2;
const B: f64 = 0.75;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "al", "algo", "ante", "bajo", "cada", "como", "con", "contra", "cual", "cuando",
        "de", "del", "desde", "donde", "durante", "e", "el", "ella", "ellos", "en", "entre",
        "era", "es", "esa", "ese", "eso", "esta", "este", "esto", "fue", "ha", "hacia", "han",
        "hasta", "hay", "la", "las", "le", "les", "lo", "los", "mas", "más", "me", "mi", "muy",
        "ni", "no", "o", "para", "pero", "por", "que", "qué", "se", "segun", "según", "ser",
        "si", "sin", "sobre", "son", "su", "sus", "también", "te", "tiene", "u", "un", "una",
        "uno", "unos", "unas", "y", "ya", "cómo", "cuál",
    ]
    .into_iter()
    .collect()
});

/// Lower-cased word tokens, split on non-alphanumeric characters, without Spanish
/// stop words or single characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1 && !STOP_WORDS.contains(*w))
        .map(str::to_string)
        .collect()
}

/// Term statistics for one candidate pool.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub total_docs: usize,
    pub total_len: usize,
    pub term_df: HashMap<String, usize>,
}

impl PoolStats {
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a [String]>) -> Self {
        let mut stats = Self::default();
        for terms in documents {
            stats.total_docs += 1;
            stats.total_len += terms.len();
            let unique: HashSet<&String> = terms.iter().collect();
            for term in unique {
                *stats.term_df.entry(term.clone()).or_insert(0) += 1;
            }
        }
        stats
    }

    fn avg_len(&self) -> f64 {
        if self.total_docs == 0 {
            return 1.0;
        }
        (self.total_len as f64 / self.total_docs as f64).max(1.0)
    }
}

/// BM25 of one tokenized document against `query_terms`.
pub fn bm25(query_terms: &[String], doc_terms: &[String], stats: &PoolStats) -> f64 {
    if query_terms.is_empty() || doc_terms.is_empty() || stats.total_docs == 0 {
        return 0.0;
    }

    let mut term_freqs: HashMap<&str, usize> = HashMap::new();
    for term in doc_terms {
        *term_freqs.entry(term.as_str()).or_insert(0) += 1;
    }

    let total_docs = stats.total_docs as f64;
    let length_ratio = doc_terms.len() as f64 / stats.avg_len();
    let mut score = 0.0;
    for term in query_terms {
        let Some(&freq) = term_freqs.get(term.as_str()) else {
            continue;
        };
        let df = stats.term_df.get(term).copied().unwrap_or(1) as f64;
        let idf = ((total_docs - df + 0.5) / (df + 0.5) + 1.0).ln();
        let freq = freq as f64;
        score += idf * freq * (K1 + 1.0) / (freq + K1 * (1.0 - B + B * length_ratio));
    }
    score
}

/// Lexical relevance of each document to `query`, in `[0, 1]` and in input order.
/// The best-matching document scores 1; all zeros when nothing matches.
pub fn pool_relevance<S: AsRef<str>>(query: &str, documents: &[S]) -> Vec<f32> {
    let mut query_terms = tokenize(query);
    query_terms.sort_unstable();
    query_terms.dedup();
    let docs: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();
    let stats = PoolStats::from_documents(docs.iter().map(Vec::as_slice));

    let raw: Vec<f64> = docs
        .iter()
        .map(|terms| bm25(&query_terms, terms, &stats))
        .collect();
    let best = raw.iter().copied().fold(0.0_f64, f64::max);
    if best <= 0.0 {
        return vec![0.0; raw.len()];
    }
    raw.into_iter().map(|s| (s / best) as f32).collect()
}

/// Lowest vector score that can still reach `threshold` once blended, given a
/// lexical score of at most 1.
pub fn min_vector_score(threshold: f32, vector_weight: f32) -> f32 {
    if vector_weight <= 0.0 {
        return 0.0;
    }
    ((threshold - (1.0 - vector_weight)) / vector_weight).clamp(0.0, 1.0)
}

/// Re-scores vector hits with `w·vector + (1−w)·lexical`, keeps those at or above
/// `threshold`, and returns the best `limit` in a stable order.
pub fn blend(
    hits: Vec<PassageHit>,
    query_text: &str,
    vector_weight: f32,
    threshold: f32,
    limit: usize,
) -> Vec<PassageHit> {
    let contents: Vec<&str> = hits.iter().map(|h| h.passage.content.as_str()).collect();
    let lexical = pool_relevance(query_text, &contents);

    let mut blended: Vec<PassageHit> = hits
        .into_iter()
        .zip(lexical)
        .map(|(mut hit, lexical)| {
            hit.score = (vector_weight * hit.score + (1.0 - vector_weight) * lexical).clamp(0.0, 1.0);
            hit
        })
        .filter(|hit| hit.score >= threshold)
        .collect();

    blended.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    blended.truncate(limit);
    blended
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(text: &str) -> Vec<String> {
        tokenize(text)
    }

    #[test]
    fn test_tokenize_drops_stop_words_and_punctuation() {
        assert_eq!(
            tokenize("La retroalimentación, en 1 clase: formativa."),
            vec!["retroalimentación", "clase", "formativa"]
        );
        assert!(tokenize("de la y el").is_empty());
    }

    #[test]
    fn test_pool_relevance_prefers_overlap() {
        let scores = pool_relevance(
            "retroalimentación formativa",
            &[
                "La retroalimentación formativa orienta el aprendizaje",
                "Organización del mobiliario de la sala",
            ],
        );
        assert_eq!(scores, vec![1.0, 0.0]);
    }

    #[test]
    fn test_pool_relevance_without_content_terms_is_zero() {
        assert_eq!(pool_relevance("de la y el", &["de la y el"]), vec![0.0]);
        assert!(pool_relevance::<&str>("clima", &[]).is_empty());
    }

    #[test]
    fn test_bm25_rare_term_outweighs_common_term() {
        let docs = [
            terms("evaluación formativa en el aula"),
            terms("evaluación sumativa del semestre"),
            terms("evaluación diagnóstica inicial"),
        ];
        let stats = PoolStats::from_documents(docs.iter().map(Vec::as_slice));
        assert_eq!(stats.total_docs, 3);
        assert_eq!(stats.term_df["evaluación"], 3);

        let common = bm25(&terms("evaluación"), &docs[1], &stats);
        let rare = bm25(&terms("formativa"), &docs[0], &stats);
        assert!(rare > common);
    }

    #[test]
    fn test_bm25_penalizes_longer_documents() {
        let short = terms("convivencia escolar");
        let long = terms("convivencia escolar normas acuerdos rutinas espacios tiempos recreo");
        let stats = PoolStats::from_documents([short.as_slice(), long.as_slice()]);

        let query = terms("convivencia");
        assert!(bm25(&query, &short, &stats) > bm25(&query, &long, &stats));
    }

    #[test]
    fn test_min_vector_score() {
        assert!((min_vector_score(0.65, 0.7) - 0.5).abs() < 1e-6);
        assert_eq!(min_vector_score(0.2, 0.7), 0.0);
        assert_eq!(min_vector_score(0.9, 0.0), 0.0);
    }
}
