use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{IndexedSegment, SimilarityIndex};
use crate::error::{QuizError, Result};

/// Weight of relevance against redundancy when diversifying results
const RELEVANCE_WEIGHT: f64 = 0.5;

type TermVector = HashMap<String, f64>;

struct Store {
    items: Vec<IndexedSegment>,
    vectors: Vec<TermVector>,
}

impl Store {
    fn new(items: Vec<IndexedSegment>) -> Self {
        let vectors = items.iter().map(|item| term_vector(&item.segment.content)).collect();
        Self { items, vectors }
    }
}

/// Term-overlap similarity index persisted as JSON under a directory
///
/// Scores are cosine similarities of term counts; results are diversified
/// with maximal marginal relevance.
pub struct LexicalIndex {
    store_dir: PathBuf,
    stores: RwLock<HashMap<String, Arc<Store>>>,
}

impl LexicalIndex {
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
            stores: RwLock::new(HashMap::new()),
        }
    }

    fn store_path(&self, store: &str) -> Result<PathBuf> {
        if store.is_empty() || !store.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(QuizError::Validation(format!("invalid store name '{}'", store)));
        }
        Ok(self.store_dir.join(format!("{}.json", store)))
    }

    async fn store(&self, store: &str) -> Result<Arc<Store>> {
        self.load(store).await?;
        self.stores
            .read()
            .await
            .get(store)
            .cloned()
            .ok_or_else(|| QuizError::PersistenceFailure(format!("store '{}' is not loaded", store)))
    }
}

fn word() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\w+").expect("valid word regex"))
}

fn term_vector(text: &str) -> TermVector {
    let mut vector = TermVector::new();
    for term in word().find_iter(&text.to_lowercase()) {
        *vector.entry(term.as_str().to_string()).or_insert(0.0) += 1.0;
    }
    vector
}

fn cosine(a: &TermVector, b: &TermVector) -> f64 {
    let dot: f64 = a.iter().filter_map(|(term, x)| b.get(term).map(|y| x * y)).sum();
    let norm = |v: &TermVector| v.values().map(|x| x * x).sum::<f64>().sqrt();
    let denominator = norm(a) * norm(b);
    if denominator == 0.0 {
        0.0
    } else {
        dot / denominator
    }
}

async fn write_store(path: &Path, items: &[IndexedSegment]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| QuizError::PersistenceFailure(format!("{}: {}", parent.display(), e)))?;
    }
    let json = serde_json::to_string(items).map_err(|e| QuizError::PersistenceFailure(e.to_string()))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| QuizError::PersistenceFailure(format!("{}: {}", path.display(), e)))
}

#[async_trait]
impl SimilarityIndex for LexicalIndex {
    async fn build(&self, items: Vec<IndexedSegment>, store: &str) -> Result<()> {
        let path = self.store_path(store)?;
        write_store(&path, &items).await?;

        info!("📚 Built store {} with {} segments at {}", store, items.len(), path.display());
        self.stores.write().await.insert(store.to_string(), Arc::new(Store::new(items)));
        Ok(())
    }

    async fn load(&self, store: &str) -> Result<()> {
        if self.stores.read().await.contains_key(store) {
            return Ok(());
        }

        let path = self.store_path(store)?;
        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| QuizError::PersistenceFailure(format!("{}: {}", path.display(), e)))?;
        let items: Vec<IndexedSegment> = serde_json::from_str(&json)?;

        debug!("Loaded store {} ({} segments)", store, items.len());
        self.stores.write().await.insert(store.to_string(), Arc::new(Store::new(items)));
        Ok(())
    }

    async fn query(&self, store: &str, text: &str, k: usize, pool: usize) -> Result<Vec<IndexedSegment>> {
        let store = self.store(store).await?;
        let query = term_vector(text);

        let mut candidates: Vec<(usize, f64)> = store
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| (index, cosine(&query, vector)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        candidates.truncate(pool.max(k));

        let mut selected: Vec<usize> = Vec::with_capacity(k);
        while selected.len() < k && !candidates.is_empty() {
            let best = candidates
                .iter()
                .enumerate()
                .map(|(position, (index, relevance))| {
                    let redundancy = selected
                        .iter()
                        .map(|chosen| cosine(&store.vectors[*index], &store.vectors[*chosen]))
                        .fold(0.0, f64::max);
                    (position, RELEVANCE_WEIGHT * relevance - (1.0 - RELEVANCE_WEIGHT) * redundancy)
                })
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(position, _)| position);

            match best {
                Some(position) => selected.push(candidates.remove(position).0),
                None => break,
            }
        }

        Ok(selected.into_iter().map(|index| store.items[index].clone()).collect())
    }
}
