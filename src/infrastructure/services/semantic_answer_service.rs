//! Semantic answer service
//!
//! Answers questions through a semantic cache: the question is embedded,
//! the vector index is range-searched for an equivalent question, and only
//! on a miss is the generator invoked. New answers are written back to the
//! index by a detached task so the caller never waits on the write.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::TimeoutConfig;
use crate::domain::{
    AnswerGenerator, CacheEntry, CacheLookup, DomainError, EmbeddingProvider, GeneratedAnswer,
    QuestionKeyGenerator, RangeQuery, SemanticCacheConfig, VectorIndex,
};
use crate::infrastructure::observability::{
    record_answer, record_cache_lookup, record_cache_read_failure, record_cache_write,
    CacheLookupOutcome,
};

/// How the answer was obtained
#[derive(Debug, Clone, PartialEq)]
pub enum CacheStatus {
    /// Served from the entry at `key`, `distance` away from the question
    Hit { key: String, distance: f32 },
    /// Generated and scheduled for caching
    Miss,
    /// Caching is disabled
    Bypass,
}

impl CacheStatus {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit { .. })
    }

    pub fn as_str(&self) -> &'static str {
        self.outcome().as_str()
    }

    fn outcome(&self) -> CacheLookupOutcome {
        match self {
            CacheStatus::Hit { .. } => CacheLookupOutcome::Hit,
            CacheStatus::Miss => CacheLookupOutcome::Miss,
            CacheStatus::Bypass => CacheLookupOutcome::Bypass,
        }
    }
}

/// Handle to a cache write running in the background
#[derive(Debug)]
pub struct PendingCacheWrite {
    key: String,
    result: oneshot::Receiver<Result<(), DomainError>>,
}

impl PendingCacheWrite {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Wait for the write to finish
    pub async fn wait(self) -> Result<(), DomainError> {
        self.result.await.map_err(|_| {
            DomainError::internal(format!("Cache write for {} was cancelled", self.key))
        })?
    }
}

/// Result of answering a question
#[derive(Debug)]
pub struct AnswerOutcome {
    pub answer: String,
    pub cache_status: CacheStatus,
    /// Sources reported by the generator, empty for cached answers
    pub citations: Vec<String>,
    pending_write: Option<PendingCacheWrite>,
}

impl AnswerOutcome {
    pub fn new(answer: impl Into<String>, cache_status: CacheStatus) -> Self {
        Self {
            answer: answer.into(),
            cache_status,
            citations: Vec::new(),
            pending_write: None,
        }
    }

    fn generated(answer: GeneratedAnswer, cache_status: CacheStatus) -> Self {
        Self {
            answer: answer.text,
            cache_status,
            citations: answer.citations,
            pending_write: None,
        }
    }

    fn with_pending_write(mut self, write: PendingCacheWrite) -> Self {
        self.pending_write = Some(write);
        self
    }

    /// Take the background cache write, if one was scheduled.
    /// Dropping it leaves the write running.
    pub fn take_pending_write(&mut self) -> Option<PendingCacheWrite> {
        self.pending_write.take()
    }
}

/// Semantic cache-augmented question answering
#[derive(Debug, Clone)]
pub struct SemanticAnswerService {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn AnswerGenerator>,
    keys: QuestionKeyGenerator,
    config: SemanticCacheConfig,
    timeouts: TimeoutConfig,
    writes: Arc<Mutex<JoinSet<()>>>,
}

impl SemanticAnswerService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn AnswerGenerator>,
        config: SemanticCacheConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            generator,
            keys: QuestionKeyGenerator::new(&config.key_prefix),
            config,
            timeouts: TimeoutConfig::default(),
            writes: Arc::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Answer a question, from the cache when an equivalent question was answered before
    pub async fn answer(&self, question: &str) -> Result<AnswerOutcome, DomainError> {
        let started = Instant::now();
        let result = self.resolve(question).await;

        record_answer(
            result.as_ref().ok().map(|o| o.cache_status.outcome()),
            started.elapsed(),
        );

        result
    }

    async fn resolve(&self, question: &str) -> Result<AnswerOutcome, DomainError> {
        if question.trim().is_empty() {
            return Err(DomainError::malformed_request("question must not be empty"));
        }

        if !self.config.enabled {
            record_cache_lookup(CacheLookupOutcome::Bypass);
            let generated = self.generate(question).await?;
            return Ok(AnswerOutcome::generated(generated, CacheStatus::Bypass));
        }

        let embedding = self.embed(question).await?;

        if let CacheLookup::Hit(hit) = self.lookup(&embedding).await {
            record_cache_lookup(CacheLookupOutcome::Hit);
            info!(key = %hit.key, distance = hit.distance, "Using a cached answer");

            return Ok(AnswerOutcome::new(
                hit.answer,
                CacheStatus::Hit {
                    key: hit.key,
                    distance: hit.distance,
                },
            ));
        }

        record_cache_lookup(CacheLookupOutcome::Miss);
        let generated = self.generate(question).await?;

        let entry = CacheEntry::new(
            self.keys.generate(question),
            embedding,
            generated.text.clone(),
            self.embedder.model_id(),
        )
        .with_question(question.trim())
        .with_ttl(self.config.entry_ttl());

        let write = self.spawn_cache_write(entry);

        Ok(AnswerOutcome::generated(generated, CacheStatus::Miss).with_pending_write(write))
    }

    async fn embed(&self, question: &str) -> Result<Vec<f32>, DomainError> {
        let deadline = self.timeouts.embedding();

        timeout(deadline, self.embedder.embed(question))
            .await
            .map_err(|_| {
                DomainError::embedding(
                    self.embedder.provider_name(),
                    format!("timed out after {} ms", deadline.as_millis()),
                )
            })?
    }

    /// Range-search the index. Read failures degrade to a miss.
    async fn lookup(&self, embedding: &[f32]) -> CacheLookup {
        let query = RangeQuery::new(self.config.similarity_radius, self.config.max_results);
        let deadline = self.timeouts.index();

        let result = match timeout(deadline, self.index.range_search(embedding, &query)).await {
            Ok(result) => result,
            Err(_) => Err(timed_out_read(deadline)),
        };

        match result {
            Ok(matches) => {
                debug!(results = matches.len(), radius = query.radius, "Cache lookup");
                CacheLookup::from_matches(matches)
            }
            Err(e) => {
                record_cache_read_failure();
                warn!(error = %e, "Cache lookup failed, treating as miss");
                CacheLookup::Miss
            }
        }
    }

    async fn generate(&self, question: &str) -> Result<GeneratedAnswer, DomainError> {
        let deadline = self.timeouts.generation();

        timeout(deadline, self.generator.generate(question))
            .await
            .map_err(|_| {
                DomainError::generation(
                    "generator",
                    format!("timed out after {} ms", deadline.as_millis()),
                )
            })?
    }

    /// Wait for every cache write still in flight, returning how many were awaited.
    /// Writes started after this call are not included.
    pub async fn finish_cache_writes(&self) -> usize {
        let mut writes = std::mem::take(&mut *self.lock_writes());
        let mut finished = 0;

        while writes.join_next().await.is_some() {
            finished += 1;
        }

        finished
    }

    fn lock_writes(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_cache_write(&self, entry: CacheEntry) -> PendingCacheWrite {
        let index = Arc::clone(&self.index);
        let deadline = self.timeouts.index();
        let key = entry.key().to_string();
        let (sender, receiver) = oneshot::channel();

        let task = async move {
            let result = match timeout(deadline, index.upsert(&entry)).await {
                Ok(result) => result,
                Err(_) => Err(DomainError::index_write(format!(
                    "timed out after {} ms",
                    deadline.as_millis()
                ))),
            };

            match &result {
                Ok(()) => {
                    record_cache_write(true);
                    debug!(key = %entry.key(), "Added answer to cache");
                }
                Err(e) => {
                    record_cache_write(false);
                    warn!(key = %entry.key(), error = %e, "Failed to add answer to cache");
                }
            }

            // The receiver may already be gone
            let _ = sender.send(result);
        };

        let mut writes = self.lock_writes();
        while writes.try_join_next().is_some() {}
        writes.spawn(task);

        PendingCacheWrite {
            key,
            result: receiver,
        }
    }
}

fn timed_out_read(deadline: Duration) -> DomainError {
    DomainError::index_read(format!("timed out after {} ms", deadline.as_millis()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::answer::MockAnswerGenerator;
    use crate::domain::embedding::StaticEmbeddingProvider;
    use crate::domain::semantic_cache::{MockVectorIndex, StalledVectorIndex};
    use crate::domain::IndexMatch;
    use crate::infrastructure::vector_index::InMemoryVectorIndex;

    const MODEL: &str = "amazon.titan-embed-text-v1";
    const QUESTION: &str = "What is the return policy?";
    const PARAPHRASE: &str = "How do returns work?";
    const UNRELATED: &str = "Do you ship to Canada?";
    const ANSWER: &str = "Returns accepted within 30 days.";

    fn embedder() -> Arc<StaticEmbeddingProvider> {
        Arc::new(
            StaticEmbeddingProvider::new(MODEL)
                .with_vector(QUESTION, vec![1.0, 0.0])
                // cosine distance 0.1 from QUESTION
                .with_vector(PARAPHRASE, vec![0.9, 0.43589])
                // cosine distance 0.6 from QUESTION
                .with_vector(UNRELATED, vec![0.4, 0.916515]),
        )
    }

    fn generator_answering(answer: &'static str, times: usize) -> MockAnswerGenerator {
        let mut generator = MockAnswerGenerator::new();
        generator
            .expect_generate()
            .times(times)
            .returning(move |_| Ok(GeneratedAnswer::new(answer)));
        generator
    }

    fn service(index: Arc<dyn VectorIndex>, generator: MockAnswerGenerator) -> SemanticAnswerService {
        SemanticAnswerService::new(
            embedder(),
            index,
            Arc::new(generator),
            SemanticCacheConfig::default(),
        )
    }

    async fn settle(outcome: &mut AnswerOutcome) -> Option<Result<(), DomainError>> {
        match outcome.take_pending_write() {
            Some(write) => Some(write.wait().await),
            None => None,
        }
    }

    #[tokio::test]
    async fn test_miss_generates_and_caches_answer() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        let mut generator = MockAnswerGenerator::new();
        generator
            .expect_generate()
            .withf(|q| q == QUESTION)
            .times(1)
            .returning(|_| Ok(GeneratedAnswer::new(ANSWER)));
        let service = service(index.clone(), generator);

        let mut outcome = service.answer(QUESTION).await.unwrap();

        assert_eq!(outcome.answer, ANSWER);
        assert_eq!(outcome.cache_status, CacheStatus::Miss);
        assert!(settle(&mut outcome).await.unwrap().is_ok());
        assert_eq!(index.len(), 1);

        let stored = index
            .range_search(&[1.0, 0.0], &RangeQuery::new(0.0, 1))
            .await
            .unwrap();
        assert_eq!(stored[0].answer.as_deref(), Some(ANSWER));
        assert_eq!(stored[0].tag.as_deref(), Some(MODEL));
        assert_eq!(stored[0].key, QuestionKeyGenerator::new("doc:").generate(QUESTION));
    }

    #[tokio::test]
    async fn test_hit_within_radius_skips_generator() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        index
            .upsert(&CacheEntry::new("doc:seed", vec![1.0, 0.0], ANSWER, MODEL))
            .await
            .unwrap();
        let service = service(index, generator_answering("unused", 0));

        let mut outcome = service.answer(PARAPHRASE).await.unwrap();

        assert_eq!(outcome.answer, ANSWER);
        match outcome.cache_status {
            CacheStatus::Hit { ref key, distance } => {
                assert_eq!(key, "doc:seed");
                assert!((distance - 0.1).abs() < 1e-3);
            }
            ref other => panic!("expected hit, got {:?}", other),
        }
        assert!(settle(&mut outcome).await.is_none());
    }

    #[tokio::test]
    async fn test_same_question_twice_generates_once() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        let service = service(index.clone(), generator_answering(ANSWER, 1));

        let mut first = service.answer(QUESTION).await.unwrap();
        settle(&mut first).await;
        let second = service.answer(QUESTION).await.unwrap();

        assert_eq!(first.cache_status, CacheStatus::Miss);
        assert!(second.cache_status.is_hit());
        assert_eq!(second.answer, ANSWER);
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_paraphrase_at_distance_point_one_is_hit() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        let service = service(index, generator_answering(ANSWER, 1));

        let mut first = service.answer(QUESTION).await.unwrap();
        settle(&mut first).await;
        let second = service.answer(PARAPHRASE).await.unwrap();

        assert!(second.cache_status.is_hit());
        assert_eq!(second.answer, ANSWER);
    }

    #[tokio::test]
    async fn test_distance_point_six_is_independent_miss() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        let mut generator = MockAnswerGenerator::new();
        generator
            .expect_generate()
            .withf(|q| q == QUESTION)
            .times(1)
            .returning(|_| Ok(GeneratedAnswer::new(ANSWER)));
        generator
            .expect_generate()
            .withf(|q| q == UNRELATED)
            .times(1)
            .returning(|_| Ok(GeneratedAnswer::new("Yes, we ship to Canada.")));
        let service = service(index.clone(), generator);

        let mut first = service.answer(QUESTION).await.unwrap();
        settle(&mut first).await;
        let mut second = service.answer(UNRELATED).await.unwrap();
        settle(&mut second).await;

        assert_eq!(second.cache_status, CacheStatus::Miss);
        assert_eq!(second.answer, "Yes, we ship to Canada.");
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn test_outside_radius_single_generation_and_single_upsert() {
        let mut index = MockVectorIndex::new();
        index.expect_range_search().times(1).returning(|_, _| Ok(Vec::new()));
        index.expect_upsert().times(1).returning(|_| Ok(()));
        let service = service(Arc::new(index), generator_answering(ANSWER, 1));

        let mut outcome = service.answer(QUESTION).await.unwrap();

        assert!(settle(&mut outcome).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_first_match_without_answer_is_miss() {
        let mut index = MockVectorIndex::new();
        index.expect_range_search().returning(|_, _| {
            Ok(vec![IndexMatch {
                key: "doc:partial".to_string(),
                answer: None,
                tag: None,
                distance: 0.05,
            }])
        });
        index.expect_upsert().returning(|_| Ok(()));
        let service = service(Arc::new(index), generator_answering(ANSWER, 1));

        let outcome = service.answer(QUESTION).await.unwrap();

        assert_eq!(outcome.cache_status, CacheStatus::Miss);
    }

    #[tokio::test]
    async fn test_range_query_uses_configured_radius() {
        let mut index = MockVectorIndex::new();
        index
            .expect_range_search()
            .withf(|embedding, query| {
                embedding == [1.0, 0.0] && query.radius == 0.25 && query.limit == 1
            })
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        index.expect_upsert().returning(|_| Ok(()));
        let service = SemanticAnswerService::new(
            embedder(),
            Arc::new(index),
            Arc::new(generator_answering(ANSWER, 1)),
            SemanticCacheConfig::default().with_similarity_radius(0.25),
        );

        service.answer(QUESTION).await.unwrap();
    }

    #[tokio::test]
    async fn test_index_read_failure_still_answers() {
        let mut index = MockVectorIndex::new();
        index
            .expect_range_search()
            .returning(|_, _| Err(DomainError::index_read("connection refused")));
        index.expect_upsert().returning(|_| Ok(()));
        let service = service(Arc::new(index), generator_answering(ANSWER, 1));

        let outcome = service.answer(QUESTION).await.unwrap();

        assert_eq!(outcome.answer, ANSWER);
        assert_eq!(outcome.cache_status, CacheStatus::Miss);
    }

    #[tokio::test]
    async fn test_index_write_failure_still_answers() {
        let mut index = MockVectorIndex::new();
        index.expect_range_search().returning(|_, _| Ok(Vec::new()));
        index
            .expect_upsert()
            .times(1)
            .returning(|_| Err(DomainError::index_write("READONLY")));
        let service = service(Arc::new(index), generator_answering(ANSWER, 1));

        let mut outcome = service.answer(QUESTION).await.unwrap();

        assert_eq!(outcome.answer, ANSWER);
        let write = settle(&mut outcome).await.unwrap();
        assert!(matches!(write, Err(DomainError::IndexWrite { .. })));
    }

    #[tokio::test]
    async fn test_index_timeouts_degrade() {
        let service = service(Arc::new(StalledVectorIndex), generator_answering(ANSWER, 1))
            .with_timeouts(TimeoutConfig {
                index_ms: 10,
                ..TimeoutConfig::default()
            });

        let mut outcome = service.answer(QUESTION).await.unwrap();

        assert_eq!(outcome.answer, ANSWER);
        let write = settle(&mut outcome).await.unwrap();
        assert!(matches!(write, Err(DomainError::IndexWrite { .. })));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_fatal() {
        let embedder = Arc::new(StaticEmbeddingProvider::new(MODEL).with_error("throttled"));
        let service = SemanticAnswerService::new(
            embedder,
            Arc::new(MockVectorIndex::new()),
            Arc::new(generator_answering(ANSWER, 0)),
            SemanticCacheConfig::default(),
        );

        let result = service.answer(QUESTION).await;

        assert!(matches!(result, Err(DomainError::Embedding { .. })));
    }

    #[tokio::test]
    async fn test_generation_failure_is_fatal_and_not_cached() {
        let mut index = MockVectorIndex::new();
        index.expect_range_search().returning(|_, _| Ok(Vec::new()));
        index.expect_upsert().times(0);
        let mut generator = MockAnswerGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_| Err(DomainError::generation("bedrock", "AccessDenied")));
        let service = service(Arc::new(index), generator);

        let result = service.answer(QUESTION).await;

        assert!(matches!(result, Err(DomainError::Generation { .. })));
    }

    #[tokio::test]
    async fn test_blank_question_is_malformed() {
        let embedder = embedder();
        let service = SemanticAnswerService::new(
            embedder.clone(),
            Arc::new(MockVectorIndex::new()),
            Arc::new(generator_answering(ANSWER, 0)),
            SemanticCacheConfig::default(),
        );

        let result = service.answer("   ").await;

        assert!(matches!(result, Err(DomainError::MalformedRequest { .. })));
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_disabled_cache_bypasses_index() {
        let embedder = embedder();
        let service = SemanticAnswerService::new(
            embedder.clone(),
            Arc::new(MockVectorIndex::new()),
            Arc::new(generator_answering(ANSWER, 1)),
            SemanticCacheConfig::default().with_enabled(false),
        );

        let mut outcome = service.answer(QUESTION).await.unwrap();

        assert_eq!(outcome.cache_status, CacheStatus::Bypass);
        assert_eq!(outcome.answer, ANSWER);
        assert!(settle(&mut outcome).await.is_none());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_citations_carried_on_miss() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        let mut generator = MockAnswerGenerator::new();
        generator.expect_generate().returning(|_| {
            Ok(GeneratedAnswer::new(ANSWER).with_citations(vec!["s3://kb/returns.pdf".into()]))
        });
        let service = service(index, generator);

        let outcome = service.answer(QUESTION).await.unwrap();

        assert_eq!(outcome.citations, vec!["s3://kb/returns.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_finish_cache_writes_waits_for_detached_writes() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        let service = service(index.clone(), generator_answering(ANSWER, 1));

        let mut outcome = service.answer(QUESTION).await.unwrap();
        drop(outcome.take_pending_write());

        assert_eq!(service.finish_cache_writes().await, 1);
        assert_eq!(index.len(), 1);
        assert_eq!(service.finish_cache_writes().await, 0);
    }

    #[tokio::test]
    async fn test_pending_write_reports_its_key() {
        let index = Arc::new(InMemoryVectorIndex::new(2));
        let service = service(index, generator_answering(ANSWER, 1));

        let mut outcome = service.answer(QUESTION).await.unwrap();
        let write = outcome.take_pending_write().unwrap();

        assert_eq!(write.key(), QuestionKeyGenerator::new("doc:").generate(QUESTION));
        write.wait().await.unwrap();
    }

    #[test]
    fn test_cache_status_labels() {
        let hit = CacheStatus::Hit {
            key: "doc:1".to_string(),
            distance: 0.1,
        };
        assert_eq!(hit.as_str(), "hit");
        assert_eq!(CacheStatus::Miss.as_str(), "miss");
        assert_eq!(CacheStatus::Bypass.as_str(), "bypass");
    }
}
