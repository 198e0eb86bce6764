//! End-to-end scenarios over the full pipeline with local providers.

use std::sync::Arc;
use std::time::Duration;

use crate::core::config::RagSettings;
use crate::history::Role;
use crate::llm::HashingEmbedder;
use crate::rag::composer::AnswerStatus;
use crate::rag::engine::Document;
use crate::rag::index::{IndexConfig, VectorIndex};
use crate::rag::service::RagService;
use crate::rag::store::SearchFilter;
use crate::rag::test_support::{chunk, fast_retry, ScriptedGenerator, SlowEmbedder, TEST_DIMENSION};

fn gail_site() -> Vec<Document> {
    vec![
        Document::new(
            "https://gailonline.com/csr",
            "Corporate Social Responsibility",
            "GAIL runs CSR initiatives in health, education, skill development and environmental \
             sustainability. Projects include mobile health clinics, scholarships for students and \
             support for rural livelihoods across India.",
        ),
        Document::new(
            "https://gailonline.com/business/pipelines",
            "Pipeline Network",
            "GAIL operates over 16,000 km of natural gas pipelines connecting gas sources with \
             fertilizer plants, power stations and city gas distribution networks in many states.",
        ),
        Document::new(
            "https://gailonline.com/careers/recruitment",
            "Recruitment",
            "Executive trainees are recruited through GATE scores and interviews. Experienced \
             professionals may apply online when openings are advertised.",
        ),
        Document::new(
            "https://gailonline.com/news/q3-results",
            "Q3 Results",
            "Quarterly results showed record petrochemical sales and higher transmission volumes \
             compared with the previous year.",
        ),
    ]
}

fn service_with(generator: Arc<ScriptedGenerator>, max_turns: usize) -> RagService {
    let mut settings = RagSettings::default();
    settings.retry = fast_retry();
    settings.retriever.min_score = 0.25;
    settings.max_conversation_turns = max_turns;

    RagService::build(
        &settings,
        Arc::new(HashingEmbedder::new(TEST_DIMENSION)),
        generator,
        None,
    )
    .unwrap()
}

#[tokio::test]
async fn csr_question_is_answered_from_the_csr_page() {
    let generator = Arc::new(ScriptedGenerator::replying(
        "GAIL runs CSR initiatives in health, education and skill development [1].",
    ));
    let service = service_with(generator.clone(), 20);
    let report = service.rebuild_index(&gail_site()).await.unwrap();
    assert_eq!(report.documents_processed, 4);

    let answer = service.answer("What CSR initiatives does GAIL run?", "visitor").await;

    assert_eq!(answer.status, AnswerStatus::Answered);
    assert!(answer.text.contains("CSR"));
    assert_eq!(answer.sources[0].url, "https://gailonline.com/csr");
    assert_eq!(answer.sources[0].title, "Corporate Social Responsibility");
    assert!(answer.confidence > 0.3);
    assert!(answer.confidence <= 1.0);
    assert_eq!(generator.calls(), 1);
    assert!(generator.prompts()[0].contains("mobile health clinics"));
}

#[tokio::test]
async fn off_topic_question_gets_no_context_answer() {
    let generator = Arc::new(ScriptedGenerator::replying("It is sunny."));
    let service = service_with(generator.clone(), 20);
    service.rebuild_index(&gail_site()).await.unwrap();

    let answer = service.answer("What's the weather today?", "visitor").await;

    assert_eq!(answer.status, AnswerStatus::NoContext);
    assert!(answer.sources.is_empty());
    assert_eq!(answer.confidence, 0.0);
    assert_eq!(generator.calls(), 0);
    assert!(service.history("visitor").await.is_empty());
}

#[tokio::test]
async fn follow_up_question_uses_conversation_context() {
    let generator = Arc::new(ScriptedGenerator::replying("Around 16,000 km [1]."));
    let service = service_with(generator.clone(), 20);
    service.rebuild_index(&gail_site()).await.unwrap();

    let first = service
        .answer("Tell me about the natural gas pipelines", "visitor")
        .await;
    assert_eq!(first.status, AnswerStatus::Answered);

    // Only answerable through the previous user turn.
    let second = service.answer("How long are they in km?", "visitor").await;
    assert_eq!(second.status, AnswerStatus::Answered);
    assert_eq!(second.sources[0].url, "https://gailonline.com/business/pipelines");

    let prompt = &generator.prompts()[1];
    assert!(prompt.contains("User: Tell me about the natural gas pipelines"));
    assert!(prompt.contains("Assistant: Around 16,000 km [1]."));
}

#[tokio::test]
async fn conversation_keeps_only_the_newest_turns() {
    let generator = Arc::new(ScriptedGenerator::replying("GAIL runs CSR initiatives [1]."));
    let service = service_with(generator, 4);
    service.rebuild_index(&gail_site()).await.unwrap();

    for question in [
        "What CSR initiatives does GAIL run?",
        "Which CSR projects support health?",
        "Are there CSR scholarships for students?",
    ] {
        let answer = service.answer(question, "visitor").await;
        assert_eq!(answer.status, AnswerStatus::Answered);
    }

    let history = service.history("visitor").await;
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].text, "Which CSR projects support health?");
    assert_eq!(history[2].text, "Are there CSR scholarships for students?");
}

#[tokio::test]
async fn searches_never_observe_a_half_rebuilt_index() {
    let index = Arc::new(VectorIndex::new(
        Arc::new(SlowEmbedder::new(Duration::from_millis(5))),
        fast_retry(),
        IndexConfig {
            embed_batch_size: 2,
            embed_concurrency: 2,
            persist: false,
        },
    ));

    let topics = [
        "natural gas pipeline capacity",
        "city gas distribution networks",
        "petrochemical plant output",
        "renewable solar energy parks",
        "liquefied natural gas terminals",
        "corporate social responsibility",
    ];
    let generation = |prefix: &str| {
        topics
            .iter()
            .enumerate()
            .map(|(i, topic)| {
                chunk(
                    &format!("{prefix}-{i}"),
                    &format!("https://gailonline.com/{prefix}/{i}"),
                    0,
                    &format!("{topic} report from the {prefix} corpus"),
                )
            })
            .collect::<Vec<_>>()
    };

    index.rebuild(&generation("old")).await.unwrap();

    let rebuild = {
        let index = index.clone();
        let fresh = generation("new");
        tokio::spawn(async move { index.rebuild(&fresh).await })
    };

    let searchers: Vec<_> = (0..10)
        .map(|worker| {
            let index = index.clone();
            let query = topics[worker % topics.len()];
            tokio::spawn(async move {
                let mut generations = Vec::new();
                for _ in 0..8 {
                    let results = index.search(query, 6, &SearchFilter::any()).await.unwrap();
                    assert_eq!(results.len(), 6);
                    let old = results.iter().filter(|r| r.chunk.id.starts_with("old-")).count();
                    assert!(old == 0 || old == results.len(), "mixed generations in one result set");
                    generations.push(old == 0);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                generations
            })
        })
        .collect();

    for searcher in searchers {
        let generations = searcher.await.unwrap();
        // Once a searcher has seen the new generation it never sees the old one again.
        assert!(generations.windows(2).all(|pair| !pair[0] || pair[1]));
    }

    assert_eq!(rebuild.await.unwrap().unwrap(), topics.len());
    let after = index.search(topics[0], 6, &SearchFilter::any()).await.unwrap();
    assert!(after.iter().all(|r| r.chunk.id.starts_with("new-")));
    assert_eq!(index.count().await, topics.len());
}
