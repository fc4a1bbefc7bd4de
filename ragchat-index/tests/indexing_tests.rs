//! Tests for the recursive splitter and the context-aware strategy.

mod common;

use std::sync::Arc;

use common::{LOREM, MockChatModel, metadata};
use proptest::prelude::*;
use ragchat_index::indexing::DEFAULT_SUMMARIZE_PROMPT;
use ragchat_index::{
    BaseTextIndexing, Chunk, ContextAwareIndexing, IndexInput, IndexingConfig, RagError, Settings,
    TextIndexingStrategy,
};
use serde_json::{Value, json};

fn base(size: usize, overlap: usize) -> BaseTextIndexing {
    BaseTextIndexing::new(size, overlap).unwrap()
}

#[tokio::test]
async fn lorem_splits_into_bounded_chunks() {
    let chunks = base(200, 50).split(LOREM.into(), &metadata("lorem", "lorem.txt")).await.unwrap();

    assert_eq!(chunks.len(), 6);
    for chunk in &chunks {
        assert!(chunk.content.chars().count() <= 200, "{:?}", chunk.content);
        assert_eq!(chunk.content, chunk.content.trim());
    }
    assert!(chunks[0].content.starts_with("Lorem ipsum dolor sit amet"));
    assert!(chunks[5].content.starts_with("The quick brown fox"));
}

#[tokio::test]
async fn lorem_fits_one_large_chunk() {
    let chunks =
        base(1000, 200).split(LOREM.into(), &metadata("lorem", "lorem.txt")).await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].content, LOREM);
}

#[tokio::test]
async fn every_chunk_carries_document_metadata() {
    let metadata = metadata("19291", "test1");
    let chunks = base(200, 50).split(LOREM.into(), &metadata).await.unwrap();

    let expected = metadata.to_dict();
    for chunk in &chunks {
        assert_eq!(chunk.metadata, expected);
        assert_eq!(chunk.source_id(), Some("19291"));
    }
    assert_eq!(expected["payload"], json!({"k1": "v1"}));
}

#[tokio::test]
async fn pre_chunk_metadata_is_merged_into_payload() {
    let pre_chunks = vec![
        Chunk::new("first pre-chunk").with_metadata(
            json!({"k1": "other", "k4": "v4", "source_name": "A different source name"})
                .as_object()
                .unwrap()
                .clone(),
        ),
        Chunk::new("second pre-chunk"),
    ];

    let chunks = base(200, 20)
        .split(IndexInput::Chunks(pre_chunks), &metadata("19291", "test1"))
        .await
        .unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content, "first pre-chunk");
    assert_eq!(chunks[0].metadata["source_name"], "test1");
    assert_eq!(
        chunks[0].metadata["payload"],
        json!({"k1": "v1", "k4": "v4", "source_name": "A different source name"})
    );
    assert_eq!(chunks[1].metadata["payload"], json!({"k1": "v1"}));
}

#[tokio::test]
async fn whitespace_input_yields_no_chunks() {
    let chunks = base(100, 10).split("  \n\n  ".into(), &metadata("a", "a")).await.unwrap();
    assert!(chunks.is_empty());
}

#[test]
fn invalid_sizes_are_rejected() {
    assert!(matches!(BaseTextIndexing::new(0, 0), Err(RagError::InvalidConfiguration(_))));
    assert!(matches!(BaseTextIndexing::new(100, 100), Err(RagError::InvalidConfiguration(_))));
}

fn context_aware(model: Arc<MockChatModel>, cutoff: usize) -> ContextAwareIndexing {
    ContextAwareIndexing::builder()
        .config(IndexingConfig::builder().chunk_size(200).chunk_overlap(50).build().unwrap())
        .chat_model(model)
        .document_content_cutoff(cutoff)
        .build()
        .unwrap()
}

#[tokio::test]
async fn context_aware_summarizes_once_and_prefixes_chunks() {
    let model = Arc::new(MockChatModel::replying("A document about foxes."));
    let strategy = context_aware(model.clone(), 100);

    let chunks = strategy.split(LOREM.into(), &metadata("lorem", "lorem.txt")).await.unwrap();
    let plain = base(200, 50).split(LOREM.into(), &metadata("lorem", "lorem.txt")).await.unwrap();

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    let excerpt: String = LOREM.chars().take(100).collect();
    assert_eq!(prompts[0], format!("{DEFAULT_SUMMARIZE_PROMPT}{excerpt}"));

    assert_eq!(chunks.len(), plain.len());
    for (chunk, plain) in chunks.iter().zip(&plain) {
        assert_eq!(
            chunk.content,
            format!("Context: A document about foxes.\n\nContent: {}", plain.content)
        );
        assert_eq!(chunk.metadata, plain.metadata);
    }
}

#[tokio::test]
async fn custom_prompt_is_used() {
    let model = Arc::new(MockChatModel::replying("summary"));
    let strategy = ContextAwareIndexing::builder()
        .chat_model(model.clone())
        .summarize_prompt("Summarize: ")
        .build()
        .unwrap();

    strategy.split("short text".into(), &metadata("a", "a")).await.unwrap();
    assert_eq!(model.prompts(), vec!["Summarize: short text".to_string()]);
}

#[tokio::test]
async fn empty_summary_is_an_error() {
    let model = Arc::new(MockChatModel::replying("   "));
    let err = context_aware(model, 100).split(LOREM.into(), &metadata("a", "a")).await.unwrap_err();
    assert!(matches!(err, RagError::ModelError { .. }));
}

#[tokio::test]
async fn model_failure_propagates() {
    let model = Arc::new(MockChatModel::failing());
    let err = context_aware(model, 100).split(LOREM.into(), &metadata("a", "a")).await.unwrap_err();
    assert!(matches!(err, RagError::ModelError { ref provider, .. } if provider == "mock"));
}

#[tokio::test]
async fn no_chunks_means_no_model_call() {
    let model = Arc::new(MockChatModel::replying("summary"));
    let chunks =
        context_aware(model.clone(), 100).split(" ".into(), &metadata("a", "a")).await.unwrap();
    assert!(chunks.is_empty());
    assert!(model.prompts().is_empty());
}

#[test]
fn builder_validates_configuration() {
    let err = ContextAwareIndexing::builder()
        .chat_model(Arc::new(MockChatModel::replying("x")))
        .document_content_cutoff(0)
        .build()
        .unwrap_err();
    assert!(matches!(err, RagError::InvalidConfiguration(_)));

    let err = ContextAwareIndexing::builder().settings(Settings::default()).build().unwrap_err();
    assert!(matches!(err, RagError::InvalidConfiguration(ref m) if m.contains("LLM_MODEL_ID")));
}

/// **Property: chunks are bounded, trimmed, and cover every word**
/// *For any* text of short words and any valid sizes, every chunk is non-empty,
/// trimmed, at most `chunk_size` characters long, and every word of the input
/// appears in some chunk.
mod prop_splitter_bounds {
    use super::*;

    fn arb_text() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            ("[a-z]{1,8}", prop_oneof![Just(" "), Just("\n"), Just("\n\n"), Just("  ")]),
            1..80,
        )
        .prop_map(|words| words.into_iter().map(|(w, sep)| format!("{w}{sep}")).collect())
    }

    fn strip_whitespace(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_are_bounded_and_cover_input(
            text in arb_text(),
            chunk_size in 10usize..80,
            overlap_ratio in 0.0f64..0.5,
        ) {
            let overlap = (chunk_size as f64 * overlap_ratio) as usize;
            let chunks = base(chunk_size, overlap).split_text(&text);

            for chunk in &chunks {
                prop_assert!(!chunk.is_empty());
                prop_assert_eq!(chunk.as_str(), chunk.trim());
                prop_assert!(chunk.chars().count() <= chunk_size, "{:?} > {}", chunk, chunk_size);
            }
            for word in text.split_whitespace() {
                prop_assert!(chunks.iter().any(|c| c.contains(word)), "{} missing", word);
            }
        }

        #[test]
        fn metadata_is_identical_on_every_chunk(
            text in arb_text(),
            chunk_size in 10usize..80,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let metadata = metadata("doc", "doc.txt");
            let chunks = rt.block_on(base(chunk_size, 0).split(text.into(), &metadata)).unwrap();
            let expected = Value::Object(metadata.to_dict());
            for chunk in chunks {
                prop_assert_eq!(Value::Object(chunk.metadata), expected.clone());
            }
        }

        #[test]
        fn chunks_without_overlap_reconstruct_input(
            text in arb_text(),
            chunk_size in 10usize..80,
        ) {
            let chunks = base(chunk_size, 0).split_text(&text);
            prop_assert_eq!(strip_whitespace(&chunks.concat()), strip_whitespace(&text));
        }

        #[test]
        fn overlapping_chunks_follow_input_order(
            text in arb_text(),
            chunk_size in 10usize..80,
            overlap_ratio in 0.1f64..0.5,
        ) {
            let overlap = ((chunk_size as f64 * overlap_ratio) as usize).max(1);
            let chunks = base(chunk_size, overlap).split_text(&text);
            let stripped = strip_whitespace(&text);

            let mut start = 0;
            for chunk in &chunks {
                let chunk = strip_whitespace(chunk);
                let found = stripped[start..].find(&chunk);
                prop_assert!(found.is_some(), "{:?} not found at or after {}", chunk, start);
                start += found.unwrap_or_default();
            }
        }
    }
}
