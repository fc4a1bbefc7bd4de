//! Behaviour every [`VectorDatabase`] backend must share.
//!
//! Each function expects a fresh adapter bound to an empty collection, using
//! [`HashEmbedding`](super::HashEmbedding) and a `200/20` splitter.

use ragchat_index::{Chunk, IndexInput, RagError, VectorDatabase};

use super::{SIMPLE_TEXT, THREE_PARAGRAPHS, metadata};

pub async fn simple_text_round_trip(db: &dyn VectorDatabase) {
    let ids =
        db.split_and_store_text(SIMPLE_TEXT.into(), &metadata("19291", "test1")).await.unwrap();
    assert_eq!(ids.len(), 1);

    let hits = db.similarity_search_with_score(SIMPLE_TEXT, 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, ids[0]);
    assert!(hits[0].score.abs() < 1e-3, "distance {}", hits[0].score);

    let hits = db.similarity_search_with_score("What is the weather in Paris?", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].score > 1e-3, "distance {}", hits[0].score);
    assert_eq!(hits[0].chunk.content, SIMPLE_TEXT);
    assert_eq!(hits[0].chunk.metadata["source_name"], "test1");
    assert_eq!(hits[0].chunk.metadata["payload"]["k1"], "v1");
}

pub async fn three_paragraphs_keep_insertion_order(db: &dyn VectorDatabase) {
    let metadata = metadata("paragraphs", "paragraphs.txt");
    let ids = db.split_and_store_text(THREE_PARAGRAPHS.into(), &metadata).await.unwrap();
    assert_eq!(ids.len(), 3);

    let all = db.get_all_documents().await.unwrap();
    assert_eq!(all.ids, ids);
    assert!(all.texts[0].starts_with("This is a longer text"));
    assert!(all.texts[1].starts_with("For example"));
    assert!(all.texts[2].starts_with("Last Paragraph"));
    for row in &all.metadatas {
        assert_eq!(row, &metadata.to_dict());
    }
}

fn pre_chunks(n: usize) -> IndexInput {
    IndexInput::Chunks((0..n).map(|i| Chunk::new(format!("pre-chunk number {i}"))).collect())
}

pub async fn delete_is_selective_and_idempotent(db: &dyn VectorDatabase) {
    db.split_and_store_text(pre_chunks(4), &metadata("doc-a", "a.txt")).await.unwrap();
    db.split_and_store_text(pre_chunks(1), &metadata("doc-b", "b.txt")).await.unwrap();

    let result = db.delete_embeddings("doc-a").await.unwrap();
    assert_eq!(result.delete_count, 4);
    let all = db.get_all_documents().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all.metadatas[0]["source_id"], "doc-b");

    let result = db.delete_embeddings("doc-a").await.unwrap();
    assert_eq!(result.delete_count, 0);
    assert_eq!(db.get_all_documents().await.unwrap().len(), 1);

    let result = db.delete_embeddings("doc-b").await.unwrap();
    assert_eq!(result.delete_count, 1);
    assert!(db.get_all_documents().await.unwrap().is_empty());

    let result = db.delete_embeddings("never-stored").await.unwrap();
    assert_eq!(result.delete_count, 0);
}

pub async fn drop_lifecycle(db: &dyn VectorDatabase) {
    let name = db.collection_name().to_string();
    db.split_and_store_text(SIMPLE_TEXT.into(), &metadata("a", "a")).await.unwrap();

    db.drop_collection(&name, false).await.unwrap();
    assert!(db.get_all_documents().await.unwrap().is_empty());
    assert!(db.similarity_search_with_score(SIMPLE_TEXT, 3).await.unwrap().is_empty());

    db.drop_collection(&name, true).await.unwrap();
    let err = db.drop_collection(&name, false).await.unwrap_err();
    assert!(err.is_collection_not_found(), "{err}");
    assert!(matches!(err, RagError::CollectionNotFound { .. }));

    let ids = db.split_and_store_text(SIMPLE_TEXT.into(), &metadata("a", "a")).await.unwrap();
    assert_eq!(db.get_all_documents().await.unwrap().ids, ids);
}

pub async fn search_is_nearest_first_and_bounded(db: &dyn VectorDatabase) {
    db.split_and_store_text(pre_chunks(5), &metadata("doc", "doc.txt")).await.unwrap();
    db.split_and_store_text("completely unrelated words here".into(), &metadata("other", "o"))
        .await
        .unwrap();

    let hits = db.similarity_search_with_score("pre-chunk number 3", 4).await.unwrap();
    assert_eq!(hits.len(), 4);
    assert_eq!(hits[0].chunk.content, "pre-chunk number 3");
    assert!(hits.windows(2).all(|w| w[0].score <= w[1].score + 1e-6));

    let hits = db.similarity_search_with_score("pre-chunk", 100).await.unwrap();
    assert_eq!(hits.len(), 6);
}

/// `first` and `second` are bound to distinct, empty collections on one server.
pub async fn collections_do_not_share_storage(
    first: &dyn VectorDatabase,
    second: &dyn VectorDatabase,
) {
    first.split_and_store_text(SIMPLE_TEXT.into(), &metadata("shared", "a")).await.unwrap();
    assert!(second.get_all_documents().await.unwrap().is_empty());
    assert!(second.similarity_search_with_score(SIMPLE_TEXT, 3).await.unwrap().is_empty());

    // Same source id in both collections: deletes stay on their own side.
    second.split_and_store_text(pre_chunks(2), &metadata("shared", "b")).await.unwrap();
    let result = second.delete_embeddings("shared").await.unwrap();
    assert_eq!(result.delete_count, 2);
    assert_eq!(first.get_all_documents().await.unwrap().len(), 1);

    second.drop_collection(second.collection_name(), true).await.unwrap();
    let all = first.get_all_documents().await.unwrap();
    assert_eq!(all.texts, vec![SIMPLE_TEXT]);
}
