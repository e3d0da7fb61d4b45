//! Relation traversal and junction management against the in-memory
//! adapter.

mod common;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use common::MemoryAdapter;
use entix_orm::{
    ColumnMapping, EntityDao, EntityMapping, OrmError, QueryOptions, Relation, Row,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Post {
    #[serde(default)]
    id: Option<i64>,
    title: String,
    #[serde(rename = "authorId")]
    author_id: Option<i64>,
}

fn post_mapping() -> EntityMapping {
    EntityMapping::new("post", "posts", "id")
        .with_column(ColumnMapping::new("id", "id").with_primary_key().with_auto_increment())
        .with_column(ColumnMapping::new("title", "title"))
        .with_column(ColumnMapping::new("authorId", "author_id"))
        .with_relation(Relation::many_to_many(
            "tags", "post", "tag", "tags", "id", "id", "post_tags", "post_id", "tag_id",
        ))
        .with_relation(Relation::many_to_one(
            "author", "post", "user", "users", "authorId", "id",
        ))
        .with_relation(Relation::one_to_many(
            "comments", "post", "comment", "comments", "id", "post_id",
        ))
        .with_relation(Relation::one_to_one(
            "meta", "post", "post_meta", "post_meta", "id", "post_id", false,
        ))
}

fn adapter_with_content() -> MemoryAdapter {
    let adapter = MemoryAdapter::new()
        .with_table("posts", "id")
        .with_table("tags", "id")
        .with_table("post_tags", "")
        .with_table("users", "id")
        .with_table("comments", "id")
        .with_table("post_meta", "id");

    adapter.seed("users", row(&[("id", json!(7)), ("name", json!("ada"))]));
    adapter.seed(
        "posts",
        row(&[("id", json!(1)), ("title", json!("hello")), ("author_id", json!(7))]),
    );
    adapter.seed(
        "posts",
        row(&[("id", json!(2)), ("title", json!("draft")), ("author_id", Value::Null)]),
    );
    adapter.seed("tags", row(&[("id", json!(10)), ("label", json!("rust"))]));
    adapter.seed("tags", row(&[("id", json!(11)), ("label", json!("orm"))]));
    adapter.seed("tags", row(&[("id", json!(12)), ("label", json!("unused"))]));
    adapter.seed("post_tags", row(&[("post_id", json!(1)), ("tag_id", json!(10))]));
    adapter.seed("post_tags", row(&[("post_id", json!(1)), ("tag_id", json!(11))]));
    adapter.seed(
        "comments",
        row(&[("id", json!(100)), ("post_id", json!(1)), ("body", json!("nice"))]),
    );
    adapter.seed(
        "post_meta",
        row(&[("id", json!(50)), ("post_id", json!(1)), ("views", json!(3))]),
    );
    adapter
}

fn row(fields: &[(&str, Value)]) -> Row {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn post_dao(adapter: &MemoryAdapter) -> EntityDao<Post> {
    EntityDao::new(Arc::new(adapter.clone()), Arc::new(post_mapping()))
}

#[tokio::test]
async fn many_to_many_traversal_joins_through_the_junction() {
    let adapter = adapter_with_content();
    let dao = post_dao(&adapter);

    let related = dao.find_related(&1, "tags", &QueryOptions::new()).await.unwrap();
    let mut labels: Vec<&str> = related
        .iter()
        .filter_map(|r| r.get("label").and_then(Value::as_str))
        .collect();
    labels.sort();
    assert_eq!(labels, vec!["orm", "rust"]);

    // A post with no junction rows yields nothing.
    let related = dao.find_related(&2, "tags", &QueryOptions::new()).await.unwrap();
    assert!(related.is_empty());
}

#[tokio::test]
async fn one_to_many_traversal_filters_by_target_column() {
    let adapter = adapter_with_content();
    let dao = post_dao(&adapter);

    let comments = dao
        .find_related(&1, "comments", &QueryOptions::new())
        .await
        .unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].get("body"), Some(&json!("nice")));
}

#[tokio::test]
async fn many_to_one_dereferences_the_source_foreign_key() {
    let adapter = adapter_with_content();
    let dao = post_dao(&adapter);

    let authors = dao.find_related(&1, "author", &QueryOptions::new()).await.unwrap();
    assert_eq!(authors.len(), 1);
    assert_eq!(authors[0].get("name"), Some(&json!("ada")));

    // Null foreign key resolves to empty, not an error.
    let authors = dao.find_related(&2, "author", &QueryOptions::new()).await.unwrap();
    assert!(authors.is_empty());

    // Missing source row resolves to empty as well.
    let authors = dao.find_related(&99, "author", &QueryOptions::new()).await.unwrap();
    assert!(authors.is_empty());
}

#[tokio::test]
async fn non_owning_one_to_one_queries_the_target_directly() {
    let adapter = adapter_with_content();
    let dao = post_dao(&adapter);

    let meta = dao.find_related(&1, "meta", &QueryOptions::new()).await.unwrap();
    assert_eq!(meta.len(), 1);
    assert_eq!(meta[0].get("views"), Some(&json!(3)));
}

#[tokio::test]
async fn unknown_relation_name_is_a_mapping_error() {
    let adapter = adapter_with_content();
    let dao = post_dao(&adapter);

    let err = dao
        .find_related(&1, "reviewers", &QueryOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Mapping(_)));
    assert!(err.to_string().contains("unknown relation 'reviewers'"));
}

#[tokio::test]
async fn add_relation_is_idempotent() {
    let adapter = adapter_with_content();
    let dao = post_dao(&adapter);

    // Both calls report success; only one junction row exists afterwards.
    assert!(dao.add_relation(&1, "tags", json!(12)).await.unwrap());
    assert!(dao.add_relation(&1, "tags", json!(12)).await.unwrap());

    let pairings: Vec<Row> = adapter
        .rows("post_tags")
        .into_iter()
        .filter(|r| r.get("tag_id") == Some(&json!(12)))
        .collect();
    assert_eq!(pairings.len(), 1);
    assert_eq!(pairings[0].get("post_id"), Some(&json!(1)));
}

#[tokio::test]
async fn remove_relation_deletes_the_pairing() {
    let adapter = adapter_with_content();
    let dao = post_dao(&adapter);

    assert!(dao.remove_relation(&1, "tags", json!(10)).await.unwrap());
    assert_eq!(adapter.rows("post_tags").len(), 1);

    // Removing a pairing that does not exist reports false.
    assert!(!dao.remove_relation(&1, "tags", json!(10)).await.unwrap());
}

#[tokio::test]
async fn relation_mutation_requires_many_to_many() {
    let adapter = adapter_with_content();
    let dao = post_dao(&adapter);

    for relation in ["author", "comments", "meta"] {
        let err = dao.add_relation(&1, relation, json!(1)).await.unwrap_err();
        assert!(
            matches!(err, OrmError::RelationType(_)),
            "add_relation on '{}' should be a relation type error, got {:?}",
            relation,
            err
        );

        let err = dao.remove_relation(&1, relation, json!(1)).await.unwrap_err();
        assert!(matches!(err, OrmError::RelationType(_)));
    }

    let err = dao.add_relation(&1, "missing", json!(1)).await.unwrap_err();
    assert!(matches!(err, OrmError::Mapping(_)));
}

#[tokio::test]
async fn relation_mutation_swallows_storage_failures() {
    let adapter = adapter_with_content();
    let dao = post_dao(&adapter);

    adapter.fail_table("post_tags");
    // Wrong-variant calls still fail loudly, storage failures report false.
    assert!(!dao.add_relation(&1, "tags", json!(12)).await.unwrap());
    assert!(!dao.remove_relation(&1, "tags", json!(10)).await.unwrap());
}

#[tokio::test]
async fn relation_expansion_in_query_options_still_returns_entities() {
    let adapter = adapter_with_content();
    let dao = post_dao(&adapter);

    // Joining tags keeps only posts with at least one tag (inner join).
    let posts = dao
        .find_all(&QueryOptions::new().with_relation("tags"))
        .await;
    assert_eq!(posts.len(), 2); // post 1 joined against two tags
    assert!(posts.iter().all(|p| p.id == Some(1)));

    // A left-joined relation keeps unmatched posts.
    let posts = dao
        .find_all(&QueryOptions::new().with_relation("author"))
        .await;
    assert_eq!(posts.len(), 2);

    // An unknown relation name on a tolerant path recovers as empty.
    let posts = dao
        .find_all(&QueryOptions::new().with_relation("nope"))
        .await;
    assert!(posts.is_empty());
}
