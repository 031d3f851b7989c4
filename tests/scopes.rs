#![cfg(feature = "rusqlite")]

#[macro_use]
mod common;

use common::{
    Master, add_comment, add_image, key, morph_images, post_comments, post_tags, relate, setup_db,
};
use tether::prelude::*;
use tether_sqlite::SQLiteValue;

#[test]
fn global_scope_filters_bound_and_persisted_rows() {
    let ledger = setup_db();
    relate(ledger.conn(), 1, 9);
    relate(ledger.conn(), 1, 1);
    ledger.bind("Post", "tags", 9, &key("s")).unwrap();
    ledger.bind("Post", "tags", 2, &key("s")).unwrap();

    let visible = post_tags().global_scope(
        "visible",
        eq(
            SQL::qualified("tags", "hidden"),
            SQL::value(SQLiteValue::from(false)),
        ),
    );

    assert_related!(ledger, visible, Master::persisted("Post", 1), "tags", "s", [1, 2]);
}

#[test]
fn relation_constraints_only_narrow_persisted_rows() {
    let ledger = setup_db();
    add_comment(ledger.conn(), 10, Some(1), true);
    add_comment(ledger.conn(), 11, Some(1), false);
    add_comment(ledger.conn(), 12, None, false);
    ledger.bind("Post", "comments", 12, &key("s")).unwrap();

    let approved = post_comments().constraint(eq(
        SQL::qualified("comments", "approved"),
        SQL::value(SQLiteValue::from(true)),
    ));

    assert_related!(ledger, approved, Master::persisted("Post", 1), "comments", "s", [10, 12]);
}

#[test]
fn direct_relation_unbind() {
    let ledger = setup_db();
    add_comment(ledger.conn(), 10, Some(1), true);
    add_comment(ledger.conn(), 11, Some(1), true);
    add_comment(ledger.conn(), 20, Some(2), true);
    ledger.unbind("Post", "comments", 11, &key("s")).unwrap();

    assert_related!(ledger, post_comments(), Master::persisted("Post", 1), "comments", "s", [10]);
}

#[test]
fn morph_many_excludes_other_types_with_the_same_key() {
    let ledger = setup_db();
    add_image(ledger.conn(), 1, "Post", 1);
    add_image(ledger.conn(), 2, "Post", 1);
    add_image(ledger.conn(), 3, "Video", 1);

    let post = Master::persisted("Post", 1);
    let video = Master::persisted("Video", 1);
    assert_related!(ledger, morph_images("posts", "Post"), post, "images", "s", [1, 2]);
    assert_related!(ledger, morph_images("videos", "Video"), video, "images", "s", [3]);

    ledger.unbind("Post", "images", 1, &key("s")).unwrap();
    assert_related!(ledger, morph_images("posts", "Post"), post, "images", "s", [2]);
    assert_related!(ledger, morph_images("videos", "Video"), video, "images", "s", [3]);
}

#[test]
fn count_ignores_pagination() {
    let ledger = setup_db();
    for tag in 1..=6 {
        ledger.bind("Post", "tags", tag, &key("s")).unwrap();
    }

    let page = resolve_effective_relation(
        &ResolveContext::default(),
        &post_tags(),
        &Master::new("Post"),
        "tags",
        Some("s"),
    )
    .unwrap()
    .order_by(SQL::qualified("tags", "id"), OrderBy::Asc)
    .limit(2)
    .offset(2);

    let ids: Vec<_> = page
        .slave_ids(ledger.conn())
        .unwrap()
        .into_iter()
        .filter_map(|id| id.as_i64())
        .collect();
    assert_eq!(ids, [3, 4]);
    assert_eq!(page.count(ledger.conn()).unwrap(), 6);
}

#[test]
fn caller_filters_narrow_the_set() {
    let ledger = setup_db();
    for tag in [1, 2, 3] {
        ledger.bind("Post", "tags", tag, &key("s")).unwrap();
    }

    let query = resolve_effective_relation(
        &ResolveContext::default(),
        &post_tags(),
        &Master::new("Post"),
        "tags",
        Some("s"),
    )
    .unwrap()
    .r#where(neq(
        SQL::qualified("tags", "name"),
        SQL::value(SQLiteValue::from("tag-2")),
    ));

    assert_eq!(common::sorted_ids(&query, ledger.conn()), [1, 3]);
}

#[test]
fn text_keys_and_prefixed_tables() {
    let config = Config::from_toml_str(
        r#"
        [ledger]
        prefix = "app_"
        slave_key = "text"
        "#,
    )
    .unwrap();
    let ctx = config.resolve_context();

    let ledger = config
        .sqlite_ledger(::rusqlite::Connection::open_in_memory().unwrap())
        .unwrap();
    ledger
        .conn()
        .execute_batch(
            r#"
            CREATE TABLE app_labels (code TEXT PRIMARY KEY);
            CREATE TABLE app_article_label (article_id INTEGER, label_code TEXT);
            INSERT INTO app_labels (code) VALUES ('red'), ('green'), ('blue');
            INSERT INTO app_article_label VALUES (1, 'red'), (1, 'green');
            "#,
        )
        .unwrap();

    let s = key("s");
    ledger.unbind("Article", "labels", "green", &s).unwrap();
    ledger.bind("Article", "labels", "blue", &s).unwrap();

    let labels = RelationDescriptor::<SQLiteValue>::belongs_to_many(
        TableRef::new("articles", "id"),
        TableRef::new("labels", "code"),
        PivotTable::new("article_label", "article_id", "label_code"),
    );
    let query = resolve_effective_relation(
        &ctx,
        &labels,
        &MasterRecord::persisted("Article", 1),
        "labels",
        Some("s"),
    )
    .unwrap()
    .order_by(SQL::qualified("app_labels", "code"), OrderBy::Asc);

    assert_eq!(
        query.slave_ids(ledger.conn()).unwrap(),
        [SlaveId::from("blue"), SlaveId::from("red")]
    );
}

#[test]
fn configured_key_limit_holds_for_writes_and_reads() {
    let config = Config::from_toml_str("[session]\nmax_key_length = 40").unwrap();
    let ctx = config.resolve_context();
    let ledger = config
        .sqlite_ledger(::rusqlite::Connection::open_in_memory().unwrap())
        .unwrap();
    ledger
        .conn()
        .execute_batch("CREATE TABLE tags (id INTEGER PRIMARY KEY); INSERT INTO tags VALUES (7);")
        .unwrap();

    let long = key(&"k".repeat(60));
    let err = ledger.bind("Post", "tags", 7, &long).unwrap_err();
    assert!(matches!(err, TetherError::Configuration(_)));
    let stored: i64 = ledger
        .conn()
        .query_row("SELECT COUNT(*) FROM deferred_bindings", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, 0);

    let fits = "k".repeat(40);
    ledger.bind("Post", "tags", 7, &key(&fits)).unwrap();
    let query = resolve_effective_relation(
        &ctx,
        &post_tags(),
        &Master::new("Post"),
        "tags",
        Some(fits.as_str()),
    )
    .unwrap();
    assert_eq!(common::sorted_ids(&query, ledger.conn()), [7]);
}

#[test]
fn unsupported_relation_is_rejected_before_querying() {
    let belongs_to = RelationDescriptor::<SQLiteValue>::new(
        RelationKind::BelongsTo,
        TableRef::new("comments", "id"),
        TableRef::new("posts", "id"),
    );

    let err = resolve_effective_relation(
        &ResolveContext::default(),
        &belongs_to,
        &MasterRecord::persisted("Comment", 1),
        "post",
        Some("s"),
    )
    .unwrap_err();
    assert!(matches!(err, TetherError::UnsupportedRelation(_)));
    assert!(!err.is_storage());
}

#[test]
fn missing_ledger_table_surfaces_as_storage_error() {
    let conn = ::rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE tags (id INTEGER PRIMARY KEY)")
        .unwrap();

    let query = resolve_effective_relation(
        &ResolveContext::default(),
        &post_tags(),
        &Master::new("Post"),
        "tags",
        Some("s"),
    )
    .unwrap();

    assert!(query.slave_ids(&conn).unwrap_err().is_storage());
}
