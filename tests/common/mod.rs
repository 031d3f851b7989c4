#![allow(dead_code)]

use ::rusqlite::{Connection, Row};
use tether::prelude::*;
use tether_sqlite::SQLiteValue;

pub type Descriptor = RelationDescriptor<'static, SQLiteValue<'static>>;
pub type Master = MasterRecord<'static, SQLiteValue<'static>>;

/// Resolves a relation and asserts the sorted integer keys of the effective set.
#[macro_export]
macro_rules! assert_related {
    ($ledger:expr, $descriptor:expr, $master:expr, $field:expr, $session:expr, [$($id:expr),* $(,)?]) => {{
        let query = tether::resolve_effective_relation(
            &tether::ResolveContext::default(),
            &$descriptor,
            &$master,
            $field,
            Some($session),
        )
        .expect("resolve relation");
        let expected: Vec<i64> = vec![$($id),*];
        assert_eq!($crate::common::sorted_ids(&query, $ledger.conn()), expected);
    }};
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub hidden: bool,
}

impl TryFrom<&Row<'_>> for Tag {
    type Error = ::rusqlite::Error;

    fn try_from(row: &Row<'_>) -> ::rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            hidden: row.get("hidden")?,
        })
    }
}

/// In-memory database with the ledger and the fixture tables. Tags 1 to 9
/// exist; tag 9 is hidden.
pub fn setup_db() -> SqliteLedger {
    let ledger = SqliteLedger::open_in_memory().expect("Failed to create in-memory ledger");
    create_tables(ledger.conn());
    ledger
}

fn create_tables(conn: &Connection) {
    conn.execute_batch(
        r#"
        CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT NOT NULL);
        CREATE TABLE videos (id INTEGER PRIMARY KEY, title TEXT NOT NULL);
        CREATE TABLE tags (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            hidden INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE post_tag (post_id INTEGER NOT NULL, tag_id INTEGER NOT NULL);
        CREATE TABLE taggables (
            tag_id INTEGER NOT NULL,
            taggable_id INTEGER NOT NULL,
            taggable_type TEXT NOT NULL
        );
        CREATE TABLE comments (
            id INTEGER PRIMARY KEY,
            post_id INTEGER,
            body TEXT NOT NULL,
            approved INTEGER NOT NULL DEFAULT 1
        );
        CREATE TABLE images (
            id INTEGER PRIMARY KEY,
            imageable_id INTEGER NOT NULL,
            imageable_type TEXT NOT NULL
        );
        "#,
    )
    .expect("Failed to create fixture tables");

    for id in 1..=9 {
        conn.execute(
            "INSERT INTO tags (id, name, hidden) VALUES (?1, ?2, ?3)",
            ::rusqlite::params![id, format!("tag-{id}"), id == 9],
        )
        .expect("Failed to insert tag");
    }
    conn.execute_batch(
        "INSERT INTO posts (id, title) VALUES (1, 'first'), (2, 'second');
         INSERT INTO videos (id, title) VALUES (1, 'clip');",
    )
    .expect("Failed to insert masters");
}

pub fn relate(conn: &Connection, post_id: i64, tag_id: i64) {
    conn.execute(
        "INSERT INTO post_tag (post_id, tag_id) VALUES (?1, ?2)",
        [post_id, tag_id],
    )
    .expect("Failed to insert pivot row");
}

pub fn relate_morph(conn: &Connection, taggable_type: &str, taggable_id: i64, tag_id: i64) {
    conn.execute(
        "INSERT INTO taggables (tag_id, taggable_id, taggable_type) VALUES (?1, ?2, ?3)",
        ::rusqlite::params![tag_id, taggable_id, taggable_type],
    )
    .expect("Failed to insert morph pivot row");
}

pub fn add_comment(conn: &Connection, id: i64, post_id: Option<i64>, approved: bool) {
    conn.execute(
        "INSERT INTO comments (id, post_id, body, approved) VALUES (?1, ?2, 'text', ?3)",
        ::rusqlite::params![id, post_id, approved],
    )
    .expect("Failed to insert comment");
}

pub fn add_image(conn: &Connection, id: i64, imageable_type: &str, imageable_id: i64) {
    conn.execute(
        "INSERT INTO images (id, imageable_id, imageable_type) VALUES (?1, ?2, ?3)",
        ::rusqlite::params![id, imageable_id, imageable_type],
    )
    .expect("Failed to insert image");
}

pub fn post_tags() -> Descriptor {
    Descriptor::belongs_to_many(
        TableRef::new("posts", "id"),
        TableRef::new("tags", "id"),
        PivotTable::new("post_tag", "post_id", "tag_id"),
    )
}

pub fn morph_tags(master_table: &'static str, class: &'static str) -> Descriptor {
    Descriptor::morph_to_many(
        TableRef::new(master_table, "id"),
        TableRef::new("tags", "id"),
        PivotTable::new("taggables", "taggable_id", "tag_id"),
        Morph::new("taggable_type", class),
    )
}

pub fn post_comments() -> Descriptor {
    Descriptor::has_many(
        TableRef::new("posts", "id"),
        TableRef::new("comments", "id"),
        "post_id",
    )
}

pub fn morph_images(master_table: &'static str, class: &'static str) -> Descriptor {
    Descriptor::morph_many(
        TableRef::new(master_table, "id"),
        TableRef::new("images", "id"),
        "imageable_id",
        Morph::new("imageable_type", class),
    )
}

pub fn key(raw: &str) -> SessionKey {
    SessionKey::new(raw).expect("valid session key")
}

pub fn sorted_ids<'a>(query: &DeferredQuery<'a, SQLiteValue<'a>>, conn: &Connection) -> Vec<i64> {
    let mut ids: Vec<i64> = query
        .slave_ids(conn)
        .expect("run resolved query")
        .iter()
        .map(|id| id.as_i64().expect("integer key"))
        .collect();
    ids.sort_unstable();
    ids
}
