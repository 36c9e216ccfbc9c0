use sammel_db::{AlbumStore, ErrorState, LocalPictureFiles, StoreError};
use sammel_model::*;
use tempfile::TempDir;

fn store() -> (TempDir, AlbumStore) {
    let dir = TempDir::new().unwrap();
    let store = AlbumStore::open_in_memory(LocalPictureFiles::new(dir.path())).unwrap();
    (dir, store)
}

fn book_fields() -> Vec<MetaItemField> {
    vec![
        MetaItemField::new("Title", FieldType::Text, true),
        MetaItemField::new("Pages", FieldType::Integer, false),
    ]
}

fn dune() -> AlbumItem {
    AlbumItem::new("Books")
        .with_field("Title", FieldValue::Text("Dune".into()))
        .with_field("Pages", FieldValue::Integer(412))
}

fn table_names(store: &AlbumStore) -> Vec<String> {
    let mut stmt = store
        .connection()
        .prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'index') ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn table_exists(store: &AlbumStore, name: &str) -> bool {
    store
        .connection()
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE name=?1)",
            [name],
            |row| row.get(0),
        )
        .unwrap()
}

#[test]
fn create_album_creates_tables() {
    let (_dir, store) = store();
    let entry = store.create_album("Books", &book_fields(), false).unwrap();

    assert_eq!(entry.album_name, "Books");
    assert_eq!(entry.table_name, "books");
    assert_eq!(entry.type_info_table_name, "books_typeinfo");
    assert!(table_exists(&store, "books"));
    assert!(table_exists(&store, "books_typeinfo"));
    assert!(table_exists(&store, "books_index"));
    assert!(!table_exists(&store, "books_pictures"));

    assert_eq!(store.list_albums().unwrap(), ["Books"]);
    assert_eq!(store.album_fields("Books").unwrap(), book_fields());
    assert_eq!(store.item_count("Books").unwrap(), 0);
}

#[test]
fn type_info_records_declared_types() {
    let (_dir, store) = store();
    store.create_album("Books", &book_fields(), false).unwrap();

    let (title, pages): (String, String) = store
        .connection()
        .query_row(
            "SELECT \"Title\", \"Pages\" FROM books_typeinfo WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(title, "Text");
    assert_eq!(pages, "Integer");

    let types = store.album_field_types("Books").unwrap();
    assert_eq!(types["Title"], FieldType::Text);
    assert_eq!(types["Pages"], FieldType::Integer);
    assert!(store.is_date_field("Books", "Title").is_ok_and(|d| !d));
}

#[test]
fn lookup_ignores_case() {
    let (_dir, store) = store();
    store.create_album("Books", &book_fields(), false).unwrap();
    assert_eq!(store.album("bOOKS").unwrap().album_name, "Books");
}

#[test]
fn list_albums_sorted_ignoring_case() {
    let (_dir, store) = store();
    for name in ["comics", "Books", "Anthologies"] {
        store.create_album(name, &book_fields(), false).unwrap();
    }
    assert_eq!(store.list_albums().unwrap(), ["Anthologies", "Books", "comics"]);
}

#[test]
fn duplicate_album_is_rejected_cleanly() {
    let (_dir, store) = store();
    store.create_album("Books", &book_fields(), false).unwrap();
    let before = table_names(&store);

    let err = store.create_album("BOOKS", &book_fields(), true).unwrap_err();
    assert!(matches!(err, StoreError::AlbumNameTaken(ref n) if n == "BOOKS"));
    assert_eq!(err.state(), ErrorState::Clean);
    assert_eq!(store.list_albums().unwrap(), ["Books"]);
    assert_eq!(table_names(&store), before);
}

#[test]
fn album_name_availability() {
    let (_dir, store) = store();
    store.create_album("Comic Books", &book_fields(), false).unwrap();

    assert!(!store.is_album_name_available("comic books").unwrap());
    // Same table name
    assert!(!store.is_album_name_available(" Comic books ").unwrap());
    assert!(!store.is_album_name_available("").unwrap());
    assert!(store.is_album_name_available("Comics").unwrap());
}

#[test]
fn stray_table_blocks_album_name() {
    let (_dir, store) = store();
    store
        .connection()
        .execute_batch("CREATE TABLE films_typeinfo (id INTEGER PRIMARY KEY)")
        .unwrap();
    assert!(!store.is_album_name_available("Films").unwrap());
}

#[test]
fn derived_names_block_album_names() {
    let (_dir, store) = store();
    store.create_album("Books Index", &book_fields(), false).unwrap();
    assert!(!store.is_album_name_available("Books").unwrap());
    let before = table_names(&store);
    let err = store.create_album("Books", &book_fields(), false).unwrap_err();
    assert!(matches!(err, StoreError::AlbumNameTaken(ref n) if n == "Books"));
    assert!(!err.is_dirty());
    assert_eq!(table_names(&store), before);

    // The picture table does not exist yet but is reserved for Films
    store.create_album("Films", &book_fields(), false).unwrap();
    assert!(!store.is_album_name_available("Films Pictures").unwrap());
    assert!(matches!(
        store.create_album("Films Pictures", &book_fields(), false),
        Err(StoreError::AlbumNameTaken(_))
    ));
    store.set_album_picture_capability("Films", true).unwrap();

    store.create_album("Comics", &book_fields(), false).unwrap();
    assert!(matches!(
        store.rename_album("Comics", "Films Typeinfo"),
        Err(StoreError::AlbumNameTaken(_))
    ));
    assert!(store.is_album_name_available("Films Archive").unwrap());
}

#[test]
fn stray_index_blocks_album_name() {
    let (_dir, store) = store();
    store
        .connection()
        .execute_batch("CREATE TABLE scratch (x TEXT); CREATE INDEX games_index ON scratch (x)")
        .unwrap();
    assert!(!store.is_album_name_available("Games").unwrap());
}

#[test]
fn invalid_field_lists_are_rejected() {
    let (_dir, store) = store();

    let err = store
        .create_album("Books", &[MetaItemField::new("id", FieldType::Text, false)], false)
        .unwrap_err();
    assert!(matches!(err, StoreError::ReservedFieldName(_)));

    let err = store
        .create_album("Boxes", &[MetaItemField::new("Size [cm]", FieldType::Integer, true)], false)
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidFieldName(ref n) if n == "Size [cm]"));
    assert!(!err.is_dirty());
    assert!(store.list_albums().unwrap().is_empty());

    let err = store
        .create_album("Books", &[MetaItemField::new("Key", FieldType::Id, false)], false)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::FieldTypeNotAllowed {
            field_type: FieldType::Id,
            ..
        }
    ));

    let err = store
        .create_album(
            "Books",
            &[
                MetaItemField::new("Title", FieldType::Text, false),
                MetaItemField::new("TITLE", FieldType::Integer, false),
            ],
            false,
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::FieldNameTaken { .. }));

    let err = store
        .create_album("Books", &[MetaItemField::new("  ", FieldType::Text, false)], false)
        .unwrap_err();
    assert!(matches!(err, StoreError::EmptyFieldName));

    assert!(matches!(
        store.create_album("  ", &book_fields(), false),
        Err(StoreError::EmptyAlbumName)
    ));
    assert!(store.list_albums().unwrap().is_empty());
    assert!(!table_exists(&store, "books"));
}

#[test]
fn field_name_availability() {
    let (_dir, store) = store();
    store.create_album("Books", &book_fields(), false).unwrap();

    assert!(!store.is_field_name_available("Books", "title").unwrap());
    assert!(!store.is_field_name_available("Books", "content_version").unwrap());
    assert!(store.is_field_name_available("Books", "Author").unwrap());
    assert!(!store.is_field_name_available("Books", "Size [cm]").unwrap());
    assert!(matches!(
        store.is_field_name_available("Films", "Author"),
        Err(StoreError::UnknownAlbum(_))
    ));
}

#[test]
fn rename_album_moves_tables_and_items() {
    let (_dir, store) = store();
    store.create_album("Books", &book_fields(), false).unwrap();
    let id = store.add_item(&dune(), true).unwrap();
    let version = store.schema_version("Books").unwrap();

    let new_version = store.rename_album("Books", "Novels").unwrap();
    assert_ne!(new_version, version);

    assert_eq!(store.list_albums().unwrap(), ["Novels"]);
    assert!(table_exists(&store, "novels"));
    assert!(table_exists(&store, "novels_typeinfo"));
    assert!(table_exists(&store, "novels_index"));
    assert!(!table_exists(&store, "books"));
    assert!(!table_exists(&store, "books_index"));
    assert_eq!(store.indexed_column_names("Novels").unwrap(), ["Title"]);

    let item = store.fetch_item("Novels", id).unwrap();
    assert_eq!(item.album_name, "Novels");
    assert_eq!(item.field_value("Title"), Some(&FieldValue::Text("Dune".into())));

    // Content rows still reference the renamed type-info table
    let mut emma = AlbumItem::new("Novels").with_field("Title", FieldValue::Text("Emma".into()));
    emma.id = Some(store.add_item(&emma, true).unwrap());
    assert_eq!(store.item_count("Novels").unwrap(), 2);
}

#[test]
fn rename_album_case_only() {
    let (_dir, store) = store();
    store.create_album("Books", &book_fields(), false).unwrap();
    store.rename_album("Books", "BOOKS").unwrap();
    assert_eq!(store.list_albums().unwrap(), ["BOOKS"]);
    assert!(table_exists(&store, "books"));
}

#[test]
fn rename_album_to_taken_name() {
    let (_dir, store) = store();
    store.create_album("Books", &book_fields(), false).unwrap();
    store.create_album("Films", &book_fields(), false).unwrap();

    let err = store.rename_album("Books", "films").unwrap_err();
    assert!(matches!(err, StoreError::AlbumNameTaken(_)));
    assert_eq!(store.list_albums().unwrap(), ["Books", "Films"]);
}

#[test]
fn rename_album_moves_picture_directory() {
    let (dir, store) = store();
    store.create_album("Art", &book_fields(), true).unwrap();
    std::fs::create_dir_all(dir.path().join("art")).unwrap();
    std::fs::write(dir.path().join("art").join("a.jpg"), b"jpg").unwrap();

    store.rename_album("Art", "Paintings").unwrap();
    assert!(table_exists(&store, "paintings_pictures"));
    assert!(!dir.path().join("art").exists());
    assert!(dir.path().join("paintings").join("a.jpg").exists());
}

#[test]
fn remove_album_drops_everything() {
    let (dir, store) = store();
    store.create_album("Art", &book_fields(), true).unwrap();
    store.create_album("Books", &book_fields(), false).unwrap();
    std::fs::create_dir_all(dir.path().join("art")).unwrap();

    store.remove_album("art").unwrap();
    assert_eq!(store.list_albums().unwrap(), ["Books"]);
    for table in ["art", "art_typeinfo", "art_pictures", "art_index"] {
        assert!(!table_exists(&store, table), "{table} should be gone");
    }
    assert!(!dir.path().join("art").exists());

    assert!(matches!(
        store.remove_album("Art"),
        Err(StoreError::UnknownAlbum(_))
    ));
}

#[test]
fn picture_capability_is_symmetric() {
    let (dir, store) = store();
    store.create_album("Books", &book_fields(), false).unwrap();
    let version = store.schema_version("Books").unwrap();

    let enabled = store.set_album_picture_capability("Books", true).unwrap();
    assert_ne!(enabled, version);
    assert!(store.has_pictures("Books").unwrap());
    assert!(table_exists(&store, "books_pictures"));
    assert_eq!(store.album_names_with_pictures().unwrap(), ["Books"]);

    let err = store.set_album_picture_capability("Books", true).unwrap_err();
    assert!(matches!(
        err,
        StoreError::PictureCapabilityUnchanged { enabled: true, .. }
    ));
    assert!(!err.is_dirty());

    std::fs::create_dir_all(dir.path().join("books").join("thumbnails")).unwrap();
    store.set_album_picture_capability("Books", false).unwrap();
    assert!(!store.has_pictures("Books").unwrap());
    assert!(!table_exists(&store, "books_pictures"));
    assert!(!dir.path().join("books").exists());
    assert!(store.album_names_with_pictures().unwrap().is_empty());
    assert!(store.is_ready());
}

#[test]
fn check_detects_missing_tables() {
    let (_dir, store) = store();
    store.create_album("Books", &book_fields(), false).unwrap();
    assert!(store.check().is_ok());

    store.connection().execute_batch("DROP TABLE books").unwrap();
    let err = store.check().unwrap_err();
    assert!(matches!(err, StoreError::Inconsistent(_)));
    assert!(err.is_dirty());
    assert!(!store.is_ready());
}

#[test]
fn reset_moves_store_aside() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("albums.db");
    let store = AlbumStore::open(&path, LocalPictureFiles::new(dir.path().join("pictures"))).unwrap();
    store.create_album("Books", &book_fields(), false).unwrap();

    let (fresh, aside) = store.reset().unwrap();
    let aside = aside.unwrap();
    assert!(aside.exists());
    let aside_name = aside.file_name().unwrap().to_string_lossy().into_owned();
    assert!(aside_name.starts_with("albums.corrupt-"));
    assert!(aside_name.ends_with(".db"));

    assert_eq!(fresh.path(), Some(path.as_path()));
    assert!(fresh.list_albums().unwrap().is_empty());
    assert!(fresh.last_change().is_some());
    fresh.close().unwrap();

    // The copy still holds the old albums
    let old = AlbumStore::open(&aside, LocalPictureFiles::new(dir.path())).unwrap();
    assert_eq!(old.list_albums().unwrap(), ["Books"]);
}

#[test]
fn reset_file_replaces_unreadable_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("albums.db");
    std::fs::write(&path, b"definitely not a database file, just some bytes").unwrap();
    assert!(AlbumStore::open(&path, LocalPictureFiles::new(dir.path())).is_err());

    let (fresh, aside) = AlbumStore::reset_file(&path, LocalPictureFiles::new(dir.path())).unwrap();
    assert!(aside.exists());
    assert!(fresh.list_albums().unwrap().is_empty());
    assert!(fresh.is_ready());
}

#[test]
fn reopen_file_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("albums.db");
    {
        let store = AlbumStore::open(&path, LocalPictureFiles::new(dir.path())).unwrap();
        store.create_album("Books", &book_fields(), false).unwrap();
        store.add_item(&dune(), true).unwrap();
        store.close().unwrap();
    }

    let store = AlbumStore::open(&path, LocalPictureFiles::new(dir.path())).unwrap();
    assert!(store.last_change().is_none());
    assert_eq!(store.item_count("Books").unwrap(), 1);
}
