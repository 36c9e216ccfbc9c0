use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use sammel_db::{AlbumStore, LocalPictureFiles, PictureFiles, StoreError};
use sammel_model::*;
use tempfile::TempDir;

fn store() -> (TempDir, AlbumStore) {
    let dir = TempDir::new().unwrap();
    let store = AlbumStore::open_in_memory(LocalPictureFiles::new(dir.path())).unwrap();
    store
        .create_album(
            "Books",
            &[
                MetaItemField::new("Title", FieldType::Text, true),
                MetaItemField::new("Pages", FieldType::Integer, false),
            ],
            false,
        )
        .unwrap();
    (dir, store)
}

fn dune() -> AlbumItem {
    AlbumItem::new("Books")
        .with_field("Title", FieldValue::Text("Dune".into()))
        .with_field("Pages", FieldValue::Integer(412))
}

fn art_fields() -> Vec<MetaItemField> {
    vec![MetaItemField::new("Title", FieldType::Text, true)]
}

fn touch_picture(root: &Path, original: &str, thumbnail: &str) {
    let dir = root.join("art");
    std::fs::create_dir_all(dir.join("thumbnails")).unwrap();
    std::fs::write(dir.join(original), b"original").unwrap();
    std::fs::write(dir.join("thumbnails").join(thumbnail), b"thumbnail").unwrap();
}

#[test]
fn add_and_fetch_item() {
    let (_dir, store) = store();
    let id = store.add_item(&dune(), true).unwrap();

    let item = store.fetch_item("Books", id).unwrap();
    assert_eq!(item.id, Some(id));
    assert!(item.content_version.is_some());
    assert_eq!(item.album_name, "Books");
    assert_eq!(item.field_value("Title"), Some(&FieldValue::Text("Dune".into())));
    assert_eq!(item.field_value("Pages"), Some(&FieldValue::Integer(412)));
    assert_eq!(
        item.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        ["Title", "Pages"]
    );
}

#[test]
fn every_add_gets_a_fresh_content_version() {
    let (_dir, store) = store();
    let mut seeded = dune();
    seeded.content_version = Some(uuid::Uuid::new_v4());

    let a = store.add_item(&seeded, true).unwrap();
    let b = store.add_item(&seeded, true).unwrap();
    let a = store.fetch_item("Books", a).unwrap().content_version.unwrap();
    let b = store.fetch_item("Books", b).unwrap().content_version.unwrap();
    assert_ne!(a, b);
    assert_ne!(Some(a), seeded.content_version);
}

#[test]
fn add_can_keep_content_version() {
    let (_dir, store) = store();
    let version = uuid::Uuid::new_v4();
    let mut item = dune();

    assert!(matches!(
        store.add_item(&item, false),
        Err(StoreError::MissingContentVersion(_))
    ));

    item.content_version = Some(version);
    let id = store.add_item(&item, false).unwrap();
    assert_eq!(store.fetch_item("Books", id).unwrap().content_version, Some(version));
}

#[test]
fn add_keeps_explicit_id() {
    let (_dir, store) = store();
    let mut item = dune();
    item.id = Some(42);
    assert_eq!(store.add_item(&item, true).unwrap(), 42);
    assert_eq!(store.fetch_item("Books", 42).unwrap().id, Some(42));
}

#[test]
fn duplicate_id_rolls_back_cleanly() {
    let (_dir, store) = store();
    let mut item = dune();
    item.id = Some(7);
    store.add_item(&item, true).unwrap();

    let err = store.add_item(&item, true).unwrap_err();
    assert!(matches!(err, StoreError::Storage { .. }));
    assert!(!err.is_dirty());
    assert_eq!(store.item_count("Books").unwrap(), 1);

    // The connection is usable afterwards
    store.add_item(&dune(), true).unwrap();
    assert_eq!(store.item_count("Books").unwrap(), 2);
}

#[test]
fn missing_fields_get_defaults() {
    let (_dir, store) = store();
    let item = AlbumItem::new("Books").with_field("Title", FieldValue::Text("Emma".into()));
    let id = store.add_item(&item, true).unwrap();
    assert_eq!(
        store.fetch_item("Books", id).unwrap().field_value("Pages"),
        Some(&FieldValue::Integer(0))
    );
}

#[test]
fn invalid_items_are_rejected() {
    let (_dir, store) = store();

    let unknown = dune().with_field("Author", FieldValue::Text("Herbert".into()));
    assert!(matches!(
        store.add_item(&unknown, true),
        Err(StoreError::UnknownField { ref field, .. }) if field == "Author"
    ));

    let mismatched = dune().with_field("Pages", FieldValue::Text("many".into()));
    let err = store.add_item(&mismatched, true).unwrap_err();
    assert!(matches!(err, StoreError::InvalidItem { .. }));
    assert!(!err.is_dirty());

    let mut broken = dune();
    broken.fields[0].field_type = FieldType::Integer;
    assert!(matches!(
        store.add_item(&broken, true),
        Err(StoreError::InvalidItem { .. })
    ));

    assert!(matches!(
        store.add_item(&AlbumItem::new("Films"), true),
        Err(StoreError::UnknownAlbum(_))
    ));
    assert_eq!(store.item_count("Books").unwrap(), 0);
}

#[test]
fn update_item_changes_values_and_version() {
    let (_dir, store) = store();
    let id = store.add_item(&dune(), true).unwrap();
    let mut item = store.fetch_item("Books", id).unwrap();
    let before = item.content_version;

    item.set_field_value("Pages", FieldValue::Integer(896));
    let version = store.update_item(&item).unwrap();
    assert_ne!(Some(version), before);

    let stored = store.fetch_item("Books", id).unwrap();
    assert_eq!(stored.content_version, Some(version));
    assert_eq!(stored.field_value("Pages"), Some(&FieldValue::Integer(896)));
    assert_eq!(stored.field_value("Title"), Some(&FieldValue::Text("Dune".into())));
}

#[test]
fn update_requires_existing_id() {
    let (_dir, store) = store();
    assert!(matches!(
        store.update_item(&dune()),
        Err(StoreError::MissingItemId(_))
    ));

    let mut ghost = dune();
    ghost.id = Some(99);
    assert!(matches!(
        store.update_item(&ghost),
        Err(StoreError::ItemNotFound { id: 99, .. })
    ));
}

#[test]
fn delete_item() {
    let (_dir, store) = store();
    let id = store.add_item(&dune(), true).unwrap();
    let item = store.fetch_item("Books", id).unwrap();

    store.delete_item(&item).unwrap();
    assert_eq!(store.item_count("Books").unwrap(), 0);
    assert!(matches!(
        store.fetch_item("Books", id),
        Err(StoreError::ItemNotFound { .. })
    ));
    assert!(matches!(
        store.delete_item(&item),
        Err(StoreError::ItemNotFound { .. })
    ));
}

#[test]
fn every_field_type_round_trips() {
    let (_dir, store) = store();
    let fields = vec![
        MetaItemField::new("Name", FieldType::Text, false),
        MetaItemField::new("Count", FieldType::Integer, false),
        MetaItemField::new("Price", FieldType::Decimal, false),
        MetaItemField::new("Rating", FieldType::StarRating, false),
        MetaItemField::new("Owned", FieldType::Option, false),
        MetaItemField::new("Bought", FieldType::Date, false),
        MetaItemField::new("At", FieldType::Time, false),
        MetaItemField::new("Link", FieldType::Url, false),
    ];
    store.create_album("Things", &fields, false).unwrap();

    let item = AlbumItem::new("Things")
        .with_field("Name", FieldValue::Text("It's a \"thing\"".into()))
        .with_field("Count", FieldValue::Integer(-3))
        .with_field("Price", FieldValue::Decimal(12.5))
        .with_field("Rating", FieldValue::StarRating(StarRating::FourStars))
        .with_field("Owned", FieldValue::Option(OptionType::Yes))
        .with_field(
            "Bought",
            FieldValue::Date(NaiveDate::from_ymd_opt(1965, 8, 1).unwrap()),
        )
        .with_field(
            "At",
            FieldValue::parse(FieldType::Time, "09:30").unwrap(),
        )
        .with_field("Link", FieldValue::Url("https://example.org".into()));
    let id = store.add_item(&item, true).unwrap();

    let stored = store.fetch_item("Things", id).unwrap();
    assert_eq!(stored.fields, item.fields);
}

#[test]
fn unparsable_option_is_reported() {
    let (_dir, store) = store();
    store
        .create_album(
            "Things",
            &[MetaItemField::new("Owned", FieldType::Option, false)],
            false,
        )
        .unwrap();
    let id = store
        .add_item(
            &AlbumItem::new("Things").with_field("Owned", FieldValue::Option(OptionType::No)),
            true,
        )
        .unwrap();
    store
        .connection()
        .execute("UPDATE things SET \"Owned\" = 'Maybe'", [])
        .unwrap();

    let err = store.fetch_item("Things", id).unwrap_err();
    assert!(matches!(err, StoreError::Decode { ref column, .. } if column == "Owned"));
    assert!(!err.is_dirty());
}

#[test]
fn fetch_items_resolves_album_from_query() {
    let (_dir, store) = store();
    store.add_item(&dune(), true).unwrap();
    store
        .add_item(
            &AlbumItem::new("Books")
                .with_field("Title", FieldValue::Text("Emma".into()))
                .with_field("Pages", FieldValue::Integer(320)),
            true,
        )
        .unwrap();

    let items = store
        .fetch_items("SELECT * FROM 'books' WHERE ([Pages] > '400')")
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].field_value("Title"), Some(&FieldValue::Text("Dune".into())));

    assert!(matches!(
        store.fetch_items("SELECT 1"),
        Err(StoreError::UnresolvedQuery(_))
    ));
    assert!(matches!(
        store.fetch_items("SELECT * FROM 'films'"),
        Err(StoreError::UnknownAlbum(_))
    ));
}

#[test]
fn run_structured_query() {
    let (_dir, store) = store();
    for (title, pages) in [("Dune", 412), ("Emma", 320), ("Ulysses", 730)] {
        store
            .add_item(
                &AlbumItem::new("Books")
                    .with_field("Title", FieldValue::Text(title.into()))
                    .with_field("Pages", FieldValue::Integer(pages)),
                true,
            )
            .unwrap();
    }

    let components = [QueryComponent::new("Pages", QueryOperator::Greater, "400")];
    let sort = SortOrder {
        field_name: "Pages".into(),
        ascending: false,
    };
    let titles: Vec<FieldValue> = store
        .run_query(&components, true, "Books", Some(&sort))
        .unwrap()
        .into_iter()
        .filter_map(|item| item.field_value("Title").cloned())
        .collect();
    assert_eq!(
        titles,
        [
            FieldValue::Text("Ulysses".into()),
            FieldValue::Text("Dune".into())
        ]
    );

    let bad = [QueryComponent::new("Title", QueryOperator::Greater, "D")];
    assert!(matches!(
        store.run_query(&bad, true, "Books", None),
        Err(StoreError::Query(QueryError::OperatorNotAllowed { .. }))
    ));
}

#[test]
fn last_change_tracks_mutations() {
    let (_dir, store) = store();
    let created = store.last_change().unwrap();
    store.list_albums().unwrap();
    assert_eq!(store.last_change(), Some(created));

    store.add_item(&dune(), true).unwrap();
    assert!(store.last_change().unwrap() >= created);
}

// ── Pictures ────────────────────────────────────────────────────────────────

#[test]
fn pictures_are_linked_and_fetched() {
    let (dir, store) = store();
    store.create_album("Art", &art_fields(), true).unwrap();
    touch_picture(dir.path(), "a.jpg", "a_thumb.jpg");

    let mut item = AlbumItem::new("Art").with_field("Title", FieldValue::Text("Sunset".into()));
    item.pictures.push(AlbumItemPicture::new("a.jpg", "a_thumb.jpg", "Art"));
    let id = store.add_item(&item, true).unwrap();

    let stored = store.fetch_item("Art", id).unwrap();
    assert_eq!(stored.pictures.len(), 1);
    assert_eq!(stored.pictures[0].original_filename, "a.jpg");
    assert_eq!(stored.pictures[0].album_item_id, Some(id));
    assert!(stored.pictures[0].id.is_some());
}

#[test]
fn pictures_need_picture_support() {
    let (_dir, store) = store();
    let mut item = dune();
    item.pictures.push(AlbumItemPicture::new("a.jpg", "a_thumb.jpg", "Books"));
    assert!(matches!(
        store.add_item(&item, true),
        Err(StoreError::InvalidItem { .. })
    ));
}

#[test]
fn picture_names_stay_inside_album_directory() {
    let (dir, store) = store();
    store.create_album("Art", &art_fields(), true).unwrap();
    let outside = dir.path().join("keep.txt");
    std::fs::write(&outside, b"keep").unwrap();

    let mut item = AlbumItem::new("Art").with_field("Title", FieldValue::Text("Sunset".into()));
    item.pictures.push(AlbumItemPicture::new("../keep.txt", "a_thumb.jpg", "Art"));
    let err = store.add_item(&item, true).unwrap_err();
    assert!(matches!(err, StoreError::InvalidItem { .. }));
    assert!(!err.is_dirty());
    assert_eq!(store.item_count("Art").unwrap(), 0);

    touch_picture(dir.path(), "a.jpg", "a_thumb.jpg");
    item.pictures = vec![AlbumItemPicture::new("a.jpg", "a_thumb.jpg", "Art")];
    let id = store.add_item(&item, true).unwrap();

    let mut item = store.fetch_item("Art", id).unwrap();
    item.pictures = vec![AlbumItemPicture::new(
        "a.jpg",
        outside.to_string_lossy().into_owned(),
        "Art",
    )];
    assert!(matches!(
        store.update_item(&item),
        Err(StoreError::InvalidItem { .. })
    ));
    let stored = store.fetch_item("Art", id).unwrap();
    assert_eq!(stored.pictures[0].thumbnail_filename, "a_thumb.jpg");
    assert!(dir.path().join("art").join("a.jpg").exists());
    assert!(outside.exists());
}

#[test]
fn update_deletes_orphaned_picture_files() {
    let (dir, store) = store();
    store.create_album("Art", &art_fields(), true).unwrap();
    touch_picture(dir.path(), "a.jpg", "a_thumb.jpg");
    touch_picture(dir.path(), "b.jpg", "b_thumb.jpg");

    let mut item = AlbumItem::new("Art").with_field("Title", FieldValue::Text("Sunset".into()));
    item.pictures.push(AlbumItemPicture::new("a.jpg", "a_thumb.jpg", "Art"));
    item.pictures.push(AlbumItemPicture::new("b.jpg", "b_thumb.jpg", "Art"));
    let id = store.add_item(&item, true).unwrap();

    let mut item = store.fetch_item("Art", id).unwrap();
    item.pictures.retain(|p| p.original_filename == "b.jpg");
    store.update_item(&item).unwrap();

    let art = dir.path().join("art");
    assert!(!art.join("a.jpg").exists());
    assert!(!art.join("thumbnails").join("a_thumb.jpg").exists());
    assert!(art.join("b.jpg").exists());
    assert_eq!(store.fetch_item("Art", id).unwrap().pictures.len(), 1);
}

#[test]
fn delete_removes_picture_files() {
    let (dir, store) = store();
    store.create_album("Art", &art_fields(), true).unwrap();
    touch_picture(dir.path(), "a.jpg", "a_thumb.jpg");

    let mut item = AlbumItem::new("Art").with_field("Title", FieldValue::Text("Sunset".into()));
    item.pictures.push(AlbumItemPicture::new("a.jpg", "a_thumb.jpg", "Art"));
    let id = store.add_item(&item, true).unwrap();

    store.delete_item(&store.fetch_item("Art", id).unwrap()).unwrap();
    assert!(!dir.path().join("art").join("a.jpg").exists());
    let links: i64 = store
        .connection()
        .query_row("SELECT COUNT(*) FROM art_pictures", [], |row| row.get(0))
        .unwrap();
    assert_eq!(links, 0);
}

/// Picture storage whose deletes always fail.
struct ReadOnlyPictures {
    root: PathBuf,
}

impl PictureFiles for ReadOnlyPictures {
    fn album_directory(&self, album_name: &str) -> PathBuf {
        self.root.join(naming::table_name(album_name))
    }

    fn delete_file(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }

    fn delete_album_directory(&self, _album_name: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
    }

    fn rename_album_directory(&self, _old: &str, _new: &str) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn failed_file_delete_is_dirty_but_committed() {
    let dir = TempDir::new().unwrap();
    let store = AlbumStore::open_in_memory(ReadOnlyPictures {
        root: dir.path().to_path_buf(),
    })
    .unwrap();
    store.create_album("Art", &art_fields(), true).unwrap();

    let mut item = AlbumItem::new("Art").with_field("Title", FieldValue::Text("Sunset".into()));
    item.pictures.push(AlbumItemPicture::new("a.jpg", "a_thumb.jpg", "Art"));
    let id = store.add_item(&item, true).unwrap();

    let mut item = store.fetch_item("Art", id).unwrap();
    item.pictures.clear();
    let err = store.update_item(&item).unwrap_err();
    assert!(matches!(err, StoreError::PictureFiles { .. }));
    assert!(err.is_dirty());

    // The row update itself was committed
    assert!(store.fetch_item("Art", id).unwrap().pictures.is_empty());

    let err = store.remove_album("Art").unwrap_err();
    assert!(err.is_dirty());
    assert!(store.list_albums().unwrap().is_empty());
}
