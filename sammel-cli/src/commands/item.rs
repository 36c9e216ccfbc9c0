use sammel_db::AlbumStore;
use sammel_model::{AlbumItem, FieldValue, MetaItemField, QueryComponent, QueryOperator, SortOrder};

use crate::CliError;

use super::{StorePaths, find_field, log_item, log_item_table, parse_assignment};

/// Parse `FIELD=VALUE` arguments against the album's fields.
fn parse_values(
    album: &str,
    fields: &[MetaItemField],
    args: &[String],
) -> Result<Vec<(String, FieldValue)>, CliError> {
    args.iter()
        .map(|arg| {
            let (name, input) = parse_assignment(arg)?;
            let field = find_field(album, fields, name)?;
            let value = FieldValue::parse(field.field_type, input)
                .map_err(|e| CliError::input(format!("{}: {e}", field.name)))?;
            Ok((field.name.clone(), value))
        })
        .collect()
}

fn album_fields(store: &AlbumStore, album: &str) -> Result<Vec<MetaItemField>, CliError> {
    store
        .album_fields(album)
        .map_err(CliError::store("Failed to read fields"))
}

pub(crate) fn run_item_add(paths: &StorePaths, album: &str, args: &[String]) -> Result<(), CliError> {
    let store = paths.open()?;
    let entry = store
        .album(album)
        .map_err(CliError::store("Failed to find album"))?;
    let fields = album_fields(&store, album)?;

    let mut item = AlbumItem::new(entry.album_name.clone());
    for (name, value) in parse_values(album, &fields, args)? {
        item.set_field_value(name, value);
    }

    let id = store
        .add_item(&item, true)
        .map_err(CliError::store(format!("Failed to add item to '{}'", entry.album_name)))?;
    log::info!("Added item #{id} to '{}'.", entry.album_name);
    Ok(())
}

pub(crate) fn run_item_update(
    paths: &StorePaths,
    album: &str,
    id: i64,
    args: &[String],
) -> Result<(), CliError> {
    if args.is_empty() {
        return Err(CliError::input("Nothing to change; give FIELD=VALUE pairs"));
    }
    let store = paths.open()?;
    let mut item = store
        .fetch_item(album, id)
        .map_err(CliError::store(format!("Failed to read item #{id}")))?;
    let fields = album_fields(&store, album)?;
    for (name, value) in parse_values(album, &fields, args)? {
        item.set_field_value(name, value);
    }

    store
        .update_item(&item)
        .map_err(CliError::store(format!("Failed to update item #{id}")))?;
    log::info!("Updated item #{id}.");
    Ok(())
}

pub(crate) fn run_item_delete(paths: &StorePaths, album: &str, id: i64) -> Result<(), CliError> {
    let store = paths.open()?;
    let item = store
        .fetch_item(album, id)
        .map_err(CliError::store(format!("Failed to read item #{id}")))?;
    store
        .delete_item(&item)
        .map_err(CliError::store(format!("Failed to delete item #{id}")))?;
    log::info!("Deleted item #{id} from '{}'.", item.album_name);
    Ok(())
}

pub(crate) fn run_item_show(paths: &StorePaths, album: &str, id: i64) -> Result<(), CliError> {
    let store = paths.open()?;
    let item = store
        .fetch_item(album, id)
        .map_err(CliError::store(format!("Failed to read item #{id}")))?;
    log_item(&item);
    if let Some(version) = item.content_version {
        log::debug!("Content version {version}");
    }
    Ok(())
}

/// Parse a `FIELD:OPERATOR:VALUE` condition. The value may contain `:`.
fn parse_condition(arg: &str, fields: &[MetaItemField], album: &str) -> Result<QueryComponent, CliError> {
    let mut parts = arg.splitn(3, ':');
    let (Some(name), Some(label), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CliError::input(format!("'{arg}' is not FIELD:OPERATOR:VALUE")));
    };
    let field = find_field(album, fields, name.trim())?;
    let label = label.trim();
    let operator = QueryOperator::from_label(field.field_type, label).ok_or_else(|| {
        CliError::input(format!(
            "Operator '{label}' does not apply to {} field '{}'; use one of {}",
            field.field_type,
            field.name,
            QueryOperator::for_field_type(field.field_type)
                .iter()
                .map(|op| format!("'{op}'"))
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;
    Ok(QueryComponent::new(field.name.clone(), operator, value))
}

pub(crate) fn run_item_list(
    paths: &StorePaths,
    album: &str,
    conditions: &[String],
    connect_by_and: bool,
    sort: Option<&str>,
    ascending: bool,
) -> Result<(), CliError> {
    let store = paths.open()?;
    let fields = album_fields(&store, album)?;
    let components = conditions
        .iter()
        .map(|c| parse_condition(c, &fields, album))
        .collect::<Result<Vec<_>, _>>()?;
    let sort = sort
        .map(|name| {
            find_field(album, &fields, name).map(|f| SortOrder {
                field_name: f.name.clone(),
                ascending,
            })
        })
        .transpose()?;

    let items = store
        .run_query(&components, connect_by_and, album, sort.as_ref())
        .map_err(CliError::store(format!("Failed to list items of '{album}'")))?;
    log_item_table(&items);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sammel_model::FieldType;

    fn fields() -> Vec<MetaItemField> {
        vec![
            MetaItemField::new("Title", FieldType::Text, true),
            MetaItemField::new("Pages", FieldType::Integer, false),
        ]
    }

    #[test]
    fn condition_keeps_colons_in_value() {
        let c = parse_condition("title:like:Dune: Messiah", &fields(), "Books").unwrap();
        assert_eq!(c, QueryComponent::new("Title", QueryOperator::Like, "Dune: Messiah"));
    }

    #[test]
    fn condition_operator_must_fit_type() {
        let c = parse_condition("Pages:>:400", &fields(), "Books").unwrap();
        assert_eq!(c.operator, QueryOperator::Greater);
        assert!(parse_condition("Pages:like:4", &fields(), "Books").is_err());
        assert!(parse_condition("Pages:>", &fields(), "Books").is_err());
        assert!(parse_condition("Author:=:x", &fields(), "Books").is_err());
    }

    #[test]
    fn values_are_typed_by_field() {
        let args = vec!["Title=Dune".to_string(), "pages=412".to_string()];
        let values = parse_values("Books", &fields(), &args).unwrap();
        assert_eq!(
            values,
            vec![
                ("Title".to_string(), FieldValue::Text("Dune".into())),
                ("Pages".to_string(), FieldValue::Integer(412)),
            ]
        );
        let bad = vec!["Pages=many".to_string()];
        assert!(matches!(
            parse_values("Books", &fields(), &bad),
            Err(CliError::Input(_))
        ));
    }
}
