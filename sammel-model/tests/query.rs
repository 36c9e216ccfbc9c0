use sammel_model::*;

fn books_fields() -> Vec<MetaItemField> {
    vec![
        MetaItemField::new("Title", FieldType::Text, true),
        MetaItemField::new("Pages", FieldType::Integer, false),
        MetaItemField::new("Published", FieldType::Date, false),
        MetaItemField::new("Read", FieldType::Option, false),
    ]
}

#[test]
fn operators_are_scoped_by_type() {
    assert_eq!(
        QueryOperator::for_field_type(FieldType::Text),
        &[QueryOperator::Equals, QueryOperator::NotEquals, QueryOperator::Like]
    );
    assert_eq!(
        QueryOperator::for_field_type(FieldType::Option),
        &[QueryOperator::Equals]
    );
    assert!(QueryOperator::for_field_type(FieldType::Integer).contains(&QueryOperator::GreaterOrEqual));
    assert!(!QueryOperator::for_field_type(FieldType::Integer).contains(&QueryOperator::Like));
    assert!(QueryOperator::for_field_type(FieldType::Picture).is_empty());
}

#[test]
fn date_operators_use_before_after_labels() {
    assert_eq!(
        QueryOperator::from_label(FieldType::Date, "before or equals"),
        Some(QueryOperator::BeforeOrEqual)
    );
    assert_eq!(QueryOperator::BeforeOrEqual.sql(), "<=");
    assert_eq!(QueryOperator::AfterOrEqual.sql(), ">=");
    assert_eq!(QueryOperator::After.sql(), ">");
    assert_eq!(QueryOperator::from_label(FieldType::Date, "<"), None);
    assert_eq!(
        QueryOperator::from_label(FieldType::Text, "LIKE"),
        Some(QueryOperator::Like)
    );
}

#[test]
fn no_components_selects_all() {
    let q = build_query(&[], true, "Books", &books_fields(), None).unwrap();
    assert_eq!(q, "SELECT * FROM 'books'");
}

#[test]
fn components_joined_with_and() {
    let components = [
        QueryComponent::new("Title", QueryOperator::Like, "Dune"),
        QueryComponent::new("Pages", QueryOperator::Greater, "300"),
    ];
    let q = build_query(&components, true, "Books", &books_fields(), None).unwrap();
    assert_eq!(
        q,
        "SELECT * FROM 'books' WHERE ([Title] like '%Dune%') AND ([Pages] > '300')"
    );
}

#[test]
fn components_joined_with_or_and_sorted() {
    let components = [
        QueryComponent::new("Read", QueryOperator::Equals, "Yes"),
        QueryComponent::new("Published", QueryOperator::Before, "1970-01-01"),
    ];
    let sort = SortOrder {
        field_name: "Title".into(),
        ascending: false,
    };
    let q = build_query(&components, false, "Books", &books_fields(), Some(&sort)).unwrap();
    assert_eq!(
        q,
        "SELECT * FROM 'books' WHERE ([Read] = 'Yes') OR ([Published] < '1970-01-01') ORDER BY [Title] DESC"
    );
}

#[test]
fn single_quotes_are_escaped() {
    let components = [QueryComponent::new("Title", QueryOperator::Equals, "Ender's Game")];
    let q = build_query(&components, true, "Books", &books_fields(), None).unwrap();
    assert_eq!(q, "SELECT * FROM 'books' WHERE ([Title] = 'Ender''s Game')");
}

#[test]
fn unknown_field_rejected() {
    let components = [QueryComponent::new("Author", QueryOperator::Equals, "x")];
    assert_eq!(
        build_query(&components, true, "Books", &books_fields(), None),
        Err(QueryError::UnknownField("Author".into()))
    );
}

#[test]
fn operator_outside_type_rejected() {
    let components = [QueryComponent::new("Pages", QueryOperator::Like, "4")];
    let err = build_query(&components, true, "Books", &books_fields(), None).unwrap_err();
    assert!(matches!(err, QueryError::OperatorNotAllowed { .. }));
}

#[test]
fn numeric_comparison_needs_value() {
    let components = [QueryComponent::new("Pages", QueryOperator::Greater, " ")];
    assert_eq!(
        build_query(&components, true, "Books", &books_fields(), None),
        Err(QueryError::EmptyValue("Pages".into()))
    );
}

#[test]
fn like_wildcards_match_literally() {
    assert_eq!(
        query::predicate("Title", QueryOperator::Like, "50%_off"),
        "([Title] like '%50\\%\\_off%' ESCAPE '\\')"
    );
    assert_eq!(
        query::predicate("Title", QueryOperator::Like, "a\\b"),
        "([Title] like '%a\\b%')"
    );
    assert_eq!(
        query::predicate("Title", QueryOperator::Equals, "50%"),
        "([Title] = '50%')"
    );
}
