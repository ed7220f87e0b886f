#[cfg(test)]
mod schema_file_tests {
    use std::io::Write;

    use relmap::config::TranslationConfig;
    use relmap::expression::{DataType, Expr, QueryableExpr};
    use relmap::mapping::schema::config::SchemaError;
    use relmap::mapping::{MappingError, SchemaMappingResolver};
    use relmap::query_model::{Clause, FromClause, QueryModelBuilder, SelectClause};
    use relmap::translation::{translate_query_model, TranslationError};
    use tempfile::NamedTempFile;

    fn write_schema(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_translate_with_schema_from_file() -> anyhow::Result<()> {
        let file = write_schema(
            r#"
entities:
  - type: Product
    table: Products
    primary_key: ID
    properties:
      - { name: ID, column: ProductID, type: Int32 }
      - { name: Title, column: Title, type: String }
"#,
        );
        let resolver = SchemaMappingResolver::from_yaml_file(file.path())?;

        let p = FromClause::new(
            "p",
            "p",
            DataType::Entity("Product".to_string()),
            Expr::Queryable(QueryableExpr {
                item_type: "Product".to_string(),
            }),
        );
        let title = Expr::member(p.reference(), "Title", DataType::String);
        let mut builder = QueryModelBuilder::new();
        builder.add_clause(Clause::MainFrom(p))?;
        builder.add_clause(Clause::Select(SelectClause { selector: title }))?;
        let model = builder.build(DataType::sequence(DataType::String))?;

        let result = translate_query_model(&model, &resolver, &TranslationConfig::default())?;
        let alias = result.statement.sql_tables[0].table_info.table_alias().unwrap().to_string();
        assert_eq!(
            result.statement.to_string(),
            format!("SELECT [{0}].[Title] FROM [Products] [{0}]", alias)
        );
        Ok(())
    }

    #[test]
    fn test_unmapped_entity_in_query() {
        let file = write_schema(
            r#"
entities:
  - type: Product
    table: Products
    primary_key: ID
    properties:
      - { name: ID, column: ProductID, type: Int32 }
"#,
        );
        let resolver = SchemaMappingResolver::from_yaml_file(file.path()).unwrap();
        let s = FromClause::new(
            "s",
            "s",
            DataType::Entity("Supplier".to_string()),
            Expr::Queryable(QueryableExpr {
                item_type: "Supplier".to_string(),
            }),
        );
        let mut builder = QueryModelBuilder::new();
        builder.add_clause(Clause::MainFrom(s.clone())).unwrap();
        builder
            .add_clause(Clause::Select(SelectClause { selector: s.reference() }))
            .unwrap();
        let model = builder
            .build(DataType::sequence(DataType::Entity("Supplier".to_string())))
            .unwrap();

        let result = translate_query_model(&model, &resolver, &TranslationConfig::default());
        assert!(matches!(
            result,
            Err(TranslationError::Mapping(MappingError::UnknownTable(name))) if name == "Supplier"
        ));
    }

    #[test]
    fn test_invalid_schema_file_is_rejected() {
        let file = write_schema(
            r#"
entities:
  - type: Product
    table: Products
    primary_key: Missing
    properties:
      - { name: ID, column: ProductID, type: Int32 }
"#,
        );
        assert!(matches!(
            SchemaMappingResolver::from_yaml_file(file.path()),
            Err(SchemaError::MissingPrimaryKey { .. })
        ));
    }
}
