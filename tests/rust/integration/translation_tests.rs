//! End-to-end translation of query models over a shop schema

#[cfg(test)]
mod translation_tests {
    use relmap::config::TranslationConfig;
    use relmap::expression::{BinaryOperator, ConstantExpr, DataType, Expr, QueryableExpr, SubQueryExpr};
    use relmap::mapping::{MappingError, SchemaMappingResolver};
    use relmap::query_model::{
        Clause, FromClause, GroupClause, QueryModel, QueryModelBuilder, ResultOperator, SelectClause, WhereClause,
    };
    use relmap::sql_statement::{JoinSemantics, TableInfo};
    use relmap::translation::{translate_query_model, TranslationError, TranslationResult};

    const SHOP: &str = r#"
name: shop
entities:
  - type: Customer
    table: Customers
    primary_key: ID
    properties:
      - { name: ID, column: CustomerID, type: Int32 }
      - { name: Name, column: Name, type: String, nullable: true }
      - { name: IsActive, column: IsActive, type: Boolean }
      - { name: RegionID, column: RegionID, type: Int32 }
    references:
      - { name: Region, target: Region, foreign_key: RegionID }
    collections:
      - { name: Orders, target: Order, foreign_key: CustomerID }
    aliases:
      - { name: HomeRegion, alias_of: Region }
      - { name: Loop, alias_of: Loop2 }
      - { name: Loop2, alias_of: Loop }
  - type: Order
    table: Orders
    primary_key: ID
    properties:
      - { name: ID, column: OrderID, type: Int32 }
      - { name: CustomerID, column: CustomerID, type: Int32 }
    references:
      - { name: Customer, target: Customer, foreign_key: CustomerID }
  - type: Region
    table: Regions
    primary_key: ID
    properties:
      - { name: ID, column: RegionID, type: Int32 }
      - { name: Name, column: Name, type: String }
"#;

    fn entity(item_type: &str) -> DataType {
        DataType::Entity(item_type.to_string())
    }

    fn from(name: &str, item_type: &str) -> FromClause {
        FromClause::new(
            name,
            name,
            entity(item_type),
            Expr::Queryable(QueryableExpr {
                item_type: item_type.to_string(),
            }),
        )
    }

    fn model(main: FromClause, body: Vec<Clause>, selector: Expr, operators: Vec<ResultOperator>) -> QueryModel {
        let mut builder = QueryModelBuilder::new();
        builder.add_clause(Clause::MainFrom(main)).unwrap();
        for clause in body {
            builder.add_clause(clause).unwrap();
        }
        let result_type = DataType::sequence(selector.data_type());
        builder
            .add_clause(Clause::Select(SelectClause { selector }))
            .unwrap();
        for operator in operators {
            builder.add_result_operator(operator);
        }
        builder.build(result_type).unwrap()
    }

    fn translate(model: &QueryModel) -> Result<TranslationResult, TranslationError> {
        let resolver = SchemaMappingResolver::from_yaml_str(SHOP).unwrap();
        translate_query_model(model, &resolver, &TranslationConfig::default())
    }

    fn alias_of(info: &TableInfo) -> String {
        info.table_alias().unwrap().to_string()
    }

    #[test]
    fn test_select_entity_with_filter() {
        let c = from("c", "Customer");
        let name = Expr::member(c.reference(), "Name", DataType::nullable(DataType::String));
        let predicate = Expr::equal(name, Expr::constant(ConstantExpr::string("Ada")));
        let model = model(
            c.clone(),
            vec![Clause::Where(WhereClause { predicate })],
            c.reference(),
            vec![],
        );

        let result = translate(&model).unwrap();
        let statement = result.statement;
        let TableInfo::Resolved(info) = &statement.sql_tables[0].table_info else {
            panic!("expected a resolved table: {}", statement);
        };
        assert_eq!(info.table_name, "Customers");

        let Expr::SqlEntity(projection) = &statement.select_projection else {
            panic!("expected an entity projection: {}", statement);
        };
        assert_eq!(projection.table_alias, info.table_alias);
        assert_eq!(
            result.context.get_sql_table_for_entity_expression(projection),
            Ok(statement.sql_tables[0].id)
        );
        assert_eq!(
            statement.where_condition.unwrap().to_string(),
            format!("([{}].[Name] = 'Ada')", info.table_alias)
        );
    }

    #[test]
    fn test_foreign_key_comparison_needs_no_join() {
        let o = from("o", "Order");
        let customer = Expr::member(o.reference(), "Customer", entity("Customer"));
        let customer_id = Expr::member(customer, "ID", DataType::Int32);
        let predicate = Expr::equal(customer_id, Expr::constant(ConstantExpr::int(5)));
        let model = model(o.clone(), vec![Clause::Where(WhereClause { predicate })], o.reference(), vec![]);

        let statement = translate(&model).unwrap().statement;
        let orders = &statement.sql_tables[0];
        assert!(orders.joined_tables.is_empty(), "unexpected join: {}", statement);
        assert_eq!(
            statement.where_condition.unwrap().to_string(),
            format!("([{}].[CustomerID] = 5)", alias_of(&orders.table_info))
        );
    }

    #[test]
    fn test_reference_comparison_uses_foreign_key() {
        let o = from("o", "Order");
        let p = from("p", "Order");
        let predicate = Expr::equal(
            Expr::member(o.reference(), "Customer", entity("Customer")),
            Expr::member(p.reference(), "Customer", entity("Customer")),
        );
        let model = model(
            o.clone(),
            vec![Clause::AdditionalFrom(p), Clause::Where(WhereClause { predicate })],
            o.reference(),
            vec![],
        );

        let statement = translate(&model).unwrap().statement;
        assert!(statement.sql_tables.iter().all(|t| t.joined_tables.is_empty()));
        let Some(Expr::Binary(comparison)) = &statement.where_condition else {
            panic!("expected a comparison: {}", statement);
        };
        assert!(matches!(comparison.left.as_ref(), Expr::SqlColumn(c) if c.column_name == "CustomerID"));
        assert!(matches!(comparison.right.as_ref(), Expr::SqlColumn(c) if c.column_name == "CustomerID"));
    }

    #[test]
    fn test_navigation_adds_left_join() {
        let o = from("o", "Order");
        let customer = Expr::member(o.reference(), "Customer", entity("Customer"));
        let name = Expr::member(customer, "Name", DataType::nullable(DataType::String));
        let model = model(o, vec![], name, vec![]);

        let statement = translate(&model).unwrap().statement;
        let joins = &statement.sql_tables[0].joined_tables;
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].member_name, "Customer");
        assert_eq!(joins[0].table.join_semantics, JoinSemantics::Left);
        let TableInfo::Join(relmap::sql_statement::JoinInfo::Resolved(join)) = &joins[0].table.table_info else {
            panic!("expected a resolved join: {}", statement);
        };
        assert_eq!(join.foreign_table_info.table_name, "Customers");
        assert_eq!(join.left_key.column_name, "CustomerID");
        assert!(join.right_key.is_primary_key);
        assert!(matches!(
            &statement.select_projection,
            Expr::SqlColumn(c) if c.table_alias == join.foreign_table_info.table_alias && c.column_name == "Name"
        ));
    }

    #[test]
    fn test_alias_navigation_resolves_through_fixed_point() {
        let c = from("c", "Customer");
        let region = Expr::member(c.reference(), "HomeRegion", entity("Region"));
        let name = Expr::member(region, "Name", DataType::String);
        let model = model(c, vec![], name, vec![]);

        let statement = translate(&model).unwrap().statement;
        let joins = &statement.sql_tables[0].joined_tables;
        assert_eq!(joins.len(), 1);
        let TableInfo::Join(relmap::sql_statement::JoinInfo::Resolved(join)) = &joins[0].table.table_info else {
            panic!("expected a resolved join: {}", statement);
        };
        assert_eq!(join.foreign_table_info.table_name, "Regions");
        assert_eq!(join.left_key.column_name, "RegionID");
    }

    #[test]
    fn test_cyclic_alias_hits_the_step_limit() {
        let c = from("c", "Customer");
        let looped = Expr::member(c.reference(), "Loop", entity("Customer"));
        let name = Expr::member(looped, "Name", DataType::nullable(DataType::String));
        let model = model(c, vec![], name, vec![]);

        let resolver = SchemaMappingResolver::from_yaml_str(SHOP).unwrap();
        let config = TranslationConfig::default().with_max_join_resolution_steps(4).unwrap();
        let result = translate_query_model(&model, &resolver, &config);
        assert!(matches!(
            result,
            Err(TranslationError::Mapping(MappingError::JoinResolutionLimitExceeded { limit: 4, .. }))
        ));
    }

    #[test]
    fn test_collection_from_clause_joins_on_keys() {
        let c = from("c", "Customer");
        let orders = Expr::member(c.reference(), "Orders", DataType::sequence(entity("Order")));
        let o = FromClause::new("o", "o", entity("Order"), orders);
        let model = model(c, vec![Clause::AdditionalFrom(o.clone())], o.reference(), vec![]);

        let statement = translate(&model).unwrap().statement;
        assert_eq!(statement.sql_tables.len(), 2);
        let customers_alias = alias_of(&statement.sql_tables[0].table_info);
        let TableInfo::Resolved(orders_info) = &statement.sql_tables[1].table_info else {
            panic!("expected resolved orders table: {}", statement);
        };
        assert_eq!(orders_info.table_name, "Orders");
        assert_eq!(
            statement.where_condition.unwrap().to_string(),
            format!(
                "([{}].[CustomerID] = [{}].[CustomerID])",
                customers_alias, orders_info.table_alias
            )
        );
    }

    #[test]
    fn test_boolean_member_in_projection_and_filter() {
        let c = from("c", "Customer");
        let is_active = Expr::member(c.reference(), "IsActive", DataType::Boolean);
        let model = model(
            c,
            vec![Clause::Where(WhereClause {
                predicate: is_active.clone(),
            })],
            is_active,
            vec![],
        );

        let statement = translate(&model).unwrap().statement;
        let converted = statement
            .select_projection
            .as_converted_boolean()
            .expect("boolean projection is marked");
        assert_eq!(converted.expression.data_type(), DataType::Int32);
        let Some(Expr::Binary(filter)) = &statement.where_condition else {
            panic!("expected a comparison: {}", statement);
        };
        assert_eq!(filter.operator, BinaryOperator::Equal);
        assert_eq!(filter.right.to_string(), "1");
    }

    #[test]
    fn test_count_counts_primary_keys() {
        let c = from("c", "Customer");
        let model = model(c.clone(), vec![], c.reference(), vec![ResultOperator::Count]);

        let statement = translate(&model).unwrap().statement;
        assert_eq!(statement.data_type, DataType::Int32);
        let alias = alias_of(&statement.sql_tables[0].table_info);
        assert_eq!(
            statement.select_projection.to_string(),
            format!("COUNT([{}].[CustomerID])", alias)
        );
    }

    #[test]
    fn test_any_becomes_marked_exists() {
        let c = from("c", "Customer");
        let model = model(c.clone(), vec![], c.reference(), vec![ResultOperator::Any]);

        let statement = translate(&model).unwrap().statement;
        assert_eq!(statement.data_type, DataType::Boolean);
        let converted = statement
            .select_projection
            .as_converted_boolean()
            .expect("EXISTS in a value position is marked");
        let Expr::SqlCase(case) = converted.expression.as_ref() else {
            panic!("expected CASE WHEN EXISTS: {}", statement.select_projection);
        };
        assert!(matches!(case.cases[0].when, Expr::SqlExists(_)));
    }

    #[test]
    fn test_unknown_member_is_a_mapping_error() {
        let c = from("c", "Customer");
        let missing = Expr::member(c.reference(), "Missing", DataType::Int32);
        let model = model(c, vec![], missing, vec![]);

        assert!(matches!(
            translate(&model),
            Err(TranslationError::Mapping(MappingError::UnknownMember { .. }))
        ));
    }

    fn customers_by_name() -> (DataType, QueryModel) {
        let c = from("c", "Customer");
        let name = Expr::member(c.reference(), "Name", DataType::nullable(DataType::String));
        let grouping_type = DataType::Grouping {
            key: Box::new(DataType::nullable(DataType::String)),
            element: Box::new(entity("Customer")),
        };
        let mut builder = QueryModelBuilder::new();
        builder.add_clause(Clause::MainFrom(c.clone())).unwrap();
        builder
            .add_clause(Clause::Group(GroupClause {
                key_selector: name,
                element_selector: c.reference(),
            }))
            .unwrap();
        let model = builder.build(DataType::sequence(grouping_type.clone())).unwrap();
        (grouping_type, model)
    }

    fn from_groups(grouping_type: DataType, groups: QueryModel) -> FromClause {
        FromClause::new(
            "g",
            "g",
            grouping_type,
            Expr::SubQuery(SubQueryExpr {
                query_model: Box::new(groups),
            }),
        )
    }

    #[test]
    fn test_group_by_projects_grouping() {
        let (grouping_type, model) = customers_by_name();

        let statement = translate(&model).unwrap().statement;
        assert_eq!(statement.data_type, DataType::sequence(grouping_type));
        let alias = alias_of(&statement.sql_tables[0].table_info);
        let name_column = format!("[{}].[Name]", alias);
        assert_eq!(statement.group_by_expression.as_ref().unwrap().to_string(), name_column);

        let Expr::SqlGroupingSelect(grouping) = &statement.select_projection else {
            panic!("expected a grouping projection: {}", statement);
        };
        assert_eq!(grouping.key_expression.to_string(), name_column);
        assert!(matches!(grouping.element_expression.as_ref(), Expr::SqlEntity(e) if e.table_alias == alias));
    }

    #[test]
    fn test_grouping_reference_maps_to_source_table() {
        let (grouping_type, groups) = customers_by_name();
        let g = from_groups(grouping_type, groups);
        let model = model(g.clone(), vec![], g.reference(), vec![]);

        let result = translate(&model).unwrap();
        let statement = &result.statement;
        assert!(matches!(statement.sql_tables[0].table_info, TableInfo::SubStatement(_)));
        let Expr::SqlGroupingSelect(grouping) = &statement.select_projection else {
            panic!("expected a grouping projection: {}", statement);
        };
        let source_alias = alias_of(&statement.sql_tables[0].table_info);
        assert_eq!(grouping.key_expression.to_string(), format!("[{}].[key]", source_alias));
        assert_eq!(
            result.context.get_referenced_group_source(grouping),
            Ok(statement.sql_tables[0].id)
        );
    }

    #[test]
    fn test_from_grouping_joins_elements_on_null_safe_key() {
        let (grouping_type, groups) = customers_by_name();
        let g = from_groups(grouping_type, groups);
        let x = FromClause::new("x", "x", entity("Customer"), g.reference());
        let model = model(g, vec![Clause::AdditionalFrom(x.clone())], x.reference(), vec![]);

        let statement = translate(&model).unwrap().statement;
        assert_eq!(statement.sql_tables.len(), 2);
        let TableInfo::SubStatement(source) = &statement.sql_tables[0].table_info else {
            panic!("expected the grouped sub-statement: {}", statement);
        };
        let elements_table = &statement.sql_tables[1];
        assert_eq!(elements_table.join_semantics, JoinSemantics::CrossApply);
        let TableInfo::JoinedGrouping(elements) = &elements_table.table_info else {
            panic!("expected a joined grouping: {}", statement);
        };
        assert_eq!(elements.grouping_source_table_alias, source.table_alias);
        assert!(elements.statement.group_by_expression.is_none());

        let customers_alias = alias_of(&elements.statement.sql_tables[0].table_info);
        let inner_key = format!("[{}].[Name]", customers_alias);
        let outer_key = format!("[{}].[key]", source.table_alias);
        assert_eq!(
            elements.statement.where_condition.as_ref().unwrap().to_string(),
            format!(
                "(({0} IS NULL AND {1} IS NULL) OR (({0} IS NOT NULL AND {1} IS NOT NULL) AND ({0} = {1})))",
                inner_key, outer_key
            )
        );
        assert!(matches!(
            &statement.select_projection,
            Expr::SqlEntity(e) if e.table_alias == elements.table_alias
        ));
    }

    #[test]
    fn test_skip_then_take_pages_over_row_number() {
        let c = from("c", "Customer");
        let model = model(
            c.clone(),
            vec![],
            c.reference(),
            vec![
                ResultOperator::Skip {
                    count: Expr::constant(ConstantExpr::int(10)),
                },
                ResultOperator::Take {
                    count: Expr::constant(ConstantExpr::int(5)),
                },
            ],
        );

        let statement = translate(&model).unwrap().statement;
        assert!(statement.top_expression.is_none());
        let TableInfo::SubStatement(paged) = &statement.sql_tables[0].table_info else {
            panic!("expected a paged sub-statement: {}", statement);
        };
        assert!(paged.statement.select_projection.any(&|e| matches!(e, Expr::SqlRowNumber(_))));
        assert!(matches!(
            &paged.statement.sql_tables[0].table_info,
            TableInfo::Resolved(info) if info.table_name == "Customers"
        ));

        let row_number = format!("[{}].[Value]", paged.table_alias);
        assert_eq!(
            statement.row_number_selector.as_ref().unwrap().to_string(),
            row_number
        );
        assert_eq!(
            statement.where_condition.as_ref().unwrap().to_string(),
            format!("(({0} > 10) AND ({0} <= (10 + 5)))", row_number)
        );
        assert_eq!(statement.orderings.len(), 1);
        assert!(matches!(
            &statement.select_projection,
            Expr::SqlEntity(e) if e.table_alias == paged.table_alias && e.primary_key_column.column_name == "Key_CustomerID"
        ));
    }
}
