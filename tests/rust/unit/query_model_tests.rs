#[cfg(test)]
mod query_model_tests {
    use relmap::expression::{DataType, Expr, QueryableExpr};
    use relmap::query_model::{
        Clause, FromClause, QueryModelBuilder, QueryModelError, QuerySourceMapping, ResultOperator,
        SelectClause, WhereClause,
    };

    fn customers() -> FromClause {
        FromClause::new(
            "c",
            "c",
            DataType::Entity("Customer".to_string()),
            Expr::Queryable(QueryableExpr {
                item_type: "Customer".to_string(),
            }),
        )
    }

    #[test]
    fn test_clauses_deserialize_from_json() {
        let json = r#"[
            {
                "kind": "MainFrom",
                "id": "c",
                "item_name": "c",
                "item_type": { "Entity": "Customer" },
                "from_expression": { "Queryable": { "item_type": "Customer" } }
            },
            {
                "kind": "Select",
                "selector": {
                    "QuerySourceReference": { "clause": "c", "data_type": { "Entity": "Customer" } }
                }
            }
        ]"#;
        let clauses: Vec<Clause> = serde_json::from_str(json).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0], Clause::MainFrom(customers()));

        let mut builder = QueryModelBuilder::new();
        for clause in clauses {
            builder.add_clause(clause).unwrap();
        }
        let model = builder
            .build(DataType::sequence(DataType::Entity("Customer".to_string())))
            .unwrap();
        assert_eq!(model.to_string(), "from c in Queryable<Customer> select [c]");
    }

    #[test]
    fn test_result_operators_deserialize_from_json() {
        let operators: Vec<ResultOperator> =
            serde_json::from_str(r#"[{ "kind": "Count" }, { "kind": "First", "return_default_when_empty": true }]"#)
                .unwrap();
        assert_eq!(
            operators,
            vec![
                ResultOperator::Count,
                ResultOperator::First {
                    return_default_when_empty: true
                }
            ]
        );
    }

    #[test]
    fn test_builder_arity_rules() {
        let mut builder = QueryModelBuilder::new();
        builder.add_clause(Clause::MainFrom(customers())).unwrap();
        assert!(matches!(
            builder.add_clause(Clause::MainFrom(customers())),
            Err(QueryModelError::DuplicateMainFromClause { .. })
        ));
        assert_eq!(
            builder.clone().build(DataType::Int32),
            Err(QueryModelError::MissingTerminalClause)
        );

        builder
            .add_clause(Clause::Select(SelectClause {
                selector: customers().reference(),
            }))
            .unwrap();
        assert_eq!(
            builder.add_clause(Clause::Select(SelectClause {
                selector: customers().reference(),
            })),
            Err(QueryModelError::DuplicateTerminalClause)
        );

        let mut empty = QueryModelBuilder::new();
        empty
            .add_clause(Clause::Where(WhereClause {
                predicate: Expr::bool_constant(true),
            }))
            .unwrap();
        assert_eq!(empty.build(DataType::Int32), Err(QueryModelError::MissingMainFromClause));
    }

    #[test]
    fn test_clone_fresh_rewires_references() {
        let from = customers();
        let mut builder = QueryModelBuilder::new();
        builder.add_clause(Clause::MainFrom(from.clone())).unwrap();
        builder
            .add_clause(Clause::Select(SelectClause {
                selector: from.reference(),
            }))
            .unwrap();
        let model = builder
            .build(DataType::sequence(DataType::Entity("Customer".to_string())))
            .unwrap();

        let mut mapping = QuerySourceMapping::new();
        let cloned = model.clone_with_mapping(&mut mapping);
        assert_ne!(cloned.main_from_clause.id, model.main_from_clause.id);
        assert!(mapping.contains_mapping(&model.main_from_clause.id));

        let relmap::query_model::TerminalClause::Select(select) = &cloned.terminal_clause else {
            panic!("expected select clause");
        };
        assert_eq!(select.selector, cloned.main_from_clause.reference());
        assert!(cloned.body_clauses.is_empty());
    }
}
