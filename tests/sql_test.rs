use handson_etl::core::samples;
use handson_etl::frame::functions::col;
use handson_etl::frame::Session;
use handson_etl::EtlError;
use pretty_assertions::assert_eq;
use serde_json::json;

fn session() -> Session {
    let spark = Session::new("sql-test");
    samples::employees()
        .unwrap()
        .create_or_replace_temp_view(&spark, "employee_tbl")
        .unwrap();
    samples::departments()
        .unwrap()
        .create_or_replace_temp_view(&spark, "department_tbl")
        .unwrap();
    spark
}

#[test]
fn test_where_on_temp_view_matches_filter() {
    let spark = session();
    let df = spark
        .sql("select * from employee_tbl where salary > 70000")
        .unwrap();

    assert_eq!(df.count(), 3);
    assert_eq!(
        df.column_values("name").unwrap(),
        vec![json!("Neha"), json!("Sara"), json!("Tom")]
    );
    let api = samples::employees()
        .unwrap()
        .filter(col("salary").gt(70000))
        .unwrap();
    assert_eq!(df, api);
}

#[test]
fn test_projection_with_expressions() {
    let df = session()
        .sql("select id + 5 as id_plus_5, concat(name, address) name_address from employee_tbl where address = 'INDIA'")
        .unwrap();

    assert_eq!(df.columns(), vec!["id_plus_5", "name_address"]);
    assert_eq!(
        df.rows(),
        &[
            vec![json!(6), json!("AmitINDIA")],
            vec![json!(8), json!("RajINDIA")],
        ]
    );
}

#[test]
fn test_group_by_order_by_limit() {
    let df = session()
        .sql(
            "select department, count(*) as n, sum(salary) as total from department_tbl \
             group by department order by total desc limit 2",
        )
        .unwrap();

    assert_eq!(df.columns(), vec!["department", "n", "total"]);
    assert_eq!(
        df.rows(),
        &[
            vec![json!("IT"), json!(4), json!(295000)],
            vec![json!("marketing"), json!(4), json!(220000)],
        ]
    );
}

#[test]
fn test_distinct_and_unselected_order_column() {
    let spark = session();
    let addresses = spark
        .sql("select distinct address from employee_tbl order by address")
        .unwrap();
    assert_eq!(
        addresses.column_values("address").unwrap(),
        vec![json!("INDIA"), json!("JAPAN"), json!("USA")]
    );

    let by_age = spark
        .sql("select name from employee_tbl order by age desc")
        .unwrap();
    assert_eq!(
        by_age.column_values("name").unwrap()[0],
        json!("Tom")
    );
}

#[test]
fn test_views_can_be_replaced_and_dropped() {
    let spark = session();
    samples::more_managers()
        .unwrap()
        .create_or_replace_temp_view(&spark, "employee_tbl")
        .unwrap();
    assert_eq!(spark.sql("select * from employee_tbl").unwrap().count(), 2);

    assert!(spark.drop_view("employee_tbl").unwrap());
    assert!(matches!(
        spark.sql("select * from employee_tbl"),
        Err(EtlError::SchemaError { .. })
    ));
}

#[test]
fn test_bad_sql_is_a_parse_error() {
    assert!(matches!(
        session().sql("select from employee_tbl"),
        Err(EtlError::ParseError { .. })
    ));
}
