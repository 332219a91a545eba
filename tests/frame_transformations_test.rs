use handson_etl::core::samples;
use handson_etl::domain::model::{DataType, Value};
use handson_etl::frame::functions::{
    avg, col, count, count_distinct, dense_rank, expr, lit, max, min, ntile, null, rank,
    row_number, when,
};
use handson_etl::frame::window::Window;
use handson_etl::frame::{DataFrame, JoinType};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;

fn by_id(df: &DataFrame, column: &str) -> HashMap<i64, Value> {
    let ids = df.column_values("id").unwrap();
    let values = df.column_values(column).unwrap();
    ids.into_iter()
        .zip(values)
        .map(|(id, v)| (id.as_i64().unwrap(), v))
        .collect()
}

#[test]
fn test_select_with_expressions() {
    let employees = samples::employees().unwrap();
    let df = employees
        .select(vec![
            expr("id+5").unwrap().alias("id_plus_5"),
            expr("salary*2").unwrap().alias("salary_times_2"),
            expr("concat(name, address)").unwrap().alias("name_address"),
        ])
        .unwrap();

    assert_eq!(df.columns(), vec!["id_plus_5", "salary_times_2", "name_address"]);
    assert_eq!(df.rows()[0], vec![json!(6), json!(140000), json!("AmitINDIA")]);
}

#[test]
fn test_filter_and_where_agree() {
    let employees = samples::employees().unwrap();
    let filtered = employees
        .filter(col("address").eq("JAPAN").and(col("salary").gt(70000)))
        .unwrap();
    let where_df = employees
        .where_expr("address = 'JAPAN' and salary > 70000")
        .unwrap();

    assert_eq!(filtered.count(), 2);
    assert_eq!(filtered, where_df);
    assert_eq!(
        filtered.column_values("name").unwrap(),
        vec![json!("Neha"), json!("Sara")]
    );
}

#[test]
fn test_literal_rename_cast_drop() {
    let employees = samples::employees().unwrap();

    let with_lit = employees.with_column("last_name", lit("Gupta")).unwrap();
    assert_eq!(with_lit.columns().last().unwrap(), "last_name");

    let renamed = with_lit
        .with_column_renamed("id", "emp_id")
        .with_column_renamed("missing", "ignored");
    assert_eq!(renamed.columns()[0], "emp_id");
    assert!(!renamed.columns().contains(&"ignored".to_string()));

    let cast = employees
        .with_column("id", col("id").cast(DataType::String))
        .unwrap()
        .with_column("salary", col("salary").cast(DataType::Long))
        .unwrap();
    assert_eq!(cast.schema().fields[0].data_type, DataType::String);
    assert_eq!(cast.rows()[0][0], json!("1"));
    assert_eq!(cast.schema().fields[2].data_type, DataType::Long);

    let dropped = with_lit.drop(&["last_name", "age", "address", "gender", "name", "id"]);
    assert_eq!(dropped.columns(), vec!["salary", "city"]);
}

#[test]
fn test_union_keeps_duplicates() {
    let first = samples::managers().unwrap();
    let second = samples::more_managers().unwrap();

    assert_eq!(first.union(&second).unwrap().count(), 12);
    assert_eq!(first.union_all(&second).unwrap().count(), 12);
    assert_eq!(first.union_by_name(&second).unwrap().count(), 12);
}

#[test]
fn test_case_when_with_null_branch() {
    let staff = samples::staff_with_nulls().unwrap();
    let df = staff
        .with_column(
            "is_adult",
            when(col("age").is_null(), null())
                .when(col("age").gt(18), lit("Yes"))
                .otherwise(lit("No")),
        )
        .unwrap();

    let adult = df.column_values("is_adult").unwrap();
    assert_eq!(adult[0], json!("Yes"));
    assert_eq!(adult[1], Value::Null);
    assert_eq!(adult[2], json!("No"));
    assert_eq!(adult[8], Value::Null);
}

#[test]
fn test_distinct_and_sort() {
    let managers = samples::managers_with_duplicates().unwrap();
    assert_eq!(managers.count(), 13);

    let unique = managers.distinct();
    assert_eq!(unique.count(), 10);
    assert_eq!(
        managers
            .drop_duplicates(&["id", "name", "sal", "mngr_id"])
            .unwrap()
            .count(),
        10
    );
    assert_eq!(
        managers
            .select_columns(&["id", "name"])
            .unwrap()
            .distinct()
            .count(),
        9
    );

    let sorted = unique
        .sort(vec![col("sal").desc(), col("name").asc()])
        .unwrap();
    let names: Vec<Value> = sorted.column_values("name").unwrap();
    assert_eq!(&names[..3], &[json!("Priya"), json!("Rajesh"), json!("Priya")]);
    assert_eq!(names.last().unwrap(), &json!("Nisha"));
}

#[test]
fn test_aggregates_skip_nulls() {
    let staff = samples::staff_with_nulls().unwrap();

    let all = staff.select(vec![count(col("*"))]).unwrap();
    assert_eq!(all.rows()[0][0], json!(10));

    let names = staff.select(vec![count(col("name"))]).unwrap();
    assert_eq!(names.columns(), vec!["count(name)"]);
    assert_eq!(names.rows()[0][0], json!(8));

    let addresses = staff
        .select(vec![count_distinct(col("address")).alias("distinct_address_count")])
        .unwrap();
    assert_eq!(addresses.rows()[0][0], json!(4));

    let stats = staff
        .select(vec![
            min(col("salary")).alias("min_salary"),
            max(col("salary")).alias("max_salary"),
            avg(col("salary")).alias("avg_salary"),
        ])
        .unwrap();
    assert_eq!(
        stats.rows()[0],
        vec![json!(20000), json!(200000), json!(70000.0)]
    );
}

#[test]
fn test_group_by_department() {
    let departments = samples::departments().unwrap();
    let df = departments
        .group_by(&["department"])
        .agg(vec![
            count(col("*")).alias("count"),
            avg(col("salary")).alias("avg_salary"),
            min(col("salary")).alias("min_salary"),
            max(col("salary")).alias("max_salary"),
        ])
        .unwrap();

    assert_eq!(df.count(), 3);
    assert_eq!(
        df.rows()[0],
        vec![
            json!("IT"),
            json!(4),
            json!(73750.0),
            json!(50000),
            json!(100000)
        ]
    );
}

#[test]
fn test_join_row_counts() {
    let customers = samples::customers().unwrap();
    let sales = samples::sales().unwrap();
    let join = |how| {
        customers
            .join(&sales, "customer_id", "customer_id", how)
            .unwrap()
    };

    assert_eq!(join(JoinType::Inner).count(), 9);
    assert_eq!(join(JoinType::Left).count(), 14);
    assert_eq!(join(JoinType::Right).count(), 10);
    assert_eq!(join(JoinType::Full).count(), 15);
    assert_eq!(join(JoinType::LeftSemi).count(), 5);
    assert_eq!(join(JoinType::LeftAnti).count(), 5);
    assert_eq!(customers.cross_join(&sales).unwrap().count(), 100);
}

#[test]
fn test_left_join_product_ids_sort_nulls_first() {
    let customers = samples::customers().unwrap();
    let sales = samples::sales().unwrap();
    let product_ids = customers
        .join(&sales, "customer_id", "customer_id", JoinType::Left)
        .unwrap()
        .select(vec![col("product_id")])
        .unwrap()
        .sort(vec![col("product_id").asc()])
        .unwrap()
        .column_values("product_id")
        .unwrap();

    assert!(product_ids[..5].iter().all(Value::is_null));
    assert_eq!(product_ids[5], json!(1));
    assert_eq!(product_ids.last().unwrap(), &json!(56));
}

#[test]
fn test_window_ranking_by_department() {
    let staff = samples::staff_by_gender().unwrap();
    let spec = Window::partition_by(&["department"]).order_by(vec![col("salary").desc()]);
    let df = staff
        .with_column("row_number", row_number().over(spec.clone()))
        .unwrap()
        .with_column("rank", rank().over(spec.clone()))
        .unwrap()
        .with_column("dense_rank", dense_rank().over(spec.clone()))
        .unwrap()
        .with_column("ntile", ntile(3).over(spec))
        .unwrap();

    // 視窗函數不改變列的順序
    assert_eq!(df.column_values("id").unwrap()[0], json!(1));

    let row_number = by_id(&df, "row_number");
    let rank = by_id(&df, "rank");
    let dense = by_id(&df, "dense_rank");
    let ntile = by_id(&df, "ntile");

    // IT: rashi, mukesh, aditya, then manish and rakhi tied at 50000
    assert_eq!(rank[&1], json!(4));
    assert_eq!(rank[&11], json!(4));
    assert_eq!(row_number[&1], json!(4));
    assert_eq!(row_number[&11], json!(5));

    // sales: priti and akhilesh tied at 90000, then vikash
    assert_eq!(rank[&2], json!(3));
    assert_eq!(dense[&2], json!(2));
    assert_eq!(dense[&12], json!(1));

    // marketing: raushan, ragini, rahul, nikita
    assert_eq!(
        [ntile[&3].clone(), ntile[&7].clone(), ntile[&10].clone(), ntile[&6].clone()],
        [json!(1), json!(1), json!(2), json!(3)]
    );
}

#[test]
fn test_nested_json_flattening() {
    let nested = samples::nested_restaurants().unwrap();
    let flattened = nested
        .explode("restaurants", "new_restaurant")
        .unwrap()
        .drop(&["restaurants"])
        .select(vec![col("new_restaurant.restaurant.R.res_id")])
        .unwrap();

    assert_eq!(flattened.columns(), vec!["res_id"]);
    assert_eq!(
        flattened.column_values("res_id").unwrap(),
        vec![json!("1001"), json!("1002")]
    );
}

#[test]
fn test_window_column_helper_matches_with_column() {
    let sales = samples::monthly_product_sales().unwrap();
    let spec = Window::partition_by(&["product_id"]).order_by(vec![col("sales_date").asc()]);

    let helper = sales
        .with_window_column("rn", row_number(), spec.clone())
        .unwrap();
    let direct = sales.with_column("rn", row_number().over(spec)).unwrap();
    assert_eq!(helper, direct);
    assert_eq!(helper.columns().last().unwrap(), "rn");
}
