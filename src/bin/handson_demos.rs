//! Step-by-step DataFrame walk-through over the built-in sample datasets.

use anyhow::{Context, Result};
use handson_etl::core::samples;
use handson_etl::domain::model::DataType;
use handson_etl::frame::functions::{
    avg, col, count, count_distinct, dense_rank, expr, lit, max, min, ntile, null, rank,
    row_number, when,
};
use handson_etl::frame::window::Window;
use handson_etl::frame::{DataFrame, JoinType, Session};
use handson_etl::utils::logger;

const ROW_COUNT_MSG: &str = "Total number of rows in the DataFrame:";

fn show(title: &str, df: &DataFrame) {
    println!("== {} ==", title);
    df.show(20, 0);
}

fn select_and_sql(session: &Session) -> Result<()> {
    let example = samples::id_numbers()?;
    println!("{} {}", ROW_COUNT_MSG, example.count());
    example.print_schema();

    let employees = samples::employees()?;
    let df1 = employees.select(vec![
        col("id"),
        col("salary"),
        (col("id") + 5).alias("id_plus_5"),
        col("gender"),
        col("address"),
    ])?;
    let df2 = employees.select(vec![
        expr("id+5")?.alias("id_plus_5"),
        expr("salary*2")?.alias("salary_times_2"),
        expr("concat(name, address)")?.alias("name_address"),
    ])?;
    show("select with column expressions", &df1);
    show("select with SQL expressions", &df2);

    employees.create_or_replace_temp_view(session, "employee_tbl")?;
    let high_paid = session.sql("select * from employee_tbl where salary > 70000")?;
    show("spark.sql on a temp view", &high_paid);
    Ok(())
}

fn filter_alias_literal_cast(employees: &DataFrame) -> Result<()> {
    let japan = employees.filter(col("address").eq("JAPAN"))?;
    let japan_high = employees
        .filter(col("address").eq("JAPAN").and(col("salary").gt(70000)))?
        .select(vec![col("id"), col("salary"), (col("id") + 5).alias("id_plus_5")])?;
    let japan_where = employees
        .select(vec![
            col("id"),
            col("salary"),
            (col("id") + 5).alias("id_plus_5"),
            col("address"),
        ])?
        .where_expr("address = 'JAPAN' and salary > 70000")?;
    let with_lit = employees.select(vec![col("*"), lit("Gupta").alias("last_name")])?;
    let with_column = employees.with_column("last_name", lit("Gupta"))?;
    let renamed = with_column
        .with_column_renamed("id", "emp_id")
        .with_column_renamed("salary", "emp_salary")
        .with_column_renamed("address", "emp_address")
        .with_column_renamed("gender", "emp_gender")
        .with_column_renamed("name", "emp_name")
        .with_column_renamed("last_name", "emp_last_name")
        .with_column_renamed("age", "emp_age");
    let cast = employees
        .with_column("id", col("id").cast(DataType::String))?
        .with_column("salary", col("salary").cast(DataType::parse("long")?))?;
    let dropped = employees.drop(&["last_name", "age", "address", "gender", "name", "id"]);

    show("filter address = JAPAN", &japan);
    show("filter with two conditions", &japan_high);
    show("where with a SQL condition", &japan_where);
    show("select * with a literal", &with_lit);
    show("withColumn literal", &with_column);
    show("withColumnRenamed", &renamed);
    cast.print_schema();
    show("drop", &dropped);
    Ok(())
}

fn unions() -> Result<()> {
    let first = samples::managers()?;
    let second = samples::more_managers()?;
    let union = first.union(&second)?;
    let union_all = first.union_all(&second)?;
    let by_name = first.union_by_name(&second)?;
    for (title, df) in [
        ("union", &union),
        ("unionAll", &union_all),
        ("unionByName", &by_name),
    ] {
        show(title, df);
        println!("{} {}", ROW_COUNT_MSG, df.count());
    }
    Ok(())
}

fn case_when() -> Result<()> {
    let staff = samples::staff_with_nulls()?;
    let adult = staff.with_column(
        "is_adult",
        when(col("age").is_null(), null())
            .when(col("age").gt(18), lit("Yes"))
            .otherwise(lit("No")),
    )?;
    let banded = staff.with_column(
        "is_adult",
        when(col("age").gt(0).and(col("age").lt(18)), lit("minor"))
            .when(col("age").gt(18).and(col("age").lt(30)), lit("medium"))
            .otherwise(lit("major")),
    )?;
    show("when/otherwise with null", &adult);
    show("when/otherwise bands", &banded);
    Ok(())
}

fn distinct_and_sort() -> Result<()> {
    let managers = samples::managers_with_duplicates()?;
    println!("{} {}", ROW_COUNT_MSG, managers.count());
    let unique = managers.distinct();
    let id_name = managers.select_columns(&["id", "name"])?.distinct();
    let deduped = managers.drop_duplicates(&["id", "name", "sal", "mngr_id"])?;
    let sorted = unique.sort(vec![col("sal").desc(), col("name").asc()])?;
    show("distinct", &unique);
    show("distinct id, name", &id_name);
    show("dropDuplicates", &deduped);
    show("sort sal desc, name asc", &sorted);
    Ok(())
}

fn aggregates() -> Result<()> {
    let staff = samples::staff_with_nulls()?;
    show("count(*)", &staff.select(vec![count(col("*"))])?);
    show("count(name)", &staff.select(vec![count(col("name"))])?);
    show(
        "countDistinct(address)",
        &staff.select(vec![
            count_distinct(col("address")).alias("distinct_address_count")
        ])?,
    );
    show(
        "min/max/avg salary",
        &staff.select(vec![
            min(col("salary")).alias("min_salary"),
            max(col("salary")).alias("max_salary"),
            avg(col("salary")).alias("avg_salary"),
        ])?,
    );

    let departments = samples::departments()?;
    let by_department = departments.group_by(&["department"]).agg(vec![
        count(col("*")).alias("count"),
        avg(col("salary")).alias("avg_salary"),
        min(col("salary")).alias("min_salary"),
        max(col("salary")).alias("max_salary"),
    ])?;
    show("groupBy department", &by_department);
    Ok(())
}

fn joins() -> Result<()> {
    let customers = samples::customers()?;
    let sales = samples::sales()?;
    show("products", &samples::products()?);

    for how in [JoinType::Inner, JoinType::Left, JoinType::Right, JoinType::Full] {
        let joined = customers
            .join(&sales, "customer_id", "customer_id", how)?
            .select(vec![col("product_id")])?
            .sort(vec![col("product_id").asc()])?;
        show(&format!("{} join product_id", how), &joined);
    }
    let cross = customers.cross_join(&sales)?;
    println!("cross join rows: {}", cross.count());
    Ok(())
}

fn windows() -> Result<()> {
    let staff = samples::staff_by_gender()?;
    let spec = Window::partition_by(&["department"]).order_by(vec![col("salary").desc()]);
    let ranked = staff
        .with_column("row_number", row_number().over(spec.clone()))?
        .with_column("rank", rank().over(spec.clone()))?
        .with_column("dense_rank", dense_rank().over(spec.clone()))?
        .with_column("ntile", ntile(3).over(spec))?;
    show("window ranking by department", &ranked);
    show("monthly product sales", &samples::monthly_product_sales()?);
    Ok(())
}

fn nested_json() -> Result<()> {
    let nested = samples::nested_restaurants()?;
    println!("📋 Initial Data Preview:");
    nested.show(20, 0);
    nested.print_schema();

    let flattened = nested
        .explode("restaurants", "new_restaurant")?
        .drop(&["restaurants"])
        .select(vec![col("new_restaurant.restaurant.R.res_id")])?;
    println!("✨ Flattened Result (res_id only):");
    flattened.show(20, 0);
    Ok(())
}

fn main() -> Result<()> {
    logger::init_cli_logger(false);
    let session = Session::new("PySpark-HandsOn");
    tracing::info!("🚀 Running DataFrame walk-through for {}", session.app_name());

    select_and_sql(&session).context("select / sql")?;
    filter_alias_literal_cast(&samples::employees()?).context("filter / alias / cast")?;
    unions().context("unions")?;
    case_when().context("case when")?;
    distinct_and_sort().context("distinct / sort")?;
    aggregates().context("aggregates")?;
    joins().context("joins")?;
    windows().context("windows")?;
    nested_json().context("nested json")?;

    tracing::info!("✅ Transformations complete");
    Ok(())
}
