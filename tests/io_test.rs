use handson_etl::domain::model::{DataType, Field, Schema};
use handson_etl::frame::functions::col;
use handson_etl::frame::Session;
use handson_etl::io::{DataFrameReader, SaveMode};
use handson_etl::EtlError;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

fn dataset(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("datasets/input")
        .join(name)
}

fn explicit_schema() -> Schema {
    Schema::new(vec![
        Field::new("COUNTRY_1", DataType::String),
        Field::new("COUNTRY_2", DataType::String),
        Field::new("TOTAL_COUNT", DataType::Integer),
    ])
}

#[test]
fn test_flights_with_header_and_inferred_schema() {
    let spark = Session::new("io-test");
    let df = spark
        .read()
        .option("header", "true")
        .unwrap()
        .option("inferSchema", "true")
        .unwrap()
        .csv(dataset("2015-summary.csv"))
        .unwrap();

    assert_eq!(df.count(), 20);
    assert_eq!(
        df.columns(),
        vec!["DEST_COUNTRY_NAME", "ORIGIN_COUNTRY_NAME", "count"]
    );
    assert_eq!(df.schema().fields[2].data_type, DataType::Integer);
}

#[test]
fn test_explicit_schema_read_modes() {
    let path = dataset("2015-summary.csv");

    let permissive = DataFrameReader::new()
        .schema(explicit_schema())
        .option("mode", "PERMISSIVE")
        .unwrap()
        .csv(&path)
        .unwrap();
    assert_eq!(permissive.count(), 21);
    let bad = permissive.filter(col("TOTAL_COUNT").is_null()).unwrap();
    assert_eq!(bad.count(), 1);
    assert_eq!(bad.rows()[0][0], json!("DEST_COUNTRY_NAME"));

    let dropped = DataFrameReader::new()
        .schema(explicit_schema())
        .option("mode", "DROPMALFORMED")
        .unwrap()
        .csv(&path)
        .unwrap();
    assert_eq!(dropped.count(), 20);

    let failed = DataFrameReader::new()
        .schema(explicit_schema())
        .option("mode", "FAILFAST")
        .unwrap()
        .csv(&path);
    assert!(matches!(failed, Err(EtlError::MalformedRecord { line: 1, .. })));
}

#[test]
fn test_multiline_people_json() {
    let people = DataFrameReader::new()
        .option("multiline", "true")
        .unwrap()
        .json(dataset("multiline.json"))
        .unwrap();

    assert_eq!(people.count(), 3);
    assert_eq!(people.columns(), vec!["age", "city", "name", "restaurants"]);
    assert_eq!(people.column_values("age").unwrap()[2], json!(null));
    let ids = people.select(vec![col("restaurants.res_id")]).unwrap();
    assert_eq!(
        ids.column_values("res_id").unwrap(),
        vec![json!(1001), json!(1002), json!(1003)]
    );
}

#[test]
fn test_parquet_then_csv_outputs() {
    let tmp = TempDir::new().unwrap();
    let flights = DataFrameReader::new()
        .option("header", "true")
        .unwrap()
        .option("inferSchema", "true")
        .unwrap()
        .csv(dataset("2015-summary.csv"))
        .unwrap();

    let parquet_dir = tmp.path().join("parquet_data");
    flights
        .write()
        .mode(SaveMode::Overwrite)
        .parquet(&parquet_dir)
        .unwrap();
    let parquet_df = DataFrameReader::new()
        .format("parquet")
        .unwrap()
        .load(&parquet_dir)
        .unwrap();
    assert_eq!(parquet_df, flights);

    let csv_dir = tmp.path().join("csv_output");
    parquet_df
        .write()
        .mode(SaveMode::Overwrite)
        .option("header", "true")
        .unwrap()
        .csv(&csv_dir)
        .unwrap();
    let back = DataFrameReader::new()
        .option("header", "true")
        .unwrap()
        .option("inferSchema", "true")
        .unwrap()
        .csv(&csv_dir)
        .unwrap();
    assert_eq!(back, flights);

    let partitioned = tmp.path().join("partitioned_csv");
    parquet_df
        .write()
        .mode(SaveMode::Overwrite)
        .option("header", "true")
        .unwrap()
        .partition_by(&["DEST_COUNTRY_NAME"])
        .csv(&partitioned)
        .unwrap();
    let egypt = partitioned.join("DEST_COUNTRY_NAME=Egypt/part-00000.csv");
    assert_eq!(
        std::fs::read_to_string(egypt).unwrap(),
        "ORIGIN_COUNTRY_NAME,count\nUnited States,15\n"
    );
    assert!(partitioned
        .join("DEST_COUNTRY_NAME=Turks and Caicos Islands")
        .is_dir());
}

#[test]
fn test_error_if_exists_is_the_default_mode() {
    let tmp = TempDir::new().unwrap();
    let df = DataFrameReader::new()
        .option("header", "true")
        .unwrap()
        .csv(dataset("2015-summary.csv"))
        .unwrap();
    let out = tmp.path().join("out");

    df.write().csv(&out).unwrap();
    assert!(matches!(
        df.write().csv(&out),
        Err(EtlError::PathExists { .. })
    ));
    df.write().mode(SaveMode::Ignore).csv(&out).unwrap();
    df.write().mode(SaveMode::Append).csv(&out).unwrap();
    assert_eq!(
        DataFrameReader::new()
            .option("header", "false")
            .unwrap()
            .csv(&out)
            .unwrap()
            .count(),
        40
    );
}
