use crate::frame::aggregate;
use crate::frame::sql::{self, Query};
use crate::frame::DataFrame;
use crate::io::DataFrameReader;
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

fn poisoned() -> EtlError {
    EtlError::processing("temp view catalog is poisoned")
}

/// Entry point for SQL and readers, the way a SparkSession is.
#[derive(Debug)]
pub struct Session {
    app_name: String,
    views: RwLock<HashMap<String, DataFrame>>,
}

impl Session {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            views: RwLock::new(HashMap::new()),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// View names are case-insensitive.
    pub fn register_view(&self, name: &str, df: DataFrame) -> Result<()> {
        debug!("📋 Registering temp view {}", name);
        let mut views = self.views.write().map_err(|_| poisoned())?;
        views.insert(name.to_ascii_lowercase(), df);
        Ok(())
    }

    pub fn drop_view(&self, name: &str) -> Result<bool> {
        let mut views = self.views.write().map_err(|_| poisoned())?;
        Ok(views.remove(&name.to_ascii_lowercase()).is_some())
    }

    pub fn table(&self, name: &str) -> Result<DataFrame> {
        let views = self
            .views
            .read()
            .map_err(|_| poisoned())?;
        views
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| EtlError::schema(format!("Table or view not found: {}", name)))
    }

    pub fn read(&self) -> DataFrameReader {
        DataFrameReader::new()
    }

    /// Runs a single-table `SELECT` against the registered views.
    pub fn sql(&self, text: &str) -> Result<DataFrame> {
        let query = sql::parse_query(text)?;
        debug!("🔎 Running query against {}", query.from);
        self.execute(query)
    }

    fn execute(&self, query: Query) -> Result<DataFrame> {
        let mut df = self.table(&query.from)?;
        if let Some(condition) = query.selection {
            df = df.filter(condition)?;
        }

        let aggregated = !query.group_by.is_empty()
            || query.projection.iter().any(|e| e.contains_aggregate());

        let mut sorted = query.order_by.is_empty();
        if aggregated {
            df = aggregate::aggregate_frame(&df, &query.group_by, &query.projection)?;
        } else {
            let projected = df.select(query.projection.clone())?;
            let resolves_after = query
                .order_by
                .iter()
                .all(|o| o.expr.data_type(projected.schema()).is_ok());
            // ORDER BY 指向未被選取的欄位時，先排序再投影
            df = if sorted || resolves_after {
                projected
            } else {
                sorted = true;
                df.sort(query.order_by.clone())?.select(query.projection)?
            };
        }

        if query.distinct {
            df = df.distinct();
        }
        if !sorted {
            df = df.sort(query.order_by)?;
        }
        if let Some(n) = query.limit {
            df = df.limit(n);
        }
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> Session {
        let spark = Session::new("test");
        let df = DataFrame::from_rows(
            &["id", "name", "salary", "department"],
            vec![
                vec![json!(1), json!("Amit"), json!(70000), json!("IT")],
                vec![json!(2), json!("Neha"), json!(80000), json!("HR")],
                vec![json!(3), json!("Raj"), json!(90000), json!("IT")],
            ],
        )
        .unwrap();
        df.create_or_replace_temp_view(&spark, "employee_tbl").unwrap();
        spark
    }

    #[test]
    fn test_select_star_with_where() {
        let df = session()
            .sql("select * from employee_tbl where salary > 70000")
            .unwrap();
        assert_eq!(df.count(), 2);
        assert_eq!(df.columns().len(), 4);
    }

    #[test]
    fn test_group_by_query() {
        let df = session()
            .sql("SELECT department, avg(salary) AS avg_sal FROM Employee_Tbl GROUP BY department ORDER BY avg_sal DESC")
            .unwrap();
        assert_eq!(df.columns(), vec!["department", "avg_sal"]);
        assert_eq!(df.rows()[0], vec![json!("IT"), json!(80000.0)]);
    }

    #[test]
    fn test_order_by_unselected_column() {
        let df = session()
            .sql("select name from employee_tbl order by salary desc limit 2")
            .unwrap();
        assert_eq!(
            df.column_values("name").unwrap(),
            vec![json!("Raj"), json!("Neha")]
        );
    }

    #[test]
    fn test_unknown_view_is_schema_error() {
        assert!(matches!(
            session().sql("select * from nope"),
            Err(EtlError::SchemaError { .. })
        ));
        assert!(matches!(
            session().sql("select from employee_tbl"),
            Err(EtlError::ParseError { .. })
        ));
    }

    #[test]
    fn test_poisoned_catalog_is_an_error() {
        let spark = session();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = spark.views.write().unwrap();
            panic!("poison the view catalog");
        }));

        let df = DataFrame::from_rows(&["id"], vec![vec![json!(1)]]).unwrap();
        assert!(matches!(
            df.create_or_replace_temp_view(&spark, "other_tbl"),
            Err(EtlError::ProcessingError { .. })
        ));
        assert!(spark.drop_view("employee_tbl").is_err());
        assert!(spark.table("employee_tbl").is_err());
    }
}
