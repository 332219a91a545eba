//! Spark's text renderings: `show()` tables and `printSchema()` trees.

use crate::frame::{value, DataFrame};

fn truncate_cell(cell: String, truncate: usize) -> String {
    if truncate == 0 || cell.chars().count() <= truncate {
        return cell;
    }
    if truncate < 4 {
        return cell.chars().take(truncate).collect();
    }
    let mut out: String = cell.chars().take(truncate - 3).collect();
    out.push_str("...");
    out
}

fn pad(cell: &str, width: usize, right_align: bool) -> String {
    let fill = width.saturating_sub(cell.chars().count());
    if right_align {
        format!("{}{}", " ".repeat(fill), cell)
    } else {
        format!("{}{}", cell, " ".repeat(fill))
    }
}

impl DataFrame {
    /// Renders the first `n` rows. `truncate == 0` disables truncation and
    /// left-aligns cells, as `show(truncate=False)` does.
    pub fn show_string(&self, n: usize, truncate: usize) -> String {
        let right_align = truncate > 0;
        let header: Vec<String> = self
            .columns()
            .into_iter()
            .map(|c| truncate_cell(c, truncate))
            .collect();
        let body: Vec<Vec<String>> = self
            .rows()
            .iter()
            .take(n)
            .map(|row| {
                row.iter()
                    .map(|v| truncate_cell(value::display(v), truncate))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(i, h)| {
                body.iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let separator = format!(
            "+{}+\n",
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("+")
        );
        let line = |cells: &[String]| {
            let parts: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| pad(c, *w, right_align))
                .collect();
            format!("|{}|\n", parts.join("|"))
        };

        let mut out = String::new();
        out.push_str(&separator);
        out.push_str(&line(&header));
        out.push_str(&separator);
        for row in &body {
            out.push_str(&line(row));
        }
        out.push_str(&separator);
        if self.count() > n {
            let noun = if n == 1 { "row" } else { "rows" };
            out.push_str(&format!("only showing top {} {}\n", n, noun));
        }
        out
    }

    /// Prints the first `n` rows to stdout.
    pub fn show(&self, n: usize, truncate: usize) {
        println!("{}", self.show_string(n, truncate));
    }

    pub fn print_schema(&self) {
        println!("{}", self.schema().tree_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn people() -> DataFrame {
        DataFrame::from_rows(
            &["id", "name"],
            vec![
                vec![json!(1), json!("Amit")],
                vec![json!(2), Value::Null],
                vec![json!(3), json!("a rather long name indeed")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_show_right_aligns_and_truncates() {
        let expected = "\
+---+--------------------+
| id|                name|
+---+--------------------+
|  1|                Amit|
|  2|                NULL|
|  3|a rather long nam...|
+---+--------------------+
";
        assert_eq!(people().show_string(20, 20), expected);
    }

    #[test]
    fn test_show_without_truncation_left_aligns() {
        let expected = "\
+---+----+
|id |name|
+---+----+
|1  |Amit|
+---+----+
only showing top 1 row
";
        assert_eq!(people().show_string(1, 0), expected);
    }
}
