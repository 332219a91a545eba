//! Built-in datasets used by the DataFrame walk-through (`handson_demos`)
//! and by the transformation tests.

use crate::domain::model::{Row, Value};
use crate::frame::DataFrame;
use crate::utils::error::Result;
use serde_json::json;

const MANAGER_COLUMNS: [&str; 4] = ["id", "name", "sal", "mngr_id"];
const STAFF_COLUMNS: [&str; 6] = ["id", "name", "age", "salary", "address", "department"];

fn manager(id: i64, name: &str, sal: i64, mngr_id: i64) -> Row {
    vec![json!(id), json!(name), json!(sal), json!(mngr_id)]
}

/// `None` 會成為 null
fn opt<T: Into<Value>>(v: Option<T>) -> Value {
    v.map(Into::into).unwrap_or(Value::Null)
}

fn staff(
    id: Option<i64>,
    name: Option<&str>,
    age: Option<i64>,
    salary: Option<i64>,
    address: Option<&str>,
    department: Option<&str>,
) -> Row {
    vec![
        opt(id),
        opt(name),
        opt(age),
        opt(salary),
        opt(address),
        opt(department),
    ]
}

/// `(id, num)`, seven rows.
pub fn id_numbers() -> Result<DataFrame> {
    let rows = [(1, 1), (2, 1), (3, 1), (4, 2), (5, 1), (6, 2), (7, 2)]
        .into_iter()
        .map(|(id, num)| vec![json!(id), json!(num)])
        .collect();
    DataFrame::from_rows(&["id", "num"], rows)
}

/// Five employees across India, Japan and the USA.
pub fn employees() -> Result<DataFrame> {
    let rows = [
        (1, "Amit", 70000, "M", "INDIA", "Delhi", 25),
        (2, "Neha", 80000, "F", "JAPAN", "Tokyo", 28),
        (3, "Raj", 60000, "M", "INDIA", "Mumbai", 30),
        (4, "Sara", 90000, "F", "JAPAN", "Osaka", 26),
        (5, "Tom", 75000, "M", "USA", "NY", 35),
    ]
    .into_iter()
    .map(|(id, name, salary, gender, address, city, age)| {
        vec![
            json!(id),
            json!(name),
            json!(salary),
            json!(gender),
            json!(address),
            json!(city),
            json!(age),
        ]
    })
    .collect();
    DataFrame::from_rows(
        &["id", "name", "salary", "gender", "address", "city", "age"],
        rows,
    )
}

/// Ten manager rows, the last one duplicated.
pub fn managers() -> Result<DataFrame> {
    DataFrame::from_rows(
        &MANAGER_COLUMNS,
        vec![
            manager(10, "Anil", 50000, 18),
            manager(11, "Vikas", 75000, 16),
            manager(12, "Nisha", 40000, 18),
            manager(13, "Nidhi", 60000, 17),
            manager(14, "Priya", 80000, 18),
            manager(15, "Mohit", 45000, 18),
            manager(16, "Rajesh", 90000, 10),
            manager(17, "Raman", 55000, 16),
            manager(18, "Sam", 65000, 17),
            manager(18, "Sam", 65000, 17),
        ],
    )
}

pub fn more_managers() -> Result<DataFrame> {
    DataFrame::from_rows(
        &MANAGER_COLUMNS,
        vec![
            manager(19, "Sohan", 50000, 18),
            manager(20, "Sima", 75000, 17),
        ],
    )
}

/// Thirteen manager rows with exact duplicates and one near-duplicate
/// (Priya with a different salary).
pub fn managers_with_duplicates() -> Result<DataFrame> {
    DataFrame::from_rows(
        &MANAGER_COLUMNS,
        vec![
            manager(10, "Anil", 50000, 18),
            manager(11, "Vikas", 75000, 16),
            manager(12, "Nisha", 40000, 18),
            manager(13, "Nidhi", 60000, 17),
            manager(14, "Priya", 80000, 18),
            manager(15, "Mohit", 45000, 18),
            manager(16, "Rajesh", 90000, 10),
            manager(17, "Raman", 55000, 16),
            manager(18, "Sam", 65000, 17),
            manager(15, "Mohit", 45000, 18),
            manager(13, "Nidhi", 60000, 17),
            manager(14, "Priya", 90000, 18),
            manager(18, "Sam", 65000, 17),
        ],
    )
}

/// Staff with missing ages, names and salaries, one all-null row and a
/// duplicated last row.
pub fn staff_with_nulls() -> Result<DataFrame> {
    DataFrame::from_rows(
        &STAFF_COLUMNS,
        vec![
            staff(Some(1), Some("manish"), Some(26), Some(20000), Some("india"), Some("IT")),
            staff(Some(2), Some("rahul"), None, Some(40000), Some("germany"), Some("engineering")),
            staff(Some(3), Some("pawan"), Some(12), Some(60000), Some("india"), Some("sales")),
            staff(Some(4), Some("roshini"), Some(44), None, Some("uk"), Some("engineering")),
            staff(Some(5), Some("raushan"), Some(35), Some(70000), Some("india"), Some("sales")),
            staff(Some(6), None, Some(29), Some(200000), Some("uk"), Some("IT")),
            staff(Some(7), Some("adam"), Some(37), Some(65000), Some("us"), Some("IT")),
            staff(Some(8), Some("chris"), Some(16), Some(40000), Some("us"), Some("sales")),
            staff(None, None, None, None, None, None),
            staff(Some(7), Some("adam"), Some(37), Some(65000), Some("us"), Some("IT")),
        ],
    )
}

/// `(id, name, salary, department)` for the group-by walk-through.
pub fn departments() -> Result<DataFrame> {
    let rows = [
        (1, "manish", 50000, "IT"),
        (2, "vikash", 60000, "sales"),
        (3, "raushan", 70000, "marketing"),
        (4, "mukesh", 80000, "IT"),
        (5, "pritam", 90000, "sales"),
        (6, "nikita", 45000, "marketing"),
        (7, "ragini", 55000, "marketing"),
        (8, "rakesh", 100000, "IT"),
        (9, "aditya", 65000, "IT"),
        (10, "rahul", 50000, "marketing"),
    ]
    .into_iter()
    .map(|(id, name, salary, dept)| vec![json!(id), json!(name), json!(salary), json!(dept)])
    .collect();
    DataFrame::from_rows(&["id", "name", "salary", "department"], rows)
}

/// Same shape as [`departments`] plus `gender`, with salary ties inside
/// IT and sales.
pub fn staff_by_gender() -> Result<DataFrame> {
    let rows = [
        (1, "manish", 50000, "IT", "m"),
        (2, "vikash", 60000, "sales", "m"),
        (3, "raushan", 70000, "marketing", "m"),
        (4, "mukesh", 80000, "IT", "m"),
        (5, "priti", 90000, "sales", "f"),
        (6, "nikita", 45000, "marketing", "f"),
        (7, "ragini", 55000, "marketing", "f"),
        (8, "rashi", 100000, "IT", "f"),
        (9, "aditya", 65000, "IT", "m"),
        (10, "rahul", 50000, "marketing", "m"),
        (11, "rakhi", 50000, "IT", "f"),
        (12, "akhilesh", 90000, "sales", "m"),
    ]
    .into_iter()
    .map(|(id, name, salary, dept, gender)| {
        vec![
            json!(id),
            json!(name),
            json!(salary),
            json!(dept),
            json!(gender),
        ]
    })
    .collect();
    DataFrame::from_rows(&["id", "name", "salary", "department", "gender"], rows)
}

/// Ten customers, ids 1 through 10. Joining dates are `dd-MM-yyyy` text.
pub fn customers() -> Result<DataFrame> {
    let rows = [
        (1, "manish", "patna", "30-05-2022"),
        (2, "vikash", "kolkata", "12-03-2023"),
        (3, "nikita", "delhi", "25-06-2023"),
        (4, "rahul", "ranchi", "24-03-2023"),
        (5, "mahesh", "jaipur", "22-03-2023"),
        (6, "prantosh", "kolkata", "18-10-2022"),
        (7, "raman", "patna", "30-12-2022"),
        (8, "prakash", "ranchi", "24-02-2023"),
        (9, "ragini", "kolkata", "03-03-2023"),
        (10, "raushan", "jaipur", "05-02-2023"),
    ]
    .into_iter()
    .map(|(id, name, address, joined)| {
        vec![json!(id), json!(name), json!(address), json!(joined)]
    })
    .collect();
    DataFrame::from_rows(
        &["customer_id", "customer_name", "address", "date_of_joining"],
        rows,
    )
}

/// Ten sales; customer 11 has no customer record.
pub fn sales() -> Result<DataFrame> {
    let rows = [
        (1, 22, 10, "01-06-2022"),
        (1, 27, 5, "03-02-2023"),
        (2, 5, 3, "01-06-2023"),
        (5, 22, 1, "22-03-2023"),
        (7, 22, 4, "03-02-2023"),
        (9, 5, 6, "03-03-2023"),
        (2, 1, 12, "15-06-2023"),
        (1, 56, 2, "25-06-2023"),
        (5, 12, 5, "15-04-2023"),
        (11, 12, 76, "12-03-2023"),
    ]
    .into_iter()
    .map(|(customer, product, quantity, date)| {
        vec![json!(customer), json!(product), json!(quantity), json!(date)]
    })
    .collect();
    DataFrame::from_rows(
        &["customer_id", "product_id", "quantity", "date_of_purchase"],
        rows,
    )
}

pub fn products() -> Result<DataFrame> {
    let rows = [
        (1, "fanta", 20),
        (2, "dew", 22),
        (5, "sprite", 40),
        (7, "redbull", 100),
        (12, "mazza", 45),
        (22, "coke", 27),
        (25, "limca", 21),
        (27, "pepsi", 14),
        (56, "sting", 10),
    ]
    .into_iter()
    .map(|(id, name, price)| vec![json!(id), json!(name), json!(price)])
    .collect();
    DataFrame::from_rows(&["id", "name", "price"], rows)
}

/// Monthly sales of three phones, `dd-MM-yyyy` dates.
pub fn monthly_product_sales() -> Result<DataFrame> {
    let mut rows = Vec::new();
    let months = [
        ("01-01-2023", [1500000, 1100000, 1100000]),
        ("01-02-2023", [1300000, 1120000, 1120000]),
        ("01-03-2023", [1600000, 1080000, 1160000]),
        ("01-04-2023", [1700000, 1800000, 1170000]),
        ("01-05-2023", [1200000, 980000, 1175000]),
        ("01-06-2023", [1100000, 1100000, 1200000]),
    ];
    for (date, amounts) in months {
        for ((id, name), amount) in [(1, "iphone"), (2, "samsung"), (3, "oneplus")]
            .into_iter()
            .zip(amounts)
        {
            rows.push(vec![json!(id), json!(name), json!(date), json!(amount)]);
        }
    }
    DataFrame::from_rows(&["product_id", "product_name", "sales_date", "sales"], rows)
}

/// One row with a `restaurants` array of `{restaurant: {R: {res_id}}}`.
pub fn nested_restaurants() -> Result<DataFrame> {
    let doc = json!([
        { "restaurant": { "R": { "res_id": "1001" } } },
        { "restaurant": { "R": { "res_id": "1002" } } }
    ]);
    DataFrame::from_rows(&["restaurants"], vec![vec![doc]])
}
