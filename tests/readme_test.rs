use std::path::PathBuf;

fn readme() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("README.md");
    std::fs::read_to_string(path).unwrap()
}

/// Lines outside fenced code blocks.
fn prose(text: &str) -> Vec<&str> {
    let mut in_fence = false;
    text.lines()
        .filter(|line| {
            if line.starts_with("```") {
                in_fence = !in_fence;
                return false;
            }
            !in_fence
        })
        .collect()
}

#[test]
fn test_readme_has_a_single_title() {
    let text = readme();
    let titles: Vec<&str> = prose(&text)
        .into_iter()
        .filter(|l| l.starts_with("# "))
        .collect();
    assert_eq!(titles, vec!["# 🚀 PySpark HandsOn ETL"]);
}

#[test]
fn test_readme_lists_five_features() {
    let text = readme();
    assert_eq!(text.lines().filter(|l| l.starts_with("- ✅")).count(), 5);
}

#[test]
fn test_readme_links_only_the_repository() {
    let text = readme();
    let links: Vec<&str> = text
        .split_whitespace()
        .filter(|w| w.starts_with("http://") || w.starts_with("https://"))
        .collect();
    assert_eq!(links, vec!["https://github.com/Github-SG03/Pyspark-HandsOn"]);
}

#[test]
fn test_readme_lists_the_technologies_by_name() {
    let text = readme();
    let technologies: Vec<&str> = prose(&text)
        .into_iter()
        .filter_map(|l| l.strip_prefix("- "))
        .filter(|l| !l.starts_with('✅') && !l.starts_with('🔗'))
        .collect();
    assert_eq!(
        technologies,
        vec![
            "PySpark",
            "Databricks",
            "GitHub Actions",
            "SonarCloud",
            "CI/CD",
            "Testing",
            "Monitoring"
        ]
    );
}
