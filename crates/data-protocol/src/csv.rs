//! CSV shaping: flatten a result tree into one row per leaf.
//!
//! The CSV encoding is derived from the same [`ResultTree`] the JSON
//! encoding serializes, so the two can never report different values. Each
//! root-to-leaf path becomes one data row; column names come from the
//! dataset's declared axes.

use serde_json::Value;

use crate::tree::ResultTree;

/// Options for one CSV rendering.
#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    /// Column names for the path segments, in nesting order. The final
    /// `value` column is always appended.
    pub columns: Vec<String>,

    /// Lines written before the header, each prefixed with `# `.
    pub metadata: Vec<String>,
}

impl CsvOptions {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, lines: Vec<String>) -> Self {
        self.metadata = lines;
        self
    }
}

/// Render a result tree as CSV text.
///
/// Paths shorter than the declared columns are right-padded with empty
/// fields before the value, so mixed-depth trees (a categorical mode leaf
/// next to per-category percentages) still line up under one header.
pub fn render_csv(tree: &ResultTree, options: &CsvOptions) -> String {
    let mut out = String::new();

    for line in &options.metadata {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }

    let mut header: Vec<&str> = options.columns.iter().map(String::as_str).collect();
    header.push("value");
    out.push_str(&join_row(&header));
    out.push('\n');

    let width = options.columns.len();
    for (path, value) in tree.flatten() {
        let mut fields: Vec<String> = path;
        while fields.len() < width {
            fields.push(String::new());
        }
        fields.push(value_field(&value));

        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        out.push_str(&join_row(&refs));
        out.push('\n');
    }

    out
}

/// Render one leaf value as a CSV field.
fn value_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn join_row(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quote a field if it contains a delimiter, quote, or newline.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_simple_tree() {
        let mut tree = ResultTree::new();
        tree.insert(&path(&["2040-2069", "rcp45", "tas"]), json!(1.5));
        tree.insert(&path(&["2040-2069", "rcp85", "tas"]), json!(2.3));

        let csv = render_csv(&tree, &CsvOptions::new(columns(&["era", "scenario", "variable"])));

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "era,scenario,variable,value");
        assert_eq!(lines[1], "2040-2069,rcp45,tas,1.5");
        assert_eq!(lines[2], "2040-2069,rcp85,tas,2.3");
    }

    #[test]
    fn test_metadata_preamble() {
        let tree = ResultTree::new();
        let options = CsvOptions::new(columns(&["variable"])).with_metadata(vec![
            "dataset: Projected temperature".to_string(),
            "location: 65.0628, -146.1627".to_string(),
        ]);

        let csv = render_csv(&tree, &options);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "# dataset: Projected temperature");
        assert_eq!(lines[1], "# location: 65.0628, -146.1627");
        assert_eq!(lines[2], "variable,value");
    }

    #[test]
    fn test_short_paths_are_padded() {
        // A categorical tree mixes a mode leaf with deeper percent leaves.
        let mut tree = ResultTree::new();
        tree.insert(&path(&["mode"]), json!("high"));
        tree.insert(&path(&["percent", "high"]), json!(60.0));
        tree.insert(&path(&["percent", "minimal"]), json!(40.0));

        let csv = render_csv(&tree, &CsvOptions::new(columns(&["statistic", "category"])));
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "statistic,category,value");
        assert_eq!(lines[1], "mode,,high");
        assert_eq!(lines[2], "percent,high,60.0");
        assert_eq!(lines[3], "percent,minimal,40.0");
    }

    #[test]
    fn test_fields_with_commas_are_quoted() {
        let mut tree = ResultTree::new();
        tree.insert(&path(&["Yukon, Upper"]), json!(1.0));

        let csv = render_csv(&tree, &CsvOptions::new(columns(&["area"])));
        assert!(csv.contains("\"Yukon, Upper\",1.0"));
    }

    #[test]
    fn test_null_renders_empty() {
        let mut tree = ResultTree::new();
        tree.insert(&path(&["x"]), serde_json::Value::Null);

        let csv = render_csv(&tree, &CsvOptions::new(columns(&["variable"])));
        assert!(csv.lines().any(|l| l == "x,"));
    }

    #[test]
    fn test_csv_rows_match_flattened_json_paths() {
        // The equivalence invariant: the CSV data rows are exactly the
        // flattened leaf paths of the JSON encoding.
        let mut tree = ResultTree::new();
        tree.insert(&path(&["m1", "rcp45", "tas"]), json!(1.0));
        tree.insert(&path(&["m1", "rcp85", "tas"]), json!(2.0));
        tree.insert(&path(&["m2", "rcp45", "pr"]), json!(300.5));

        let csv = render_csv(&tree, &CsvOptions::new(columns(&["model", "scenario", "variable"])));
        let data_rows: Vec<&str> = csv.lines().skip(1).collect();

        let flattened = tree.flatten();
        assert_eq!(data_rows.len(), flattened.len());
        for ((path, value), row) in flattened.iter().zip(data_rows) {
            let expected = format!("{},{}", path.join(","), value_field(value));
            assert_eq!(row, expected);
        }
    }
}
