use serde_json::{Map, Value};

use crate::data::model::{CellValue, Dataset};

/// Prompt for a single-column analysis: the name plus the first `sample_rows` values.
pub fn column_prompt(dataset: &Dataset, column: &str, sample_rows: usize) -> String {
    let sample: Vec<Value> = dataset
        .column_values(column)
        .take(sample_rows)
        .map(cell_json)
        .collect();
    let name = Value::String(column.to_string());

    format!(
        "Analyze this column of data named {name}. Sample values: {sample}\n\
         Please provide:\n\
         1. A brief description of what this column represents\n\
         2. Potential use in machine learning\n\
         3. Recommended preprocessing steps\n\
         Reply with only a JSON object with keys: description, mlUse, preprocessing",
        sample = Value::Array(sample),
    )
}

/// Prompt for a feature/target suggestion: the column list plus the first
/// `sample_rows` rows as JSON objects.
pub fn variable_prompt(dataset: &Dataset, sample_rows: usize) -> String {
    let columns = Value::Array(
        dataset
            .columns()
            .iter()
            .map(|c| Value::String(c.clone()))
            .collect(),
    );
    let sample: Vec<Value> = dataset
        .rows()
        .iter()
        .take(sample_rows)
        .map(|row| {
            // Keys follow the column list, not the row map's sort order.
            let obj: Map<String, Value> = dataset
                .columns()
                .iter()
                .map(|c| (c.clone(), row.get(c).map(cell_json).unwrap_or(Value::Null)))
                .collect();
            Value::Object(obj)
        })
        .collect();

    format!(
        "Analyze this dataset with columns: {columns}\n\
         Sample data: {sample}\n\
         Identify:\n\
         1. Which columns are likely dependent variables (target/y)?\n\
         2. Which columns are likely independent variables (features/X)?\n\
         3. Which columns should be removed?\n\
         Reply with only a JSON object of the form:\n\
         {{\"dependent\": [\"col1\"], \"independent\": [\"col2\", \"col3\"], \"remove\": []}}",
        sample = Value::Array(sample),
    )
}

fn cell_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Text(s) => Value::String(s.clone()),
        CellValue::Null => Value::Null,
    }
}
