use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TableData {
    /// Builds a table when `value` is a non-empty array of flat objects.
    #[must_use]
    pub fn from_records(value: &Value) -> Option<Self> {
        let records = value.as_array()?;
        let objects = records
            .iter()
            .map(flat_object)
            .collect::<Option<Vec<_>>>()?;
        let first = objects.first()?;

        let columns = first.keys().cloned().collect::<Vec<_>>();
        let rows = objects
            .iter()
            .map(|object| {
                columns
                    .iter()
                    .map(|column| object.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Some(Self { columns, rows })
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[must_use]
pub fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn flat_object(value: &Value) -> Option<&Map<String, Value>> {
    let object = value.as_object()?;
    object
        .values()
        .all(|cell| !matches!(cell, Value::Array(_) | Value::Object(_)))
        .then_some(object)
}
