use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            description: None,
            samples: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<i64>,
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            description: None,
            record_count: None,
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Tables and columns handed to the model to ground SQL generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchemaContext {
    pub tables: Vec<TableSchema>,
}

impl SchemaContext {
    pub fn new(tables: Vec<TableSchema>) -> Self {
        Self { tables }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn total_records(&self) -> i64 {
        self.tables.iter().filter_map(|t| t.record_count).sum()
    }

    /// Renders the schema as prompt text. Output depends only on `self`.
    pub fn render(&self) -> String {
        let mut blocks = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            let mut block = String::new();
            let _ = write!(block, "Table '{}'", table.name);
            if let Some(description) = &table.description {
                let _ = write!(block, ": {description}");
            }
            if let Some(count) = table.record_count {
                let _ = write!(block, " ({count} records)");
            }
            for column in &table.columns {
                let _ = write!(block, "\n  - {}", column.name);
                if !column.data_type.is_empty() {
                    let _ = write!(block, " ({})", column.data_type);
                }
                if let Some(description) = &column.description {
                    let _ = write!(block, ": {description}");
                }
                if !column.samples.is_empty() {
                    let _ = write!(block, " | Examples: {}", column.samples.join(", "));
                }
            }
            blocks.push(block);
        }
        blocks.join("\n\n")
    }
}
