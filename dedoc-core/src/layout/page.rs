use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{layout::element::Line, table::cell::Cell};

/// A table as a list of rows; before splitting the rows may be ragged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default = "table_uid")]
    pub uid: String,
    pub cells: Vec<Vec<Cell>>,
}

fn table_uid() -> String {
    format!("table_{}", Uuid::new_v4())
}

impl Table {
    pub fn new(cells: Vec<Vec<Cell>>) -> Self {
        Self {
            uid: table_uid(),
            cells,
        }
    }

    pub fn is_rectangular(&self) -> bool {
        let width = self.cells.first().map(Vec::len).unwrap_or(0);
        self.cells.iter().all(|row| row.len() == width)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_no: usize,
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Page {
    pub fn new(page_no: usize) -> Self {
        Self {
            page_no,
            lines: Vec::new(),
            tables: Vec::new(),
        }
    }
}

/// Pages of one document, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.pages.iter().flat_map(|page| page.lines.iter())
    }

    pub fn lines_mut(&mut self) -> impl Iterator<Item = &mut Line> {
        self.pages.iter_mut().flat_map(|page| page.lines.iter_mut())
    }
}
