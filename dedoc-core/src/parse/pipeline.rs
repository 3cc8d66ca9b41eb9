use derive_builder::Builder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tracing::*;

use crate::{
    classify::{LineTypeClassifier, ParagraphClassifier},
    error::{DedocError, ThreadPoolSnafu},
    inference::{LazyModel, ModelSource},
    layout::{
        element::Line,
        page::{Document, Page, Table},
    },
    table::{CellSplitter, SplitterConfig},
};

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
pub struct PipelineConfig {
    pub splitter: SplitterConfig,
    pub paragraph_model: ModelSource,
    pub line_type_model: ModelSource,
    /// Threads of the page pool, `None` for one per core.
    pub threads: Option<usize>,
    pub split_tables: bool,
    pub classify_paragraphs: bool,
    pub classify_line_types: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            splitter: SplitterConfig::default(),
            paragraph_model: ModelSource::paragraph(),
            line_type_model: ModelSource::line_type(),
            threads: None,
            split_tables: true,
            classify_paragraphs: true,
            classify_line_types: true,
        }
    }
}

/// The annotated document with what went wrong on the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub document: Document,
    pub warnings: Vec<String>,
}

/// Splits the tables and labels the lines of a document.
///
/// Pages are processed in parallel: their tables are split into rectangular
/// grids and their lines labeled by the paragraph classifier. A page whose
/// lines fail to classify keeps them unlabeled and adds a warning. The
/// line-type classifier then runs once over the lines of the whole document.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    splitter: CellSplitter,
    paragraphs: ParagraphClassifier,
    line_types: LineTypeClassifier,
    pool: rayon::ThreadPool,
}

struct PageOutcome {
    index: usize,
    page: Page,
    warnings: Vec<String>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, DedocError> {
        let paragraphs = ParagraphClassifier::new(LazyModel::new(config.paragraph_model.clone()));
        let line_types = LineTypeClassifier::new(LazyModel::new(config.line_type_model.clone()));
        Self::with_classifiers(config, paragraphs, line_types)
    }

    /// A pipeline around classifiers built elsewhere, e.g. with preloaded models.
    pub fn with_classifiers(
        config: PipelineConfig,
        paragraphs: ParagraphClassifier,
        line_types: LineTypeClassifier,
    ) -> Result<Self, DedocError> {
        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = config.threads {
            pool = pool.num_threads(threads);
        }
        let pool = pool.build().context(ThreadPoolSnafu)?;

        Ok(Self {
            splitter: CellSplitter::new(config.splitter),
            paragraphs,
            line_types,
            pool,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, document: Document) -> Result<Analysis, DedocError> {
        info!("Analyzing document with {} pages", document.pages.len());

        let mut outcomes = self.pool.install(|| {
            document
                .pages
                .into_par_iter()
                .enumerate()
                .map(|(index, page)| self.process_page(index, page))
                .collect::<Vec<_>>()
        });
        // completion order is not page order
        outcomes.sort_by_key(|outcome| outcome.index);

        let mut warnings = Vec::new();
        let mut document = Document::default();
        for outcome in outcomes {
            warnings.extend(outcome.warnings);
            document.pages.push(outcome.page);
        }

        if self.config.classify_line_types {
            self.classify_line_types(&mut document)?;
        }
        Ok(Analysis { document, warnings })
    }

    fn process_page(&self, index: usize, mut page: Page) -> PageOutcome {
        let mut warnings = Vec::new();

        if self.config.split_tables {
            page.tables = std::mem::take(&mut page.tables)
                .into_iter()
                .map(|table| self.split_table(table))
                .collect();
        }

        if self.config.classify_paragraphs {
            let unlabeled = page.lines.clone();
            if let Err(e) = self.paragraphs.classify(&mut page.lines) {
                let e = DedocError::PageTask {
                    page_no: page.page_no,
                    message: e.to_string(),
                };
                warn!("{}", e);
                warnings.push(e.to_string());
                page.lines = unlabeled;
            }
        }

        PageOutcome { index, page, warnings }
    }

    fn split_table(&self, table: Table) -> Table {
        let cells = self.splitter.split(&table.cells);
        let split = Table { cells, ..table };
        debug_assert!(split.is_rectangular(), "table {} is not rectangular", split.uid);
        split
    }

    /// Runs the line-type classifier over every line of the document, in order.
    fn classify_line_types(&self, document: &mut Document) -> Result<(), DedocError> {
        let counts = document.pages.iter().map(|page| page.lines.len()).collect::<Vec<_>>();
        let mut lines = document
            .pages
            .iter_mut()
            .flat_map(|page| std::mem::take(&mut page.lines))
            .collect::<Vec<Line>>();

        let result = self.line_types.classify(&mut lines);

        let mut lines = lines.into_iter();
        for (page, count) in document.pages.iter_mut().zip(counts) {
            page.lines = lines.by_ref().take(count).collect();
        }
        let labels = result?;
        debug!("Labeled {} lines by type", labels.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::bbox::BBox,
        layout::element::LineMetadata,
        table::cell::Cell,
    };

    fn offline_config() -> PipelineConfig {
        PipelineConfigBuilder::default()
            .paragraph_model(ModelSource::new("/nonexistent/dedoc/paragraph.json.gz"))
            .line_type_model(ModelSource::new("/nonexistent/dedoc/tz.json.gz"))
            .classify_line_types(false)
            .threads(Some(2))
            .build()
            .unwrap()
    }

    fn cell(x1: i64, y1: i64, x2: i64, y2: i64) -> Cell {
        Cell::new(x1, x2, y1, y2).unwrap()
    }

    fn page(page_no: usize, tables: Vec<Table>) -> Page {
        let mut page = Page::new(page_no);
        page.lines = (0..2)
            .map(|i| Line::new("", LineMetadata::new(page_no, i)))
            .collect();
        page.tables = tables;
        page
    }

    #[test]
    fn test_pages_keep_their_order() {
        let pipeline = Pipeline::new(offline_config()).unwrap();
        let document = Document {
            pages: (0..16).map(|page_no| page(page_no, Vec::new())).collect(),
        };
        let analysis = pipeline.run(document).unwrap();

        let order = analysis.document.pages.iter().map(|page| page.page_no).collect::<Vec<_>>();
        assert_eq!(order, (0..16).collect::<Vec<_>>());
        assert!(analysis.warnings.is_empty());
        for line in analysis.document.lines() {
            assert_eq!(line.metadata.paragraph_type, "not_paragraph");
        }
    }

    #[test]
    fn test_tables_are_split() {
        let pipeline = Pipeline::new(offline_config()).unwrap();
        let table = Table::new(vec![
            vec![cell(0, 0, 3, 5), cell(3, 0, 7, 3)],
            vec![cell(3, 3, 7, 5)],
        ]);
        let document = Document {
            pages: vec![page(0, vec![table])],
        };
        let analysis = pipeline.run(document).unwrap();

        let cells = &analysis.document.pages[0].tables[0].cells;
        assert_eq!(cells.len(), 2);
        assert!(cells.iter().all(|row| row.len() == 2));
    }

    #[test]
    fn test_overlapping_and_empty_tables_stay_rectangular() {
        let pipeline = Pipeline::new(offline_config()).unwrap();
        let overlapping = Table::new(vec![
            vec![cell(0, 0, 100, 40), cell(60, 0, 200, 20)],
            vec![cell(60, 20, 200, 40), cell(0, 40, 60, 60)],
        ]);
        let empty = Table::new(vec![vec![]]);
        let uids = [overlapping.uid.clone(), empty.uid.clone()];
        let document = Document {
            pages: vec![page(0, vec![overlapping, empty])],
        };
        let analysis = pipeline.run(document).unwrap();

        assert!(analysis.warnings.is_empty());
        let tables = &analysis.document.pages[0].tables;
        assert_eq!(tables.iter().map(|table| table.uid.clone()).collect::<Vec<_>>(), uids);
        assert!(tables.iter().all(Table::is_rectangular));
        assert_eq!(tables[0].cells.len(), 3);
        assert!(tables[0].cells.iter().all(|row| row.len() == 3));
        assert_eq!(tables[1].cells, vec![Vec::<Cell>::new()]);
    }

    #[test]
    fn test_failed_page_keeps_lines() {
        let pipeline = Pipeline::new(offline_config()).unwrap();
        let mut failing = Page::new(1);
        failing.lines = vec![
            Line::new("text", LineMetadata::new(1, 0)).with_location(BBox::new(0, 0, 10, 10), 1),
            Line::new("more", LineMetadata::new(1, 1)).with_location(BBox::new(0, 20, 10, 10), 1),
        ];
        let document = Document {
            pages: vec![page(0, Vec::new()), failing.clone()],
        };

        let analysis = pipeline.run(document).unwrap();
        // the model can not be loaded offline, only the page with real text needs it
        assert_eq!(analysis.warnings.len(), 1);
        assert!(analysis.warnings[0].contains("Page 1"));
        assert_eq!(analysis.document.pages[1], failing);
    }
}
