use dedoc_core::{
    analysis::bbox::BBox,
    classify::{LineTypeClassifier, ParagraphClassifier},
    features::{line_type::LineTypeFeatureExtractor, paragraph::ParagraphFeatureExtractor},
    inference::{DecisionModel, LazyModel, ModelArtifact, linear::LinearModel},
    layout::{
        element::{Line, LineMetadata},
        page::{Document, Page, Table},
    },
    parse::{Pipeline, PipelineConfigBuilder},
    table::Cell,
};
use ndarray::{Array1, Array2};

fn constant_model(classes: &[&str], winner: &str, feature_names: Vec<String>) -> ModelArtifact {
    let (coefficients, intercepts) = if classes.len() == 2 {
        let sign = if classes[1] == winner { 5.0 } else { -5.0 };
        (Array2::zeros((1, feature_names.len())), Array1::from_elem(1, sign))
    } else {
        let intercepts = classes
            .iter()
            .map(|class| if *class == winner { 5.0 } else { 0.0 })
            .collect::<Array1<f64>>();
        (Array2::zeros((classes.len(), feature_names.len())), intercepts)
    };
    ModelArtifact {
        classifier: DecisionModel::Linear(LinearModel {
            classes: classes.iter().map(|class| class.to_string()).collect(),
            coefficients,
            intercepts,
        }),
        feature_names,
        parameters: serde_json::Value::Null,
    }
}

fn page(page_no: usize, texts: &[&str]) -> Page {
    let mut page = Page::new(page_no);
    page.lines = texts
        .iter()
        .enumerate()
        .map(|(line_id, text)| {
            Line::new(*text, LineMetadata::new(page_no, line_id))
                .with_location(BBox::new(50, 40 + 30 * line_id as i64, 500, 20), page_no)
        })
        .collect();
    page
}

#[test]
fn document_is_labeled_in_page_order() {
    let pages = vec![
        page(0, &["ТЕХНИЧЕСКОЕ ЗАДАНИЕ", "на поставку"]),
        page(1, &["1. Общие сведения", "1.1. Наименование", "текст пункта"]),
        page(2, &["2. Требования", ""]),
    ];

    let paragraph_columns = ParagraphFeatureExtractor::default()
        .document_features(&pages[1].lines)
        .unwrap()
        .columns()
        .to_vec();
    let all_lines = pages.iter().flat_map(|page| page.lines.clone()).collect::<Vec<_>>();
    let line_type_columns = LineTypeFeatureExtractor::default()
        .document_features(&all_lines)
        .unwrap()
        .columns()
        .to_vec();

    let paragraphs = ParagraphClassifier::new(LazyModel::preloaded(constant_model(
        &["not_paragraph", "paragraph"],
        "paragraph",
        paragraph_columns,
    )));
    let line_types = LineTypeClassifier::new(LazyModel::preloaded(constant_model(
        &["title", "toc", "part", "named_item", "item", "raw_text"],
        "item",
        line_type_columns,
    )));
    let config = PipelineConfigBuilder::default().threads(Some(3)).build().unwrap();
    let pipeline = Pipeline::with_classifiers(config, paragraphs, line_types).unwrap();

    let mut document = Document { pages };
    document.pages[1].tables.push(Table::new(vec![
        vec![Cell::new(0, 30, 0, 50).unwrap(), Cell::new(30, 70, 0, 30).unwrap()],
        vec![Cell::new(30, 70, 30, 50).unwrap()],
    ]));
    let analysis = pipeline.run(document).unwrap();
    assert!(analysis.warnings.is_empty(), "{:?}", analysis.warnings);

    let pages = &analysis.document.pages;
    assert_eq!(pages.iter().map(|page| page.page_no).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert_eq!(pages[1].tables[0].cells.len(), 2);
    assert!(pages[1].tables[0].is_rectangular());

    let lines = analysis.document.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 7);
    assert!(lines[..6].iter().all(|line| line.metadata.paragraph_type == "paragraph"));
    assert_eq!(lines[6].metadata.paragraph_type, "not_paragraph");

    let types = lines
        .iter()
        .map(|line| line.metadata.hierarchy_level.line_type.as_str())
        .collect::<Vec<_>>();
    // the model says item everywhere; unnumbered items and empty lines are raw text
    assert_eq!(
        types,
        vec!["raw_text", "raw_text", "item", "item", "raw_text", "item", "raw_text"]
    );
    assert_eq!(lines[2].metadata.hierarchy_level.level_2, Some(1));
    assert_eq!(lines[3].metadata.hierarchy_level.level_2, Some(2));
}
