use derive_builder::Builder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::{
    consts::LINE_TYPE_CONTEXT,
    error::{DedocError, PatternSnafu},
    features::{
        FeatureExtractor,
        first_word::{FirstWordConfig, FirstWordExtractor},
        list::{ListFeaturesConfig, ListFeaturesExtractor},
        matrix::FeatureMatrix,
        normalize::{min_max, normalize},
        patterns::{BULLET, NAMED_ITEM, REGEXPS_NUMBER, REGEXPS_SUBITEM_EXTENDED, REGEXPS_YEAR, ROMAN_NUMERAL},
        regexp::{before_special_line, numbered_list_features, start_regexp_features},
        typography,
    },
    layout::element::{Line, LineMetadata},
};

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default)]
pub struct LineTypeFeaturesConfig {
    /// Patterns matched at the start of every line, in column order.
    pub start_patterns: Vec<String>,
    /// Skip the font, alignment, style and page columns.
    pub text_features_only: bool,
    pub n_prev: usize,
    pub n_next: usize,
    pub list: ListFeaturesConfig,
    pub first_word: FirstWordConfig,
}

impl Default for LineTypeFeaturesConfig {
    fn default() -> Self {
        Self {
            start_patterns: [&*REGEXPS_SUBITEM_EXTENDED, &*ROMAN_NUMERAL, &*BULLET, &*NAMED_ITEM]
                .iter()
                .map(|regex| regex.as_str().to_string())
                .collect(),
            text_features_only: false,
            n_prev: LINE_TYPE_CONTEXT,
            n_next: LINE_TYPE_CONTEXT,
            list: ListFeaturesConfig::default(),
            first_word: FirstWordConfig::default(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Parameters {
    config: LineTypeFeaturesConfig,
    first_word: FirstWordExtractor,
}

/// Features for the structural type of lines in technical specifications.
///
/// Line-local features are computed per line, shifted in from the
/// `n_prev`/`n_next` neighbours and joined with the document-level list
/// features and the first-word block. Columns are sorted by name.
#[derive(Debug, Clone)]
pub struct LineTypeFeatureExtractor {
    config: LineTypeFeaturesConfig,
    start_patterns: Vec<Regex>,
    list_features: ListFeaturesExtractor,
    first_word: FirstWordExtractor,
}

struct DocumentInfo {
    total_lines: usize,
    start_page: usize,
    finish_page: usize,
}

/// Cased characters exist and all of them are uppercase.
pub(crate) fn is_upper(text: &str) -> bool {
    let mut cased = text.chars().filter(|c| c.is_uppercase() || c.is_lowercase()).peekable();
    cased.peek().is_some() && cased.all(char::is_uppercase)
}

fn is_lower(text: &str) -> bool {
    let mut cased = text.chars().filter(|c| c.is_uppercase() || c.is_lowercase()).peekable();
    cased.peek().is_some() && cased.all(char::is_lowercase)
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

/// Start of a table of contents: a line holding only its heading.
pub fn is_toc_start(line: &Line) -> bool {
    matches!(line.text.trim().to_lowercase().as_str(), "содержание" | "оглавление")
}

/// Heading of the specification itself or of its appendix.
pub fn is_tz_start(line: &Line) -> bool {
    let letters = line
        .text
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect::<String>()
        .to_lowercase();
    letters == "техническоезадание" || letters == "приложение"
}

/// Number at the start of the lowercased line without a closing bracket.
fn leading_number(text: &str) -> String {
    let number = REGEXPS_NUMBER
        .find(text)
        .map(|m| m.as_str().trim())
        .unwrap_or("");
    number
        .strip_suffix([')', '}'])
        .unwrap_or(number)
        .to_string()
}

impl LineTypeFeatureExtractor {
    /// # Errors
    /// [`DedocError::Pattern`] if a start pattern does not compile.
    pub fn new(config: LineTypeFeaturesConfig) -> Result<Self, DedocError> {
        let start_patterns = config
            .start_patterns
            .iter()
            .map(|pattern| Regex::new(pattern).context(PatternSnafu { pattern }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            start_patterns,
            list_features: ListFeaturesExtractor::new(config.list.clone()),
            first_word: FirstWordExtractor::new(config.first_word.clone()),
            config,
        })
    }

    /// Restores an extractor, fitted vocabulary included, from [`FeatureExtractor::parameters`].
    pub fn from_parameters(parameters: &serde_json::Value) -> Result<Self, DedocError> {
        let Parameters { config, first_word } =
            Parameters::deserialize(parameters).map_err(|source| DedocError::ModelLoad {
                path: "line type feature parameters".to_string(),
                message: source.to_string(),
            })?;
        let mut extractor = Self::new(config)?;
        extractor.first_word = first_word;
        Ok(extractor)
    }

    pub fn config(&self) -> &LineTypeFeaturesConfig {
        &self.config
    }

    fn one_line_features(&self, line: &Line, info: &DocumentInfo) -> Vec<(String, f64)> {
        let text = line.text.to_lowercase();
        let stripped = line.text.trim();

        let mut features = start_regexp_features(&line.text, &self.start_patterns, None);
        let mut push = |name: &str, value: f64| features.push((name.to_string(), value));

        push("named_item_regexp", flag(NAMED_ITEM.is_match(&text)));
        push("is_upper", flag(is_upper(stripped)));
        push("is_lower", flag(is_lower(stripped)));
        push(
            "day_month_regexp",
            flag(text.contains("дней")) + flag(text.contains("месяцев")),
        );
        push("year_regexp", REGEXPS_YEAR.find_iter(&text).count() as f64);

        let number = leading_number(&text);
        push("dot_number_regexp", flag(number.ends_with('.')));
        push("dot_number_regexp_len", number.split('.').count() as f64);
        let max_part = number
            .split('.')
            .filter_map(|part| part.parse::<u64>().ok())
            .max()
            .map_or(-1.0, |max| max as f64);
        push("dot_number_regexp_max", max_part);

        push("text_length", text.chars().count() as f64);
        push("words_number", text.split_whitespace().count() as f64);
        push("is_toc_line", flag(text.trim() == "содержание"));
        push(
            "is_tz_line",
            flag(text.contains("техническое") && text.contains("задание")),
        );
        push(
            "line_id",
            min_max(line.metadata.line_id as f64, 0.0, info.total_lines as f64),
        );
        push("indentation", typography::indentation(line));

        if !self.config.text_features_only {
            push("font_size", typography::font_size(line));
            push("bold", typography::bold(line));
            for (name, value) in typography::alignment(line)
                .into_iter()
                .chain(typography::style(line))
            {
                push(name, value);
            }
            push(
                "page_id",
                min_max(
                    line.metadata.page_id as f64,
                    info.start_page as f64,
                    info.finish_page as f64,
                ),
            );
        }
        features
    }

    /// Sorted feature matrix of one document, first-word block included.
    pub fn document_features(&self, lines: &[Line]) -> Result<FeatureMatrix, DedocError> {
        let text_features = self.one_document(lines)?;
        let first_word = self.first_word.one_document(lines)?;
        Ok(FeatureMatrix::hstack(vec![text_features, first_word])?.sorted())
    }

    fn one_document(&self, lines: &[Line]) -> Result<FeatureMatrix, DedocError> {
        let info = DocumentInfo {
            total_lines: lines.len(),
            start_page: lines.iter().map(|line| line.metadata.page_id).min().unwrap_or(0),
            finish_page: lines.iter().map(|line| line.metadata.page_id).max().unwrap_or(0),
        };

        let template = Line::new("", LineMetadata::new(0, 0));
        let mut columns = self
            .one_line_features(&template, &info)
            .into_iter()
            .map(|(name, _)| (name, Vec::with_capacity(lines.len())))
            .collect::<Vec<_>>();
        for line in lines {
            for ((_, column), (_, value)) in columns.iter_mut().zip(self.one_line_features(line, &info)) {
                column.push(value);
            }
        }

        let mut local = FeatureMatrix::from_columns(lines.len(), columns)?;
        local.map_column("indentation", normalize);
        let local = local.with_context(self.config.n_prev, self.config.n_next)?;

        let document = FeatureMatrix::from_columns(
            lines.len(),
            [
                ("toc", before_special_line(lines, is_toc_start)),
                ("tz", before_special_line(lines, is_tz_start)),
                ("list_item", numbered_list_features(lines)),
            ],
        )?;
        let (_, list) = self.list_features.one_document(lines)?;
        FeatureMatrix::hstack(vec![local, document, list])
    }
}

impl Default for LineTypeFeatureExtractor {
    fn default() -> Self {
        let config = LineTypeFeaturesConfig::default();
        Self {
            start_patterns: vec![
                REGEXPS_SUBITEM_EXTENDED.clone(),
                ROMAN_NUMERAL.clone(),
                BULLET.clone(),
                NAMED_ITEM.clone(),
            ],
            list_features: ListFeaturesExtractor::new(config.list.clone()),
            first_word: FirstWordExtractor::new(config.first_word.clone()),
            config,
        }
    }
}

impl FeatureExtractor for LineTypeFeatureExtractor {
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "config": self.config,
            "first_word": self.first_word.parameters(),
        })
    }

    fn fit(&mut self, documents: &[Vec<Line>]) -> Result<(), DedocError> {
        self.first_word.fit(documents)
    }

    fn transform(&self, documents: &[Vec<Line>]) -> Result<FeatureMatrix, DedocError> {
        let parts = documents
            .iter()
            .map(|document| self.one_document(document))
            .collect::<Result<Vec<_>, _>>()?;
        let text_features = if parts.is_empty() {
            self.one_document(&[])?
        } else {
            FeatureMatrix::vstack(parts)?
        };
        let first_word = self.first_word.transform(documents)?;
        Ok(FeatureMatrix::hstack(vec![text_features, first_word])?.sorted())
    }
}
