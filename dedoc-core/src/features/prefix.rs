use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    features::patterns::{BULLET, full_match},
    layout::element::{Annotation, Line},
};

static DOTTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)*\.?$").expect("valid dotted prefix regex"));

static BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\)$").expect("valid bracket prefix regex"));

static LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Zа-яА-ЯёЁ]\)$").expect("valid letter prefix regex"));

const LATIN: &str = "abcdefghijklmnopqrstuvwxyz";
const CYRILLIC: &str = "абвгдеёжзийклмнопрстуфхцчшщъыьэюя";

/// Kind of list marker a line starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixKind {
    /// `-`, `*`, `•` and similar symbols.
    Bullet,
    /// `a)`, `б)`
    Letter,
    /// `1)`
    Bracket,
    /// `1`, `1.`, `1.2.3`
    Dotted,
    Empty,
}

impl PrefixKind {
    pub fn is_valid(&self, prefix: &str) -> bool {
        match self {
            PrefixKind::Bullet => full_match(&BULLET, prefix),
            PrefixKind::Letter => LETTER.is_match(prefix),
            PrefixKind::Bracket => BRACKET.is_match(prefix),
            PrefixKind::Dotted => DOTTED.is_match(prefix),
            PrefixKind::Empty => true,
        }
    }
}

/// The list marker of a line together with the line's indentation.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePrefix {
    pub kind: PrefixKind,
    pub prefix: String,
    pub indent: f64,
}

impl LinePrefix {
    /// Kinds tried in order when a line is parsed.
    pub const KINDS: [PrefixKind; 4] = [
        PrefixKind::Bullet,
        PrefixKind::Letter,
        PrefixKind::Bracket,
        PrefixKind::Dotted,
    ];

    /// Creates a prefix of the given kind, `None` if `prefix` is not valid for it.
    pub fn new(kind: PrefixKind, prefix: &str, indent: f64) -> Option<Self> {
        kind.is_valid(prefix).then(|| Self {
            kind,
            prefix: prefix.to_string(),
            indent,
        })
    }

    pub fn empty(indent: f64) -> Self {
        Self {
            kind: PrefixKind::Empty,
            prefix: String::new(),
            indent,
        }
    }

    /// Prefix of a line: the first word of the stripped text if it is a valid
    /// marker of some kind, the empty prefix otherwise.
    ///
    /// # Example
    /// ```
    /// use dedoc_core::features::prefix::{LinePrefix, PrefixKind};
    /// use dedoc_core::layout::element::{Line, LineMetadata};
    /// let line = Line::new("\t1.3. some text", LineMetadata::new(0, 0));
    /// let prefix = LinePrefix::of_line(&line);
    /// assert_eq!((prefix.kind, prefix.prefix.as_str()), (PrefixKind::Dotted, "1.3."));
    /// ```
    pub fn of_line(line: &Line) -> Self {
        let indent = line_indent(line);
        let Some(first_word) = line.text.split_whitespace().next() else {
            return Self::empty(indent);
        };

        Self::KINDS
            .iter()
            .find_map(|&kind| Self::new(kind, first_word, indent))
            .unwrap_or_else(|| Self::empty(indent))
    }

    /// Whether `other` may be the item directly before this one in a list.
    pub fn predecessor(&self, other: &LinePrefix) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match self.kind {
            PrefixKind::Bullet => self.prefix == other.prefix,
            PrefixKind::Letter => letter_predecessor(&self.prefix, &other.prefix),
            PrefixKind::Bracket => {
                match (bracket_number(&self.prefix), bracket_number(&other.prefix)) {
                    (Some(this), Some(other)) => this == other + 1,
                    _ => false,
                }
            }
            PrefixKind::Dotted => dotted_predecessor(&self.prefix, &other.prefix),
            PrefixKind::Empty => false,
        }
    }

    pub fn successor(&self, other: &LinePrefix) -> bool {
        other.predecessor(self)
    }
}

/// Indentation annotation of the line, else the left border of its box, else 0.
pub fn line_indent(line: &Line) -> f64 {
    line.annotations_named(Annotation::INDENTATION)
        .find_map(|annotation| annotation.value.trim().parse::<f64>().ok())
        .or_else(|| line.bbox().map(|bbox| bbox.x_top_left as f64))
        .unwrap_or(0.0)
}

fn bracket_number(prefix: &str) -> Option<u64> {
    prefix.trim_end_matches(')').parse().ok()
}

fn letter_position(letter: char) -> Option<(&'static str, usize)> {
    let lower = letter.to_lowercase().next()?;
    [LATIN, CYRILLIC].into_iter().find_map(|alphabet| {
        alphabet
            .chars()
            .position(|c| c == lower)
            .map(|position| (alphabet, position))
    })
}

fn letter_predecessor(this: &str, other: &str) -> bool {
    let (Some(this), Some(other)) = (this.chars().next(), other.chars().next()) else {
        return false;
    };
    if this.is_uppercase() != other.is_uppercase() {
        return false;
    }
    let (Some((this_alphabet, this_pos)), Some((other_alphabet, other_pos))) =
        (letter_position(this), letter_position(other))
    else {
        return false;
    };
    if this_alphabet != other_alphabet {
        return false;
    }
    if this_pos == other_pos + 1 {
        return true;
    }
    // `ё` is often skipped in cyrillic lists
    this_alphabet == CYRILLIC && this.to_lowercase().eq(['ж']) && other.to_lowercase().eq(['е'])
}

fn dotted_parts(prefix: &str) -> Option<Vec<u64>> {
    prefix
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().ok())
        .collect()
}

fn dotted_predecessor(this: &str, other: &str) -> bool {
    let (Some(this), Some(other)) = (dotted_parts(this), dotted_parts(other)) else {
        return false;
    };
    let Some((&this_last, this_head)) = this.split_last() else {
        return false;
    };

    if this.len() == other.len() + 1 {
        // 1.1 opens a new depth under 1
        return this_head == other.as_slice() && this_last == 1;
    }
    if this.len() <= other.len() {
        // 1.2 follows 1.1 as well as any deeper 1.1.x
        let depth = this.len() - 1;
        return this_head == &other[..depth] && this_last == other[depth] + 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::element::LineMetadata;

    fn prefix(kind: PrefixKind, text: &str) -> LinePrefix {
        LinePrefix::new(kind, text, 0.0).unwrap()
    }

    fn line(text: &str, indent: i64) -> Line {
        let len = text.chars().count();
        Line::new(text, LineMetadata::new(0, 0))
            .with_annotation(Annotation::new(0, len, Annotation::INDENTATION, indent.to_string()))
            .unwrap()
    }

    const VALID_DOTTED: [&str; 5] = ["1.1", "1.1.", "1.1.2", "1.", "1"];
    const VALID_BRACKET: [&str; 4] = ["1)", "2)", "11231)", "11)"];
    const VALID_LETTER: [&str; 7] = ["a)", "b)", "c)", "z)", "у)", "ё)", "ъ)"];
    const VALID_BULLET: [&str; 5] = ["*", "+", "?", "-", "#"];
    const INVALID: [&str; 5] = ["\t", "", "aa", "some word", "1.a.2"];

    fn check_valid(kind: PrefixKind, valid: &[&str]) {
        let all = VALID_DOTTED
            .iter()
            .chain(VALID_BRACKET.iter())
            .chain(VALID_LETTER.iter())
            .chain(VALID_BULLET.iter())
            .chain(INVALID.iter());
        for text in all {
            assert_eq!(
                kind.is_valid(text),
                valid.contains(text),
                "`{text}` validity for {kind:?}"
            );
        }
    }

    #[test]
    fn test_prefix_validity() {
        check_valid(PrefixKind::Dotted, &VALID_DOTTED);
        check_valid(PrefixKind::Bracket, &VALID_BRACKET);
        check_valid(PrefixKind::Letter, &VALID_LETTER);
        check_valid(PrefixKind::Bullet, &VALID_BULLET);
        assert!(PrefixKind::Empty.is_valid("some word"));
    }

    #[test]
    fn test_mixed_kinds_are_never_predecessors() {
        let mixed = [
            prefix(PrefixKind::Dotted, "1."),
            prefix(PrefixKind::Bracket, "1)"),
            LinePrefix::empty(0.0),
            prefix(PrefixKind::Letter, "a)"),
            prefix(PrefixKind::Bullet, "-"),
        ];
        for first in &mixed {
            for second in &mixed {
                if first != second {
                    assert!(!first.predecessor(second));
                }
            }
        }
    }

    #[test]
    fn test_bullet_predecessor() {
        let star = prefix(PrefixKind::Bullet, "*");
        let minus = prefix(PrefixKind::Bullet, "-");
        assert!(star.predecessor(&star.clone()));
        assert!(!star.predecessor(&minus));
    }

    fn check_three(one: &LinePrefix, two: &LinePrefix, three: &LinePrefix) {
        assert!(two.predecessor(one));
        assert!(three.predecessor(two));
        assert!(!one.predecessor(one));
        assert!(!one.predecessor(two));
        assert!(!one.predecessor(three));
        assert!(!three.predecessor(one));
    }

    #[test]
    fn test_bracket_and_letter_predecessor() {
        check_three(
            &prefix(PrefixKind::Bracket, "1)"),
            &prefix(PrefixKind::Bracket, "2)"),
            &prefix(PrefixKind::Bracket, "3)"),
        );
        check_three(
            &prefix(PrefixKind::Letter, "A)"),
            &prefix(PrefixKind::Letter, "B)"),
            &prefix(PrefixKind::Letter, "C)"),
        );
        check_three(
            &prefix(PrefixKind::Letter, "а)"),
            &prefix(PrefixKind::Letter, "б)"),
            &prefix(PrefixKind::Letter, "в)"),
        );
        // with and without ё
        assert!(prefix(PrefixKind::Letter, "ж)").predecessor(&prefix(PrefixKind::Letter, "ё)")));
        assert!(prefix(PrefixKind::Letter, "ж)").predecessor(&prefix(PrefixKind::Letter, "е)")));
        assert!(prefix(PrefixKind::Letter, "Ж)").predecessor(&prefix(PrefixKind::Letter, "Е)")));
        assert!(!prefix(PrefixKind::Letter, "b)").predecessor(&prefix(PrefixKind::Letter, "а)")));
    }

    #[test]
    fn test_dotted_predecessor() {
        let dotted = |text| prefix(PrefixKind::Dotted, text);
        assert!(dotted("2.").predecessor(&dotted("1.")));
        assert!(!dotted("1.").predecessor(&dotted("2.")));
        assert!(!dotted("3.").predecessor(&dotted("1.")));

        assert!(dotted("1.2.").predecessor(&dotted("1.1.")));
        assert!(!dotted("1.3.").predecessor(&dotted("1.1.")));
        assert!(!dotted("1.1.").predecessor(&dotted("1.1.")));

        assert!(dotted("1.1.").predecessor(&dotted("1.")));
        assert!(!dotted("1.").predecessor(&dotted("1.1.")));
        assert!(!dotted("1.2.").predecessor(&dotted("1.")));

        assert!(dotted("1.2.").predecessor(&dotted("1.1.1")));
        assert!(dotted("1.2.").predecessor(&dotted("1.1.2.1.2.1")));
        assert!(!dotted("1.1.1").predecessor(&dotted("1.2.")));
        assert!(!dotted("1.2.1.1.1.").predecessor(&dotted("1.2.1.")));
    }

    #[test]
    fn test_prefix_of_line() {
        let of = |text| LinePrefix::of_line(&line(text, 10));

        assert_eq!(of("1) some text"), prefix_with_indent(PrefixKind::Bracket, "1)"));
        assert_eq!(of("   3) some text"), prefix_with_indent(PrefixKind::Bracket, "3)"));
        assert_eq!(of("1 some text"), prefix_with_indent(PrefixKind::Dotted, "1"));
        assert_eq!(of("\n1.3. some text"), prefix_with_indent(PrefixKind::Dotted, "1.3."));
        assert_eq!(of("   1.2.3 some text"), prefix_with_indent(PrefixKind::Dotted, "1.2.3"));
        assert_eq!(of("\tё) some text"), prefix_with_indent(PrefixKind::Letter, "ё)"));
        assert_eq!(of("+ some text"), prefix_with_indent(PrefixKind::Bullet, "+"));
        assert_eq!(of(" some text"), LinePrefix::empty(10.0));
        assert_eq!(of(""), LinePrefix::empty(10.0));
    }

    fn prefix_with_indent(kind: PrefixKind, text: &str) -> LinePrefix {
        LinePrefix::new(kind, text, 10.0).unwrap()
    }
}
