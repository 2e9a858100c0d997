use std::sync::LazyLock;

use regex::Regex;

const REGISTRATION_PATTERN: &str = r"^(?:\d{10,}|[A-Z]{1,3}\d{5,}|\d{4}[A-Z]{2}\d{4})";
const SUBJECT_CODE_PATTERN: &str = r"^[A-Z]{2,4}\d{3,6}[A-Z]?$";
const STRICT_SUBJECT_CODE_PATTERN: &str = r"^[A-Z]{2,4}\d{4}$";
const GRADE_LETTER_PATTERN: &str = r"(?i)^[A-F][+-]?$";
const STUDENT_NAME_PATTERN: &str = r"^[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+$";
const MARKS_PATTERN: &str = r"^\d{1,3}(?:\.\d+)?$";
const HEADER_KEYWORD_PATTERN: &str = r"(?i)roll|name|student|subject|mark|grade|score|reg|id|no|sno|sl";
const REPEATED_HEADER_PATTERN: &str = r"(?i)roll|name|student|subject|mark|grade|score|reg|id|no";
const EXAM_KEYWORD_PATTERN: &str =
    r"(?i)reg|registration|student|name|subject|mark|grade|result|examination";
const LONG_NUMBER_PATTERN: &str = r"\d{10,}";
const THREE_WORD_NAME_PATTERN: &str = r"\b[A-Z][A-Za-z.]+\s+[A-Z][A-Za-z.]+\s+[A-Z][A-Za-z.]+\b";

const GRADE_TOKENS: &[&str] = &[
    "PASS", "FAIL", "ABSENT", "AB", "U", "O", "A+", "A", "B+", "B", "C", "P", "RA", "W", "I",
];

const BOILERPLATE_PHRASES: &[&str] = &[
    "university",
    "bonafide",
    "certificate",
    "consolidated statement",
    "statement of marks",
    "controller of examinations",
    "office of the",
    "this is to certify",
    "principal",
    "page no",
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("hardcoded classifier regex is valid")
}

static REGISTRATION_RE: LazyLock<Regex> = LazyLock::new(|| compile(REGISTRATION_PATTERN));
static SUBJECT_CODE_RE: LazyLock<Regex> = LazyLock::new(|| compile(SUBJECT_CODE_PATTERN));
static STRICT_SUBJECT_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(STRICT_SUBJECT_CODE_PATTERN));
static GRADE_LETTER_RE: LazyLock<Regex> = LazyLock::new(|| compile(GRADE_LETTER_PATTERN));
static STUDENT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| compile(STUDENT_NAME_PATTERN));
static MARKS_RE: LazyLock<Regex> = LazyLock::new(|| compile(MARKS_PATTERN));
static HEADER_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| compile(HEADER_KEYWORD_PATTERN));
static REPEATED_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| compile(REPEATED_HEADER_PATTERN));
static EXAM_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| compile(EXAM_KEYWORD_PATTERN));
static LONG_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| compile(LONG_NUMBER_PATTERN));
static THREE_WORD_NAME_RE: LazyLock<Regex> = LazyLock::new(|| compile(THREE_WORD_NAME_PATTERN));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    SerialNumber,
    RegistrationNumber,
    StudentName,
    SubjectCode,
    Grade,
    Marks,
    Other,
}

impl FieldKind {
    #[must_use]
    pub const fn canonical_label(self) -> &'static str {
        match self {
            Self::SerialNumber => "S.No",
            Self::RegistrationNumber => "Registration Number",
            Self::StudentName => "Student Name",
            Self::SubjectCode => "Subject Code",
            Self::Grade => "Grade",
            Self::Marks => "Marks",
            Self::Other => "Value",
        }
    }

    #[must_use]
    pub const fn header_keywords(self) -> &'static [&'static str] {
        match self {
            Self::SerialNumber => &["s.no", "sno", "s no", "serial", "sl"],
            Self::RegistrationNumber => &["reg", "number", "roll"],
            Self::StudentName => &["name", "student"],
            Self::SubjectCode => &["subject", "code", "course"],
            Self::Grade => &["grade", "result"],
            Self::Marks => &["mark", "score", "total"],
            Self::Other => &[],
        }
    }
}

#[must_use]
pub fn clean_text(value: &str) -> String {
    value
        .chars()
        .map(|ch| if ch.is_whitespace() { ' ' } else { ch })
        .filter(|ch| !ch.is_control() && *ch != '\u{FFFD}' && *ch != '\u{FEFF}')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[must_use]
pub fn is_registration_number(value: &str) -> bool {
    REGISTRATION_RE.is_match(value.trim())
}

#[must_use]
pub fn is_subject_code(value: &str) -> bool {
    let value = value.trim();
    SUBJECT_CODE_RE.is_match(value) && !is_registration_number(value)
}

#[must_use]
pub fn is_strict_subject_code(value: &str) -> bool {
    let value = value.trim();
    STRICT_SUBJECT_CODE_RE.is_match(value) && !is_registration_number(value)
}

#[must_use]
pub fn is_grade(value: &str) -> bool {
    let value = value.trim();
    if GRADE_LETTER_RE.is_match(value) {
        return true;
    }
    let upper = value.to_uppercase();
    GRADE_TOKENS.contains(&upper.as_str())
}

#[must_use]
pub fn is_student_name(value: &str) -> bool {
    STUDENT_NAME_RE.is_match(value.trim())
}

#[must_use]
pub fn is_marks(value: &str) -> bool {
    let value = value.trim();
    MARKS_RE.is_match(value) && !is_registration_number(value) && !is_subject_code(value)
}

pub(crate) fn is_serial_number(value: &str) -> bool {
    let value = value.trim();
    (1..=3).contains(&value.len()) && value.chars().all(|ch| ch.is_ascii_digit())
}

#[must_use]
pub fn classify_value(value: &str) -> FieldKind {
    let value = value.trim();
    if value.is_empty() {
        FieldKind::Other
    } else if is_registration_number(value) {
        FieldKind::RegistrationNumber
    } else if is_subject_code(value) {
        FieldKind::SubjectCode
    } else if is_grade(value) {
        FieldKind::Grade
    } else if is_student_name(value) {
        FieldKind::StudentName
    } else if is_marks(value) {
        FieldKind::Marks
    } else {
        FieldKind::Other
    }
}

#[must_use]
pub fn merge_cell_text(existing: &str, addition: &str) -> String {
    let existing = existing.trim();
    let addition = addition.trim();
    if existing.is_empty() {
        return addition.to_string();
    }
    if addition.is_empty() {
        return existing.to_string();
    }

    let glued = format!("{existing}{addition}");
    let both_digits = existing.chars().all(|ch| ch.is_ascii_alphanumeric())
        && addition.chars().all(|ch| ch.is_ascii_digit());
    if both_digits && is_registration_number(&glued) && !is_registration_number(existing) {
        return glued;
    }

    format!("{existing} {addition}")
}

pub(crate) fn has_header_keyword(value: &str) -> bool {
    HEADER_KEYWORD_RE.is_match(value)
}

pub(crate) fn has_repeated_header_keyword(value: &str) -> bool {
    REPEATED_HEADER_RE.is_match(value)
}

pub(crate) fn has_exam_keyword(value: &str) -> bool {
    EXAM_KEYWORD_RE.is_match(value)
}

pub(crate) fn has_long_number(value: &str) -> bool {
    LONG_NUMBER_RE.is_match(value)
}

pub(crate) fn has_three_word_name(value: &str) -> bool {
    THREE_WORD_NAME_RE.is_match(value)
}

#[must_use]
pub fn is_boilerplate(line: &str) -> bool {
    let lowered = line.to_lowercase();
    BOILERPLATE_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

pub(crate) fn is_purely_numeric(value: &str) -> bool {
    let trimmed = value.trim().replace(',', "");
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::{
        FieldKind, clean_text, classify_value, is_boilerplate, is_grade, is_marks,
        is_registration_number, is_strict_subject_code, is_student_name, is_subject_code,
        merge_cell_text,
    };

    #[test]
    fn recognizes_registration_number_shapes() {
        assert!(is_registration_number("7122201040123"));
        assert!(is_registration_number("CS123456"));
        assert!(is_registration_number("2021CS0042"));
        assert!(!is_registration_number("12345"));
        assert!(!is_registration_number("CS101"));
    }

    #[test]
    fn subject_codes_exclude_registration_numbers() {
        assert!(is_subject_code("CS101"));
        assert!(is_subject_code("MA2101A"));
        assert!(!is_subject_code("CSE123456"));
        assert!(is_strict_subject_code("CS3401"));
        assert!(!is_strict_subject_code("CS101"));
    }

    #[test]
    fn grades_cover_letters_and_tokens() {
        for grade in ["A", "B+", "c-", "pass", "RA", "Absent", "O"] {
            assert!(is_grade(grade), "{grade} should be a grade");
        }
        assert!(!is_grade("G"));
        assert!(!is_grade("PASSED"));
    }

    #[test]
    fn student_names_need_two_capitalised_words() {
        assert!(is_student_name("Jane Doe"));
        assert!(is_student_name("Arun Kumar Raj"));
        assert!(!is_student_name("Jane"));
        assert!(!is_student_name("JANE DOE"));
    }

    #[test]
    fn marks_exclude_codes() {
        assert!(is_marks("87"));
        assert!(is_marks("99.5"));
        assert!(!is_marks("1234"));
    }

    #[test]
    fn classification_prefers_registration_over_marks() {
        assert_eq!(classify_value("7122201040123"), FieldKind::RegistrationNumber);
        assert_eq!(classify_value("CS101"), FieldKind::SubjectCode);
        assert_eq!(classify_value("B"), FieldKind::Grade);
        assert_eq!(classify_value("Jane Doe"), FieldKind::StudentName);
        assert_eq!(classify_value("76"), FieldKind::Marks);
        assert_eq!(classify_value("Semester V"), FieldKind::Other);
    }

    #[test]
    fn cleaning_is_idempotent() {
        for value in ["  REG   NO\t", "Jane\u{0007} Doe", "plain", "", "a\u{FFFD}b  c"] {
            let once = clean_text(value);
            assert_eq!(clean_text(&once), once);
        }
        assert_eq!(clean_text("plain text"), "plain text");
        assert_eq!(clean_text(" REG \n NO "), "REG NO");
    }

    #[test]
    fn merges_split_registration_digits() {
        assert_eq!(merge_cell_text("71222010", "40123"), "7122201040123");
        assert_eq!(merge_cell_text("JOHN", "SMITH"), "JOHN SMITH");
        assert_eq!(merge_cell_text("", "A"), "A");
    }

    #[test]
    fn flags_institutional_boilerplate() {
        assert!(is_boilerplate("ANNA UNIVERSITY BONAFIDE CERTIFICATE"));
        assert!(is_boilerplate("Consolidated Statement of Grades"));
        assert!(!is_boilerplate("ROLL NAME GRADE"));
    }
}
