// src/filter.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{EvaluationResult, Grade};

/// Sentinel accepted in query strings for "no restriction".
pub const ALL: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradeFilter {
    #[default]
    All,
    Only(Grade),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QuestionFilter {
    #[default]
    All,
    Only(String),
}

impl GradeFilter {
    /// Parses `ALL` (or nothing) or one of the grade names.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") => Some(GradeFilter::All),
            Some(value) if value.eq_ignore_ascii_case(ALL) => Some(GradeFilter::All),
            Some(value) => Grade::parse(value).map(GradeFilter::Only),
        }
    }

    fn matches(&self, grade: Grade) -> bool {
        match self {
            GradeFilter::All => true,
            GradeFilter::Only(wanted) => *wanted == grade,
        }
    }
}

impl QuestionFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some(ALL) => QuestionFilter::All,
            Some(question) => QuestionFilter::Only(question.to_string()),
        }
    }

    fn matches(&self, question: &str) -> bool {
        match self {
            QuestionFilter::All => true,
            QuestionFilter::Only(wanted) => wanted == question,
        }
    }
}

/// Grade, question and free-text criteria applied together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultFilter {
    pub grade: GradeFilter,
    pub question: QuestionFilter,
    pub search: String,
}

impl ResultFilter {
    pub fn new(grade: GradeFilter, question: QuestionFilter, search: impl Into<String>) -> Self {
        Self { grade, question, search: search.into() }
    }

    pub fn matches(&self, result: &EvaluationResult) -> bool {
        self.matches_lowered(result, &self.search.to_lowercase())
    }

    /// Keeps the matching results, in their original order.
    pub fn apply<'a>(&self, results: &'a [EvaluationResult]) -> Vec<&'a EvaluationResult> {
        let needle = self.search.to_lowercase();
        results.iter().filter(|r| self.matches_lowered(r, &needle)).collect()
    }

    fn matches_lowered(&self, result: &EvaluationResult, needle: &str) -> bool {
        self.grade.matches(result.grade)
            && self.question.matches(&result.question)
            && matches_search(result, needle)
    }
}

/// `needle` must already be lowercased.
fn matches_search(result: &EvaluationResult, needle: &str) -> bool {
    needle.is_empty()
        || [&result.bot_answer, &result.reference_answer, &result.justification]
            .iter()
            .any(|text| text.to_lowercase().contains(needle))
}

/// Every question present in `results`, sorted ascending.
pub fn distinct_questions(results: &[EvaluationResult]) -> Vec<String> {
    results
        .iter()
        .map(|r| r.question.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeShare {
    pub grade: Grade,
    pub count: usize,
    pub percentage: u32,
}

/// Per-grade counts over the fixed grade set, in `Grade::ALL` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeDistribution {
    pub total: usize,
    pub grades: Vec<GradeShare>,
}

impl GradeDistribution {
    pub fn get(&self, grade: Grade) -> Option<&GradeShare> {
        self.grades.iter().find(|share| share.grade == grade)
    }
}

pub fn grade_distribution(results: &[EvaluationResult]) -> GradeDistribution {
    let total = results.len();
    let grades = Grade::ALL
        .into_iter()
        .map(|grade| {
            let count = results.iter().filter(|r| r.grade == grade).count();
            GradeShare { grade, count, percentage: rounded_percentage(count, total) }
        })
        .collect();
    GradeDistribution { total, grades }
}

/// round(count / total * 100) with halves rounded up, 0 for an empty set.
fn rounded_percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count * 100 + total / 2) / total) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(org: &str, question: &str, grade: Grade, bot: &str, justification: &str) -> EvaluationResult {
        EvaluationResult {
            organization_id: org.to_string(),
            question: question.to_string(),
            bot_answer: bot.to_string(),
            reference_answer: "Sunday services at 9am and 11am".to_string(),
            grade,
            soft_match: grade == Grade::A,
            justification: justification.to_string(),
            timestamp: None,
        }
    }

    fn sample() -> Vec<EvaluationResult> {
        vec![
            result("1", "What time is service?", Grade::A, "Service is at 9am", "Exact match"),
            result("2", "What time is service?", Grade::F, "I don't know", "No times given"),
            result("1", "Where do you meet?", Grade::NotApplicable, "Main street", "No reference"),
            result("3", "Is there parking?", Grade::C, "Yes, behind the HALL", "Partially correct"),
        ]
    }

    #[test]
    fn test_identity_filter_keeps_everything_in_order() {
        let results = sample();
        let kept = ResultFilter::default().apply(&results);
        let kept: Vec<EvaluationResult> = kept.into_iter().cloned().collect();
        assert_eq!(kept, results);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let results = sample();
        let filters = [
            ResultFilter::new(GradeFilter::Only(Grade::A), QuestionFilter::All, ""),
            ResultFilter::new(GradeFilter::All, QuestionFilter::Only("What time is service?".into()), ""),
            ResultFilter::new(GradeFilter::All, QuestionFilter::All, "no"),
            ResultFilter::new(GradeFilter::Only(Grade::F), QuestionFilter::All, "times"),
        ];
        for filter in filters {
            let once: Vec<EvaluationResult> = filter.apply(&results).into_iter().cloned().collect();
            let twice: Vec<EvaluationResult> = filter.apply(&once).into_iter().cloned().collect();
            assert_eq!(once, twice, "filter {:?}", filter);
        }
    }

    #[test]
    fn test_search_is_case_insensitive_across_three_fields() {
        let results = sample();

        let kept = ResultFilter::new(GradeFilter::All, QuestionFilter::All, "9AM").apply(&results);
        // The reference answer of every sample mentions 9am.
        assert_eq!(kept.len(), 4);

        let kept = ResultFilter::new(GradeFilter::All, QuestionFilter::All, "hall").apply(&results);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].organization_id, "3");

        let kept = ResultFilter::new(GradeFilter::All, QuestionFilter::All, "no reference").apply(&results);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].question, "Where do you meet?");
    }

    #[test]
    fn test_search_9am_scenario() {
        let mut with = result("1", "What time is service?", Grade::A, "Service is at 9am", "ok");
        with.reference_answer = "Sunday".to_string();
        let mut without = result("2", "What time is service?", Grade::F, "Service is at ten", "late");
        without.reference_answer = "Sunday".to_string();
        let results = vec![with.clone(), without];

        let kept = ResultFilter::new(GradeFilter::All, QuestionFilter::All, "9am").apply(&results);
        assert_eq!(kept, vec![&with]);
    }

    #[test]
    fn test_criteria_combine() {
        let results = sample();
        let filter = ResultFilter::new(
            GradeFilter::Only(Grade::A),
            QuestionFilter::Only("What time is service?".to_string()),
            "exact",
        );
        let kept = filter.apply(&results);
        assert_eq!(kept.len(), 1);
        assert!(filter.matches(kept[0]));
        assert!(!filter.matches(&results[1]));
    }

    #[test]
    fn test_distinct_questions_sorted() {
        assert_eq!(
            distinct_questions(&sample()),
            vec!["Is there parking?", "What time is service?", "Where do you meet?"]
        );
        assert!(distinct_questions(&[]).is_empty());
    }

    #[test]
    fn test_distribution_counts_sum_to_total() {
        let results = sample();
        let dist = grade_distribution(&results);
        assert_eq!(dist.total, 4);
        assert_eq!(dist.grades.len(), 6);
        assert_eq!(dist.grades.iter().map(|s| s.count).sum::<usize>(), results.len());
        assert_eq!(dist.get(Grade::A).unwrap().percentage, 25);
        assert_eq!(dist.get(Grade::B).unwrap().percentage, 0);
        assert_eq!(dist.get(Grade::NotApplicable).unwrap().count, 1);
    }

    #[test]
    fn test_distribution_rounding() {
        assert_eq!(rounded_percentage(1, 3), 33);
        assert_eq!(rounded_percentage(2, 3), 67);
        assert_eq!(rounded_percentage(1, 8), 13);
        assert_eq!(rounded_percentage(0, 0), 0);

        let empty = grade_distribution(&[]);
        assert_eq!(empty.total, 0);
        assert!(empty.grades.iter().all(|s| s.count == 0 && s.percentage == 0));
    }

    #[test]
    fn test_parse_query_filters() {
        assert_eq!(GradeFilter::parse(None), Some(GradeFilter::All));
        assert_eq!(GradeFilter::parse(Some("ALL")), Some(GradeFilter::All));
        assert_eq!(GradeFilter::parse(Some("N/A")), Some(GradeFilter::Only(Grade::NotApplicable)));
        assert_eq!(GradeFilter::parse(Some("Z")), None);

        assert_eq!(QuestionFilter::parse(Some("ALL")), QuestionFilter::All);
        assert_eq!(
            QuestionFilter::parse(Some("Is there parking?")),
            QuestionFilter::Only("Is there parking?".to_string())
        );
    }
}
