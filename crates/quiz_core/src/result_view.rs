//! Maps a stored result payload to the sections of the results page.
//!
//! Each section is derived independently; absent or empty data hides or
//! defaults that section rather than failing the whole page.

use serde::Serialize;
use shared::protocol::{DepartmentMatch, ResultPayload};

use crate::ResultsLink;

pub const APTITUDE_NAMES: [&str; 10] = [
    "Language",
    "Logic/Analysis",
    "Creativity",
    "Sociability/Empathy",
    "Initiative/Leadership",
    "Physical Activity",
    "Artistic/Spatial Sense",
    "Systematic/Meticulous",
    "Inquiry",
    "Problem Solving",
];

const RANK_MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];
const NO_TOP_DEPARTMENTS: &str = "No recommended departments.";
const NO_WORST_DEPARTMENTS: &str = "No departments to display.";
const DEFAULT_MISMATCH_REASON: &str = "May not match your aptitude.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchGrade {
    Excellent,
    Good,
    Potential,
}

impl MatchGrade {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            Self::Excellent
        } else if percentage >= 60.0 {
            Self::Good
        } else {
            Self::Potential
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Best fit",
            Self::Good => "Good fit",
            Self::Potential => "Worth exploring",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub personality: String,
    pub strength: Option<String>,
    pub interest: Option<String>,
    pub top_department: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AptitudeScore {
    pub name: &'static str,
    pub score: f64,
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopDepartmentCard {
    pub rank: String,
    pub name: String,
    pub match_percentage: f64,
    pub grade: MatchGrade,
    pub reason: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarDepartmentCard {
    pub name: String,
    pub match_percentage: f64,
    pub tags: Vec<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarSection {
    pub summary: String,
    pub cards: Vec<SimilarDepartmentCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorstDepartmentCard {
    pub name: String,
    pub match_percentage: f64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Section<T> {
    Items(Vec<T>),
    Placeholder(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub personality: String,
    pub summary: SummaryView,
    pub interest_tags: Option<Vec<String>>,
    pub aptitudes: Vec<AptitudeScore>,
    pub top_departments: Section<TopDepartmentCard>,
    pub similar_departments: Option<SimilarSection>,
    pub worst_departments: Section<WorstDepartmentCard>,
    pub share_url: String,
}

impl ResultView {
    pub fn build(payload: &ResultPayload, share_origin: &str) -> Self {
        Self {
            personality: payload.personality.clone().unwrap_or_default(),
            summary: summary_view(payload),
            interest_tags: (!payload.interest_tags.is_empty())
                .then(|| payload.interest_tags.clone()),
            aptitudes: aptitude_scores(&payload.scores),
            top_departments: top_departments(&payload.top_departments),
            similar_departments: similar_departments(&payload.similar_departments),
            worst_departments: worst_departments(&payload.worst_departments),
            share_url: ResultsLink::share_url(share_origin, &payload.id),
        }
    }
}

fn summary_view(payload: &ResultPayload) -> SummaryView {
    match &payload.summary {
        Some(summary) => SummaryView {
            personality: summary.personality.clone().unwrap_or_default(),
            strength: summary.strength.clone().filter(|s| !s.is_empty()),
            interest: summary.interest.clone().filter(|s| !s.is_empty()),
            top_department: summary.top_department.clone().filter(|s| !s.is_empty()),
        },
        None => SummaryView {
            personality: payload
                .personality
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(|p| format!("{p} type."))
                .unwrap_or_default(),
            strength: None,
            interest: None,
            top_department: None,
        },
    }
}

fn aptitude_scores(scores: &[f64]) -> Vec<AptitudeScore> {
    APTITUDE_NAMES
        .iter()
        .zip(scores)
        .map(|(name, score)| AptitudeScore {
            name,
            score: *score,
            formatted: format!("{score:.1}"),
        })
        .collect()
}

fn top_departments(departments: &[DepartmentMatch]) -> Section<TopDepartmentCard> {
    if departments.is_empty() {
        return Section::Placeholder(NO_TOP_DEPARTMENTS);
    }

    Section::Items(
        departments
            .iter()
            .enumerate()
            .map(|(index, entry)| TopDepartmentCard {
                rank: RANK_MEDALS
                    .get(index)
                    .map(|medal| medal.to_string())
                    .unwrap_or_else(|| (index + 1).to_string()),
                name: entry.department.name.clone(),
                match_percentage: entry.match_percentage,
                grade: MatchGrade::from_percentage(entry.match_percentage),
                reason: entry.reason.clone(),
                url: entry.department.url.clone(),
            })
            .collect(),
    )
}

fn similar_departments(departments: &[DepartmentMatch]) -> Option<SimilarSection> {
    if departments.is_empty() {
        return None;
    }

    let names = departments
        .iter()
        .map(|entry| entry.department.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    Some(SimilarSection {
        summary: format!("Departments matching your interests: {names}"),
        cards: departments
            .iter()
            .map(|entry| SimilarDepartmentCard {
                name: entry.department.name.clone(),
                match_percentage: entry.match_percentage,
                tags: entry.common_tags.clone().unwrap_or_default(),
                url: entry.department.url.clone(),
            })
            .collect(),
    })
}

fn worst_departments(departments: &[DepartmentMatch]) -> Section<WorstDepartmentCard> {
    if departments.is_empty() {
        return Section::Placeholder(NO_WORST_DEPARTMENTS);
    }

    Section::Items(
        departments
            .iter()
            .map(|entry| WorstDepartmentCard {
                name: entry.department.name.clone(),
                match_percentage: entry.match_percentage,
                reason: entry
                    .mismatch_reason
                    .clone()
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| DEFAULT_MISMATCH_REASON.to_string()),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use shared::{
        domain::ResultId,
        protocol::{Department, ResultSummary},
    };

    use super::*;

    fn department(name: &str, percentage: f64) -> DepartmentMatch {
        DepartmentMatch {
            department: Department {
                name: name.to_string(),
                url: Some(format!("https://example.edu/{name}")),
                category: None,
                description: None,
            },
            match_percentage: percentage,
            reason: Some("Strong logic profile".to_string()),
            mismatch_reason: None,
            common_tags: None,
        }
    }

    fn bare_payload() -> ResultPayload {
        ResultPayload {
            id: ResultId::new("r1"),
            personality: Some("Logical".to_string()),
            summary: None,
            scores: Vec::new(),
            top_departments: Vec::new(),
            similar_departments: Vec::new(),
            worst_departments: Vec::new(),
            interest_tags: Vec::new(),
            created_at: None,
        }
    }

    #[test]
    fn missing_personality_leaves_badge_empty() {
        let payload = ResultPayload {
            personality: None,
            ..bare_payload()
        };
        let view = ResultView::build(&payload, "https://quiz.example");

        assert_eq!(view.personality, "");
        assert_eq!(view.summary.personality, "");
        assert_eq!(view.share_url, "https://quiz.example/pages/result.html?id=r1");
    }

    #[test]
    fn missing_sections_degrade_instead_of_failing() {
        let view = ResultView::build(&bare_payload(), "https://quiz.example");

        assert_eq!(view.summary.personality, "Logical type.");
        assert!(view.summary.strength.is_none());
        assert!(view.interest_tags.is_none());
        assert!(view.aptitudes.is_empty());
        assert_eq!(view.top_departments, Section::Placeholder(NO_TOP_DEPARTMENTS));
        assert!(view.similar_departments.is_none());
        assert_eq!(
            view.worst_departments,
            Section::Placeholder(NO_WORST_DEPARTMENTS)
        );
        assert_eq!(
            view.share_url,
            "https://quiz.example/pages/result.html?id=r1"
        );
    }

    #[test]
    fn top_departments_get_medals_and_grades() {
        let mut payload = bare_payload();
        payload.top_departments = vec![
            department("cs", 91.5),
            department("math", 80.0),
            department("physics", 64.2),
            department("biology", 42.0),
        ];

        let Section::Items(cards) = ResultView::build(&payload, "").top_departments else {
            panic!("expected department cards");
        };
        let ranks = cards.iter().map(|c| c.rank.as_str()).collect::<Vec<_>>();
        assert_eq!(ranks, vec!["🥇", "🥈", "🥉", "4"]);
        let grades = cards.iter().map(|c| c.grade).collect::<Vec<_>>();
        assert_eq!(
            grades,
            vec![
                MatchGrade::Excellent,
                MatchGrade::Excellent,
                MatchGrade::Good,
                MatchGrade::Potential
            ]
        );
    }

    #[test]
    fn similar_section_lists_names_and_tags() {
        let mut payload = bare_payload();
        let mut design = department("design", 71.0);
        design.common_tags = Some(vec!["art".to_string(), "media".to_string()]);
        payload.similar_departments = vec![design, department("film", 55.0)];

        let section = ResultView::build(&payload, "")
            .similar_departments
            .expect("similar section");
        assert_eq!(
            section.summary,
            "Departments matching your interests: design, film"
        );
        assert_eq!(section.cards[0].tags, vec!["art", "media"]);
        assert!(section.cards[1].tags.is_empty());
    }

    #[test]
    fn worst_departments_use_default_reason() {
        let mut payload = bare_payload();
        let mut nursing = department("nursing", 12.0);
        nursing.mismatch_reason = Some("Low empathy score".to_string());
        payload.worst_departments = vec![nursing, department("law", 20.0)];

        let Section::Items(cards) = ResultView::build(&payload, "").worst_departments else {
            panic!("expected worst cards");
        };
        assert_eq!(cards[0].reason, "Low empathy score");
        assert_eq!(cards[1].reason, DEFAULT_MISMATCH_REASON);
    }

    #[test]
    fn scores_are_named_and_formatted() {
        let mut payload = bare_payload();
        payload.scores = vec![4.25, 3.0, 1.96, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 5.0];
        payload.summary = Some(ResultSummary {
            personality: Some("Logical type.".to_string()),
            strength: Some("Strong in Logic/Analysis.".to_string()),
            interest: None,
            top_department: None,
        });
        payload.interest_tags = vec!["coding".to_string()];

        let view = ResultView::build(&payload, "");
        assert_eq!(view.aptitudes.len(), 10);
        assert_eq!(view.aptitudes[0].name, "Language");
        assert_eq!(view.aptitudes[2].formatted, "2.0");
        assert_eq!(view.aptitudes[9].formatted, "5.0");
        assert_eq!(
            view.summary.strength.as_deref(),
            Some("Strong in Logic/Analysis.")
        );
        assert!(view.summary.interest.is_none());
        assert_eq!(view.interest_tags, Some(vec!["coding".to_string()]));
    }
}
