//! Terminal adapter: turns flow events and result views into text.

use std::fmt::Write as _;

use quiz_core::{
    result_view::{Section, SummaryView},
    FlowEvent, NextAction, QuestionView, ResultView,
};

pub fn render_event(event: &FlowEvent) -> Option<String> {
    match event {
        FlowEvent::Render(view) => Some(render_question(view)),
        FlowEvent::NeedAnswer { cursor } => Some(format!(
            "Please answer question {} before continuing.",
            cursor + 1
        )),
        FlowEvent::Stalled => Some("Still there? Pick an answer from 1 to 5.".to_string()),
        FlowEvent::Resumed => None,
        FlowEvent::Submitting => Some("Analysing your answers...".to_string()),
        FlowEvent::Completed(link) => Some(format!("Your result is ready: {}", link.href)),
        FlowEvent::Notice(notice) if notice.retryable => {
            Some(format!("Error: {} Type 's' to retry.", notice.message))
        }
        FlowEvent::Notice(notice) => Some(format!("Error: {}", notice.message)),
    }
}

pub fn render_question(view: &QuestionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nQUESTION {}", view.number);
    let _ = writeln!(out, "{}", view.text);
    for option in &view.options {
        let marker = if option.selected { '*' } else { ' ' };
        let _ = writeln!(
            out,
            " {marker}[{}] {} {}",
            option.value, option.icon, option.label
        );
    }

    let mut controls = Vec::new();
    if view.can_go_back {
        controls.push("[p] back");
    }
    if view.can_go_next {
        controls.push(match view.next_action {
            NextAction::Next => "[n] next",
            NextAction::ShowResults => "[n] show results",
        });
    }
    let _ = write!(
        out,
        "{} · {}%",
        view.progress.label(),
        view.progress.percent
    );
    if !controls.is_empty() {
        let _ = write!(out, "   {}", controls.join("  "));
    }
    out
}

pub fn render_result(view: &ResultView) -> String {
    let mut out = String::new();
    if !view.personality.is_empty() {
        let _ = writeln!(out, "== {} ==", view.personality);
    }
    render_summary(&mut out, &view.summary);

    if let Some(tags) = &view.interest_tags {
        let _ = writeln!(out, "\nInterests: {}", tags.join(", "));
    }

    if !view.aptitudes.is_empty() {
        let _ = writeln!(out, "\nAptitudes");
        for aptitude in &view.aptitudes {
            let _ = writeln!(out, "  {:<24} {}", aptitude.name, aptitude.formatted);
        }
    }

    let _ = writeln!(out, "\nRecommended departments");
    match &view.top_departments {
        Section::Items(cards) => {
            for card in cards {
                let _ = writeln!(
                    out,
                    "  {} {} - {}% ({})",
                    card.rank,
                    card.name,
                    card.match_percentage,
                    card.grade.label()
                );
                if let Some(reason) = &card.reason {
                    let _ = writeln!(out, "     {reason}");
                }
                if let Some(url) = &card.url {
                    let _ = writeln!(out, "     {url}");
                }
            }
        }
        Section::Placeholder(text) => {
            let _ = writeln!(out, "  {text}");
        }
    }

    if let Some(similar) = &view.similar_departments {
        let _ = writeln!(out, "\n{}", similar.summary);
        for card in &similar.cards {
            let _ = write!(out, "  {} - {}% match", card.name, card.match_percentage);
            if !card.tags.is_empty() {
                let _ = write!(out, " [{}]", card.tags.join(", "));
            }
            let _ = writeln!(out);
        }
    }

    let _ = writeln!(out, "\nLess suited departments");
    match &view.worst_departments {
        Section::Items(cards) => {
            for card in cards {
                let _ = writeln!(
                    out,
                    "  {} - {}% match: {}",
                    card.name, card.match_percentage, card.reason
                );
            }
        }
        Section::Placeholder(text) => {
            let _ = writeln!(out, "  {text}");
        }
    }

    let _ = write!(out, "\nShare: {}", view.share_url);
    out
}

fn render_summary(out: &mut String, summary: &SummaryView) {
    if !summary.personality.is_empty() {
        let _ = writeln!(out, "{}", summary.personality);
    }
    for line in [&summary.strength, &summary.interest, &summary.top_department]
        .into_iter()
        .flatten()
    {
        let _ = writeln!(out, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use quiz_core::{question_view, AnswerSet, NoticeKind, UserNotice};
    use shared::{
        domain::{Likert, Question, ResultId},
        protocol::ResultPayload,
    };

    use super::*;

    #[test]
    fn question_render_marks_selection_and_controls() {
        let questions = vec![
            Question::new(Some(1), "I like puzzles"),
            Question::new(Some(2), "I like painting"),
        ];
        let mut answers = AnswerSet::unanswered(2);
        answers.set(0, Likert::new(1).expect("likert"));
        answers.set(1, Likert::new(4).expect("likert"));
        let view = question_view(&questions, &answers, 1).expect("view");

        let text = render_question(&view);
        assert!(text.contains("QUESTION 2"));
        assert!(text.contains(" *[4] 😊 Agree"));
        assert!(text.contains("  [1] 😞 Strongly disagree"));
        assert!(text.contains("Question 2 / 2 · 100%"));
        assert!(text.contains("[p] back  [n] show results"));
    }

    #[test]
    fn resumed_is_silent_and_retryable_notice_mentions_retry() {
        assert_eq!(render_event(&FlowEvent::Resumed), None);
        let notice = FlowEvent::Notice(UserNotice {
            kind: NoticeKind::SubmissionFailed,
            message: "Failed to save your result.".to_string(),
            retryable: true,
        });
        assert_eq!(
            render_event(&notice).as_deref(),
            Some("Error: Failed to save your result. Type 's' to retry.")
        );
    }

    #[test]
    fn result_render_shows_placeholders_for_empty_sections() {
        let payload = ResultPayload {
            id: ResultId::new("r1"),
            personality: Some("Creative".to_string()),
            summary: None,
            scores: vec![3.0; 10],
            top_departments: Vec::new(),
            similar_departments: Vec::new(),
            worst_departments: Vec::new(),
            interest_tags: Vec::new(),
            created_at: None,
        };
        let text = render_result(&ResultView::build(&payload, "https://quiz.example"));

        assert!(text.starts_with("== Creative ==\nCreative type.\n"));
        assert!(text.contains("No recommended departments."));
        assert!(text.contains("No departments to display."));
        assert!(!text.contains("Interests:"));
        assert!(text.ends_with("Share: https://quiz.example/pages/result.html?id=r1"));
    }
}
