// src/session/selection.rs

//! Question selection: one random index per attempt, applied to every page.

use std::sync::LazyLock;

use rand::{Rng, SeedableRng, rngs::StdRng};
use regex::Regex;

use crate::{
    error::AppError,
    models::{
        definition::{AssignmentDefinition, Element, TagName},
        page::ProcessedPage,
    },
};

/// Leading integer, the way a lenient `parseInt` reads it ("5", " 5 questions", "+5").
static LEADING_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("leading integer pattern is valid"));

pub fn parse_bound(content: &str) -> Option<u32> {
    let captures = LEADING_INT.captures(content)?;
    let value: i64 = captures.get(1)?.as_str().parse().ok()?;
    u32::try_from(value).ok().filter(|n| *n >= 1)
}

/// Finds the selection bound N: the first `randominteger` element in page order.
pub fn selection_bound(definition: &AssignmentDefinition) -> Result<u32, AppError> {
    let element = definition
        .elements()
        .find(|e| e.tag_name == TagName::RandomInteger)
        .ok_or_else(|| {
            AppError::DefinitionLoad("No randominteger element found in the form".to_string())
        })?;

    parse_bound(&element.content).ok_or_else(|| {
        AppError::DefinitionLoad(format!(
            "randominteger element has no usable bound: {:?}",
            element.content
        ))
    })
}

/// Source of the ChosenQuestionIndex.
pub trait QuestionDraw: Send {
    /// Returns an index in `1..=bound`.
    fn draw(&mut self, bound: u32) -> u32;
}

/// Uniform draw over `1..=bound`.
pub struct UniformDraw<R> {
    rng: R,
}

impl<R: Rng + Send> UniformDraw<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl UniformDraw<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng + Send> QuestionDraw for UniformDraw<R> {
    fn draw(&mut self, bound: u32) -> u32 {
        self.rng.gen_range(1..=bound.max(1))
    }
}

/// Always the same index, clamped into `1..=bound`. Useful for replays and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedDraw(pub u32);

impl QuestionDraw for FixedDraw {
    fn draw(&mut self, bound: u32) -> u32 {
        self.0.clamp(1, bound.max(1))
    }
}

/// Derives the per-page view for `index`. Pure: same inputs, same output.
pub fn process_pages(definition: &AssignmentDefinition, index: u32) -> Vec<ProcessedPage> {
    definition
        .pages
        .iter()
        .map(|page| {
            let mut paragraphs: Vec<&Element> = page
                .elements
                .iter()
                .filter(|e| e.tag_name == TagName::Paragraph)
                .collect();
            paragraphs.sort_by_key(|e| e.sequence);

            let video_recording = page
                .elements
                .iter()
                .find(|e| e.tag_name == TagName::VideoRecording)
                .cloned();

            let selected_paragraph = (index as usize)
                .checked_sub(1)
                .and_then(|rank| paragraphs.get(rank))
                .map(|e| (*e).clone());

            ProcessedPage {
                page_number: page.page,
                selected_paragraph,
                has_video_recording: video_recording.is_some(),
                video_recording,
                total_paragraphs: paragraphs.len(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::definition::Page;

    fn element(id: &str, tag: &str, content: &str, sequence: i64) -> Element {
        Element {
            id: id.to_string(),
            tag_name: TagName::from(tag),
            content: content.to_string(),
            sequence,
        }
    }

    fn definition(pages: Vec<Page>) -> AssignmentDefinition {
        AssignmentDefinition {
            id: "1".to_string(),
            jotform_name: "Form".to_string(),
            title: Some("Form".to_string()),
            pages,
        }
    }

    /// N=3, one page with 3 paragraphs authored out of order and a recording marker.
    fn scenario_a() -> AssignmentDefinition {
        definition(vec![Page {
            page: 1,
            elements: vec![
                element("n", "randominteger", "3", 0),
                element("p3", "paragraph", "third", 30),
                element("p1", "paragraph", "first", 10),
                element("v", "videorecording", "", 40),
                element("p2", "paragraph", "second", 20),
            ],
        }])
    }

    #[test]
    fn test_parse_bound_reads_leading_integer() {
        assert_eq!(parse_bound("3"), Some(3));
        assert_eq!(parse_bound("  12 questions"), Some(12));
        assert_eq!(parse_bound("+4"), Some(4));
        assert_eq!(parse_bound("0"), None);
        assert_eq!(parse_bound("-2"), None);
        assert_eq!(parse_bound("five"), None);
        assert_eq!(parse_bound(""), None);
    }

    #[test]
    fn test_missing_bound_fails_the_load() {
        let def = definition(vec![Page {
            page: 1,
            elements: vec![element("p1", "paragraph", "only", 1)],
        }]);
        assert!(matches!(selection_bound(&def), Err(AppError::DefinitionLoad(_))));

        let def = definition(vec![Page {
            page: 1,
            elements: vec![element("n", "randominteger", "none", 1)],
        }]);
        assert!(matches!(selection_bound(&def), Err(AppError::DefinitionLoad(_))));
    }

    #[test]
    fn test_bound_is_first_in_page_order() {
        let def = definition(vec![
            Page { page: 1, elements: vec![element("p", "paragraph", "x", 1)] },
            Page { page: 2, elements: vec![element("n1", "randominteger", "4", 9)] },
            Page { page: 3, elements: vec![element("n2", "randominteger", "8", 1)] },
        ]);
        assert_eq!(selection_bound(&def).unwrap(), 4);
    }

    #[test]
    fn test_uniform_draw_respects_bound() {
        let mut draw = UniformDraw::new(StdRng::seed_from_u64(7));
        for bound in 1..=10u32 {
            for _ in 0..200 {
                let index = draw.draw(bound);
                assert!((1..=bound).contains(&index), "index {} outside 1..={}", index, bound);
            }
        }
    }

    #[test]
    fn test_uniform_draw_reaches_every_index() {
        let mut draw = UniformDraw::new(StdRng::seed_from_u64(42));
        let mut seen = [false; 5];
        for _ in 0..500 {
            seen[(draw.draw(5) - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_fixed_draw_is_clamped() {
        assert_eq!(FixedDraw(2).draw(3), 2);
        assert_eq!(FixedDraw(9).draw(3), 3);
        assert_eq!(FixedDraw(0).draw(3), 1);
    }

    #[test]
    fn test_process_pages_is_pure() {
        let def = scenario_a();
        assert_eq!(process_pages(&def, 2), process_pages(&def, 2));
    }

    #[test]
    fn test_scenario_a_selects_second_by_sequence() {
        let pages = process_pages(&scenario_a(), 2);
        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        assert_eq!(page.question_text(), Some("second"));
        assert!(page.has_video_recording);
        assert_eq!(page.total_paragraphs, 3);
    }

    #[test]
    fn test_scenario_b_short_pool_has_no_paragraph() {
        let def = definition(vec![Page {
            page: 1,
            elements: vec![
                element("n", "randominteger", "5", 0),
                element("p1", "paragraph", "first", 1),
                element("p2", "paragraph", "second", 2),
                element("v", "videorecording", "", 3),
            ],
        }]);

        let pages = process_pages(&def, 4);
        assert!(pages[0].selected_paragraph.is_none());
        // the recording requirement stands without a paragraph
        assert!(pages[0].has_video_recording);
        assert_eq!(pages[0].total_paragraphs, 2);
    }

    #[test]
    fn test_page_without_marker() {
        let def = definition(vec![Page {
            page: 7,
            elements: vec![element("h", "heading", "Intro", 0), element("p", "paragraph", "Read", 1)],
        }]);
        let page = &process_pages(&def, 1)[0];
        assert_eq!(page.page_number, 7);
        assert!(!page.has_video_recording);
        assert!(page.video_recording.is_none());
    }
}
