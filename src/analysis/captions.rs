//! Linking of caption paragraphs to figures and tables.

use std::cmp::Ordering;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::geometry::{cmp_f32, median, Rect};
use crate::model::{Caption, CaptionTarget, Figure, Paragraph, Table};

use super::options::CaptionConfig;

/// Kind of element a caption label names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// "Figure 1", "Fig. 2", ...
    Figure,
    /// "Table 1", "Tab. 2", ...
    Table,
}

/// A paragraph that could caption the current target.
struct Candidate {
    paragraph: usize,
    pattern: bool,
    gap: f32,
    below: bool,
    offset: f32,
}

/// Links paragraphs to the figures and tables they describe.
pub struct CaptionLinker<'a> {
    config: &'a CaptionConfig,
    scale: f32,
    figure_pattern: Regex,
    table_pattern: Regex,
}

impl<'a> CaptionLinker<'a> {
    /// Create a linker for a page rendered at `scale` pixels per point.
    pub fn new(config: &'a CaptionConfig, scale: f32) -> Result<Self> {
        Ok(Self {
            config,
            scale,
            figure_pattern: label_pattern(&config.figure_labels)?,
            table_pattern: label_pattern(&config.table_labels)?,
        })
    }

    /// Label kind introduced at the start of `text`, if any.
    ///
    /// The text is NFKC-normalised first so that full-width digits and
    /// ligatures match.
    ///
    /// # Examples
    ///
    /// ```
    /// use pagelayout::analysis::{CaptionConfig, CaptionLinker, LabelKind};
    ///
    /// let config = CaptionConfig::default();
    /// let linker = CaptionLinker::new(&config, 1.0).unwrap();
    /// assert_eq!(linker.match_label("Fig. 3: Results"), Some(LabelKind::Figure));
    /// assert_eq!(linker.match_label("Table 2 - Totals"), Some(LabelKind::Table));
    /// assert_eq!(linker.match_label("Figures are useful"), None);
    /// ```
    pub fn match_label(&self, text: &str) -> Option<LabelKind> {
        let normalized: String = text.nfkc().collect();
        if self.figure_pattern.is_match(&normalized) {
            Some(LabelKind::Figure)
        } else if self.table_pattern.is_match(&normalized) {
            Some(LabelKind::Table)
        } else {
            None
        }
    }

    /// Link captions and record them on their targets.
    ///
    /// Each paragraph captions at most one element and each element gets at
    /// most one caption. Returns the captions in linking order; targets refer
    /// to them by index.
    pub fn link(&self, paragraphs: &[Paragraph], figures: &mut [Figure], tables: &mut [Table]) -> Vec<Caption> {
        let labels: Vec<Option<LabelKind>> = paragraphs.iter().map(|p| self.match_label(&p.text())).collect();
        let line_height = self.page_line_height(paragraphs);

        let mut targets: Vec<(CaptionTarget, Rect)> = figures
            .iter()
            .enumerate()
            .map(|(i, f)| (CaptionTarget::Figure(i), f.bbox))
            .chain(tables.iter().enumerate().map(|(i, t)| (CaptionTarget::Table(i), t.bbox)))
            .collect();
        targets.sort_by(|a, b| cmp_f32(a.1.y0, b.1.y0).then(cmp_f32(a.1.x0, b.1.x0)));

        let mut claimed = vec![false; paragraphs.len()];
        let mut captions = Vec::new();

        for (target, bbox) in targets {
            let wanted = match target {
                CaptionTarget::Figure(_) => LabelKind::Figure,
                CaptionTarget::Table(_) => LabelKind::Table,
            };
            let band = bbox.pad(bbox.width(), self.config.band_factor * line_height);

            let candidates: Vec<Candidate> = paragraphs
                .iter()
                .enumerate()
                .filter(|(i, p)| !claimed[*i] && p.bbox.intersects(&band))
                .filter(|(_, p)| p.bbox.coverage_by(&bbox) <= self.config.max_target_overlap)
                .filter_map(|(i, p)| {
                    let pattern = match labels[i] {
                        Some(kind) if kind == wanted => true,
                        Some(_) => return None,
                        None if self.is_short_text(p) => false,
                        None => return None,
                    };
                    Some(Candidate {
                        paragraph: i,
                        pattern,
                        gap: p.bbox.vertical_gap(&bbox),
                        below: p.bbox.center().y >= bbox.center().y,
                        offset: (p.bbox.center().x - bbox.center().x).abs(),
                    })
                })
                .collect();

            let has_pattern = candidates.iter().any(|c| c.pattern);
            let best = candidates
                .into_iter()
                .filter(|c| c.pattern || !has_pattern)
                .min_by(compare_candidates);

            let Some(best) = best else {
                continue;
            };

            let paragraph = &paragraphs[best.paragraph];
            claimed[best.paragraph] = true;
            let index = captions.len();
            match target {
                CaptionTarget::Figure(i) => figures[i].caption = Some(index),
                CaptionTarget::Table(i) => tables[i].caption = Some(index),
            }
            log::debug!(
                "CaptionLinker: paragraph {} captions {:?} (labelled: {}, gap {:.1})",
                best.paragraph,
                target,
                best.pattern,
                best.gap
            );
            captions.push(Caption {
                bbox: paragraph.bbox,
                text: paragraph.text(),
                paragraph: best.paragraph,
                target,
                pattern_matched: best.pattern,
            });
        }

        captions
    }

    /// Median text line height, or the configured default.
    fn page_line_height(&self, paragraphs: &[Paragraph]) -> f32 {
        let mut heights: Vec<f32> = paragraphs
            .iter()
            .flat_map(|p| p.lines.iter().map(|l| l.height()))
            .filter(|h| *h > 0.0)
            .collect();
        median(&mut heights).unwrap_or(self.config.default_line_height_pt * self.scale)
    }

    /// Short body paragraph that may caption an element without a label.
    fn is_short_text(&self, paragraph: &Paragraph) -> bool {
        !paragraph.is_heading()
            && paragraph.char_count() <= self.config.max_caption_chars
            && paragraph.lines.len() <= self.config.max_caption_lines
    }
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.pattern
        .cmp(&a.pattern)
        .then(cmp_f32(a.gap, b.gap))
        .then(b.below.cmp(&a.below))
        .then(cmp_f32(a.offset, b.offset))
        .then(a.paragraph.cmp(&b.paragraph))
}

/// Pattern for a label word followed by a number and an optional separator.
///
/// Roman numerals need a separator or the end of the text after them, so
/// words such as "CLI" or "C" are not read as numbers.
fn label_pattern(labels: &[String]) -> Result<Regex> {
    let mut words: Vec<&str> = labels.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
    if words.is_empty() {
        return Err(Error::InvalidConfig("caption label list is empty".to_string()));
    }
    // Longest first so "Fig." wins over "Fig"
    words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let alternatives = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
    let pattern = format!(
        r"^\s*(?i:{})\s*(?:\d+(?:[.\-]\d+)*[A-Za-z]?\b|[IVXLC]+(?:\s*[:.\-–—)|]|\s*$))\s*[:.\-–—)|]?",
        alternatives
    );
    Regex::new(&pattern).map_err(|e| Error::InvalidConfig(format!("caption label pattern: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockKind, Cell, TableKind, TextLine};

    fn paragraph(text: &str, y: f32) -> Paragraph {
        let line = TextLine {
            spans: vec![0],
            bbox: Rect::new(100.0, y, 300.0, y + 12.0),
            baseline: y + 10.0,
            font_size: 10.0,
            text: text.to_string(),
        };
        Paragraph::from_lines(vec![line], 0, false, BlockKind::Paragraph)
    }

    fn figure() -> Figure {
        Figure::from_raster(Rect::new(100.0, 100.0, 300.0, 300.0), 0)
    }

    #[test]
    fn test_label_matching() {
        let config = CaptionConfig::default();
        let linker = CaptionLinker::new(&config, 1.0).unwrap();

        assert_eq!(linker.match_label("Figure 3: Results"), Some(LabelKind::Figure));
        assert_eq!(linker.match_label("FIG. 12b. Detail"), Some(LabelKind::Figure));
        assert_eq!(linker.match_label("Table IV: Summary"), Some(LabelKind::Table));
        assert_eq!(linker.match_label("TABLE XII."), Some(LabelKind::Table));
        assert_eq!(linker.match_label("Figure II"), Some(LabelKind::Figure));
        assert_eq!(linker.match_label("Figure\u{ff13}: full width digit"), Some(LabelKind::Figure));
        assert_eq!(linker.match_label("The figure 3 shows"), None);
        assert_eq!(linker.match_label("Tables of content"), None);
    }

    #[test]
    fn test_capitalised_words_are_not_roman_numerals() {
        let config = CaptionConfig::default();
        let linker = CaptionLinker::new(&config, 1.0).unwrap();

        assert_eq!(linker.match_label("Figure CLI output"), None);
        assert_eq!(linker.match_label("Table C lists the totals"), None);
        assert_eq!(linker.match_label("Table IV Summary"), None);
        assert_eq!(linker.match_label("Fig. XIV - Setup"), Some(LabelKind::Figure));
    }

    #[test]
    fn test_caption_within_band_is_linked() {
        let config = CaptionConfig::default();
        let linker = CaptionLinker::new(&config, 1.0).unwrap();
        let paragraphs = vec![paragraph("Figure 3: Results", 310.0)];
        let mut figures = vec![figure()];

        let captions = linker.link(&paragraphs, &mut figures, &mut []);

        assert_eq!(captions.len(), 1);
        assert!(captions[0].pattern_matched);
        assert_eq!(captions[0].target, CaptionTarget::Figure(0));
        assert_eq!(figures[0].caption, Some(0));
    }

    #[test]
    fn test_distant_caption_is_not_linked() {
        let config = CaptionConfig::default();
        let linker = CaptionLinker::new(&config, 1.0).unwrap();
        let paragraphs = vec![paragraph("Figure 3: Results", 350.0)];
        let mut figures = vec![figure()];

        let captions = linker.link(&paragraphs, &mut figures, &mut []);
        assert!(captions.is_empty());
        assert_eq!(figures[0].caption, None);
    }

    #[test]
    fn test_labelled_candidate_beats_nearer_text() {
        let config = CaptionConfig::default();
        let linker = CaptionLinker::new(&config, 1.0).unwrap();
        let paragraphs = vec![paragraph("A short note", 302.0), paragraph("Fig. 1 Overview", 86.0)];
        let mut figures = vec![figure()];

        let captions = linker.link(&paragraphs, &mut figures, &mut []);
        assert_eq!(captions[0].paragraph, 1);
    }

    #[test]
    fn test_below_preferred_on_equal_gap() {
        let config = CaptionConfig::default();
        let linker = CaptionLinker::new(&config, 1.0).unwrap();
        let paragraphs = vec![paragraph("Above", 84.0), paragraph("Below", 304.0)];
        let mut figures = vec![figure()];

        let captions = linker.link(&paragraphs, &mut figures, &mut []);
        assert_eq!(captions[0].paragraph, 1);
        assert!(!captions[0].pattern_matched);
    }

    #[test]
    fn test_linking_is_injective() {
        let config = CaptionConfig::default();
        let linker = CaptionLinker::new(&config, 1.0).unwrap();
        let paragraphs = vec![paragraph("Figure 1", 304.0)];
        let mut figures = vec![figure(), Figure::from_raster(Rect::new(100.0, 320.0, 300.0, 400.0), 1)];

        let captions = linker.link(&paragraphs, &mut figures, &mut []);
        assert_eq!(captions.len(), 1);
        assert_eq!(figures[0].caption, Some(0));
        assert_eq!(figures[1].caption, None);
    }

    #[test]
    fn test_table_label_not_used_for_figure() {
        let config = CaptionConfig::default();
        let linker = CaptionLinker::new(&config, 1.0).unwrap();
        let paragraphs = vec![paragraph("Table 1: Totals", 304.0)];
        let mut figures = vec![figure()];
        let mut tables = vec![Table::new(
            TableKind::Ruled,
            1,
            1,
            vec![Cell::new(0, 0, Rect::new(100.0, 320.0, 300.0, 400.0))],
        )];

        let captions = linker.link(&paragraphs, &mut figures, &mut tables);
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].target, CaptionTarget::Table(0));
        assert_eq!(figures[0].caption, None);
    }

    #[test]
    fn test_empty_labels_rejected() {
        let config = CaptionConfig {
            table_labels: Vec::new(),
            ..Default::default()
        };
        assert!(CaptionLinker::new(&config, 1.0).is_err());
    }
}
