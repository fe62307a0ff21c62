//! Grouping of text spans into lines, paragraphs and headings.

use std::collections::{BTreeSet, HashMap};

use crate::geometry::{cmp_f32, Rect};
use crate::model::{BlockKind, Paragraph, TextLine, TextSpan};

use super::columns::{ColumnLayout, SpanPlacement};
use super::options::TextBlockConfig;

/// Font size statistics for heading detection.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Body text font size (most common, weighted by characters)
    pub body_size: f32,
    /// All observed font sizes with character counts, keyed by tenths of a point
    pub size_histogram: HashMap<i32, usize>,
}

impl FontStatistics {
    /// Add a font size observation covering `chars` characters.
    pub fn add_size(&mut self, size: f32, chars: usize) {
        let key = (size * 10.0).round() as i32;
        *self.size_histogram.entry(key).or_insert(0) += chars.max(1);
    }

    /// Calculate the body size.
    pub fn analyze(&mut self) {
        // Ties go to the smaller size so the result does not depend on hash order.
        self.body_size = self
            .size_histogram
            .iter()
            .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then(kb.cmp(ka)))
            .map(|(k, _)| *k as f32 / 10.0)
            .unwrap_or(12.0);
    }

    /// Statistics over a set of spans.
    pub fn from_spans<'a>(spans: impl IntoIterator<Item = &'a TextSpan>) -> Self {
        let mut stats = Self::default();
        for span in spans {
            stats.add_size(span.font_size, span.char_count());
        }
        stats.analyze();
        stats
    }
}

/// Assembles lines and paragraphs per column.
pub struct TextBlockAssembler<'a> {
    config: &'a TextBlockConfig,
    scale: f32,
}

/// A paragraph under construction.
struct PendingBlock {
    lines: Vec<TextLine>,
    heading: bool,
}

impl<'a> TextBlockAssembler<'a> {
    /// Create an assembler for a page rendered at `scale` pixels per point.
    pub fn new(config: &'a TextBlockConfig, scale: f32) -> Self {
        Self { config, scale }
    }

    /// Build the paragraphs of a page.
    ///
    /// Columns are processed left to right, followed by the spans that cross
    /// a gutter. Heading levels are ranked over the whole page.
    pub fn assemble(&self, spans: &[TextSpan], layout: &ColumnLayout) -> Vec<Paragraph> {
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); layout.columns.len()];
        let mut spanning = Vec::new();
        for (i, placement) in layout.placements.iter().enumerate() {
            match *placement {
                SpanPlacement::Column(c) if c < groups.len() => groups[c].push(i),
                _ => spanning.push(i),
            }
        }

        let page_stats = FontStatistics::from_spans(spans);
        let mut blocks: Vec<(PendingBlock, usize, bool)> = Vec::new();

        for (column, indices) in groups.iter().enumerate() {
            let stats = FontStatistics::from_spans(indices.iter().map(|&i| &spans[i]));
            log::debug!(
                "TextBlockAssembler: column {} has {} spans, body size {:.1}",
                column,
                indices.len(),
                stats.body_size
            );
            let lines = self.group_into_lines(spans, indices);
            for block in self.group_lines_into_blocks(lines, &stats) {
                blocks.push((block, column, false));
            }
        }

        if !spanning.is_empty() {
            let lines = self.group_into_lines(spans, &spanning);
            for block in self.group_lines_into_blocks(lines, &page_stats) {
                let column = layout.column_at(block.lines[0].bbox.x0);
                blocks.push((block, column, true));
            }
        }

        let levels = self.heading_levels(blocks.iter().map(|(b, _, _)| b));
        blocks
            .into_iter()
            .map(|(block, column, spanning)| {
                let kind = if block.heading {
                    let size = block_font_key(&block.lines);
                    let level = levels.iter().position(|&k| k == size).map(|p| p + 1).unwrap_or(6);
                    BlockKind::Heading {
                        level: level.min(6) as u8,
                    }
                } else {
                    BlockKind::Paragraph
                };
                Paragraph::from_lines(block.lines, column, spanning, kind)
            })
            .collect()
    }

    /// Group spans sharing a baseline band into lines.
    pub fn group_into_lines(&self, spans: &[TextSpan], indices: &[usize]) -> Vec<TextLine> {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| {
            cmp_f32(spans[a].baseline(), spans[b].baseline())
                .then(cmp_f32(spans[a].bbox.x0, spans[b].bbox.x0))
                .then(a.cmp(&b))
        });

        let mut lines = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut current_baseline: Option<f32> = None;

        for i in order {
            let span = &spans[i];
            let tolerance = span.font_size * self.scale * self.config.line_merge_ratio;
            match current_baseline {
                Some(b) if (span.baseline() - b).abs() <= tolerance => current.push(i),
                _ => {
                    if !current.is_empty() {
                        lines.push(build_line(spans, std::mem::take(&mut current)));
                    }
                    current_baseline = Some(span.baseline());
                    current.push(i);
                }
            }
        }
        if !current.is_empty() {
            lines.push(build_line(spans, current));
        }
        lines
    }

    fn is_heading_line(&self, line: &TextLine, stats: &FontStatistics) -> bool {
        line.font_size > stats.body_size * self.config.heading_ratio
            && line.char_count() <= self.config.heading_max_chars
    }

    /// Group lines into paragraph and heading blocks.
    fn group_lines_into_blocks(&self, lines: Vec<TextLine>, stats: &FontStatistics) -> Vec<PendingBlock> {
        let mut blocks: Vec<PendingBlock> = Vec::new();

        for line in lines {
            let heading = self.is_heading_line(&line, stats);
            let continues = match blocks.last() {
                Some(block) => match block.lines.last() {
                    Some(prev) => {
                        let same_size = (prev.font_size * 10.0).round() == (line.font_size * 10.0).round();
                        block.heading == heading
                            && (!heading || same_size)
                            && !self.should_break_block(prev, &line)
                    }
                    None => false,
                },
                None => false,
            };

            match blocks.last_mut() {
                Some(block) if continues => block.lines.push(line),
                _ => blocks.push(PendingBlock {
                    lines: vec![line],
                    heading,
                }),
            }
        }
        blocks
    }

    /// Determine if `curr` starts a new block after `prev`.
    fn should_break_block(&self, prev: &TextLine, curr: &TextLine) -> bool {
        let line_height = prev.height().max(curr.height()).max(f32::EPSILON);
        let gap = (curr.bbox.y0 - prev.bbox.y1).max(0.0);

        if gap > line_height * self.config.paragraph_break_ratio {
            return true;
        }

        let size_diff = (prev.font_size - curr.font_size).abs();
        if size_diff > prev.font_size.max(f32::EPSILON) * self.config.font_change_ratio {
            return true;
        }

        // Between one and the break ratio of line heights only equal sizes continue
        if gap > line_height && size_diff >= 0.05 {
            return true;
        }

        let font_px = prev.font_size.max(curr.font_size) * self.scale;
        if (prev.bbox.x0 - curr.bbox.x0).abs() > font_px * self.config.alignment_tolerance_ratio {
            return true;
        }

        false
    }

    /// Distinct heading sizes on the page, largest first.
    fn heading_levels<'b>(&self, blocks: impl Iterator<Item = &'b PendingBlock>) -> Vec<i32> {
        let sizes: BTreeSet<i32> = blocks
            .filter(|b| b.heading)
            .map(|b| block_font_key(&b.lines))
            .collect();
        sizes.into_iter().rev().collect()
    }
}

/// Font size of a block's first line in tenths of a point.
fn block_font_key(lines: &[TextLine]) -> i32 {
    lines.first().map(|l| (l.font_size * 10.0).round() as i32).unwrap_or(0)
}

/// Build a line from span indices, ordering the spans left to right.
fn build_line(spans: &[TextSpan], mut indices: Vec<usize>) -> TextLine {
    indices.sort_by(|&a, &b| cmp_f32(spans[a].bbox.x0, spans[b].bbox.x0).then(a.cmp(&b)));

    let members: Vec<&TextSpan> = indices.iter().map(|&i| &spans[i]).collect();
    let bbox = Rect::enclosing(members.iter().map(|s| &s.bbox)).unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));

    let total_chars: usize = members.iter().map(|s| s.char_count().max(1)).sum();
    let weighted: f32 = members
        .iter()
        .map(|s| s.font_size * s.char_count().max(1) as f32)
        .sum();
    let font_size = weighted / total_chars.max(1) as f32;
    let baseline = members.first().map(|s| s.baseline()).unwrap_or(bbox.y1);

    TextLine {
        text: join_span_text(&members),
        spans: indices,
        bbox,
        baseline,
        font_size,
    }
}

/// Concatenate spans left to right, inserting spaces at visible gaps.
///
/// No space is inserted between adjacent CJK characters.
pub(crate) fn join_span_text(spans: &[&TextSpan]) -> String {
    let mut result = String::new();

    for (i, span) in spans.iter().enumerate() {
        if i == 0 {
            result.push_str(&span.text);
            continue;
        }
        let prev = spans[i - 1];
        let gap = span.bbox.x0 - prev.bbox.x1;

        let char_count = span.text.chars().count();
        let avg_char_width = if char_count > 0 && span.bbox.width() > 0.0 {
            span.bbox.width() / char_count as f32
        } else {
            span.bbox.height() * 0.5
        };

        let spaceless = prev.text.chars().last().map(is_spaceless_script_char).unwrap_or(false)
            && span.text.chars().next().map(is_spaceless_script_char).unwrap_or(false);
        let has_space = result.ends_with(char::is_whitespace) || span.text.starts_with(char::is_whitespace);

        if gap > avg_char_width * 0.2 && !spaceless && !has_space {
            result.push(' ');
        }
        result.push_str(&span.text);
    }

    result
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    (0x4E00..=0x9FFF).contains(&code)
        || (0x3400..=0x4DBF).contains(&code)
        || (0x20000..=0x2EBEF).contains(&code)
        || (0x3040..=0x309F).contains(&code)
        || (0x30A0..=0x30FF).contains(&code)
        || (0x3000..=0x303F).contains(&code)
}
