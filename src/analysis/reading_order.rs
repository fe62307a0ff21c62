//! Reading order and section assembly.
//!
//! Elements are read column by column. An element that crosses a gutter
//! (a title, a wide figure) interrupts the columns it spans: everything
//! above it in those columns is read first, then the element itself.

use std::collections::{HashSet, VecDeque};

use crate::geometry::{cmp_f32, Rect};
use crate::model::{Caption, Column, ContentItem, Figure, Paragraph, Section, Table};

use super::options::ReadingOrderConfig;

/// An element with its position and the columns it occupies.
#[derive(Debug, Clone, Copy)]
struct Placed {
    item: ContentItem,
    bbox: Rect,
    first_col: usize,
    last_col: usize,
}

impl Placed {
    fn is_spanning(&self) -> bool {
        self.last_col > self.first_col
    }
}

fn position_order(a: &Placed, b: &Placed) -> std::cmp::Ordering {
    cmp_f32(a.bbox.y0, b.bbox.y0)
        .then(cmp_f32(a.bbox.x0, b.bbox.x0))
        .then(a.item.rank().cmp(&b.item.rank()))
        .then(a.item.index().cmp(&b.item.index()))
}

/// Orders page elements and groups them into sections.
pub struct ReadingOrderAssembler<'a> {
    config: &'a ReadingOrderConfig,
}

impl<'a> ReadingOrderAssembler<'a> {
    /// Create an assembler.
    pub fn new(config: &'a ReadingOrderConfig) -> Self {
        Self { config }
    }

    /// Reading-ordered sections of a page.
    ///
    /// Caption paragraphs are left out; each heading opens a section.
    pub fn assemble(
        &self,
        columns: &[Column],
        paragraphs: &[Paragraph],
        figures: &[Figure],
        tables: &[Table],
        captions: &[Caption],
    ) -> Vec<Section> {
        let order = self.order(columns, paragraphs, figures, tables, captions);

        let mut sections = vec![Section::new(None, 0)];
        for item in order {
            if let ContentItem::Paragraph(i) = item {
                if let Some(level) = paragraphs[i].heading_level() {
                    sections.push(Section::new(Some(i), level));
                    continue;
                }
            }
            if let Some(current) = sections.last_mut() {
                current.items.push(item);
            }
        }

        if sections.first().map(|s| s.is_empty()).unwrap_or(false) {
            sections.remove(0);
        }
        log::debug!("ReadingOrderAssembler: {} sections", sections.len());
        sections
    }

    /// Elements of a page in reading order, headings included.
    pub fn order(
        &self,
        columns: &[Column],
        paragraphs: &[Paragraph],
        figures: &[Figure],
        tables: &[Table],
        captions: &[Caption],
    ) -> Vec<ContentItem> {
        let caption_paragraphs: HashSet<usize> = captions.iter().map(|c| c.paragraph).collect();

        let items = paragraphs
            .iter()
            .enumerate()
            .filter(|(i, _)| !caption_paragraphs.contains(i))
            .map(|(i, p)| (ContentItem::Paragraph(i), p.bbox))
            .chain(figures.iter().enumerate().map(|(i, f)| (ContentItem::Figure(i), f.bbox)))
            .chain(tables.iter().enumerate().map(|(i, t)| (ContentItem::Table(i), t.bbox)));

        let column_count = columns.len().max(1);
        let mut per_column: Vec<Vec<Placed>> = vec![Vec::new(); column_count];
        let mut spanning: Vec<Placed> = Vec::new();

        for (item, bbox) in items {
            let (first_col, last_col) = self.column_range(columns, &bbox);
            let placed = Placed {
                item,
                bbox,
                first_col,
                last_col,
            };
            if placed.is_spanning() {
                spanning.push(placed);
            } else {
                per_column[first_col].push(placed);
            }
        }

        spanning.sort_by(position_order);
        let mut queues: Vec<VecDeque<Placed>> = per_column
            .into_iter()
            .map(|mut elements| {
                elements.sort_by(position_order);
                VecDeque::from(elements)
            })
            .collect();

        let mut order = Vec::new();
        for wide in &spanning {
            for queue in queues.iter_mut().take(wide.last_col + 1) {
                while queue.front().map(|e| e.bbox.y0 < wide.bbox.y0).unwrap_or(false) {
                    if let Some(e) = queue.pop_front() {
                        order.push(e.item);
                    }
                }
            }
            order.push(wide.item);
        }
        for queue in queues {
            order.extend(queue.into_iter().map(|e| e.item));
        }

        log::debug!(
            "ReadingOrderAssembler: {} elements, {} spanning",
            order.len(),
            spanning.len()
        );
        order
    }

    /// First and last column an element belongs to.
    fn column_range(&self, columns: &[Column], bbox: &Rect) -> (usize, usize) {
        if columns.len() <= 1 {
            return (0, 0);
        }

        let extent = bbox.x_interval();
        let overlaps: Vec<f32> = columns.iter().map(|c| extent.overlap(&c.interval())).collect();
        let members: Vec<usize> = overlaps
            .iter()
            .enumerate()
            .filter(|(i, o)| **o > 0.0 && **o >= self.config.spanning_overlap_ratio * columns[*i].width())
            .map(|(i, _)| i)
            .collect();

        match (members.first(), members.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                let best = best_column(columns, &overlaps, bbox);
                (best, best)
            }
        }
    }
}

/// Column with the largest overlap, or the nearest one when none overlaps.
fn best_column(columns: &[Column], overlaps: &[f32], bbox: &Rect) -> usize {
    let center = bbox.center().x;
    (0..columns.len())
        .min_by(|&a, &b| {
            cmp_f32(overlaps[b], overlaps[a])
                .then(cmp_f32(distance_to(&columns[a], center), distance_to(&columns[b], center)))
                .then(a.cmp(&b))
        })
        .unwrap_or(0)
}

fn distance_to(column: &Column, x: f32) -> f32 {
    (column.x0 - x).max(x - column.x1).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockKind, CaptionTarget, TextLine};

    fn block(x0: f32, y: f32, x1: f32, kind: BlockKind) -> Paragraph {
        let line = TextLine {
            spans: Vec::new(),
            bbox: Rect::new(x0, y, x1, y + 12.0),
            baseline: y + 10.0,
            font_size: 10.0,
            text: "text".to_string(),
        };
        Paragraph::from_lines(vec![line], 0, false, kind)
    }

    fn two_columns() -> Vec<Column> {
        vec![Column::new(0, 50.0, 290.0), Column::new(1, 320.0, 560.0)]
    }

    #[test]
    fn test_columns_read_left_then_right() {
        let config = ReadingOrderConfig::default();
        let paragraphs = vec![
            block(320.0, 100.0, 560.0, BlockKind::Paragraph),
            block(50.0, 300.0, 290.0, BlockKind::Paragraph),
            block(50.0, 100.0, 290.0, BlockKind::Paragraph),
        ];
        let order = ReadingOrderAssembler::new(&config).order(&two_columns(), &paragraphs, &[], &[], &[]);
        assert_eq!(
            order,
            vec![ContentItem::Paragraph(2), ContentItem::Paragraph(1), ContentItem::Paragraph(0)]
        );
    }

    #[test]
    fn test_spanning_element_interrupts_columns() {
        let config = ReadingOrderConfig::default();
        let paragraphs = vec![
            block(50.0, 100.0, 290.0, BlockKind::Paragraph),
            block(320.0, 100.0, 560.0, BlockKind::Paragraph),
            block(50.0, 500.0, 290.0, BlockKind::Paragraph),
            block(320.0, 500.0, 560.0, BlockKind::Paragraph),
        ];
        let figures = vec![Figure::from_raster(Rect::new(60.0, 300.0, 550.0, 450.0), 0)];
        let order = ReadingOrderAssembler::new(&config).order(&two_columns(), &paragraphs, &figures, &[], &[]);
        assert_eq!(
            order,
            vec![
                ContentItem::Paragraph(0),
                ContentItem::Paragraph(1),
                ContentItem::Figure(0),
                ContentItem::Paragraph(2),
                ContentItem::Paragraph(3),
            ]
        );
    }

    #[test]
    fn test_headings_open_sections() {
        let config = ReadingOrderConfig::default();
        let columns = vec![Column::new(0, 50.0, 560.0)];
        let paragraphs = vec![
            block(50.0, 50.0, 300.0, BlockKind::Paragraph),
            block(50.0, 100.0, 300.0, BlockKind::Heading { level: 1 }),
            block(50.0, 130.0, 300.0, BlockKind::Paragraph),
            block(50.0, 200.0, 300.0, BlockKind::Heading { level: 2 }),
        ];
        let sections = ReadingOrderAssembler::new(&config).assemble(&columns, &paragraphs, &[], &[], &[]);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].heading, None);
        assert_eq!(sections[0].items, vec![ContentItem::Paragraph(0)]);
        assert_eq!((sections[1].heading, sections[1].level), (Some(1), 1));
        assert_eq!(sections[1].items, vec![ContentItem::Paragraph(2)]);
        assert_eq!((sections[2].heading, sections[2].level), (Some(3), 2));
        assert!(sections[2].items.is_empty());
    }

    #[test]
    fn test_empty_leading_section_omitted() {
        let config = ReadingOrderConfig::default();
        let columns = vec![Column::new(0, 50.0, 560.0)];
        let paragraphs = vec![
            block(50.0, 100.0, 300.0, BlockKind::Heading { level: 1 }),
            block(50.0, 130.0, 300.0, BlockKind::Paragraph),
        ];
        let sections = ReadingOrderAssembler::new(&config).assemble(&columns, &paragraphs, &[], &[], &[]);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, Some(0));
    }

    #[test]
    fn test_captions_leave_the_flow() {
        let config = ReadingOrderConfig::default();
        let columns = vec![Column::new(0, 50.0, 560.0)];
        let paragraphs = vec![
            block(50.0, 100.0, 300.0, BlockKind::Paragraph),
            block(50.0, 310.0, 300.0, BlockKind::Paragraph),
        ];
        let figures = vec![Figure::from_raster(Rect::new(50.0, 150.0, 300.0, 300.0), 0)];
        let captions = vec![Caption {
            bbox: paragraphs[1].bbox,
            text: "text".to_string(),
            paragraph: 1,
            target: CaptionTarget::Figure(0),
            pattern_matched: false,
        }];
        let order = ReadingOrderAssembler::new(&config).order(&columns, &paragraphs, &figures, &[], &captions);
        assert_eq!(order, vec![ContentItem::Paragraph(0), ContentItem::Figure(0)]);
    }

    #[test]
    fn test_element_in_gutter_goes_to_nearest_column() {
        let config = ReadingOrderConfig::default();
        let assembler = ReadingOrderAssembler::new(&config);
        let range = assembler.column_range(&two_columns(), &Rect::new(295.0, 10.0, 305.0, 20.0));
        assert_eq!(range, (0, 0));
        let range = assembler.column_range(&two_columns(), &Rect::new(300.0, 10.0, 318.0, 20.0));
        assert_eq!(range, (1, 1));
    }
}
