//! Figure detection from vector-path clusters and raster regions.
//!
//! Vector paths are clustered with DBSCAN over their box centers; each
//! cluster and each raster region becomes a candidate. Candidates are
//! filtered by size and shape, merged by non-maximum suppression, and
//! finally dropped where a table already claims the area.

use std::collections::{HashMap, VecDeque};

use crate::error::{Diagnostic, Error, Stage};
use crate::geometry::{cmp_f32, Point, Rect};
use crate::model::{Figure, PageGeometry, RasterRegion, Table, VectorPath};

use super::options::FigureConfig;

/// Detects figures on a page.
pub struct FigureDetector<'a> {
    config: &'a FigureConfig,
}

impl<'a> FigureDetector<'a> {
    /// Create a detector with the given configuration.
    pub fn new(config: &'a FigureConfig) -> Self {
        Self { config }
    }

    /// Detect figures; `tables` must already be final.
    pub fn detect(
        &self,
        geometry: &PageGeometry,
        paths: &[VectorPath],
        rasters: &[RasterRegion],
        tables: &[Table],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Figure> {
        let mut candidates: Vec<Figure> = self
            .cluster_paths(paths, diagnostics)
            .into_iter()
            .filter_map(|members| {
                let bbox = Rect::enclosing(members.iter().map(|&i| &paths[i].bbox))?;
                Some(Figure::from_paths(bbox, members))
            })
            .collect();
        candidates.extend(
            rasters
                .iter()
                .enumerate()
                .map(|(i, r)| Figure::from_raster(r.bbox, i)),
        );
        let found = candidates.len();

        let page = geometry.bounds();
        candidates.retain(|c| self.is_plausible(&c.bbox, &page));
        let plausible = candidates.len();

        let merged = self.merge_overlapping(candidates, diagnostics);
        let merged_count = merged.len();

        let mut figures: Vec<Figure> = merged
            .into_iter()
            .filter(|f| !self.overlaps_table(&f.bbox, tables))
            .collect();
        figures.sort_by(|a, b| cmp_f32(a.bbox.y0, b.bbox.y0).then(cmp_f32(a.bbox.x0, b.bbox.x0)));

        log::debug!(
            "FigureDetector: {} candidates, {} plausible, {} after merge, {} after table filter",
            found,
            plausible,
            merged_count,
            figures.len()
        );
        figures
    }

    /// Cluster path centers with DBSCAN; returns path indices per cluster.
    pub fn cluster_paths(&self, paths: &[VectorPath], diagnostics: &mut Vec<Diagnostic>) -> Vec<Vec<usize>> {
        let mut n = paths.len();
        if n > self.config.max_paths {
            diagnostics.push(Diagnostic::from_error(
                Stage::Figures,
                &Error::ResourceExhausted(format!(
                    "{} vector paths exceed the clustering limit, ignoring {}",
                    n,
                    n - self.config.max_paths
                )),
            ));
            n = self.config.max_paths;
        }
        if n == 0 {
            return Vec::new();
        }

        let points: Vec<Point> = paths[..n].iter().map(|p| p.bbox.center()).collect();
        let index = GridIndex::new(&points, self.config.epsilon_px);
        let min_pts = self.config.min_cluster_size;

        let budget = self.config.max_neighbor_visits;
        let mut work = 0usize;
        let mut exhausted = false;
        let mut visited = vec![false; n];
        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut clusters: Vec<Vec<usize>> = Vec::new();

        'outer: for i in 0..n {
            if visited[i] {
                continue;
            }
            visited[i] = true;
            let neighbors = index.neighbors(&points, i);
            work += neighbors.len();
            if neighbors.len() < min_pts {
                continue;
            }

            let cluster = clusters.len();
            clusters.push(Vec::new());
            labels[i] = Some(cluster);
            // Points are labelled when queued, so each enters the queue once.
            let mut queue: VecDeque<usize> = VecDeque::new();
            for j in neighbors {
                if labels[j].is_none() {
                    labels[j] = Some(cluster);
                    queue.push_back(j);
                }
            }

            while let Some(j) = queue.pop_front() {
                if visited[j] {
                    continue;
                }
                if work > budget {
                    exhausted = true;
                    break 'outer;
                }
                visited[j] = true;
                let reach = index.neighbors(&points, j);
                work += reach.len();
                if reach.len() >= min_pts {
                    for k in reach {
                        if labels[k].is_none() {
                            labels[k] = Some(cluster);
                            queue.push_back(k);
                        }
                    }
                }
            }
        }

        if exhausted {
            diagnostics.push(Diagnostic::from_error(
                Stage::Figures,
                &Error::ResourceExhausted(format!(
                    "path clustering stopped after {} neighbour visits; remaining paths left unclustered",
                    work
                )),
            ));
        }
        log::debug!("FigureDetector: {} clusters, {} neighbour visits", clusters.len(), work);

        for (i, label) in labels.iter().enumerate() {
            if let Some(c) = label {
                clusters[*c].push(i);
            }
        }
        clusters
    }

    /// Size, shape and page-background checks.
    fn is_plausible(&self, bbox: &Rect, page: &Rect) -> bool {
        let area = bbox.area();
        if area < self.config.min_area_px {
            return false;
        }
        let aspect = bbox.aspect_ratio();
        if aspect > self.config.max_aspect {
            return false;
        }
        let page_area = page.area();
        let is_background = page_area > 0.0
            && area >= page_area * self.config.background_coverage
            && aspect <= self.config.background_max_aspect;
        !is_background
    }

    /// Non-maximum suppression where the larger candidate absorbs the smaller.
    fn merge_overlapping(&self, mut candidates: Vec<Figure>, diagnostics: &mut Vec<Diagnostic>) -> Vec<Figure> {
        for pass in 0..self.config.max_merge_passes {
            // Stable sort keeps insertion order for full ties
            candidates.sort_by(|a, b| {
                cmp_f32(b.bbox.area(), a.bbox.area())
                    .then(cmp_f32(a.bbox.y0, b.bbox.y0))
                    .then(cmp_f32(a.bbox.x0, b.bbox.x0))
            });

            let mut kept: Vec<Figure> = Vec::with_capacity(candidates.len());
            let mut merged_any = false;
            for candidate in candidates {
                match kept
                    .iter()
                    .position(|k| k.bbox.iou(&candidate.bbox) > self.config.merge_iou)
                {
                    Some(k) => {
                        kept[k].absorb(candidate);
                        merged_any = true;
                    }
                    None => kept.push(candidate),
                }
            }
            candidates = kept;

            if !merged_any {
                return candidates;
            }
            log::debug!("FigureDetector: merge pass {} left {} candidates", pass + 1, candidates.len());
        }

        diagnostics.push(Diagnostic::from_error(
            Stage::Figures,
            &Error::ResourceExhausted(format!(
                "figure merging did not settle after {} passes",
                self.config.max_merge_passes
            )),
        ));
        candidates
    }

    fn overlaps_table(&self, bbox: &Rect, tables: &[Table]) -> bool {
        tables.iter().any(|t| {
            bbox.iou(&t.bbox) > self.config.table_overlap_iou
                || bbox.coverage_by(&t.bbox) >= self.config.table_containment
        })
    }
}

/// Uniform grid over points with cell size epsilon.
struct GridIndex {
    cell: f32,
    epsilon_sq: f32,
    buckets: HashMap<(i64, i64), Vec<usize>>,
}

impl GridIndex {
    fn new(points: &[Point], epsilon: f32) -> Self {
        let cell = epsilon.max(f32::EPSILON);
        let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            buckets.entry(Self::key(p, cell)).or_default().push(i);
        }
        Self {
            cell,
            epsilon_sq: epsilon * epsilon,
            buckets,
        }
    }

    fn key(p: &Point, cell: f32) -> (i64, i64) {
        ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64)
    }

    /// Indices within epsilon of point `i`, itself included, ascending.
    fn neighbors(&self, points: &[Point], i: usize) -> Vec<usize> {
        let p = points[i];
        let (cx, cy) = Self::key(&p, self.cell);
        let mut found = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(bucket) = self.buckets.get(&(cx + dx, cy + dy)) {
                    found.extend(bucket.iter().copied().filter(|&j| {
                        let q = points[j];
                        (q.x - p.x).powi(2) + (q.y - p.y).powi(2) <= self.epsilon_sq
                    }));
                }
            }
        }
        found.sort_unstable();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::model::{Cell, PaintKind, TableKind};

    fn small_path(x: f32, y: f32) -> VectorPath {
        VectorPath::new(Rect::new(x, y, x + 8.0, y + 8.0), PaintKind::Stroke, 4)
    }

    fn dense_cluster(x: f32, y: f32) -> Vec<VectorPath> {
        let mut paths = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                paths.push(small_path(x + i as f32 * 8.0, y + j as f32 * 8.0));
            }
        }
        paths
    }

    #[test]
    fn test_dbscan_separates_clusters_and_noise() {
        let config = FigureConfig::default();
        let mut paths = dense_cluster(100.0, 100.0);
        paths.extend(dense_cluster(400.0, 400.0));
        paths.push(small_path(250.0, 600.0));

        let mut diags = Vec::new();
        let clusters = FigureDetector::new(&config).cluster_paths(&paths, &mut diags);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 25);
        assert_eq!(clusters[1].len(), 25);
        assert!(!clusters.iter().any(|c| c.contains(&50)));
    }

    #[test]
    fn test_vector_cluster_becomes_figure() {
        let config = FigureConfig::default();
        let paths = dense_cluster(100.0, 100.0);
        let mut diags = Vec::new();
        let figures = FigureDetector::new(&config).detect(&PageGeometry::letter(), &paths, &[], &[], &mut diags);

        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].bbox, Rect::new(100.0, 100.0, 140.0, 140.0));
        assert_eq!(figures[0].paths.len(), 25);
    }

    #[test]
    fn test_overlapping_vector_and_raster_merge_into_mixed() {
        let config = FigureConfig::default();
        let paths = dense_cluster(100.0, 100.0);
        // 40x40 vector box vs 40x30 raster box inside it: IoU 0.75
        let rasters = vec![RasterRegion::new(Rect::new(100.0, 105.0, 140.0, 135.0), "img0")];
        let mut diags = Vec::new();
        let figures = FigureDetector::new(&config).detect(&PageGeometry::letter(), &paths, &rasters, &[], &mut diags);

        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].source, crate::model::FigureSource::Mixed);
        assert_eq!(figures[0].rasters, vec![0]);
    }

    #[test]
    fn test_filters_reject_small_thin_and_background() {
        let config = FigureConfig::default();
        let page = PageGeometry::letter();
        let rasters = vec![
            RasterRegion::new(Rect::new(0.0, 0.0, 10.0, 10.0), "tiny"),
            RasterRegion::new(Rect::new(0.0, 100.0, 600.0, 110.0), "strip"),
            RasterRegion::new(Rect::new(0.0, 0.0, 612.0, 792.0), "background"),
            RasterRegion::new(Rect::new(100.0, 200.0, 300.0, 350.0), "photo"),
        ];
        let mut diags = Vec::new();
        let figures = FigureDetector::new(&config).detect(&page, &[], &rasters, &[], &mut diags);

        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].rasters, vec![3]);
    }

    #[test]
    fn test_tables_take_precedence() {
        let config = FigureConfig::default();
        let rasters = vec![RasterRegion::new(Rect::new(100.0, 100.0, 200.0, 200.0), "img")];
        let table = Table::new(
            TableKind::Ruled,
            1,
            1,
            vec![Cell::new(0, 0, Rect::new(90.0, 90.0, 210.0, 210.0))],
        );
        let mut diags = Vec::new();
        let figures = FigureDetector::new(&config).detect(&PageGeometry::letter(), &[], &rasters, &[table], &mut diags);
        assert!(figures.is_empty());
    }

    #[test]
    fn test_path_limit_records_diagnostic() {
        let config = FigureConfig {
            max_paths: 10,
            ..Default::default()
        };
        let paths = dense_cluster(100.0, 100.0);
        let mut diags = Vec::new();
        let clusters = FigureDetector::new(&config).cluster_paths(&paths, &mut diags);

        assert_eq!(diags[0].kind, DiagnosticKind::ResourceExhausted);
        assert!(clusters.iter().flatten().all(|&i| i < 10));
    }

    #[test]
    fn test_dense_cluster_is_one_cluster() {
        let config = FigureConfig::default();
        // Every path is within epsilon of every other one
        let paths: Vec<VectorPath> = (0..1500).map(|i| small_path(100.0 + (i % 5) as f32, 100.0)).collect();
        let mut diags = Vec::new();
        let clusters = FigureDetector::new(&config).cluster_paths(&paths, &mut diags);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 1500);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_neighbor_budget_stops_clustering() {
        let config = FigureConfig {
            max_neighbor_visits: 1_000,
            ..Default::default()
        };
        let mut paths: Vec<VectorPath> = (0..200).map(|i| small_path(100.0 + (i % 5) as f32, 100.0)).collect();
        paths.extend(dense_cluster(400.0, 400.0));
        let mut diags = Vec::new();
        let clusters = FigureDetector::new(&config).cluster_paths(&paths, &mut diags);

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::ResourceExhausted);
        // The first cluster is complete; the later one is never reached
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 200);
    }
}
