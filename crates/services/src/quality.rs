//! Pure computation functions for inter-annotator agreement and
//! augmentation geometry transforms. No I/O, no database access —
//! callers fetch annotations and pass plain structs in.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// One annotator's labeling of a single item, flattened out of the
/// `annotations` table for a (dataset_item_id) group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementEntry {
    pub user_id: String,
    pub label: String,
    pub ann_type: String,
    pub geometry: Option<BBox>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// `inter / (area1 + area2 − inter)`, 0 on a degenerate (zero-area) union.
pub fn bbox_iou(b1: &BBox, b2: &BBox) -> f64 {
    let x1 = b1.x.max(b2.x);
    let y1 = b1.y.max(b2.y);
    let x2 = (b1.x + b1.w).min(b2.x + b2.w);
    let y2 = (b1.y + b1.h).min(b2.y + b2.h);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area1 = b1.w * b1.h;
    let area2 = b2.w * b2.h;
    let union = area1 + area2 - intersection;

    intersection / union.max(1e-6)
}

fn group_by_user<'a>(entries: &'a [AgreementEntry]) -> Vec<(&'a str, Vec<&'a AgreementEntry>)> {
    let mut order = Vec::new();
    let mut by_user: HashMap<&str, Vec<&AgreementEntry>> = HashMap::new();
    for e in entries {
        by_user.entry(e.user_id.as_str()).or_insert_with(|| {
            order.push(e.user_id.as_str());
            Vec::new()
        }).push(e);
    }
    order.into_iter().map(|u| (u, by_user.remove(u).unwrap())).collect()
}

/// Jaccard of per-user label sets, averaged over every unordered user pair.
/// Fewer than 2 annotators means there's nothing to disagree on: 1.0.
pub fn label_agreement(entries: &[AgreementEntry]) -> f64 {
    let grouped = group_by_user(entries);
    if grouped.len() < 2 {
        return 1.0;
    }

    let label_sets: Vec<HashSet<&str>> = grouped
        .iter()
        .map(|(_, anns)| anns.iter().map(|a| a.label.as_str()).collect())
        .collect();

    let mut agreements = 0.0;
    let mut total = 0;
    for i in 0..label_sets.len() {
        for j in (i + 1)..label_sets.len() {
            let overlap = label_sets[i].intersection(&label_sets[j]).count();
            let union = label_sets[i].union(&label_sets[j]).count();
            agreements += overlap as f64 / union.max(1) as f64;
            total += 1;
        }
    }
    agreements / total.max(1) as f64
}

/// Average `bbox_iou` across every cross-product of bbox annotations
/// between each pair of users. Only `ann_type == "bbox"` entries count.
pub fn iou_agreement(entries: &[AgreementEntry]) -> f64 {
    let bbox_entries: Vec<&AgreementEntry> = entries
        .iter()
        .filter(|e| e.ann_type == "bbox" && e.geometry.is_some())
        .collect();

    let mut order = Vec::new();
    let mut by_user: HashMap<&str, Vec<BBox>> = HashMap::new();
    for e in &bbox_entries {
        by_user.entry(e.user_id.as_str()).or_insert_with(|| {
            order.push(e.user_id.as_str());
            Vec::new()
        }).push(e.geometry.unwrap());
    }

    if order.len() < 2 {
        return 1.0;
    }

    let mut total_iou = 0.0;
    let mut count = 0;
    for i in 0..order.len() {
        for j in (i + 1)..order.len() {
            for b1 in &by_user[order[i]] {
                for b2 in &by_user[order[j]] {
                    total_iou += bbox_iou(b1, b2);
                    count += 1;
                }
            }
        }
    }
    total_iou / count.max(1) as f64
}

/// 1 if a user pair's sorted label lists are exactly equal, else 0; averaged.
pub fn percent_agreement(entries: &[AgreementEntry]) -> f64 {
    let grouped = group_by_user(entries);
    if grouped.len() < 2 {
        return 1.0;
    }

    let sorted_labels: Vec<Vec<&str>> = grouped
        .iter()
        .map(|(_, anns)| {
            let mut labels: Vec<&str> = anns.iter().map(|a| a.label.as_str()).collect();
            labels.sort_unstable();
            labels
        })
        .collect();

    let mut agreements = 0;
    let mut total = 0;
    for i in 0..sorted_labels.len() {
        for j in (i + 1)..sorted_labels.len() {
            if sorted_labels[i] == sorted_labels[j] {
                agreements += 1;
            }
            total += 1;
        }
    }
    agreements as f64 / total.max(1) as f64
}

/// Cohen's kappa for exactly two annotators: `(po - pe) / (1 - pe)`, where
/// `po` is observed agreement and `pe` is chance agreement under each
/// annotator's own label-frequency distribution. An item where one
/// annotator didn't label at all is represented with a sentinel absent
/// category so it still contributes to disagreement, per the shared
/// input convention with the other agreement metrics.
///
/// Returns `1.0` if there are fewer than 2 raters or fewer than 2 items,
/// since kappa is undefined (0/0) in the no-variance case and a perfect
/// agreement is the least surprising convention for an empty comparison.
const ABSENT_LABEL: &str = "\u{0}__absent__";

pub fn cohens_kappa(item_labels: &[(String, String)]) -> f64 {
    // item_labels: one (rater_a_label, rater_b_label) pair per item.
    if item_labels.len() < 2 {
        return 1.0;
    }

    let n = item_labels.len() as f64;
    let mut observed_agree = 0.0;
    let mut freq_a: HashMap<&str, f64> = HashMap::new();
    let mut freq_b: HashMap<&str, f64> = HashMap::new();

    for (a, b) in item_labels {
        if a == b {
            observed_agree += 1.0;
        }
        *freq_a.entry(a.as_str()).or_insert(0.0) += 1.0;
        *freq_b.entry(b.as_str()).or_insert(0.0) += 1.0;
    }

    let po = observed_agree / n;
    let mut pe = 0.0;
    for (label, count_a) in &freq_a {
        let count_b = freq_b.get(label).copied().unwrap_or(0.0);
        pe += (count_a / n) * (count_b / n);
    }

    let denom = 1.0 - pe;
    if denom.abs() < 1e-9 {
        1.0
    } else {
        (po - pe) / denom
    }
}

/// Fleiss' kappa for an arbitrary number of raters over an arbitrary
/// number of categories, per the standard formula: `(P_bar - P_e_bar) /
/// (1 - P_e_bar)`. `items` is one row per subject, each row the list of
/// labels assigned by every rater who labeled that item; a rater absent
/// on an item contributes [`ABSENT_LABEL`] so the category distribution
/// still reflects their non-participation instead of being silently
/// dropped.
pub fn fleiss_kappa(items: &[Vec<String>]) -> f64 {
    if items.len() < 2 {
        return 1.0;
    }

    let raters_per_item: Vec<usize> = items.iter().map(|row| row.len()).collect();
    let n_raters = *raters_per_item.iter().max().unwrap_or(&0);
    if n_raters < 2 {
        return 1.0;
    }

    let mut categories: HashSet<&str> = HashSet::new();
    for row in items {
        for label in row {
            categories.insert(label.as_str());
        }
    }
    let categories: Vec<&str> = categories.into_iter().collect();

    let n_items = items.len() as f64;
    let mut category_totals: HashMap<&str, f64> = HashMap::new();
    let mut per_item_agreement = Vec::with_capacity(items.len());

    for (row, &raters) in items.iter().zip(&raters_per_item) {
        let raters = raters.max(1) as f64;
        let mut counts: HashMap<&str, f64> = HashMap::new();
        for label in row {
            *counts.entry(label.as_str()).or_insert(0.0) += 1.0;
            *category_totals.entry(label.as_str()).or_insert(0.0) += 1.0;
        }

        let sum_sq: f64 = counts.values().map(|c| c * c).sum();
        let item_agreement = (sum_sq - raters) / (raters * (raters - 1.0).max(1.0));
        per_item_agreement.push(item_agreement);
    }

    let p_bar = per_item_agreement.iter().sum::<f64>() / n_items;

    let total_ratings: f64 = category_totals.values().sum();
    let p_e_bar: f64 = categories
        .iter()
        .map(|c| {
            let p_j = category_totals.get(c).copied().unwrap_or(0.0) / total_ratings.max(1.0);
            p_j * p_j
        })
        .sum();

    let denom = 1.0 - p_e_bar;
    if denom.abs() < 1e-9 {
        1.0
    } else {
        (p_bar - p_e_bar) / denom
    }
}

/// A single augmentation step, applied left-to-right by [`transform_geometry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryTransform {
    HorizontalFlip,
    VerticalFlip,
    Scale { factor: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Bbox { x: f64, y: f64, w: f64, h: f64 },
    Point { x: f64, y: f64 },
    Polygon { points: Vec<(f64, f64)> },
}

/// Applies `transforms` to `geometry` in order, against the image's
/// original `(width, height)`. `rotate` is explicitly out of scope here —
/// it's recorded on the augmentation job but never applied to annotation
/// geometry.
pub fn transform_geometry(geometry: Geometry, transforms: &[GeometryTransform], width: f64, height: f64) -> Geometry {
    let mut geom = geometry;
    for t in transforms {
        geom = match (t, geom) {
            (GeometryTransform::HorizontalFlip, Geometry::Bbox { x, y, w, h }) => {
                Geometry::Bbox { x: width - x - w, y, w, h }
            }
            (GeometryTransform::HorizontalFlip, Geometry::Point { x, y }) => Geometry::Point { x: width - x, y },
            (GeometryTransform::HorizontalFlip, Geometry::Polygon { points }) => Geometry::Polygon {
                points: points.into_iter().map(|(px, py)| (width - px, py)).collect(),
            },
            (GeometryTransform::VerticalFlip, Geometry::Bbox { x, y, w, h }) => {
                Geometry::Bbox { x, y: height - y - h, w, h }
            }
            (GeometryTransform::VerticalFlip, Geometry::Point { x, y }) => Geometry::Point { x, y: height - y },
            (GeometryTransform::VerticalFlip, Geometry::Polygon { points }) => Geometry::Polygon {
                points: points.into_iter().map(|(px, py)| (px, height - py)).collect(),
            },
            (GeometryTransform::Scale { factor }, Geometry::Bbox { x, y, w, h }) => Geometry::Bbox {
                x: x * factor,
                y: y * factor,
                w: w * factor,
                h: h * factor,
            },
            (GeometryTransform::Scale { factor }, Geometry::Point { x, y }) => {
                Geometry::Point { x: x * factor, y: y * factor }
            }
            (GeometryTransform::Scale { factor }, Geometry::Polygon { points }) => Geometry::Polygon {
                points: points.into_iter().map(|(px, py)| (px * factor, py * factor)).collect(),
            },
        };
    }
    geom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: f64, y: f64, w: f64, h: f64) -> BBox {
        BBox { x, y, w, h }
    }

    #[test]
    fn bbox_iou_is_symmetric_and_self_equal() {
        let a = bbox(0.0, 0.0, 100.0, 100.0);
        let b = bbox(50.0, 50.0, 100.0, 100.0);
        assert!((bbox_iou(&a, &b) - bbox_iou(&b, &a)).abs() < 1e-9);
        assert!((bbox_iou(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn iou_agreement_matches_worked_example() {
        let entries = vec![
            AgreementEntry {
                user_id: "u1".into(),
                label: "cat".into(),
                ann_type: "bbox".into(),
                geometry: Some(bbox(0.0, 0.0, 100.0, 100.0)),
            },
            AgreementEntry {
                user_id: "u2".into(),
                label: "cat".into(),
                ann_type: "bbox".into(),
                geometry: Some(bbox(50.0, 50.0, 100.0, 100.0)),
            },
        ];
        let score = iou_agreement(&entries);
        assert!((score - 2500.0 / 17500.0).abs() < 1e-6);
    }

    #[test]
    fn label_agreement_matches_worked_example() {
        let entries = vec![
            AgreementEntry { user_id: "u1".into(), label: "cat".into(), ann_type: "classification".into(), geometry: None },
            AgreementEntry { user_id: "u1".into(), label: "dog".into(), ann_type: "classification".into(), geometry: None },
            AgreementEntry { user_id: "u2".into(), label: "cat".into(), ann_type: "classification".into(), geometry: None },
            AgreementEntry { user_id: "u2".into(), label: "fish".into(), ann_type: "classification".into(), geometry: None },
        ];
        let score = label_agreement(&entries);
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn percent_agreement_requires_exact_sorted_match() {
        let entries = vec![
            AgreementEntry { user_id: "u1".into(), label: "cat".into(), ann_type: "classification".into(), geometry: None },
            AgreementEntry { user_id: "u2".into(), label: "cat".into(), ann_type: "classification".into(), geometry: None },
        ];
        assert_eq!(percent_agreement(&entries), 1.0);
    }

    #[test]
    fn fewer_than_two_users_is_perfect_agreement() {
        let entries = vec![AgreementEntry {
            user_id: "u1".into(),
            label: "cat".into(),
            ann_type: "classification".into(),
            geometry: None,
        }];
        assert_eq!(label_agreement(&entries), 1.0);
        assert_eq!(percent_agreement(&entries), 1.0);
        assert_eq!(iou_agreement(&entries), 1.0);
    }

    #[test]
    fn cohens_kappa_is_one_on_perfect_agreement() {
        let items = vec![
            ("cat".to_string(), "cat".to_string()),
            ("dog".to_string(), "dog".to_string()),
            ("cat".to_string(), "cat".to_string()),
        ];
        assert!((cohens_kappa(&items) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cohens_kappa_treats_missing_label_as_distinct_category() {
        let items = vec![
            ("cat".to_string(), "cat".to_string()),
            ("dog".to_string(), ABSENT_LABEL.to_string()),
            ("cat".to_string(), "cat".to_string()),
        ];
        let k = cohens_kappa(&items);
        assert!(k < 1.0);
    }

    #[test]
    fn fleiss_kappa_is_one_on_unanimous_items() {
        let items = vec![
            vec!["cat".to_string(), "cat".to_string(), "cat".to_string()],
            vec!["dog".to_string(), "dog".to_string(), "dog".to_string()],
        ];
        assert!((fleiss_kappa(&items) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fleiss_kappa_is_below_one_with_disagreement() {
        let items = vec![
            vec!["cat".to_string(), "dog".to_string(), "cat".to_string()],
            vec!["dog".to_string(), "dog".to_string(), "cat".to_string()],
        ];
        assert!(fleiss_kappa(&items) < 1.0);
    }

    #[test]
    fn horizontal_flip_then_scale_composes_left_to_right() {
        let geom = Geometry::Bbox { x: 10.0, y: 10.0, w: 20.0, h: 20.0 };
        let transforms = vec![GeometryTransform::HorizontalFlip, GeometryTransform::Scale { factor: 2.0 }];
        let result = transform_geometry(geom, &transforms, 100.0, 100.0);
        match result {
            Geometry::Bbox { x, y, w, h } => {
                // flip: x = 100 - 10 - 20 = 70, then scale by 2
                assert!((x - 140.0).abs() < 1e-9);
                assert!((y - 20.0).abs() < 1e-9);
                assert!((w - 40.0).abs() < 1e-9);
                assert!((h - 40.0).abs() < 1e-9);
            }
            _ => panic!("expected bbox"),
        }
    }

    #[test]
    fn vertical_flip_point_and_polygon() {
        let point = transform_geometry(Geometry::Point { x: 5.0, y: 5.0 }, &[GeometryTransform::VerticalFlip], 50.0, 50.0);
        assert!(matches!(point, Geometry::Point { x, y } if x == 5.0 && y == 45.0));

        let polygon = transform_geometry(
            Geometry::Polygon { points: vec![(0.0, 0.0), (10.0, 10.0)] },
            &[GeometryTransform::VerticalFlip],
            50.0,
            50.0,
        );
        assert!(matches!(polygon, Geometry::Polygon { points } if points == vec![(0.0, 50.0), (10.0, 40.0)]));
    }
}
