use std::collections::HashMap;

use db::models::annotation::{Annotation, AnnotationType};
use db::models::dataset::LabelSchema;
use db::models::dataset_version::ManifestItem;
use serde_json::{Value, json};
use uuid::Uuid;

/// One manifest item plus the annotations that belong to it, the shape
/// every exporter below consumes. Callers assemble this by joining a
/// `DatasetVersion`'s manifest against `AnnotationRepository::list_for_item`.
pub type ExportItem = (ManifestItem, Vec<Annotation>);

/// Looks a label up by display name first, falling back to its schema id,
/// since `spec.md`'s worked example writes annotation labels as the
/// capitalized display form (`"Person"`) against a schema id of `"person"`.
fn category_ids(schema: &LabelSchema) -> HashMap<&str, i64> {
    let mut ids = HashMap::new();
    for (index, label) in schema.labels.iter().enumerate() {
        let category_id = (index + 1) as i64;
        ids.insert(label.name.as_str(), category_id);
        ids.entry(label.id.as_str()).or_insert(category_id);
    }
    ids
}

pub fn export_coco(dataset_description: &str, schema: &LabelSchema, items: &[ExportItem]) -> Value {
    let category_ids = category_ids(schema);

    let mut images = Vec::new();
    let mut image_ids: HashMap<Uuid, i64> = HashMap::new();
    let mut annotations = Vec::new();
    let mut next_annotation_id = 1i64;

    for (item, item_annotations) in items {
        let image_id = *image_ids.entry(item.media_id).or_insert_with(|| {
            let id = (image_ids.len() + 1) as i64;
            images.push(json!({ "id": id, "file_name": item.media_id.to_string() }));
            id
        });

        for ann in item_annotations {
            let category_id = category_ids.get(ann.label.as_str()).copied().unwrap_or(0);
            let geom = &ann.geometry.0;
            let entry = match ann.annotation_type {
                AnnotationType::Bbox => {
                    let (x, y, w, h) = bbox_fields(geom);
                    json!({
                        "id": next_annotation_id,
                        "image_id": image_id,
                        "category_id": category_id,
                        "bbox": [x, y, w, h],
                        "area": w * h,
                    })
                }
                AnnotationType::Polygon => {
                    let flat = polygon_flat(geom);
                    json!({
                        "id": next_annotation_id,
                        "image_id": image_id,
                        "category_id": category_id,
                        "segmentation": [flat],
                    })
                }
                _ => json!({ "id": next_annotation_id, "image_id": image_id, "category_id": category_id }),
            };
            annotations.push(entry);
            next_annotation_id += 1;
        }
    }

    let categories: Vec<Value> = schema
        .labels
        .iter()
        .enumerate()
        .map(|(index, label)| json!({ "id": index + 1, "name": label.name, "supercategory": "" }))
        .collect();

    json!({
        "info": { "description": dataset_description, "version": "1.0" },
        "images": images,
        "annotations": annotations,
        "categories": categories,
    })
}

/// Only bbox annotations produce a line; other geometry types have no YOLO
/// representation and are silently skipped, matching the original
/// exporter's behavior of writing one detection-format line per box.
pub fn export_yolo(schema: &LabelSchema, items: &[ExportItem]) -> String {
    let class_indices: HashMap<&str, usize> = schema
        .labels
        .iter()
        .enumerate()
        .flat_map(|(index, label)| [(label.name.as_str(), index), (label.id.as_str(), index)])
        .collect();

    let mut lines = Vec::new();
    for (item, annotations) in items {
        for ann in annotations {
            if ann.annotation_type != AnnotationType::Bbox {
                continue;
            }
            let Some(&class_idx) = class_indices.get(ann.label.as_str()) else {
                continue;
            };
            let (x, y, w, h) = bbox_fields(&ann.geometry.0);
            lines.push(format!("{}: {class_idx} {x} {y} {w} {h}", item.media_id));
        }
    }
    lines.join("\n")
}

pub fn export_csv(items: &[ExportItem]) -> String {
    let mut out = String::from("media_id,split,annotation_type,label,confidence,geometry\n");
    for (item, annotations) in items {
        for ann in annotations {
            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                item.media_id,
                item.split,
                ann.annotation_type,
                csv_field(&ann.label),
                ann.confidence,
                csv_field(&ann.geometry.0.to_string()),
            ));
        }
    }
    out
}

pub fn export_jsonl(items: &[ExportItem]) -> String {
    let mut out = String::new();
    for (item, annotations) in items {
        let entries: Vec<Value> = annotations
            .iter()
            .map(|ann| {
                json!({
                    "type": ann.annotation_type,
                    "label": ann.label,
                    "confidence": ann.confidence,
                    "geometry": ann.geometry.0,
                })
            })
            .collect();
        let line = json!({ "media_id": item.media_id, "split": item.split, "annotations": entries });
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out
}

fn bbox_fields(geom: &Value) -> (f64, f64, f64, f64) {
    (
        geom.get("x").and_then(Value::as_f64).unwrap_or(0.0),
        geom.get("y").and_then(Value::as_f64).unwrap_or(0.0),
        geom.get("w").and_then(Value::as_f64).unwrap_or(0.0),
        geom.get("h").and_then(Value::as_f64).unwrap_or(0.0),
    )
}

fn polygon_flat(geom: &Value) -> Vec<f64> {
    geom.get("points")
        .and_then(Value::as_array)
        .map(|points| {
            points
                .iter()
                .flat_map(|p| p.as_array().into_iter().flatten().filter_map(Value::as_f64))
                .collect()
        })
        .unwrap_or_default()
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::annotation::AnnotationSource;
    use db::models::dataset::LabelDef;
    use chrono::Utc;

    fn schema() -> LabelSchema {
        LabelSchema {
            labels: vec![
                LabelDef { id: "person".to_string(), name: "Person".to_string(), color: "#f00".to_string() },
                LabelDef { id: "car".to_string(), name: "Car".to_string(), color: "#0f0".to_string() },
            ],
            attributes: json!({}),
        }
    }

    fn bbox_annotation(dataset_item_id: Uuid, label: &str, x: f64, y: f64, w: f64, h: f64) -> Annotation {
        Annotation {
            id: Uuid::new_v4(),
            dataset_item_id,
            user_id: Uuid::new_v4(),
            annotation_type: AnnotationType::Bbox,
            label: label.to_string(),
            confidence: 1.0,
            geometry: sqlx::types::Json(json!({ "x": x, "y": y, "w": w, "h": h })),
            attributes: sqlx::types::Json(json!({})),
            frame_or_time: None,
            source: AnnotationSource::Manual,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn polygon_annotation(dataset_item_id: Uuid, label: &str, points: Vec<(f64, f64)>) -> Annotation {
        Annotation {
            id: Uuid::new_v4(),
            dataset_item_id,
            user_id: Uuid::new_v4(),
            annotation_type: AnnotationType::Polygon,
            label: label.to_string(),
            confidence: 1.0,
            geometry: sqlx::types::Json(json!({ "points": points.into_iter().map(|(x,y)| vec![x,y]).collect::<Vec<_>>() })),
            attributes: sqlx::types::Json(json!({})),
            frame_or_time: None,
            source: AnnotationSource::Manual,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn coco_export_matches_the_worked_example() {
        let media_1 = Uuid::new_v4();
        let media_2 = Uuid::new_v4();
        let item_1 = ManifestItem { item_id: Uuid::new_v4(), media_id: media_1, split: "train".to_string() };
        let item_2 = ManifestItem { item_id: Uuid::new_v4(), media_id: media_2, split: "train".to_string() };

        let items = vec![
            (
                item_1.clone(),
                vec![
                    bbox_annotation(item_1.item_id, "Person", 10.0, 20.0, 100.0, 200.0),
                    bbox_annotation(item_1.item_id, "Car", 300.0, 100.0, 200.0, 150.0),
                ],
            ),
            (item_2.clone(), vec![polygon_annotation(item_2.item_id, "Person", vec![(10.0, 10.0), (50.0, 10.0), (50.0, 50.0), (10.0, 50.0)])]),
        ];

        let coco = export_coco("test", &schema(), &items);
        assert_eq!(coco["images"].as_array().unwrap().len(), 2);
        assert_eq!(coco["annotations"].as_array().unwrap().len(), 3);
        assert_eq!(coco["annotations"][0]["bbox"], json!([10.0, 20.0, 100.0, 200.0]));
        assert_eq!(coco["annotations"][0]["area"], json!(20000.0));
        assert_eq!(coco["annotations"][2]["segmentation"], json!([[10.0, 10.0, 50.0, 10.0, 50.0, 50.0, 10.0, 50.0]]));
        assert_eq!(coco["categories"], json!([{"id": 1, "name": "Person", "supercategory": ""}, {"id": 2, "name": "Car", "supercategory": ""}]));
    }

    #[test]
    fn yolo_export_skips_non_bbox_geometry() {
        let item = ManifestItem { item_id: Uuid::new_v4(), media_id: Uuid::new_v4(), split: "train".to_string() };
        let items = vec![(
            item.clone(),
            vec![bbox_annotation(item.item_id, "Person", 1.0, 2.0, 3.0, 4.0), polygon_annotation(item.item_id, "Car", vec![(0.0, 0.0)])],
        )];
        let yolo = export_yolo(&schema(), &items);
        assert_eq!(yolo.lines().count(), 1);
        assert!(yolo.contains("0 1 2 3 4"));
    }

    #[test]
    fn csv_export_quotes_fields_containing_commas() {
        let item = ManifestItem { item_id: Uuid::new_v4(), media_id: Uuid::new_v4(), split: "train".to_string() };
        let items = vec![(item.clone(), vec![bbox_annotation(item.item_id, "Person, VIP", 0.0, 0.0, 1.0, 1.0)])];
        let csv = export_csv(&items);
        assert!(csv.contains("\"Person, VIP\""));
    }

    #[test]
    fn jsonl_export_writes_one_line_per_item() {
        let item_1 = ManifestItem { item_id: Uuid::new_v4(), media_id: Uuid::new_v4(), split: "train".to_string() };
        let item_2 = ManifestItem { item_id: Uuid::new_v4(), media_id: Uuid::new_v4(), split: "val".to_string() };
        let items = vec![(item_1, vec![]), (item_2, vec![])];
        let jsonl = export_jsonl(&items);
        assert_eq!(jsonl.lines().count(), 2);
    }
}
