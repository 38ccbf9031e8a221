use shared::AnnotationLabel;

pub const DISEASE_KEYWORDS: [&str; 12] = [
    "disease", "fungus", "blight", "spot", "wilt", "rot", "mold", "pest", "damage", "brown",
    "yellow", "dead",
];

pub const HEALTHY_KEYWORDS: [&str; 4] = ["healthy", "green", "fresh", "vibrant"];

pub const PLANT_KEYWORDS: [&str; 11] = [
    "plant", "leaf", "disease", "fungus", "blight", "spot", "wilt", "rot", "mold", "pest",
    "insect",
];

pub const HEALTHY_DIAGNOSIS: &str = "Healthy Plant";
pub const UNKNOWN_DIAGNOSIS: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    pub label: String,
    pub confidence: f64,
    /// Healthy keywords matched and no disease keyword did.
    pub is_healthy: bool,
    pub is_diseased: bool,
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Keyword heuristic over the provider's labels, evaluated in input order.
///
/// The highest-scoring disease label wins (first seen on ties). Without one the
/// result falls back to "Healthy Plant", then to the first label, then to "Unknown".
pub fn classify(labels: &[AnnotationLabel]) -> Diagnosis {
    let mut is_diseased = false;
    let mut is_healthy = false;
    let mut top_disease: Option<&AnnotationLabel> = None;
    let mut confidence = 0.0;

    for label in labels {
        let text = label.description.to_lowercase();

        if contains_any(&text, &DISEASE_KEYWORDS) {
            is_diseased = true;
            if label.score > confidence {
                confidence = label.score;
                top_disease = Some(label);
            }
        }

        if contains_any(&text, &HEALTHY_KEYWORDS) {
            is_healthy = true;
        }
    }

    let label = match (top_disease, labels.first()) {
        (Some(disease), _) if is_diseased => disease.description.clone(),
        _ if is_healthy && !is_diseased => HEALTHY_DIAGNOSIS.to_string(),
        (_, Some(first)) => {
            confidence = first.score;
            first.description.clone()
        }
        (_, None) => UNKNOWN_DIAGNOSIS.to_string(),
    };

    Diagnosis {
        label,
        confidence,
        is_healthy: is_healthy && !is_diseased,
        is_diseased,
    }
}

/// Labels that look like they describe a plant or a plant problem.
pub fn plant_related(labels: &[AnnotationLabel]) -> Vec<&AnnotationLabel> {
    labels
        .iter()
        .filter(|label| contains_any(&label.description.to_lowercase(), &PLANT_KEYWORDS))
        .collect()
}
