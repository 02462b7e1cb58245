/// Below this `max_confidence` the verdict is presented as uncertain.
pub const CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Class order matches the classifier's probability vector: 8 diagnostic
/// classes followed by the synthetic "Not confident" class.
pub const CLASS_LABELS: [&str; 9] = [
    "MEL",
    "NV",
    "BCC",
    "AKIEC",
    "BKL",
    "DF",
    "VASC",
    "SCC",
    "Not confident",
];

pub fn prediction_label(prediction: i64) -> &'static str {
    usize::try_from(prediction)
        .ok()
        .and_then(|index| CLASS_LABELS.get(index))
        .copied()
        .unwrap_or("Unknown")
}

pub fn full_name(label: &str) -> &'static str {
    match label {
        "MEL" => "Melanoma",
        "NV" => "Melanocytic nevus",
        "BCC" => "Basal cell carcinoma",
        "AKIEC" => "Actinic keratosis",
        "BKL" => "Benign keratosis",
        "DF" => "Dermatofibroma",
        "VASC" => "Vascular lesion",
        "SCC" => "Squamous cell carcinoma",
        "Not confident" => "Uncertain prediction",
        _ => "Unknown",
    }
}

pub fn description(label: &str) -> &'static str {
    match label {
        "MEL" => "A serious form of skin cancer that develops from pigment-producing cells",
        "NV" => "A common benign mole formed by clusters of pigment cells",
        "BCC" => "The most common type of skin cancer, usually slow-growing",
        "AKIEC" => "A rough, scaly patch caused by sun damage that may become cancerous",
        "BKL" => "A non-cancerous growth that appears with age",
        "DF" => "A harmless firm bump that often appears on the legs",
        "VASC" => "Abnormal blood vessel growths in the skin",
        "SCC" => "A common form of skin cancer from squamous cells",
        "Not confident" => "The model is uncertain about this classification",
        _ => "Unknown",
    }
}

pub fn is_confident(max_confidence: f64) -> bool {
    max_confidence >= CONFIDENCE_THRESHOLD
}
