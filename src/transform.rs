//! Preprocessing stages applied before clustering: categorical encoding,
//! standard scaling and the optional PCA projection

use ndarray::{Array1, Array2, ArrayView1};
use serde::Deserialize;

use crate::data::{CustomerRecord, Feature};
use crate::error::{ArtifactError, TransformError};

/// What to do with a category the encoder never saw during fitting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Encode as all zeros
    Ignore,
}

/// One block of encoder output columns
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoding {
    Passthrough {
        field: Feature,
    },
    OneHot {
        field: Feature,
        categories: Vec<String>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
    Ordinal {
        field: Feature,
        categories: Vec<String>,
    },
}

impl ColumnEncoding {
    fn field(&self) -> Feature {
        match self {
            ColumnEncoding::Passthrough { field }
            | ColumnEncoding::OneHot { field, .. }
            | ColumnEncoding::Ordinal { field, .. } => *field,
        }
    }

    fn width(&self) -> usize {
        match self {
            ColumnEncoding::OneHot { categories, .. } => categories.len(),
            _ => 1,
        }
    }
}

/// Maps a record onto the column layout the model was fit on
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Encoder {
    pub columns: Vec<ColumnEncoding>,
}

impl Encoder {
    pub(crate) fn validate(&self) -> Result<(), ArtifactError> {
        if self.columns.is_empty() {
            return Err(ArtifactError::invalid("encoder", "no columns"));
        }

        for column in &self.columns {
            let field = column.field();
            match column {
                ColumnEncoding::Passthrough { .. } if field.is_categorical() => {
                    return Err(ArtifactError::invalid(
                        "encoder",
                        format!("passthrough column {} is categorical", field),
                    ));
                }
                ColumnEncoding::OneHot { categories, .. }
                | ColumnEncoding::Ordinal { categories, .. } => {
                    if !field.is_categorical() {
                        return Err(ArtifactError::invalid(
                            "encoder",
                            format!("categorical encoding applied to numeric column {}", field),
                        ));
                    }
                    if categories.is_empty() {
                        return Err(ArtifactError::invalid(
                            "encoder",
                            format!("column {} has no categories", field),
                        ));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Number of columns produced by `transform`
    pub fn output_width(&self) -> usize {
        self.columns.iter().map(ColumnEncoding::width).sum()
    }

    pub fn transform(&self, record: &CustomerRecord) -> Result<Array1<f64>, TransformError> {
        let mut encoded = Vec::with_capacity(self.output_width());

        for column in &self.columns {
            match column {
                ColumnEncoding::Passthrough { field } => {
                    encoded.push(numeric_value(record, *field)?);
                }
                ColumnEncoding::OneHot {
                    field,
                    categories,
                    handle_unknown,
                } => {
                    let value = categorical_value(record, *field)?;
                    let position = categories.iter().position(|c| c == value);
                    if position.is_none() && *handle_unknown == HandleUnknown::Error {
                        return Err(unknown_category(*field, value));
                    }
                    encoded.extend((0..categories.len()).map(|i| {
                        if Some(i) == position {
                            1.0
                        } else {
                            0.0
                        }
                    }));
                }
                ColumnEncoding::Ordinal { field, categories } => {
                    let value = categorical_value(record, *field)?;
                    let index = categories
                        .iter()
                        .position(|c| c == value)
                        .ok_or_else(|| unknown_category(*field, value))?;
                    encoded.push(index as f64);
                }
            }
        }

        Ok(Array1::from(encoded))
    }
}

fn numeric_value(record: &CustomerRecord, field: Feature) -> Result<f64, TransformError> {
    let value = record.numeric(field).ok_or(TransformError::WrongKind {
        feature: field.name(),
    })?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TransformError::NonFinite { stage: "encoder" })
    }
}

fn categorical_value(record: &CustomerRecord, field: Feature) -> Result<&str, TransformError> {
    record.categorical(field).ok_or(TransformError::WrongKind {
        feature: field.name(),
    })
}

fn unknown_category(field: Feature, value: &str) -> TransformError {
    TransformError::UnknownCategory {
        feature: field.name(),
        value: value.to_string(),
    }
}

/// Standardization with per-column mean and scale
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl Scaler {
    pub(crate) fn validate(&self, input_width: usize) -> Result<(), ArtifactError> {
        if self.mean.len() != input_width || self.scale.len() != input_width {
            return Err(ArtifactError::invalid(
                "scaler",
                format!(
                    "expected {} columns to match the encoder, found mean={} scale={}",
                    input_width,
                    self.mean.len(),
                    self.scale.len()
                ),
            ));
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err(ArtifactError::invalid("scaler", "non-finite parameter"));
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, features: ArrayView1<f64>) -> Result<Array1<f64>, TransformError> {
        check_width("scaler", self.width(), features.len())?;

        let scaled: Array1<f64> = features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&mean, &scale))| {
                // Constant columns were fit with zero variance
                let scale = if scale == 0.0 { 1.0 } else { scale };
                (x - mean) / scale
            })
            .collect();

        ensure_finite("scaler", scaled)
    }
}

/// Linear projection onto principal components
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ProjectorFile")]
pub struct Projector {
    mean: Array1<f64>,
    /// (n_components, n_features)
    components: Array2<f64>,
    /// Per-component divisor when whitening
    whitening: Option<Array1<f64>>,
}

#[derive(Deserialize)]
struct ProjectorFile {
    mean: Vec<f64>,
    components: Vec<Vec<f64>>,
    #[serde(default)]
    explained_variance: Option<Vec<f64>>,
    #[serde(default)]
    whiten: bool,
}

impl TryFrom<ProjectorFile> for Projector {
    type Error = String;

    fn try_from(file: ProjectorFile) -> Result<Self, Self::Error> {
        let components = rows_to_array(file.components).map_err(|e| format!("components {}", e))?;
        if components.ncols() != file.mean.len() {
            return Err(format!(
                "components have {} columns but mean has {}",
                components.ncols(),
                file.mean.len()
            ));
        }

        let whitening = if file.whiten {
            let variance = file
                .explained_variance
                .ok_or("whiten requires explained_variance")?;
            if variance.len() != components.nrows() {
                return Err(format!(
                    "explained_variance has {} entries for {} components",
                    variance.len(),
                    components.nrows()
                ));
            }
            if variance.iter().any(|&v| v.is_nan() || v <= 0.0) {
                return Err("explained_variance must be positive".to_string());
            }
            Some(variance.iter().map(|v| v.sqrt()).collect())
        } else {
            None
        };

        Ok(Self {
            mean: Array1::from(file.mean),
            components,
            whitening,
        })
    }
}

impl Projector {
    pub fn new(mean: Array1<f64>, components: Array2<f64>) -> Self {
        Self {
            mean,
            components,
            whitening: None,
        }
    }

    pub fn input_width(&self) -> usize {
        self.components.ncols()
    }

    pub fn output_width(&self) -> usize {
        self.components.nrows()
    }

    pub fn transform(&self, features: ArrayView1<f64>) -> Result<Array1<f64>, TransformError> {
        check_width("projector", self.input_width(), features.len())?;

        let centered = &features - &self.mean;
        let mut projected = self.components.dot(&centered);
        if let Some(divisor) = &self.whitening {
            projected /= divisor;
        }

        ensure_finite("projector", projected)
    }
}

/// Convert nested rows into a matrix, rejecting ragged or empty input
pub(crate) fn rows_to_array(rows: Vec<Vec<f64>>) -> Result<Array2<f64>, String> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if n_rows == 0 || n_cols == 0 {
        return Err("must not be empty".to_string());
    }
    if rows.iter().any(|row| row.len() != n_cols) {
        return Err("rows have differing lengths".to_string());
    }

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|e| e.to_string())
}

pub(crate) fn check_width(
    stage: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), TransformError> {
    if expected == found {
        Ok(())
    } else {
        Err(TransformError::DimensionMismatch {
            stage,
            expected,
            found,
        })
    }
}

fn ensure_finite(stage: &'static str, values: Array1<f64>) -> Result<Array1<f64>, TransformError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(values)
    } else {
        Err(TransformError::NonFinite { stage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::sample_form;
    use ndarray::array;

    fn sample_record() -> CustomerRecord {
        CustomerRecord::from_form(&sample_form()).unwrap()
    }

    fn encoder_json(handle_unknown: &str) -> String {
        format!(
            r#"{{"columns": [
                {{"kind": "passthrough", "field": "Income"}},
                {{"kind": "passthrough", "field": "Total_Kids"}},
                {{"kind": "one_hot", "field": "Education",
                  "categories": ["Basic", "Graduation", "PhD"],
                  "handle_unknown": "{}"}},
                {{"kind": "ordinal", "field": "Marital_Status",
                  "categories": ["Single", "Married"]}}
            ]}}"#,
            handle_unknown
        )
    }

    #[test]
    fn test_encoder_column_order() {
        let encoder: Encoder = serde_json::from_str(&encoder_json("error")).unwrap();
        encoder.validate().unwrap();
        assert_eq!(encoder.output_width(), 6);

        let encoded = encoder.transform(&sample_record()).unwrap();
        assert_eq!(encoded, array![50000.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_encoder_unknown_category() {
        let encoder: Encoder = serde_json::from_str(&encoder_json("error")).unwrap();
        let mut record = sample_record();
        record.education = "Doctorate".to_string();

        let err = encoder.transform(&record).unwrap_err();
        assert_eq!(
            err,
            TransformError::UnknownCategory {
                feature: "Education",
                value: "Doctorate".to_string()
            }
        );

        // Ignoring unknowns zeroes the one-hot block
        let encoder: Encoder = serde_json::from_str(&encoder_json("ignore")).unwrap();
        let encoded = encoder.transform(&record).unwrap();
        assert_eq!(encoded, array![50000.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

        // Ordinal columns always reject unknowns
        record.education = "PhD".to_string();
        record.marital_status = "YOLO".to_string();
        assert!(encoder.transform(&record).is_err());
    }

    #[test]
    fn test_encoder_validation() {
        let encoder: Encoder = serde_json::from_str(
            r#"{"columns": [{"kind": "passthrough", "field": "Education"}]}"#,
        )
        .unwrap();
        assert!(encoder.validate().is_err());

        let encoder: Encoder = serde_json::from_str(
            r#"{"columns": [{"kind": "one_hot", "field": "Age", "categories": ["a"]}]}"#,
        )
        .unwrap();
        assert!(encoder.validate().is_err());

        let encoder: Encoder = serde_json::from_str(
            r#"{"columns": [{"kind": "ordinal", "field": "Education", "categories": []}]}"#,
        )
        .unwrap();
        assert!(encoder.validate().is_err());

        let encoder = Encoder { columns: vec![] };
        assert!(encoder.validate().is_err());
    }

    #[test]
    fn test_scaler_transform() {
        let scaler = Scaler {
            mean: vec![10.0, 5.0, 3.0],
            scale: vec![2.0, 0.0, 0.5],
        };
        scaler.validate(3).unwrap();

        let scaled = scaler.transform(array![14.0, 7.0, 2.0].view()).unwrap();
        assert_eq!(scaled, array![2.0, 2.0, -2.0]);

        assert_eq!(
            scaler.transform(array![1.0, 2.0].view()),
            Err(TransformError::DimensionMismatch {
                stage: "scaler",
                expected: 3,
                found: 2
            })
        );
        assert!(scaler.validate(4).is_err());
    }

    #[test]
    fn test_projector_transform() {
        let projector: Projector = serde_json::from_str(
            r#"{"mean": [1.0, 1.0, 0.0], "components": [[1.0, 0.0, 0.0], [0.0, 0.5, 0.5]]}"#,
        )
        .unwrap();
        assert_eq!(projector.input_width(), 3);
        assert_eq!(projector.output_width(), 2);

        let projected = projector.transform(array![3.0, 3.0, 2.0].view()).unwrap();
        assert_eq!(projected, array![2.0, 2.0]);

        assert!(projector.transform(array![1.0].view()).is_err());
    }

    #[test]
    fn test_projector_whitening() {
        let projector: Projector = serde_json::from_str(
            r#"{"mean": [0.0, 0.0], "components": [[1.0, 0.0], [0.0, 1.0]],
                "explained_variance": [4.0, 1.0], "whiten": true}"#,
        )
        .unwrap();

        let projected = projector.transform(array![4.0, 3.0].view()).unwrap();
        assert_eq!(projected, array![2.0, 3.0]);

        let missing_variance = serde_json::from_str::<Projector>(
            r#"{"mean": [0.0], "components": [[1.0]], "whiten": true}"#,
        );
        assert!(missing_variance.is_err());
    }

    #[test]
    fn test_projector_rejects_malformed_matrices() {
        let ragged = serde_json::from_str::<Projector>(
            r#"{"mean": [0.0, 0.0], "components": [[1.0, 0.0], [1.0]]}"#,
        );
        assert!(ragged.is_err());

        let wrong_mean =
            serde_json::from_str::<Projector>(r#"{"mean": [0.0], "components": [[1.0, 0.0]]}"#);
        assert!(wrong_mean.is_err());
    }
}
