use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::core::DimensionLimits;
use crate::format::registry::FormatKind;
use crate::format::variant::FormatVariant;

/// Request field a validation error is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Requested width.
    Width,
    /// Requested height.
    Height,
    /// Requested format name.
    Type,
}

impl Field {
    /// Wire name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Type => "type",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field → message map. Empty means the request passed; each field appears at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<Field, String>);

impl ValidationErrors {
    /// No field failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Message recorded for `field`, if it failed.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Whether `field` failed.
    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    /// Failing fields, in `width`, `height`, `type` order.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    /// `(field, message)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn record(&mut self, field: Field, message: String) {
        self.0.entry(field).or_insert(message);
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// A request that passed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Parsed width.
    pub width: u32,
    /// Parsed height.
    pub height: u32,
    /// Parsed format.
    pub format: FormatKind,
}

/// Limits of `variant` narrowed by the process-wide per-axis cap.
pub fn effective_limits<V: FormatVariant + ?Sized>(variant: &V, cap: Option<u32>) -> DimensionLimits {
    variant.config_limits().narrowed(cap)
}

/// Check the raw request fields. All three checks run; every failure is reported.
pub fn validate<V: FormatVariant + ?Sized>(
    width: &str,
    height: &str,
    format: &str,
    active: &V,
    cap: Option<u32>,
) -> ValidationErrors {
    match validate_request(width, height, format, active, cap) {
        Ok(_) => ValidationErrors::default(),
        Err(errors) => errors,
    }
}

/// Like [`validate`], but hands back the parsed values on success.
///
/// When `format` is unknown the dimensions are checked against the cap alone.
pub fn validate_request<V: FormatVariant + ?Sized>(
    width: &str,
    height: &str,
    format: &str,
    active: &V,
    cap: Option<u32>,
) -> Result<ValidatedRequest, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let kind = FormatKind::parse(format);
    if kind.is_none() {
        errors.record(Field::Type, format!("Unsupported image type \"{}\"", format.trim()));
    }

    let limits = match kind {
        Some(_) => effective_limits(active, cap),
        None => DimensionLimits::square(1, cap.unwrap_or(u32::MAX)),
    };

    let w = check_dimension(width, limits.min_width, limits.max_width, "Width");
    let h = check_dimension(height, limits.min_height, limits.max_height, "Height");

    let w = w.map_err(|msg| errors.record(Field::Width, msg)).ok();
    let h = h.map_err(|msg| errors.record(Field::Height, msg)).ok();

    match (w, h, kind) {
        (Some(width), Some(height), Some(format)) if errors.is_empty() => Ok(ValidatedRequest {
            width,
            height,
            format,
        }),
        _ => Err(errors),
    }
}

// Non-numeric and out-of-range input share one message so callers only render the range.
fn check_dimension(raw: &str, min: u32, max: u32, label: &str) -> Result<u32, String> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|v| (i64::from(min)..=i64::from(max)).contains(v))
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| format!("{label} must be an integer between {min} and {max}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::registry::variant;

    const CAP: Option<u32> = Some(10_000);

    #[test]
    fn valid_request_is_empty() {
        let png = variant(FormatKind::Png);
        assert!(validate("800", "600", "png", png, CAP).is_empty());
        assert!(validate(" 1 ", "10000", "PNG", png, CAP).is_empty());

        let ok = validate_request("800", "600", "Png", png, CAP).unwrap();
        assert_eq!(
            ok,
            ValidatedRequest {
                width: 800,
                height: 600,
                format: FormatKind::Png
            }
        );
    }

    #[test]
    fn zero_width_reports_only_width() {
        let errors = validate("0", "600", "png", variant(FormatKind::Png), CAP);
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec![Field::Width]);
        assert_eq!(
            errors.get(Field::Width),
            Some("Width must be an integer between 1 and 10000")
        );
    }

    #[test]
    fn messages_state_the_effective_range() {
        let ico = variant(FormatKind::Ico);
        let errors = validate("300", "15", "ico", ico, CAP);
        assert_eq!(
            errors.get(Field::Width),
            Some("Width must be an integer between 16 and 256")
        );
        assert_eq!(
            errors.get(Field::Height),
            Some("Height must be an integer between 16 and 256")
        );

        let webp = variant(FormatKind::WebP);
        let errors = validate("16384", "1", "webp", webp, None);
        assert_eq!(
            errors.get(Field::Width),
            Some("Width must be an integer between 1 and 16383")
        );
    }

    #[test]
    fn non_numeric_and_negative_are_range_errors() {
        let png = variant(FormatKind::Png);
        let errors = validate("abc", "-5", "png", png, CAP);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.get(Field::Width),
            Some("Width must be an integer between 1 and 10000")
        );
        assert_eq!(
            errors.get(Field::Height),
            Some("Height must be an integer between 1 and 10000")
        );
        assert!(validate("1.5", "", "png", png, CAP).contains(Field::Height));
        assert!(validate("99999999999999999999", "1", "png", png, CAP).contains(Field::Width));
    }

    #[test]
    fn unknown_format_falls_back_to_the_cap() {
        let ico = variant(FormatKind::Ico);
        // 300 is over ICO's limit but within the cap; only the type is wrong.
        let errors = validate("300", "300", "jpg", ico, CAP);
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec![Field::Type]);

        let errors = validate("0", "20000", "bogus", ico, CAP);
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec![Field::Width, Field::Height, Field::Type]
        );
        assert!(errors.to_string().starts_with("width: "));
    }

    #[test]
    fn cap_below_the_floor_rejects_everything() {
        let ico = variant(FormatKind::Ico);
        let errors = validate("16", "16", "ico", ico, Some(8));
        assert_eq!(
            errors.get(Field::Width),
            Some("Width must be an integer between 16 and 8")
        );
    }

    #[test]
    fn errors_serialize_as_a_flat_map() {
        let errors = validate("0", "1", "gif", variant(FormatKind::Gif), CAP);
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"width": "Width must be an integer between 1 and 10000"})
        );
    }
}
