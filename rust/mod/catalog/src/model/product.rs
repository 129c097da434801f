use serde::{Deserialize, Serialize};
use storeadmin_core::ServiceError;

/// Audience a product is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }

    /// Case-insensitive, surrounding whitespace ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("male") {
            Some(Self::Male)
        } else if s.eq_ignore_ascii_case("female") {
            Some(Self::Female)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog product.
///
/// `ml_id` is the numeric key the item-matching services know the product
/// by. It is allocated once on creation and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    /// Blob key (`bucket/object`) of the uploaded image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
    pub price: f64,
    pub category: String,
    pub gender: Gender,
    pub ml_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// An uploaded image file.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    /// Name the client sent; only its extension is kept.
    pub file_name: String,
    pub content_type: Option<String>,
}

impl ImageUpload {
    /// Lower-cased extension of the client file name, `bin` when there is none.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "bin".to_string())
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub price: f64,
    pub category: String,
    pub gender: String,
}

/// Partial product edit; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub gender: Option<String>,
}

impl ProductChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none() && self.category.is_none() && self.gender.is_none()
    }
}

pub(crate) fn validate_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("name cannot be empty".into()));
    }
    Ok(name.to_string())
}

pub(crate) fn validate_category(category: &str) -> Result<String, ServiceError> {
    let category = category.trim();
    if category.is_empty() {
        return Err(ServiceError::Validation("category cannot be empty".into()));
    }
    Ok(category.to_string())
}

pub(crate) fn validate_price(price: f64) -> Result<f64, ServiceError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ServiceError::Validation(format!("invalid price {}", price)));
    }
    Ok(price)
}

pub(crate) fn validate_gender(gender: &str) -> Result<Gender, ServiceError> {
    Gender::parse(gender).ok_or_else(|| {
        ServiceError::Validation(format!("gender must be Male or Female, got {:?}", gender))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_parses_case_insensitively() {
        assert_eq!(Gender::parse("male"), Some(Gender::Male));
        assert_eq!(Gender::parse(" FEMALE "), Some(Gender::Female));
        assert_eq!(Gender::parse("unisex"), None);
        assert_eq!(Gender::parse(""), None);
    }

    #[test]
    fn gender_serializes_capitalized() {
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), r#""Female""#);
    }

    #[test]
    fn image_extension() {
        let img = |name: &str| ImageUpload {
            bytes: vec![],
            file_name: name.into(),
            content_type: None,
        };
        assert_eq!(img("photo.PNG").extension(), "png");
        assert_eq!(img("archive.tar.gz").extension(), "gz");
        assert_eq!(img("noext").extension(), "bin");
        assert_eq!(img("weird.p/g").extension(), "bin");
    }

    #[test]
    fn price_must_be_finite_and_non_negative() {
        assert!(validate_price(0.0).is_ok());
        assert!(validate_price(19.99).is_ok());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
    }

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(validate_name("  Linen Shirt ").unwrap(), "Linen Shirt");
        assert!(validate_name("   ").is_err());
        assert!(validate_category("").is_err());
    }

    #[test]
    fn product_json_is_camel_case() {
        let p = Product {
            id: "p1".into(),
            name: "Shirt".into(),
            image_url: None,
            image_key: None,
            price: 10.0,
            category: "Tops".into(),
            gender: Gender::Male,
            ml_id: 7,
            created_at: "t".into(),
            updated_at: "t".into(),
        };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["mlId"], 7);
        assert_eq!(json["gender"], "Male");
        assert!(json.get("imageKey").is_none());
        assert!(json["imageUrl"].is_null());
    }
}
