//! Field validation for create payloads
//!
//! Turns an untyped JSON body into a [`Tree`], or reports every failing
//! field at once. Numeric attributes accept numeric strings and are
//! coerced. Empty strings on enum and URL attributes count as absent.

use serde_json::{Map, Value};
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::tree::Tree;

/// Accepted values of `developmentStage`
pub const DEVELOPMENT_STAGES: &[&str] = &["M", "A", "J"];

/// Accepted values of `outstandingQualification`
pub const QUALIFICATIONS: &[&str] = &["Paysager", "Historique", "Botanique", "Symbolique"];

/// Inclusive bounds of `plantationYear`
pub const PLANTATION_YEARS: (i32, i32) = (1800, 2025);

const LONGITUDE_RANGE: &str = "Longitude must be between -180 and 180";
const LATITUDE_RANGE: &str = "Latitude must be between 0 and 90";

/// Build a Tree from a create payload.
pub fn tree_from_json(payload: &Value) -> StoreResult<Tree> {
    let Some(object) = payload.as_object() else {
        return Err(StoreError::Validation(vec![
            "payload must be a JSON object".into(),
        ]));
    };

    let mut fields = Fields { object, errors: Vec::new() };

    let id = fields.id();
    let name = fields.required_text("name");
    let common_name = fields.text("commonName");
    let botanic_name = fields.text("botanicName");
    let height = fields.number(
        "height",
        (0.0, "Height must be positive"),
        (150.0, "Maximum height is 150 meters"),
    );
    let circumference = fields.number(
        "circumference",
        (0.0, "Circumference must be positive"),
        (5000.0, "Maximum circumference is 5000 cm"),
    );
    let development_stage = fields.one_of("developmentStage", DEVELOPMENT_STAGES);
    let plantation_year = fields.year("plantationYear");
    let outstanding_qualification = fields.one_of("outstandingQualification", QUALIFICATIONS);
    let summary = fields.text("summary");
    let description = fields.text("description");
    let genus = fields.text("type");
    let species = fields.text("species");
    let variety = fields.text("variety");
    let sign = fields.url("sign");
    let picture = fields.url("picture");
    let longitude = fields.number(
        "longitude",
        (-180.0, LONGITUDE_RANGE),
        (180.0, LONGITUDE_RANGE),
    );
    let latitude = fields.number("latitude", (0.0, LATITUDE_RANGE), (90.0, LATITUDE_RANGE));
    let address = fields.text("address");
    let address_bis = fields.text("addressBis");

    if !fields.errors.is_empty() {
        return Err(StoreError::Validation(fields.errors));
    }

    Ok(Tree {
        id,
        name: name.unwrap_or_default(),
        common_name,
        botanic_name,
        height,
        circumference,
        development_stage,
        plantation_year,
        outstanding_qualification,
        summary,
        description,
        genus,
        species,
        variety,
        sign,
        picture,
        longitude,
        latitude,
        address,
        address_bis,
    })
}

/// Field reader that accumulates errors instead of stopping at the first.
struct Fields<'a> {
    object: &'a Map<String, Value>,
    errors: Vec<String>,
}

impl<'a> Fields<'a> {
    /// Present, non-null value of `key`.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|v| !v.is_null())
    }

    fn id(&mut self) -> u64 {
        match self.get("id") {
            None => 0,
            Some(value) => match value.as_u64() {
                Some(id) => id,
                None if value.as_i64().is_some() => {
                    self.errors.push("ID must be positive".into());
                    0
                }
                None => {
                    self.errors.push("id must be an integer number".into());
                    0
                }
            },
        }
    }

    fn text(&mut self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.errors.push(format!("{} must be a string", key));
                None
            }
        }
    }

    fn required_text(&mut self, key: &str) -> Option<String> {
        if self.get(key).is_none() {
            self.errors.push(format!("{} should not be empty", key));
            return None;
        }
        let text = self.text(key)?;
        if text.trim().is_empty() {
            self.errors.push(format!("{} should not be empty", key));
            return None;
        }
        Some(text)
    }

    /// Number or numeric string, coerced to f64.
    fn numeric(&mut self, key: &str) -> Option<f64> {
        let parsed = match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if v.is_finite() => Some(v),
            _ => {
                self.errors.push(format!("{} must be a number", key));
                None
            }
        }
    }

    /// Number within `[min, max]`. Each bound carries its own message.
    fn number(&mut self, key: &str, min: (f64, &str), max: (f64, &str)) -> Option<f64> {
        let value = self.numeric(key)?;
        let message = if value < min.0 {
            min.1
        } else if value > max.0 {
            max.1
        } else {
            return Some(value);
        };
        self.errors.push(message.to_string());
        None
    }

    fn year(&mut self, key: &str) -> Option<i32> {
        let value = self.numeric(key)?;
        if value.fract() != 0.0 {
            self.errors.push(format!("{} must be an integer number", key));
            return None;
        }
        let (min, max) = PLANTATION_YEARS;
        if value < f64::from(min) || value > f64::from(max) {
            self.errors.push(format!("{} must be between {} and {}", key, min, max));
            return None;
        }
        Some(value as i32)
    }

    fn one_of(&mut self, key: &str, allowed: &[&str]) -> Option<String> {
        let value = self.text(key)?;
        if value.is_empty() {
            return None;
        }
        if !allowed.contains(&value.as_str()) {
            self.errors.push(format!(
                "{} must be one of the following values: {}",
                key,
                allowed.join(", ")
            ));
            return None;
        }
        Some(value)
    }

    fn url(&mut self, key: &str) -> Option<String> {
        let value = self.text(key)?;
        if value.is_empty() {
            return None;
        }
        match Url::parse(&value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => {
                Some(value)
            }
            _ => {
                self.errors.push(format!("{} must be a URL address", key));
                None
            }
        }
    }
}
