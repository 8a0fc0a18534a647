use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Placeholder used for sector/city when the input leaves them blank.
pub const UNSPECIFIED: &str = "No especificado";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub sector: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

/// Company fields as submitted by a form, API call or CSV row.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NewCompany {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub city: String,
}

impl NewCompany {
    /// Trims every field and fills sector/city defaults.
    /// Fails when the name is blank.
    pub fn normalized(self) -> Result<NewCompany, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("Company name is required".to_string());
        }
        Ok(NewCompany {
            name,
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            sector: or_unspecified(&self.sector),
            city: or_unspecified(&self.city),
        })
    }
}

impl Company {
    pub fn from_new(id: i64, new: NewCompany, created_at: DateTime<Utc>) -> Self {
        Company {
            id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            sector: new.sector,
            city: new.city,
            created_at,
        }
    }
}

fn or_unspecified(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_rejects_blank_name() {
        let new = NewCompany {
            name: "   ".into(),
            ..Default::default()
        };
        assert!(new.normalized().is_err());
    }

    #[test]
    fn test_normalized_fills_defaults() {
        let new = NewCompany {
            name: " Acme ".into(),
            email: " HR@Acme.ES ".into(),
            ..Default::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(new.name, "Acme");
        assert_eq!(new.email, "hr@acme.es");
        assert_eq!(new.phone, "");
        assert_eq!(new.sector, UNSPECIFIED);
        assert_eq!(new.city, UNSPECIFIED);
    }

    #[test]
    fn test_normalized_keeps_given_sector() {
        let new = NewCompany {
            name: "Acme".into(),
            sector: "Tecnología".into(),
            city: "Sevilla".into(),
            ..Default::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(new.sector, "Tecnología");
        assert_eq!(new.city, "Sevilla");
    }
}
