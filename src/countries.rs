//! Country reference data
//!
//! The live list comes from an external provider; when that fails the form
//! falls back to the embedded list below. Option labels carry a flag emoji
//! prefix which restore has to see through.

use serde::{Deserialize, Serialize};

use crate::schema::{Choices, FormSchema, SelectOption};

/// A country as the select options need it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// ISO 3166-1 alpha-3, used as the option value
    pub code: String,
    /// ISO 3166-1 alpha-2, used for the flag emoji
    pub alpha2: String,
    pub display_name: String,
}

impl Country {
    pub fn new(code: &str, alpha2: &str, display_name: &str) -> Self {
        Self {
            code: code.to_string(),
            alpha2: alpha2.to_string(),
            display_name: display_name.to_string(),
        }
    }

    /// `<option>` with a flag-decorated label
    pub fn to_option(&self) -> SelectOption {
        let label = match flag_emoji(&self.alpha2) {
            Some(flag) => format!("{} {}", flag, self.display_name),
            None => self.display_name.clone(),
        };
        SelectOption::new(self.code.clone(), label)
    }
}

/// Embedded list used when the provider is unreachable
pub fn fallback_countries() -> Vec<Country> {
    vec![
        Country::new("USA", "US", "Estados Unidos"),
        Country::new("MEX", "MX", "México"),
        Country::new("CAN", "CA", "Canadá"),
        Country::new("ESP", "ES", "España"),
        Country::new("COL", "CO", "Colombia"),
        Country::new("ARG", "AR", "Argentina"),
        Country::new("PER", "PE", "Perú"),
        Country::new("CHL", "CL", "Chile"),
        Country::new("BRA", "BR", "Brasil"),
        Country::new("FRA", "FR", "Francia"),
        Country::new("DEU", "DE", "Alemania"),
        Country::new("ITA", "IT", "Italia"),
        Country::new("GBR", "GB", "Reino Unido"),
        Country::new("CHN", "CN", "China"),
        Country::new("JPN", "JP", "Japón"),
        Country::new("IND", "IN", "India"),
        Country::new("RUS", "RU", "Rusia"),
        Country::new("AUS", "AU", "Australia"),
    ]
}

/// Provider result, or the embedded list on failure. Sorted by display name.
pub fn countries_or_fallback<E: std::fmt::Display>(
    fetched: Result<Vec<Country>, E>,
) -> Vec<Country> {
    let mut countries = match fetched {
        Ok(list) if !list.is_empty() => list,
        Ok(_) => {
            log::warn!("Country provider returned no entries, using local list");
            fallback_countries()
        }
        Err(e) => {
            log::warn!("Country provider failed ({}), using local list", e);
            fallback_countries()
        }
    };
    countries.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    countries
}

/// Regional-indicator pair for a two-letter code
pub fn flag_emoji(alpha2: &str) -> Option<String> {
    if alpha2.len() != 2 || !alpha2.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    alpha2
        .to_ascii_uppercase()
        .chars()
        .map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect()
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

/// Label text without flag emoji, trimmed
pub fn strip_flag(label: &str) -> String {
    label
        .chars()
        .filter(|c| !is_regional_indicator(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Names of every country-backed select in the schema
pub fn country_selects(schema: &FormSchema) -> impl Iterator<Item = &str> {
    schema
        .fields()
        .filter(|f| f.choices == Choices::Countries)
        .map(|f| f.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_emoji() {
        assert_eq!(flag_emoji("mx").as_deref(), Some("\u{1F1F2}\u{1F1FD}"));
        assert_eq!(flag_emoji("MEX"), None);
        assert_eq!(flag_emoji("1A"), None);
    }

    #[test]
    fn test_strip_flag_round_trip() {
        let option = Country::new("ESP", "ES", "España").to_option();
        assert_eq!(option.value, "ESP");
        assert!(option.label.ends_with(" España"));
        assert_eq!(strip_flag(&option.label), "España");
        assert_eq!(strip_flag("Plain"), "Plain");
    }

    #[test]
    fn test_fallback_on_error() {
        let countries = countries_or_fallback::<String>(Err("HTTP 503".to_string()));
        assert_eq!(countries.len(), 18);
        assert_eq!(countries[0].display_name, "Alemania");
    }

    #[test]
    fn test_fetched_list_is_sorted() {
        let fetched = vec![
            Country::new("ZMB", "ZM", "Zambia"),
            Country::new("AUT", "AT", "Austria"),
        ];
        let countries = countries_or_fallback::<String>(Ok(fetched));
        assert_eq!(countries[0].code, "AUT");
    }

    #[test]
    fn test_country_selects() {
        let schema = FormSchema::visa_application();
        let names: Vec<_> = country_selects(&schema).collect();
        assert_eq!(
            names,
            vec!["birthCountry", "nationality", "passportIssuingCountry", "country"]
        );
    }
}
