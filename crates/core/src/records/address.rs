use super::{Record, RecordMeta};
use crate::constants::{ADDRESSES, CONTACT_PERSONS, DEFAULT_COUNTRY};
use crate::validation::{
    require, validate_email, validate_phone, validate_postal_code, INVALID_EMAIL, INVALID_PHONE,
    INVALID_POSTAL_CODE,
};
use crate::LogisticsResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A postal address. Stored on its own or embedded in sites and trials.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    #[serde(flatten)]
    pub meta: RecordMeta,
    /// Optional client-facing identifier such as `ADDR001`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_id: Option<String>,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    /// Country used for postal code validation.
    pub fn country_or_default(&self) -> &str {
        self.country
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COUNTRY)
    }
}

impl Record for Address {
    const COLLECTION: &'static str = ADDRESSES;
    const ENTITY: &'static str = "Address";
    const KEY_FIELD: &'static str = "_id";

    fn key(&self) -> Option<&str> {
        self.meta.id.as_deref()
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn check_format(&self) -> LogisticsResult<()> {
        require(
            validate_postal_code(&self.postal_code, self.country_or_default()),
            INVALID_POSTAL_CODE,
        )
    }
}

/// A person to contact at a site or on behalf of a patient.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContactPerson {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// e.g. "Nurse", "Doctor", "Site Manager".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// e.g. "Parent", "Guardian".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default)]
    pub associated_sites: Vec<String>,
}

impl Record for ContactPerson {
    const COLLECTION: &'static str = CONTACT_PERSONS;
    const ENTITY: &'static str = "ContactPerson";
    const KEY_FIELD: &'static str = "_id";

    fn key(&self) -> Option<&str> {
        self.meta.id.as_deref()
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn check_format(&self) -> LogisticsResult<()> {
        if let Some(email) = &self.email {
            require(validate_email(email), INVALID_EMAIL)?;
        }
        if let Some(phone) = &self.phone_number {
            require(validate_phone(phone), INVALID_PHONE)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogisticsError;

    fn address(postal_code: &str, country: Option<&str>) -> Address {
        Address {
            street: "123 Test St".into(),
            city: "Test City".into(),
            state: "TS".into(),
            postal_code: postal_code.into(),
            country: country.map(Into::into),
            ..Address::default()
        }
    }

    #[test]
    fn postal_code_defaults_to_us_rules() {
        assert!(address("12345", None).check_format().is_ok());
        let err = address("ABCDE", None).check_format().unwrap_err();
        assert!(matches!(err, LogisticsError::Validation(m) if m == INVALID_POSTAL_CODE));
    }

    #[test]
    fn postal_code_uses_country_rules() {
        assert!(address("K1A 0B1", Some("CA")).check_format().is_ok());
        assert!(address("ABCDE", Some("Test Country")).check_format().is_ok());
    }

    #[test]
    fn contact_person_checks_email_and_phone() {
        let mut contact = ContactPerson {
            name: "Dana".into(),
            email: Some("dana@example.com".into()),
            phone_number: Some("+15551234567".into()),
            ..ContactPerson::default()
        };
        assert!(contact.check_format().is_ok());

        contact.phone_number = Some("555-1234".into());
        let err = contact.check_format().unwrap_err();
        assert!(matches!(err, LogisticsError::Validation(m) if m == INVALID_PHONE));
    }
}
