//! Input shape validation.
//!
//! Fields are forwarded verbatim once they are present and well formed.
//! Anything missing or malformed becomes a `400` prompt before any call.

use axum::extract::Multipart;
use serde::{de, Deserialize, Deserializer};
use std::collections::HashMap;

use crate::http::error::ApiError;
use crate::orchestrator::{parse_amount, Amount, CertificationRequest, RegistrationRequest, Token};
use crate::storage::FilePayload;

/// Text and file fields of a multipart form.
#[derive(Debug, Default)]
pub struct FormFields {
    texts: HashMap<String, String>,
    files: HashMap<String, FilePayload>,
}

impl FormFields {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut fields = FormFields::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::prompt(format!("Malformed form: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::prompt(format!("Could not read {}: {}", name, e)))?;
                    let mut payload = FilePayload::new(file_name, bytes.to_vec());
                    payload.content_type = content_type;
                    fields.files.insert(name, payload);
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::prompt(format!("Could not read {}: {}", name, e)))?;
                    fields.texts.insert(name, text);
                }
            }
        }
        Ok(fields)
    }

    pub fn insert_text(&mut self, name: &str, value: &str) {
        self.texts.insert(name.to_string(), value.to_string());
    }

    pub fn insert_file(&mut self, name: &str, payload: FilePayload) {
        self.files.insert(name.to_string(), payload);
    }

    pub fn optional(&self, name: &str) -> Option<&str> {
        self.texts
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, name: &str, prompt: &str) -> Result<&str, ApiError> {
        self.optional(name).ok_or_else(|| ApiError::prompt(prompt))
    }

    pub fn take_file(&mut self, name: &str, prompt: &str) -> Result<FilePayload, ApiError> {
        self.files
            .remove(name)
            .filter(|f| !f.bytes.is_empty())
            .ok_or_else(|| ApiError::prompt(prompt))
    }
}

pub fn registration_request(
    card_uid: &str,
    mut fields: FormFields,
) -> Result<RegistrationRequest, ApiError> {
    let student_id = parse_id(
        fields.required("student_id", "Please enter the student id")?,
        "Student id must be a whole number",
    )?;
    let name = fields.optional("name").map(str::to_string);
    if let Some(label) = &name {
        validate_label(label)?;
    }
    let image = fields.take_file("image", "Please select a profile picture")?;

    Ok(RegistrationRequest {
        card_uid: card_uid.to_string(),
        student_id,
        image,
        name,
    })
}

pub fn certification_request(mut fields: FormFields) -> Result<CertificationRequest, ApiError> {
    let name = fields
        .required("name", "Please enter a certification name")?
        .to_string();
    let eligible = fields
        .required("eligible", "Please enter at least one eligible address")?
        .to_string();
    let image = fields.take_file("image", "Please select a certificate image")?;
    Ok(CertificationRequest {
        name,
        eligible,
        image,
    })
}

/// Unsigned integer id, with `prompt` as the error.
pub fn parse_id(value: &str, prompt: &str) -> Result<u64, ApiError> {
    value.trim().parse::<u64>().map_err(|_| ApiError::prompt(prompt))
}

/// Name labels: lowercase letters, digits and hyphens.
pub fn validate_label(label: &str) -> Result<(), ApiError> {
    let valid = !label.starts_with('-')
        && !label.ends_with('-')
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ApiError::prompt(
            "Names may only contain lowercase letters, digits and hyphens",
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct ClaimForm {
    #[serde(default, deserialize_with = "text")]
    pub certification_id: String,
}

impl ClaimForm {
    pub fn certification_id(&self) -> Result<u64, ApiError> {
        if self.certification_id.trim().is_empty() {
            return Err(ApiError::prompt("Please enter a certification id"));
        }
        parse_id(&self.certification_id, "Certification id must be a whole number")
    }
}

#[derive(Debug, Deserialize)]
pub struct AmountForm {
    #[serde(default, deserialize_with = "text")]
    pub amount: String,
}

impl AmountForm {
    pub fn amount(&self, token: Token) -> Result<Amount, ApiError> {
        Ok(parse_amount(&self.amount, token)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct SendForm {
    #[serde(default, deserialize_with = "text")]
    pub recipient: String,
    #[serde(default, deserialize_with = "text")]
    pub amount: String,
    #[serde(default)]
    pub token: Token,
}

impl SendForm {
    pub fn validate(&self) -> Result<(&str, Amount), ApiError> {
        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return Err(ApiError::prompt("Please enter a recipient"));
        }
        Ok((recipient, parse_amount(&self.amount, self.token)?))
    }
}

/// Accept JSON strings and numbers alike, keeping the literal digits.
fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!("expected a string, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    fn prompt_of(err: ApiError) -> String {
        match err {
            ApiError::Prompt(p) => p,
            other => panic!("expected prompt, got {:?}", other),
        }
    }

    #[test]
    fn test_registration_requires_fields() {
        let err = registration_request("A1", FormFields::default()).unwrap_err();
        assert_eq!(prompt_of(err), "Please enter the student id");

        let mut fields = FormFields::default();
        fields.insert_text("student_id", "12a");
        assert_eq!(
            prompt_of(registration_request("A1", fields).unwrap_err()),
            "Student id must be a whole number"
        );

        let mut fields = FormFields::default();
        fields.insert_text("student_id", "12345");
        assert_eq!(
            prompt_of(registration_request("A1", fields).unwrap_err()),
            "Please select a profile picture"
        );
    }

    #[test]
    fn test_registration_request() {
        let mut fields = FormFields::default();
        fields.insert_text("student_id", " 12345 ");
        fields.insert_text("name", "alice");
        fields.insert_file("image", FilePayload::new("me.png", vec![1, 2, 3]));

        let request = registration_request("A1", fields).unwrap();
        assert_eq!(request.student_id, 12345);
        assert_eq!(request.name.as_deref(), Some("alice"));
        assert_eq!(request.image.file_name, "me.png");
    }

    #[test]
    fn test_empty_image_is_missing() {
        let mut fields = FormFields::default();
        fields.insert_file("image", FilePayload::new("empty.png", vec![]));
        assert!(fields.take_file("image", "Please select an image").is_err());
    }

    #[test]
    fn test_label_rules() {
        assert!(validate_label("tp012345").is_ok());
        assert!(validate_label("jane-doe").is_ok());
        assert!(validate_label("Jane").is_err());
        assert!(validate_label("-x").is_err());
        assert!(validate_label("a.b").is_err());
    }

    #[test]
    fn test_json_forms_accept_numbers() {
        let claim: ClaimForm = serde_json::from_str(r#"{"certification_id": 3}"#).unwrap();
        assert_eq!(claim.certification_id().unwrap(), 3);

        let amount: AmountForm = serde_json::from_str(r#"{"amount": "12.5"}"#).unwrap();
        assert_eq!(amount.amount(Token::Usdc).unwrap().value, U256::from(12_500_000u64));

        let missing: ClaimForm = serde_json::from_str("{}").unwrap();
        assert_eq!(
            prompt_of(missing.certification_id().unwrap_err()),
            "Please enter a certification id"
        );
    }

    #[test]
    fn test_send_form() {
        let form: SendForm = serde_json::from_str(
            r#"{"recipient": "bob.luca.eth", "amount": "1.5", "token": "eth"}"#,
        )
        .unwrap();
        let (recipient, amount) = form.validate().unwrap();
        assert_eq!(recipient, "bob.luca.eth");
        assert_eq!(amount.token, Token::Eth);

        let form: SendForm = serde_json::from_str(r#"{"amount": "1"}"#).unwrap();
        assert_eq!(prompt_of(form.validate().unwrap_err()), "Please enter a recipient");
    }
}
