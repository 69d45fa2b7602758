//! Profile representations
//!
//! The backend sends repeated-field groups as positional arrays
//! ([`ProfileRecord`]). Editing works on a flat record with fixed-name slots
//! ([`EditProfile`]): `interest_1..interest_5` and `question1..question12`.
//! Slot *i* maps to array position *i − 1*. [`flatten`] and [`unflatten`] are
//! pure and mutual inverses up to the defaults (empty string for a missing
//! interest, [`DEFAULT_ANSWER`] for a missing answer).

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FieldError;

/// Number of interest slots in the edit shape
pub const INTEREST_SLOTS: usize = 5;

/// Number of survey questions
pub const QUESTION_COUNT: usize = 12;

/// Value of an unanswered survey question
pub const DEFAULT_ANSWER: i32 = 3;

/// Wire names of the survey questions, in order
pub const QUESTION_KEYS: [&str; QUESTION_COUNT] = [
    "question1",
    "question2",
    "question3",
    "question4",
    "question5",
    "question6",
    "question7",
    "question8",
    "question9",
    "question10",
    "question11",
    "question12",
];

/// Field names of the interest slots, in order
pub const INTEREST_KEYS: [&str; INTEREST_SLOTS] = [
    "interest_1",
    "interest_2",
    "interest_3",
    "interest_4",
    "interest_5",
];

// ============================================================================
// Wire shape
// ============================================================================

/// Profile as exchanged with `GET /v1/user/info/{identity}`
///
/// Missing or `null` groups decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residential_college: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graduating_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_genders: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapchat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_s3_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notif_pref: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub interests: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answers: Vec<i32>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Edit shape
// ============================================================================

/// Flat, form-editable profile
///
/// Serializes as a flat object with `interest_N` and `questionN` keys.
#[derive(Debug, Clone, PartialEq)]
pub struct EditProfile {
    pub email: String,
    pub is_active: bool,
    pub name: String,
    pub residential_college: Option<String>,
    pub graduating_year: Option<i32>,
    pub gender: Option<i32>,
    pub partner_genders: Option<i32>,
    pub instagram: Option<String>,
    pub snapchat: Option<String>,
    pub phone_number: Option<String>,
    pub picture_s3_url: Option<String>,
    pub notif_pref: bool,
    interests: [String; INTEREST_SLOTS],
    answers: [i32; QUESTION_COUNT],
}

impl Default for EditProfile {
    fn default() -> Self {
        flatten(&ProfileRecord::default())
    }
}

impl EditProfile {
    /// Interest in 1-based `slot`; `None` for slots outside 1..=5
    pub fn interest(&self, slot: usize) -> Option<&str> {
        slot.checked_sub(1)
            .and_then(|i| self.interests.get(i))
            .map(String::as_str)
    }

    /// Answer to 1-based `question`; `None` outside 1..=12
    pub fn answer(&self, question: usize) -> Option<i32> {
        question
            .checked_sub(1)
            .and_then(|i| self.answers.get(i))
            .copied()
    }

    pub fn interests(&self) -> &[String; INTEREST_SLOTS] {
        &self.interests
    }

    pub fn answers(&self) -> &[i32; QUESTION_COUNT] {
        &self.answers
    }

    /// Assign a field by its form name, coercing `value` to the field's type
    ///
    /// Empty input clears optional scalars. Booleans accept
    /// `true/false/on/off/yes/no/1/0`. Interest slots take any string,
    /// question slots any integer.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        let trimmed = value.trim();

        if let Some(i) = INTEREST_KEYS.iter().position(|k| *k == field) {
            self.interests[i] = trimmed.to_string();
            return Ok(());
        }
        if let Some(i) = QUESTION_KEYS.iter().position(|k| *k == field) {
            self.answers[i] = if trimmed.is_empty() {
                DEFAULT_ANSWER
            } else {
                parse_int(field, trimmed)?
            };
            return Ok(());
        }

        match field {
            "email" | "is_active" => return Err(FieldError::ReadOnly(field.to_string())),
            "name" => self.name = trimmed.to_string(),
            "residential_college" => self.residential_college = optional_text(trimmed),
            "instagram" => self.instagram = optional_text(trimmed),
            "snapchat" => self.snapchat = optional_text(trimmed),
            "phone_number" => self.phone_number = optional_text(trimmed),
            "picture_s3_url" => self.picture_s3_url = optional_text(trimmed),
            "graduating_year" => self.graduating_year = optional_int(field, trimmed)?,
            "gender" => self.gender = optional_int(field, trimmed)?,
            "partner_genders" => self.partner_genders = optional_int(field, trimmed)?,
            "notif_pref" => self.notif_pref = parse_bool(field, trimmed)?,
            _ => return Err(FieldError::UnknownField(field.to_string())),
        }
        Ok(())
    }
}

fn optional_text(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_int(field: &str, value: &str) -> Result<i32, FieldError> {
    value.parse().map_err(|_| FieldError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: "an integer",
    })
}

fn optional_int(field: &str, value: &str) -> Result<Option<i32>, FieldError> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_int(field, value).map(Some)
}

fn parse_bool(field: &str, value: &str) -> Result<bool, FieldError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" | "" => Ok(false),
        _ => Err(FieldError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            expected: "a boolean",
        }),
    }
}

impl Serialize for EditProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(12 + INTEREST_SLOTS + QUESTION_COUNT))?;
        map.serialize_entry("email", &self.email)?;
        map.serialize_entry("is_active", &self.is_active)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("residential_college", &self.residential_college)?;
        map.serialize_entry("graduating_year", &self.graduating_year)?;
        map.serialize_entry("gender", &self.gender)?;
        map.serialize_entry("partner_genders", &self.partner_genders)?;
        map.serialize_entry("instagram", &self.instagram)?;
        map.serialize_entry("snapchat", &self.snapchat)?;
        map.serialize_entry("phone_number", &self.phone_number)?;
        map.serialize_entry("picture_s3_url", &self.picture_s3_url)?;
        map.serialize_entry("notif_pref", &self.notif_pref)?;
        for (key, value) in INTEREST_KEYS.iter().zip(&self.interests) {
            map.serialize_entry(key, value)?;
        }
        for (key, value) in QUESTION_KEYS.iter().zip(&self.answers) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// ============================================================================
// Flatten / unflatten
// ============================================================================

/// Wire shape → edit shape
///
/// Array position *i* fills slot *i + 1*. Slots past the end of an array take
/// the default; array items past the last slot are dropped.
pub fn flatten(record: &ProfileRecord) -> EditProfile {
    let interests = std::array::from_fn(|i| record.interests.get(i).cloned().unwrap_or_default());
    let answers = std::array::from_fn(|i| record.answers.get(i).copied().unwrap_or(DEFAULT_ANSWER));

    EditProfile {
        email: record.email.clone(),
        is_active: record.is_active,
        name: record.name.clone(),
        residential_college: record.residential_college.clone(),
        graduating_year: record.graduating_year,
        gender: record.gender,
        partner_genders: record.partner_genders,
        instagram: record.instagram.clone(),
        snapchat: record.snapchat.clone(),
        phone_number: record.phone_number.clone(),
        picture_s3_url: record.picture_s3_url.clone(),
        notif_pref: record.notif_pref,
        interests,
        answers,
    }
}

/// Edit shape → wire shape
///
/// Empty interest slots are omitted (order kept); all twelve answers are
/// emitted.
pub fn unflatten(edit: &EditProfile) -> ProfileRecord {
    ProfileRecord {
        email: edit.email.clone(),
        is_active: edit.is_active,
        name: edit.name.clone(),
        residential_college: edit.residential_college.clone(),
        graduating_year: edit.graduating_year,
        gender: edit.gender,
        partner_genders: edit.partner_genders,
        instagram: edit.instagram.clone(),
        snapchat: edit.snapchat.clone(),
        phone_number: edit.phone_number.clone(),
        picture_s3_url: edit.picture_s3_url.clone(),
        notif_pref: edit.notif_pref,
        interests: collect_interests(edit),
        answers: edit.answers.to_vec(),
    }
}

fn collect_interests(edit: &EditProfile) -> Vec<String> {
    edit.interests
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect()
}

// ============================================================================
// Update payloads
// ============================================================================

/// Body of `PUT /v1/user/info/{identity}`
///
/// Carries no survey answers. Identity and activation state are owned by the
/// backend and are not sent. Cleared optional fields are sent as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicInfoPayload {
    pub name: String,
    pub residential_college: Option<String>,
    pub graduating_year: Option<i32>,
    pub gender: Option<i32>,
    pub partner_genders: Option<i32>,
    pub instagram: Option<String>,
    pub snapchat: Option<String>,
    pub phone_number: Option<String>,
    pub picture_s3_url: Option<String>,
    pub notif_pref: bool,
    pub interests: Vec<String>,
}

/// Project the basic-info payload out of the edit record
pub fn basic_info_payload(edit: &EditProfile) -> BasicInfoPayload {
    BasicInfoPayload {
        name: edit.name.clone(),
        residential_college: edit.residential_college.clone(),
        graduating_year: edit.graduating_year,
        gender: edit.gender,
        partner_genders: edit.partner_genders,
        instagram: edit.instagram.clone(),
        snapchat: edit.snapchat.clone(),
        phone_number: edit.phone_number.clone(),
        picture_s3_url: edit.picture_s3_url.clone(),
        notif_pref: edit.notif_pref,
        interests: collect_interests(edit),
    }
}

/// Body of `PUT /v1/user/answers/{identity}`: exactly `question1..question12`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswersPayload {
    values: [i32; QUESTION_COUNT],
}

impl AnswersPayload {
    pub fn values(&self) -> &[i32; QUESTION_COUNT] {
        &self.values
    }
}

impl Serialize for AnswersPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AnswersPayload", QUESTION_COUNT)?;
        for (key, value) in QUESTION_KEYS.iter().zip(&self.values) {
            state.serialize_field(*key, value)?;
        }
        state.end()
    }
}

/// Project the answers payload out of the edit record
pub fn answers_payload(edit: &EditProfile) -> AnswersPayload {
    AnswersPayload {
        values: edit.answers,
    }
}
