//! Form controller.
//!
//! [`GuestForm`] holds raw field values and validates them into a
//! [`GuestEntry`]. [`FormController`] owns the text fields and both capture
//! widgets, runs validation before every submission, and tracks submission
//! status.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::camera::{CameraDevice, SelfieCapture};
use crate::entry::{is_known_purpose, GuestEntry, GuestbookRecord, OTHER_PURPOSE};
use crate::error::{Error, Result};
use crate::signature::{SignatureOptions, SignaturePad};
use crate::still::StillImage;
use crate::transport::GuestbookTransport;

/// Shown once an entry has been accepted.
pub const CONFIRMATION_MESSAGE: &str = "Thank you! Your guest book entry has been submitted.";

const NAME_MIN_CHARS: usize = 2;
const ORIGIN_MIN_CHARS: usize = 2;
const REASON_MIN_CHARS: usize = 5;

/// A form field that can carry a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Visitor name.
    Name,
    /// Company or organization.
    Origin,
    /// Purpose drop-down.
    Purpose,
    /// Free-text purpose used with "Other".
    PurposeOther,
    /// Reason for the visit.
    Reason,
    /// Selfie still.
    SelfieImage,
    /// Signature still.
    SignatureImage,
}

impl Field {
    /// Wire/field name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Origin => "origin",
            Self::Purpose => "purpose",
            Self::PurposeOther => "purpose_other",
            Self::Reason => "reason",
            Self::SelfieImage => "selfie_image",
            Self::SignatureImage => "signature_image",
        }
    }

    /// Message displayed when this field is invalid.
    #[must_use]
    pub fn error_message(&self) -> &'static str {
        match self {
            Self::Name => "Name is required",
            Self::Origin => "Company / organization is required",
            Self::Purpose => "Purpose is required",
            Self::PurposeOther => "Please specify your target contact",
            Self::Reason => "Reason must be at least 5 characters",
            Self::SelfieImage => "Selfie photo is required",
            Self::SignatureImage => "Signature is required",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-scoped validation failures, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<Field, &'static str>,
}

impl ValidationErrors {
    /// Record `message` against `field`, replacing any earlier message.
    pub fn insert(&mut self, field: Field, message: &'static str) {
        self.errors.insert(field, message);
    }

    /// Message for `field`, if it failed.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    /// Whether `field` failed.
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.errors.contains_key(&field)
    }

    /// Drop the error for `field`.
    pub fn remove(&mut self, field: Field) {
        self.errors.remove(&field);
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether every field passed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Failing fields and their messages, in field order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.errors.iter().map(|(field, message)| (*field, *message))
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

impl std::error::Error for ValidationErrors {}

/// Raw form values, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestForm {
    /// Visitor name.
    pub name: String,
    /// Company or organization.
    pub origin: String,
    /// Selected purpose option.
    pub purpose: String,
    /// Free-text purpose, used only with "Other".
    pub purpose_other: String,
    /// Reason for the visit.
    pub reason: String,
    /// Captured selfie.
    pub selfie_image: Option<StillImage>,
    /// Drawn signature.
    pub signature_image: Option<StillImage>,
}

fn has_min_chars(value: &str, min: usize) -> bool {
    value.trim().chars().count() >= min
}

fn has_image(image: Option<&StillImage>) -> bool {
    image.is_some_and(|image| !image.is_empty())
}

impl GuestForm {
    /// Check every rule and build the outbound entry.
    ///
    /// All rules are evaluated, so the error lists every failing field.
    ///
    /// # Errors
    ///
    /// Returns the field-scoped failures if any rule fails.
    pub fn validate(&self) -> std::result::Result<GuestEntry, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if !has_min_chars(&self.name, NAME_MIN_CHARS) {
            errors.insert(Field::Name, Field::Name.error_message());
        }
        if !has_min_chars(&self.origin, ORIGIN_MIN_CHARS) {
            errors.insert(Field::Origin, Field::Origin.error_message());
        }

        let purpose = self.purpose.trim();
        if !is_known_purpose(purpose) {
            errors.insert(Field::Purpose, Field::Purpose.error_message());
        }
        let is_other = purpose == OTHER_PURPOSE;
        if is_other && self.purpose_other.trim().is_empty() {
            errors.insert(Field::PurposeOther, Field::PurposeOther.error_message());
        }

        if !has_min_chars(&self.reason, REASON_MIN_CHARS) {
            errors.insert(Field::Reason, Field::Reason.error_message());
        }
        if !has_image(self.selfie_image.as_ref()) {
            errors.insert(Field::SelfieImage, Field::SelfieImage.error_message());
        }
        if !has_image(self.signature_image.as_ref()) {
            errors.insert(Field::SignatureImage, Field::SignatureImage.error_message());
        }

        match (&self.selfie_image, &self.signature_image) {
            (Some(selfie), Some(signature)) if errors.is_empty() => Ok(GuestEntry {
                name: self.name.trim().to_string(),
                origin: self.origin.trim().to_string(),
                purpose: if is_other {
                    self.purpose_other.trim().to_string()
                } else {
                    purpose.to_string()
                },
                reason: self.reason.trim().to_string(),
                selfie_image: selfie.clone(),
                signature_image: signature.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Where the form is in its submit cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    /// Accepting input.
    Editing,
    /// A request is in flight; submit is disabled.
    Submitting,
    /// The entry was accepted; the confirmation is showing.
    Succeeded(GuestbookRecord),
    /// The last submission failed with this top-level message.
    Failed(String),
}

/// Owns the form state and both capture widgets, and drives submission.
///
/// The host forwards camera and pointer events through
/// [`FormController::selfie_mut`] and [`FormController::signature_mut`];
/// the image fields always reflect the widgets' current values.
pub struct FormController {
    transport: Arc<dyn GuestbookTransport>,
    selfie: SelfieCapture,
    signature: SignaturePad,
    fields: GuestForm,
    errors: ValidationErrors,
    status: FormStatus,
}

impl fmt::Debug for FormController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormController")
            .field("fields", &self.fields)
            .field("selfie", &self.selfie)
            .field("signature", &self.signature)
            .field("errors", &self.errors)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl FormController {
    /// Create an empty form bound to `transport`, with a selfie widget on
    /// `camera` and a signature pad built from `signature`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn GuestbookTransport>,
        camera: Arc<dyn CameraDevice>,
        signature: SignatureOptions,
    ) -> Self {
        Self {
            transport,
            selfie: SelfieCapture::new(camera),
            signature: SignaturePad::new(signature),
            fields: GuestForm::default(),
            errors: ValidationErrors::default(),
            status: FormStatus::Editing,
        }
    }

    /// Snapshot of the current field values, images included.
    #[must_use]
    pub fn form(&self) -> GuestForm {
        GuestForm {
            selfie_image: self.selfie.value(),
            signature_image: self.signature.value(),
            ..self.fields.clone()
        }
    }

    /// The selfie widget.
    #[must_use]
    pub fn selfie(&self) -> &SelfieCapture {
        &self.selfie
    }

    /// The selfie widget, for camera actions.
    pub fn selfie_mut(&mut self) -> &mut SelfieCapture {
        &mut self.selfie
    }

    /// The signature pad.
    #[must_use]
    pub fn signature(&self) -> &SignaturePad {
        &self.signature
    }

    /// The signature pad, for pointer events.
    pub fn signature_mut(&mut self) -> &mut SignaturePad {
        &mut self.signature
    }

    /// Set the visitor name.
    pub fn set_name(&mut self, value: impl Into<String>) {
        self.fields.name = value.into();
        self.errors.remove(Field::Name);
    }

    /// Set the company or organization.
    pub fn set_origin(&mut self, value: impl Into<String>) {
        self.fields.origin = value.into();
        self.errors.remove(Field::Origin);
    }

    /// Set the selected purpose.
    pub fn set_purpose(&mut self, value: impl Into<String>) {
        self.fields.purpose = value.into();
        self.errors.remove(Field::Purpose);
        self.errors.remove(Field::PurposeOther);
    }

    /// Set the free-text purpose.
    pub fn set_purpose_other(&mut self, value: impl Into<String>) {
        self.fields.purpose_other = value.into();
        self.errors.remove(Field::PurposeOther);
    }

    /// Set the reason for the visit.
    pub fn set_reason(&mut self, value: impl Into<String>) {
        self.fields.reason = value.into();
        self.errors.remove(Field::Reason);
    }

    /// Whether the purpose-other input should be shown.
    #[must_use]
    pub fn needs_purpose_other(&self) -> bool {
        self.fields.purpose.trim() == OTHER_PURPOSE
    }

    /// Validation errors from the last submit attempt.
    #[must_use]
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Error displayed beside `field`.
    ///
    /// An image error is hidden as soon as its widget holds a value again.
    #[must_use]
    pub fn field_error(&self, field: Field) -> Option<&'static str> {
        let filled = match field {
            Field::SelfieImage => self.selfie.value().is_some(),
            Field::SignatureImage => self.signature.value().is_some(),
            _ => false,
        };
        if filled {
            None
        } else {
            self.errors.get(field)
        }
    }

    /// Submission status.
    #[must_use]
    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    /// Whether the submit control is enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !matches!(self.status, FormStatus::Submitting)
    }

    /// The top-level error from the last failed submission.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            FormStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// The accepted record while the confirmation is showing.
    #[must_use]
    pub fn confirmation(&self) -> Option<&GuestbookRecord> {
        match &self.status {
            FormStatus::Succeeded(record) => Some(record),
            _ => None,
        }
    }

    /// Close the confirmation and start a new entry.
    pub fn dismiss_confirmation(&mut self) {
        if matches!(self.status, FormStatus::Succeeded(_)) {
            self.status = FormStatus::Editing;
        }
    }

    /// Clear every field, error and status, returning to an empty form.
    /// The camera is released and the signature surface wiped.
    pub fn reset(&mut self) {
        self.clear_entry();
        self.errors = ValidationErrors::default();
        self.status = FormStatus::Editing;
    }

    fn clear_entry(&mut self) {
        self.fields = GuestForm::default();
        self.selfie.reset();
        self.signature.clear();
    }

    /// Validate and submit the form.
    ///
    /// Validation failures are stored per field and nothing is sent. On
    /// success the fields and both widgets are reset and the confirmation
    /// is shown. On transport failure the fields and images are kept and a
    /// top-level message is stored. Dropping the returned future before it
    /// completes discards the response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SubmissionInFlight`], [`Error::Validation`] or
    /// [`Error::Transport`].
    pub async fn submit(&mut self) -> Result<GuestbookRecord> {
        if !self.can_submit() {
            return Err(Error::SubmissionInFlight);
        }

        let entry = match self.form().validate() {
            Ok(entry) => entry,
            Err(errors) => {
                debug!(fields = %errors, "Guest book form failed validation");
                self.errors = errors.clone();
                return Err(errors.into());
            }
        };
        self.errors = ValidationErrors::default();
        self.status = FormStatus::Submitting;

        match self.transport.submit(&entry).await {
            Ok(record) => {
                info!(purpose = %entry.purpose, "Guest book form submitted");
                self.clear_entry();
                self.status = FormStatus::Succeeded(record.clone());
                Ok(record)
            }
            Err(e) => {
                warn!(error = %e, "Guest book form submission failed");
                self.status = FormStatus::Failed(e.user_message());
                Err(e.into())
            }
        }
    }
}
