//! Response construction.
//!
//! [`ResponseBuilder`] turns a parsed request and an authenticated profile
//! into an unsigned [`SamlResponse`]. Time and identifiers are injected so
//! every output field is reproducible in tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use idp_core::{IdpConfig, UserProfile};

use crate::types::{
    authn_context_classes, status_codes, Assertion, Attribute, AttributeStatement, AuthnRequest,
    AuthnStatement, Conditions, NameId, NameIdFormat, SamlResponse, Subject, SubjectConfirmation,
    SubjectConfirmationData,
};
use crate::{SamlError, SamlResult};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Source of message identifiers.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh XML NCName identifier.
    fn new_id(&self) -> String;
}

/// Identifiers from the CSPRNG: `_` plus 40 hex digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn new_id(&self) -> String {
        idp_crypto::new_ncname_id()
    }
}

/// Builds unsigned responses from configuration.
pub struct ResponseBuilder<'a> {
    config: &'a IdpConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<'a> ResponseBuilder<'a> {
    /// Creates a builder using the system clock and random identifiers.
    #[must_use]
    pub fn new(config: &'a IdpConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIdGenerator),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the identifier source.
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Builds the response answering `request` for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Validation`] when the request has no `Issuer`,
    /// when no ACS URL can be determined, when the request's ACS URL differs
    /// from the configured one, when an email NameID is requested for a user
    /// without one, or when a configured window is not positive or
    /// overflows the clock.
    pub fn build(&self, request: &AuthnRequest, user: &UserProfile) -> SamlResult<SamlResponse> {
        let audience = request
            .issuer
            .clone()
            .filter(|issuer| !issuer.is_empty())
            .ok_or_else(|| SamlError::Validation("AuthnRequest has no Issuer".to_string()))?;
        let destination = self.resolve_destination(request)?;

        let now = self.clock.now();
        let not_on_or_after = offset(now, self.config.clock_skew(), "clock skew")?;
        let session_not_on_or_after =
            offset(now, self.config.session_lifetime(), "session lifetime")?;

        let name_id = subject_name_id(request, user)?;

        let mut attributes: Vec<Attribute> = user
            .attributes
            .iter()
            .map(|(name, value)| Attribute::single(name, value))
            .collect();
        attributes.sort_by(|a, b| a.name.cmp(&b.name));

        let assertion = Assertion {
            id: self.ids.new_id(),
            issue_instant: now,
            issuer: self.config.entity_id.clone(),
            subject: Subject {
                name_id,
                confirmation: SubjectConfirmation::bearer(SubjectConfirmationData {
                    in_response_to: request.id.clone(),
                    not_on_or_after,
                    recipient: destination.clone(),
                }),
            },
            conditions: Conditions {
                not_before: now,
                not_on_or_after,
                audience,
            },
            authn_statement: AuthnStatement {
                authn_instant: now,
                session_not_on_or_after,
                session_index: self.ids.new_id(),
                context_class: authn_context_classes::PASSWORD_PROTECTED_TRANSPORT.to_string(),
            },
            attribute_statement: AttributeStatement { attributes },
        };

        let response = SamlResponse {
            id: self.ids.new_id(),
            issue_instant: now,
            issuer: self.config.entity_id.clone(),
            in_response_to: request.id.clone(),
            destination,
            status: status_codes::SUCCESS.to_string(),
            assertion,
        };

        tracing::debug!(
            response_id = %response.id,
            assertion_id = %response.assertion.id,
            in_response_to = %response.in_response_to,
            "built response"
        );
        Ok(response)
    }

    fn resolve_destination(&self, request: &AuthnRequest) -> SamlResult<String> {
        let requested = request
            .assertion_consumer_service_url
            .as_deref()
            .filter(|url| !url.is_empty());

        match (requested, self.config.expected_acs_url.as_deref()) {
            (Some(requested), Some(expected)) if requested != expected => {
                tracing::warn!(requested, expected, "ACS URL mismatch");
                Err(SamlError::Validation(format!(
                    "ACS URL {requested} does not match the configured ACS URL"
                )))
            }
            (Some(requested), Some(_)) => Ok(requested.to_string()),
            (Some(requested), None) => {
                tracing::debug!(requested, "no expected ACS URL configured, accepting request ACS URL");
                Ok(requested.to_string())
            }
            (None, Some(expected)) => Ok(expected.to_string()),
            (None, None) => Err(SamlError::Validation(
                "AuthnRequest has no ACS URL and none is configured".to_string(),
            )),
        }
    }
}

fn subject_name_id(request: &AuthnRequest, user: &UserProfile) -> SamlResult<NameId> {
    let format = if user.email.is_some() {
        NameIdFormat::Email
    } else {
        NameIdFormat::Unspecified
    };
    let wants_email = request.requested_name_id_format() == Some(NameIdFormat::Email);
    if wants_email && format != NameIdFormat::Email {
        return Err(SamlError::Validation(format!(
            "email NameID requested but {} has no email address",
            user.username
        )));
    }
    Ok(NameId {
        value: user.name_id().to_string(),
        format,
    })
}

fn offset(now: DateTime<Utc>, window: Duration, what: &str) -> SamlResult<DateTime<Utc>> {
    if window < Duration::seconds(1) {
        return Err(SamlError::Validation(format!(
            "{what} must be at least one second"
        )));
    }
    now.checked_add_signed(window)
        .ok_or_else(|| SamlError::Validation(format!("{what} overflows the clock")))
}
