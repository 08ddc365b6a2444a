//! Error taxonomy for backend calls and controller operations.
//!
//! Every controller returns `Result<T, ClientError>`. Errors are handled at
//! the boundary that triggered them (a CLI command, a UI callback) and shown
//! with [`ClientError::user_message`]; nothing here is fatal to the process.
//!
//! - Network class (`Transport`, `Timeout`) - retryable in the OAuth callback
//!   flow only.
//! - `Validation` - caught before any request is sent.
//! - `Rejected` / `Unauthorized` - business-rule rejections; the backend's own
//!   message is kept verbatim.
//! - `Parse` - the backend answered with something that is not the expected
//!   JSON.

use thiserror::Error;

use avenue_core::EmailError;

use crate::config::Language;
use crate::store::StoreError;

/// Errors returned by the Avenue client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request could not be sent or the connection dropped.
    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Request exceeded its timeout.
    #[error("request timed out")]
    Timeout,

    /// Backend rejected the credentials or session token.
    #[error("unauthorized: {}", .message.as_deref().unwrap_or("no details"))]
    Unauthorized {
        /// Backend message, if any.
        message: Option<String>,
    },

    /// Backend rejected the request.
    #[error("rejected with HTTP {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Backend message, if any.
        message: Option<String>,
    },

    /// Response body was not the expected JSON.
    #[error("parse error: {0}")]
    Parse(String),

    /// Client-side validation failed; no request was sent.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Local persistent storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Operation is not valid in the current controller state.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Operation was cancelled before completing.
    #[error("operation cancelled")]
    Cancelled,

    /// A URL could not be built.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// A local file could not be read.
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}

impl From<EmailError> for ClientError {
    fn from(err: EmailError) -> Self {
        Self::Validation(ValidationError::InvalidEmail(err))
    }
}

impl ClientError {
    /// Whether the error is network class and may succeed on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }

    /// Backend-provided message, if the backend sent one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } | Self::Unauthorized { message } => message.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of a backend rejection.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    /// Message suitable for showing to the user.
    ///
    /// Backend messages are returned verbatim; everything else maps to a
    /// generic message in `language`.
    #[must_use]
    pub fn user_message(&self, language: Language) -> String {
        if let Some(message) = self.backend_message() {
            return message.to_string();
        }

        match self {
            Self::Validation(err) => err.message(language),
            Self::Transport(_) | Self::Timeout => match language {
                Language::Es => {
                    "No pudimos conectar con el servidor. Revisa tu conexión e inténtalo de nuevo."
                }
                Language::En => {
                    "We couldn't reach the server. Check your connection and try again."
                }
            }
            .to_string(),
            Self::Unauthorized { .. } => match language {
                Language::Es => "Tu sesión no es válida. Inicia sesión de nuevo.",
                Language::En => "Your session is not valid. Please sign in again.",
            }
            .to_string(),
            Self::Cancelled => match language {
                Language::Es => "La operación fue cancelada.",
                Language::En => "The operation was cancelled.",
            }
            .to_string(),
            Self::Rejected { .. }
            | Self::Parse(_)
            | Self::Storage(_)
            | Self::InvalidState(_)
            | Self::Url(_)
            | Self::File(_) => match language {
                Language::Es => "Error del servidor. Inténtalo de nuevo más tarde.",
                Language::En => "Server error. Please try again later.",
            }
            .to_string(),
        }
    }
}

/// Client-side validation failures.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required form field is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Email is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password is shorter than the minimum.
    #[error("password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum length.
        min: usize,
    },

    /// Terms and conditions were not accepted.
    #[error("terms and conditions must be accepted")]
    TermsNotAccepted,

    /// Delivery was chosen but no location was selected on the map.
    #[error("no delivery location selected")]
    NoDeliveryLocation,

    /// Nothing to check out.
    #[error("cart is empty")]
    EmptyCart,

    /// A coupon code was empty.
    #[error("coupon code is empty")]
    EmptyCouponCode,

    /// An MFA code is not six digits.
    #[error("verification code must be 6 digits")]
    InvalidTotpCode,

    /// A recovery code is malformed.
    #[error("invalid recovery code")]
    InvalidRecoveryCode,

    /// Booking date is today or in the past.
    #[error("date {0} cannot be booked online")]
    DateNotBookable(chrono::NaiveDate),

    /// Booking slot is not fully available or runs past closing.
    #[error("slot at {start}:00 for {hours}h is not available")]
    SlotUnavailable {
        /// Start hour.
        start: u8,
        /// Duration in hours.
        hours: u8,
    },

    /// Duration is not one of the offered packages.
    #[error("unsupported booking duration: {0}h")]
    UnsupportedDuration(u8),

    /// Callback URL has no session identifier.
    #[error("callback url has no session_id")]
    MissingSessionId,

    /// Media file is empty.
    #[error("file is empty")]
    EmptyFile,
}

impl ValidationError {
    /// Localized message for inline display.
    #[must_use]
    pub fn message(&self, language: Language) -> String {
        match (self, language) {
            (Self::MissingField(field), Language::Es) => {
                format!("El campo {field} es obligatorio.")
            }
            (Self::MissingField(field), Language::En) => format!("The {field} field is required."),
            (Self::InvalidEmail(_), Language::Es) => {
                "El correo electrónico no es válido.".to_string()
            }
            (Self::InvalidEmail(_), Language::En) => "The email address is not valid.".to_string(),
            (Self::PasswordTooShort { min }, Language::Es) => {
                format!("La contraseña debe tener al menos {min} caracteres.")
            }
            (Self::PasswordTooShort { min }, Language::En) => {
                format!("Password must be at least {min} characters.")
            }
            (Self::TermsNotAccepted, Language::Es) => {
                "Debes aceptar los términos y condiciones.".to_string()
            }
            (Self::TermsNotAccepted, Language::En) => {
                "You must accept the terms and conditions.".to_string()
            }
            (Self::NoDeliveryLocation, Language::Es) => {
                "Selecciona tu ubicación de entrega en el mapa.".to_string()
            }
            (Self::NoDeliveryLocation, Language::En) => {
                "Select your delivery location on the map.".to_string()
            }
            (Self::EmptyCart, Language::Es) => "Tu carrito está vacío.".to_string(),
            (Self::EmptyCart, Language::En) => "Your cart is empty.".to_string(),
            (Self::EmptyCouponCode, Language::Es) => "Ingresa un código de cupón.".to_string(),
            (Self::EmptyCouponCode, Language::En) => "Enter a coupon code.".to_string(),
            (Self::InvalidTotpCode, Language::Es) => "El código debe tener 6 dígitos.".to_string(),
            (Self::InvalidTotpCode, Language::En) => "The code must be 6 digits.".to_string(),
            (Self::InvalidRecoveryCode, Language::Es) => {
                "El código de recuperación no es válido.".to_string()
            }
            (Self::InvalidRecoveryCode, Language::En) => {
                "The recovery code is not valid.".to_string()
            }
            (Self::DateNotBookable(_), Language::Es) => {
                "Las reservas para hoy se gestionan por WhatsApp. Elige una fecha a partir de mañana."
                    .to_string()
            }
            (Self::DateNotBookable(_), Language::En) => {
                "Same-day bookings are handled over WhatsApp. Pick a date from tomorrow on."
                    .to_string()
            }
            (Self::SlotUnavailable { .. }, Language::Es) => {
                "Ese horario no está disponible para la duración elegida.".to_string()
            }
            (Self::SlotUnavailable { .. }, Language::En) => {
                "That time is not available for the chosen duration.".to_string()
            }
            (Self::UnsupportedDuration(_), Language::Es) => "Duración no disponible.".to_string(),
            (Self::UnsupportedDuration(_), Language::En) => "Duration not available.".to_string(),
            (Self::MissingSessionId, Language::Es) => {
                "No se encontró la sesión de inicio con Google.".to_string()
            }
            (Self::MissingSessionId, Language::En) => {
                "Google sign-in session not found.".to_string()
            }
            (Self::EmptyFile, Language::Es) => "El archivo está vacío.".to_string(),
            (Self::EmptyFile, Language::En) => "The file is empty.".to_string(),
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_is_verbatim() {
        let err = ClientError::Rejected {
            status: 400,
            message: Some("Cupón expirado".to_string()),
        };
        assert_eq!(err.user_message(Language::En), "Cupón expirado");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_generic_fallback_without_backend_message() {
        let err = ClientError::Rejected {
            status: 500,
            message: None,
        };
        assert_eq!(
            err.user_message(Language::Es),
            "Error del servidor. Inténtalo de nuevo más tarde."
        );
        assert_eq!(
            ClientError::Parse("expected value".to_string()).user_message(Language::En),
            "Server error. Please try again later."
        );
    }

    #[test]
    fn test_only_network_errors_are_retryable() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(!ClientError::Parse("x".to_string()).is_retryable());
        assert!(!ClientError::Cancelled.is_retryable());
        assert!(
            !ClientError::Rejected {
                status: 503,
                message: None
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_validation_message_localized() {
        let err = ClientError::from(ValidationError::TermsNotAccepted);
        assert_eq!(
            err.user_message(Language::Es),
            "Debes aceptar los términos y condiciones."
        );
        assert_eq!(
            err.user_message(Language::En),
            "You must accept the terms and conditions."
        );
    }

    #[test]
    fn test_display() {
        let err = ClientError::Unauthorized { message: None };
        assert_eq!(err.to_string(), "unauthorized: no details");

        let err = ClientError::from(ValidationError::MissingField("phone"));
        assert_eq!(
            err.to_string(),
            "validation error: missing required field: phone"
        );
    }
}
