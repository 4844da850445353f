// src/remote/classify.rs

//! Mapping of remote application errors onto a closed kind taxonomy.
//!
//! The API reports failures as a status code plus a reason and message
//! string. Scripts branch on the *refined* kind (a generic `notFound` whose
//! message mentions `userKey` is a missing user, not a missing endpoint),
//! so the substring refinement table is part of the compatibility contract.
//! The table is coupled to the API's exact wording; it lives here, behind
//! [`refine`], and nothing outside this module inspects message text.

use std::fmt;

/// Closed taxonomy of remote error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RateLimitExceeded,
    UserRateLimitExceeded,
    QuotaExceeded,
    BackendError,
    InternalError,
    ServiceNotAvailable,
    NotFound,
    UserNotFound,
    GroupNotFound,
    MemberNotFound,
    ResourceNotFound,
    DomainNotFound,
    OrgUnitNotFound,
    Duplicate,
    Invalid,
    InvalidArgument,
    InvalidMember,
    BadRequest,
    Forbidden,
    PermissionDenied,
    AuthError,
    ConditionNotMet,
    FieldRequired,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateLimitExceeded => "rateLimitExceeded",
            Self::UserRateLimitExceeded => "userRateLimitExceeded",
            Self::QuotaExceeded => "quotaExceeded",
            Self::BackendError => "backendError",
            Self::InternalError => "internalError",
            Self::ServiceNotAvailable => "serviceNotAvailable",
            Self::NotFound => "notFound",
            Self::UserNotFound => "userNotFound",
            Self::GroupNotFound => "groupNotFound",
            Self::MemberNotFound => "memberNotFound",
            Self::ResourceNotFound => "resourceNotFound",
            Self::DomainNotFound => "domainNotFound",
            Self::OrgUnitNotFound => "orgUnitNotFound",
            Self::Duplicate => "duplicate",
            Self::Invalid => "invalid",
            Self::InvalidArgument => "invalidArgument",
            Self::InvalidMember => "invalidMember",
            Self::BadRequest => "badRequest",
            Self::Forbidden => "forbidden",
            Self::PermissionDenied => "permissionDenied",
            Self::AuthError => "authError",
            Self::ConditionNotMet => "conditionNotMet",
            Self::FieldRequired => "required",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Kinds retried regardless of call-site opt-in: rate limiting and
/// transient backend conditions.
pub const DEFAULT_RETRY_KINDS: &[ErrorKind] = &[
    ErrorKind::RateLimitExceeded,
    ErrorKind::UserRateLimitExceeded,
    ErrorKind::QuotaExceeded,
    ErrorKind::BackendError,
    ErrorKind::InternalError,
    ErrorKind::ServiceNotAvailable,
];

/// The message-substring refinement table: `(base kind, substring, refined
/// kind)`. First match wins.
const REFINEMENTS: &[(ErrorKind, &str, ErrorKind)] = &[
    (ErrorKind::NotFound, "userKey", ErrorKind::UserNotFound),
    (ErrorKind::NotFound, "groupKey", ErrorKind::GroupNotFound),
    (ErrorKind::NotFound, "memberKey", ErrorKind::MemberNotFound),
    (ErrorKind::NotFound, "Domain not found", ErrorKind::DomainNotFound),
    (ErrorKind::NotFound, "Org unit not found", ErrorKind::OrgUnitNotFound),
    (ErrorKind::NotFound, "Resource Not Found", ErrorKind::ResourceNotFound),
    (ErrorKind::Invalid, "memberKey", ErrorKind::InvalidMember),
    (ErrorKind::InvalidArgument, "Invalid Input: INVALID_OU_ID", ErrorKind::OrgUnitNotFound),
    (ErrorKind::BadRequest, "Invalid Input: INVALID_OU_ID", ErrorKind::OrgUnitNotFound),
    (ErrorKind::FieldRequired, "memberKey", ErrorKind::MemberNotFound),
    (ErrorKind::Forbidden, "Not Authorized to access this resource", ErrorKind::PermissionDenied),
];

/// Resolves a failure into its final kind: base kind from the reason
/// string (status code as fallback), then one pass over the refinement
/// table.
pub fn classify(status: u16, reason: &str, message: &str) -> ErrorKind {
    refine(base_kind(status, reason), message)
}

fn base_kind(status: u16, reason: &str) -> ErrorKind {
    match reason.to_lowercase().as_str() {
        "ratelimitexceeded" => ErrorKind::RateLimitExceeded,
        "userratelimitexceeded" => ErrorKind::UserRateLimitExceeded,
        "quotaexceeded" | "dailylimitexceeded" => ErrorKind::QuotaExceeded,
        "backenderror" => ErrorKind::BackendError,
        "internalerror" => ErrorKind::InternalError,
        "servicenotavailable" => ErrorKind::ServiceNotAvailable,
        "notfound" => ErrorKind::NotFound,
        "duplicate" => ErrorKind::Duplicate,
        "invalid" => ErrorKind::Invalid,
        "invalidargument" => ErrorKind::InvalidArgument,
        "badrequest" => ErrorKind::BadRequest,
        "forbidden" => ErrorKind::Forbidden,
        "permissiondenied" => ErrorKind::PermissionDenied,
        "autherror" | "unauthorized" => ErrorKind::AuthError,
        "conditionnotmet" => ErrorKind::ConditionNotMet,
        "required" => ErrorKind::FieldRequired,
        _ => match status {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::AuthError,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Duplicate,
            412 => ErrorKind::ConditionNotMet,
            429 => ErrorKind::RateLimitExceeded,
            500 => ErrorKind::InternalError,
            503 => ErrorKind::ServiceNotAvailable,
            _ => ErrorKind::Unknown,
        },
    }
}

/// The single seam through which message text influences classification.
fn refine(kind: ErrorKind, message: &str) -> ErrorKind {
    for (base, needle, refined) in REFINEMENTS {
        if *base == kind && message.contains(needle) {
            return *refined;
        }
    }
    kind
}

/// True for kinds that are retried by default.
pub fn is_transient(kind: ErrorKind) -> bool {
    DEFAULT_RETRY_KINDS.contains(&kind)
}

// MARK: --- UNIT TESTS ---
