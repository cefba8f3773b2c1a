//! Error types for the control plane.
//!
//! One hierarchical error type, mirroring the error kinds used throughout
//! the system: every variant carries an optional detail message and maps to
//! a fixed HTTP status code.

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

fn opt_suffix(msg: &Option<String>) -> String {
    match msg {
        Some(m) => format!(": {m}"),
        None => String::new(),
    }
}

/// Application error types.
///
/// `status_code()` gives the HTTP status the error maps to; `title()` gives
/// the stable, caller-facing error kind name used in the
/// `{error: "<title>[, <message>]"}` response envelope.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error{}", opt_suffix(.0))]
    Unexpected(Option<String>),

    #[error("Authentication error{}", opt_suffix(.0))]
    Authentication(Option<String>),

    #[error("No implementation found{}", opt_suffix(.0))]
    NoImplementationFound(Option<String>),

    #[error("Project not found{}", opt_suffix(.0))]
    ProjectNotFound(Option<String>),

    #[error("Project access denied{}", opt_suffix(.0))]
    ProjectAccessDenied(Option<String>),

    #[error("Org access denied{}", opt_suffix(.0))]
    OrgAccessDenied(Option<String>),

    #[error("App not found{}", opt_suffix(.0))]
    AppNotFound(Option<String>),

    #[error("App configuration not found{}", opt_suffix(.0))]
    AppConfigurationNotFound(Option<String>),

    #[error("App configuration disabled{}", opt_suffix(.0))]
    AppConfigurationDisabled(Option<String>),

    #[error("App configuration already exists{}", opt_suffix(.0))]
    AppConfigurationAlreadyExists(Option<String>),

    #[error("Specified security scheme not supported by the app{}", opt_suffix(.0))]
    AppSecuritySchemeNotSupported(Option<String>),

    #[error("Invalid bearer token{}", opt_suffix(.0))]
    InvalidBearerToken(Option<String>),

    #[error("Invalid API key{}", opt_suffix(.0))]
    InvalidApiKey(Option<String>),

    #[error("Daily quota exceeded{}", opt_suffix(.0))]
    DailyQuotaExceeded(Option<String>),

    #[error("Max projects reached{}", opt_suffix(.0))]
    MaxProjectsReached(Option<String>),

    #[error("Max agents reached{}", opt_suffix(.0))]
    MaxAgentsReached(Option<String>),

    #[error("User not found{}", opt_suffix(.0))]
    UserNotFound(Option<String>),

    #[error("Function not found{}", opt_suffix(.0))]
    FunctionNotFound(Option<String>),

    #[error("Invalid function input{}", opt_suffix(.0))]
    InvalidFunctionInput(Option<String>),

    #[error("Invalid function definition format{}", opt_suffix(.0))]
    InvalidFunctionDefinitionFormat(Option<String>),

    #[error("Linked account already exists{}", opt_suffix(.0))]
    LinkedAccountAlreadyExists(Option<String>),

    #[error("Linked account not found{}", opt_suffix(.0))]
    LinkedAccountNotFound(Option<String>),

    #[error("Linked account disabled{}", opt_suffix(.0))]
    LinkedAccountDisabled(Option<String>),

    #[error("Agent not found{}", opt_suffix(.0))]
    AgentNotFound(Option<String>),

    #[error("App not allowed for this agent{}", opt_suffix(.0))]
    AppNotAllowedForThisAgent(Option<String>),

    #[error("Custom instruction violation{}", opt_suffix(.0))]
    CustomInstructionViolation(Option<String>),

    #[error("Agent Secrets Manager error{}", opt_suffix(.0))]
    AgentSecretsManagerError(Option<String>),

    #[error("Dependency check error{}", opt_suffix(.0))]
    DependencyCheckError(Option<String>),

    #[error("Subscription plan not found{}", opt_suffix(.0))]
    SubscriptionPlanNotFound(Option<String>),

    #[error("OAuth2 error{}", opt_suffix(.0))]
    OAuth2Error(Option<String>),

    #[error("Crypto error{}", opt_suffix(.0))]
    CryptoError(Option<String>),
}

impl Error {
    /// Stable, caller-facing error title (the "kind" in the response envelope).
    pub fn title(&self) -> &'static str {
        match self {
            Error::Database(_) => "Database error",
            Error::Config(_) => "Configuration error",
            Error::Unexpected(_) => "Unexpected error",
            Error::Authentication(_) => "Authentication error",
            Error::NoImplementationFound(_) => "No implementation found",
            Error::ProjectNotFound(_) => "Project not found",
            Error::ProjectAccessDenied(_) => "Project access denied",
            Error::OrgAccessDenied(_) => "Org access denied",
            Error::AppNotFound(_) => "App not found",
            Error::AppConfigurationNotFound(_) => "App configuration not found",
            Error::AppConfigurationDisabled(_) => "App configuration disabled",
            Error::AppConfigurationAlreadyExists(_) => "App configuration already exists",
            Error::AppSecuritySchemeNotSupported(_) => {
                "Specified security scheme not supported by the app"
            }
            Error::InvalidBearerToken(_) => "Invalid bearer token",
            Error::InvalidApiKey(_) => "Invalid API key",
            Error::DailyQuotaExceeded(_) => "Daily quota exceeded",
            Error::MaxProjectsReached(_) => "Max projects reached",
            Error::MaxAgentsReached(_) => "Max agents reached",
            Error::UserNotFound(_) => "User not found",
            Error::FunctionNotFound(_) => "Function not found",
            Error::InvalidFunctionInput(_) => "Invalid function input",
            Error::InvalidFunctionDefinitionFormat(_) => "Invalid function definition format",
            Error::LinkedAccountAlreadyExists(_) => "Linked account already exists",
            Error::LinkedAccountNotFound(_) => "Linked account not found",
            Error::LinkedAccountDisabled(_) => "Linked account disabled",
            Error::AgentNotFound(_) => "Agent not found",
            Error::AppNotAllowedForThisAgent(_) => "App not allowed for this agent",
            Error::CustomInstructionViolation(_) => "Custom instruction violation",
            Error::AgentSecretsManagerError(_) => "Agent Secrets Manager error",
            Error::DependencyCheckError(_) => "Dependency check error",
            Error::SubscriptionPlanNotFound(_) => "Subscription plan not found",
            Error::OAuth2Error(_) => "OAuth2 error",
            Error::CryptoError(_) => "Crypto error",
        }
    }

    /// HTTP status code this error kind maps to, per the error-handling design.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Database(_)
            | Error::Unexpected(_)
            | Error::OAuth2Error(_)
            | Error::CryptoError(_)
            | Error::Config(_) => 500,
            Error::Authentication(_)
            | Error::InvalidBearerToken(_)
            | Error::InvalidApiKey(_)
            | Error::DailyQuotaExceeded(_)
            | Error::AppNotAllowedForThisAgent(_) => 401,
            Error::ProjectAccessDenied(_)
            | Error::OrgAccessDenied(_)
            | Error::AppConfigurationDisabled(_)
            | Error::LinkedAccountDisabled(_)
            | Error::CustomInstructionViolation(_)
            | Error::MaxProjectsReached(_)
            | Error::MaxAgentsReached(_) => 403,
            Error::ProjectNotFound(_)
            | Error::AppNotFound(_)
            | Error::AppConfigurationNotFound(_)
            | Error::LinkedAccountNotFound(_)
            | Error::FunctionNotFound(_)
            | Error::AgentNotFound(_)
            | Error::UserNotFound(_)
            | Error::SubscriptionPlanNotFound(_) => 404,
            Error::AppConfigurationAlreadyExists(_) | Error::LinkedAccountAlreadyExists(_) => 409,
            Error::InvalidFunctionInput(_)
            | Error::InvalidFunctionDefinitionFormat(_)
            | Error::AppSecuritySchemeNotSupported(_)
            | Error::AgentSecretsManagerError(_)
            | Error::DependencyCheckError(_) => 400,
            Error::NoImplementationFound(_) => 501,
        }
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(Some(msg.into()))
    }
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(Some(msg.into()))
    }
    pub fn project_not_found(msg: impl Into<String>) -> Self {
        Self::ProjectNotFound(Some(msg.into()))
    }
    pub fn app_not_found(msg: impl Into<String>) -> Self {
        Self::AppNotFound(Some(msg.into()))
    }
    pub fn app_configuration_not_found(msg: impl Into<String>) -> Self {
        Self::AppConfigurationNotFound(Some(msg.into()))
    }
    pub fn app_configuration_disabled(msg: impl Into<String>) -> Self {
        Self::AppConfigurationDisabled(Some(msg.into()))
    }
    pub fn app_configuration_already_exists(msg: impl Into<String>) -> Self {
        Self::AppConfigurationAlreadyExists(Some(msg.into()))
    }
    pub fn app_security_scheme_not_supported(msg: impl Into<String>) -> Self {
        Self::AppSecuritySchemeNotSupported(Some(msg.into()))
    }
    pub fn invalid_api_key(msg: impl Into<String>) -> Self {
        Self::InvalidApiKey(Some(msg.into()))
    }
    pub fn daily_quota_exceeded(msg: impl Into<String>) -> Self {
        Self::DailyQuotaExceeded(Some(msg.into()))
    }
    pub fn function_not_found(msg: impl Into<String>) -> Self {
        Self::FunctionNotFound(Some(msg.into()))
    }
    pub fn invalid_function_input(msg: impl Into<String>) -> Self {
        Self::InvalidFunctionInput(Some(msg.into()))
    }
    pub fn invalid_function_definition_format(msg: impl Into<String>) -> Self {
        Self::InvalidFunctionDefinitionFormat(Some(msg.into()))
    }
    pub fn linked_account_already_exists(msg: impl Into<String>) -> Self {
        Self::LinkedAccountAlreadyExists(Some(msg.into()))
    }
    pub fn linked_account_not_found(msg: impl Into<String>) -> Self {
        Self::LinkedAccountNotFound(Some(msg.into()))
    }
    pub fn linked_account_disabled(msg: impl Into<String>) -> Self {
        Self::LinkedAccountDisabled(Some(msg.into()))
    }
    pub fn agent_not_found(msg: impl Into<String>) -> Self {
        Self::AgentNotFound(Some(msg.into()))
    }
    pub fn app_not_allowed_for_this_agent(msg: impl Into<String>) -> Self {
        Self::AppNotAllowedForThisAgent(Some(msg.into()))
    }
    pub fn custom_instruction_violation(msg: impl Into<String>) -> Self {
        Self::CustomInstructionViolation(Some(msg.into()))
    }
    pub fn agent_secrets_manager_error(msg: impl Into<String>) -> Self {
        Self::AgentSecretsManagerError(Some(msg.into()))
    }
    pub fn no_implementation_found(msg: impl Into<String>) -> Self {
        Self::NoImplementationFound(Some(msg.into()))
    }
    pub fn oauth2_error(msg: impl Into<String>) -> Self {
        Self::OAuth2Error(Some(msg.into()))
    }
    pub fn crypto_error(msg: impl Into<String>) -> Self {
        Self::CryptoError(Some(msg.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_handling_table() {
        assert_eq!(Error::invalid_api_key("missing").status_code(), 401);
        assert_eq!(Error::daily_quota_exceeded("x").status_code(), 401);
        assert_eq!(Error::app_configuration_disabled("x").status_code(), 403);
        assert_eq!(Error::app_not_found("x").status_code(), 404);
        assert_eq!(Error::app_configuration_already_exists("x").status_code(), 409);
        assert_eq!(Error::invalid_function_input("x").status_code(), 400);
        assert_eq!(Error::oauth2_error("x").status_code(), 500);
        assert_eq!(Error::no_implementation_found("x").status_code(), 501);
    }

    #[test]
    fn message_formatting_includes_detail() {
        let e = Error::app_not_found("GOOGLE");
        assert_eq!(format!("{e}"), "App not found: GOOGLE");
    }
}
