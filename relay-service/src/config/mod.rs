use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::fmt::Display;
use std::time::Duration;

/// Default Gemini REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when `GENAI_TEXT_MODEL` is not set.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Credit line attached to every successful reply.
pub const DEFAULT_CREDIT: &str = "Made by Sanchit";

/// Persona used in fixed-instruction mode unless `SYSTEM_PROMPT` overrides it.
/// The surrounding newlines are part of the prompt sent to the backend.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\nYou are CanopyCare Assistant, a helpful and friendly guide for the CanopyCare project on tree plantation and soil protection in Maharashtra. Your role is to answer visitor queries about different plant species, soil types, soil protection methods, and proper tree plantation techniques. Provide clear, short, simple, and educational responses suitable for students, community members, and volunteers. When relevant, explain why certain plants or soils are suitable for specific regions of Maharashtra (Konkan, Western Ghats, Vidarbha, Marathwada, Pune Plateau, North Maharashtra). Encourage sustainable practices, community involvement, and environmental awareness. Always use an informative, positive, and motivating tone and your developer is Sanchit.\n";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub common: core_config::Config,
    pub google: GoogleConfig,
    pub models: ModelConfig,
    pub relay: RelaySettings,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: Secret<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    /// Model handle sent to the backend (e.g., gemini-2.5-flash)
    pub text_model: String,
    /// Backend call timeout. `None` waits for as long as the backend takes.
    pub request_timeout_secs: Option<u64>,
}

impl ModelConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub instruction: InstructionSource,
    pub credit: String,
    /// When false, runtime failures answer with a generic 500 message.
    pub expose_error_details: bool,
}

impl RelaySettings {
    /// Map a failure raised while serving `/ai` to the caller-facing 500.
    pub fn unhandled(&self, err: impl Display) -> AppError {
        if self.expose_error_details {
            AppError::Unhandled(err.to_string())
        } else {
            AppError::InternalError(anyhow::anyhow!("{}", err))
        }
    }
}

/// Where the instruction preamble comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionSource {
    /// One preamble fixed at startup.
    Fixed(String),
    /// Every request supplies its own `system_prompt`.
    PerRequest,
}

impl InstructionSource {
    pub fn parse(mode: &str, system_prompt: String) -> Result<Self, AppError> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(InstructionSource::Fixed(system_prompt)),
            "per_request" | "per-request" => Ok(InstructionSource::PerRequest),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "INSTRUCTION_MODE must be 'fixed' or 'per_request', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Mock,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "GENAI_PROVIDER must be 'gemini' or 'mock', got '{}'",
                other
            ))),
        }
    }
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let provider = ProviderKind::parse(&get_env("GENAI_PROVIDER", Some("gemini"), is_prod)?)?;
        let api_key = match provider {
            ProviderKind::Gemini => get_env("GEMINI_API_KEY", None, is_prod)?,
            ProviderKind::Mock => env::var("GEMINI_API_KEY").unwrap_or_default(),
        };

        let system_prompt =
            env::var("SYSTEM_PROMPT").unwrap_or_else(|_| DEFAULT_SYSTEM_PROMPT.to_string());

        Ok(RelayConfig {
            common: common_config,
            google: GoogleConfig {
                api_key: Secret::new(api_key),
                api_base: env::var("GENAI_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            },
            models: ModelConfig {
                provider,
                text_model: get_env("GENAI_TEXT_MODEL", Some(DEFAULT_TEXT_MODEL), is_prod)?,
                request_timeout_secs: parse_timeout_secs(
                    env::var("GENAI_REQUEST_TIMEOUT_SECS").ok().as_deref(),
                )?,
            },
            relay: RelaySettings {
                instruction: InstructionSource::parse(
                    &get_env("INSTRUCTION_MODE", Some("fixed"), is_prod)?,
                    system_prompt,
                )?,
                credit: env::var("RESPONSE_CREDIT").unwrap_or_else(|_| DEFAULT_CREDIT.to_string()),
                expose_error_details: parse_flag(
                    "EXPOSE_ERROR_DETAILS",
                    env::var("EXPOSE_ERROR_DETAILS").ok().as_deref(),
                    true,
                )?,
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
        })
    }
}

/// Unset or empty means no timeout; anything else must be a positive number of seconds.
fn parse_timeout_secs(value: Option<&str>) -> Result<Option<u64>, AppError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(secs)),
        _ => Err(AppError::ConfigError(anyhow::anyhow!(
            "GENAI_REQUEST_TIMEOUT_SECS must be a positive number of seconds, got '{}'",
            raw
        ))),
    }
}

fn parse_flag(key: &str, value: Option<&str>, default: bool) -> Result<bool, AppError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be 'true' or 'false', got '{}'",
            key,
            raw
        ))),
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_mode_keeps_the_preamble() {
        let source = InstructionSource::parse("fixed", "Be kind.".into()).unwrap();
        assert_eq!(source, InstructionSource::Fixed("Be kind.".into()));
    }

    #[test]
    fn per_request_mode_accepts_both_spellings() {
        for mode in ["per_request", "per-request", " PER_REQUEST "] {
            let source = InstructionSource::parse(mode, String::new()).unwrap();
            assert_eq!(source, InstructionSource::PerRequest);
        }
    }

    #[test]
    fn unknown_mode_is_a_config_error() {
        let err = InstructionSource::parse("sometimes", String::new()).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn provider_kind_parses() {
        assert_eq!(ProviderKind::parse("Gemini").unwrap(), ProviderKind::Gemini);
        assert_eq!(ProviderKind::parse("mock").unwrap(), ProviderKind::Mock);
        assert!(ProviderKind::parse("openai").is_err());
    }

    #[test]
    fn default_persona_names_every_region() {
        for region in [
            "Konkan",
            "Western Ghats",
            "Vidarbha",
            "Marathwada",
            "Pune Plateau",
            "North Maharashtra",
        ] {
            assert!(DEFAULT_SYSTEM_PROMPT.contains(region), "missing {region}");
        }
    }

    #[test]
    fn default_persona_is_wrapped_in_newlines() {
        assert!(DEFAULT_SYSTEM_PROMPT.starts_with("\nYou are CanopyCare Assistant"));
        assert!(DEFAULT_SYSTEM_PROMPT.ends_with("your developer is Sanchit.\n"));
    }

    #[test]
    fn timeout_is_optional_but_must_be_positive() {
        assert_eq!(parse_timeout_secs(None).unwrap(), None);
        assert_eq!(parse_timeout_secs(Some("")).unwrap(), None);
        assert_eq!(parse_timeout_secs(Some("30")).unwrap(), Some(30));

        for bad in ["0", "-5", "ten", "1.5"] {
            let err = parse_timeout_secs(Some(bad)).unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)), "value {bad}");
        }
    }

    #[test]
    fn flag_accepts_only_true_or_false() {
        assert!(parse_flag("EXPOSE_ERROR_DETAILS", None, true).unwrap());
        assert!(!parse_flag("EXPOSE_ERROR_DETAILS", Some("FALSE"), true).unwrap());
        assert!(parse_flag("EXPOSE_ERROR_DETAILS", Some("true"), false).unwrap());

        for bad in ["0", "no", "off"] {
            let err = parse_flag("EXPOSE_ERROR_DETAILS", Some(bad), true).unwrap_err();
            assert!(matches!(err, AppError::ConfigError(_)), "value {bad}");
        }
    }

    #[test]
    fn unhandled_respects_exposure_flag() {
        let mut settings = RelaySettings {
            instruction: InstructionSource::PerRequest,
            credit: DEFAULT_CREDIT.to_string(),
            expose_error_details: true,
        };
        assert!(matches!(
            settings.unhandled("boom"),
            AppError::Unhandled(msg) if msg == "boom"
        ));

        settings.expose_error_details = false;
        assert!(matches!(
            settings.unhandled("boom"),
            AppError::InternalError(_)
        ));
    }
}
