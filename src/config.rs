//! Configuration for Sluice
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Sluice - water-use permit portal backend
#[derive(Parser, Debug, Clone)]
#[command(name = "sluice")]
#[command(about = "Backend service for water-use permit applications and certificates")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "sluice")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (relaxes startup requirements, logs verification codes)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Days before expiry during which a permit counts as expiring soon
    #[arg(long, env = "PERMIT_LOOKAHEAD_DAYS", default_value = "30")]
    pub permit_lookahead_days: i64,

    /// Review SLA in days, measured from submission
    #[arg(long, env = "REVIEW_SLA_DAYS", default_value = "30")]
    pub review_sla_days: i64,

    /// Verification code expiry in seconds
    #[arg(long, env = "VERIFICATION_EXPIRY_SECONDS", default_value = "600")]
    pub verification_expiry_seconds: i64,

    /// Cooldown between verification code resends, in seconds
    #[arg(long, env = "VERIFICATION_RESEND_COOLDOWN_SECONDS", default_value = "30")]
    pub verification_resend_cooldown_seconds: i64,

    /// Maximum verification attempts before the code is invalidated
    #[arg(long, env = "VERIFICATION_MAX_ATTEMPTS", default_value = "5")]
    pub verification_max_attempts: u32,

    /// Path to the authority logo (PNG) stamped on certificates
    #[arg(long, env = "CERT_AUTHORITY_LOGO")]
    pub cert_authority_logo: Option<String>,

    /// Path to the ministry logo (PNG) stamped on certificates
    #[arg(long, env = "CERT_MINISTRY_LOGO")]
    pub cert_ministry_logo: Option<String>,
}

impl Args {
    /// Validate configuration
    ///
    /// Missing store endpoint or secret must fail at startup, not surface as
    /// opaque runtime errors.
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(s) if s.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string())
                }
                _ => {}
            }
        }

        if self.mongodb_uri.is_empty() {
            return Err("MONGODB_URI must not be empty".to_string());
        }

        if self.permit_lookahead_days < 0 {
            return Err("PERMIT_LOOKAHEAD_DAYS must not be negative".to_string());
        }

        if self.verification_max_attempts == 0 {
            return Err("VERIFICATION_MAX_ATTEMPTS must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["sluice", "--dev-mode"])
    }

    #[test]
    fn test_dev_mode_is_a_bare_flag() {
        let args = base_args();
        assert!(args.dev_mode);
        // The flag takes no value
        assert!(Args::try_parse_from(["sluice", "--dev-mode", "true"]).is_err());
    }

    #[test]
    fn test_dev_mode_allows_missing_secret() {
        assert!(base_args().validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let args = Args::parse_from(["sluice"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_production_rejects_short_secret() {
        let args = Args::parse_from(["sluice", "--jwt-secret", "short"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_negative_lookahead_rejected() {
        let args = Args::parse_from(["sluice", "--dev-mode", "--permit-lookahead-days=-1"]);
        assert!(args.validate().is_err());
    }
}
