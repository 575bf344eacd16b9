//! Authentication and authorization for Sluice
//!
//! Provides:
//! - JWT token generation and validation
//! - Role-based operation authorization
//! - Password hashing with Argon2
//! - Signup verification codes and the multi-step signup flow

pub mod jwt;
pub mod password;
pub mod permissions;
pub mod signup;
pub mod verification;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenInput};
pub use password::{hash_password, verify_password};
pub use permissions::{is_operation_allowed, Role};
pub use signup::{BeginOutcome, SignupFlow, SignupFlows, SignupState};
pub use verification::{CodeCheck, ResendOutcome, VerificationConfig, VerificationStore};
