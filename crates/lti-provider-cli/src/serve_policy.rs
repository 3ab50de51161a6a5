// crates/lti-provider-cli/src/serve_policy.rs
// ============================================================================
// Module: Serve Policy
// Description: Startup warnings for the LTI provider server launcher.
// Purpose: Flag deployments whose settings are unsafe off loopback.
// Dependencies: lti-provider-config
// ============================================================================

//! ## Overview
//! LTI launches arrive as cross-site form posts from the tool consumer, so a
//! deployment reachable from the network needs `Secure` session cookies and
//! an auth mode that clients cannot spoof. These checks never block startup;
//! they produce warnings the CLI prints to stderr.

use std::fmt;
use std::net::SocketAddr;

use lti_provider_config::AuthMode;
use lti_provider_config::LtiProviderConfig;

/// Startup warning for `serve`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeWarning {
    /// The provider flag is off; every launch will be refused.
    LtiDisabled,
    /// Non-loopback bind without `Secure` session cookies.
    InsecureCookie {
        /// Bind address.
        bind: SocketAddr,
    },
    /// Non-loopback bind trusting a client-settable user header.
    TrustedHeaderExposed {
        /// Bind address.
        bind: SocketAddr,
        /// Trusted header name.
        header: String,
    },
}

impl fmt::Display for ServeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LtiDisabled => {
                write!(f, "warning: lti.enabled is false; all launches will be refused")
            }
            Self::InsecureCookie {
                bind,
            } => write!(
                f,
                "warning: binding {bind} without session.secure_cookie; session cookies will be \
                 sent over plain http"
            ),
            Self::TrustedHeaderExposed {
                bind,
                header,
            } => write!(
                f,
                "warning: binding {bind} with trusted_header auth; ensure a proxy strips \
                 client-supplied {header} headers"
            ),
        }
    }
}

/// Returns the startup warnings for `config`.
#[must_use]
pub fn serve_warnings(config: &LtiProviderConfig) -> Vec<ServeWarning> {
    let mut warnings = Vec::new();
    if !config.lti.enabled {
        warnings.push(ServeWarning::LtiDisabled);
    }
    let Ok(bind) = config.server.bind_addr() else {
        return warnings;
    };
    if bind.ip().is_loopback() {
        return warnings;
    }
    if !config.session.secure_cookie {
        warnings.push(ServeWarning::InsecureCookie {
            bind,
        });
    }
    if config.auth.mode == AuthMode::TrustedHeader {
        warnings.push(ServeWarning::TrustedHeaderExposed {
            bind,
            header: config.auth.header.clone(),
        });
    }
    warnings
}
