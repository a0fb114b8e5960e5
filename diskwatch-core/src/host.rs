//! Host identification for outbound messages
//!
//! The label is resolved at send time, not at startup, so a rename is
//! picked up without restarting the service.

use tracing::warn;

/// Where the host label in message headers comes from
#[derive(Debug, Clone, Default)]
pub enum HostIdentity {
    /// Ask the OS on every send
    #[default]
    System,
    /// Fixed label from configuration
    Fixed(String),
}

impl HostIdentity {
    pub fn from_label(label: Option<String>) -> Self {
        match label {
            Some(label) if !label.trim().is_empty() => {
                HostIdentity::Fixed(label.trim().to_string())
            }
            _ => HostIdentity::System,
        }
    }

    pub fn resolve(&self) -> String {
        match self {
            HostIdentity::Fixed(label) => label.clone(),
            HostIdentity::System => system_hostname(),
        }
    }
}

/// Hostname as reported by the OS, `unknown-host` if it cannot be read
pub fn system_hostname() -> String {
    let hostname = gethostname::gethostname().to_string_lossy().trim().to_string();
    if hostname.is_empty() {
        warn!("Hostname is empty, using placeholder");
        "unknown-host".to_string()
    } else {
        hostname
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_label_wins() {
        let identity = HostIdentity::from_label(Some(" nas-01 ".to_string()));
        assert_eq!(identity.resolve(), "nas-01");
    }

    #[test]
    fn test_blank_label_falls_back_to_system() {
        assert!(matches!(HostIdentity::from_label(Some("  ".into())), HostIdentity::System));
        assert!(!HostIdentity::System.resolve().is_empty());
    }
}
