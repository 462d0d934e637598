//! Release channels and API endpoints
//!
//! A channel name maps to a service host: `local` is a dev server on
//! localhost, `main` is served from the `master` subdomain, anything else is
//! used as the subdomain verbatim.

use std::str::FromStr;

use padlink_core::ReloadMode;

/// Host of a locally running DartPad service
pub const LOCAL_HOST_URL: &str = "http://localhost:8080";

/// Path prefix shared by every endpoint
pub const API_PREFIX: &str = "api/v3/";

/// Service release channel
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Channel {
    Local,
    #[default]
    Main,
    Named(String),
}

impl Channel {
    /// Base URL of the service for this channel
    pub fn host_url(&self) -> String {
        match self {
            Channel::Local => LOCAL_HOST_URL.to_string(),
            Channel::Main => "https://master.api.dartpad.dev".to_string(),
            Channel::Named(name) => format!("https://{}.api.dartpad.dev", name),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Channel::Local => "local",
            Channel::Main => "main",
            Channel::Named(name) => name,
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        if name.is_empty() {
            return Err("channel name cannot be empty".to_string());
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(format!("invalid channel name: {}", s));
        }
        Ok(match name.as_str() {
            "local" => Channel::Local,
            "main" => Channel::Main,
            _ => Channel::Named(name),
        })
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// DartPad `/api/v3` endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    CompileNewDdc,
    CompileNewDdcReload,
    Analyze,
    Format,
    Complete,
    Version,
    GenerateCode,
    UpdateCode,
}

impl Endpoint {
    /// Compile endpoint for a reload mode
    pub fn for_compile(mode: ReloadMode) -> Self {
        match mode {
            ReloadMode::Full => Endpoint::CompileNewDdc,
            ReloadMode::Incremental => Endpoint::CompileNewDdcReload,
        }
    }

    /// Endpoint name as it appears in the URL
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::CompileNewDdc => "compileNewDDC",
            Endpoint::CompileNewDdcReload => "compileNewDDCReload",
            Endpoint::Analyze => "analyze",
            Endpoint::Format => "format",
            Endpoint::Complete => "complete",
            Endpoint::Version => "version",
            Endpoint::GenerateCode => "generateCode",
            Endpoint::UpdateCode => "updateCode",
        }
    }

    /// Path relative to the service host
    pub fn path(&self) -> String {
        format!("{}{}", API_PREFIX, self.name())
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_host_urls() {
        assert_eq!(Channel::Local.host_url(), "http://localhost:8080");
        assert_eq!(Channel::Main.host_url(), "https://master.api.dartpad.dev");
        assert_eq!(
            Channel::Named("beta".to_string()).host_url(),
            "https://beta.api.dartpad.dev"
        );
    }

    #[test]
    fn test_channel_parse() {
        assert_eq!("local".parse::<Channel>().unwrap(), Channel::Local);
        assert_eq!("Main".parse::<Channel>().unwrap(), Channel::Main);
        assert_eq!(
            "stable".parse::<Channel>().unwrap(),
            Channel::Named("stable".to_string())
        );
        assert!("".parse::<Channel>().is_err());
        assert!("evil.com/x".parse::<Channel>().is_err());
    }

    #[test]
    fn test_compile_endpoint_selection() {
        assert_eq!(
            Endpoint::for_compile(ReloadMode::Full).path(),
            "api/v3/compileNewDDC"
        );
        assert_eq!(
            Endpoint::for_compile(ReloadMode::Incremental).path(),
            "api/v3/compileNewDDCReload"
        );
    }
}
