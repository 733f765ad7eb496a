//! Syslog transport for impstats messages
//!
//! rsyslog ships its statistics as regular syslog messages whose content is a
//! single JSON object. This module receives those messages over UDP or TCP,
//! strips the syslog header and hands the content to the stats engine.

pub mod listener;
pub mod message;

pub use listener::{Frame, MAX_MESSAGE_SIZE, SyslogListener, forward_to_parser, start_ingest};
pub use message::extract_content;

use crate::error::{AppError, AppResult};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Syslog header format expected on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SyslogFormat {
    /// BSD syslog: `<PRI>Mmm dd hh:mm:ss HOST TAG: MSG`
    #[default]
    Rfc3164,
    /// `<PRI>1 TIMESTAMP HOST APP PROCID MSGID SD MSG`
    Rfc5424,
}

impl SyslogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rfc3164 => "rfc3164",
            Self::Rfc5424 => "rfc5424",
        }
    }
}

impl fmt::Display for SyslogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyslogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rfc3164" => Ok(Self::Rfc3164),
            "rfc5424" => Ok(Self::Rfc5424),
            other => Err(AppError::Config(format!(
                "syslog format {} is not supported (expected rfc3164 or rfc5424)",
                other
            ))),
        }
    }
}

/// Transport protocol of the syslog input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
        }
    }
}

/// Parsed `proto://host:port` listen address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenAddress {
    pub protocol: Protocol,
    /// `host:port` part handed to the socket bind call
    pub address: String,
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol.as_str(), self.address)
    }
}

impl FromStr for ListenAddress {
    type Err = AppError;

    fn from_str(s: &str) -> AppResult<Self> {
        let wrong_address = || AppError::Config(format!("wrong syslog address: {}", s));

        let (scheme, address) = s.split_once("://").ok_or_else(wrong_address)?;
        let protocol = match scheme {
            "udp" => Protocol::Udp,
            "tcp" => Protocol::Tcp,
            _ => return Err(wrong_address()),
        };

        // host may be empty (":5145") but the port is required
        let (_, port) = address.rsplit_once(':').ok_or_else(wrong_address)?;
        if port.parse::<u16>().is_err() {
            return Err(wrong_address());
        }

        let address = if address.starts_with(':') {
            format!("0.0.0.0{}", address)
        } else {
            address.to_string()
        };

        Ok(Self { protocol, address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_udp_address() {
        let addr: ListenAddress = "udp://0.0.0.0:5145".parse().unwrap();
        assert_eq!(addr.protocol, Protocol::Udp);
        assert_eq!(addr.address, "0.0.0.0:5145");
        assert_eq!(addr.to_string(), "udp://0.0.0.0:5145");
    }

    #[test]
    fn test_parse_tcp_address_without_host() {
        let addr: ListenAddress = "tcp://:6514".parse().unwrap();
        assert_eq!(addr.protocol, Protocol::Tcp);
        assert_eq!(addr.address, "0.0.0.0:6514");
    }

    #[test]
    fn test_rejects_unknown_scheme_and_missing_port() {
        for input in ["http://0.0.0.0:80", "0.0.0.0:5145", "udp://localhost", "udp://host:port"] {
            let err = input.parse::<ListenAddress>().unwrap_err();
            assert!(
                err.to_string().contains("wrong syslog address"),
                "unexpected error for {}: {}",
                input,
                err
            );
        }
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("rfc3164".parse::<SyslogFormat>().unwrap(), SyslogFormat::Rfc3164);
        assert_eq!("rfc5424".parse::<SyslogFormat>().unwrap(), SyslogFormat::Rfc5424);
        assert!("json".parse::<SyslogFormat>().is_err());
        assert_eq!(SyslogFormat::Rfc5424.to_string(), "rfc5424");
    }
}
