//! S-NAPTR service parameters (TS 29.303 §6).
//!
//! A NAPTR service field such as
//! `x-3gpp-sgw:x-s5-gtp+ue-1.3:x-s8-gtp+nc-nr` names one application
//! service followed by the protocols it supports. Each protocol may carry
//! the UE usage types (`+ue-`) and network capabilities (`+nc-`) it serves.

use std::fmt;

use crate::error::CandidateParseError;

macro_rules! tagged_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $tag:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// Anything not listed above.
            Unknown,
        }

        impl $name {
            /// Every known value, excluding `Unknown`.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The tag used in NAPTR service fields.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $tag,)+
                    $name::Unknown => "unknown",
                }
            }

            /// Parse a tag, case-insensitively. Unrecognized text maps to
            /// `Unknown`.
            pub fn from_tag(tag: &str) -> Self {
                $(if tag.eq_ignore_ascii_case($tag) {
                    return $name::$variant;
                })+
                $name::Unknown
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

tagged_enum! {
    /// A 3GPP application service.
    pub enum AppService {
        Pgw => "x-3gpp-pgw",
        Sgw => "x-3gpp-sgw",
        Ggsn => "x-3gpp-ggsn",
        Sgsn => "x-3gpp-sgsn",
        Mme => "x-3gpp-mme",
        Msc => "x-3gpp-msc",
        Upf => "x-3gpp-upf",
        Amf => "x-3gpp-amf",
    }
}

tagged_enum! {
    /// An application protocol (interface) offered by a service.
    pub enum Protocol {
        Gn => "x-gn",
        Gp => "x-gp",
        N2 => "x-n2",
        Nq => "x-nq",
        NqPrime => "x-nqprime",
        S1Mme => "x-s1-mme",
        S1U => "x-s1-u",
        S10 => "x-s10",
        S11 => "x-s11",
        S12 => "x-s12",
        S16 => "x-s16",
        S2aGtp => "x-s2a-gtp",
        S2aMipv4 => "x-s2a-mipv4",
        S2aPmip => "x-s2a-pmip",
        S2bGtp => "x-s2b-gtp",
        S2bPmip => "x-s2b-pmip",
        S2cDsmip => "x-s2c-dsmip",
        S3 => "x-s3",
        S4 => "x-s4",
        S5Gtp => "x-s5-gtp",
        S5Pmip => "x-s5-pmip",
        S6a => "x-s6a",
        S8Gtp => "x-s8-gtp",
        S8Pmip => "x-s8-pmip",
        Sv => "x-sv",
        Sxa => "x-sxa",
        Sxb => "x-sxb",
        Sxc => "x-sxc",
    }
}

/// One protocol entry of a service field, with its qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppProtocol {
    /// The recognized protocol, or `Unknown`.
    pub protocol: Protocol,
    /// The entry exactly as it appeared, qualifiers included.
    pub raw: String,
    /// UE usage types served. Empty means all.
    pub usage_types: Vec<u32>,
    /// Network capabilities offered.
    pub network_capabilities: Vec<String>,
}

impl AppProtocol {
    /// Parse one `:`-separated entry such as `x-s5-gtp+ue-1.3+nc-nr`.
    pub fn parse(entry: &str) -> Self {
        let mut parts = entry.split('+');
        let protocol = Protocol::from_tag(parts.next().unwrap_or_default().trim());
        let mut usage_types = Vec::new();
        let mut network_capabilities = Vec::new();

        for part in parts {
            let part = part.trim();
            if let Some(list) = strip_prefix_ignore_case(part, "ue-") {
                usage_types.extend(list.split('.').filter_map(|v| v.parse::<u32>().ok()));
            } else if let Some(list) = strip_prefix_ignore_case(part, "nc-") {
                network_capabilities.extend(
                    list.split('.')
                        .filter(|c| !c.is_empty())
                        .map(|c| c.to_ascii_lowercase()),
                );
            }
        }

        Self {
            protocol,
            raw: entry.to_owned(),
            usage_types,
            network_capabilities,
        }
    }

    /// Whether this entry serves every usage type in `wanted`.
    ///
    /// An entry without a `ue-` list serves all usage types.
    pub fn serves_usage_types(&self, wanted: &[u32]) -> bool {
        self.usage_types.is_empty() || wanted.iter().all(|u| self.usage_types.contains(u))
    }

    /// Whether this entry offers every capability in `wanted`.
    pub fn offers_capabilities(&self, wanted: &[String]) -> bool {
        wanted.iter().all(|c| {
            self.network_capabilities
                .iter()
                .any(|offered| offered.eq_ignore_ascii_case(c))
        })
    }
}

impl fmt::Display for AppProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A parsed NAPTR service field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceParameters {
    /// The application service.
    pub service: AppService,
    /// The service tag as it appeared.
    pub raw_service: String,
    /// Supported protocols, in field order.
    pub protocols: Vec<AppProtocol>,
}

impl ServiceParameters {
    /// Parse a service field.
    ///
    /// Unknown service or protocol tags are kept as `Unknown`; only an
    /// empty field is an error.
    pub fn parse(field: &str) -> Result<Self, CandidateParseError> {
        let mut entries = field.trim().split(':');
        let raw_service = entries.next().unwrap_or_default().trim();
        if raw_service.is_empty() {
            return Err(CandidateParseError::MalformedService(field.to_owned()));
        }

        Ok(Self {
            service: AppService::from_tag(raw_service),
            raw_service: raw_service.to_owned(),
            protocols: entries
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(AppProtocol::parse)
                .collect(),
        })
    }

    /// Whether any entry names `protocol`.
    pub fn supports(&self, protocol: Protocol) -> bool {
        self.protocols.iter().any(|p| p.protocol == protocol)
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &value[prefix.len()..])
}
