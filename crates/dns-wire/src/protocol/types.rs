use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

pub const HEADER_MASK_QR: u8 = 0b1000_0000;
pub const HEADER_MASK_OPCODE: u8 = 0b0111_1000;
pub const HEADER_OFFSET_OPCODE: u8 = 3;
pub const HEADER_MASK_AA: u8 = 0b0000_0100;
pub const HEADER_MASK_TC: u8 = 0b0000_0010;
pub const HEADER_MASK_RD: u8 = 0b0000_0001;
pub const HEADER_MASK_RA: u8 = 0b1000_0000;
pub const HEADER_MASK_RCODE: u8 = 0b0000_1111;

pub const LABEL_MAX_LEN: usize = 63;
pub const DOMAINNAME_MAX_LEN: usize = 255;

/// Common header type for all messages.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      ID                       |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |QR|   Opcode  |AA|TC|RD|RA|   Z    |   RCODE   |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    QDCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ANCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    NSCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ARCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// See section 4.1.1 of RFC 1035.  The count fields are not part of
/// this type: they are derived from the message contents during
/// serialisation, and validated during deserialisation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Header {
    /// A 16 bit identifier assigned by the program that generates the
    /// query, copied into the corresponding reply.
    pub id: u16,

    /// Whether this message is a query (false) or a response (true).
    pub is_response: bool,

    /// The kind of query, set by the originator and copied into the
    /// response.
    pub opcode: Opcode,

    /// Authoritative Answer - valid in responses, asserts that the
    /// responding name server is an authority for the domain name in
    /// the question section.
    pub is_authoritative: bool,

    /// TrunCation - the message was cut short due to length greater
    /// than that permitted on the transmission channel.
    pub is_truncated: bool,

    /// Recursion Desired - may be set in a query and is copied into
    /// the response.
    pub recursion_desired: bool,

    /// Recursion Available - set or cleared in a response.  This
    /// server never offers recursion.
    pub recursion_available: bool,

    /// Response code.
    pub rcode: Rcode,
}

impl Header {
    /// The response header for a query: id, opcode, and RD echoed,
    /// QR and AA set, everything else cleared.
    pub fn response(&self, rcode: Rcode) -> Self {
        Self {
            id: self.id,
            is_response: true,
            opcode: self.opcode,
            is_authoritative: true,
            is_truncated: false,
            recursion_desired: self.recursion_desired,
            recursion_available: false,
            rcode,
        }
    }

    /// The response header for a query so malformed that only its id
    /// could be recovered.
    pub fn format_error(id: u16) -> Self {
        Self {
            id,
            is_response: true,
            opcode: Opcode::Standard,
            is_authoritative: false,
            is_truncated: false,
            recursion_desired: false,
            recursion_available: false,
            rcode: Rcode::FormatError,
        }
    }
}

/// A decoded question.  The question section is always exactly one
/// entry in this server: anything else is a format error.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Query {
    pub header: Header,

    /// The queried name, lowercased.
    pub name: DomainName,

    pub qtype: RecordType,

    pub qclass: RecordClass,

    /// How many octets past the fixed header the question section
    /// occupies.  The encoder splices those octets into the response
    /// verbatim, preserving the original label casing.
    pub question_len: usize,
}

/// What sort of query this is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Opcode {
    Standard,
    Inverse,
    Status,
    Reserved(OpcodeReserved),
}

/// A struct with a private constructor, to ensure invalid `Opcode`s
/// cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OpcodeReserved(u8);

impl From<u8> for Opcode {
    fn from(octet: u8) -> Self {
        match octet & 0b0000_1111 {
            0 => Opcode::Standard,
            1 => Opcode::Inverse,
            2 => Opcode::Status,
            other => Opcode::Reserved(OpcodeReserved(other)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        match value {
            Opcode::Standard => 0,
            Opcode::Inverse => 1,
            Opcode::Status => 2,
            Opcode::Reserved(OpcodeReserved(octet)) => octet,
        }
    }
}

/// What sort of response this is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rcode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Reserved(RcodeReserved),
}

/// A struct with a private constructor, to ensure invalid `Rcode`s
/// cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RcodeReserved(u8);

impl From<u8> for Rcode {
    fn from(octet: u8) -> Self {
        match octet & 0b0000_1111 {
            0 => Rcode::NoError,
            1 => Rcode::FormatError,
            2 => Rcode::ServerFailure,
            3 => Rcode::NameError,
            4 => Rcode::NotImplemented,
            5 => Rcode::Refused,
            other => Rcode::Reserved(RcodeReserved(other)),
        }
    }
}

impl From<Rcode> for u8 {
    fn from(value: Rcode) -> Self {
        match value {
            Rcode::NoError => 0,
            Rcode::FormatError => 1,
            Rcode::ServerFailure => 2,
            Rcode::NameError => 3,
            Rcode::NotImplemented => 4,
            Rcode::Refused => 5,
            Rcode::Reserved(RcodeReserved(octet)) => octet,
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rcode::NoError => write!(f, "NOERROR"),
            Rcode::FormatError => write!(f, "FORMERR"),
            Rcode::ServerFailure => write!(f, "SERVFAIL"),
            Rcode::NameError => write!(f, "NXDOMAIN"),
            Rcode::NotImplemented => write!(f, "NOTIMP"),
            Rcode::Refused => write!(f, "REFUSED"),
            Rcode::Reserved(RcodeReserved(octet)) => write!(f, "RCODE{octet}"),
        }
    }
}

/// The record types this server stores and answers with, plus a
/// catch-all for everything else on the wire.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    MX,
    TXT,
    AAAA,
    SRV,
    Unknown(RecordTypeUnknown),
}

/// A struct with a private constructor, to ensure invalid
/// `RecordType`s cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RecordTypeUnknown(u16);

impl RecordType {
    pub fn is_unknown(&self) -> bool {
        matches!(self, RecordType::Unknown(_))
    }

    /// Parse an uppercase-or-lowercase mnemonic.  Only the supported
    /// types are accepted: there is no way to store a record of a
    /// type this server cannot serialise.
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Some(RecordType::A),
            "NS" => Some(RecordType::NS),
            "CNAME" => Some(RecordType::CNAME),
            "MX" => Some(RecordType::MX),
            "TXT" => Some(RecordType::TXT),
            "AAAA" => Some(RecordType::AAAA),
            "SRV" => Some(RecordType::SRV),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::NS => write!(f, "NS"),
            RecordType::CNAME => write!(f, "CNAME"),
            RecordType::MX => write!(f, "MX"),
            RecordType::TXT => write!(f, "TXT"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType::SRV => write!(f, "SRV"),
            RecordType::Unknown(RecordTypeUnknown(n)) => write!(f, "TYPE{n}"),
        }
    }
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            5 => RecordType::CNAME,
            15 => RecordType::MX,
            16 => RecordType::TXT,
            28 => RecordType::AAAA,
            33 => RecordType::SRV,
            _ => RecordType::Unknown(RecordTypeUnknown(value)),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::MX => 15,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::SRV => 33,
            RecordType::Unknown(RecordTypeUnknown(value)) => value,
        }
    }
}

/// Record classes.  Only IN is served; queries for any other class
/// are refused.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordClass {
    IN,
    Unknown(RecordClassUnknown),
}

/// A struct with a private constructor, to ensure invalid
/// `RecordClass`es cannot be created.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RecordClassUnknown(u16);

impl RecordClass {
    pub fn is_unknown(&self) -> bool {
        matches!(self, RecordClass::Unknown(_))
    }
}

impl From<u16> for RecordClass {
    fn from(value: u16) -> Self {
        match value {
            1 => RecordClass::IN,
            _ => RecordClass::Unknown(RecordClassUnknown(value)),
        }
    }
}

impl From<RecordClass> for u16 {
    fn from(value: RecordClass) -> Self {
        match value {
            RecordClass::IN => 1,
            RecordClass::Unknown(RecordClassUnknown(value)) => value,
        }
    }
}

/// A domain name: a sequence of labels, each 1 to 63 octets, at most
/// 255 octets in wire form overall.  Names are lowercased on
/// construction so that equality and hashing are case-insensitive.
///
/// Unlike a general-purpose DNS library this type does not keep the
/// root label: the dotted form has no trailing dot, matching how
/// names appear in the mappings document and the management protocol.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DomainName {
    /// Wire encoding: length-prefixed labels followed by the zero
    /// octet.
    pub octets: Vec<u8>,

    /// The parsed labels, without the trailing empty root label.
    pub labels: Vec<Vec<u8>>,
}

impl DomainName {
    /// Parse a dotted string, eg `mail.example.com` (a trailing dot
    /// is accepted and ignored).  Returns `None` if any label is
    /// empty, non-ASCII, or too long, or if the whole name is too
    /// long.
    pub fn from_dotted_string(s: &str) -> Option<Self> {
        let stripped = s.strip_suffix('.').unwrap_or(s);
        if stripped.is_empty() {
            return None;
        }

        Self::from_labels(stripped.split('.').map(|l| l.as_bytes().to_vec()).collect())
    }

    /// Construct a name from labels, lowercasing them.  Returns
    /// `None` if a label or the name overall breaks the length
    /// rules.
    pub fn from_labels(mixed_case_labels: Vec<Vec<u8>>) -> Option<Self> {
        if mixed_case_labels.is_empty() {
            return None;
        }

        let mut octets = Vec::<u8>::with_capacity(DOMAINNAME_MAX_LEN);
        let mut labels = Vec::<Vec<u8>>::with_capacity(mixed_case_labels.len());

        for mc_label in &mixed_case_labels {
            if mc_label.is_empty() || mc_label.len() > LABEL_MAX_LEN {
                return None;
            }

            octets.push(mc_label.len() as u8);
            let mut label = Vec::<u8>::with_capacity(mc_label.len());
            for octet in mc_label {
                if !octet.is_ascii() {
                    return None;
                }

                let octet = octet.to_ascii_lowercase();
                label.push(octet);
                octets.push(octet);
            }
            labels.push(label);
        }

        octets.push(0);

        if octets.len() <= DOMAINNAME_MAX_LEN {
            Some(Self { octets, labels })
        } else {
            None
        }
    }

    pub fn to_dotted_string(&self) -> String {
        let mut out = String::with_capacity(self.octets.len());
        let mut first = true;
        for label in &self.labels {
            if first {
                first = false;
            } else {
                out.push('.');
            }
            for octet in label {
                out.push(*octet as char);
            }
        }

        out
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dotted_string())
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainName")
            .field("to_dotted_string()", &self.to_dotted_string())
            .finish()
    }
}

/// A record value, parsed from its textual form when it enters the
/// system.  The serialiser consumes these directly: by the time a
/// value is answered with, it cannot fail to encode.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RecordData {
    /// A 32 bit Internet address.
    A { address: Ipv4Addr },

    /// A 128 bit Internet address.
    AAAA { address: Ipv6Addr },

    /// The canonical name for an alias.
    CNAME { cname: DomainName },

    /// A host which should be authoritative for the domain.
    NS { nsdname: DomainName },

    /// A mail exchange and its preference (lower preferred).
    MX {
        preference: u16,
        exchange: DomainName,
    },

    /// One character-string of descriptive text.
    TXT { text: String },

    /// The location of a service, RFC 2782.
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DomainName,
    },
}

impl RecordData {
    pub fn rtype(&self) -> RecordType {
        match self {
            RecordData::A { .. } => RecordType::A,
            RecordData::AAAA { .. } => RecordType::AAAA,
            RecordData::CNAME { .. } => RecordType::CNAME,
            RecordData::NS { .. } => RecordType::NS,
            RecordData::MX { .. } => RecordType::MX,
            RecordData::TXT { .. } => RecordType::TXT,
            RecordData::SRV { .. } => RecordType::SRV,
        }
    }

    /// Parse the textual form of a value of the given type:
    ///
    /// - `A`: dotted-quad IPv4 literal
    /// - `AAAA`: IPv6 literal in presentation form
    /// - `CNAME`, `NS`: a domain name
    /// - `MX`: `"<preference> <exchange>"`
    /// - `TXT`: any text of at most 255 octets
    /// - `SRV`: `"<priority> <weight> <port> <target>"`
    ///
    /// # Errors
    ///
    /// If the value does not parse as the type demands.
    pub fn parse(rtype: RecordType, value: &str) -> Result<Self, ValueError> {
        match rtype {
            RecordType::A => match Ipv4Addr::from_str(value) {
                Ok(address) => Ok(RecordData::A { address }),
                Err(_) => Err(ValueError::InvalidIpv4(value.to_string())),
            },
            RecordType::AAAA => match Ipv6Addr::from_str(value) {
                Ok(address) => Ok(RecordData::AAAA { address }),
                Err(_) => Err(ValueError::InvalidIpv6(value.to_string())),
            },
            RecordType::CNAME => match DomainName::from_dotted_string(value) {
                Some(cname) => Ok(RecordData::CNAME { cname }),
                None => Err(ValueError::InvalidDomain(value.to_string())),
            },
            RecordType::NS => match DomainName::from_dotted_string(value) {
                Some(nsdname) => Ok(RecordData::NS { nsdname }),
                None => Err(ValueError::InvalidDomain(value.to_string())),
            },
            RecordType::MX => {
                let fields: Vec<&str> = value.split_whitespace().collect();
                if let [preference, exchange] = fields[..] {
                    match (preference.parse(), DomainName::from_dotted_string(exchange)) {
                        (Ok(preference), Some(exchange)) => Ok(RecordData::MX {
                            preference,
                            exchange,
                        }),
                        _ => Err(ValueError::InvalidMx(value.to_string())),
                    }
                } else {
                    Err(ValueError::InvalidMx(value.to_string()))
                }
            }
            RecordType::TXT => {
                if value.len() > 255 {
                    Err(ValueError::TxtTooLong(value.len()))
                } else {
                    Ok(RecordData::TXT {
                        text: value.to_string(),
                    })
                }
            }
            RecordType::SRV => {
                let fields: Vec<&str> = value.split_whitespace().collect();
                if let [priority, weight, port, target] = fields[..] {
                    match (
                        priority.parse(),
                        weight.parse(),
                        port.parse(),
                        DomainName::from_dotted_string(target),
                    ) {
                        (Ok(priority), Ok(weight), Ok(port), Some(target)) => {
                            Ok(RecordData::SRV {
                                priority,
                                weight,
                                port,
                                target,
                            })
                        }
                        _ => Err(ValueError::InvalidSrv(value.to_string())),
                    }
                } else {
                    Err(ValueError::InvalidSrv(value.to_string()))
                }
            }
            RecordType::Unknown(_) => Err(ValueError::UnsupportedType(rtype)),
        }
    }
}

impl fmt::Display for RecordData {
    /// The textual form, inverse of `parse`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordData::A { address } => write!(f, "{address}"),
            RecordData::AAAA { address } => write!(f, "{address}"),
            RecordData::CNAME { cname } => write!(f, "{cname}"),
            RecordData::NS { nsdname } => write!(f, "{nsdname}"),
            RecordData::MX {
                preference,
                exchange,
            } => write!(f, "{preference} {exchange}"),
            RecordData::TXT { text } => write!(f, "{text}"),
            RecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{priority} {weight} {port} {target}"),
        }
    }
}

/// Errors encountered when parsing the textual form of a record
/// value.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ValueError {
    InvalidIpv4(String),
    InvalidIpv6(String),
    InvalidDomain(String),
    InvalidMx(String),
    InvalidSrv(String),
    TxtTooLong(usize),
    UnsupportedType(RecordType),
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValueError::InvalidIpv4(s) => write!(f, "'{s}' is not an IPv4 address"),
            ValueError::InvalidIpv6(s) => write!(f, "'{s}' is not an IPv6 address"),
            ValueError::InvalidDomain(s) => write!(f, "'{s}' is not a domain name"),
            ValueError::InvalidMx(s) => {
                write!(f, "'{s}' is not of the form '<preference> <exchange>'")
            }
            ValueError::InvalidSrv(s) => {
                write!(f, "'{s}' is not of the form '<priority> <weight> <port> <target>'")
            }
            ValueError::TxtTooLong(len) => {
                write!(f, "TXT value is {len} octets, the maximum is 255")
            }
            ValueError::UnsupportedType(rtype) => write!(f, "'{rtype}' records cannot be stored"),
        }
    }
}

impl std::error::Error for ValueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for DomainName {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let num_labels = u.int_in_range::<usize>(1..=4)?;
        let mut labels = Vec::with_capacity(num_labels);
        for _ in 0..num_labels {
            let label_len = u.int_in_range::<usize>(1..=12)?;
            let mut label = Vec::with_capacity(label_len);
            for _ in 0..label_len {
                label.push(u.int_in_range::<u8>(0..=25)? + b'a');
            }
            labels.push(label);
        }
        Ok(Self::from_labels(labels).unwrap())
    }
}

#[cfg(any(feature = "test-util", test))]
impl<'a> arbitrary::Arbitrary<'a> for RecordData {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(match u.int_in_range(0..=6)? {
            0 => RecordData::A {
                address: Ipv4Addr::from(u.arbitrary::<u32>()?),
            },
            1 => RecordData::AAAA {
                address: Ipv6Addr::from(u.arbitrary::<u128>()?),
            },
            2 => RecordData::CNAME {
                cname: u.arbitrary()?,
            },
            3 => RecordData::NS {
                nsdname: u.arbitrary()?,
            },
            4 => RecordData::MX {
                preference: u.arbitrary()?,
                exchange: u.arbitrary()?,
            },
            5 => RecordData::TXT {
                text: "x".repeat(u.int_in_range(1..=32)?),
            },
            _ => RecordData::SRV {
                priority: u.arbitrary()?,
                weight: u.arbitrary()?,
                port: u.arbitrary()?,
                target: u.arbitrary()?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use fake::Fake;

    use super::test_util::*;
    use super::*;

    #[test]
    fn u8_opcode_roundtrip() {
        for i in 0..15 {
            assert_eq!(u8::from(Opcode::from(i)), i);
        }
    }

    #[test]
    fn u8_rcode_roundtrip() {
        for i in 0..15 {
            assert_eq!(u8::from(Rcode::from(i)), i);
        }
    }

    #[test]
    fn u16_recordtype_roundtrip() {
        for i in 0..100 {
            assert_eq!(u16::from(RecordType::from(i)), i);
        }
    }

    #[test]
    fn u16_recordclass_roundtrip() {
        for i in 0..100 {
            assert_eq!(u16::from(RecordClass::from(i)), i);
        }
    }

    #[test]
    fn recordtype_mnemonic_roundtrip() {
        for rtype in [
            RecordType::A,
            RecordType::NS,
            RecordType::CNAME,
            RecordType::MX,
            RecordType::TXT,
            RecordType::AAAA,
            RecordType::SRV,
        ] {
            assert_eq!(
                Some(rtype),
                RecordType::from_mnemonic(&rtype.to_string())
            );
            assert_eq!(
                Some(rtype),
                RecordType::from_mnemonic(&rtype.to_string().to_ascii_lowercase())
            );
        }

        assert_eq!(None, RecordType::from_mnemonic("TYPE33"));
        assert_eq!(None, RecordType::from_mnemonic("PTR"));
    }

    #[test]
    fn unknown_recordtype_displays_numerically() {
        assert_eq!("TYPE99", RecordType::from(99).to_string());
    }

    #[test]
    fn domainname_lowercases() {
        assert_eq!(
            domain("mail.example.com"),
            DomainName::from_dotted_string("MAIL.Example.COM").unwrap()
        );
    }

    #[test]
    fn domainname_trailing_dot_is_optional() {
        assert_eq!(
            DomainName::from_dotted_string("example.com"),
            DomainName::from_dotted_string("example.com.")
        );
    }

    #[test]
    fn domainname_rejects_bad_labels() {
        assert_eq!(None, DomainName::from_dotted_string(""));
        assert_eq!(None, DomainName::from_dotted_string("a..b"));
        assert_eq!(
            None,
            DomainName::from_dotted_string(&format!("{}.com", "x".repeat(64)))
        );
    }

    #[test]
    fn domainname_rejects_long_names() {
        let long = vec!["x".repeat(63); 4].join(".");
        assert_eq!(None, DomainName::from_dotted_string(&long));
    }

    #[test]
    fn domainname_wire_octets() {
        assert_eq!(
            vec![3, b'w', b'w', b'w', 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0],
            domain("www.example.com").octets
        );
    }

    #[test]
    fn domainname_dotted_string_roundtrip() {
        for _ in 0..100 {
            let labels_len = (1..5).fake::<usize>();

            let mut dotted = String::new();
            for i in 0..labels_len {
                if i > 0 {
                    dotted.push('.');
                }
                let label_len = (1..10).fake::<usize>();
                for _ in 0..label_len {
                    dotted.push((b'a' + (0..26).fake::<u8>()) as char);
                }
            }

            assert_eq!(
                Some(dotted.clone()),
                DomainName::from_dotted_string(&dotted).map(|d| d.to_dotted_string())
            );
        }
    }

    #[test]
    fn recorddata_parse_display_roundtrip() {
        for (rtype, text) in [
            (RecordType::A, "93.184.216.34"),
            (RecordType::AAAA, "2606:2800:220:1::1946"),
            (RecordType::CNAME, "alias.example.com"),
            (RecordType::NS, "ns1.example.com"),
            (RecordType::MX, "10 smtp.example.com"),
            (RecordType::TXT, "v=spf1 -all"),
            (RecordType::SRV, "0 5 5060 sip.example.com"),
        ] {
            let data = RecordData::parse(rtype, text).unwrap();
            assert_eq!(rtype, data.rtype());
            assert_eq!(text, data.to_string());
        }
    }

    #[test]
    fn recorddata_parse_rejects_garbage() {
        assert_eq!(
            Err(ValueError::InvalidIpv4("1.2.3.4.5".to_string())),
            RecordData::parse(RecordType::A, "1.2.3.4.5")
        );
        assert_eq!(
            Err(ValueError::InvalidMx("smtp.example.com".to_string())),
            RecordData::parse(RecordType::MX, "smtp.example.com")
        );
        assert_eq!(
            Err(ValueError::InvalidSrv("0 5 sip.example.com".to_string())),
            RecordData::parse(RecordType::SRV, "0 5 sip.example.com")
        );
        assert_eq!(
            Err(ValueError::TxtTooLong(300)),
            RecordData::parse(RecordType::TXT, &"x".repeat(300))
        );
        assert_eq!(
            Err(ValueError::UnsupportedType(RecordType::from(33333))),
            RecordData::parse(RecordType::from(33333), "whatever")
        );
    }
}

#[cfg(any(feature = "test-util", test))]
pub mod test_util {
    use super::*;

    pub fn domain(name: &str) -> DomainName {
        DomainName::from_dotted_string(name).unwrap()
    }

    pub fn a_data(address: &str) -> RecordData {
        RecordData::parse(RecordType::A, address).unwrap()
    }

    pub fn cname_data(target: &str) -> RecordData {
        RecordData::CNAME {
            cname: domain(target),
        }
    }

    pub fn mx_data(preference: u16, exchange: &str) -> RecordData {
        RecordData::MX {
            preference,
            exchange: domain(exchange),
        }
    }

    /// A standard recursion-desired query datagram, with the name's
    /// label casing preserved.
    pub fn query_bytes(id: u16, name: &str, qtype: RecordType, qclass: RecordClass) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(&[HEADER_MASK_RD, 0x00]);
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        for label in name.split('.') {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
        out.extend_from_slice(&u16::from(qtype).to_be_bytes());
        out.extend_from_slice(&u16::from(qclass).to_be_bytes());
        out
    }
}
