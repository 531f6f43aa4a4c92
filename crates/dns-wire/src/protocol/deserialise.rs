//! Deserialisation of DNS queries from the network.  See the `types`
//! module for details of the format.
//!
//! This is a query decoder, not a general message decoder: the
//! question section must hold exactly one entry, and compression
//! pointers (which real queries do not contain) are rejected rather
//! than followed.

use crate::protocol::types::*;

impl Query {
    /// Decode a query datagram.
    ///
    /// # Errors
    ///
    /// If the packet cannot be parsed.  Every error other than
    /// `CompletelyBusted` carries the transaction id, so a format
    /// error response can be sent.
    pub fn parse(octets: &[u8]) -> Result<Self, Error> {
        let mut buffer = ConsumableBuffer::new(octets);

        let id = buffer.next_u16().ok_or(Error::CompletelyBusted)?;
        let flags1 = buffer.next_u8().ok_or(Error::HeaderTooShort(id))?;
        let flags2 = buffer.next_u8().ok_or(Error::HeaderTooShort(id))?;
        let qdcount = buffer.next_u16().ok_or(Error::HeaderTooShort(id))?;
        let _ancount = buffer.next_u16().ok_or(Error::HeaderTooShort(id))?;
        let _nscount = buffer.next_u16().ok_or(Error::HeaderTooShort(id))?;
        let _arcount = buffer.next_u16().ok_or(Error::HeaderTooShort(id))?;

        let header = Header {
            id,
            is_response: flags1 & HEADER_MASK_QR != 0,
            opcode: Opcode::from((flags1 & HEADER_MASK_OPCODE) >> HEADER_OFFSET_OPCODE),
            is_authoritative: flags1 & HEADER_MASK_AA != 0,
            is_truncated: flags1 & HEADER_MASK_TC != 0,
            recursion_desired: flags1 & HEADER_MASK_RD != 0,
            recursion_available: flags2 & HEADER_MASK_RA != 0,
            rcode: Rcode::from(flags2 & HEADER_MASK_RCODE),
        };

        if qdcount != 1 {
            return Err(Error::UnsupportedQuestionCount { id, qdcount });
        }

        let mut octets = Vec::<u8>::with_capacity(DOMAINNAME_MAX_LEN);
        let mut labels = Vec::<Vec<u8>>::with_capacity(5);

        loop {
            let size = buffer.next_u8().ok_or(Error::QuestionTooShort(id))?;

            if size == 0 {
                octets.push(0);
                break;
            } else if usize::from(size) <= LABEL_MAX_LEN {
                octets.push(size);

                let Some(os) = buffer.take(size as usize) else {
                    return Err(Error::QuestionTooShort(id));
                };

                let mut label = Vec::<u8>::with_capacity(os.len());
                for o in os {
                    let o = o.to_ascii_lowercase();
                    label.push(o);
                    octets.push(o);
                }
                labels.push(label);

                if octets.len() >= DOMAINNAME_MAX_LEN {
                    return Err(Error::NameTooLong(id));
                }
            } else if size >= 192 {
                return Err(Error::CompressedQuestion(id));
            } else {
                return Err(Error::LabelTooLong(id));
            }
        }

        let name = DomainName { octets, labels };

        let qtype = RecordType::from(buffer.next_u16().ok_or(Error::QuestionTooShort(id))?);
        let qclass = RecordClass::from(buffer.next_u16().ok_or(Error::QuestionTooShort(id))?);

        Ok(Self {
            header,
            name,
            qtype,
            qclass,
            question_len: buffer.position - 12,
        })
    }
}

/// Errors encountered when parsing a datagram.  In all the errors
/// which have a `u16` parameter, that is the ID from the header - so
/// that an error response can be sent.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Error {
    /// The datagram is not even 2 octets long, so it doesn't even
    /// contain a valid ID.  An error cannot be sent back to the
    /// client in this case as, without an ID, it cannot be linked
    /// with the correct query.
    CompletelyBusted,

    /// The header is missing one or more required fields.
    HeaderTooShort(u16),

    /// The question count is not exactly one.
    UnsupportedQuestionCount { id: u16, qdcount: u16 },

    /// The question ends before the name terminator, or with an
    /// incomplete type or class field.
    QuestionTooShort(u16),

    /// A label length octet is over 63 but is not a pointer.
    LabelTooLong(u16),

    /// The name contains a compression pointer, which queries should
    /// never need.
    CompressedQuestion(u16),

    /// The name is over 255 octets in wire form.
    NameTooLong(u16),
}

impl Error {
    pub fn id(self) -> Option<u16> {
        match self {
            Error::CompletelyBusted => None,
            Error::HeaderTooShort(id) => Some(id),
            Error::UnsupportedQuestionCount { id, .. } => Some(id),
            Error::QuestionTooShort(id) => Some(id),
            Error::LabelTooLong(id) => Some(id),
            Error::CompressedQuestion(id) => Some(id),
            Error::NameTooLong(id) => Some(id),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::CompletelyBusted => write!(f, "packet too short to hold an id"),
            Error::HeaderTooShort(_) => write!(f, "header too short"),
            Error::UnsupportedQuestionCount { qdcount, .. } => {
                write!(f, "expected exactly 1 question, got {qdcount}")
            }
            Error::QuestionTooShort(_) => write!(f, "question too short"),
            Error::LabelTooLong(_) => write!(f, "label over 63 octets"),
            Error::CompressedQuestion(_) => write!(f, "compression pointer in question"),
            Error::NameTooLong(_) => write!(f, "name over 255 octets"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// A buffer which will be consumed by the parsing process.
pub struct ConsumableBuffer<'a> {
    octets: &'a [u8],
    pub position: usize,
}

impl<'a> ConsumableBuffer<'a> {
    pub fn new(octets: &'a [u8]) -> Self {
        Self {
            octets,
            position: 0,
        }
    }

    pub fn next_u8(&mut self) -> Option<u8> {
        if self.octets.len() > self.position {
            let a = self.octets[self.position];
            self.position += 1;
            Some(a)
        } else {
            None
        }
    }

    pub fn next_u16(&mut self) -> Option<u16> {
        if self.octets.len() > self.position + 1 {
            let a = self.octets[self.position];
            let b = self.octets[self.position + 1];
            self.position += 2;
            Some(u16::from_be_bytes([a, b]))
        } else {
            None
        }
    }

    pub fn take(&mut self, size: usize) -> Option<&'a [u8]> {
        if self.octets.len() >= self.position + size {
            let slice = &self.octets[self.position..self.position + size];
            self.position += size;
            Some(slice)
        } else {
            None
        }
    }
}
