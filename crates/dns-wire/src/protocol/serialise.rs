//! Serialisation of DNS responses to the wire format.  See the
//! `types` module for details of the format.

use crate::protocol::types::*;

/// The largest datagram this server will send.
pub const MAX_RESPONSE_LEN: usize = 512;

/// Where the question section starts, and therefore where every
/// answer's name pointer aims.
const QUESTION_OFFSET: u8 = 12;

/// An encoded response datagram.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EncodedResponse {
    pub octets: Vec<u8>,

    /// Whether answers were dropped to fit the wire limit (in which
    /// case the TC flag is set in `octets` too).
    pub truncated: bool,

    /// How many answers made it into the datagram.
    pub answer_count: u16,
}

/// Build a response.
///
/// The question is spliced in verbatim from the request bytes, so the
/// client sees its own label casing back, and each answer names the
/// question through a compression pointer to offset 12.  The answer
/// name always equals the question name in this server, so this gets
/// the common-case compression win without a label-offset table and
/// keeps the encoder single-pass.
///
/// Every value in `answers` becomes one resource record, in order.
/// Records which would push the datagram past 512 octets are dropped
/// at the last complete record boundary and the TC flag is set.
pub fn encode_response(
    header: Header,
    question: &[u8],
    answers: &[RecordData],
    ttl: u32,
) -> EncodedResponse {
    let mut buffer = WritableBuffer::default();

    header.serialise(&mut buffer);
    buffer.write_u16(u16::from(!question.is_empty()));
    // ANCOUNT, patched once the answers are in
    buffer.write_u16(0);
    buffer.write_u16(0);
    buffer.write_u16(0);
    buffer.write_octets(question);

    let mut answer_count: u16 = 0;
    let mut truncated = false;
    for data in answers {
        let mark = buffer.index();
        write_answer(&mut buffer, data, ttl);
        if buffer.index() > MAX_RESPONSE_LEN {
            buffer.octets.truncate(mark);
            truncated = true;
            break;
        }
        answer_count += 1;
    }

    let [hi, lo] = answer_count.to_be_bytes();
    buffer.octets[6] = hi;
    buffer.octets[7] = lo;
    if truncated {
        buffer.octets[2] |= HEADER_MASK_TC;
    }

    EncodedResponse {
        octets: buffer.octets,
        truncated,
        answer_count,
    }
}

/// A response carrying no answers, only an rcode: NXDOMAIN, NOTIMP,
/// REFUSED, and format errors.
pub fn encode_error_response(header: Header, question: &[u8]) -> Vec<u8> {
    encode_response(header, question, &[], 0).octets
}

impl Header {
    pub fn serialise(self, buffer: &mut WritableBuffer) {
        // octet 1
        let flag_qr = if self.is_response { HEADER_MASK_QR } else { 0 };
        let field_opcode = HEADER_MASK_OPCODE & (u8::from(self.opcode) << HEADER_OFFSET_OPCODE);
        let flag_aa = if self.is_authoritative {
            HEADER_MASK_AA
        } else {
            0
        };
        let flag_tc = if self.is_truncated { HEADER_MASK_TC } else { 0 };
        let flag_rd = if self.recursion_desired {
            HEADER_MASK_RD
        } else {
            0
        };
        // octet 2
        let flag_ra = if self.recursion_available {
            HEADER_MASK_RA
        } else {
            0
        };
        let field_rcode = HEADER_MASK_RCODE & u8::from(self.rcode);

        buffer.write_u16(self.id);
        buffer.write_u8(flag_qr | field_opcode | flag_aa | flag_tc | flag_rd);
        buffer.write_u8(flag_ra | field_rcode);
    }
}

/// One resource record: the name pointer, TYPE, CLASS, TTL, RDLENGTH,
/// and the type-specific RDATA.  Names inside RDATA are written in
/// full label form, not compressed.
fn write_answer(buffer: &mut WritableBuffer, data: &RecordData, ttl: u32) {
    buffer.write_u8(0xC0);
    buffer.write_u8(QUESTION_OFFSET);
    buffer.write_u16(u16::from(data.rtype()));
    buffer.write_u16(u16::from(RecordClass::IN));
    buffer.write_u32(ttl);

    // filled in below
    let rdlength_index = buffer.index();
    buffer.write_u16(0);

    match data {
        RecordData::A { address } => buffer.write_octets(&address.octets()),
        RecordData::AAAA { address } => buffer.write_octets(&address.octets()),
        RecordData::CNAME { cname } => buffer.write_octets(&cname.octets),
        RecordData::NS { nsdname } => buffer.write_octets(&nsdname.octets),
        RecordData::MX {
            preference,
            exchange,
        } => {
            buffer.write_u16(*preference);
            buffer.write_octets(&exchange.octets);
        }
        RecordData::TXT { text } => {
            // one character-string; ingest rejects values over 255
            buffer.write_u8(text.len() as u8);
            buffer.write_octets(text.as_bytes());
        }
        RecordData::SRV {
            priority,
            weight,
            port,
            target,
        } => {
            buffer.write_u16(*priority);
            buffer.write_u16(*weight);
            buffer.write_u16(*port);
            buffer.write_octets(&target.octets);
        }
    }

    // -2 so we don't also include the 2 octets for the rdlength
    let rdlength = (buffer.index() - rdlength_index - 2) as u16;
    let [hi, lo] = rdlength.to_be_bytes();
    buffer.octets[rdlength_index] = hi;
    buffer.octets[rdlength_index + 1] = lo;
}

/// A buffer which can be written to, for serialisation purposes.
pub struct WritableBuffer {
    pub octets: Vec<u8>,
}

impl Default for WritableBuffer {
    fn default() -> Self {
        Self {
            octets: Vec::with_capacity(MAX_RESPONSE_LEN),
        }
    }
}

impl WritableBuffer {
    pub fn index(&self) -> usize {
        self.octets.len()
    }

    pub fn write_u8(&mut self, octet: u8) {
        self.octets.push(octet);
    }

    pub fn write_u16(&mut self, value: u16) {
        for octet in value.to_be_bytes() {
            self.octets.push(octet);
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        for octet in value.to_be_bytes() {
            self.octets.push(octet);
        }
    }

    pub fn write_octets(&mut self, octets: &[u8]) {
        for octet in octets {
            self.octets.push(*octet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::test_util::*;

    fn question_of(bytes: &[u8]) -> &[u8] {
        &bytes[12..]
    }

    #[test]
    #[rustfmt::skip]
    fn encode_a_answer() {
        let request = query_bytes(0x1234, "example.com", RecordType::A, RecordClass::IN);
        let query = Query::parse(&request).unwrap();

        let response = encode_response(
            query.header.response(Rcode::NoError),
            question_of(&request),
            &[a_data("93.184.216.34")],
            3600,
        );

        assert!(!response.truncated);
        assert_eq!(1, response.answer_count);
        assert_eq!(
            vec![
                // ID
                0x12, 0x34,
                // QR=1 AA=1 RD=1, everything else clear
                0b1000_0101, 0b0000_0000,
                // QDCOUNT, ANCOUNT, NSCOUNT, ARCOUNT
                0, 1, 0, 1, 0, 0, 0, 0,
                // question, echoed
                7, 101, 120, 97, 109, 112, 108, 101, // "example"
                3, 99, 111, 109, 0, // "com"
                0, 1, // A
                0, 1, // IN
                // answer
                0xC0, 0x0C, // pointer to the question
                0, 1, // A
                0, 1, // IN
                0, 0, 0x0E, 0x10, // TTL 3600
                0, 4, // RDLENGTH
                0x5D, 0xB8, 0xD8, 0x22, // 93.184.216.34
            ],
            response.octets,
        );
    }

    #[test]
    fn encode_echoes_question_casing() {
        let request = query_bytes(1, "WWW.Example.COM", RecordType::A, RecordClass::IN);
        let query = Query::parse(&request).unwrap();

        let response = encode_response(
            query.header.response(Rcode::NoError),
            question_of(&request),
            &[a_data("1.2.3.4")],
            300,
        );

        assert_eq!(question_of(&request), &response.octets[12..12 + query.question_len]);
    }

    #[test]
    #[rustfmt::skip]
    fn encode_mx_rdata() {
        let request = query_bytes(1, "mail.example.com", RecordType::MX, RecordClass::IN);
        let query = Query::parse(&request).unwrap();

        let response = encode_response(
            query.header.response(Rcode::NoError),
            question_of(&request),
            &[mx_data(10, "smtp.example.com")],
            3600,
        );

        let rdata_start = response.octets.len() - 20;
        assert_eq!(
            vec![
                0, 10, // preference
                4, 115, 109, 116, 112, // "smtp"
                7, 101, 120, 97, 109, 112, 108, 101, // "example"
                3, 99, 111, 109, 0, // "com"
            ],
            response.octets[rdata_start..].to_vec(),
        );
        // RDLENGTH covers the preference and the exchange
        assert_eq!(
            vec![0, 20],
            response.octets[rdata_start - 2..rdata_start].to_vec(),
        );
    }

    #[test]
    fn encode_txt_character_string() {
        let request = query_bytes(1, "example.com", RecordType::TXT, RecordClass::IN);
        let query = Query::parse(&request).unwrap();

        let response = encode_response(
            query.header.response(Rcode::NoError),
            question_of(&request),
            &[RecordData::parse(RecordType::TXT, "v=spf1 -all").unwrap()],
            3600,
        );

        let mut expected = vec![0, 12, 11];
        expected.extend_from_slice(b"v=spf1 -all");
        let rdata_start = response.octets.len() - expected.len();
        assert_eq!(expected, response.octets[rdata_start..].to_vec());
    }

    #[test]
    fn encode_srv_rdata() {
        let request = query_bytes(1, "_sip._udp.example.com", RecordType::SRV, RecordClass::IN);
        let query = Query::parse(&request).unwrap();

        let response = encode_response(
            query.header.response(Rcode::NoError),
            question_of(&request),
            &[RecordData::parse(RecordType::SRV, "0 5 5060 sip.example.com").unwrap()],
            3600,
        );

        let mut expected = vec![0, 0, 0, 5, 0x13, 0xC4];
        expected.extend_from_slice(&domain("sip.example.com").octets);
        let rdata_start = response.octets.len() - expected.len();
        assert_eq!(expected, response.octets[rdata_start..].to_vec());
    }

    #[test]
    fn encode_multiple_values_in_stored_order() {
        let request = query_bytes(1, "example.com", RecordType::A, RecordClass::IN);
        let query = Query::parse(&request).unwrap();

        let response = encode_response(
            query.header.response(Rcode::NoError),
            question_of(&request),
            &[a_data("1.1.1.1"), a_data("2.2.2.2"), a_data("3.3.3.3")],
            300,
        );

        assert_eq!(3, response.answer_count);
        assert_eq!(&[0, 3], &response.octets[6..8]);

        let rdatas: Vec<&[u8]> = response.octets[12 + query.question_len..]
            .chunks(16)
            .map(|rr| &rr[12..16])
            .collect();
        assert_eq!(
            vec![&[1, 1, 1, 1][..], &[2, 2, 2, 2][..], &[3, 3, 3, 3][..]],
            rdatas
        );
    }

    #[test]
    fn encode_truncates_at_record_boundary() {
        let request = query_bytes(1, "example.com", RecordType::TXT, RecordClass::IN);
        let query = Query::parse(&request).unwrap();

        let answers: Vec<RecordData> = (0..10)
            .map(|_| RecordData::parse(RecordType::TXT, &"x".repeat(100)).unwrap())
            .collect();

        let response = encode_response(
            query.header.response(Rcode::NoError),
            question_of(&request),
            &answers,
            300,
        );

        // header 12 + question 17 = 29, then 113 octets per answer: 4 fit
        assert!(response.truncated);
        assert_eq!(4, response.answer_count);
        assert_eq!(&[0, 4], &response.octets[6..8]);
        assert!(response.octets.len() <= MAX_RESPONSE_LEN);
        assert_ne!(0, response.octets[2] & HEADER_MASK_TC);
    }

    #[test]
    fn encode_arbitrary_answers_have_consistent_rdlength() {
        use arbitrary::{Arbitrary, Unstructured};
        use fake::{Fake, Faker};

        for _ in 0..100 {
            let mut noise = Vec::new();
            for _ in 0..256 {
                noise.push(Faker.fake());
            }
            let Ok(data) = RecordData::arbitrary(&mut Unstructured::new(&noise)) else {
                continue;
            };
            let rtype = data.rtype();

            let request = query_bytes(1, "example.com", rtype, RecordClass::IN);
            let query = Query::parse(&request).unwrap();
            let response = encode_response(
                query.header.response(Rcode::NoError),
                question_of(&request),
                &[data],
                300,
            );

            let answer = &response.octets[12 + query.question_len..];
            assert_eq!(&[0xC0, 0x0C], &answer[..2]);
            assert_eq!(
                u16::from(rtype),
                u16::from_be_bytes([answer[2], answer[3]])
            );
            let rdlength = u16::from_be_bytes([answer[10], answer[11]]) as usize;
            assert_eq!(answer.len(), 12 + rdlength);
        }
    }

    #[test]
    fn encode_nxdomain_echoes_question_with_no_answers() {
        let request = query_bytes(9, "missing.test", RecordType::A, RecordClass::IN);
        let query = Query::parse(&request).unwrap();

        let octets = encode_error_response(query.header.response(Rcode::NameError), question_of(&request));

        assert_eq!(3, octets[3] & HEADER_MASK_RCODE);
        assert_eq!(&[0, 1], &octets[4..6]);
        assert_eq!(&[0, 0], &octets[6..8]);
        assert_eq!(question_of(&request), &octets[12..]);
    }

    #[test]
    fn encode_format_error_has_no_question() {
        let octets = encode_error_response(Header::format_error(0xBEEF), &[]);

        assert_eq!(12, octets.len());
        assert_eq!(&[0xBE, 0xEF], &octets[0..2]);
        assert_ne!(0, octets[2] & HEADER_MASK_QR);
        assert_eq!(1, octets[3] & HEADER_MASK_RCODE);
        assert_eq!(&[0, 0], &octets[4..6]);
    }
}
