/// Advertising data (AD structure) parsing.
///
/// AD structure format: [length] [type] [data...], where `length` covers the
/// type byte and the data. Only the walk and 128-bit service UUID lookup
/// live here; the locator uses them to decide which advertisers to sync to.

/// Incomplete list of 128-bit service UUIDs
pub const AD_TYPE_UUID128_INCOMPLETE: u8 = 0x06;
/// Complete list of 128-bit service UUIDs
pub const AD_TYPE_UUID128_COMPLETE: u8 = 0x07;

/// Length of a 128-bit UUID in bytes.
pub const UUID128_LEN: usize = 16;

/// One AD structure borrowed from an advertising payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdStructure<'a> {
    pub ad_type: u8,
    pub data: &'a [u8],
}

/// Iterator over the AD structures of an advertising payload.
///
/// A zero length byte is skipped. A structure running past the end of the
/// buffer ends the iteration; the malformed tail is ignored.
pub struct AdStructures<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> AdStructures<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload, pos: 0 }
    }
}

impl<'a> Iterator for AdStructures<'a> {
    type Item = AdStructure<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut len = *self.payload.get(self.pos)? as usize;
        while len == 0 {
            self.pos += 1;
            len = *self.payload.get(self.pos)? as usize;
        }
        if self.pos + 1 + len > self.payload.len() {
            self.pos = self.payload.len();
            return None;
        }

        let ad_type = self.payload[self.pos + 1];
        let data = &self.payload[self.pos + 2..self.pos + 1 + len];
        self.pos += 1 + len;

        Some(AdStructure { ad_type, data })
    }
}

/// Whether `payload` lists `uuid` in an incomplete or complete 128-bit
/// service UUID field.
///
/// `uuid` is compared byte-for-byte in over-the-air order. A trailing
/// partial UUID in a field is ignored.
pub fn contains_service(payload: &[u8], uuid: &[u8; UUID128_LEN]) -> bool {
    AdStructures::new(payload)
        .filter(|ad| {
            ad.ad_type == AD_TYPE_UUID128_INCOMPLETE || ad.ad_type == AD_TYPE_UUID128_COMPLETE
        })
        .any(|ad| {
            ad.data
                .chunks_exact(UUID128_LEN)
                .any(|candidate| candidate == uuid.as_slice())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CTE_SERVICE_UUID;

    const OTHER_UUID: [u8; 16] = [
        0xfb, 0x34, 0x9b, 0x5f, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x31, 0x00,
        0x00,
    ];

    fn push_field(buf: &mut std::vec::Vec<u8>, ad_type: u8, body: &[u8]) {
        buf.push(body.len() as u8 + 1);
        buf.push(ad_type);
        buf.extend_from_slice(body);
    }

    fn flags_field(buf: &mut std::vec::Vec<u8>) {
        push_field(buf, 0x01, &[0x06]);
    }

    // ── AD structure walk ───────────────────────────────────────────

    #[test]
    fn walks_all_structures() {
        let mut payload = std::vec::Vec::new();
        flags_field(&mut payload);
        push_field(&mut payload, 0x09, b"tag");
        push_field(&mut payload, 0xFF, &[0xC8, 0x09]);

        let types: std::vec::Vec<u8> = AdStructures::new(&payload).map(|ad| ad.ad_type).collect();
        assert_eq!(types, [0x01, 0x09, 0xFF]);

        let name = AdStructures::new(&payload).nth(1).unwrap();
        assert_eq!(name.data, b"tag");
    }

    #[test]
    fn zero_length_byte_is_skipped() {
        let payload = [0x02, 0x01, 0x06, 0x00, 0x03, 0x09, b'a', b'b'];
        let types: std::vec::Vec<u8> = AdStructures::new(&payload).map(|ad| ad.ad_type).collect();
        assert_eq!(types, [0x01, 0x09]);
    }

    #[test]
    fn trailing_zero_padding_ends_walk() {
        let payload = [0x02, 0x01, 0x06, 0x00, 0x00, 0x00];
        assert_eq!(AdStructures::new(&payload).count(), 1);
    }

    #[test]
    fn overrunning_structure_terminates_walk() {
        // Second structure claims 10 bytes but only 2 remain
        let payload = [0x02, 0x01, 0x06, 0x0A, 0x09, b'a'];
        let all: std::vec::Vec<_> = AdStructures::new(&payload).collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].ad_type, 0x01);
    }

    #[test]
    fn type_only_structure_has_empty_body() {
        let payload = [0x01, 0x07];
        let ad = AdStructures::new(&payload).next().unwrap();
        assert_eq!(ad.ad_type, AD_TYPE_UUID128_COMPLETE);
        assert!(ad.data.is_empty());
    }

    // ── contains_service ────────────────────────────────────────────

    #[test]
    fn finds_uuid_in_complete_list() {
        let mut payload = std::vec::Vec::new();
        flags_field(&mut payload);
        push_field(&mut payload, AD_TYPE_UUID128_COMPLETE, &CTE_SERVICE_UUID);
        assert!(contains_service(&payload, &CTE_SERVICE_UUID));
    }

    #[test]
    fn finds_uuid_in_incomplete_list() {
        let mut payload = std::vec::Vec::new();
        push_field(&mut payload, AD_TYPE_UUID128_INCOMPLETE, &CTE_SERVICE_UUID);
        assert!(contains_service(&payload, &CTE_SERVICE_UUID));
    }

    #[test]
    fn finds_uuid_at_second_stride() {
        let mut body = std::vec::Vec::new();
        body.extend_from_slice(&OTHER_UUID);
        body.extend_from_slice(&CTE_SERVICE_UUID);
        let mut payload = std::vec::Vec::new();
        push_field(&mut payload, AD_TYPE_UUID128_COMPLETE, &body);
        assert!(contains_service(&payload, &CTE_SERVICE_UUID));
    }

    #[test]
    fn uuid_must_be_stride_aligned() {
        let mut body = std::vec::Vec::new();
        body.extend_from_slice(&[0xAA; 8]);
        body.extend_from_slice(&CTE_SERVICE_UUID);
        body.extend_from_slice(&[0xAA; 8]);
        let mut payload = std::vec::Vec::new();
        push_field(&mut payload, AD_TYPE_UUID128_COMPLETE, &body);
        assert!(!contains_service(&payload, &CTE_SERVICE_UUID));
    }

    #[test]
    fn uuid_in_other_field_type_does_not_match() {
        let mut payload = std::vec::Vec::new();
        // Service data, not a UUID list
        push_field(&mut payload, 0x21, &CTE_SERVICE_UUID);
        assert!(!contains_service(&payload, &CTE_SERVICE_UUID));
    }

    #[test]
    fn different_uuid_does_not_match() {
        let mut payload = std::vec::Vec::new();
        push_field(&mut payload, AD_TYPE_UUID128_COMPLETE, &OTHER_UUID);
        assert!(!contains_service(&payload, &CTE_SERVICE_UUID));
    }

    #[test]
    fn empty_payload_does_not_match() {
        assert!(!contains_service(&[], &CTE_SERVICE_UUID));
    }

    #[test]
    fn truncated_uuid_field_does_not_match() {
        let mut payload = std::vec::Vec::new();
        push_field(&mut payload, AD_TYPE_UUID128_COMPLETE, &CTE_SERVICE_UUID);
        payload.truncate(payload.len() - 4);
        assert!(!contains_service(&payload, &CTE_SERVICE_UUID));
    }

    #[test]
    fn partial_trailing_stride_is_ignored() {
        let mut payload = std::vec::Vec::new();
        push_field(&mut payload, AD_TYPE_UUID128_COMPLETE, &CTE_SERVICE_UUID[..12]);
        assert!(!contains_service(&payload, &CTE_SERVICE_UUID));
    }

    #[test]
    fn finds_uuid_after_zero_length_byte() {
        let mut payload = std::vec::Vec::from([0x00]);
        push_field(&mut payload, AD_TYPE_UUID128_COMPLETE, &CTE_SERVICE_UUID);
        assert!(contains_service(&payload, &CTE_SERVICE_UUID));
    }

    #[test]
    fn match_before_malformed_tail_still_counts() {
        let mut payload = std::vec::Vec::new();
        push_field(&mut payload, AD_TYPE_UUID128_COMPLETE, &CTE_SERVICE_UUID);
        payload.extend_from_slice(&[0x1F, 0x09]);
        assert!(contains_service(&payload, &CTE_SERVICE_UUID));
    }
}
