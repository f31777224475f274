//! Scenario 3 (spec §8): multi-multiplicity list sizing with one large list
//! and one small list sharing a chunk.

use colgraph::lists::{build_headers, build_page_metadata, locate, ListHeader};

#[test]
fn one_large_list_and_one_small_list_classify_and_place_correctly() {
    let elements_per_page = 2048;
    let sizes = vec![4096u64, 1u64];

    let headers = build_headers(&sizes, elements_per_page);
    assert_eq!(headers.len(), 2);

    let h0 = ListHeader::decode(headers[0]);
    assert_eq!(h0, ListHeader::Large { idx: 0 });
    let h1 = ListHeader::decode(headers[1]);
    assert_eq!(h1, ListHeader::Small { csr_offset: 0, size: 1 });

    let meta = build_page_metadata(&sizes, &headers, elements_per_page);
    assert_eq!(meta.large_lists_pages_map.len(), 1);
    assert_eq!(meta.large_lists_pages_map[0][0], 4096);
    assert_eq!(meta.large_lists_pages_map[0][1..].len(), 2);
    assert_eq!(meta.chunks_pages_map[0].len(), 1);
    assert_eq!(meta.num_pages, 3);

    // locate() must resolve every position of the large list across its two
    // physical pages without straddling.
    let (p_first, off_first) = locate(headers[0], 0, 0, elements_per_page, 2, &meta);
    let (p_last, off_last) = locate(headers[0], 4095, 0, elements_per_page, 2, &meta);
    assert_eq!(p_first, meta.large_lists_pages_map[0][1]);
    assert_eq!(off_first, 0);
    assert_eq!(p_last, meta.large_lists_pages_map[0][2]);
    assert_eq!(off_last, (4095 % elements_per_page) * 2);

    let (p_small, off_small) = locate(headers[1], 0, 1, elements_per_page, 2, &meta);
    assert_eq!(p_small, meta.chunks_pages_map[0][0]);
    assert_eq!(off_small, 0);
}
