use encoding_rs::{BIG5, Encoding, GB18030, GBK, UTF_8};

/// UTF-8 with a leading byte-order mark. Decoding strips the BOM; any
/// re-encode emits plain UTF-8 so that per-segment encodes never grow a
/// BOM of their own.
pub const UTF_8_SIG: &str = "utf-8-sig";

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Detection sample size. Encoding is a file-wide property; decoding a
/// prefix is enough and keeps multi-megabyte adds fast.
const SAMPLE_LEN: usize = 32 * 1024;

/// Candidates in priority order. UTF-8 first so that valid UTF-8 text is
/// never claimed by a legacy encoding; the legacy Chinese encodings are
/// generous decoders and must come after.
const CANDIDATES: [(&str, &Encoding); 4] = [
    ("utf-8", UTF_8),
    ("gb18030", GB18030),
    ("gbk", GBK),
    ("big5", BIG5),
];

/// Guess the encoding of a raw byte stream.
///
/// Returns one of `utf-8-sig`, `utf-8`, `gb18030`, `gbk`, `big5`. Never
/// fails: when nothing decodes the prefix cleanly the answer is `utf-8`
/// and actual decoding later replaces invalid sequences.
pub fn detect(raw: &[u8]) -> &'static str {
    if raw.starts_with(UTF8_BOM) {
        return UTF_8_SIG;
    }
    let sample = &raw[..raw.len().min(SAMPLE_LEN)];
    for (name, encoding) in CANDIDATES {
        let (_, had_errors) = encoding.decode_without_bom_handling(sample);
        if !had_errors {
            return name;
        }
    }
    "utf-8"
}

/// Map a stored encoding name back to an `encoding_rs` encoding.
/// Unknown names fall back to UTF-8 rather than failing.
pub fn encoding_for(name: &str) -> &'static Encoding {
    match name {
        UTF_8_SIG | "utf-8" => UTF_8,
        "gb18030" => GB18030,
        "gbk" => GBK,
        "big5" => BIG5,
        other => Encoding::for_label(other.as_bytes()).unwrap_or(UTF_8),
    }
}

/// Decode bytes under a stored encoding name, replacing invalid
/// sequences. For `utf-8-sig` the BOM is stripped.
pub fn decode_lossy(name: &str, bytes: &[u8]) -> String {
    let encoding = encoding_for(name);
    if name == UTF_8_SIG {
        let (text, _, _) = encoding.decode(bytes);
        text.into_owned()
    } else {
        let (text, _) = encoding.decode_without_bom_handling(bytes);
        text.into_owned()
    }
}

/// Encode text under a stored encoding name. `utf-8-sig` encodes as
/// plain UTF-8 without a BOM, which keeps incremental byte-offset
/// arithmetic honest.
pub fn encode(name: &str, text: &str) -> Vec<u8> {
    let encoding = encoding_for(name);
    let (bytes, _, _) = encoding.encode(text);
    bytes.into_owned()
}
