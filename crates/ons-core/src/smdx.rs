//! GSMA SGP.22 subject/reason code decoding.
//!
//! Profile-server failures arrive as a 24-bit value packing six 4-bit
//! sections: the high three sections are the SubjectCode (SGP.22
//! 5.2.6.1), the low three the ReasonCode (5.2.6.2). Each section is
//! rendered as its decimal value (a hex `B` section renders as `11`)
//! and leading zero sections are dropped, so sections `0,4,8` render
//! as `"4.8"` and `0,0,5` as `"5"`.

use ons_types::SmdxCode;

const NUM_SECTIONS: usize = 6;
const BITS_PER_SECTION: u32 = 4;
const SECTION_MASK: u32 = 0xF;

/// Subject "8.1.0" (eUICC), reason "4.8" (insufficient memory): the
/// eUICC has no space for this profile.
pub const SMDX_EUICC_INSUFFICIENT_MEMORY: (&str, &str) = ("8.1.0", "4.8");

/// Subject "8.8.5" (download order), reason "4.10" (time to live
/// expired): the download order has expired.
pub const SMDX_DOWNLOAD_ORDER_EXPIRED: (&str, &str) = ("8.8.5", "4.10");

/// Decode a packed vendor detail code into subject and reason codes.
pub fn decode_smdx(packed: u32) -> SmdxCode {
    let mut sections = [0u32; NUM_SECTIONS];
    let mut rest = packed;
    // Low section first; anything above the six sections is the
    // operation discriminator and is discarded.
    for section in sections.iter_mut() {
        *section = rest & SECTION_MASK;
        rest >>= BITS_PER_SECTION;
    }

    SmdxCode {
        subject: render_group(sections[5], sections[4], sections[3]),
        reason: render_group(sections[2], sections[1], sections[0]),
    }
}

/// Join three sections with dots, dropping leading zero sections
/// (`0.1.2` becomes `1.2`, `0.0.3` becomes `3`, `0.0.0` stays `0`).
fn render_group(a: u32, b: u32, c: u32) -> String {
    let mut code = format!("{a}.{b}.{c}");
    while let Some(rest) = code.strip_prefix("0.") {
        code = rest.to_string();
    }
    code
}
