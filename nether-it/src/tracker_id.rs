//! Originating-tracker identification
//!
//! Best-effort labelling from version fields and structural fingerprints.
//! Only used for display; playback never depends on it.

use chrono::{Days, NaiveDate};

use crate::parser::ItHeader;

/// Fingerprint inputs beyond the header itself
pub(crate) struct Fingerprint<'a> {
    pub header: &'a ItHeader,
    /// Save-history count after validation (0 when it ran past EOF)
    pub history: u16,
    /// "MODU" marker found after the header
    pub bero: bool,
    /// Tracker version stored in the first instrument, if any
    pub first_instrument_trkvers: Option<u16>,
}

/// Produce a label such as "Impulse Tracker 2.14" or "Schism Tracker 2012-01-01"
pub(crate) fn identify(fp: &Fingerprint<'_>) -> String {
    let h = fp.header;
    let family = h.cwtv >> 12;

    if fp.bero {
        return "BeroTracker".to_string();
    }
    if family == 1 {
        return format!("Schism Tracker {}", schism_version(h.cwtv));
    }

    // Newer IT versions put something in `reserved`; exclude lookalikes early
    let it_with_history = family == 0 && fp.history != 0 && h.reserved != 0;

    let label = if it_with_history {
        None
    } else if is_openspc(h) {
        Some("OpenSPC conversion".to_string())
    } else if family == 5 && h.cmwt == 0x0214 {
        Some(format!(
            "OpenMPT {}.{:02x}",
            (h.cwtv & 0xf00) >> 8,
            h.cwtv & 0xff
        ))
    } else if h.cwtv == 0x0888 && h.cmwt == 0x0888 && h.reserved == 0 && h.ordnum == 256 {
        Some("OpenMPT 1.17.02.*".to_string())
    } else if h.cwtv == 0x0217 && h.cmwt == 0x0200 && h.reserved == 0 {
        // OpenMPT writes trkvers 0x0220; MPT 1.16 writes 0xff pans for unused channels.
        // All 64 channels in use gives a false positive here.
        let ompt = fp.first_instrument_trkvers == Some(0x0220) || !h.chan_pan.contains(&0xff);
        Some(if ompt {
            "OpenMPT (compatibility mode)".to_string()
        } else {
            "Modplug Tracker 1.09 - 1.16".to_string()
        })
    } else if h.cwtv == 0x0214 && h.cmwt == 0x0200 && h.reserved == 0 {
        Some("Modplug Tracker 1.00a5".to_string())
    } else if h.cwtv == 0x0214 && h.cmwt == 0x0202 && h.reserved == 0 {
        Some("Modplug Tracker b3.3 - 1.07".to_string())
    } else if h.cwtv == 0x0214 && h.cmwt == 0x0214 && h.reserved == 0x4942_4843 {
        Some("ChibiTracker".to_string())
    } else if h.cwtv == 0x0214 && h.cmwt == 0x0214 && h.special & 3 == 0 && h.reserved == 0 {
        Some("CheeseTracker?".to_string())
    } else if family == 0 {
        None
    } else {
        Some("Unknown tracker".to_string())
    };

    label.unwrap_or_else(|| impulse_tracker_label(h))
}

fn is_openspc(h: &ItHeader) -> bool {
    h.cwtv == 0x0214
        && h.cmwt == 0x0200
        && h.flags == 9
        && h.special == 0
        && h.highlight_major == 0
        && h.highlight_minor == 0
        && h.insnum == 0
        && h.patnum + 1 == h.ordnum
        && h.gv == 128
        && h.mv == 100
        && h.is == 1
        && h.sep == 128
        && h.pwd == 0
        && h.msg_length == 0
        && h.msg_offset == 0
        && h.reserved == 0
}

/// Catch-all for genuine (or unidentified IT-family) files
fn impulse_tracker_label(h: &ItHeader) -> String {
    let mut cwtv = h.cwtv;
    if h.cmwt > 0x0214 {
        cwtv = 0x0215;
    } else if cwtv > 0x0214 {
        // Patched 2.14 releases (0x0215..0x0217 are p1..p3)
        return format!("Impulse Tracker 2.14p{}", cwtv - 0x0214);
    }
    format!(
        "Impulse Tracker {}.{:02x}",
        (cwtv & 0xf00) >> 8,
        cwtv & 0xff
    )
}

/// Schism stores either a small version number or a build date as days
/// since 2009-10-31 (offset by 0x050).
fn schism_version(cwtv: u16) -> String {
    let n = cwtv & 0xfff;
    if n <= 0x050 {
        return format!("0.{n:x}");
    }
    NaiveDate::from_ymd_opt(2009, 10, 31)
        .and_then(|epoch| epoch.checked_add_days(Days::new((n - 0x050) as u64)))
        .map_or_else(|| format!("0.{n:x}"), |d| d.format("%Y-%m-%d").to_string())
}
