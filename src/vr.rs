//! Value representation name catalog used for output formatting

use dicom_core::VR;

/// Canonical two-letter name of a value representation.
///
/// Representations outside the supported set collapse to "UN", so output
/// documents never carry a VR name a downstream consumer cannot branch on.
pub fn vr_name(vr: VR) -> &'static str {
    match vr {
        VR::AE => "AE",
        VR::AS => "AS",
        VR::AT => "AT",
        VR::CS => "CS",
        VR::DA => "DA",
        VR::DS => "DS",
        VR::DT => "DT",
        VR::FD => "FD",
        VR::FL => "FL",
        VR::IS => "IS",
        VR::LO => "LO",
        VR::LT => "LT",
        VR::OB => "OB",
        VR::OD => "OD",
        VR::OF => "OF",
        VR::OL => "OL",
        VR::OW => "OW",
        VR::PN => "PN",
        VR::SH => "SH",
        VR::SL => "SL",
        VR::SQ => "SQ",
        VR::SS => "SS",
        VR::ST => "ST",
        VR::TM => "TM",
        VR::UC => "UC",
        VR::UI => "UI",
        VR::UL => "UL",
        VR::UR => "UR",
        VR::US => "US",
        VR::UT => "UT",
        _ => "UN",
    }
}

/// Whether a VR formats its values as person-name component groups
pub fn is_person_name(vr: VR) -> bool {
    vr == VR::PN
}
