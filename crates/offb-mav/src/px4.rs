//! PX4 custom_mode packing: main mode in bits 16..24, sub mode in bits 24..32.

const AUTO: u8 = 4;

// (name, main, sub)
const MODES: &[(&str, u8, u8)] = &[
    ("MANUAL", 1, 0),
    ("ALTCTL", 2, 0),
    ("POSCTL", 3, 0),
    ("AUTO.READY", AUTO, 1),
    ("AUTO.TAKEOFF", AUTO, 2),
    ("AUTO.LOITER", AUTO, 3),
    ("AUTO.MISSION", AUTO, 4),
    ("AUTO.RTL", AUTO, 5),
    ("AUTO.LAND", AUTO, 6),
    ("AUTO.FOLLOW_TARGET", AUTO, 8),
    ("AUTO.PRECLAND", AUTO, 9),
    ("ACRO", 5, 0),
    ("OFFBOARD", 6, 0),
    ("STABILIZED", 7, 0),
    ("RATTITUDE", 8, 0),
];

#[cfg(test)]
pub fn pack(main: u8, sub: u8) -> u32 {
    ((main as u32) << 16) | ((sub as u32) << 24)
}

pub fn unpack(custom_mode: u32) -> (u8, u8) {
    (((custom_mode >> 16) & 0xff) as u8, ((custom_mode >> 24) & 0xff) as u8)
}

/// (main, sub) for a mode name as PX4 ground stations spell it.
pub fn mode_from_name(name: &str) -> Option<(u8, u8)> {
    MODES
        .iter()
        .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, main, sub)| (main, sub))
}

/// Name of a HEARTBEAT custom_mode. Sub modes only matter under AUTO.
pub fn mode_name(custom_mode: u32) -> String {
    let (main, sub) = unpack(custom_mode);
    MODES
        .iter()
        .find(|&&(_, m, s)| m == main && (main != AUTO || s == sub))
        .map(|(n, _, _)| n.to_string())
        .unwrap_or_else(|| format!("CMODE({})", custom_mode))
}
