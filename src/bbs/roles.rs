/// Privilege level constants (classic Maximus class ladder)
pub const LEVEL_TWIT: u16 = 0;
pub const LEVEL_DISGRACE: u16 = 10;
pub const LEVEL_LIMITED: u16 = 20;
pub const LEVEL_NORMAL: u16 = 30;
pub const LEVEL_WORTHY: u16 = 40;
pub const LEVEL_PRIVIL: u16 = 50;
pub const LEVEL_FAVORED: u16 = 60;
pub const LEVEL_EXTRA: u16 = 70;
pub const LEVEL_CLERK: u16 = 80;
pub const LEVEL_ASSTSYSOP: u16 = 90;
pub const LEVEL_SYSOP: u16 = 100;

// (level, name, abbreviation), ascending
const CLASSES: [(u16, &str, &str); 11] = [
    (LEVEL_TWIT, "Twit", "Twt"),
    (LEVEL_DISGRACE, "Disgrace", "Dis"),
    (LEVEL_LIMITED, "Limited", "Lim"),
    (LEVEL_NORMAL, "Normal", "Nor"),
    (LEVEL_WORTHY, "Worthy", "Wor"),
    (LEVEL_PRIVIL, "Privil", "Pri"),
    (LEVEL_FAVORED, "Favored", "Fav"),
    (LEVEL_EXTRA, "Extra", "Ext"),
    (LEVEL_CLERK, "Clerk", "Clk"),
    (LEVEL_ASSTSYSOP, "AsstSysop", "Ast"),
    (LEVEL_SYSOP, "Sysop", "Sys"),
];

fn class_for(level: u16) -> (u16, &'static str, &'static str) {
    CLASSES.iter().rev().find(|(min, _, _)| level >= *min).copied().unwrap_or(CLASSES[0])
}

pub fn role_name(level: u16) -> &'static str {
    class_for(level).1
}

pub fn role_abbrev(level: u16) -> &'static str {
    class_for(level).2
}

/// Parse a privilege argument: either a number or a class name (case-insensitive).
pub fn parse_level(raw: &str) -> Option<u16> {
    let raw = raw.trim();
    if let Ok(level) = raw.parse::<u16>() {
        return Some(level);
    }
    CLASSES.iter().find(|(_, name, _)| name.eq_ignore_ascii_case(raw)).map(|(level, _, _)| *level)
}
