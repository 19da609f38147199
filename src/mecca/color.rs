//! Static color and cursor-control table.
//!
//! `[white]` and `[fg white]` resolve through the same [`Color`] table so
//! both produce identical bytes. Colors are foreground only.

use std::borrow::Cow;

use super::error::InstructionError;
use super::token::Kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    Blue,
    Green,
    Cyan,
    Red,
    Magenta,
    Brown,
    Gray,
    DarkGray,
    LightBlue,
    LightGreen,
    LightCyan,
    LightRed,
    LightMagenta,
    Yellow,
    White,
}

impl Color {
    pub fn from_kind(kind: Kind) -> Option<Color> {
        let color = match kind {
            Kind::Black => Color::Black,
            Kind::Blue => Color::Blue,
            Kind::Green => Color::Green,
            Kind::Cyan => Color::Cyan,
            Kind::Red => Color::Red,
            Kind::Magenta => Color::Magenta,
            Kind::Brown => Color::Brown,
            Kind::Gray => Color::Gray,
            Kind::DarkGray => Color::DarkGray,
            Kind::LightBlue => Color::LightBlue,
            Kind::LightGreen => Color::LightGreen,
            Kind::LightCyan => Color::LightCyan,
            Kind::LightRed => Color::LightRed,
            Kind::LightMagenta => Color::LightMagenta,
            Kind::Yellow => Color::Yellow,
            Kind::White => Color::White,
            _ => return None,
        };
        Some(color)
    }

    /// Resolve a color name (as used by `[fg name]`) through the instruction vocabulary.
    pub fn from_name(name: &str) -> Option<Color> {
        Kind::from_name(name).and_then(Color::from_kind)
    }

    /// SGR sequence selecting this foreground color.
    pub fn foreground(self) -> &'static [u8] {
        match self {
            Color::Black => b"\x1b[22;30m",
            Color::Red => b"\x1b[22;31m",
            Color::Green => b"\x1b[22;32m",
            Color::Brown => b"\x1b[22;33m",
            Color::Blue => b"\x1b[22;34m",
            Color::Magenta => b"\x1b[22;35m",
            Color::Cyan => b"\x1b[22;36m",
            Color::Gray => b"\x1b[22;37m",
            Color::DarkGray => b"\x1b[1;30m",
            Color::LightRed => b"\x1b[1;31m",
            Color::LightGreen => b"\x1b[1;32m",
            Color::Yellow => b"\x1b[1;33m",
            Color::LightBlue => b"\x1b[1;34m",
            Color::LightMagenta => b"\x1b[1;35m",
            Color::LightCyan => b"\x1b[1;36m",
            Color::White => b"\x1b[1;37m",
        }
    }
}

/// The color an instruction selects, whether named by its kind or by its `fg` argument.
pub fn color_of(kind: Kind, args: &[String]) -> Result<Option<Color>, InstructionError> {
    match kind {
        Kind::Fg => {
            let name = args.first().map(String::as_str).unwrap_or("");
            Color::from_name(name).map(Some).ok_or_else(|| InstructionError::InvalidArgument {
                instruction: "fg".into(),
                value: name.into(),
            })
        }
        other => Ok(Color::from_kind(other)),
    }
}

/// Escape bytes for a color, video attribute or cursor-control instruction.
pub fn resolve(kind: Kind, args: &[String]) -> Result<Cow<'static, [u8]>, InstructionError> {
    if let Some(color) = color_of(kind, args)? {
        return Ok(Cow::Borrowed(color.foreground()));
    }
    let bytes: &'static [u8] = match kind {
        Kind::Blink => b"\x1b[5m",
        Kind::Bright => b"\x1b[1m",
        Kind::Dim => b"\x1b[2m",
        Kind::Steady => b"\x1b[25m",
        Kind::Bell => b"\x07",
        Kind::Bs => b"\x08",
        Kind::Cleol => b"\x1b[K",
        Kind::Cleos => b"\x1b[J",
        Kind::Cls => b"\x1b[2J\x1b[1;1H",
        Kind::Cr => b"\r",
        Kind::Lf => b"\n",
        Kind::Tab => b"\t",
        Kind::Up => b"\x1b[A",
        Kind::Down => b"\x1b[B",
        Kind::Right => b"\x1b[C",
        Kind::Left => b"\x1b[D",
        Kind::Locate => return locate(args).map(Cow::Owned),
        other => return Err(InstructionError::NotControl(other.to_string())),
    };
    Ok(Cow::Borrowed(bytes))
}

fn locate(args: &[String]) -> Result<Vec<u8>, InstructionError> {
    let coord = |idx: usize| -> Result<u16, InstructionError> {
        let raw = args.get(idx).map(String::as_str).unwrap_or("");
        raw.trim().parse::<u16>().map_err(|_| InstructionError::InvalidArgument {
            instruction: "locate".into(),
            value: raw.into(),
        })
    };
    let (row, col) = (coord(0)?, coord(1)?);
    Ok(format!("\x1b[{};{}H", row, col).into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_fg_argument_resolve_identically() {
        let direct = resolve(Kind::White, &[]).unwrap();
        let via_fg = resolve(Kind::Fg, &["white".to_string()]).unwrap();
        assert_eq!(direct, via_fg);
        assert_eq!(&*direct, b"\x1b[1;37m");
    }

    #[test]
    fn fg_argument_is_case_insensitive() {
        assert_eq!(
            resolve(Kind::Fg, &["LightBlue".to_string()]).unwrap(),
            resolve(Kind::LightBlue, &[]).unwrap()
        );
    }

    #[test]
    fn unknown_fg_color_is_an_error() {
        for name in ["plaid", "goto"] {
            assert!(matches!(
                resolve(Kind::Fg, &[name.to_string()]),
                Err(InstructionError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn locate_formats_cursor_position() {
        let bytes = resolve(Kind::Locate, &["12".to_string(), "40".to_string()]).unwrap();
        assert_eq!(&*bytes, b"\x1b[12;40H");
        assert!(resolve(Kind::Locate, &["x".to_string(), "1".to_string()]).is_err());
    }

    #[test]
    fn non_control_kind_rejected() {
        assert!(matches!(resolve(Kind::SysName, &[]), Err(InstructionError::NotControl(_))));
    }
}
