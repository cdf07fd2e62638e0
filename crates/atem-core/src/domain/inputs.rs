//! Well-known input source identifiers.
//!
//! These are the ids carried in `CPvI`/`CPgI` requests and in the
//! `PrgI`/`PrvI` broadcasts.  Which of them exist depends on the switcher
//! model; a [`SourceValidator`] can answer that, but the protocol engine
//! treats its answer as advice and never refuses to send.

pub const BLACK: u16 = 0;
pub const BARS: u16 = 1000;
pub const COLOR_1: u16 = 2001;
pub const COLOR_2: u16 = 2002;
pub const MEDIA_PLAYER_1: u16 = 3010;
pub const MEDIA_PLAYER_1_KEY: u16 = 3011;
pub const MEDIA_PLAYER_2: u16 = 3020;
pub const MEDIA_PLAYER_2_KEY: u16 = 3021;
pub const MEDIA_PLAYER_3: u16 = 3030;
pub const MEDIA_PLAYER_3_KEY: u16 = 3031;
pub const MEDIA_PLAYER_4: u16 = 3040;
pub const MEDIA_PLAYER_4_KEY: u16 = 3041;
pub const PROGRAM_OUT: u16 = 10010;
pub const PREVIEW_OUT: u16 = 10011;
pub const MULTIVIEW: u16 = 10012;

/// Highest camera input number any model exposes.
pub const MAX_CAMERA: u16 = 40;

/// Returns the source id of camera `n` (1-based), or `None` outside 1..=40.
pub fn camera(n: u16) -> Option<u16> {
    (1..=MAX_CAMERA).contains(&n).then_some(n)
}

/// Returns the media player source id for player `n` (1..=4).
pub fn media_player(n: u16) -> Option<u16> {
    (1..=4).contains(&n).then(|| 3000 + n * 10)
}

/// Returns a short human-readable label for a source id.
pub fn label(source: u16) -> String {
    match source {
        BLACK => "Black".to_string(),
        BARS => "Bars".to_string(),
        COLOR_1 => "Color 1".to_string(),
        COLOR_2 => "Color 2".to_string(),
        PROGRAM_OUT => "Program".to_string(),
        PREVIEW_OUT => "Preview".to_string(),
        MULTIVIEW => "Multiview".to_string(),
        n if (1..=MAX_CAMERA).contains(&n) => format!("Cam {n}"),
        n if (3010..=3041).contains(&n) && n % 10 <= 1 => {
            let player = (n - 3000) / 10;
            if n % 10 == 1 {
                format!("MP {player} Key")
            } else {
                format!("MP {player}")
            }
        }
        n => format!("Source {n}"),
    }
}

/// Answers whether a source id exists on a particular switcher.
///
/// Implemented by the host from its model capability tables.
pub trait SourceValidator {
    fn is_valid_source(&self, source: u16) -> bool;
}
