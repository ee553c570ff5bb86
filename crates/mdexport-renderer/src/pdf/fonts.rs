//! Standard 14 fonts used by the PDF backend.
//!
//! Only WinAnsi-encoded Type1 base fonts are used, so no font program is
//! embedded. Glyph widths come from the Adobe core font metrics.

/// Builtin PDF font.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Font {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
}

/// Helvetica advance widths for bytes 0x20..=0x7E, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

/// Helvetica-Bold advance widths for bytes 0x20..=0x7E, in 1/1000 em.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0x30
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 0x50
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 0x60
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 0x70
];

/// WinAnsi code for U+2022 BULLET.
const WIN_ANSI_BULLET: u8 = 0x95;

impl Font {
    /// Every font registered on each page.
    pub(crate) const ALL: [Self; 5] = [
        Self::Helvetica,
        Self::HelveticaBold,
        Self::HelveticaOblique,
        Self::HelveticaBoldOblique,
        Self::Courier,
    ];

    /// PostScript name of the base font.
    pub(crate) fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::Courier => "Courier",
        }
    }

    /// Name in the page resource dictionary.
    pub(crate) fn resource_name(self) -> &'static str {
        match self {
            Self::Helvetica => "F1",
            Self::HelveticaBold => "F2",
            Self::HelveticaOblique => "F3",
            Self::HelveticaBoldOblique => "F4",
            Self::Courier => "F5",
        }
    }

    /// Helvetica variant for the given weight and slant.
    pub(crate) fn styled(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Self::Helvetica,
            (true, false) => Self::HelveticaBold,
            (false, true) => Self::HelveticaOblique,
            (true, true) => Self::HelveticaBoldOblique,
        }
    }

    /// Closest builtin font for a requested family name.
    ///
    /// Monospaced families map to Courier; everything else (Arial, Calibri,
    /// Helvetica, ...) maps to the Helvetica family.
    pub(crate) fn for_family(family: &str, bold: bool, italic: bool) -> Self {
        let family = family.to_ascii_lowercase();
        if family.contains("courier") || family.contains("mono") {
            Self::Courier
        } else {
            Self::styled(bold, italic)
        }
    }

    fn glyph_width(self, byte: u8) -> u16 {
        if self == Self::Courier {
            return 600;
        }
        let table = match self {
            Self::HelveticaBold | Self::HelveticaBoldOblique => &HELVETICA_BOLD_WIDTHS,
            _ => &HELVETICA_WIDTHS,
        };
        match byte {
            0x20..=0x7E => table[usize::from(byte - 0x20)],
            WIN_ANSI_BULLET => 350,
            _ => 556,
        }
    }

    /// Width of `text` at `size` points.
    pub(crate) fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = encode(text)
            .into_iter()
            .map(|byte| u32::from(self.glyph_width(byte)))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let units = units as f32;
        units * size / 1000.0
    }
}

/// Encode text as WinAnsi bytes.
///
/// Latin-1 characters map directly, the bullet maps to its WinAnsi slot and
/// anything else becomes `?`.
pub(crate) fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{2022}' => WIN_ANSI_BULLET,
            ' '..='~' | '\u{a0}'..='\u{ff}' => u8::try_from(u32::from(c)).unwrap_or(b'?'),
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}
