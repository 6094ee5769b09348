use std::fmt;
use std::str::FromStr;

/// Named aspect locks offered to the person cropping.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum AspectPreset {
    #[default]
    Free,
    Original,
    Square,
    // Landscape
    R3_2,
    R4_3,
    R16_9,
    R16_10,
    // Portrait
    R2_3,
    R3_4,
    R9_16,
    R10_16,
    Custom(u32, u32),
}

impl AspectPreset {
    pub const LANDSCAPE: [AspectPreset; 4] = [Self::R3_2, Self::R4_3, Self::R16_9, Self::R16_10];
    pub const PORTRAIT: [AspectPreset; 4] = [Self::R2_3, Self::R3_4, Self::R9_16, Self::R10_16];

    /// The same preset rotated by 90 degrees.
    pub fn counterpart(self) -> Self {
        match self {
            Self::R3_2 => Self::R2_3,
            Self::R4_3 => Self::R3_4,
            Self::R16_9 => Self::R9_16,
            Self::R16_10 => Self::R10_16,
            Self::R2_3 => Self::R3_2,
            Self::R3_4 => Self::R4_3,
            Self::R9_16 => Self::R16_9,
            Self::R10_16 => Self::R16_10,
            Self::Custom(w, h) => Self::Custom(h, w),
            other => other,
        }
    }

    /// Width / height for a source of the given size, or `None` when free-form.
    pub fn ratio(self, source_width: u32, source_height: u32) -> Option<f32> {
        match self {
            Self::Free => None,
            Self::Original if source_height > 0 => {
                Some(source_width as f32 / source_height as f32)
            }
            Self::Original => None,
            Self::Square => Some(1.0),
            Self::R3_2 => Some(3.0 / 2.0),
            Self::R4_3 => Some(4.0 / 3.0),
            Self::R16_9 => Some(16.0 / 9.0),
            Self::R16_10 => Some(16.0 / 10.0),
            Self::R2_3 => Some(2.0 / 3.0),
            Self::R3_4 => Some(3.0 / 4.0),
            Self::R9_16 => Some(9.0 / 16.0),
            Self::R10_16 => Some(10.0 / 16.0),
            Self::Custom(_, 0) | Self::Custom(0, _) => None,
            Self::Custom(w, h) => Some(w as f32 / h as f32),
        }
    }
}

impl fmt::Display for AspectPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Free => "Free",
            Self::Original => "Original",
            Self::Square => "1:1",
            Self::R3_2 => "3:2",
            Self::R4_3 => "4:3",
            Self::R16_9 => "16:9",
            Self::R16_10 => "16:10",
            Self::R2_3 => "2:3",
            Self::R3_4 => "3:4",
            Self::R9_16 => "9:16",
            Self::R10_16 => "10:16",
            Self::Custom(w, h) => return write!(f, "Custom {w}:{h}"),
        };
        f.write_str(s)
    }
}

impl FromStr for AspectPreset {
    type Err = String;

    /// Accepts `free`, `original`, `W:H` pairs and bare ratios such as `1.5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "free" | "none" => return Ok(Self::Free),
            "original" => return Ok(Self::Original),
            "square" => return Ok(Self::Square),
            _ => {}
        }

        if let Some((w, h)) = s.split_once(':') {
            let w: u32 = w
                .trim()
                .parse()
                .map_err(|_| format!("invalid aspect width in {s:?}"))?;
            let h: u32 = h
                .trim()
                .parse()
                .map_err(|_| format!("invalid aspect height in {s:?}"))?;
            if w == 0 || h == 0 {
                return Err(format!("aspect sides must be positive: {s:?}"));
            }
            let named = [Self::Square]
                .into_iter()
                .chain(Self::LANDSCAPE)
                .chain(Self::PORTRAIT)
                .find(|preset| preset.to_string() == format!("{w}:{h}"));
            return Ok(named.unwrap_or(Self::Custom(w, h)));
        }

        let ratio: f32 = s
            .parse()
            .map_err(|_| format!("unrecognised aspect ratio: {s:?}"))?;
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(format!("aspect ratio must be positive: {s:?}"));
        }
        // Three decimal places is plenty for a crop lock.
        Ok(Self::Custom((ratio * 1000.0).round() as u32, 1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counterpart_round_trips() {
        for preset in AspectPreset::LANDSCAPE {
            assert_eq!(preset.counterpart().counterpart(), preset);
        }
        assert_eq!(AspectPreset::Custom(5, 4).counterpart(), AspectPreset::Custom(4, 5));
        assert_eq!(AspectPreset::Square.counterpart(), AspectPreset::Square);
    }

    #[test]
    fn original_follows_source() {
        assert_eq!(AspectPreset::Original.ratio(1000, 500), Some(2.0));
        assert_eq!(AspectPreset::Free.ratio(1000, 500), None);
    }

    #[test]
    fn parses_named_and_custom() {
        assert_eq!("16:9".parse::<AspectPreset>(), Ok(AspectPreset::R16_9));
        assert_eq!("1:1".parse::<AspectPreset>(), Ok(AspectPreset::Square));
        assert_eq!("5:4".parse::<AspectPreset>(), Ok(AspectPreset::Custom(5, 4)));
        assert_eq!("Free".parse::<AspectPreset>(), Ok(AspectPreset::Free));
        assert_eq!("1.5".parse::<AspectPreset>(), Ok(AspectPreset::Custom(1500, 1000)));
        assert!("0:3".parse::<AspectPreset>().is_err());
        assert!("wide".parse::<AspectPreset>().is_err());
    }
}
