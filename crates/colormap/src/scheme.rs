//! Color schemes and multi-stop interpolation.

/// RGB color with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Available color schemes for the fire-analysis rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// Brown -> Yellow -> Green (vegetation indices)
    Vegetation,
    /// Yellow -> Orange -> Red (stress and risk scores)
    Stress,
    /// Black -> Red -> Yellow -> White (dNBR, "the hotter the worse")
    Burn,
    /// White -> Cyan -> Blue (moisture)
    Moisture,
    /// Blue -> White -> Red (signed change grids)
    Divergent,
    /// Black -> White
    Grayscale,
}

impl ColorScheme {
    /// All available schemes, for CLI listings.
    pub const ALL: &'static [ColorScheme] = &[
        Self::Vegetation,
        Self::Stress,
        Self::Burn,
        Self::Moisture,
        Self::Divergent,
        Self::Grayscale,
    ];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vegetation => "Vegetation",
            Self::Stress => "Stress",
            Self::Burn => "Burn",
            Self::Moisture => "Moisture",
            Self::Divergent => "Divergent",
            Self::Grayscale => "Grayscale",
        }
    }

    /// Parse a CLI scheme name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "vegetation" | "veg" | "ndvi" => Some(Self::Vegetation),
            "stress" | "risk" => Some(Self::Stress),
            "burn" | "dnbr" | "hot" => Some(Self::Burn),
            "moisture" | "ndmi" | "water" => Some(Self::Moisture),
            "divergent" | "change" => Some(Self::Divergent),
            "grayscale" | "gray" | "grey" => Some(Self::Grayscale),
            _ => None,
        }
    }
}

// ─── Color stop definitions ──────────────────────────────────────────────

const VEGETATION_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, 120, 70, 20),
    ColorStop::new(0.3, 200, 170, 60),
    ColorStop::new(0.5, 240, 230, 100),
    ColorStop::new(0.7, 100, 180, 50),
    ColorStop::new(1.0, 10, 100, 20),
];

const STRESS_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 255, 255, 204),
    ColorStop::new(0.35, 254, 217, 118),
    ColorStop::new(0.65, 253, 141, 60),
    ColorStop::new(1.00, 189, 0, 38),
];

const BURN_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 0, 0, 0),
    ColorStop::new(0.35, 230, 40, 0),
    ColorStop::new(0.70, 255, 200, 30),
    ColorStop::new(1.00, 255, 255, 255),
];

const MOISTURE_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 240, 249, 255),
    ColorStop::new(0.25, 186, 228, 250),
    ColorStop::new(0.50, 80, 180, 230),
    ColorStop::new(0.75, 30, 120, 200),
    ColorStop::new(1.00, 8, 48, 107),
];

const DIVERGENT_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 33, 102, 172),
    ColorStop::new(0.25, 103, 169, 207),
    ColorStop::new(0.50, 247, 247, 247),
    ColorStop::new(0.75, 239, 138, 98),
    ColorStop::new(1.00, 178, 24, 43),
];

const GRAYSCALE_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, 0, 0, 0),
    ColorStop::new(1.0, 255, 255, 255),
];

/// Discrete palette for the five burn-severity classes, unburned green to
/// deep-red high severity.
pub const SEVERITY_PALETTE: [Rgb; 5] = [
    Rgb::new(46, 125, 50),  // 0: unburned
    Rgb::new(253, 216, 53), // 1: low
    Rgb::new(251, 140, 0),  // 2: moderate-low
    Rgb::new(229, 57, 53),  // 3: moderate-high
    Rgb::new(93, 0, 0),     // 4: high
];

/// Color for one severity class code, or `None` for nodata codes.
pub fn severity_color(class: u8) -> Option<Rgb> {
    SEVERITY_PALETTE.get(class as usize).copied()
}

fn stops(scheme: ColorScheme) -> &'static [ColorStop] {
    match scheme {
        ColorScheme::Vegetation => VEGETATION_STOPS,
        ColorScheme::Stress => STRESS_STOPS,
        ColorScheme::Burn => BURN_STOPS,
        ColorScheme::Moisture => MOISTURE_STOPS,
        ColorScheme::Divergent => DIVERGENT_STOPS,
        ColorScheme::Grayscale => GRAYSCALE_STOPS,
    }
}

/// Evaluate a scheme at a normalized position `t` in [0, 1].
///
/// Out-of-range positions clamp to the end stops.
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    let stops = stops(scheme);
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

    let mut lower = stops[0];
    for &stop in stops {
        if t <= stop.t {
            let span = stop.t - lower.t;
            if span <= f64::EPSILON {
                return stop.color;
            }
            let f = (t - lower.t) / span;
            return lerp(lower.color, stop.color, f);
        }
        lower = stop;
    }
    stops[stops.len() - 1].color
}

fn lerp(a: Rgb, b: Rgb, f: f64) -> Rgb {
    let mix = |x: u8, y: u8| -> u8 {
        let v = x as f64 + (y as f64 - x as f64) * f;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgb::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
}
