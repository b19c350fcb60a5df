/// Pollutant registry: display names and health notes shown next to the
/// dashboard charts.
///
/// Source datasets spell pollutants inconsistently (`PM2.5`, `PM25`,
/// `pm2,5`, `NO2`, `NO₂`), so lookups go through `pollutant_key`.

pub struct Pollutant {
    /// Canonical code as used in the city datasets.
    pub code: &'static str,
    pub name: &'static str,
    /// Why the pollutant matters for health.
    pub health_note: &'static str,
}

pub static POLLUTANT_REGISTRY: &[Pollutant] = &[
    Pollutant {
        code: "NO2",
        name: "Nitrogen dioxide (NO₂)",
        health_note: "Gas produced by fossil-fuel combustion: irritates the \
                      airways and raises cardiovascular risk.",
    },
    Pollutant {
        code: "PM10",
        name: "Particulate matter PM10",
        health_note: "Particles up to 10 µm: reach the airways and aggravate \
                      respiratory and cardiac conditions.",
    },
    Pollutant {
        code: "PM2.5",
        name: "Particulate matter PM2.5",
        health_note: "Particles up to 2.5 µm: penetrate deep into the lungs \
                      and the bloodstream; linked to premature mortality.",
    },
    Pollutant {
        code: "O3",
        name: "Ozone (O₃)",
        health_note: "Secondary pollutant peaking in summer: inflames the \
                      airways and reduces lung function.",
    },
    Pollutant {
        code: "CO",
        name: "Carbon monoxide (CO)",
        health_note: "Binds haemoglobin and reduces oxygen delivery; mostly \
                      from road traffic.",
    },
    Pollutant {
        code: "SO2",
        name: "Sulphur dioxide (SO₂)",
        health_note: "Irritant gas from sulphur-bearing fuels; aggravates \
                      asthma.",
    },
    Pollutant {
        code: "C6H6",
        name: "Benzene (C₆H₆)",
        health_note: "Carcinogenic volatile compound from fuel evaporation \
                      and exhaust.",
    },
];

/// Folds a raw pollutant label into a comparison key: uppercase, no
/// whitespace, subscript digits to ASCII, decimal comma and dot removed.
pub fn pollutant_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != ',' && *c != '_')
        .map(|c| match c {
            '₀'..='₉' => char::from(b'0' + (c as u32 - '₀' as u32) as u8),
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Looks up a pollutant by any spelling of its code.
pub fn find_pollutant(raw: &str) -> Option<&'static Pollutant> {
    let key = pollutant_key(raw);
    if key.is_empty() {
        return None;
    }
    POLLUTANT_REGISTRY
        .iter()
        .find(|p| pollutant_key(p.code) == key)
}
