use std::fmt::{self, Write};

use tenki_weather::AreaForecast;

const DIVIDER: &str = "----------------------------------------";

/// Plain-text forecast listing: one block per area, one stanza per timestep.
pub fn render_forecast(areas: &[AreaForecast]) -> Result<String, fmt::Error> {
    let mut out = String::new();

    for area in areas {
        writeln!(out, "Area: {}", area.area_name)?;
        for record in &area.records {
            writeln!(out, "  Time:    {}", record.timestamp)?;
            writeln!(out, "  Weather: {}", record.weather_text())?;
            writeln!(out, "  Wind:    {}", record.wind_text())?;
            writeln!(out, "  Waves:   {}", record.wave_text())?;
            out.push('\n');
        }
        writeln!(out, "{}", DIVIDER)?;
    }

    Ok(out)
}
