use clap::builder::{styling::AnsiColor, Styles};
use clap::{Parser, ValueEnum};

use meshbot_weather::report::Report;

const ABOUT: &str = "Meshtastic weather bot";

const LONG_ABOUT: &str = "
Weather bot for Meshtastic mesh networks, with forecasts and alerts sourced from the
National Weather Service.

The bot talks to a radio bridge using newline-delimited JSON, either over TCP (--host) or over
stdin/stdout. Nodes on the mesh send it commands such as `temp`, `hourly` or `7day`; DM it `?`
for the full list.

Use --lookup with --report to print a single forecast for any coordinates and exit.
";

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug)]
#[command(version, styles=STYLES, about=ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    #[arg(short, long, default_value = "settings.yaml", help = "Path to the settings file")]
    pub config: String,

    #[arg(long, help = "Address of a TCP radio bridge (e.g. 127.0.0.1:4403)")]
    pub host: Option<String>,

    #[arg(long, help = "This node's id, overriding NODE_ID from settings")]
    pub node_id: Option<String>,

    #[arg(long, value_name = "LAT,LON", value_parser = parse_coordinates, requires = "report", allow_hyphen_values = true,
          help = "Print one forecast for these coordinates and exit")]
    pub lookup: Option<(f64, f64)>,

    #[arg(long, value_enum, requires = "lookup", help = "Report to print with --lookup")]
    pub report: Option<ReportName>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ReportName {
    Temp,
    Rain,
    Wind,
    Hourly,
    #[value(name = "2day")]
    TwoDay,
    #[value(name = "4day")]
    FourDay,
    #[value(name = "5day")]
    FiveDay,
    #[value(name = "7day")]
    SevenDay,
}

impl From<ReportName> for Report {
    fn from(name: ReportName) -> Self {
        match name {
            ReportName::Temp => Report::Temperature,
            ReportName::Rain => Report::Rain,
            ReportName::Wind => Report::Wind,
            ReportName::Hourly => Report::Hourly,
            ReportName::TwoDay => Report::TwoDay,
            ReportName::FourDay => Report::FourDay,
            ReportName::FiveDay => Report::FiveDay,
            ReportName::SevenDay => Report::SevenDay,
        }
    }
}

fn parse_coordinates(s: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got `{s}`"))?;
    let lat = lat.trim().parse::<f64>().map_err(|e| format!("bad latitude: {e}"))?;
    let lon = lon.trim().parse::<f64>().map_err(|e| format!("bad longitude: {e}"))?;
    Ok((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinates() {
        assert_eq!(parse_coordinates("36.7378, -119.7871"), Ok((36.7378, -119.7871)));
        assert!(parse_coordinates("36.7").is_err());
        assert!(parse_coordinates("north,-119").is_err());
    }

    #[test]
    fn test_lookup_args() {
        let args = Args::try_parse_from(["meshbot", "--lookup", "34.05,-118.25", "--report", "2day"]).unwrap();
        assert_eq!(args.lookup, Some((34.05, -118.25)));
        assert!(matches!(args.report, Some(ReportName::TwoDay)));
        assert_eq!(args.config, "settings.yaml");
        assert!(Args::try_parse_from(["meshbot", "--lookup", "34.05,-118.25"]).is_err());
    }
}
