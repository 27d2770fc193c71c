pub mod direction {
    use serde::Deserialize;

    /// The sixteen compass points NWS reports for wind direction.
    #[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum Compass {
        N,
        NNE,
        NE,
        ENE,
        E,
        ESE,
        SE,
        SSE,
        S,
        SSW,
        SW,
        WSW,
        W,
        WNW,
        NW,
        NNW,
        #[default]
        #[serde(other)]
        Unknown,
    }

    impl Compass {
        /// Collapses the 16-point name onto the 8-point rose used in replies.
        pub fn abbrev(self) -> &'static str {
            match self {
                Compass::N => "N",
                Compass::NNE | Compass::NE | Compass::ENE => "NE",
                Compass::E => "E",
                Compass::ESE | Compass::SE | Compass::SSE => "SE",
                Compass::S => "S",
                Compass::SSW | Compass::SW | Compass::WSW => "SW",
                Compass::W => "W",
                Compass::WNW | Compass::NW | Compass::NNW => "NW",
                Compass::Unknown => "--",
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn parse(name: &str) -> Compass {
            serde_json::from_value(serde_json::Value::String(name.to_string())).unwrap()
        }

        #[test]
        fn test_sixteen_points_collapse_to_eight() {
            assert_eq!(parse("N").abbrev(), "N");
            assert_eq!(parse("NNE").abbrev(), "NE");
            assert_eq!(parse("ENE").abbrev(), "NE");
            assert_eq!(parse("ESE").abbrev(), "SE");
            assert_eq!(parse("SSW").abbrev(), "SW");
            assert_eq!(parse("WNW").abbrev(), "NW");
            assert_eq!(parse("NNW").abbrev(), "NW");
        }

        #[test]
        fn test_unrecognized_direction_is_placeholder() {
            assert_eq!(parse("").abbrev(), "--");
            assert_eq!(parse("Variable").abbrev(), "--");
        }
    }
}

pub mod clock {
    use chrono::{DateTime, FixedOffset, Timelike};

    fn hour_parts(time: &DateTime<FixedOffset>) -> (u32, &'static str) {
        let (is_pm, hour) = time.hour12();
        (hour, if is_pm { "pm" } else { "am" })
    }

    /// 12-hour label in the period's own offset: `9am`, `3pm`, `10a`, `12p`.
    pub fn hour_label(time: &DateTime<FixedOffset>) -> String {
        let (hour, meridiem) = hour_parts(time);
        if hour < 10 {
            format!("{hour}{meridiem}")
        } else {
            format!("{hour}{}", &meridiem[..1])
        }
    }

    /// Same as [`hour_label`] but two-digit hours carry a trailing space so
    /// every label in a column is three bytes wide.
    pub fn column_label(time: &DateTime<FixedOffset>) -> String {
        let (hour, meridiem) = hour_parts(time);
        if hour < 10 {
            format!("{hour}{meridiem}")
        } else {
            format!("{hour}{} ", &meridiem[..1])
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn at(rfc3339: &str) -> DateTime<FixedOffset> {
            DateTime::parse_from_rfc3339(rfc3339).unwrap()
        }

        #[test]
        fn test_hour_label() {
            assert_eq!(hour_label(&at("2024-05-01T00:00:00-07:00")), "12a");
            assert_eq!(hour_label(&at("2024-05-01T01:00:00-07:00")), "1am");
            assert_eq!(hour_label(&at("2024-05-01T09:00:00-07:00")), "9am");
            assert_eq!(hour_label(&at("2024-05-01T10:00:00-07:00")), "10a");
            assert_eq!(hour_label(&at("2024-05-01T12:00:00-07:00")), "12p");
            assert_eq!(hour_label(&at("2024-05-01T15:00:00-07:00")), "3pm");
            assert_eq!(hour_label(&at("2024-05-01T23:00:00-07:00")), "11p");
        }

        #[test]
        fn test_label_uses_period_offset() {
            // 18:00Z is 11am in Pacific daylight time
            assert_eq!(hour_label(&at("2024-05-01T11:00:00-07:00")), "11a");
            assert_eq!(hour_label(&at("2024-05-01T18:00:00+00:00")), "6pm");
        }

        #[test]
        fn test_column_label_pads_two_digit_hours() {
            assert_eq!(column_label(&at("2024-05-01T22:00:00-07:00")), "10p ");
            assert_eq!(column_label(&at("2024-05-01T08:00:00-07:00")), "8am");
        }
    }
}
