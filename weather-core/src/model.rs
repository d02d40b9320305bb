use serde::{Deserialize, Serialize};

/// Current conditions for one city as reported by a weather source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeatherData {
    /// Degrees Celsius.
    pub temperature: i32,
    /// Relative humidity in percent, 0..=100.
    pub humidity: u8,
    /// Metres per second.
    #[serde(rename = "windSpeed")]
    pub wind_speed: u32,
}

impl WeatherData {
    pub fn new(temperature: i32, humidity: u8, wind_speed: u32) -> Self {
        Self {
            temperature,
            humidity,
            wind_speed,
        }
    }

    /// Rejects values the type allows but the payload contract does not.
    pub fn check_ranges(&self) -> Result<(), String> {
        if self.humidity > MAX_HUMIDITY {
            return Err(format!(
                "humidity {} is outside 0..={MAX_HUMIDITY}",
                self.humidity
            ));
        }
        Ok(())
    }
}

pub const MAX_HUMIDITY: u8 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_wind_speed() {
        let data: WeatherData =
            serde_json::from_str(r#"{"temperature":-4,"humidity":81,"windSpeed":12}"#)
                .expect("payload should parse");

        assert_eq!(data, WeatherData::new(-4, 81, 12));
    }

    #[test]
    fn humidity_above_one_hundred_fails_range_check() {
        assert!(WeatherData::new(20, 100, 3).check_ranges().is_ok());

        let err = WeatherData::new(20, 150, 3).check_ranges().unwrap_err();
        assert!(err.contains("humidity 150"));
    }

    #[test]
    fn rejects_out_of_range_humidity_type() {
        let parsed = serde_json::from_str::<WeatherData>(
            r#"{"temperature":20,"humidity":-1,"windSpeed":3}"#,
        );
        assert!(parsed.is_err());
    }
}
