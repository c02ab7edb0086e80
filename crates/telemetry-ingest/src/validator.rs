//! Reading Validator for Range Checking

use crate::error::ValidationError;
use crate::TelemetryReading;
use serde::{Deserialize, Serialize};

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Voltage valid range (V)
    pub voltage_range: (f64, f64),
    /// Current valid range (A)
    pub current_range: (f64, f64),
    /// Temperature valid range (°C)
    pub temperature_range: (f64, f64),
    /// State of charge valid range (%)
    pub state_of_charge_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            voltage_range: (0.0, 5.0),
            current_range: (-500.0, 500.0),
            temperature_range: (-40.0, 85.0),
            state_of_charge_range: (0.0, 100.0),
        }
    }
}

impl ValidationConfig {
    /// Reject empty or non-finite ranges
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, (min, max)) in [
            ("voltage", self.voltage_range),
            ("current", self.current_range),
            ("temperature", self.temperature_range),
            ("state_of_charge", self.state_of_charge_range),
        ] {
            if !min.is_finite() || !max.is_finite() || min >= max {
                return Err(ValidationError::InvalidBounds { field, min, max });
            }
        }
        Ok(())
    }
}

/// Range validator for battery readings
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite { field });
        }
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Validate voltage
    pub fn validate_voltage(&self, voltage: f64) -> Result<(), ValidationError> {
        self.validate_range("voltage", voltage, self.config.voltage_range)
    }

    /// Validate current
    pub fn validate_current(&self, current: f64) -> Result<(), ValidationError> {
        self.validate_range("current", current, self.config.current_range)
    }

    /// Validate temperature
    pub fn validate_temperature(&self, temp: f64) -> Result<(), ValidationError> {
        self.validate_range("temperature", temp, self.config.temperature_range)
    }

    /// Validate state of charge
    pub fn validate_state_of_charge(&self, soc: f64) -> Result<(), ValidationError> {
        self.validate_range("state_of_charge", soc, self.config.state_of_charge_range)
    }

    /// Cycle counters never decrease
    pub fn validate_cycle_count(
        &self,
        previous: Option<u32>,
        current: u32,
    ) -> Result<(), ValidationError> {
        match previous {
            Some(previous) if current < previous => {
                Err(ValidationError::CycleCountDecreased { previous, current })
            }
            _ => Ok(()),
        }
    }

    /// Validate a reading field by field, stopping at the first failure
    pub fn validate_reading(
        &self,
        reading: &TelemetryReading,
        previous_cycles: Option<u32>,
    ) -> Result<(), ValidationError> {
        self.validate_voltage(reading.voltage)?;
        self.validate_current(reading.current)?;
        self.validate_temperature(reading.temperature)?;
        if let Some(soc) = reading.state_of_charge {
            self.validate_state_of_charge(soc)?;
        }
        self.validate_cycle_count(previous_cycles, reading.cycle_count)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading() -> TelemetryReading {
        TelemetryReading {
            timestamp: Utc::now(),
            voltage: 3.7,
            current: 1.2,
            temperature: 25.0,
            cycle_count: 100,
            state_of_charge: Some(80.0),
        }
    }

    #[test]
    fn test_valid_voltage() {
        let validator = Validator::default();
        assert!(validator.validate_voltage(3.7).is_ok());
        assert!(validator.validate_voltage(0.0).is_ok());
        assert!(validator.validate_voltage(5.0).is_ok());
    }

    #[test]
    fn test_invalid_voltage() {
        let validator = Validator::default();
        assert!(validator.validate_voltage(-0.1).is_err());
        assert!(validator.validate_voltage(12.0).is_err());
        assert!(matches!(
            validator.validate_voltage(f64::NAN),
            Err(ValidationError::NotFinite { field: "voltage" })
        ));
    }

    #[test]
    fn test_temperature_range() {
        let validator = Validator::default();
        assert!(validator.validate_temperature(-40.0).is_ok());
        assert!(validator.validate_temperature(25.0).is_ok());
        assert!(validator.validate_temperature(85.0).is_ok());
        assert!(validator.validate_temperature(-50.0).is_err());
        assert!(validator.validate_temperature(120.0).is_err());
    }

    #[test]
    fn test_cycle_count_monotonic() {
        let validator = Validator::default();
        assert!(validator.validate_cycle_count(None, 0).is_ok());
        assert!(validator.validate_cycle_count(Some(10), 10).is_ok());
        assert_eq!(
            validator.validate_cycle_count(Some(10), 9),
            Err(ValidationError::CycleCountDecreased { previous: 10, current: 9 })
        );
    }

    #[test]
    fn test_reading_reports_first_failure() {
        let validator = Validator::default();
        assert!(validator.validate_reading(&reading(), None).is_ok());

        let mut bad = reading();
        bad.temperature = 200.0;
        bad.state_of_charge = Some(140.0);
        assert!(matches!(
            validator.validate_reading(&bad, None),
            Err(ValidationError::OutOfRange { field: "temperature", .. })
        ));

        bad.voltage = 9.0;
        assert!(matches!(
            validator.validate_reading(&bad, Some(200)),
            Err(ValidationError::OutOfRange { field: "voltage", .. })
        ));

        let mut rewound = reading();
        rewound.cycle_count = 50;
        assert_eq!(
            validator.validate_reading(&rewound, Some(100)),
            Err(ValidationError::CycleCountDecreased { previous: 100, current: 50 })
        );
    }

    #[test]
    fn test_config_bounds() {
        assert!(ValidationConfig::default().validate().is_ok());
        let config = ValidationConfig {
            voltage_range: (5.0, 1.0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidBounds { field: "voltage", .. })
        ));
    }
}
