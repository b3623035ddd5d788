//! First-time-use configuration: the user profile written to a fresh device.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use wearlink_core::time::to_epoch_millis;

use crate::error::CodecError;
use crate::policy::{
    expect_object, required_date, required_f64, required_i64, required_str, DecodePolicy,
    StrictDecode, WireEncode, WireRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn wire_name(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    pub fn from_wire_name(name: &str) -> Result<Self, CodecError> {
        match name {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            other => Err(CodecError::InvalidGender(other.to_string())),
        }
    }
}

/// Self-reported training volume; wire values step by ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TrainingBackground {
    Occasional,
    Regular,
    Frequent,
    Heavy,
    SemiPro,
    Pro,
}

impl TrainingBackground {
    pub const ALL: [TrainingBackground; 6] = [
        TrainingBackground::Occasional,
        TrainingBackground::Regular,
        TrainingBackground::Frequent,
        TrainingBackground::Heavy,
        TrainingBackground::SemiPro,
        TrainingBackground::Pro,
    ];

    pub fn value(self) -> u8 {
        match self {
            TrainingBackground::Occasional => 10,
            TrainingBackground::Regular => 20,
            TrainingBackground::Frequent => 30,
            TrainingBackground::Heavy => 40,
            TrainingBackground::SemiPro => 50,
            TrainingBackground::Pro => 60,
        }
    }

    pub fn from_value(value: i64) -> Result<Self, CodecError> {
        Self::ALL
            .iter()
            .copied()
            .find(|background| i64::from(background.value()) == value)
            .ok_or(CodecError::InvalidTrainingBackground(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypicalDay {
    MostlySitting,
    MostlyStanding,
    MostlyMoving,
}

impl TypicalDay {
    pub fn value(self) -> u8 {
        match self {
            TypicalDay::MostlySitting => 1,
            TypicalDay::MostlyStanding => 2,
            TypicalDay::MostlyMoving => 3,
        }
    }

    pub fn from_value(value: i64) -> Result<Self, CodecError> {
        match value {
            1 => Ok(TypicalDay::MostlySitting),
            2 => Ok(TypicalDay::MostlyStanding),
            3 => Ok(TypicalDay::MostlyMoving),
            other => Err(CodecError::InvalidTypicalDay(other)),
        }
    }
}

pub const HEIGHT_CM: (f64, f64) = (90.0, 240.0);
pub const WEIGHT_KG: (f64, f64) = (15.0, 300.0);
pub const MAX_HEART_RATE: (f64, f64) = (100.0, 240.0);
pub const RESTING_HEART_RATE: (f64, f64) = (20.0, 120.0);
pub const VO2_MAX: (f64, f64) = (10.0, 95.0);
pub const SLEEP_GOAL_MINUTES: (f64, f64) = (300.0, 660.0);

#[derive(Debug, Clone, PartialEq)]
pub struct FirstTimeUseConfig {
    pub gender: Gender,
    pub birth_date: DateTime<Utc>,
    /// Centimetres.
    pub height: f32,
    /// Kilograms.
    pub weight: f32,
    pub max_heart_rate: u32,
    pub vo2_max: u32,
    pub resting_heart_rate: u32,
    pub training_background: TrainingBackground,
    /// Device-local time as an ISO 8601 string, passed through untouched.
    pub device_time: String,
    pub typical_day: TypicalDay,
    pub sleep_goal_minutes: u32,
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), CodecError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(CodecError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn required_u32(object: &Map<String, Value>, field: &'static str) -> Result<u32, CodecError> {
    u32::try_from(required_i64(object, field)?).map_err(|_| CodecError::InvalidField {
        field,
        reason: "expected a 32-bit unsigned integer",
    })
}

impl FirstTimeUseConfig {
    /// Checks every physiological value against the range the device accepts.
    pub fn validate(&self) -> Result<(), CodecError> {
        check_range("height", f64::from(self.height), HEIGHT_CM)?;
        check_range("weight", f64::from(self.weight), WEIGHT_KG)?;
        check_range(
            "maxHeartRate",
            f64::from(self.max_heart_rate),
            MAX_HEART_RATE,
        )?;
        check_range(
            "restingHeartRate",
            f64::from(self.resting_heart_rate),
            RESTING_HEART_RATE,
        )?;
        check_range("vo2Max", f64::from(self.vo2_max), VO2_MAX)?;
        check_range(
            "sleepGoalMinutes",
            f64::from(self.sleep_goal_minutes),
            SLEEP_GOAL_MINUTES,
        )
    }
}

impl WireRecord for FirstTimeUseConfig {
    const POLICY: DecodePolicy = DecodePolicy::Strict;
}

impl WireEncode for FirstTimeUseConfig {
    fn to_wire(&self) -> Value {
        json!({
            "gender": self.gender.wire_name(),
            "birthDate": to_epoch_millis(&self.birth_date),
            "height": self.height,
            "weight": self.weight,
            "maxHeartRate": self.max_heart_rate,
            "vo2Max": self.vo2_max,
            "restingHeartRate": self.resting_heart_rate,
            "trainingBackground": self.training_background.value(),
            "deviceTime": self.device_time,
            "typicalDay": self.typical_day.value(),
            "sleepGoalMinutes": self.sleep_goal_minutes,
        })
    }
}

impl StrictDecode for FirstTimeUseConfig {
    /// Rejects bad enumeration values and out-of-range measurements.
    fn decode_wire(value: &Value) -> Result<Self, CodecError> {
        let object = expect_object(value)?;
        let config = Self {
            gender: Gender::from_wire_name(&required_str(object, "gender")?)?,
            birth_date: required_date(object, "birthDate")?,
            height: required_f64(object, "height")? as f32,
            weight: required_f64(object, "weight")? as f32,
            max_heart_rate: required_u32(object, "maxHeartRate")?,
            vo2_max: required_u32(object, "vo2Max")?,
            resting_heart_rate: required_u32(object, "restingHeartRate")?,
            training_background: TrainingBackground::from_value(required_i64(
                object,
                "trainingBackground",
            )?)?,
            device_time: required_str(object, "deviceTime")?,
            typical_day: TypicalDay::from_value(required_i64(object, "typicalDay")?)?,
            sleep_goal_minutes: required_u32(object, "sleepGoalMinutes")?,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wearlink_core::time::from_epoch_millis;

    fn profile() -> FirstTimeUseConfig {
        FirstTimeUseConfig {
            gender: Gender::Female,
            birth_date: from_epoch_millis(631_152_000_000).expect("birth date should convert"),
            height: 168.5,
            weight: 61.0,
            max_heart_rate: 188,
            vo2_max: 46,
            resting_heart_rate: 54,
            training_background: TrainingBackground::Frequent,
            device_time: "2024-01-01T10:15:00+02:00".to_string(),
            typical_day: TypicalDay::MostlyStanding,
            sleep_goal_minutes: 480,
        }
    }

    #[test]
    fn profile_roundtrips() {
        let config = profile();
        let wire = config.to_wire();
        assert_eq!(wire["gender"], json!("Female"));
        assert_eq!(wire["trainingBackground"], json!(30));
        assert_eq!(wire["typicalDay"], json!(2));
        assert_eq!(
            FirstTimeUseConfig::decode_wire(&wire).expect("profile should decode"),
            config
        );
    }

    #[test]
    fn typical_day_accepts_only_known_values() {
        for value in 1..=3 {
            let day = TypicalDay::from_value(value).expect("known typical day");
            assert_eq!(i64::from(day.value()), value);
        }
        assert!(matches!(
            TypicalDay::from_value(4),
            Err(CodecError::InvalidTypicalDay(4))
        ));
        assert!(TypicalDay::from_value(0).is_err());

        let mut wire = profile().to_wire();
        wire["typicalDay"] = json!(4);
        assert!(matches!(
            FirstTimeUseConfig::decode_wire(&wire),
            Err(CodecError::InvalidTypicalDay(4))
        ));
    }

    #[test]
    fn unknown_gender_is_rejected() {
        let mut wire = profile().to_wire();
        wire["gender"] = json!("female");
        assert!(matches!(
            FirstTimeUseConfig::decode_wire(&wire),
            Err(CodecError::InvalidGender(name)) if name == "female"
        ));
    }

    #[test]
    fn training_background_must_be_a_listed_step() {
        assert_eq!(
            TrainingBackground::from_value(50).expect("semi-pro"),
            TrainingBackground::SemiPro
        );
        assert!(matches!(
            TrainingBackground::from_value(35),
            Err(CodecError::InvalidTrainingBackground(35))
        ));
    }

    #[test]
    fn out_of_range_measurement_is_rejected() {
        let mut config = profile();
        config.height = 250.0;
        let err = config.validate().expect_err("height above range");
        assert!(matches!(err, CodecError::OutOfRange { field: "height", .. }));

        let mut wire = profile().to_wire();
        wire["sleepGoalMinutes"] = json!(120);
        assert!(matches!(
            FirstTimeUseConfig::decode_wire(&wire),
            Err(CodecError::OutOfRange {
                field: "sleepGoalMinutes",
                ..
            })
        ));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let mut config = profile();
        config.max_heart_rate = 240;
        config.resting_heart_rate = 20;
        config.vo2_max = 95;
        config.sleep_goal_minutes = 300;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_heart_rate_is_a_field_error() {
        let mut wire = profile().to_wire();
        wire["maxHeartRate"] = json!(-1);
        assert!(matches!(
            FirstTimeUseConfig::decode_wire(&wire),
            Err(CodecError::InvalidField {
                field: "maxHeartRate",
                ..
            })
        ));
    }
}
