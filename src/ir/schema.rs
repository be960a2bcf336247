//! Record kinds a query can target
//!
//! Every kind has a snake_case display name (the table name used in query
//! text), the identifier the Apple Health export uses for it, and the fields a
//! row of that kind can carry.

use crate::ir::HealthSource;
use serde::{Deserialize, Serialize};

/// Fields every quantity table exposes
pub const QUANTITY_FIELDS: &[&str] = &["value", "date", "end_date", "source", "device"];

/// Fields of the aggregated `sleep` table
pub const SLEEP_SESSION_FIELDS: &[&str] = &[
    "date",
    "end_date",
    "duration",
    "in_bed_duration",
    "rem",
    "core",
    "deep",
    "awake",
];

/// Fields of the `workouts` table
pub const WORKOUT_FIELDS: &[&str] = &[
    "activity_type",
    "date",
    "end_date",
    "duration",
    "total_calories",
    "distance",
    "source",
    "device",
];

macro_rules! quantity_types {
    ($($variant:ident => $display:literal, $camel:literal, $unit:literal, $export:literal;)+) => {
        /// Numeric measurement kinds
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum QuantityType {
            $($variant,)+
        }

        impl QuantityType {
            /// Every quantity kind, in declaration order
            pub const ALL: &'static [QuantityType] = &[$(QuantityType::$variant,)+];

            /// Table name used in query text
            pub fn display_name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $display,)+
                }
            }

            /// camelCase variant name
            pub fn variant_name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $camel,)+
                }
            }

            /// Canonical unit values of this kind are reported in
            pub fn unit(&self) -> &'static str {
                match self {
                    $(Self::$variant => $unit,)+
                }
            }

            /// `type` attribute of this kind in an Apple Health export
            pub fn export_identifier(&self) -> &'static str {
                match self {
                    $(Self::$variant => $export,)+
                }
            }
        }
    };
}

quantity_types! {
    Steps => "steps", "steps", "count", "HKQuantityTypeIdentifierStepCount";
    HeartRate => "heart_rate", "heartRate", "count/min", "HKQuantityTypeIdentifierHeartRate";
    ActiveCalories => "active_calories", "activeCalories", "kcal", "HKQuantityTypeIdentifierActiveEnergyBurned";
    RestingCalories => "resting_calories", "restingCalories", "kcal", "HKQuantityTypeIdentifierBasalEnergyBurned";
    Distance => "distance", "distance", "m", "HKQuantityTypeIdentifierDistanceWalkingRunning";
    FlightsClimbed => "flights_climbed", "flightsClimbed", "count", "HKQuantityTypeIdentifierFlightsClimbed";
    StandTime => "stand_time", "standTime", "min", "HKQuantityTypeIdentifierAppleStandTime";
    ExerciseMinutes => "exercise_minutes", "exerciseMinutes", "min", "HKQuantityTypeIdentifierAppleExerciseTime";
    BodyMass => "body_mass", "bodyMass", "kg", "HKQuantityTypeIdentifierBodyMass";
    Height => "height", "height", "m", "HKQuantityTypeIdentifierHeight";
    BodyFatPercentage => "body_fat_percentage", "bodyFatPercentage", "%", "HKQuantityTypeIdentifierBodyFatPercentage";
    HeartRateVariability => "heart_rate_variability", "heartRateVariability", "ms", "HKQuantityTypeIdentifierHeartRateVariabilitySDNN";
    OxygenSaturation => "oxygen_saturation", "oxygenSaturation", "%", "HKQuantityTypeIdentifierOxygenSaturation";
    RespiratoryRate => "respiratory_rate", "respiratoryRate", "count/min", "HKQuantityTypeIdentifierRespiratoryRate";
    BodyTemperature => "body_temperature", "bodyTemperature", "degC", "HKQuantityTypeIdentifierBodyTemperature";
    BloodPressureSystolic => "blood_pressure_systolic", "bloodPressureSystolic", "mmHg", "HKQuantityTypeIdentifierBloodPressureSystolic";
    BloodPressureDiastolic => "blood_pressure_diastolic", "bloodPressureDiastolic", "mmHg", "HKQuantityTypeIdentifierBloodPressureDiastolic";
    BloodGlucose => "blood_glucose", "bloodGlucose", "mg/dL", "HKQuantityTypeIdentifierBloodGlucose";
    RestingHeartRate => "resting_heart_rate", "restingHeartRate", "count/min", "HKQuantityTypeIdentifierRestingHeartRate";
    WalkingHeartRateAverage => "walking_heart_rate_average", "walkingHeartRateAverage", "count/min", "HKQuantityTypeIdentifierWalkingHeartRateAverage";
    BasalBodyTemperature => "basal_body_temperature", "basalBodyTemperature", "degC", "HKQuantityTypeIdentifierBasalBodyTemperature";
    PeripheralPerfusionIndex => "peripheral_perfusion_index", "peripheralPerfusionIndex", "%", "HKQuantityTypeIdentifierPeripheralPerfusionIndex";
    ElectrodermalActivity => "electrodermal_activity", "electrodermalActivity", "S", "HKQuantityTypeIdentifierElectrodermalActivity";
    BloodAlcoholContent => "blood_alcohol_content", "bloodAlcoholContent", "%", "HKQuantityTypeIdentifierBloodAlcoholContent";
    Vo2Max => "vo2_max", "vo2Max", "mL/(kg*min)", "HKQuantityTypeIdentifierVO2Max";
    DistanceSwimming => "distance_swimming", "distanceSwimming", "m", "HKQuantityTypeIdentifierDistanceSwimming";
    SwimmingStrokeCount => "swimming_stroke_count", "swimmingStrokeCount", "count", "HKQuantityTypeIdentifierSwimmingStrokeCount";
    DistanceWheelchair => "distance_wheelchair", "distanceWheelchair", "m", "HKQuantityTypeIdentifierDistanceWheelchair";
    PushCount => "push_count", "pushCount", "count", "HKQuantityTypeIdentifierPushCount";
    DistanceDownhillSnowSports => "distance_downhill_snow_sports", "distanceDownhillSnowSports", "m", "HKQuantityTypeIdentifierDistanceDownhillSnowSports";
    LeanBodyMass => "lean_body_mass", "leanBodyMass", "kg", "HKQuantityTypeIdentifierLeanBodyMass";
    BodyMassIndex => "body_mass_index", "bodyMassIndex", "count", "HKQuantityTypeIdentifierBodyMassIndex";
    WaistCircumference => "waist_circumference", "waistCircumference", "m", "HKQuantityTypeIdentifierWaistCircumference";
}

impl QuantityType {
    /// Look up a quantity kind by its table name
    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|q| q.display_name() == name)
    }

    /// Look up a quantity kind by its camelCase variant name
    pub fn from_variant_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|q| q.variant_name() == name)
    }

    /// Look up a quantity kind by its export identifier
    pub fn from_export_identifier(identifier: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|q| q.export_identifier() == identifier)
    }
}

impl std::fmt::Display for QuantityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Discrete event kinds whose value is an integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    SleepAnalysis,
    AppetiteChanges,
    Headache,
    Fatigue,
    MenstrualFlow,
}

impl CategoryType {
    pub const ALL: &'static [CategoryType] = &[
        CategoryType::SleepAnalysis,
        CategoryType::AppetiteChanges,
        CategoryType::Headache,
        CategoryType::Fatigue,
        CategoryType::MenstrualFlow,
    ];

    /// Table name used in query text
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SleepAnalysis => "sleep_analysis",
            Self::AppetiteChanges => "appetite_changes",
            Self::Headache => "headache",
            Self::Fatigue => "fatigue",
            Self::MenstrualFlow => "menstrual_flow",
        }
    }

    /// `type` attribute of this kind in an Apple Health export
    pub fn export_identifier(&self) -> &'static str {
        match self {
            Self::SleepAnalysis => "HKCategoryTypeIdentifierSleepAnalysis",
            Self::AppetiteChanges => "HKCategoryTypeIdentifierAppetiteChanges",
            Self::Headache => "HKCategoryTypeIdentifierHeadache",
            Self::Fatigue => "HKCategoryTypeIdentifierFatigue",
            Self::MenstrualFlow => "HKCategoryTypeIdentifierMenstrualFlow",
        }
    }

    /// Fields a row of this kind can carry
    pub fn available_fields(&self) -> &'static [&'static str] {
        match self {
            Self::SleepAnalysis => &[
                "value", "stage", "date", "end_date", "duration", "source", "device",
            ],
            _ => &["value", "severity", "date", "end_date", "source", "device"],
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.display_name() == name)
    }

    pub fn from_export_identifier(identifier: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.export_identifier() == identifier)
    }
}

impl std::fmt::Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Stage codes carried by `sleep_analysis` records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SleepStage {
    InBed = 0,
    AsleepUnspecified = 1,
    Awake = 2,
    AsleepCore = 3,
    AsleepDeep = 4,
    AsleepRem = 5,
}

impl SleepStage {
    pub const ALL: &'static [SleepStage] = &[
        SleepStage::InBed,
        SleepStage::AsleepUnspecified,
        SleepStage::Awake,
        SleepStage::AsleepCore,
        SleepStage::AsleepDeep,
        SleepStage::AsleepRem,
    ];

    pub fn code(&self) -> i64 {
        *self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::InBed => "in_bed",
            Self::AsleepUnspecified => "asleep",
            Self::Awake => "awake",
            Self::AsleepCore => "core",
            Self::AsleepDeep => "deep",
            Self::AsleepRem => "rem",
        }
    }

    /// Parse the value string used in Apple Health exports
    pub fn from_export_value(value: &str) -> Option<Self> {
        match value {
            "HKCategoryValueSleepAnalysisInBed" => Some(Self::InBed),
            "HKCategoryValueSleepAnalysisAsleep" | "HKCategoryValueSleepAnalysisAsleepUnspecified" => {
                Some(Self::AsleepUnspecified)
            }
            "HKCategoryValueSleepAnalysisAwake" => Some(Self::Awake),
            "HKCategoryValueSleepAnalysisAsleepCore" => Some(Self::AsleepCore),
            "HKCategoryValueSleepAnalysisAsleepDeep" => Some(Self::AsleepDeep),
            "HKCategoryValueSleepAnalysisAsleepREM" => Some(Self::AsleepRem),
            _ => None,
        }
    }
}

/// Symptom severity codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    NotPresent = 0,
    Mild = 1,
    Moderate = 2,
    Severe = 3,
    Unspecified = 4,
}

impl Severity {
    pub const ALL: &'static [Severity] = &[
        Severity::NotPresent,
        Severity::Mild,
        Severity::Moderate,
        Severity::Severe,
        Severity::Unspecified,
    ];

    pub fn code(&self) -> i64 {
        *self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NotPresent => "not_present",
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Unspecified => "unspecified",
        }
    }

    pub fn from_export_value(value: &str) -> Option<Self> {
        match value {
            "HKCategoryValueSeverityNotPresent" => Some(Self::NotPresent),
            "HKCategoryValueSeverityMild" => Some(Self::Mild),
            "HKCategoryValueSeverityModerate" => Some(Self::Moderate),
            "HKCategoryValueSeveritySevere" => Some(Self::Severe),
            "HKCategoryValueSeverityUnspecified" => Some(Self::Unspecified),
            _ => None,
        }
    }
}

/// Workout activity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Running,
    Walking,
    Cycling,
    Swimming,
    Yoga,
    StrengthTraining,
    Hiking,
    Elliptical,
    Rowing,
    FunctionalTraining,
    CoreTraining,
    HighIntensityIntervalTraining,
}

impl WorkoutType {
    /// Table name for workout queries
    pub const TABLE_NAME: &'static str = "workouts";

    pub const ALL: &'static [WorkoutType] = &[
        WorkoutType::Running,
        WorkoutType::Walking,
        WorkoutType::Cycling,
        WorkoutType::Swimming,
        WorkoutType::Yoga,
        WorkoutType::StrengthTraining,
        WorkoutType::Hiking,
        WorkoutType::Elliptical,
        WorkoutType::Rowing,
        WorkoutType::FunctionalTraining,
        WorkoutType::CoreTraining,
        WorkoutType::HighIntensityIntervalTraining,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Walking => "walking",
            Self::Cycling => "cycling",
            Self::Swimming => "swimming",
            Self::Yoga => "yoga",
            Self::StrengthTraining => "strength_training",
            Self::Hiking => "hiking",
            Self::Elliptical => "elliptical",
            Self::Rowing => "rowing",
            Self::FunctionalTraining => "functional_training",
            Self::CoreTraining => "core_training",
            Self::HighIntensityIntervalTraining => "hiit",
        }
    }

    /// `workoutActivityType` attribute in an Apple Health export
    pub fn export_identifier(&self) -> &'static str {
        match self {
            Self::Running => "HKWorkoutActivityTypeRunning",
            Self::Walking => "HKWorkoutActivityTypeWalking",
            Self::Cycling => "HKWorkoutActivityTypeCycling",
            Self::Swimming => "HKWorkoutActivityTypeSwimming",
            Self::Yoga => "HKWorkoutActivityTypeYoga",
            Self::StrengthTraining => "HKWorkoutActivityTypeTraditionalStrengthTraining",
            Self::Hiking => "HKWorkoutActivityTypeHiking",
            Self::Elliptical => "HKWorkoutActivityTypeElliptical",
            Self::Rowing => "HKWorkoutActivityTypeRowing",
            Self::FunctionalTraining => "HKWorkoutActivityTypeFunctionalStrengthTraining",
            Self::CoreTraining => "HKWorkoutActivityTypeCoreTraining",
            Self::HighIntensityIntervalTraining => "HKWorkoutActivityTypeHighIntensityIntervalTraining",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|w| w.display_name() == name)
    }

    pub fn from_export_identifier(identifier: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|w| w.export_identifier() == identifier)
    }
}

impl std::fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Description of one queryable table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub name: &'static str,
    pub kind: &'static str,
    pub fields: &'static [&'static str],
    pub unit: Option<&'static str>,
}

impl TableSchema {
    fn for_source(source: HealthSource) -> Self {
        match source {
            HealthSource::Quantity(q) => Self {
                name: q.display_name(),
                kind: "quantity",
                fields: QUANTITY_FIELDS,
                unit: Some(q.unit()),
            },
            HealthSource::Category(c) => Self {
                name: c.display_name(),
                kind: "category",
                fields: c.available_fields(),
                unit: None,
            },
            HealthSource::Workout => Self {
                name: WorkoutType::TABLE_NAME,
                kind: "workout",
                fields: WORKOUT_FIELDS,
                unit: None,
            },
            HealthSource::SleepSession => Self {
                name: HealthSource::SLEEP_TABLE,
                kind: "sleep_session",
                fields: SLEEP_SESSION_FIELDS,
                unit: Some("s"),
            },
        }
    }
}

/// Describe a table by any name the compiler accepts for it
pub fn describe(table: &str) -> Option<TableSchema> {
    HealthSource::from_table_name(table).map(TableSchema::for_source)
}

/// Every table, quantities first
pub fn all_tables() -> Vec<TableSchema> {
    QuantityType::ALL
        .iter()
        .map(|q| HealthSource::Quantity(*q))
        .chain(CategoryType::ALL.iter().map(|c| HealthSource::Category(*c)))
        .chain([HealthSource::Workout, HealthSource::SleepSession])
        .map(TableSchema::for_source)
        .collect()
}
