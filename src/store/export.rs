//! Apple Health export store
//!
//! Loads `export.xml`, either directly or from the `export.zip` archive the
//! Health app produces, and answers queries from memory.

use crate::ir::calendar::Timestamp;
use crate::ir::{CategoryType, QuantityType, Severity, SleepStage, WorkoutType};
use crate::store::error::{StoreError, StoreResult};
use crate::store::evaluate::SampleSet;
use crate::store::types::{NativeQuery, QueryOutput, RecordKind, Sample, WorkoutDetails};
use crate::store::HealthStore;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Date format of `startDate` / `endDate` attributes
const EXPORT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Counts of what a load kept and dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub quantities: usize,
    pub categories: usize,
    pub workouts: usize,
    /// Records of a type this crate does not model
    pub unsupported: usize,
    /// Records of a known type that could not be read
    pub skipped: usize,
}

/// Read-only `HealthStore` over an Apple Health export
#[derive(Debug)]
pub struct ExportStore {
    samples: SampleSet,
    summary: LoadSummary,
}

impl ExportStore {
    /// Open an export, either a `.zip` archive or a bare `export.xml`
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"));

        let xml = if is_zip {
            read_archive(path)?
        } else {
            std::fs::read_to_string(path)?
        };

        let store = Self::from_xml_str(&xml)?;
        tracing::info!(
            path = %path.display(),
            quantities = store.summary.quantities,
            categories = store.summary.categories,
            workouts = store.summary.workouts,
            unsupported = store.summary.unsupported,
            skipped = store.summary.skipped,
            "Loaded Apple Health export"
        );
        Ok(store)
    }

    /// Parse export XML held in memory
    pub fn from_xml_str(xml: &str) -> StoreResult<Self> {
        let (samples, summary) = parse_export(xml)?;
        Ok(Self {
            samples: SampleSet::new(samples),
            summary,
        })
    }

    pub fn summary(&self) -> LoadSummary {
        self.summary
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[async_trait]
impl HealthStore for ExportStore {
    // Exported data is already on disk; every read is allowed
    async fn request_authorization(&self, _read: &HashSet<RecordKind>) -> StoreResult<()> {
        Ok(())
    }

    async fn execute_query(&self, query: &NativeQuery) -> StoreResult<QueryOutput> {
        Ok(self.samples.execute(query))
    }
}

fn read_archive(path: &Path) -> StoreResult<String> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if name.ends_with("export.xml") || name.ends_with("Export.xml") {
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            tracing::debug!(entry = %name, bytes = xml.len(), "Read export entry");
            return Ok(xml);
        }
    }

    Err(StoreError::MissingExport(path.display().to_string()))
}

fn parse_export(xml: &str) -> StoreResult<(Vec<Sample>, LoadSummary)> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut samples = Vec::new();
    let mut summary = LoadSummary::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let parsed = match e.name().as_ref() {
                    b"Record" => parse_record(&e)?,
                    b"Workout" => parse_workout(&e)?,
                    _ => continue,
                };
                match parsed {
                    Parsed::Sample(sample) => {
                        match sample.kind {
                            RecordKind::Quantity(_) => summary.quantities += 1,
                            RecordKind::Category(_) => summary.categories += 1,
                            RecordKind::Workout => summary.workouts += 1,
                        }
                        samples.push(sample);
                    }
                    Parsed::Unsupported => summary.unsupported += 1,
                    Parsed::Skipped => summary.skipped += 1,
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((samples, summary))
}

enum Parsed {
    Sample(Sample),
    Unsupported,
    Skipped,
}

fn attributes(element: &BytesStart<'_>) -> StoreResult<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn parse_record(element: &BytesStart<'_>) -> StoreResult<Parsed> {
    let attrs = attributes(element)?;
    let Some(type_id) = attrs.get("type") else {
        return Ok(Parsed::Skipped);
    };

    let Some((start, end)) = interval(&attrs) else {
        tracing::warn!(record_type = %type_id, "Skipping record with unreadable dates");
        return Ok(Parsed::Skipped);
    };

    let sample = if let Some(kind) = QuantityType::from_export_identifier(type_id) {
        let unit = attrs.get("unit").map(String::as_str).unwrap_or_default();
        let Some(value) = attrs.get("value").and_then(|v| v.parse::<f64>().ok()) else {
            tracing::warn!(record_type = %type_id, "Skipping quantity with non-numeric value");
            return Ok(Parsed::Skipped);
        };
        Sample::quantity(kind, normalize(value, unit, kind.unit()), start, end)
    } else if let Some(kind) = CategoryType::from_export_identifier(type_id) {
        let raw = attrs.get("value").map(String::as_str).unwrap_or_default();
        let Some(code) = category_code(kind, raw) else {
            tracing::warn!(record_type = %type_id, value = %raw, "Skipping category with unknown value");
            return Ok(Parsed::Skipped);
        };
        Sample::category(kind, code, start, end)
    } else {
        return Ok(Parsed::Unsupported);
    };

    Ok(Parsed::Sample(with_provenance(sample, &attrs)))
}

fn parse_workout(element: &BytesStart<'_>) -> StoreResult<Parsed> {
    let attrs = attributes(element)?;
    let Some((start, end)) = interval(&attrs) else {
        tracing::warn!("Skipping workout with unreadable dates");
        return Ok(Parsed::Skipped);
    };

    let activity = attrs
        .get("workoutActivityType")
        .and_then(|id| WorkoutType::from_export_identifier(id));

    let duration = match attrs.get("duration").and_then(|v| v.parse::<f64>().ok()) {
        Some(value) => {
            let unit = attrs.get("durationUnit").map(String::as_str).unwrap_or("min");
            normalize(value, unit, "s")
        }
        None => (end - start).num_milliseconds() as f64 / 1000.0,
    };

    let measured = |value_key: &str, unit_key: &str, canonical: &str| {
        let value = attrs.get(value_key)?.parse::<f64>().ok()?;
        let unit = attrs.get(unit_key).map(String::as_str).unwrap_or(canonical);
        Some(normalize(value, unit, canonical))
    };

    let details = WorkoutDetails {
        activity,
        duration,
        total_energy: measured("totalEnergyBurned", "totalEnergyBurnedUnit", "kcal"),
        distance: measured("totalDistance", "totalDistanceUnit", "m"),
    };

    Ok(Parsed::Sample(with_provenance(
        Sample::workout(details, start, end),
        &attrs,
    )))
}

fn interval(attrs: &HashMap<String, String>) -> Option<(Timestamp, Timestamp)> {
    let start = parse_export_date(attrs.get("startDate")?)?;
    let end = parse_export_date(attrs.get("endDate")?)?;
    Some((start, end))
}

fn with_provenance(mut sample: Sample, attrs: &HashMap<String, String>) -> Sample {
    if let Some(source) = attrs.get("sourceName").filter(|s| !s.is_empty()) {
        sample = sample.with_source(source.as_str());
    }
    if let Some(device) = attrs.get("device").and_then(|d| device_name(d)) {
        sample = sample.with_device(device);
    }
    sample
}

/// Parse an export date into local time
pub fn parse_export_date(text: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_str(text, EXPORT_DATE_FORMAT) {
        return Some(dt.with_timezone(&Local));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Local));
    }
    crate::ir::calendar::parse_local_datetime(text)
}

/// Device names are embedded as `<<HKDevice: 0x..>, name:Apple Watch, ...>`
fn device_name(raw: &str) -> Option<String> {
    match raw.find("name:") {
        Some(idx) => {
            let rest = &raw[idx + "name:".len()..];
            let name = rest.split([',', '>']).next().unwrap_or(rest).trim();
            (!name.is_empty()).then(|| name.to_string())
        }
        None => {
            let name = raw.trim();
            (!name.is_empty()).then(|| name.to_string())
        }
    }
}

fn category_code(kind: CategoryType, raw: &str) -> Option<i64> {
    if let Ok(code) = raw.parse::<i64>() {
        return Some(code);
    }
    match kind {
        CategoryType::SleepAnalysis => SleepStage::from_export_value(raw).map(|s| s.code()),
        _ => Severity::from_export_value(raw).map(|s| s.code()),
    }
}

/// Convert `value` from the export's unit into the canonical unit
fn normalize(value: f64, unit: &str, canonical: &str) -> f64 {
    match (unit, canonical) {
        (u, c) if u == c => value,
        ("km", "m") => value * 1000.0,
        ("cm", "m") => value / 100.0,
        ("mi", "m") => value * 1609.344,
        ("ft", "m") => value * 0.3048,
        ("in", "m") => value * 0.0254,
        ("lb", "kg") => value * 0.453_592_37,
        ("g", "kg") => value / 1000.0,
        ("degF", "degC") => (value - 32.0) * 5.0 / 9.0,
        ("kJ", "kcal") => value / 4.184,
        ("Cal", "kcal") => value,
        ("min", "s") => value * 60.0,
        ("hr", "s") => value * 3600.0,
        ("s", "min") => value / 60.0,
        _ => value,
    }
}
