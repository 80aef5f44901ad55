use crate::models::{DataSource, Metric, RawField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    Gsod,
    IsdFull,
    IsdLite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Fahrenheit,
    Celsius,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedUnit {
    Knots,
    MetersPerSecond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeUnits {
    pub temperature: TemperatureUnit,
    pub wind_speed: SpeedUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Hourly,
    Daily,
}

/// Where a value sits on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Half-open byte range.
    Bytes(usize, usize),
    /// Whitespace-separated token index.
    Token(usize),
}

impl Column {
    pub fn extract<'a>(&self, line: &'a str, tokens: &[&'a str]) -> Option<&'a str> {
        match *self {
            Column::Bytes(start, end) => line.get(start..end),
            Column::Token(index) => tokens.get(index).copied(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub field: RawField,
    pub column: Column,
    pub scale: f64,
    pub sentinel: f64,
}

impl FieldSpec {
    const fn new(field: RawField, column: Column, scale: f64, sentinel: f64) -> Self {
        Self {
            field,
            column,
            scale,
            sentinel,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationSource {
    Columns { usaf: Column, wban: Column },
    FileName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    /// Daily records, stamped at midnight.
    Midnight,
    Hhmm(Column),
    Hour(Column),
}

/// Layout and unit conventions of one raw NOAA product.
#[derive(Debug, PartialEq)]
pub struct FormatProfile {
    pub kind: ProfileKind,
    pub name: &'static str,
    pub header_lines: usize,
    pub units: NativeUnits,
    pub resolution: Resolution,
    pub station: StationSource,
    pub year: Column,
    pub month: Column,
    pub day: Column,
    pub time: TimeOfDay,
    pub fields: &'static [FieldSpec],
    pub indicators: Option<Column>,
    pub additional_data_from: Option<usize>,
    /// Output columns, in `Metric` declaration order.
    pub metrics: &'static [Metric],
}

impl FormatProfile {
    pub fn for_source(source: DataSource) -> &'static FormatProfile {
        match source {
            DataSource::Gsod => &GSOD,
            DataSource::IsdFull => &ISD_FULL,
            DataSource::IsdLite => &ISD_LITE,
        }
    }

    pub fn is_daily(&self) -> bool {
        self.resolution == Resolution::Daily
    }

    /// Metrics that survive daily/monthly aggregation.
    pub fn aggregate_metrics(&self) -> Vec<Metric> {
        self.metrics
            .iter()
            .copied()
            .filter(|m| !m.is_directional())
            .collect()
    }
}

const GSOD_TEMP_SENTINEL: f64 = 9999.9;
const GSOD_SPEED_SENTINEL: f64 = 999.9;
const GSOD_PRCP_SENTINEL: f64 = 99.99;

const GSOD_FIELDS: [FieldSpec; 12] = [
    FieldSpec::new(RawField::Temperature, Column::Bytes(24, 30), 1.0, GSOD_TEMP_SENTINEL),
    FieldSpec::new(RawField::DewPoint, Column::Bytes(35, 41), 1.0, GSOD_TEMP_SENTINEL),
    FieldSpec::new(RawField::SeaLevelPressure, Column::Bytes(46, 52), 1.0, GSOD_TEMP_SENTINEL),
    FieldSpec::new(RawField::StationPressure, Column::Bytes(57, 63), 1.0, GSOD_TEMP_SENTINEL),
    FieldSpec::new(RawField::Visibility, Column::Bytes(68, 73), 1.0, GSOD_SPEED_SENTINEL),
    FieldSpec::new(RawField::WindSpeed, Column::Bytes(78, 83), 1.0, GSOD_SPEED_SENTINEL),
    FieldSpec::new(RawField::MaxWindSpeed, Column::Bytes(88, 93), 1.0, GSOD_SPEED_SENTINEL),
    FieldSpec::new(RawField::Gust, Column::Bytes(95, 100), 1.0, GSOD_SPEED_SENTINEL),
    FieldSpec::new(RawField::MaxTemperature, Column::Bytes(102, 108), 1.0, GSOD_TEMP_SENTINEL),
    FieldSpec::new(RawField::MinTemperature, Column::Bytes(110, 116), 1.0, GSOD_TEMP_SENTINEL),
    FieldSpec::new(RawField::Precipitation, Column::Bytes(118, 123), 1.0, GSOD_PRCP_SENTINEL),
    FieldSpec::new(RawField::SnowDepth, Column::Bytes(125, 130), 1.0, GSOD_SPEED_SENTINEL),
];

const ISD_FULL_FIELDS: [FieldSpec; 5] = [
    FieldSpec::new(RawField::WindDirection, Column::Bytes(60, 63), 1.0, 999.0),
    FieldSpec::new(RawField::WindSpeed, Column::Bytes(65, 69), 10.0, 9999.0),
    FieldSpec::new(RawField::Temperature, Column::Bytes(87, 92), 10.0, 9999.0),
    FieldSpec::new(RawField::DewPoint, Column::Bytes(93, 98), 10.0, 9999.0),
    FieldSpec::new(RawField::SeaLevelPressure, Column::Bytes(99, 104), 10.0, 99999.0),
];

const ISD_LITE_SENTINEL: f64 = -9999.0;

const ISD_LITE_FIELDS: [FieldSpec; 8] = [
    FieldSpec::new(RawField::Temperature, Column::Token(4), 10.0, ISD_LITE_SENTINEL),
    FieldSpec::new(RawField::DewPoint, Column::Token(5), 10.0, ISD_LITE_SENTINEL),
    FieldSpec::new(RawField::SeaLevelPressure, Column::Token(6), 10.0, ISD_LITE_SENTINEL),
    FieldSpec::new(RawField::WindDirection, Column::Token(7), 1.0, ISD_LITE_SENTINEL),
    FieldSpec::new(RawField::WindSpeed, Column::Token(8), 10.0, ISD_LITE_SENTINEL),
    FieldSpec::new(RawField::SkyCondition, Column::Token(9), 1.0, ISD_LITE_SENTINEL),
    FieldSpec::new(RawField::Precipitation, Column::Token(10), 10.0, ISD_LITE_SENTINEL),
    FieldSpec::new(RawField::Precipitation6h, Column::Token(11), 10.0, ISD_LITE_SENTINEL),
];

pub static GSOD: FormatProfile = FormatProfile {
    kind: ProfileKind::Gsod,
    name: "GSOD",
    header_lines: 1,
    units: NativeUnits {
        temperature: TemperatureUnit::Fahrenheit,
        wind_speed: SpeedUnit::Knots,
    },
    resolution: Resolution::Daily,
    station: StationSource::Columns {
        usaf: Column::Bytes(0, 6),
        wban: Column::Bytes(7, 12),
    },
    year: Column::Bytes(14, 18),
    month: Column::Bytes(18, 20),
    day: Column::Bytes(20, 22),
    time: TimeOfDay::Midnight,
    fields: &GSOD_FIELDS,
    indicators: Some(Column::Bytes(132, 138)),
    additional_data_from: None,
    metrics: &[
        Metric::TemperatureF,
        Metric::TemperatureC,
        Metric::DewPointF,
        Metric::DewPointC,
        Metric::MaxTemperatureF,
        Metric::MaxTemperatureC,
        Metric::MinTemperatureF,
        Metric::MinTemperatureC,
        Metric::SeaLevelPressureHpa,
        Metric::SeaLevelPressurePa,
        Metric::StationPressureHpa,
        Metric::StationPressurePa,
        Metric::VisibilityMiles,
        Metric::VisibilityKm,
        Metric::WindSpeedKnots,
        Metric::WindSpeedMs,
        Metric::MaxWindSpeedKnots,
        Metric::MaxWindSpeedMs,
        Metric::GustKnots,
        Metric::GustMs,
        Metric::PrecipitationInches,
        Metric::PrecipitationMm,
        Metric::SnowDepthInches,
        Metric::SnowDepthCm,
        Metric::Fog,
        Metric::RainOrDrizzle,
        Metric::SnowOrIcePellets,
        Metric::Hail,
        Metric::Thunder,
        Metric::TornadoOrFunnelCloud,
    ],
};

pub static ISD_FULL: FormatProfile = FormatProfile {
    kind: ProfileKind::IsdFull,
    name: "ISD full",
    header_lines: 0,
    units: NativeUnits {
        temperature: TemperatureUnit::Celsius,
        wind_speed: SpeedUnit::MetersPerSecond,
    },
    resolution: Resolution::Hourly,
    station: StationSource::Columns {
        usaf: Column::Bytes(4, 10),
        wban: Column::Bytes(10, 15),
    },
    year: Column::Bytes(15, 19),
    month: Column::Bytes(19, 21),
    day: Column::Bytes(21, 23),
    time: TimeOfDay::Hhmm(Column::Bytes(23, 27)),
    fields: &ISD_FULL_FIELDS,
    indicators: None,
    additional_data_from: Some(105),
    metrics: &[
        Metric::TemperatureF,
        Metric::TemperatureC,
        Metric::DewPointF,
        Metric::DewPointC,
        Metric::SeaLevelPressureHpa,
        Metric::SeaLevelPressurePa,
        Metric::WindSpeedMs,
        Metric::WindDirection,
        Metric::RelativeHumidity,
        Metric::TotalSkyCover,
        Metric::OpaqueSkyCover,
        Metric::SolarZenith,
        Metric::SolarAzimuth,
    ],
};

pub static ISD_LITE: FormatProfile = FormatProfile {
    kind: ProfileKind::IsdLite,
    name: "ISD lite",
    header_lines: 0,
    units: NativeUnits {
        temperature: TemperatureUnit::Celsius,
        wind_speed: SpeedUnit::MetersPerSecond,
    },
    resolution: Resolution::Hourly,
    station: StationSource::FileName,
    year: Column::Token(0),
    month: Column::Token(1),
    day: Column::Token(2),
    time: TimeOfDay::Hour(Column::Token(3)),
    fields: &ISD_LITE_FIELDS,
    indicators: None,
    additional_data_from: None,
    metrics: &[
        Metric::TemperatureF,
        Metric::TemperatureC,
        Metric::DewPointF,
        Metric::DewPointC,
        Metric::SeaLevelPressureHpa,
        Metric::SeaLevelPressurePa,
        Metric::WindSpeedMs,
        Metric::WindDirection,
        Metric::SkyCondition,
        Metric::PrecipitationMm,
        Metric::Precipitation6hMm,
    ],
};
