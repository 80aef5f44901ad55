use serde::{Deserialize, Serialize};
use std::fmt;

/// Every column the pipeline can produce, in output order.
///
/// Raw-unit columns sit next to their converted counterparts so that no
/// information is lost by conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    TemperatureF,
    TemperatureC,
    DewPointF,
    DewPointC,
    MaxTemperatureF,
    MaxTemperatureC,
    MinTemperatureF,
    MinTemperatureC,
    SeaLevelPressureHpa,
    SeaLevelPressurePa,
    StationPressureHpa,
    StationPressurePa,
    VisibilityMiles,
    VisibilityKm,
    WindSpeedKnots,
    WindSpeedMs,
    MaxWindSpeedKnots,
    MaxWindSpeedMs,
    GustKnots,
    GustMs,
    WindDirection,
    RelativeHumidity,
    TotalSkyCover,
    OpaqueSkyCover,
    SkyCondition,
    SolarZenith,
    SolarAzimuth,
    PrecipitationInches,
    PrecipitationMm,
    Precipitation6hMm,
    SnowDepthInches,
    SnowDepthCm,
    Fog,
    RainOrDrizzle,
    SnowOrIcePellets,
    Hail,
    Thunder,
    TornadoOrFunnelCloud,
}

impl Metric {
    pub const COUNT: usize = 38;

    pub const ALL: [Metric; Metric::COUNT] = [
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
        Metric::WindDirection,
        Metric::RelativeHumidity,
        Metric::TotalSkyCover,
        Metric::OpaqueSkyCover,
        Metric::SkyCondition,
        Metric::SolarZenith,
        Metric::SolarAzimuth,
        Metric::PrecipitationInches,
        Metric::PrecipitationMm,
        Metric::Precipitation6hMm,
        Metric::SnowDepthInches,
        Metric::SnowDepthCm,
        Metric::Fog,
        Metric::RainOrDrizzle,
        Metric::SnowOrIcePellets,
        Metric::Hail,
        Metric::Thunder,
        Metric::TornadoOrFunnelCloud,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn column_name(self) -> &'static str {
        match self {
            Metric::TemperatureF => "TEMP_F",
            Metric::TemperatureC => "TEMP_C",
            Metric::DewPointF => "DEWP_F",
            Metric::DewPointC => "DEWP_C",
            Metric::MaxTemperatureF => "MAX_F",
            Metric::MaxTemperatureC => "MAX_C",
            Metric::MinTemperatureF => "MIN_F",
            Metric::MinTemperatureC => "MIN_C",
            Metric::SeaLevelPressureHpa => "SLP_hPa",
            Metric::SeaLevelPressurePa => "SLP_Pa",
            Metric::StationPressureHpa => "STP_hPa",
            Metric::StationPressurePa => "STP_Pa",
            Metric::VisibilityMiles => "VISIB_mi",
            Metric::VisibilityKm => "VISIB_km",
            Metric::WindSpeedKnots => "WDSP_kn",
            Metric::WindSpeedMs => "WDSP_m/s",
            Metric::MaxWindSpeedKnots => "MXSPD_kn",
            Metric::MaxWindSpeedMs => "MXSPD_m/s",
            Metric::GustKnots => "GUST_kn",
            Metric::GustMs => "GUST_m/s",
            Metric::WindDirection => "WIND_DIRECTION",
            Metric::RelativeHumidity => "RELATIVE_HUMIDITY_PERCENTAGE",
            Metric::TotalSkyCover => "TOTAL_SKY_COVER",
            Metric::OpaqueSkyCover => "OPAQUE_SKY_COVER",
            Metric::SkyCondition => "SKY_CONDITION",
            Metric::SolarZenith => "ZENITH_ANGLE",
            Metric::SolarAzimuth => "AZIMUTH_ANGLE",
            Metric::PrecipitationInches => "PRCP_in",
            Metric::PrecipitationMm => "PRCP_mm",
            Metric::Precipitation6hMm => "PRCP_6H_mm",
            Metric::SnowDepthInches => "SNDP_in",
            Metric::SnowDepthCm => "SNDP_cm",
            Metric::Fog => "FRSHTT_Fog",
            Metric::RainOrDrizzle => "FRSHTT_Rain_or_Drizzle",
            Metric::SnowOrIcePellets => "FRSHTT_Snow_or_Ice_Pellets",
            Metric::Hail => "FRSHTT_Hail",
            Metric::Thunder => "FRSHTT_Thunder",
            Metric::TornadoOrFunnelCloud => "FRSHTT_Tornado_or_Funnel_Cloud",
        }
    }

    /// Directional quantities have no meaningful arithmetic mean and are
    /// dropped from daily and monthly aggregates.
    pub fn is_directional(self) -> bool {
        matches!(
            self,
            Metric::WindDirection | Metric::SolarAzimuth | Metric::SolarZenith
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

/// One optional value per [`Metric`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricValues([Option<f64>; Metric::COUNT]);

impl Default for MetricValues {
    fn default() -> Self {
        Self([None; Metric::COUNT])
    }
}

impl MetricValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0[metric.index()]
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        self.0[metric.index()] = value;
    }

    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.set(metric, Some(value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Present values, in column order.
    pub fn present(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL
            .iter()
            .filter_map(|&metric| self.get(metric).map(|value| (metric, value)))
    }
}

/// Running sum/count per metric, used for every mean the pipeline takes.
#[derive(Debug, Clone, Copy)]
pub struct MetricAccumulator {
    sums: [f64; Metric::COUNT],
    counts: [u32; Metric::COUNT],
}

impl Default for MetricAccumulator {
    fn default() -> Self {
        Self {
            sums: [0.0; Metric::COUNT],
            counts: [0; Metric::COUNT],
        }
    }
}

impl MetricAccumulator {
    pub fn add(&mut self, values: &MetricValues) {
        for (metric, value) in values.present() {
            self.sums[metric.index()] += value;
            self.counts[metric.index()] += 1;
        }
    }

    /// Mean of every metric with at least one value; others stay `None`.
    pub fn mean(&self) -> MetricValues {
        let mut values = MetricValues::default();
        for metric in Metric::ALL {
            let count = self.counts[metric.index()];
            if count > 0 {
                values.set(metric, Some(self.sums[metric.index()] / count as f64));
            }
        }
        values
    }
}
