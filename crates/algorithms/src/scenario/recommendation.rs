//! Water-level recommendation from hydro-meteorological outlooks
//!
//! Pure summaries of already-fetched series plus a weighted heuristic that
//! suggests an extra water depth (0–6 m) for the next scenario run.
//! Fetching the series is the caller's business.

use serde::{Deserialize, Serialize};

use jolchobi_core::{Error, Result};

/// Upper bound of any suggested extra depth, metres
pub const MAX_SUGGESTED_EXTRA: f64 = 6.0;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn finite(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| v.is_finite())
}

fn finite_max(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

/// Daily weather outlook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    /// Total rain over the outlook, mm
    pub total_rain: f64,
    /// Highest daily maximum wind, km/h
    pub peak_wind: f64,
    /// Mean daily maximum temperature, °C
    pub mean_temp: f64,
    /// Extra depth suggested by this outlook alone, metres
    pub suggested_extra: f64,
}

impl ForecastSummary {
    /// Summarize daily series. Non-finite entries are ignored.
    pub fn from_daily(rain_mm: &[f64], wind_kmh: &[f64], temp_c: &[f64]) -> Result<Self> {
        if rain_mm.is_empty() && wind_kmh.is_empty() && temp_c.is_empty() {
            return Err(Error::invalid_parameter(
                "forecast",
                "[]",
                "outlook has no daily values",
            ));
        }

        let total_rain: f64 = finite(rain_mm).sum();
        let peak_wind = finite_max(finite(wind_kmh)).unwrap_or(0.0);
        let temps: Vec<f64> = finite(temp_c).collect();
        let mean_temp = if temps.is_empty() {
            0.0
        } else {
            temps.iter().sum::<f64>() / temps.len() as f64
        };

        let suggested = (total_rain / 200.0 + peak_wind / 150.0).clamp(0.0, MAX_SUGGESTED_EXTRA);
        Ok(Self {
            total_rain,
            peak_wind,
            mean_temp,
            suggested_extra: round_to(suggested, 2),
        })
    }
}

/// Hourly precipitation around the present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationSummary {
    /// Rain over the past 48 hours, mm
    pub recent_total: f64,
    /// Rain expected over the next 24 hours, mm
    pub next_day_total: f64,
    /// Heaviest upcoming hour, mm/h
    pub peak_hour: f64,
}

impl PrecipitationSummary {
    /// Summarize `(hour_offset, mm)` samples, where the offset is hours from
    /// now (negative in the past).
    pub fn from_hourly(samples: &[(f64, f64)]) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::invalid_parameter(
                "precipitation",
                "[]",
                "hourly feed has no samples",
            ));
        }

        let valid = || samples.iter().filter(|(t, mm)| t.is_finite() && mm.is_finite());
        // observed hours only; forecast hours are counted by next_day_total
        // and never double as "recent" rain
        let recent_total: f64 = valid()
            .filter(|(t, _)| (-48.0..=0.0).contains(t))
            .map(|(_, mm)| mm)
            .sum();
        let next_day: f64 = valid()
            .filter(|(t, _)| *t > 0.0 && *t <= 24.0)
            .map(|(_, mm)| mm)
            .sum();
        let peak_hour = finite_max(valid().filter(|(t, _)| *t > 0.0).map(|(_, mm)| *mm)).unwrap_or(0.0);

        Ok(Self {
            recent_total: round_to(recent_total, 1),
            next_day_total: round_to(next_day, 1),
            peak_hour: round_to(peak_hour, 2),
        })
    }
}

/// River discharge outlook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrologySummary {
    /// Discharge on the first day, m³/s
    pub current_discharge: f64,
    /// Highest daily maximum over the first ten days, m³/s
    pub peak_discharge: f64,
    /// Change of mean discharge across the first week, m³/s
    pub trend_delta: f64,
}

impl HydrologySummary {
    /// Summarize daily discharge series, first entry = today.
    pub fn from_daily(discharge: &[f64], discharge_max: &[f64], discharge_mean: &[f64]) -> Result<Self> {
        if discharge.is_empty() && discharge_max.is_empty() && discharge_mean.is_empty() {
            return Err(Error::invalid_parameter(
                "hydrology",
                "[]",
                "discharge timeline is empty",
            ));
        }

        let current = discharge.first().copied().filter(|v| v.is_finite()).unwrap_or(0.0);
        let window = &discharge_max[..discharge_max.len().min(10)];
        let peak = finite_max(finite(window)).unwrap_or(0.0);

        let week = &discharge_mean[..discharge_mean.len().min(7)];
        let trend = match (week.first(), week.last()) {
            (Some(first), Some(last)) if week.len() >= 2 && (last - first).is_finite() => last - first,
            _ => 0.0,
        };

        Ok(Self {
            current_discharge: round_to(current, 2),
            peak_discharge: round_to(peak, 2),
            trend_delta: round_to(trend, 2),
        })
    }
}

/// One weighted term of a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationComponent {
    pub label: String,
    /// Contribution in metres
    pub value: f64,
    /// Human-readable source figure
    pub context: String,
}

impl RecommendationComponent {
    fn new(label: &str, value: f64, context: String) -> Self {
        Self {
            label: label.to_string(),
            value: round_to(value, 2),
            context,
        }
    }
}

/// Suggested extra depth and how it was composed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterLevelRecommendation {
    /// Extra depth above base elevation, metres, within [0, 6]
    pub suggested_extra: f64,
    pub components: Vec<RecommendationComponent>,
}

/// Combine whichever outlooks are available into one suggested extra depth.
///
/// Returns `None` when no outlook is given.
pub fn recommend_water_level(
    forecast: Option<&ForecastSummary>,
    precipitation: Option<&PrecipitationSummary>,
    hydrology: Option<&HydrologySummary>,
) -> Option<WaterLevelRecommendation> {
    if forecast.is_none() && precipitation.is_none() && hydrology.is_none() {
        return None;
    }

    let mut components = Vec::new();
    let mut total = 0.0;

    if let Some(f) = forecast {
        let rain = f.total_rain / 180.0;
        let wind = f.peak_wind / 200.0;
        total += rain + wind;
        components.push(RecommendationComponent::new(
            "7-day rainfall",
            rain,
            format!("{:.0} mm total rain", f.total_rain),
        ));
        components.push(RecommendationComponent::new(
            "Peak wind",
            wind,
            format!("{:.0} km/h gusts", f.peak_wind),
        ));
    }

    if let Some(p) = precipitation {
        let near_term = p.next_day_total / 120.0;
        let burst = (p.peak_hour / 30.0).clamp(0.0, 1.2);
        total += near_term + burst;
        components.push(RecommendationComponent::new(
            "Next 24h rain",
            near_term,
            format!("{:.1} mm expected", p.next_day_total),
        ));
        components.push(RecommendationComponent::new(
            "Peak hourly rain",
            burst,
            format!("{:.2} mm/h burst", p.peak_hour),
        ));
    }

    if let Some(h) = hydrology {
        let growth = if h.current_discharge > 0.0 {
            (h.peak_discharge - h.current_discharge) / h.current_discharge.max(1.0)
        } else {
            0.0
        };
        let growth = growth.clamp(-0.5, 4.0);
        let trend = h.trend_delta / 10.0;
        total += growth + trend;
        components.push(RecommendationComponent::new(
            "Peak discharge vs today",
            growth,
            format!("{:.1}→{:.1} m³/s", h.current_discharge, h.peak_discharge),
        ));
        components.push(RecommendationComponent::new(
            "Weekly discharge trend",
            trend,
            format!("Δ {:+.2} m³/s over 1 week", h.trend_delta),
        ));
    }

    Some(WaterLevelRecommendation {
        suggested_extra: round_to(total.clamp(0.0, MAX_SUGGESTED_EXTRA), 2),
        components,
    })
}
