//! Feed volume normalization
//!
//! This module normalizes logged feed quantities into a single unit.
//! - oz and ml are converted at 29.5735 ml/oz
//! - The target unit is the dominant (most frequent) unit of the feeds at hand
//! - Single feeds above 20 oz are capped to suppress data-entry typos

use serde::{Deserialize, Serialize};

use crate::types::Activity;

/// Millilitres per US fluid ounce
pub const ML_PER_OZ: f64 = 29.5735;

/// Per-feed outlier cap, in ounces
pub const MAX_FEED_OZ: f64 = 20.0;

/// Volume unit of a feed quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeUnit {
    Oz,
    Ml,
}

impl VolumeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeUnit::Oz => "oz",
            VolumeUnit::Ml => "ml",
        }
    }

    /// Lenient parse of a logged unit string
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "oz" | "ounce" | "ounces" | "fl oz" | "floz" => Some(VolumeUnit::Oz),
            "ml" | "millilitre" | "milliliter" | "millilitres" | "milliliters" | "cc" => {
                Some(VolumeUnit::Ml)
            }
            _ => None,
        }
    }
}

/// A quantity tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub amount: f64,
    pub unit: VolumeUnit,
}

impl Volume {
    pub fn new(amount: f64, unit: VolumeUnit) -> Self {
        Self { amount, unit }
    }

    /// Convert into another unit
    pub fn to_unit(self, target: VolumeUnit) -> Volume {
        let amount = match (self.unit, target) {
            (VolumeUnit::Oz, VolumeUnit::Ml) => self.amount * ML_PER_OZ,
            (VolumeUnit::Ml, VolumeUnit::Oz) => self.amount / ML_PER_OZ,
            _ => self.amount,
        };
        Volume::new(amount, target)
    }

    /// Clamp to the per-feed outlier cap
    pub fn capped(self) -> Volume {
        let cap = Volume::new(MAX_FEED_OZ, VolumeUnit::Oz).to_unit(self.unit).amount;
        Volume::new(self.amount.clamp(0.0, cap), self.unit)
    }
}

/// Convert a logged quantity into the target unit
pub fn normalize_volume(quantity: f64, unit: VolumeUnit, target: VolumeUnit) -> Volume {
    Volume::new(quantity, unit).to_unit(target)
}

/// Most frequent unit among the feeds. Ties and the no-unit case resolve to ml.
pub fn dominant_unit<'a, I>(activities: I) -> VolumeUnit
where
    I: IntoIterator<Item = &'a Activity>,
{
    let (mut oz, mut ml) = (0usize, 0usize);
    for unit in activities
        .into_iter()
        .filter_map(|a| a.as_feed())
        .filter(|feed| feed.quantity.is_some())
        .filter_map(|feed| feed.unit)
    {
        match unit {
            VolumeUnit::Oz => oz += 1,
            VolumeUnit::Ml => ml += 1,
        }
    }

    if oz > ml {
        VolumeUnit::Oz
    } else {
        VolumeUnit::Ml
    }
}

/// Sum feed volumes in the dominant unit, capping each feed.
///
/// Feeds without a quantity or with a non-positive one are skipped; feeds
/// with a quantity but no unit are assumed to be in the dominant unit.
/// Returns `None` when no feed carried a usable quantity.
pub fn total_feed_volume<'a, I>(activities: I) -> Option<Volume>
where
    I: IntoIterator<Item = &'a Activity> + Clone,
{
    let unit = dominant_unit(activities.clone());
    let mut total = 0.0;
    let mut counted = 0usize;

    for feed in activities.into_iter().filter_map(|a| a.as_feed()) {
        let quantity = match feed.quantity {
            Some(q) if q.is_finite() && q > 0.0 => q,
            _ => continue,
        };
        let volume = normalize_volume(quantity, feed.unit.unwrap_or(unit), unit).capped();
        total += volume.amount;
        counted += 1;
    }

    if counted == 0 {
        None
    } else {
        Some(Volume::new(total, unit))
    }
}
