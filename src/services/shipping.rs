//! Region-tier shipping fees.
//!
//! A destination is classified by province/district code into a coarse
//! [`RegionTier`]; each tier carries a flat fee plus an optional surcharge for
//! cash-on-delivery orders. All lookup data lives in [`ShippingTable`], which is
//! loaded from configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use strum::Display;

use crate::entities::order::PaymentMethod;

/// Province code of Hà Nội in the national administrative code list
pub const HANOI_PROVINCE_CODE: &str = "01";
/// Province code of Hồ Chí Minh City
pub const HCMC_PROVINCE_CODE: &str = "79";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RegionTier {
    HnInner,
    HcmInner,
    Near,
    Far,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionFee {
    pub base: i64,
    #[serde(default)]
    pub cod_surcharge: i64,
}

impl RegionFee {
    pub const fn new(base: i64, cod_surcharge: i64) -> Self {
        Self {
            base,
            cod_surcharge,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionFees {
    pub hn_inner: RegionFee,
    pub hcm_inner: RegionFee,
    pub near: RegionFee,
    pub far: RegionFee,
}

impl Default for RegionFees {
    fn default() -> Self {
        Self {
            hn_inner: RegionFee::new(15_000, 0),
            hcm_inner: RegionFee::new(15_000, 0),
            near: RegionFee::new(25_000, 5_000),
            far: RegionFee::new(35_000, 10_000),
        }
    }
}

impl RegionFees {
    pub fn get(&self, tier: RegionTier) -> RegionFee {
        match tier {
            RegionTier::HnInner => self.hn_inner,
            RegionTier::HcmInner => self.hcm_inner,
            RegionTier::Near => self.near,
            RegionTier::Far => self.far,
        }
    }
}

/// An inner-city province and the districts that count as "inner"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InnerCity {
    pub province_code: String,
    pub tier: RegionTier,
    #[serde(default)]
    pub districts: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShippingTable {
    pub fees: RegionFees,
    pub inner_cities: Vec<InnerCity>,
    /// Province code to tier for everything outside the inner districts.
    /// Provinces not listed fall back to [`RegionTier::Near`].
    pub province_tiers: HashMap<String, RegionTier>,
}

impl Default for ShippingTable {
    // The district sets and province list have never been filled in, so every
    // address currently resolves to NEAR.
    fn default() -> Self {
        Self {
            fees: RegionFees::default(),
            inner_cities: vec![
                InnerCity {
                    province_code: HANOI_PROVINCE_CODE.to_string(),
                    tier: RegionTier::HnInner,
                    districts: BTreeSet::new(),
                },
                InnerCity {
                    province_code: HCMC_PROVINCE_CODE.to_string(),
                    tier: RegionTier::HcmInner,
                    districts: BTreeSet::new(),
                },
            ],
            province_tiers: HashMap::new(),
        }
    }
}

/// Fee quoted for one destination and payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShippingQuote {
    pub tier: RegionTier,
    pub fee: i64,
}

impl ShippingTable {
    /// Classifies a destination. Missing or blank codes resolve to NEAR.
    pub fn classify(&self, province_code: Option<&str>, district_code: Option<&str>) -> RegionTier {
        let Some(province) = non_blank(province_code) else {
            return RegionTier::Near;
        };

        if let Some(district) = non_blank(district_code) {
            let inner = self
                .inner_cities
                .iter()
                .find(|city| city.province_code == province && city.districts.contains(district));
            if let Some(city) = inner {
                return city.tier;
            }
        }

        self.province_tiers
            .get(province)
            .copied()
            .unwrap_or(RegionTier::Near)
    }

    /// Flat fee for the destination, plus the COD surcharge when paying on delivery.
    pub fn quote(
        &self,
        province_code: Option<&str>,
        district_code: Option<&str>,
        payment_method: PaymentMethod,
    ) -> ShippingQuote {
        let tier = self.classify(province_code, district_code);
        let RegionFee {
            base,
            cod_surcharge,
        } = self.fees.get(tier);

        let fee = match payment_method {
            PaymentMethod::Cod => base + cod_surcharge,
            PaymentMethod::Online => base,
        };

        ShippingQuote { tier, fee }
    }

    pub(crate) fn first_negative_fee(&self) -> Option<RegionTier> {
        [
            RegionTier::HnInner,
            RegionTier::HcmInner,
            RegionTier::Near,
            RegionTier::Far,
        ]
        .into_iter()
        .find(|tier| {
            let fee = self.fees.get(*tier);
            fee.base < 0 || fee.cod_surcharge < 0
        })
    }
}

fn non_blank(code: Option<&str>) -> Option<&str> {
    code.map(str::trim).filter(|c| !c.is_empty())
}
