//! Band name resolution.

use serde::Serialize;

use sat_common::{AcquisitionError, AcquisitionResult};

use crate::profile::SatelliteProfile;

/// A requested band label and the native band it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedBand {
    pub requested: String,
    pub native: String,
}

/// Ordered bands of one query, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedBandSet {
    bands: Vec<ResolvedBand>,
}

impl ResolvedBandSet {
    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedBand> {
        self.bands.iter()
    }

    pub fn get(&self, index: usize) -> Option<&ResolvedBand> {
        self.bands.get(index)
    }

    /// Requested labels, which become the dataset band coordinate.
    pub fn labels(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.requested.clone()).collect()
    }

    /// Distinct native names in first-use order.
    pub fn natives(&self) -> Vec<String> {
        let mut natives: Vec<String> = Vec::with_capacity(self.bands.len());
        for band in &self.bands {
            if !natives.contains(&band.native) {
                natives.push(band.native.clone());
            }
        }
        natives
    }
}

impl<'a> IntoIterator for &'a ResolvedBandSet {
    type Item = &'a ResolvedBand;
    type IntoIter = std::slice::Iter<'a, ResolvedBand>;

    fn into_iter(self) -> Self::IntoIter {
        self.bands.iter()
    }
}

/// Maps requested band names onto a profile's native bands.
pub struct BandResolver;

impl BandResolver {
    /// Resolve `requested` (or the profile defaults when absent or empty).
    ///
    /// Tokens are matched case-sensitively against the alias table first,
    /// then against native names. Any unmatched token fails the whole call.
    /// Duplicate tokens collapse onto their first occurrence.
    pub fn resolve(
        profile: &SatelliteProfile,
        requested: Option<&[String]>,
    ) -> AcquisitionResult<ResolvedBandSet> {
        let tokens: Vec<String> = match requested {
            Some(bands) if !bands.is_empty() => bands.to_vec(),
            _ => profile.default_bands.iter().map(|b| b.to_string()).collect(),
        };

        let mut bands: Vec<ResolvedBand> = Vec::with_capacity(tokens.len());
        let mut unknown: Vec<String> = Vec::new();

        for token in tokens {
            if bands.iter().any(|b| b.requested == token) || unknown.contains(&token) {
                continue;
            }

            let native = profile.alias(&token).or_else(|| {
                profile
                    .native_bands
                    .iter()
                    .find(|n| **n == token)
                    .copied()
            });

            match native {
                Some(native) => bands.push(ResolvedBand {
                    requested: token,
                    native: native.to_string(),
                }),
                None => unknown.push(token),
            }
        }

        if !unknown.is_empty() {
            return Err(AcquisitionError::UnknownBand {
                satellite: profile.id.to_string(),
                bands: unknown,
            });
        }

        Ok(ResolvedBandSet { bands })
    }
}
